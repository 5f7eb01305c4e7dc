use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use super::{Chain, Prefix, Successors, Token};
use crate::error::{BabbleError, Result};
use crate::io::read_file;

/// Links staged for a single corpus.
///
/// Counts are committed to the chain only once the corpus is exhausted,
/// so a failed read leaves the chain untouched.
struct Ingest {
	window: Prefix,
	links: HashMap<Prefix, Successors>,
	words: usize,
	skipped: usize,
}

impl Ingest {
	fn new(order: usize) -> Self {
		Self { window: Prefix::start(order), links: HashMap::new(), words: 0, skipped: 0 }
	}

	fn record(&mut self, token: Token) {
		self.links.entry(self.window.clone()).or_default().add(token);
	}

	fn push(&mut self, word: &str) {
		let token = Token::from(word);
		self.record(token.clone());
		self.window.shift(token);
		self.words += 1;
	}

	fn finish(mut self) -> HashMap<Prefix, Successors> {
		self.record(Token::End);
		debug!(words = self.words, skipped = self.skipped, prefixes = self.links.len(), "ingested corpus");
		self.links
	}
}

impl Chain {
	/// Reads text from `reader` and creates a new chain (order `DEFAULT_ORDER`,
	/// no ignore pattern) from it.
	///
	/// # Errors
	/// Returns `Ingestion` if the reader fails.
	pub fn read_corpus<R: Read>(reader: R) -> Result<Self> {
		let mut chain = Chain::new();
		chain.add_corpus(reader)?;
		Ok(chain)
	}

	/// Adds the whitespace-delimited words of `reader` to the chain.
	///
	/// # Behavior
	/// - Starts from a fresh window of `order` start tokens.
	/// - Words matching the ignore pattern are skipped entirely.
	/// - Every other word is counted as the successor of the current window,
	///   then slides into it.
	/// - Once the reader is exhausted, `Token::End` is counted once after the
	///   final window.
	///
	/// # Errors
	/// Returns `Ingestion` on a read fault (invalid UTF-8 included).
	/// The chain is left exactly as it was before the call.
	pub fn add_corpus<R: Read>(&mut self, reader: R) -> Result<()> {
		let mut ingest = Ingest::new(self.order);
		for line in BufReader::new(reader).lines() {
			let line = line.map_err(BabbleError::Ingestion)?;
			self.ingest_words(&mut ingest, line.split_whitespace());
		}
		self.absorb(ingest.finish());
		Ok(())
	}

	/// Adds an in-memory word sequence as one corpus.
	///
	/// Same semantics as `add_corpus`; words are taken as given, without
	/// further splitting.
	pub fn add_tokens<I, S>(&mut self, words: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut ingest = Ingest::new(self.order);
		self.ingest_words(&mut ingest, words);
		self.absorb(ingest.finish());
	}

	fn ingest_words<I, S>(&self, ingest: &mut Ingest, words: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for word in words {
			let word = word.as_ref();
			if self.is_ignored(word) {
				ingest.skipped += 1;
				continue;
			}
			ingest.push(word);
		}
	}

	/// Adds each line as its own corpus, each with a fresh window.
	pub fn add_lines<I, S>(&mut self, lines: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for line in lines {
			self.add_tokens(line.as_ref().split_whitespace());
		}
	}

	/// Same result as `add_lines`, computed on several threads.
	///
	/// # Behavior
	/// - Splits lines into chunks (based on CPU cores * factor).
	/// - Spawns threads to build partial chains for each chunk.
	/// - Merges all partial chains, then commits them into this one.
	///
	/// # Errors
	/// Returns `Ingestion` if a worker thread dies; the chain is then left unchanged.
	///
	/// # Notes
	/// - Partial chains share this chain's order and ignore pattern.
	/// - Count accumulation is commutative, so chunk completion order does not matter.
	pub fn add_lines_parallel(&mut self, lines: Vec<String>) -> Result<()> {
		if lines.is_empty() {
			return Ok(());
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = lines.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		let mut spawned = 0;
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let mut partial = Chain::from_parts(self.order, self.ignore.clone(), HashMap::new());

			thread::spawn(move || {
				partial.add_lines(&chunk);
				if tx.send(partial).is_err() {
					warn!("partial chain dropped: receiver closed");
				}
			});
			spawned += 1;
		}
		drop(tx);

		self.commit_partials(rx, spawned)
	}

	/// Merges `expected` partial chains from `rx` and commits them only if
	/// every one arrived.
	fn commit_partials(&mut self, rx: mpsc::Receiver<Chain>, expected: usize) -> Result<()> {
		let mut staged = Chain::from_parts(self.order, self.ignore.clone(), HashMap::new());
		let mut received = 0;
		for partial in rx.iter() {
			staged.merge(&partial)?;
			received += 1;
		}

		if received != expected {
			return Err(BabbleError::Ingestion(std::io::Error::other(format!(
				"{} of {expected} ingestion workers failed",
				expected - received
			))));
		}

		self.absorb(staged.links);
		Ok(())
	}

	/// Reads a text file and adds every non-blank line as its own corpus.
	///
	/// Blank or whitespace-only lines are skipped. Calling `add_corpus` on such
	/// a line would record `(Start, ..., Start) -> End` once per line, making
	/// empty babble more likely; this method records nothing for them.
	///
	/// # Errors
	/// Returns `Ingestion` if the file cannot be read.
	pub fn add_corpus_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
		let lines: Vec<String> = read_file(&path)
			.map_err(BabbleError::Ingestion)?
			.into_iter()
			.filter(|line| !line.trim().is_empty())
			.collect();
		debug!(path = %path.as_ref().display(), lines = lines.len(), "adding corpus file");
		self.add_lines_parallel(lines)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io;

	fn prefix(a: Token, b: Token) -> Prefix {
		Prefix::new(vec![a, b])
	}

	fn w(word: &str) -> Token {
		Token::from(word)
	}

	/// Yields `data` once, then fails.
	struct FailingReader {
		data: Option<&'static [u8]>,
	}

	impl Read for FailingReader {
		fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
			match self.data.take() {
				Some(data) => {
					let n = data.len().min(buf.len());
					buf[..n].copy_from_slice(&data[..n]);
					Ok(n)
				}
				None => Err(io::Error::other("disk on fire")),
			}
		}
	}

	#[test]
	fn cat_sat_on_the_mat() {
		let chain = Chain::read_corpus("the cat sat on the mat".as_bytes()).unwrap();

		let expected = [
			(prefix(Token::Start, Token::Start), w("the")),
			(prefix(Token::Start, w("the")), w("cat")),
			(prefix(w("the"), w("cat")), w("sat")),
			(prefix(w("cat"), w("sat")), w("on")),
			(prefix(w("sat"), w("on")), w("the")),
			(prefix(w("on"), w("the")), w("mat")),
			(prefix(w("the"), w("mat")), Token::End),
		];
		assert_eq!(chain.len(), expected.len());
		for (p, successor) in expected {
			let successors = chain.successors(&p).unwrap();
			assert_eq!(successors.len(), 1, "{p}");
			assert_eq!(successors.get(&successor), Some(1), "{p}");
		}
	}

	#[test]
	fn count_is_words_plus_one() {
		let text = "a b a b c\n  a  b\tc\r\nd";
		let chain = Chain::read_corpus(text.as_bytes()).unwrap();
		assert_eq!(chain.total_count(), 10);
	}

	#[test]
	fn empty_corpus_maps_start_to_end() {
		let chain = Chain::read_corpus("".as_bytes()).unwrap();
		assert_eq!(chain.len(), 1);
		assert_eq!(chain.successors(&Prefix::start(2)).unwrap().get(&Token::End), Some(1));
	}

	#[test]
	fn ignore_everything_leaves_only_start_to_end() {
		let mut chain = Chain::new().with_ignore(".*").unwrap();
		chain.add_corpus("lorem ipsum dolor".as_bytes()).unwrap();
		assert_eq!(chain.len(), 1);
		let start = chain.successors(&Prefix::start(2)).unwrap();
		assert_eq!(start.len(), 1);
		assert_eq!(start.get(&Token::End), Some(1));
	}

	#[test]
	fn ignored_words_do_not_enter_window() {
		let mut chain = Chain::new().with_ignore("^[0-9]+$").unwrap();
		chain.add_corpus("the 42 cat".as_bytes()).unwrap();
		let the = prefix(Token::Start, w("the"));
		assert_eq!(chain.successors(&the).unwrap().get(&w("cat")), Some(1));
		assert_eq!(chain.total_count(), 3);
	}

	#[test]
	fn each_corpus_starts_a_fresh_window() {
		let mut chain = Chain::new();
		chain.add_corpus("a b".as_bytes()).unwrap();
		chain.add_corpus("c".as_bytes()).unwrap();
		let start = chain.successors(&Prefix::start(2)).unwrap();
		assert_eq!(start.get(&w("a")), Some(1));
		assert_eq!(start.get(&w("c")), Some(1));
		assert!(chain.successors(&prefix(w("a"), w("b"))).unwrap().get(&w("c")).is_none());
	}

	#[test]
	fn higher_order_windows() {
		let mut chain = Chain::with_order(3).unwrap();
		chain.add_corpus("x y".as_bytes()).unwrap();
		let p = Prefix::new(vec![Token::Start, w("x"), w("y")]);
		assert_eq!(chain.successors(&p).unwrap().get(&Token::End), Some(1));
		assert!(chain.iter().all(|(p, _)| p.len() == 3));
	}

	#[test]
	fn read_fault_is_propagated_and_chain_kept() {
		let mut chain = Chain::read_corpus("kept words".as_bytes()).unwrap();
		let before = chain.clone();

		let result = chain.add_corpus(FailingReader { data: Some(b"partial line\nmore") });
		assert!(matches!(result, Err(BabbleError::Ingestion(_))));
		assert_eq!(chain, before);
	}

	#[test]
	fn invalid_utf8_is_an_ingestion_error() {
		let result = Chain::read_corpus(&[0xff, 0xfe, b' ', b'a'][..]);
		assert!(matches!(result, Err(BabbleError::Ingestion(_))));
	}

	#[test]
	fn add_tokens_matches_add_corpus() {
		let mut a = Chain::new();
		a.add_tokens(["one", "two", "three"]);
		let b = Chain::read_corpus("one two three".as_bytes()).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn parallel_lines_match_sequential() {
		let lines: Vec<String> = (0..500).map(|i| format!("w{} w{} w{}", i % 7, i % 5, i % 3)).collect();

		let mut sequential = Chain::new().with_ignore("^w4$").unwrap();
		sequential.add_lines(&lines);

		let mut parallel = Chain::new().with_ignore("^w4$").unwrap();
		parallel.add_lines_parallel(lines).unwrap();

		assert_eq!(sequential, parallel);
	}

	#[test]
	fn lost_worker_leaves_chain_unchanged() {
		let mut chain = Chain::read_corpus("kept words".as_bytes()).unwrap();
		let before = chain.clone();

		let (tx, rx) = mpsc::channel();
		let mut partial = Chain::new();
		partial.add_lines(["new words here"]);
		tx.send(partial).unwrap();
		drop(tx);

		let result = chain.commit_partials(rx, 2);
		assert!(matches!(result, Err(BabbleError::Ingestion(_))));
		assert_eq!(chain, before);
	}

	#[test]
	fn all_workers_commit() {
		let mut chain = Chain::new();
		let (tx, rx) = mpsc::channel();
		for line in ["a b", "c d"] {
			let mut partial = Chain::new();
			partial.add_lines([line]);
			tx.send(partial).unwrap();
		}
		drop(tx);

		chain.commit_partials(rx, 2).unwrap();
		assert_eq!(chain.total_count(), 6);
	}

	#[test]
	fn corpus_file_skips_blank_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		std::fs::write(&path, "hello world\n\n   \nhello there\n").unwrap();

		let mut chain = Chain::new();
		chain.add_corpus_file(&path).unwrap();
		assert_eq!(chain.successors(&Prefix::start(2)).unwrap().get(&w("hello")), Some(2));
		assert_eq!(chain.successors(&Prefix::start(2)).unwrap().get(&Token::End), None);
	}

	#[test]
	fn missing_corpus_file_is_an_ingestion_error() {
		let mut chain = Chain::new();
		let result = chain.add_corpus_file("/nonexistent/corpus.txt");
		assert!(matches!(result, Err(BabbleError::Ingestion(_))));
	}
}
