//! babble CLI: build, persist and sample word-level Markov chains.
//!
//! Usage:
//!   babble -c chain.bin -a corpus.txt        # add a corpus, save, print one babble
//!   babble -c chain.bin -n 5                 # load and print five babbles
//!   babble -c chain.bin -a log.txt --ignore '^https?://' --whole-file

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use babble_core::{BabbleConfig, Chain, DEFAULT_ORDER, Halt};

#[derive(Parser)]
#[command(name = "babble", version, about = "Build, persist and babble from word-level Markov chains")]
struct Cli {
	/// File to load/save the chain from
	#[arg(short, long)]
	chain_file: PathBuf,

	/// Add words from this corpus (repeatable)
	#[arg(short, long)]
	add_corpus: Vec<PathBuf>,

	/// Skip words matching this regular expression during ingestion
	#[arg(long)]
	ignore: Option<String>,

	/// Prefix length of a new chain [default: 2] (ignored when the chain file exists)
	#[arg(long)]
	order: Option<usize>,

	/// Treat each corpus file as one sequence instead of one per line
	#[arg(long)]
	whole_file: bool,

	/// Number of babbles to print
	#[arg(short = 'n', long, default_value_t = 1)]
	count: usize,

	/// Stop a babble after this many words
	#[arg(long)]
	max_steps: Option<usize>,

	/// Random seed for reproducible output
	#[arg(long)]
	seed: Option<u64>,

	/// Increase log verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Loads the chain file if it exists, otherwise creates an empty chain.
fn open_chain(cli: &Cli) -> Result<Chain> {
	if cli.chain_file.exists() {
		let chain = Chain::load(&cli.chain_file)
			.with_context(|| format!("failed to load chain from {}", cli.chain_file.display()))?;
		if let Some(requested) = conflicting_order(&chain, cli.order) {
			warn!(stored = chain.order(), requested, "keeping order of existing chain");
		}
		return Ok(chain);
	}

	if cli.add_corpus.is_empty() {
		bail!("{} does not exist and no corpus was given", cli.chain_file.display());
	}
	let order = cli.order.unwrap_or(DEFAULT_ORDER);
	info!(order, "creating new chain");
	Ok(Chain::with_order(order)?)
}

/// The explicitly requested order, if it differs from the loaded chain's.
fn conflicting_order(chain: &Chain, requested: Option<usize>) -> Option<usize> {
	requested.filter(|order| *order != chain.order())
}

fn add_corpus(chain: &mut Chain, path: &Path, whole_file: bool) -> Result<()> {
	let added = if whole_file {
		let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
		chain.add_corpus(file)
	} else {
		chain.add_corpus_file(path)
	};
	added.with_context(|| format!("failed to add corpus {}", path.display()))
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	let mut chain = open_chain(&cli)?;

	if let Some(pattern) = &cli.ignore {
		let ignore = regex::Regex::new(pattern).with_context(|| format!("invalid ignore pattern {pattern:?}"))?;
		chain.set_ignore(Some(ignore));
	}

	if !cli.add_corpus.is_empty() {
		for path in &cli.add_corpus {
			add_corpus(&mut chain, path, cli.whole_file)?;
		}
		chain
			.save(&cli.chain_file)
			.with_context(|| format!("failed to save chain to {}", cli.chain_file.display()))?;
	}

	let mut rng = match cli.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	};
	let config = BabbleConfig { max_steps: cli.max_steps };

	for _ in 0..cli.count {
		let babble = chain.babble_with(&mut rng, &config);
		if babble.halt() == Halt::StepLimit {
			warn!("babble cut at {} words", babble.words().count());
		}
		println!("{babble}");
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_repeated_corpora() {
		let cli = Cli::parse_from(["babble", "-c", "chain.bin", "-a", "a.txt", "-a", "b.txt", "-vv"]);
		assert_eq!(cli.add_corpus.len(), 2);
		assert_eq!(cli.order, None);
		assert_eq!(cli.verbose, 2);
	}

	#[test]
	fn order_conflict_only_when_requested() {
		let chain = Chain::with_order(3).unwrap();
		assert_eq!(conflicting_order(&chain, None), None);
		assert_eq!(conflicting_order(&chain, Some(3)), None);
		assert_eq!(conflicting_order(&chain, Some(DEFAULT_ORDER)), Some(DEFAULT_ORDER));

		let cli = Cli::parse_from(["babble", "-c", "chain.bin", "--order", "4"]);
		assert_eq!(cli.order, Some(4));
	}

	#[test]
	fn missing_chain_without_corpus_fails() {
		let dir = std::env::temp_dir().join("babble-cli-missing-chain.bin");
		let cli = Cli::parse_from(["babble", "-c", dir.to_str().unwrap()]);
		assert!(open_chain(&cli).is_err());
	}
}
