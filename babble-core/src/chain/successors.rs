use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use rand::Rng;

use serde::{Deserialize, Serialize};

use super::token::Token;

/// Successor-frequency table for a single prefix.
///
/// Conceptually, this is the set of outgoing edges of a node in the chain,
/// each weighted by how many times it was observed.
///
/// ## Responsibilities:
/// - Accumulate successor occurrences during ingestion
/// - Select a successor by weighted random sampling
/// - Merge with another table (accumulating several corpora)
///
/// ## Invariants
/// - Every count is strictly positive
/// - The sum of all counts fits in a `u64` (additions saturate)
/// - `Token::Start` is never a successor
///
/// Entries are kept in `Token` order so that both sampling and encoding
/// are reproducible.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Successors {
	/// Example: { End => 1, Word("cat") => 42, Word("dog") => 3 }
	counts: BTreeMap<Token, u64>,
}

impl Successors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one occurrence of `token`.
	pub fn add(&mut self, token: Token) {
		self.add_count(token, 1);
	}

	/// Records `count` occurrences of `token`. A zero count creates nothing.
	pub fn add_count(&mut self, token: Token, count: u64) {
		if count == 0 {
			return;
		}
		let entry = self.counts.entry(token).or_insert(0);
		*entry = entry.saturating_add(count);
	}

	/// Occurrence count of `token`, if it was ever observed.
	pub fn get(&self, token: &Token) -> Option<u64> {
		self.counts.get(token).copied()
	}

	/// Sum of all counts, saturating at `u64::MAX`.
	pub fn total(&self) -> u64 {
		self.counts.values().fold(0, |acc, count| acc.saturating_add(*count))
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Token, u64)> {
		self.counts.iter().map(|(token, count)| (token, *count))
	}

	/// Selects the successor whose cumulative range contains `r`.
	///
	/// Successors are visited in `Token` order; each one owns the half-open
	/// range `[sum_before, sum_before + count)`. Returns `None` when
	/// `r >= self.total()`.
	pub fn pick(&self, mut r: u64) -> Option<&Token> {
		for (token, count) in &self.counts {
			if r < *count {
				return Some(token);
			}
			r -= count;
		}
		None
	}

	/// Selects a successor using weighted random sampling.
	///
	/// The probability of selecting a token is proportional to its count.
	/// Returns `None` if the table is empty.
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Token> {
		let total = self.total();
		if total == 0 {
			return None;
		}
		self.pick(rng.random_range(0..total))
	}

	/// Adds every count of `other` into this table.
	pub fn merge(&mut self, other: &Self) {
		for (token, count) in &other.counts {
			match self.counts.entry(token.clone()) {
				Entry::Occupied(mut e) => {
					let total = e.get_mut();
					*total = total.saturating_add(*count);
				}
				Entry::Vacant(e) => {
					e.insert(*count);
				}
			}
		}
	}

	/// Checks the table invariants, used when decoding untrusted input.
	pub(crate) fn validate(&self) -> Result<(), String> {
		if self.counts.is_empty() {
			return Err("empty successor table".to_owned());
		}
		let mut total: u64 = 0;
		for (token, count) in &self.counts {
			if *token == Token::Start {
				return Err("start sentinel stored as a successor".to_owned());
			}
			if *count == 0 {
				return Err(format!("zero count for successor {token}"));
			}
			total = total
				.checked_add(*count)
				.ok_or_else(|| "successor counts overflow u64".to_owned())?;
		}
		Ok(())
	}
}

impl FromIterator<(Token, u64)> for Successors {
	fn from_iter<I: IntoIterator<Item = (Token, u64)>>(iter: I) -> Self {
		let mut successors = Successors::new();
		for (token, count) in iter {
			successors.add_count(token, count);
		}
		successors
	}
}
