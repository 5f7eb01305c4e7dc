//! Word-level Markov chain.
//!
//! This module provides:
//! - Tokens and fixed-length prefixes (`Token`, `Prefix`)
//! - Per-prefix successor frequencies (`Successors`)
//! - The chain aggregate (`Chain`) with corpus ingestion, generation and persistence

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use regex::Regex;

use crate::error::{BabbleError, Result};

/// Token and prefix types used as keys of the chain.
pub mod token;

/// Successor-frequency table of a single prefix.
///
/// Tracks outgoing transitions and supports weighted random sampling.
pub mod successors;

/// Corpus ingestion (`add_corpus`, `read_corpus`, line-based and parallel variants).
mod builder;

/// Weighted random walk producing babble.
pub mod generator;

/// Versioned binary encoding and file load/save.
pub mod store;

pub use generator::{Babble, BabbleConfig, Halt};
pub use successors::Successors;
pub use token::{Prefix, Token};

/// Prefix length used when none is given.
pub const DEFAULT_ORDER: usize = 2;

/// Largest accepted prefix length.
pub const MAX_ORDER: usize = 64;

/// A fixed-order Markov chain over words.
///
/// # Responsibilities
/// - Map each observed prefix of `order` tokens to its successor frequencies
/// - Filter incoming words through an optional ignore pattern
/// - Merge with another chain of the same order and ignore pattern
///
/// # Invariants
/// - `1 <= order <= MAX_ORDER` and every prefix holds exactly `order` tokens
/// - Every stored prefix has a non-empty successor table with counts >= 1
/// - No prefix contains `Token::End`; `Token::Start` only appears as leading filler
///
/// A chain is not synchronized; callers sharing one across threads must
/// wrap it in a lock.
#[derive(Clone, Debug)]
pub struct Chain {
	/// Number of tokens in a prefix, fixed at construction.
	order: usize,

	/// Words matching this pattern are skipped during ingestion.
	ignore: Option<Regex>,

	/// Mapping from a prefix to the frequencies of the tokens following it.
	links: HashMap<Prefix, Successors>,
}

impl Default for Chain {
	fn default() -> Self {
		Self::new()
	}
}

impl Chain {
	/// Creates an empty chain of order `DEFAULT_ORDER` without ignore pattern.
	pub fn new() -> Self {
		Self { order: DEFAULT_ORDER, ignore: None, links: HashMap::new() }
	}

	/// Creates an empty chain of order `order`.
	///
	/// # Errors
	/// Returns `InvalidOrder` if `order` is not in `1..=MAX_ORDER`.
	pub fn with_order(order: usize) -> Result<Self> {
		if !(1..=MAX_ORDER).contains(&order) {
			return Err(BabbleError::InvalidOrder(order));
		}
		Ok(Self { order, ignore: None, links: HashMap::new() })
	}

	/// Sets the ignore pattern from its source text.
	///
	/// # Errors
	/// Returns `Pattern` if the pattern does not compile.
	pub fn with_ignore(mut self, pattern: &str) -> Result<Self> {
		self.ignore = Some(Regex::new(pattern)?);
		Ok(self)
	}

	/// Replaces the ignore pattern. Only affects future ingestion.
	pub fn set_ignore(&mut self, ignore: Option<Regex>) {
		self.ignore = ignore;
	}

	pub fn ignore(&self) -> Option<&Regex> {
		self.ignore.as_ref()
	}

	pub fn order(&self) -> usize {
		self.order
	}

	/// Successor frequencies for `prefix`, if it was ever observed.
	pub fn successors(&self, prefix: &Prefix) -> Option<&Successors> {
		self.links.get(prefix)
	}

	/// Number of distinct prefixes.
	pub fn len(&self) -> usize {
		self.links.len()
	}

	pub fn is_empty(&self) -> bool {
		self.links.is_empty()
	}

	/// Sum of every successor count across all prefixes.
	pub fn total_count(&self) -> u64 {
		self.links.values().map(Successors::total).fold(0, u64::saturating_add)
	}

	/// Iterates over `(prefix, successors)` pairs in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &Successors)> {
		self.links.iter()
	}

	/// Returns true if the ignore pattern is set and matches `word`.
	pub(crate) fn is_ignored(&self, word: &str) -> bool {
		self.ignore.as_ref().is_some_and(|re| re.is_match(word))
	}

	/// Adds staged links into the table.
	pub(crate) fn absorb(&mut self, links: HashMap<Prefix, Successors>) {
		for (prefix, successors) in links {
			match self.links.entry(prefix) {
				Entry::Occupied(mut e) => e.get_mut().merge(&successors),
				Entry::Vacant(e) => {
					e.insert(successors);
				}
			}
		}
	}

	/// Merges another chain into this one.
	///
	/// # Notes
	/// - Both chains must have the same order and the same ignore pattern.
	/// - Counts for matching prefixes and successors are summed.
	///
	/// # Errors
	/// Returns `Mismatch` if the orders or ignore patterns differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(BabbleError::Mismatch(format!(
				"order mismatch: self={}, other={}",
				self.order, other.order
			)));
		}
		if pattern_text(&self.ignore) != pattern_text(&other.ignore) {
			return Err(BabbleError::Mismatch(format!(
				"ignore pattern mismatch: self={:?}, other={:?}",
				pattern_text(&self.ignore),
				pattern_text(&other.ignore)
			)));
		}

		for (prefix, successors) in &other.links {
			if let Some(existing) = self.links.get_mut(prefix) {
				existing.merge(successors);
			} else {
				self.links.insert(prefix.clone(), successors.clone());
			}
		}

		Ok(())
	}

	/// Builds a chain from already validated parts.
	pub(crate) fn from_parts(order: usize, ignore: Option<Regex>, links: HashMap<Prefix, Successors>) -> Self {
		Self { order, ignore, links }
	}
}

fn pattern_text(ignore: &Option<Regex>) -> Option<&str> {
	ignore.as_ref().map(Regex::as_str)
}

/// Structural equality: same order, same ignore pattern text (or both
/// absent), same prefix set and the same counts per prefix.
impl PartialEq for Chain {
	fn eq(&self, other: &Self) -> bool {
		self.order == other.order
			&& pattern_text(&self.ignore) == pattern_text(&other.ignore)
			&& self.links == other.links
	}
}

impl Eq for Chain {}
