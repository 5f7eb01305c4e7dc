use std::fmt;

use serde::{Deserialize, Serialize};

/// An atomic unit of a chain.
///
/// The variant order is part of the on-disk format: serde encodes the
/// variant index as the tag (`Start` = 0, `End` = 1, `Word` = 2).
/// Do not reorder without bumping the format version.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
	/// Filler for the initial window; never a successor.
	Start,
	/// Terminates a sequence; never part of a prefix.
	End,
	/// A single whitespace-delimited unit of text.
	Word(String),
}

impl Token {
	/// Returns the word text, or `None` for sentinels.
	pub fn as_word(&self) -> Option<&str> {
		match self {
			Token::Word(w) => Some(w),
			_ => None,
		}
	}
}

impl From<&str> for Token {
	fn from(word: &str) -> Self {
		Token::Word(word.to_owned())
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Start => f.write_str("<start>"),
			Token::End => f.write_str("<end>"),
			Token::Word(w) => f.write_str(w),
		}
	}
}

/// A fixed-length window of the last `order` tokens.
///
/// Used as the lookup key into the transition table. The length is set
/// by `Prefix::start` and never changes afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Prefix(Vec<Token>);

impl Prefix {
	/// The initial window: `order` copies of `Token::Start`.
	pub fn start(order: usize) -> Self {
		Self(vec![Token::Start; order])
	}

	/// Builds a prefix from explicit tokens.
	pub fn new(tokens: Vec<Token>) -> Self {
		Self(tokens)
	}

	/// Drops the oldest token and appends `token` as the newest.
	pub fn shift(&mut self, token: Token) {
		if self.0.is_empty() {
			return;
		}
		self.0.rotate_left(1);
		if let Some(last) = self.0.last_mut() {
			*last = token;
		}
	}

	pub fn tokens(&self) -> &[Token] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Checks the shape every stored prefix has: `Start` only as a leading
	/// run, and no `End` anywhere.
	pub(crate) fn is_well_formed(&self) -> bool {
		self.0
			.iter()
			.skip_while(|t| **t == Token::Start)
			.all(|t| matches!(t, Token::Word(_)))
	}
}

impl fmt::Display for Prefix {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("(")?;
		for (i, token) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{token}")?;
		}
		f.write_str(")")
	}
}
