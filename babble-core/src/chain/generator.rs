use std::fmt;

use rand::Rng;

use tracing::{debug, warn};

use super::{Chain, Prefix, Token};

/// Why a generation walk stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
	/// `Token::End` was selected.
	Terminated,
	/// The current prefix has no recorded transition.
	Stalled,
	/// `BabbleConfig::max_steps` successors were selected without reaching `Token::End`.
	StepLimit,
}

/// Generation parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BabbleConfig {
	/// Maximum number of successors to select. `None` walks until the chain
	/// terminates or stalls, which may never happen on a chain with a cycle
	/// that cannot reach `Token::End`.
	pub max_steps: Option<usize>,
}

impl BabbleConfig {
	pub fn with_max_steps(max_steps: usize) -> Self {
		Self { max_steps: Some(max_steps) }
	}
}

/// Output of a generation walk: the selected tokens and why the walk stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Babble {
	tokens: Vec<Token>,
	halt: Halt,
}

impl Babble {
	/// Selected tokens in emission order, `Token::End` included when reached.
	pub fn tokens(&self) -> &[Token] {
		&self.tokens
	}

	pub fn halt(&self) -> Halt {
		self.halt
	}

	/// The words of the walk, sentinels excluded.
	pub fn words(&self) -> impl Iterator<Item = &str> {
		self.tokens.iter().filter_map(Token::as_word)
	}

	/// Space-joined words, without leading or trailing separator.
	pub fn text(&self) -> String {
		self.words().collect::<Vec<_>>().join(" ")
	}
}

impl fmt::Display for Babble {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, word) in self.words().enumerate() {
			if i > 0 {
				f.write_str(" ")?;
			}
			f.write_str(word)?;
		}
		Ok(())
	}
}

impl Chain {
	/// Generates some babble using the thread RNG and no step limit.
	pub fn babble(&self) -> String {
		self.babble_with(&mut rand::rng(), &BabbleConfig::default()).text()
	}

	/// Walks the chain from the all-start prefix.
	///
	/// # Behavior
	/// - Samples a successor of the current prefix, weighted by count.
	/// - Stops on `Token::End` (`Halt::Terminated`), on a prefix without
	///   transitions (`Halt::Stalled`), or after `max_steps` selections
	///   (`Halt::StepLimit`).
	/// - Otherwise slides the selected word into the prefix and repeats.
	pub fn babble_with<R: Rng + ?Sized>(&self, rng: &mut R, config: &BabbleConfig) -> Babble {
		let mut prefix = Prefix::start(self.order);
		let mut tokens = Vec::new();

		let halt = loop {
			if config.max_steps.is_some_and(|max| tokens.len() >= max) {
				warn!(steps = tokens.len(), "step limit reached before end of sequence");
				break Halt::StepLimit;
			}

			let next = match self.links.get(&prefix).and_then(|successors| successors.sample(rng)) {
				Some(token) => token.clone(),
				None => {
					debug!(%prefix, "no transition for prefix, stopping");
					break Halt::Stalled;
				}
			};

			tokens.push(next.clone());
			if next == Token::End {
				break Halt::Terminated;
			}
			prefix.shift(next);
		};

		Babble { tokens, halt }
	}
}
