//! Property tests over randomly generated corpora.

use babble_core::{Babble, BabbleConfig, Chain, Halt, Prefix, Token};
use proptest::prelude::*;

fn corpus() -> impl Strategy<Value = Vec<String>> {
	prop::collection::vec("[a-d]{1,2}", 0..40)
}

fn build(words: &[String]) -> Chain {
	let mut chain = Chain::new();
	chain.add_tokens(words);
	chain
}

proptest! {
	#[test]
	fn counts_are_conserved(words in corpus()) {
		let chain = build(&words);
		prop_assert_eq!(chain.total_count(), words.len() as u64 + 1);
	}

	#[test]
	fn accumulation_is_commutative(a in corpus(), b in corpus()) {
		let mut ab = Chain::new();
		ab.add_tokens(&a);
		ab.add_tokens(&b);

		let mut ba = Chain::new();
		ba.add_tokens(&b);
		ba.add_tokens(&a);

		prop_assert_eq!(ab, ba);
	}

	#[test]
	fn encoding_round_trips(words in corpus(), ignore in prop::option::of("[a-d]")) {
		let mut chain = match &ignore {
			Some(pattern) => Chain::new().with_ignore(pattern).unwrap(),
			None => Chain::new(),
		};
		chain.add_tokens(&words);

		let decoded = Chain::from_bytes(&chain.to_bytes().unwrap()).unwrap();
		prop_assert_eq!(decoded.ignore().map(|re| re.as_str()), ignore.as_deref());
		prop_assert_eq!(decoded, chain);
	}

	#[test]
	fn invariants_hold(words in corpus(), order in 1usize..4) {
		let mut chain = Chain::with_order(order).unwrap();
		chain.add_tokens(&words);
		chain.add_tokens(words.iter().rev());

		for (prefix, successors) in chain.iter() {
			prop_assert_eq!(prefix.len(), order);
			prop_assert!(!prefix.tokens().contains(&Token::End));
			prop_assert!(!successors.is_empty());
			prop_assert!(successors.get(&Token::Start).is_none());
			prop_assert!(successors.iter().all(|(_, count)| count >= 1));
		}
		prop_assert!(chain.successors(&Prefix::start(order)).is_some());
	}

	#[test]
	fn finite_corpora_terminate(lines in prop::collection::vec(corpus(), 1..6)) {
		let mut chain = Chain::new();
		for line in &lines {
			chain.add_tokens(line);
		}

		let config = BabbleConfig::with_max_steps(100_000);
		let babble: Babble = chain.babble_with(&mut rand::rng(), &config);
		prop_assert_eq!(babble.halt(), Halt::Terminated);

		// Every generated word must have been seen.
		for word in babble.words() {
			prop_assert!(lines.iter().flatten().any(|w| w == word));
		}
	}
}
