//! Word-level Markov chain text generation ("babble").
//!
//! This crate provides:
//! - A fixed-order chain over whitespace-delimited words (`Chain`)
//! - Corpus ingestion, possibly accumulated over several corpora
//! - A weighted random walk producing new text
//! - A versioned binary format so a chain can be reused across runs
//!
//! ```
//! use babble_core::chain::Chain;
//!
//! let chain = Chain::read_corpus("the cat sat on the mat".as_bytes()).unwrap();
//! assert_eq!(chain.babble(), "the cat sat on the mat");
//! ```

/// Chain model, ingestion, generation and persistence.
pub mod chain;

/// Error types shared by every chain operation.
pub mod error;

/// File helpers (line reading, atomic writes).
///
/// Not exposed
pub(crate) mod io;

pub use chain::{Babble, BabbleConfig, Chain, DEFAULT_ORDER, Halt, MAX_ORDER, Prefix, Successors, Token};
pub use error::{BabbleError, DecodeError, Result};
