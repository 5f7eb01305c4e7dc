//! Error types for chain ingestion and persistence.

use thiserror::Error;

/// Main error type for chain operations.
///
/// Generation never fails: a walk that reaches a prefix without transitions
/// simply stops (see `Halt::Stalled`).
#[derive(Debug, Error)]
pub enum BabbleError {
	/// The token source reported a read fault while a corpus was being ingested.
	#[error("corpus read failed: {0}")]
	Ingestion(#[source] std::io::Error),

	#[error("chain decode failed: {0}")]
	Decode(#[from] DecodeError),

	/// Serialization failed or the sink reported a write fault.
	#[error("chain encode failed: {0}")]
	Encode(String),

	/// The byte source reported a read fault while loading a chain.
	#[error("chain load failed: {0}")]
	Load(#[source] std::io::Error),

	#[error("invalid ignore pattern: {0}")]
	Pattern(#[from] regex::Error),

	#[error("invalid chain order {0}: must be between 1 and {}", crate::chain::MAX_ORDER)]
	InvalidOrder(usize),

	#[error("chain mismatch: {0}")]
	Mismatch(String),
}

/// Reasons a serialized chain is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
	#[error("input too short for a chain header")]
	TooShort,

	#[error("bad magic bytes")]
	BadMagic,

	#[error("unsupported format version {0}")]
	UnsupportedVersion(u8),

	#[error("malformed body: {0}")]
	Malformed(String),

	#[error("{0} trailing bytes after chain body")]
	TrailingBytes(usize),

	#[error("stored ignore pattern does not compile: {0}")]
	InvalidPattern(String),

	#[error("invalid chain: {0}")]
	Invalid(String),
}

impl From<postcard::Error> for DecodeError {
	fn from(e: postcard::Error) -> Self {
		DecodeError::Malformed(e.to_string())
	}
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, BabbleError>;
