//! Binary chain format.
//!
//! Layout (version 1):
//! - 4 bytes magic `BABL`
//! - 1 byte format version
//! - postcard body: `order`, optional ignore pattern source, then the
//!   `(prefix, successors)` list sorted by prefix
//!
//! `Token` is encoded as a tagged enum, so `Token::End` and `Word("End")`
//! never collide. Equal chains encode to identical bytes.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use regex::Regex;

use serde::{Deserialize, Serialize};

use tracing::info;

use super::{Chain, MAX_ORDER, Prefix, Successors};
use crate::error::{BabbleError, DecodeError, Result};
use crate::io::write_atomically;

pub const MAGIC: [u8; 4] = *b"BABL";
pub const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

/// Borrowed view written by the encoder.
#[derive(Serialize)]
struct ChainRecordRef<'a> {
	order: usize,
	ignore: Option<&'a str>,
	links: Vec<(&'a Prefix, &'a Successors)>,
}

/// Owned form read by the decoder, validated before becoming a `Chain`.
#[derive(Deserialize)]
struct ChainRecord {
	order: usize,
	ignore: Option<String>,
	links: Vec<(Prefix, Successors)>,
}

impl ChainRecord {
	fn into_chain(self) -> std::result::Result<Chain, DecodeError> {
		if !(1..=MAX_ORDER).contains(&self.order) {
			return Err(DecodeError::Invalid(format!(
				"order {} must be between 1 and {MAX_ORDER}",
				self.order
			)));
		}

		let ignore = match self.ignore {
			Some(pattern) => {
				Some(Regex::new(&pattern).map_err(|e| DecodeError::InvalidPattern(e.to_string()))?)
			}
			None => None,
		};

		let mut links = HashMap::with_capacity(self.links.len());
		for (prefix, successors) in self.links {
			if prefix.len() != self.order {
				return Err(DecodeError::Invalid(format!(
					"prefix {prefix} has {} tokens, expected {}",
					prefix.len(),
					self.order
				)));
			}
			if !prefix.is_well_formed() {
				return Err(DecodeError::Invalid(format!("prefix {prefix} is not reachable")));
			}
			successors
				.validate()
				.map_err(|e| DecodeError::Invalid(format!("prefix {prefix}: {e}")))?;

			match links.entry(prefix) {
				Entry::Occupied(e) => {
					return Err(DecodeError::Invalid(format!("duplicate prefix {}", e.key())));
				}
				Entry::Vacant(e) => {
					e.insert(successors);
				}
			}
		}

		Ok(Chain::from_parts(self.order, ignore, links))
	}
}

impl Chain {
	/// Encodes the chain into the versioned binary format.
	///
	/// # Errors
	/// Returns `Encode` if serialization fails.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		let mut links: Vec<(&Prefix, &Successors)> = self.links.iter().collect();
		links.sort_by(|a, b| a.0.cmp(b.0));

		let record = ChainRecordRef {
			order: self.order,
			ignore: self.ignore.as_ref().map(Regex::as_str),
			links,
		};
		let body = postcard::to_stdvec(&record).map_err(|e| BabbleError::Encode(e.to_string()))?;

		let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
		bytes.extend_from_slice(&MAGIC);
		bytes.push(FORMAT_VERSION);
		bytes.extend_from_slice(&body);
		Ok(bytes)
	}

	/// Decodes a chain previously produced by `to_bytes`.
	///
	/// # Errors
	/// Returns `Decode` for short, foreign, other-version, truncated or
	/// structurally invalid input.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < HEADER_LEN {
			return Err(DecodeError::TooShort.into());
		}
		if bytes[..MAGIC.len()] != MAGIC {
			return Err(DecodeError::BadMagic.into());
		}
		let version = bytes[MAGIC.len()];
		if version != FORMAT_VERSION {
			return Err(DecodeError::UnsupportedVersion(version).into());
		}

		let (record, rest): (ChainRecord, &[u8]) =
			postcard::take_from_bytes(&bytes[HEADER_LEN..]).map_err(DecodeError::from)?;
		if !rest.is_empty() {
			return Err(DecodeError::TrailingBytes(rest.len()).into());
		}

		Ok(record.into_chain()?)
	}

	/// Saves the chain to the writer.
	///
	/// The whole chain is encoded in memory before anything is written.
	///
	/// # Errors
	/// Returns `Encode` on serialization failure or write fault.
	pub fn write_chain<W: Write>(&self, mut writer: W) -> Result<()> {
		let bytes = self.to_bytes()?;
		writer.write_all(&bytes).map_err(|e| BabbleError::Encode(e.to_string()))?;
		writer.flush().map_err(|e| BabbleError::Encode(e.to_string()))
	}

	/// Reads a chain from the reader, consuming it to the end.
	///
	/// # Errors
	/// Returns `Load` on a read fault and `Decode` on invalid content.
	pub fn read_chain<R: Read>(mut reader: R) -> Result<Self> {
		let mut bytes = Vec::new();
		reader.read_to_end(&mut bytes).map_err(BabbleError::Load)?;
		Self::from_bytes(&bytes)
	}

	/// Saves the chain to `path`, replacing any previous file atomically.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = self.to_bytes()?;
		write_atomically(&path, &bytes).map_err(|e| BabbleError::Encode(e.to_string()))?;
		info!(path = %path.as_ref().display(), prefixes = self.len(), bytes = bytes.len(), "chain saved");
		Ok(())
	}

	/// Loads a chain saved with `save`.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = fs::read(&path).map_err(BabbleError::Load)?;
		let chain = Self::from_bytes(&bytes)?;
		info!(path = %path.as_ref().display(), prefixes = chain.len(), order = chain.order(), "chain loaded");
		Ok(chain)
	}
}
