//! Title identifier handling for Title-Trawler
//!
//! This module extracts `tt<digits>` identifiers from catalog keys and URLs
//! and maps them onto sharded on-disk locations.

mod shard;

pub use shard::{FileNaming, ShardAddress, ShardAddressor, DEFAULT_SHARD_SIZE};

use crate::{IdentifierError, IdentifierResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ASCII digits only; `\d` would also match other Unicode digit runs
    PATTERN.get_or_init(|| Regex::new(r"tt([0-9]+)").expect("identifier pattern is valid"))
}

/// A title identifier of the form `tt<digits>`
///
/// The textual form is kept exactly as it appeared in the input (leading
/// zeros included), since it names files on disk. The numeric value is only
/// used for shard placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    text: String,
    number: u64,
}

impl Identifier {
    /// Extracts the first `tt<digits>` run from a key or URL
    ///
    /// # Arguments
    ///
    /// * `raw` - A catalog key (`tt0000005`) or a URL containing one
    ///
    /// # Returns
    ///
    /// * `Ok(Identifier)` - The first identifier found
    /// * `Err(IdentifierError::Malformed)` - No identifier, or digits overflow `u64`
    ///
    /// # Examples
    ///
    /// ```
    /// use title_trawler::Identifier;
    ///
    /// let id = Identifier::parse("https://www.imdb.com/title/tt0000005/movieconnections/").unwrap();
    /// assert_eq!(id.as_str(), "tt0000005");
    /// assert_eq!(id.number(), 5);
    /// ```
    pub fn parse(raw: &str) -> IdentifierResult<Self> {
        let captures = identifier_pattern()
            .captures(raw)
            .ok_or_else(|| IdentifierError::Malformed(raw.to_string()))?;

        // Both groups always participate in a match
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            return Err(IdentifierError::Malformed(raw.to_string()));
        };

        let number = digits
            .as_str()
            .parse::<u64>()
            .map_err(|_| IdentifierError::Malformed(raw.to_string()))?;

        Ok(Self {
            text: whole.as_str().to_string(),
            number,
        })
    }

    /// The identifier as written, e.g. `tt0000005`
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The numeric part of the identifier
    pub fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
