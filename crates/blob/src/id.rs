use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BlobError;

/// Length of the canonical hyphenated form.
const CANONICAL_LEN: usize = 36;

/// Opaque identifier of a stored asset.
///
/// Backed by a random (v4) UUID, so accidental reuse among live assets is
/// negligibly probable. The textual form is always the canonical lower-case
/// hyphenated one, which contains only `[0-9a-f-]` and is therefore safe both
/// as a URL path segment and as a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(Uuid);

impl AssetId {
    /// Mint a fresh identifier.
    ///
    /// Entropy comes from the operating system. If it is unavailable the
    /// `uuid` crate panics; generation never returns an error.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an untrusted string into an id.
    ///
    /// Only the canonical lower-case hyphenated form is accepted. Braced,
    /// URN, simple (no hyphens) and upper-case spellings are rejected so that
    /// one asset maps to exactly one file name.
    pub fn parse(raw: &str) -> Result<Self, BlobError> {
        if raw.len() != CANONICAL_LEN
            || !raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b) || b == b'-')
        {
            return Err(BlobError::InvalidId(raw.to_owned()));
        }
        let uuid = Uuid::parse_str(raw).map_err(|_| BlobError::InvalidId(raw.to_owned()))?;
        Ok(Self(uuid))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0.as_hyphenated(), f)
    }
}

impl FromStr for AssetId {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetId {
    type Error = BlobError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.to_string()
    }
}
