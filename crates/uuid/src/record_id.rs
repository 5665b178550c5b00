//! Implementation of [`RecordId`].

use crate::{UuidError, UuidResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Maximum accepted identifier length.
const MAX_LEN: usize = 128;

/// Opaque identifier for a stored record or an external reference.
///
/// Once constructed the contained string is guaranteed to be non-empty, at most 128 characters
/// long and free of path separators or whitespace, so it can be used directly as a file stem.
///
/// # Construction
/// - [`RecordId::new`] generates a fresh identifier.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new identifier (UUIDv4, 32 lowercase hex characters).
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validates and wraps an externally supplied identifier.
    ///
    /// Input is taken as-is; surrounding whitespace is not trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is empty, longer than 128 characters, or
    /// contains anything other than ASCII letters, digits, `_` and `-`.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_valid(input) {
            return Ok(Self(input.to_owned()));
        }
        Err(UuidError::InvalidInput(format!(
            "record id must be 1-{MAX_LEN} characters of [A-Za-z0-9_-], got: '{input}'"
        )))
    }

    /// Returns true if `input` would be accepted by [`RecordId::parse`].
    pub fn is_valid(input: &str) -> bool {
        !input.is_empty()
            && input.len() <= MAX_LEN
            && input
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the two-level shard directory for this id: `parent_dir/<h[0..2]>/<h[2..4]>/`.
    ///
    /// `h` is the lowercase hex SHA-256 digest of the identifier.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let digest = hex::encode(Sha256::digest(self.0.as_bytes()));
        parent_dir.join(&digest[0..2]).join(&digest[2..4])
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_non_empty_and_distinct() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert!(!a.as_str().is_empty());
        assert_eq!(a.as_str().len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn parse_accepts_short_references() {
        let id = RecordId::parse("f1").expect("short id should parse");
        assert_eq!(id.to_string(), "f1");

        let id: RecordId = "clinic-north_2".parse().expect("mixed id should parse");
        assert_eq!(id.as_str(), "clinic-north_2");
    }

    #[test]
    fn parse_rejects_invalid_input() {
        for bad in ["", " p1", "a/b", "../x", "with space", "é"] {
            assert!(RecordId::parse(bad).is_err(), "expected '{bad}' to be rejected");
        }
        let too_long = "a".repeat(MAX_LEN + 1);
        assert!(RecordId::parse(&too_long).is_err());
        assert!(RecordId::parse(&"a".repeat(MAX_LEN)).is_ok());
    }

    #[test]
    fn sharded_dir_is_stable_and_two_levels_deep() {
        let id = RecordId::parse("p1").unwrap();
        let parent = Path::new("/data/entries");
        let dir = id.sharded_dir(parent);
        assert_eq!(dir, id.sharded_dir(parent));

        let rel = dir.strip_prefix(parent).unwrap();
        let parts: Vec<_> = rel.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.len() == 2));
    }

    #[test]
    fn serde_round_trip_validates() {
        let id = RecordId::parse("abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let err = serde_json::from_str::<RecordId>("\"a b\"");
        assert!(err.is_err());
    }
}
