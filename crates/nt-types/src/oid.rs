use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of an [`Oid`] in hex characters.
pub const OID_LEN: usize = 40;

/// Identifier shared by operations and pack files.
///
/// An `Oid` is always 40 lowercase hex characters (20 bytes). Random oids
/// come from [`Oid::generate`]; [`Oid::from_content`] derives a stable oid
/// from arbitrary text so the same input always names the same object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Generate a fresh random oid.
    pub fn generate() -> Self {
        let mut bytes = [0u8; OID_LEN / 2];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(hex::encode(bytes))
    }

    /// Derive an oid from content (truncated BLAKE3 digest).
    pub fn from_content(input: &str) -> Self {
        let digest = blake3::hash(input.as_bytes());
        Self(hex::encode(&digest.as_bytes()[..OID_LEN / 2]))
    }

    /// Parse and validate an oid string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != OID_LEN {
            return Err(TypeError::InvalidOid {
                value: s.to_string(),
                reason: format!("expected {OID_LEN} characters, got {}", s.len()),
            });
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(TypeError::InvalidOid {
                value: s.to_string(),
                reason: "expected lowercase hex characters".into(),
            });
        }
        Ok(Self(s.to_string()))
    }

    /// The full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two characters, used as the pack directory name.
    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }

    /// Short representation (first 8 characters).
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.short())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Oid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
