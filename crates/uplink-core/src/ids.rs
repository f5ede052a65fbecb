//! Session identifier newtype.
//!
//! A [`SessionId`] identifies one client instance for the lifetime of its
//! session. It is a version-4 UUID in canonical lowercase hyphenated form,
//! generated once and immutable afterwards. The identifier travels over two
//! independent connections (the notification channel announcement and the
//! upload correlation field), so the server re-validates its structure with
//! [`SessionId::parse`] before trusting it as a registry key.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejection reasons for a string that is not a canonical session identifier.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    /// Not a canonical `8-4-4-4-12` lowercase hyphenated UUID.
    #[error("identifier is not in canonical form: {0}")]
    Malformed(String),
    /// Parsed, but the version nibble is not 4.
    #[error("identifier version is {found}, expected 4")]
    WrongVersion {
        /// The version nibble that was found.
        found: usize,
    },
    /// Parsed, but the variant bits are not RFC 4122.
    #[error("identifier variant is not RFC 4122")]
    WrongVariant,
}

/// Opaque identifier for one client session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier.
    ///
    /// Seeds 16 bytes from the thread-local CSPRNG and folds the current
    /// wall-clock nanosecond reading into them, so that identifiers stay
    /// distinct even under rapid successive calls on a weak entropy source.
    /// The version and variant nibbles are stamped afterwards. Never fails.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        for (byte, time_byte) in bytes.iter_mut().zip(nanos.to_le_bytes()) {
            *byte ^= time_byte;
        }

        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Self(uuid.as_hyphenated().to_string())
    }

    /// Parse a canonical identifier string, validating its structure.
    ///
    /// Accepts only the lowercase hyphenated `8-4-4-4-12` form with version 4
    /// and the RFC 4122 variant. Everything else is rejected, including
    /// braced, URN, simple-hex, and uppercase renderings.
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        let uuid = Uuid::try_parse(s).map_err(|e| IdParseError::Malformed(e.to_string()))?;
        if uuid.as_hyphenated().to_string() != s {
            return Err(IdParseError::Malformed(
                "expected lowercase hyphenated form".into(),
            ));
        }
        if uuid.get_version_num() != 4 {
            return Err(IdParseError::WrongVersion {
                found: uuid.get_version_num(),
            });
        }
        if uuid.get_variant() != uuid::Variant::RFC4122 {
            return Err(IdParseError::WrongVariant);
        }
        Ok(Self(s.to_owned()))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::ops::Deref for SessionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
