//! User model for storage and API.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of random bytes behind a user id (rendered as 24 hex characters).
const USER_ID_BYTES: usize = 12;

/// Opaque, immutable account identifier.
///
/// Always 24 lowercase hexadecimal characters; parsing folds case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Mint a fresh random id.
    pub fn generate() -> anyhow::Result<Self> {
        let mut bytes = [0u8; USER_ID_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("system RNG unavailable"))?;
        Ok(Self(hex::encode(bytes)))
    }

    /// True if `raw` has the shape of a user id.
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == USER_ID_BYTES * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejected user id string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed user id: {0:?}")]
pub struct MalformedUserId(pub String);

impl FromStr for UserId {
    type Err = MalformedUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_well_formed(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(MalformedUserId(s.to_string()))
        }
    }
}

impl TryFrom<String> for UserId {
    type Error = MalformedUserId;

    fn try_from(mut value: String) -> Result<Self, Self::Error> {
        if Self::is_well_formed(&value) {
            value.make_ascii_lowercase();
            Ok(Self(value))
        } else {
            Err(MalformedUserId(value))
        }
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// User account stored in the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id (also used as document ID)
    pub id: UserId,
    pub username: String,
    /// Email address, normalised to lowercase; unique across accounts
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Study-time reward balance; only ever incremented
    #[serde(default)]
    pub bonus_points: u64,
    /// When the account was registered (RFC3339)
    pub created_at: String,
}

/// Public view of a user, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub bonus_points: u64,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            bonus_points: user.bonus_points,
        }
    }
}
