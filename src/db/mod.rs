//! Database layer (user store).
//!
//! [`UserDb`] is what handlers hold; it dispatches to the configured
//! backend. Both backends uphold the same contract:
//! - emails are unique (case-insensitive, stored lowercase)
//! - `increment_bonus_points` is atomic per account and never loses an
//!   update under concurrency; increments on different accounts do not
//!   contend with each other

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::models::{User, UserId};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index: document ID is the hex-encoded lowercase email
    pub const USER_EMAILS: &str = "user_emails";
}

/// Result of trying to register a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    EmailTaken,
}

/// User store handle shared by all requests.
#[derive(Clone)]
pub enum UserDb {
    Memory(MemoryDb),
    Firestore(FirestoreDb),
}

impl UserDb {
    /// Connect to the backend selected in `config`.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.store_backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory user store; accounts will not survive a restart");
                Ok(UserDb::Memory(MemoryDb::new()))
            }
            StoreBackend::Firestore => {
                let project_id = config.gcp_project_id.as_deref().ok_or_else(|| {
                    AppError::Database("GCP_PROJECT_ID is required for Firestore".to_string())
                })?;
                Ok(UserDb::Firestore(FirestoreDb::new(project_id).await?))
            }
        }
    }

    /// A store whose every operation fails, for exercising error paths.
    pub fn offline() -> Self {
        UserDb::Firestore(FirestoreDb::new_mock())
    }

    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>, AppError> {
        match self {
            UserDb::Memory(db) => Ok(db.get_user(id)),
            UserDb::Firestore(db) => db.get_user(id).await,
        }
    }

    /// Look up an account by email (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        match self {
            UserDb::Memory(db) => Ok(db.find_user_by_email(&email)),
            UserDb::Firestore(db) => db.find_user_by_email(&email).await,
        }
    }

    /// Insert a new account unless its email is already registered.
    pub async fn create_user(&self, user: &User) -> Result<CreateUserOutcome, AppError> {
        match self {
            UserDb::Memory(db) => Ok(db.create_user(user)),
            UserDb::Firestore(db) => db.create_user(user).await,
        }
    }

    /// Atomically add `amount` to an account's bonus points.
    ///
    /// Returns the new balance, or `None` if the account does not exist (in
    /// which case nothing is written).
    pub async fn increment_bonus_points(
        &self,
        id: &UserId,
        amount: u64,
    ) -> Result<Option<u64>, AppError> {
        match self {
            UserDb::Memory(db) => Ok(db.increment_bonus_points(id, amount)),
            UserDb::Firestore(db) => db.increment_bonus_points(id, amount).await,
        }
    }
}

/// Canonical form used for storing and comparing emails.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
