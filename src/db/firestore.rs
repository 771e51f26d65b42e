// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account documents keyed by user id)
//! - User emails (uniqueness index keyed by hex-encoded email)

use crate::db::{collections, CreateUserOutcome};
use crate::error::AppError;
use crate::models::{User, UserId};
use firestore::errors::{BackoffError, FirestoreError};
use serde::{Deserialize, Serialize};

/// Entry in the email uniqueness index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailClaim {
    user_id: UserId,
}

fn email_doc_id(email: &str) -> String {
    hex::encode(email.as_bytes())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator does not check credentials, so skip the ADC lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id.as_str())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// `email` must already be normalised. A claim without an account
    /// document reads as no user.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let claim: Option<EmailClaim> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(&email_doc_id(email))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match claim {
            Some(claim) => self.get_user(&claim.user_id).await,
            None => Ok(None),
        }
    }

    /// Claim the email in the index and write the account in one transaction.
    ///
    /// Reading the index document puts it in the transaction's read set, so
    /// two registrations racing for one address cannot both commit. A claim
    /// whose account document is missing is stale and gets taken over.
    pub async fn create_user(&self, user: &User) -> Result<CreateUserOutcome, AppError> {
        let claim_id = email_doc_id(&user.email);

        let outcome = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let claim_id = claim_id.clone();
                let user = user.clone();
                Box::pin(async move {
                    let existing: Option<EmailClaim> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_EMAILS)
                        .obj()
                        .one(&claim_id)
                        .await?;

                    if let Some(existing) = existing {
                        let owner: Option<User> = db
                            .fluent()
                            .select()
                            .by_id_in(collections::USERS)
                            .obj()
                            .one(existing.user_id.as_str())
                            .await?;
                        if owner.is_some() {
                            return Ok(CreateUserOutcome::EmailTaken);
                        }
                        tracing::warn!(stale_owner = %existing.user_id, "Reclaiming email with no account");
                    }

                    let claim = EmailClaim {
                        user_id: user.id.clone(),
                    };
                    db.fluent()
                        .update()
                        .in_col(collections::USER_EMAILS)
                        .document_id(&claim_id)
                        .object(&claim)
                        .add_to_transaction(transaction)?;
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(user.id.as_str())
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(CreateUserOutcome::Created)
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Registration transaction failed: {}", e)))?;

        match outcome {
            CreateUserOutcome::Created => tracing::info!(user_id = %user.id, "User document created"),
            CreateUserOutcome::EmailTaken => tracing::debug!("Email already registered"),
        }
        Ok(outcome)
    }

    /// Add `amount` to the account's balance inside a transaction.
    ///
    /// Firestore aborts a transaction whose read set changed before commit,
    /// and `run_transaction` retries it with fresh data, so concurrent
    /// awards for one account serialize instead of overwriting each other.
    pub async fn increment_bonus_points(
        &self,
        id: &UserId,
        amount: u64,
    ) -> Result<Option<u64>, AppError> {
        let doc_id = id.to_string();

        let new_balance = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let doc_id = doc_id.clone();
                Box::pin(async move {
                    let current: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let Some(mut user) = current else {
                        return Ok(None);
                    };
                    user.bonus_points = user.bonus_points.saturating_add(amount);

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&doc_id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Some(user.bonus_points))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Bonus points transaction failed: {}", e)))?;

        if let Some(balance) = new_balance {
            tracing::debug!(user_id = %id, balance, "Bonus points incremented");
        }

        Ok(new_balance)
    }
}
