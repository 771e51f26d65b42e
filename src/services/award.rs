// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study-time bonus point awards.
//!
//! Every accepted call credits [`POINTS_PER_INTERVAL`]. Requests carry no
//! idempotency key, so a client that resubmits after a timeout whose first
//! attempt actually landed is credited twice. The wire contract has no
//! field to tell those apart.

use crate::db::UserDb;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserId;
use crate::POINTS_PER_INTERVAL;

/// Outcome of a successful award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardReceipt {
    pub user_id: UserId,
    pub new_balance: u64,
    pub message: String,
}

/// Confirmation text shown to the user.
pub fn award_message(points: u64) -> String {
    format!("You earned {} bonus points.", points)
}

/// Applies study-time awards to the user store.
#[derive(Clone)]
pub struct AwardService {
    db: UserDb,
}

impl AwardService {
    pub fn new(db: UserDb) -> Self {
        Self { db }
    }

    /// Credit one reward interval to `target`.
    ///
    /// The target must be the authenticated caller: accepting any account id
    /// would let one user pump another account's balance.
    pub async fn award(&self, caller: &AuthUser, target: Option<&str>) -> Result<AwardReceipt> {
        let raw = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::BadRequest("User ID is required".to_string()))?;

        let user_id: UserId = raw
            .parse()
            .map_err(|_| AppError::BadRequest("User ID is malformed".to_string()))?;

        if user_id != caller.user_id {
            tracing::warn!(
                caller = %caller.user_id,
                target = %user_id,
                "Rejected award for another account"
            );
            return Err(AppError::Forbidden(
                "Points can only be awarded to your own account".to_string(),
            ));
        }

        let new_balance = self
            .db
            .increment_bonus_points(&caller.user_id, POINTS_PER_INTERVAL)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(
            user_id = %caller.user_id,
            points = POINTS_PER_INTERVAL,
            new_balance,
            "Study time awarded"
        );

        Ok(AwardReceipt {
            user_id: caller.user_id.clone(),
            new_balance,
            message: award_message(POINTS_PER_INTERVAL),
        })
    }
}
