// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local user store backed by `DashMap`.
//!
//! Each map shard has its own lock, so a read-modify-write done through
//! `get_mut` is atomic for that account while other accounts proceed.

use crate::db::{normalize_email, CreateUserOutcome};
use crate::models::{User, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory user store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<UserId, User>>,
    /// Lowercase email -> account id
    emails: Arc<DashMap<String, UserId>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|user| user.value().clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let id = self.emails.get(email)?.value().clone();
        self.get_user(&id)
    }

    pub fn create_user(&self, user: &User) -> CreateUserOutcome {
        // The email entry stays locked until the account is inserted, so two
        // registrations racing on one address cannot both succeed.
        match self.emails.entry(normalize_email(&user.email)) {
            Entry::Occupied(_) => CreateUserOutcome::EmailTaken,
            Entry::Vacant(slot) => {
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                CreateUserOutcome::Created
            }
        }
    }

    pub fn increment_bonus_points(&self, id: &UserId, amount: u64) -> Option<u64> {
        let mut user = self.users.get_mut(id)?;
        user.bonus_points = user.bonus_points.saturating_add(amount);
        Some(user.bonus_points)
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
