// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! SmartStudy: study-time rewards for the SmartStudy learning app
//!
//! This crate provides the backend API (accounts, sessions and bonus points)
//! along with a native client library that runs the study timer and talks
//! to the API.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserDb;
use services::AwardService;

/// Bonus points credited for every completed reward interval.
///
/// The client and server must agree on this value; the client only uses it
/// for the "+N points" notification.
pub const POINTS_PER_INTERVAL: u64 = 10;

/// Length of one reward interval in seconds of running timer time.
pub const REWARD_INTERVAL_SECONDS: u64 = 30;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: UserDb,
    pub award_service: AwardService,
}

impl AppState {
    pub fn new(config: Config, db: UserDb) -> Self {
        Self {
            award_service: AwardService::new(db.clone()),
            config,
            db,
        }
    }
}
