// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod award;
pub mod password;

pub use award::{AwardReceipt, AwardService};
