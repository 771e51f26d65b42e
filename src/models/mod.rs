// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod api;
pub mod marks;
pub mod quiz;
pub mod user;

pub use marks::{PerformanceMetrics, RiskLevel, SubjectMarks};
pub use quiz::{grade, QuestionType, QuizQuestion, QuizResult};
pub use user::{User, UserId, UserProfile};
