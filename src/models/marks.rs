// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Marksheet records and the risk metrics computed from them.

use serde::{Deserialize, Serialize};

/// Percentage below which a subject (or the whole sheet) is high risk.
pub const HIGH_RISK_BELOW: f64 = 50.0;
/// Percentage below which a subject (or the whole sheet) is medium risk.
pub const MEDIUM_RISK_BELOW: f64 = 75.0;

const DEFAULT_TOTAL: f64 = 100.0;
const DEFAULT_PASSING_FRACTION: f64 = 0.4;

/// Marks for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMarks {
    pub subject: String,
    pub obtained: f64,
    pub total: f64,
    pub passing: f64,
}

impl SubjectMarks {
    /// Build a record from manually entered fields.
    ///
    /// Returns `None` when the subject name is blank or `obtained` is not a
    /// number. A missing or non-positive total falls back to 100, a missing
    /// passing mark to 40% of the total.
    pub fn from_manual_entry(
        subject: &str,
        obtained: &str,
        total: &str,
        passing: &str,
    ) -> Option<Self> {
        let subject = subject.trim();
        if subject.is_empty() {
            return None;
        }
        let obtained: f64 = obtained.trim().parse().ok().filter(|v: &f64| v.is_finite())?;
        let total = total
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_TOTAL);
        let passing = passing
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(total * DEFAULT_PASSING_FRACTION);

        Some(Self {
            subject: subject.to_string(),
            obtained,
            total,
            passing,
        })
    }

    pub fn percentage(&self) -> f64 {
        (self.obtained / self.total) * 100.0
    }

    pub fn passed(&self) -> bool {
        self.obtained >= self.passing
    }

    pub fn risk(&self) -> RiskLevel {
        RiskLevel::for_percentage(self.percentage())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage < HIGH_RISK_BELOW {
            RiskLevel::High
        } else if percentage < MEDIUM_RISK_BELOW {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Descriptive grade shown next to a subject's percentage.
pub fn performance_label(percentage: f64) -> &'static str {
    match percentage {
        p if p >= 85.0 => "Excellent",
        p if p >= 75.0 => "Very Good",
        p if p >= 60.0 => "Good",
        p if p >= 50.0 => "Average",
        p if p >= 33.0 => "Below Average",
        _ => "Poor",
    }
}

/// Aggregate metrics for a marksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub total_subjects: u32,
    pub passed_subjects: u32,
    pub failed_subjects: u32,
    pub high_risk_subjects: u32,
    pub medium_risk_subjects: u32,
    pub low_risk_subjects: u32,
    /// Mean of per-subject percentages, rounded to one decimal place
    pub overall_percentage: f64,
    pub overall_risk: RiskLevel,
}

impl PerformanceMetrics {
    /// Compute metrics for a non-empty marksheet.
    pub fn from_subjects(subjects: &[SubjectMarks]) -> Option<Self> {
        if subjects.is_empty() {
            return None;
        }

        let mut metrics = Self {
            total_subjects: subjects.len() as u32,
            passed_subjects: 0,
            failed_subjects: 0,
            high_risk_subjects: 0,
            medium_risk_subjects: 0,
            low_risk_subjects: 0,
            overall_percentage: 0.0,
            overall_risk: RiskLevel::Low,
        };

        let mut total_percentage = 0.0;
        for subject in subjects {
            total_percentage += subject.percentage();
            if subject.passed() {
                metrics.passed_subjects += 1;
            }
            match subject.risk() {
                RiskLevel::High => metrics.high_risk_subjects += 1,
                RiskLevel::Medium => metrics.medium_risk_subjects += 1,
                RiskLevel::Low => metrics.low_risk_subjects += 1,
            }
        }

        let overall = total_percentage / subjects.len() as f64;
        metrics.failed_subjects = metrics.total_subjects - metrics.passed_subjects;
        metrics.overall_percentage = (overall * 10.0).round() / 10.0;
        metrics.overall_risk = RiskLevel::for_percentage(overall);
        Some(metrics)
    }

    /// Generic advice used when no generated recommendation is available.
    pub fn fallback_recommendations(&self) -> Vec<&'static str> {
        let mut advice = Vec::with_capacity(5);
        if self.high_risk_subjects > 0 {
            advice.push("Focus on high-risk subjects (below 50%)");
        }
        if self.medium_risk_subjects > 0 {
            advice.push("Practice regularly for medium-risk subjects (50-75%)");
        }
        advice.push("Create a study schedule allocating more time to weaker subjects");
        advice.push("Seek help from teachers or tutors for difficult concepts");
        advice.push("Practice with past papers and sample questions");
        advice
    }
}
