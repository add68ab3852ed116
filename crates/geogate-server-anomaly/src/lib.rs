// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deterministic anomaly detection over the access log.
//!
//! The [`AnomalyEngine`] runs a pipeline of independent [`DetectionRule`]s
//! over a point-in-time snapshot, aggregates per-employee risk and builds an
//! [`AnomalyReport`] with fixed recommendations.

pub mod engine;
pub mod finding;
pub mod report;
pub mod rules;

pub use engine::{recommendation_for, risk_score, AnomalyEngine, CONSIDER_LOCKOUT, REVIEW_FLAGGED};
pub use finding::{AnomalyFinding, FindingKind, Severity};
pub use report::{AnomalyReport, EmployeeRisk, FailurePattern, PatternStatus, RiskLevel};
pub use rules::{default_rules, DetectFn, DetectionRule, RuleContext};
