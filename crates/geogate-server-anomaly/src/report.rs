// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use geogate_core::EmployeeId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::finding::AnomalyFinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
	Low,
	Medium,
	High,
}

impl fmt::Display for RiskLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			RiskLevel::Low => "low",
			RiskLevel::Medium => "medium",
			RiskLevel::High => "high",
		};
		write!(f, "{s}")
	}
}

/// Per-employee aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRisk {
	pub employee_id: EmployeeId,
	pub total_activities: usize,
	pub failed_count: usize,
	/// Rule findings attributed to this employee.
	pub suspicious_count: usize,
	pub risk_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStatus {
	Normal,
	Warning,
	Anomaly,
}

/// Failure rate for an employee with more than two failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePattern {
	pub employee_id: EmployeeId,
	pub failure_rate: f64,
	pub failed_count: usize,
	pub total_activities: usize,
	pub status: PatternStatus,
	pub description: String,
}

/// Result of one analysis pass. Carries no wall-clock time, so the same
/// snapshot always produces an identical report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
	pub total_activities: usize,
	/// Entries with `success = false`.
	pub suspicious_count: usize,
	pub risk_level: RiskLevel,
	pub high_risk_employees: Vec<EmployeeRisk>,
	/// Findings before the reporting cap was applied.
	pub total_findings: usize,
	pub rule_based_anomalies: Vec<AnomalyFinding>,
	pub patterns: Vec<FailurePattern>,
	pub recommendations: Vec<String>,
}

impl AnomalyReport {
	pub fn empty() -> Self {
		Self {
			total_activities: 0,
			suspicious_count: 0,
			risk_level: RiskLevel::Low,
			high_risk_employees: Vec::new(),
			total_findings: 0,
			rule_based_anomalies: Vec::new(),
			patterns: Vec::new(),
			recommendations: Vec::new(),
		}
	}
}
