// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use geogate_core::{EmployeeId, LogId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Low,
	Medium,
	High,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Severity::Low => "low",
			Severity::Medium => "medium",
			Severity::High => "high",
		};
		write!(f, "{s}")
	}
}

/// Detector categories. Declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
	RepeatedFailedAttempts,
	ImplausibleRelocation,
	GeofenceBoundaryFailures,
	RapidAccess,
	OffHoursAccess,
}

impl FindingKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			FindingKind::RepeatedFailedAttempts => "repeated_failed_attempts",
			FindingKind::ImplausibleRelocation => "implausible_relocation",
			FindingKind::GeofenceBoundaryFailures => "geofence_boundary_failures",
			FindingKind::RapidAccess => "rapid_access",
			FindingKind::OffHoursAccess => "off_hours_access",
		}
	}
}

impl fmt::Display for FindingKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One rule hit. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFinding {
	#[serde(rename = "type")]
	pub kind: FindingKind,
	pub severity: Severity,
	pub employee_id: EmployeeId,
	pub description: String,
	/// The log entry that triggered the finding.
	pub log_id: LogId,
	pub timestamp: DateTime<Utc>,
}
