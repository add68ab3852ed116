// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Allow/deny verdicts with a per-check breakdown.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const WFH_OVERRIDE_REASON: &str = "WFH access window active";
pub const ALL_CONDITIONS_MET_REASON: &str = "all access conditions met";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
	Pass,
	Fail,
	Skipped,
}

impl fmt::Display for CheckStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			CheckStatus::Pass => "PASS",
			CheckStatus::Fail => "FAIL",
			CheckStatus::Skipped => "SKIPPED",
		};
		write!(f, "{s}")
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
	Location,
	Wifi,
	Time,
}

impl fmt::Display for CheckKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			CheckKind::Location => "location",
			CheckKind::Wifi => "wifi",
			CheckKind::Time => "time",
		};
		write!(f, "{s}")
	}
}

/// Outcome of one check. `summary` is the short fragment used in composite
/// denial reasons; `detail` is the longer message shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
	pub status: CheckStatus,
	pub summary: String,
	pub detail: String,
}

impl CheckResult {
	pub fn pass(summary: impl Into<String>, detail: impl Into<String>) -> Self {
		Self {
			status: CheckStatus::Pass,
			summary: summary.into(),
			detail: detail.into(),
		}
	}

	pub fn fail(summary: impl Into<String>, detail: impl Into<String>) -> Self {
		Self {
			status: CheckStatus::Fail,
			summary: summary.into(),
			detail: detail.into(),
		}
	}

	pub fn skipped() -> Self {
		Self {
			status: CheckStatus::Skipped,
			summary: "skipped".to_string(),
			detail: "bypassed by WFH access window".to_string(),
		}
	}

	pub fn passed(&self) -> bool {
		self.status == CheckStatus::Pass
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionChecks {
	pub location: CheckResult,
	pub wifi: CheckResult,
	pub time: CheckResult,
}

impl DecisionChecks {
	pub fn all_skipped() -> Self {
		Self {
			location: CheckResult::skipped(),
			wifi: CheckResult::skipped(),
			time: CheckResult::skipped(),
		}
	}

	/// Checks in fixed order: location, wifi, time.
	pub fn iter(&self) -> impl Iterator<Item = (CheckKind, &CheckResult)> {
		[
			(CheckKind::Location, &self.location),
			(CheckKind::Wifi, &self.wifi),
			(CheckKind::Time, &self.time),
		]
		.into_iter()
	}

	pub fn failing(&self) -> Vec<CheckKind> {
		self
			.iter()
			.filter(|(_, r)| r.status == CheckStatus::Fail)
			.map(|(kind, _)| kind)
			.collect()
	}

	pub fn get(&self, kind: CheckKind) -> &CheckResult {
		match kind {
			CheckKind::Location => &self.location,
			CheckKind::Wifi => &self.wifi,
			CheckKind::Time => &self.time,
		}
	}
}

/// The structured verdict of the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
	pub allowed: bool,
	pub reason: String,
	pub checks: DecisionChecks,
	/// Distance from the geofence center, when a usable location was submitted
	/// and the checks actually ran.
	pub distance_meters: Option<f64>,
	pub wfh_override: bool,
}

impl Decision {
	pub fn wfh_override() -> Self {
		Self {
			allowed: true,
			reason: WFH_OVERRIDE_REASON.to_string(),
			checks: DecisionChecks::all_skipped(),
			distance_meters: None,
			wfh_override: true,
		}
	}

	/// Combines three evaluated checks. Denial reasons name every failing
	/// check in location, wifi, time order.
	pub fn from_checks(checks: DecisionChecks, distance_meters: Option<f64>) -> Self {
		let failures: Vec<&str> = checks
			.iter()
			.filter(|(_, r)| r.status == CheckStatus::Fail)
			.map(|(_, r)| r.summary.as_str())
			.collect();

		let allowed = failures.is_empty();
		let reason = if allowed {
			ALL_CONDITIONS_MET_REASON.to_string()
		} else {
			failures.join("; ")
		};

		Self {
			allowed,
			reason,
			checks,
			distance_meters,
			wfh_override: false,
		}
	}
}
