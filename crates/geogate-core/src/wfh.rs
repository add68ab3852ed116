// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Work-from-home requests and approved access windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::EmployeeId;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WfhStatus {
	Pending,
	Approved,
	Rejected,
}

impl fmt::Display for WfhStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			WfhStatus::Pending => "pending",
			WfhStatus::Approved => "approved",
			WfhStatus::Rejected => "rejected",
		};
		write!(f, "{s}")
	}
}

impl FromStr for WfhStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(WfhStatus::Pending),
			"approved" => Ok(WfhStatus::Approved),
			"rejected" => Ok(WfhStatus::Rejected),
			_ => Err(format!("invalid WFH status: {s}")),
		}
	}
}

/// An admin-allocated override window. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WfhWindow {
	pub access_start: DateTime<Utc>,
	pub access_end: DateTime<Utc>,
}

impl WfhWindow {
	pub fn new(
		access_start: DateTime<Utc>,
		access_end: DateTime<Utc>,
	) -> Result<Self, ValidationError> {
		if access_start >= access_end {
			return Err(ValidationError::InvalidAccessWindow {
				start: access_start,
				end: access_end,
			});
		}
		Ok(Self {
			access_start,
			access_end,
		})
	}

	pub fn contains(&self, at: DateTime<Utc>) -> bool {
		self.access_start <= at && at <= self.access_end
	}
}

/// The single WFH record kept per employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WfhRequest {
	pub employee_id: EmployeeId,
	pub reason: String,
	pub status: WfhStatus,
	pub requested_at: DateTime<Utc>,
	pub access_start: Option<DateTime<Utc>>,
	pub access_end: Option<DateTime<Utc>>,
	pub admin_comment: Option<String>,
	pub resolved_at: Option<DateTime<Utc>>,
}

impl WfhRequest {
	/// A fresh pending request with no window and no comment.
	pub fn pending(
		employee_id: EmployeeId,
		reason: impl Into<String>,
		requested_at: DateTime<Utc>,
	) -> Self {
		Self {
			employee_id,
			reason: reason.into(),
			status: WfhStatus::Pending,
			requested_at,
			access_start: None,
			access_end: None,
			admin_comment: None,
			resolved_at: None,
		}
	}

	pub fn is_pending(&self) -> bool {
		self.status == WfhStatus::Pending
	}

	#[must_use]
	pub fn approved(
		mut self,
		window: WfhWindow,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Self {
		self.status = WfhStatus::Approved;
		self.access_start = Some(window.access_start);
		self.access_end = Some(window.access_end);
		self.admin_comment = comment;
		self.resolved_at = Some(resolved_at);
		self
	}

	#[must_use]
	pub fn rejected(mut self, comment: Option<String>, resolved_at: DateTime<Utc>) -> Self {
		self.status = WfhStatus::Rejected;
		self.access_start = None;
		self.access_end = None;
		self.admin_comment = comment;
		self.resolved_at = Some(resolved_at);
		self
	}

	/// The approved window, if one was allocated.
	pub fn window(&self) -> Option<WfhWindow> {
		if self.status != WfhStatus::Approved {
			return None;
		}
		match (self.access_start, self.access_end) {
			(Some(access_start), Some(access_end)) if access_start < access_end => Some(WfhWindow {
				access_start,
				access_end,
			}),
			_ => None,
		}
	}

	/// Whether the override applies at the given instant.
	pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
		self.window().is_some_and(|w| w.contains(at))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, TimeZone};

	fn t(h: u32, m: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
	}

	#[test]
	fn status_display_roundtrip() {
		for status in [WfhStatus::Pending, WfhStatus::Approved, WfhStatus::Rejected] {
			assert_eq!(status.to_string().parse::<WfhStatus>().unwrap(), status);
		}
		assert!("archived".parse::<WfhStatus>().is_err());
	}

	#[test]
	fn window_requires_start_before_end() {
		assert!(WfhWindow::new(t(8, 0), t(20, 0)).is_ok());
		assert!(matches!(
			WfhWindow::new(t(20, 0), t(8, 0)),
			Err(ValidationError::InvalidAccessWindow { .. })
		));
		assert!(WfhWindow::new(t(8, 0), t(8, 0)).is_err());
	}

	#[test]
	fn window_bounds_are_inclusive() {
		let window = WfhWindow::new(t(8, 0), t(20, 0)).unwrap();
		assert!(window.contains(t(8, 0)));
		assert!(window.contains(t(20, 0)));
		assert!(!window.contains(t(20, 0) + Duration::seconds(1)));
		assert!(!window.contains(t(7, 59)));
	}

	#[test]
	fn pending_request_is_never_active() {
		let request = WfhRequest::pending(EmployeeId::from("alice"), "plumber visit", t(7, 0));
		assert!(request.is_pending());
		assert!(request.window().is_none());
		assert!(!request.is_active_at(t(9, 0)));
	}

	#[test]
	fn approved_request_active_only_inside_window() {
		let window = WfhWindow::new(t(8, 0), t(20, 0)).unwrap();
		let request = WfhRequest::pending(EmployeeId::from("alice"), "sick child", t(7, 0))
			.approved(window, Some("ok".to_string()), t(7, 30));

		assert_eq!(request.status, WfhStatus::Approved);
		assert!(request.is_active_at(t(9, 0)));
		assert!(!request.is_active_at(t(21, 0)));
	}

	#[test]
	fn rejected_request_clears_window() {
		let window = WfhWindow::new(t(8, 0), t(20, 0)).unwrap();
		let request = WfhRequest::pending(EmployeeId::from("alice"), "travel", t(7, 0))
			.approved(window, None, t(7, 30))
			.rejected(Some("no coverage".to_string()), t(7, 45));

		assert_eq!(request.status, WfhStatus::Rejected);
		assert!(request.access_start.is_none());
		assert!(!request.is_active_at(t(9, 0)));
		assert_eq!(request.admin_comment.as_deref(), Some("no coverage"));
	}
}
