// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit log records.
//!
//! - [`AccessLogEntry`]: an immutable, stored record with its allocated id
//! - [`NewAccessLogEntry`]: a record waiting for an id from the audit log
//! - [`AccessLogBuilder`]: fluent construction of new records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::EmployeeId;
use crate::decision::Decision;
use crate::geo::GeoPoint;

/// Well-known `action` verbs.
pub mod actions {
	pub const FILE_DOWNLOAD: &str = "download";
	pub const LOGIN: &str = "login";
	pub const LOGIN_FAILED: &str = "login_failed";
	pub const OTP_VERIFIED: &str = "otp_verified";
	pub const OTP_FAILED: &str = "otp_failed";
}

/// Unique, monotonically increasing log identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub i64);

impl fmt::Display for LogId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
	Authentication,
	File,
}

impl fmt::Display for LogType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			LogType::Authentication => "authentication",
			LogType::File => "file",
		};
		write!(f, "{s}")
	}
}

impl FromStr for LogType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"authentication" => Ok(LogType::Authentication),
			"file" => Ok(LogType::File),
			_ => Err(format!("invalid log type: {s}")),
		}
	}
}

/// A stored audit record. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
	pub log_id: LogId,
	pub employee_id: EmployeeId,
	pub log_type: LogType,
	pub action: String,
	pub file_id: Option<String>,
	pub filename: Option<String>,
	pub location: Option<GeoPoint>,
	pub wifi_ssid: Option<String>,
	pub success: bool,
	pub reason: String,
	pub timestamp: DateTime<Utc>,
}

impl AccessLogEntry {
	pub fn builder(employee_id: impl Into<EmployeeId>, log_type: LogType) -> AccessLogBuilder {
		AccessLogBuilder::new(employee_id.into(), log_type)
	}
}

/// An audit record before the audit log has allocated its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccessLogEntry {
	pub employee_id: EmployeeId,
	pub log_type: LogType,
	pub action: String,
	pub file_id: Option<String>,
	pub filename: Option<String>,
	pub location: Option<GeoPoint>,
	pub wifi_ssid: Option<String>,
	pub success: bool,
	pub reason: String,
	pub timestamp: DateTime<Utc>,
}

impl NewAccessLogEntry {
	pub fn with_id(self, log_id: LogId) -> AccessLogEntry {
		AccessLogEntry {
			log_id,
			employee_id: self.employee_id,
			log_type: self.log_type,
			action: self.action,
			file_id: self.file_id,
			filename: self.filename,
			location: self.location,
			wifi_ssid: self.wifi_ssid,
			success: self.success,
			reason: self.reason,
			timestamp: self.timestamp,
		}
	}
}

/// Builder for [`NewAccessLogEntry`].
#[derive(Debug, Clone)]
pub struct AccessLogBuilder {
	employee_id: EmployeeId,
	log_type: LogType,
	action: Option<String>,
	file_id: Option<String>,
	filename: Option<String>,
	location: Option<GeoPoint>,
	wifi_ssid: Option<String>,
	success: bool,
	reason: Option<String>,
	timestamp: Option<DateTime<Utc>>,
}

impl AccessLogBuilder {
	pub fn new(employee_id: EmployeeId, log_type: LogType) -> Self {
		Self {
			employee_id,
			log_type,
			action: None,
			file_id: None,
			filename: None,
			location: None,
			wifi_ssid: None,
			success: false,
			reason: None,
			timestamp: None,
		}
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn file_id(mut self, file_id: impl Into<String>) -> Self {
		self.file_id = Some(file_id.into());
		self
	}

	pub fn filename(mut self, filename: impl Into<String>) -> Self {
		self.filename = Some(filename.into());
		self
	}

	pub fn location(mut self, location: Option<GeoPoint>) -> Self {
		self.location = location;
		self
	}

	pub fn wifi_ssid(mut self, ssid: Option<String>) -> Self {
		self.wifi_ssid = ssid;
		self
	}

	pub fn success(mut self, success: bool) -> Self {
		self.success = success;
		self
	}

	pub fn reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}

	/// Copies the verdict and reason of a decision.
	pub fn decision(self, decision: &Decision) -> Self {
		self.success(decision.allowed).reason(decision.reason.clone())
	}

	pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = Some(timestamp);
		self
	}

	/// Missing action defaults to the log type, missing timestamp to now.
	pub fn build(self) -> NewAccessLogEntry {
		NewAccessLogEntry {
			action: self.action.unwrap_or_else(|| self.log_type.to_string()),
			employee_id: self.employee_id,
			log_type: self.log_type,
			file_id: self.file_id,
			filename: self.filename,
			location: self.location,
			wifi_ssid: self.wifi_ssid,
			success: self.success,
			reason: self.reason.unwrap_or_default(),
			timestamp: self.timestamp.unwrap_or_else(Utc::now),
		}
	}
}
