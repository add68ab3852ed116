// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request access context.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::GeoPoint;

/// Employee identity as issued by the (external) authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EmployeeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for EmployeeId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for EmployeeId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// What an employee claims about their surroundings, stamped with server time.
///
/// Never persisted. Location and SSID are always supplied explicitly; any
/// client-side caching of the last known values stays in the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessContext {
	pub employee_id: EmployeeId,
	pub location: Option<GeoPoint>,
	pub ssid: Option<String>,
	pub evaluation_time: DateTime<FixedOffset>,
}

impl AccessContext {
	pub fn new(employee_id: impl Into<EmployeeId>, evaluation_time: DateTime<FixedOffset>) -> Self {
		Self {
			employee_id: employee_id.into(),
			location: None,
			ssid: None,
			evaluation_time,
		}
	}

	/// Keeps the location only when both latitude and longitude are present.
	#[must_use]
	pub fn with_coordinates(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
		self.location = GeoPoint::from_parts(latitude, longitude);
		self
	}

	#[must_use]
	pub fn with_location(mut self, location: GeoPoint) -> Self {
		self.location = Some(location);
		self
	}

	/// Blank SSIDs count as not submitted.
	#[must_use]
	pub fn with_ssid<S: Into<String>>(mut self, ssid: Option<S>) -> Self {
		self.ssid = ssid.map(Into::into).filter(|s| !s.trim().is_empty());
		self
	}

	/// The submitted location if it is usable for a distance check.
	pub fn valid_location(&self) -> Option<GeoPoint> {
		self.location.filter(GeoPoint::is_valid)
	}
}
