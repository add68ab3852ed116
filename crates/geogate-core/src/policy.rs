// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The geofence access policy.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::GeoPoint;

pub const DEFAULT_LATITUDE: f64 = 10.8505;
pub const DEFAULT_LONGITUDE: f64 = 76.2711;
pub const DEFAULT_RADIUS_METERS: u32 = 500;
pub const DEFAULT_ALLOWED_SSID: &str = "OfficeWiFi";
pub const DEFAULT_DAILY_START: &str = "09:00";
pub const DEFAULT_DAILY_END: &str = "17:00";

/// The single admin-editable access policy.
///
/// Updates replace the whole record. Overnight windows are not supported, so
/// `daily_start` must be strictly earlier than `daily_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
	pub latitude: f64,
	pub longitude: f64,
	pub radius_meters: u32,
	pub allowed_ssid: String,
	#[serde(with = "time_of_day")]
	pub daily_start: NaiveTime,
	#[serde(with = "time_of_day")]
	pub daily_end: NaiveTime,
}

impl GeofenceConfig {
	/// Builds a validated policy.
	pub fn new(
		latitude: f64,
		longitude: f64,
		radius_meters: u32,
		allowed_ssid: impl Into<String>,
		daily_start: NaiveTime,
		daily_end: NaiveTime,
	) -> Result<Self, ValidationError> {
		let config = Self {
			latitude,
			longitude,
			radius_meters,
			allowed_ssid: allowed_ssid.into(),
			daily_start,
			daily_end,
		};
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ValidationError> {
		if !self.center().is_valid() {
			return Err(ValidationError::InvalidCoordinate {
				latitude: self.latitude,
				longitude: self.longitude,
			});
		}
		if self.radius_meters == 0 {
			return Err(ValidationError::NonPositiveRadius);
		}
		if self.allowed_ssid.trim().is_empty() {
			return Err(ValidationError::EmptySsid);
		}
		if self.daily_start >= self.daily_end {
			return Err(ValidationError::InvertedDailyWindow {
				start: format_time_of_day(self.daily_start),
				end: format_time_of_day(self.daily_end),
			});
		}
		Ok(())
	}

	pub fn center(&self) -> GeoPoint {
		GeoPoint::new(self.latitude, self.longitude)
	}

	/// Inclusive start, exclusive end.
	pub fn is_within_hours(&self, time: NaiveTime) -> bool {
		self.daily_start <= time && time < self.daily_end
	}

	pub fn window_label(&self) -> String {
		format!(
			"{}-{}",
			format_time_of_day(self.daily_start),
			format_time_of_day(self.daily_end)
		)
	}
}

impl Default for GeofenceConfig {
	fn default() -> Self {
		Self {
			latitude: DEFAULT_LATITUDE,
			longitude: DEFAULT_LONGITUDE,
			radius_meters: DEFAULT_RADIUS_METERS,
			allowed_ssid: DEFAULT_ALLOWED_SSID.to_string(),
			daily_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
			daily_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
		}
	}
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, ValidationError> {
	let s = s.trim();
	NaiveTime::parse_from_str(s, "%H:%M")
		.or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
		.map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))
}

/// Formats as `HH:MM`, keeping seconds only when present.
pub fn format_time_of_day(time: NaiveTime) -> String {
	if time.second() == 0 {
		time.format("%H:%M").to_string()
	} else {
		time.format("%H:%M:%S").to_string()
	}
}

mod time_of_day {
	use chrono::NaiveTime;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&super::format_time_of_day(*time))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
		let s = String::deserialize(deserializer)?;
		super::parse_time_of_day(&s).map_err(serde::de::Error::custom)
	}
}
