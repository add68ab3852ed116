// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access policy section: the seed geofence and the reference clock offset.

use chrono::{FixedOffset, Offset, Utc};
use geogate_core::{offset_from_minutes, parse_time_of_day, GeofenceConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfigLayer {
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub radius_meters: Option<u32>,
	pub allowed_ssid: Option<String>,
	pub daily_start: Option<String>,
	pub daily_end: Option<String>,
	pub timezone_offset_minutes: Option<i32>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.latitude.is_some() {
			self.latitude = other.latitude;
		}
		if other.longitude.is_some() {
			self.longitude = other.longitude;
		}
		if other.radius_meters.is_some() {
			self.radius_meters = other.radius_meters;
		}
		if other.allowed_ssid.is_some() {
			self.allowed_ssid = other.allowed_ssid;
		}
		if other.daily_start.is_some() {
			self.daily_start = other.daily_start;
		}
		if other.daily_end.is_some() {
			self.daily_end = other.daily_end;
		}
		if other.timezone_offset_minutes.is_some() {
			self.timezone_offset_minutes = other.timezone_offset_minutes;
		}
	}

	/// Resolves the seed policy, applying the same validation as admin updates.
	pub fn finalize(self) -> Result<PolicyConfig, ConfigError> {
		let defaults = GeofenceConfig::default();

		let daily_start = match self.daily_start {
			Some(s) => parse_time_of_day(&s).map_err(|e| ConfigError::InvalidValue {
				key: "policy.daily_start".to_string(),
				message: e.to_string(),
			})?,
			None => defaults.daily_start,
		};
		let daily_end = match self.daily_end {
			Some(s) => parse_time_of_day(&s).map_err(|e| ConfigError::InvalidValue {
				key: "policy.daily_end".to_string(),
				message: e.to_string(),
			})?,
			None => defaults.daily_end,
		};

		let seed = GeofenceConfig::new(
			self.latitude.unwrap_or(defaults.latitude),
			self.longitude.unwrap_or(defaults.longitude),
			self.radius_meters.unwrap_or(defaults.radius_meters),
			self.allowed_ssid.unwrap_or(defaults.allowed_ssid),
			daily_start,
			daily_end,
		)
		.map_err(|e| ConfigError::Validation(format!("seed policy: {e}")))?;

		let timezone_offset_minutes = self.timezone_offset_minutes.unwrap_or(0);
		offset_from_minutes(timezone_offset_minutes).map_err(|e| ConfigError::InvalidValue {
			key: "policy.timezone_offset_minutes".to_string(),
			message: e.to_string(),
		})?;

		Ok(PolicyConfig {
			seed,
			timezone_offset_minutes,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
	/// Written to the policy store on first start when it is empty.
	pub seed: GeofenceConfig,
	pub timezone_offset_minutes: i32,
}

impl PolicyConfig {
	/// Offset of the server reference clock. Validated in `finalize`.
	pub fn reference_offset(&self) -> FixedOffset {
		offset_from_minutes(self.timezone_offset_minutes).unwrap_or_else(|_| {
			tracing::warn!(
				minutes = self.timezone_offset_minutes,
				"invalid reference offset, falling back to UTC"
			);
			Utc.fix()
		})
	}
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			seed: GeofenceConfig::default(),
			timezone_offset_minutes: 0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveTime;

	#[test]
	fn test_defaults_match_bootstrap_policy() {
		let config = PolicyConfigLayer::default().finalize().unwrap();
		assert_eq!(config.seed, GeofenceConfig::default());
		assert_eq!(config.reference_offset().local_minus_utc(), 0);
	}

	#[test]
	fn test_overrides_apply() {
		let layer = PolicyConfigLayer {
			latitude: Some(40.0),
			longitude: Some(-73.0),
			radius_meters: Some(100),
			allowed_ssid: Some("Office".to_string()),
			daily_start: Some("08:30".to_string()),
			daily_end: Some("18:00".to_string()),
			timezone_offset_minutes: Some(330),
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.seed.radius_meters, 100);
		assert_eq!(
			config.seed.daily_start,
			NaiveTime::from_hms_opt(8, 30, 0).unwrap()
		);
		assert_eq!(config.reference_offset().local_minus_utc(), 330 * 60);
	}

	#[test]
	fn test_overnight_seed_rejected() {
		let layer = PolicyConfigLayer {
			daily_start: Some("22:00".to_string()),
			daily_end: Some("06:00".to_string()),
			..Default::default()
		};
		let err = layer.finalize().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
		assert!(err.to_string().contains("earlier than end"));
	}

	#[test]
	fn test_bad_time_rejected() {
		let layer = PolicyConfigLayer {
			daily_start: Some("9am".to_string()),
			..Default::default()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_bad_offset_rejected() {
		let layer = PolicyConfigLayer {
			timezone_offset_minutes: Some(5000),
			..Default::default()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_toml_parse() {
		let layer: PolicyConfigLayer = toml::from_str(
			r#"
			latitude = 40.0
			longitude = -73.0
			radius_meters = 250
			allowed_ssid = "HQ"
			daily_start = "07:00"
			daily_end = "19:00"
			"#,
		)
		.unwrap();
		assert_eq!(layer.radius_meters, Some(250));
		assert_eq!(layer.allowed_ssid.as_deref(), Some("HQ"));
	}
}
