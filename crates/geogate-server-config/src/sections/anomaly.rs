// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Anomaly detection thresholds.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_HIGH_RISK_RATIO: f64 = 0.3;
pub const DEFAULT_MEDIUM_RISK_RATIO: f64 = 0.1;
pub const DEFAULT_FAILED_ATTEMPTS_THRESHOLD: usize = 3;
pub const DEFAULT_FAILED_ATTEMPTS_WINDOW_SECS: u64 = 600;
pub const DEFAULT_FAILED_ATTEMPTS_HIGH_THRESHOLD: usize = 5;
pub const DEFAULT_BOUNDARY_MARGIN_FACTOR: f64 = 2.0;
pub const DEFAULT_BOUNDARY_CLUSTER_THRESHOLD: usize = 3;
pub const DEFAULT_MAX_SPEED_KMH: f64 = 1000.0;
pub const DEFAULT_MIN_RELOCATION_METERS: f64 = 1000.0;
pub const DEFAULT_RAPID_ACCESS_COUNT: usize = 5;
pub const DEFAULT_RAPID_ACCESS_WINDOW_SECS: u64 = 60;
pub const DEFAULT_EMPLOYEE_RISK_THRESHOLD: f64 = 0.4;
pub const DEFAULT_FAILURE_WARNING_RATIO: f64 = 0.15;
pub const DEFAULT_FAILURE_ANOMALY_RATIO: f64 = 0.3;
pub const DEFAULT_MAX_HIGH_RISK_EMPLOYEES: usize = 10;
pub const DEFAULT_MAX_REPORTED_FINDINGS: usize = 50;

/// Longest accepted sliding window for the burst detectors (one year).
pub const MAX_WINDOW_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnomalyConfigLayer {
	pub high_risk_ratio: Option<f64>,
	pub medium_risk_ratio: Option<f64>,
	pub failed_attempts_threshold: Option<usize>,
	pub failed_attempts_window_secs: Option<u64>,
	pub failed_attempts_high_threshold: Option<usize>,
	pub boundary_margin_factor: Option<f64>,
	pub boundary_cluster_threshold: Option<usize>,
	pub max_speed_kmh: Option<f64>,
	pub min_relocation_meters: Option<f64>,
	pub rapid_access_count: Option<usize>,
	pub rapid_access_window_secs: Option<u64>,
	pub employee_risk_threshold: Option<f64>,
	pub failure_warning_ratio: Option<f64>,
	pub failure_anomaly_ratio: Option<f64>,
	pub max_high_risk_employees: Option<usize>,
	pub max_reported_findings: Option<usize>,
}

macro_rules! overlay {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$self.$field = $other.$field;
			}
		)+
	};
}

impl AnomalyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		overlay!(
			self,
			other,
			high_risk_ratio,
			medium_risk_ratio,
			failed_attempts_threshold,
			failed_attempts_window_secs,
			failed_attempts_high_threshold,
			boundary_margin_factor,
			boundary_cluster_threshold,
			max_speed_kmh,
			min_relocation_meters,
			rapid_access_count,
			rapid_access_window_secs,
			employee_risk_threshold,
			failure_warning_ratio,
			failure_anomaly_ratio,
			max_high_risk_employees,
			max_reported_findings,
		);
	}

	pub fn finalize(self) -> Result<AnomalyConfig, ConfigError> {
		let defaults = AnomalyConfig::default();
		let config = AnomalyConfig {
			high_risk_ratio: self.high_risk_ratio.unwrap_or(defaults.high_risk_ratio),
			medium_risk_ratio: self.medium_risk_ratio.unwrap_or(defaults.medium_risk_ratio),
			failed_attempts_threshold: self
				.failed_attempts_threshold
				.unwrap_or(defaults.failed_attempts_threshold),
			failed_attempts_window_secs: self
				.failed_attempts_window_secs
				.unwrap_or(defaults.failed_attempts_window_secs),
			failed_attempts_high_threshold: self
				.failed_attempts_high_threshold
				.unwrap_or(defaults.failed_attempts_high_threshold),
			boundary_margin_factor: self
				.boundary_margin_factor
				.unwrap_or(defaults.boundary_margin_factor),
			boundary_cluster_threshold: self
				.boundary_cluster_threshold
				.unwrap_or(defaults.boundary_cluster_threshold),
			max_speed_kmh: self.max_speed_kmh.unwrap_or(defaults.max_speed_kmh),
			min_relocation_meters: self
				.min_relocation_meters
				.unwrap_or(defaults.min_relocation_meters),
			rapid_access_count: self.rapid_access_count.unwrap_or(defaults.rapid_access_count),
			rapid_access_window_secs: self
				.rapid_access_window_secs
				.unwrap_or(defaults.rapid_access_window_secs),
			employee_risk_threshold: self
				.employee_risk_threshold
				.unwrap_or(defaults.employee_risk_threshold),
			failure_warning_ratio: self
				.failure_warning_ratio
				.unwrap_or(defaults.failure_warning_ratio),
			failure_anomaly_ratio: self
				.failure_anomaly_ratio
				.unwrap_or(defaults.failure_anomaly_ratio),
			max_high_risk_employees: self
				.max_high_risk_employees
				.unwrap_or(defaults.max_high_risk_employees),
			max_reported_findings: self
				.max_reported_findings
				.unwrap_or(defaults.max_reported_findings),
		};
		config.validate()?;
		Ok(config)
	}
}

/// Thresholds used by the anomaly engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
	/// Failed/total ratio above which the overall risk is high.
	pub high_risk_ratio: f64,
	/// Failed/total ratio above which the overall risk is medium.
	pub medium_risk_ratio: f64,
	/// Failures per employee within the window that make a burst.
	pub failed_attempts_threshold: usize,
	pub failed_attempts_window_secs: u64,
	/// Burst size at which the finding is raised to high severity.
	pub failed_attempts_high_threshold: usize,
	/// Boundary band is `radius..radius * factor`.
	pub boundary_margin_factor: f64,
	pub boundary_cluster_threshold: usize,
	pub max_speed_kmh: f64,
	pub min_relocation_meters: f64,
	pub rapid_access_count: usize,
	pub rapid_access_window_secs: u64,
	pub employee_risk_threshold: f64,
	pub failure_warning_ratio: f64,
	pub failure_anomaly_ratio: f64,
	pub max_high_risk_employees: usize,
	pub max_reported_findings: usize,
}

impl AnomalyConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		let ratios = [
			("anomaly.high_risk_ratio", self.high_risk_ratio),
			("anomaly.medium_risk_ratio", self.medium_risk_ratio),
			("anomaly.employee_risk_threshold", self.employee_risk_threshold),
			("anomaly.failure_warning_ratio", self.failure_warning_ratio),
			("anomaly.failure_anomaly_ratio", self.failure_anomaly_ratio),
		];
		for (key, value) in ratios {
			if !(0.0..=1.0).contains(&value) {
				return Err(ConfigError::InvalidValue {
					key: key.to_string(),
					message: format!("{value} is not a ratio between 0 and 1"),
				});
			}
		}
		if self.medium_risk_ratio > self.high_risk_ratio {
			return Err(ConfigError::Validation(
				"anomaly.medium_risk_ratio must not exceed anomaly.high_risk_ratio".to_string(),
			));
		}
		if self.failure_warning_ratio > self.failure_anomaly_ratio {
			return Err(ConfigError::Validation(
				"anomaly.failure_warning_ratio must not exceed anomaly.failure_anomaly_ratio"
					.to_string(),
			));
		}
		if self.boundary_margin_factor <= 1.0 {
			return Err(ConfigError::InvalidValue {
				key: "anomaly.boundary_margin_factor".to_string(),
				message: "must be greater than 1".to_string(),
			});
		}
		if self.failed_attempts_threshold == 0 || self.rapid_access_count == 0 {
			return Err(ConfigError::Validation(
				"anomaly count thresholds must be at least 1".to_string(),
			));
		}
		let windows = [
			("anomaly.failed_attempts_window_secs", self.failed_attempts_window_secs),
			("anomaly.rapid_access_window_secs", self.rapid_access_window_secs),
		];
		for (key, secs) in windows {
			if secs > MAX_WINDOW_SECS {
				return Err(ConfigError::InvalidValue {
					key: key.to_string(),
					message: format!("{secs} seconds exceeds the maximum of {MAX_WINDOW_SECS}"),
				});
			}
		}
		if self.max_speed_kmh.is_nan() || self.max_speed_kmh <= 0.0 {
			return Err(ConfigError::InvalidValue {
				key: "anomaly.max_speed_kmh".to_string(),
				message: "must be positive".to_string(),
			});
		}
		Ok(())
	}
}

impl Default for AnomalyConfig {
	fn default() -> Self {
		Self {
			high_risk_ratio: DEFAULT_HIGH_RISK_RATIO,
			medium_risk_ratio: DEFAULT_MEDIUM_RISK_RATIO,
			failed_attempts_threshold: DEFAULT_FAILED_ATTEMPTS_THRESHOLD,
			failed_attempts_window_secs: DEFAULT_FAILED_ATTEMPTS_WINDOW_SECS,
			failed_attempts_high_threshold: DEFAULT_FAILED_ATTEMPTS_HIGH_THRESHOLD,
			boundary_margin_factor: DEFAULT_BOUNDARY_MARGIN_FACTOR,
			boundary_cluster_threshold: DEFAULT_BOUNDARY_CLUSTER_THRESHOLD,
			max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
			min_relocation_meters: DEFAULT_MIN_RELOCATION_METERS,
			rapid_access_count: DEFAULT_RAPID_ACCESS_COUNT,
			rapid_access_window_secs: DEFAULT_RAPID_ACCESS_WINDOW_SECS,
			employee_risk_threshold: DEFAULT_EMPLOYEE_RISK_THRESHOLD,
			failure_warning_ratio: DEFAULT_FAILURE_WARNING_RATIO,
			failure_anomaly_ratio: DEFAULT_FAILURE_ANOMALY_RATIO,
			max_high_risk_employees: DEFAULT_MAX_HIGH_RISK_EMPLOYEES,
			max_reported_findings: DEFAULT_MAX_REPORTED_FINDINGS,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = AnomalyConfig::default();
		assert_eq!(config.high_risk_ratio, 0.3);
		assert_eq!(config.medium_risk_ratio, 0.1);
		assert_eq!(config.failed_attempts_threshold, 3);
		assert_eq!(config.failed_attempts_window_secs, 600);
		assert_eq!(config.max_reported_findings, 50);
	}

	#[test]
	fn test_merge_overrides() {
		let mut base = AnomalyConfigLayer {
			failed_attempts_threshold: Some(4),
			max_speed_kmh: Some(800.0),
			..Default::default()
		};
		base.merge(AnomalyConfigLayer {
			max_speed_kmh: Some(900.0),
			..Default::default()
		});
		let config = base.finalize().unwrap();
		assert_eq!(config.failed_attempts_threshold, 4);
		assert_eq!(config.max_speed_kmh, 900.0);
	}

	#[test]
	fn test_inverted_ratios_rejected() {
		let layer = AnomalyConfigLayer {
			medium_risk_ratio: Some(0.5),
			high_risk_ratio: Some(0.2),
			..Default::default()
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_oversized_windows_rejected() {
		let layer = AnomalyConfigLayer {
			failed_attempts_window_secs: Some(100_000_000_000_000_000),
			..Default::default()
		};
		match layer.finalize() {
			Err(ConfigError::InvalidValue { key, .. }) => {
				assert_eq!(key, "anomaly.failed_attempts_window_secs")
			}
			other => panic!("expected invalid window, got {other:?}"),
		}

		let layer = AnomalyConfigLayer {
			rapid_access_window_secs: Some(MAX_WINDOW_SECS + 1),
			..Default::default()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::InvalidValue { .. })
		));

		let layer = AnomalyConfigLayer {
			failed_attempts_window_secs: Some(MAX_WINDOW_SECS),
			..Default::default()
		};
		assert!(layer.finalize().is_ok());
	}

	#[test]
	fn test_out_of_range_ratio_rejected() {
		let layer = AnomalyConfigLayer {
			employee_risk_threshold: Some(1.5),
			..Default::default()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::InvalidValue { .. })
		));
	}
}
