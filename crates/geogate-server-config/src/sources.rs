// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AnomalyConfigLayer, DatabaseConfigLayer, FilesConfigLayer, LogFormat, LoggingConfigLayer,
	PolicyConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/geogate/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: GEOGATE_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()),
			files: Some(load_files_from_env()),
			logging: Some(load_logging_from_env()?),
			policy: Some(load_policy_from_env()?),
			anomaly: Some(load_anomaly_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v
			.trim()
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
		None => Ok(None),
	}
}

fn env_f64(name: &str) -> Result<Option<f64>, ConfigError> {
	env_parse(name, "f64")
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	env_parse(name, "u32")
}

fn env_i32(name: &str) -> Result<Option<i32>, ConfigError> {
	env_parse(name, "i32")
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	env_parse(name, "u64")
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	env_parse(name, "usize")
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("GEOGATE_SERVER_DATABASE_URL"),
	}
}

fn load_files_from_env() -> FilesConfigLayer {
	FilesConfigLayer {
		root: env_var("GEOGATE_SERVER_FILES_ROOT"),
	}
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("GEOGATE_SERVER_LOG_FORMAT") {
		Some(v) => Some(match v.to_lowercase().as_str() {
			"json" => LogFormat::Json,
			"text" | "pretty" => LogFormat::Text,
			_ => {
				return Err(ConfigError::InvalidValue {
					key: "GEOGATE_SERVER_LOG_FORMAT".to_string(),
					message: format!("unknown log format '{v}', expected text or json"),
				})
			}
		}),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("GEOGATE_SERVER_LOG_LEVEL"),
		format,
	})
}

fn load_policy_from_env() -> Result<PolicyConfigLayer, ConfigError> {
	Ok(PolicyConfigLayer {
		latitude: env_f64("GEOGATE_SERVER_POLICY_LATITUDE")?,
		longitude: env_f64("GEOGATE_SERVER_POLICY_LONGITUDE")?,
		radius_meters: env_u32("GEOGATE_SERVER_POLICY_RADIUS_METERS")?,
		allowed_ssid: env_var("GEOGATE_SERVER_POLICY_ALLOWED_SSID"),
		daily_start: env_var("GEOGATE_SERVER_POLICY_DAILY_START"),
		daily_end: env_var("GEOGATE_SERVER_POLICY_DAILY_END"),
		timezone_offset_minutes: env_i32("GEOGATE_SERVER_POLICY_TIMEZONE_OFFSET_MINUTES")?,
	})
}

fn load_anomaly_from_env() -> Result<AnomalyConfigLayer, ConfigError> {
	Ok(AnomalyConfigLayer {
		high_risk_ratio: env_f64("GEOGATE_SERVER_ANOMALY_HIGH_RISK_RATIO")?,
		medium_risk_ratio: env_f64("GEOGATE_SERVER_ANOMALY_MEDIUM_RISK_RATIO")?,
		failed_attempts_threshold: env_usize("GEOGATE_SERVER_ANOMALY_FAILED_ATTEMPTS_THRESHOLD")?,
		failed_attempts_window_secs: env_u64("GEOGATE_SERVER_ANOMALY_FAILED_ATTEMPTS_WINDOW_SECS")?,
		failed_attempts_high_threshold: env_usize(
			"GEOGATE_SERVER_ANOMALY_FAILED_ATTEMPTS_HIGH_THRESHOLD",
		)?,
		boundary_margin_factor: env_f64("GEOGATE_SERVER_ANOMALY_BOUNDARY_MARGIN_FACTOR")?,
		boundary_cluster_threshold: env_usize("GEOGATE_SERVER_ANOMALY_BOUNDARY_CLUSTER_THRESHOLD")?,
		max_speed_kmh: env_f64("GEOGATE_SERVER_ANOMALY_MAX_SPEED_KMH")?,
		min_relocation_meters: env_f64("GEOGATE_SERVER_ANOMALY_MIN_RELOCATION_METERS")?,
		rapid_access_count: env_usize("GEOGATE_SERVER_ANOMALY_RAPID_ACCESS_COUNT")?,
		rapid_access_window_secs: env_u64("GEOGATE_SERVER_ANOMALY_RAPID_ACCESS_WINDOW_SECS")?,
		employee_risk_threshold: env_f64("GEOGATE_SERVER_ANOMALY_EMPLOYEE_RISK_THRESHOLD")?,
		failure_warning_ratio: env_f64("GEOGATE_SERVER_ANOMALY_FAILURE_WARNING_RATIO")?,
		failure_anomaly_ratio: env_f64("GEOGATE_SERVER_ANOMALY_FAILURE_ANOMALY_RATIO")?,
		max_high_risk_employees: env_usize("GEOGATE_SERVER_ANOMALY_MAX_HIGH_RISK_EMPLOYEES")?,
		max_reported_findings: env_usize("GEOGATE_SERVER_ANOMALY_MAX_REPORTED_FINDINGS")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let source = TomlSource::new("/nonexistent/geogate/server.toml");
		assert_eq!(source.load().unwrap(), ServerConfigLayer::default());
	}

	#[test]
	fn test_toml_file_parsed() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite::memory:"

[policy]
radius_meters = 250
allowed_ssid = "HQ"

[anomaly]
max_speed_kmh = 900.0
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite::memory:")
		);
		let policy = layer.policy.unwrap();
		assert_eq!(policy.radius_meters, Some(250));
		assert_eq!(policy.allowed_ssid.as_deref(), Some("HQ"));
		assert_eq!(layer.anomaly.unwrap().max_speed_kmh, Some(900.0));
	}

	#[test]
	fn test_malformed_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[policy\nradius_meters = ").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("GEOGATE_TEST_SOURCES_BAD_U32", "lots");
		let err = env_u32("GEOGATE_TEST_SOURCES_BAD_U32").unwrap_err();
		assert!(err.to_string().contains("GEOGATE_TEST_SOURCES_BAD_U32"));
		std::env::remove_var("GEOGATE_TEST_SOURCES_BAD_U32");
	}

	#[test]
	fn test_env_parse_reads_values() {
		std::env::set_var("GEOGATE_TEST_SOURCES_OFFSET", "-300");
		assert_eq!(env_i32("GEOGATE_TEST_SOURCES_OFFSET").unwrap(), Some(-300));
		std::env::remove_var("GEOGATE_TEST_SOURCES_OFFSET");

		std::env::set_var("GEOGATE_TEST_SOURCES_EMPTY", "");
		assert_eq!(env_f64("GEOGATE_TEST_SOURCES_EMPTY").unwrap(), None);
		std::env::remove_var("GEOGATE_TEST_SOURCES_EMPTY");
	}
}
