// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the geogate server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`GEOGATE_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use geogate_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Audit database at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub files: FilesConfig,
	pub logging: LoggingConfig,
	pub policy: PolicyConfig,
	pub anomaly: AnomalyConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`GEOGATE_SERVER_*`)
/// 2. Config file (`/etc/geogate/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let files = layer.files.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let policy = layer.policy.unwrap_or_default().finalize()?;
	let anomaly = layer.anomaly.unwrap_or_default().finalize()?;

	info!(
		database = %database.url,
		files_root = %files.root.display(),
		log_level = %logging.level,
		radius_meters = policy.seed.radius_meters,
		allowed_ssid = %policy.seed.allowed_ssid,
		daily_window = %policy.seed.window_label(),
		timezone_offset_minutes = policy.timezone_offset_minutes,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		files,
		logging,
		policy,
		anomaly,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use geogate_core::GeofenceConfig;

	struct FixedSource(Precedence, ServerConfigLayer);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
			Ok(self.1.clone())
		}
	}

	fn policy_layer(radius: u32) -> ServerConfigLayer {
		ServerConfigLayer {
			policy: Some(PolicyConfigLayer {
				radius_meters: Some(radius),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_empty_layer_uses_defaults() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
		assert_eq!(config.logging.level, "info");
		assert_eq!(config.policy.seed, GeofenceConfig::default());
		assert_eq!(config.anomaly, AnomalyConfig::default());
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let config = load_from_sources(vec![
			Box::new(FixedSource(Precedence::Environment, policy_layer(50))),
			Box::new(FixedSource(Precedence::ConfigFile, policy_layer(300))),
		])
		.unwrap();
		assert_eq!(config.policy.seed.radius_meters, 50);
	}

	#[test]
	fn test_invalid_seed_policy_is_validation_error() {
		let err = finalize(policy_layer(0)).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
