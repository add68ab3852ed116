// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage for the singleton geofence policy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use geogate_core::{format_time_of_day, parse_time_of_day, GeofenceConfig};
use sqlx::{sqlite::SqlitePool, Row};
use tokio::sync::RwLock;

use crate::error::{DbError, Result};

/// Get and atomically replace the access policy.
///
/// Readers always observe a complete policy: either the one before a
/// replace or the one after it.
#[async_trait]
pub trait GeofenceConfigStore: Send + Sync {
	async fn get(&self) -> Result<GeofenceConfig>;

	/// Validates, then replaces the whole policy.
	async fn replace(&self, config: GeofenceConfig) -> Result<()>;

	/// Stores `seed` if no policy exists yet and returns the effective policy.
	async fn ensure_default(&self, seed: &GeofenceConfig) -> Result<GeofenceConfig>;
}

pub struct SqliteGeofenceConfigStore {
	pool: SqlitePool,
}

impl SqliteGeofenceConfigStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

fn row_to_config(row: &sqlx::sqlite::SqliteRow) -> Result<GeofenceConfig> {
	let radius: i64 = row.get("radius_meters");
	let start: String = row.get("daily_start");
	let end: String = row.get("daily_end");
	Ok(GeofenceConfig {
		latitude: row.get("latitude"),
		longitude: row.get("longitude"),
		radius_meters: u32::try_from(radius)
			.map_err(|_| DbError::Serialization(format!("radius_meters {radius}")))?,
		allowed_ssid: row.get("allowed_ssid"),
		daily_start: parse_time_of_day(&start)
			.map_err(|e| DbError::Serialization(e.to_string()))?,
		daily_end: parse_time_of_day(&end).map_err(|e| DbError::Serialization(e.to_string()))?,
	})
}

#[async_trait]
impl GeofenceConfigStore for SqliteGeofenceConfigStore {
	#[tracing::instrument(skip(self))]
	async fn get(&self) -> Result<GeofenceConfig> {
		let row = sqlx::query(
			r#"
			SELECT latitude, longitude, radius_meters, allowed_ssid, daily_start, daily_end
			FROM geofence_config
			WHERE id = 1
			"#,
		)
		.fetch_optional(&self.pool)
		.await?
		.ok_or_else(|| DbError::NotFound("geofence policy has not been initialized".to_string()))?;

		row_to_config(&row)
	}

	#[tracing::instrument(skip(self, config), fields(radius_meters = config.radius_meters))]
	async fn replace(&self, config: GeofenceConfig) -> Result<()> {
		config.validate()?;

		// Single statement upsert; readers never see a partial row.
		sqlx::query(
			r#"
			INSERT INTO geofence_config
				(id, latitude, longitude, radius_meters, allowed_ssid, daily_start, daily_end, updated_at)
			VALUES (1, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				latitude = excluded.latitude,
				longitude = excluded.longitude,
				radius_meters = excluded.radius_meters,
				allowed_ssid = excluded.allowed_ssid,
				daily_start = excluded.daily_start,
				daily_end = excluded.daily_end,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(config.latitude)
		.bind(config.longitude)
		.bind(i64::from(config.radius_meters))
		.bind(&config.allowed_ssid)
		.bind(format_time_of_day(config.daily_start))
		.bind(format_time_of_day(config.daily_end))
		.bind(crate::time::encode(Utc::now()))
		.execute(&self.pool)
		.await?;

		tracing::info!(
			allowed_ssid = %config.allowed_ssid,
			daily_window = %config.window_label(),
			"geofence policy replaced"
		);
		Ok(())
	}

	#[tracing::instrument(skip(self, seed))]
	async fn ensure_default(&self, seed: &GeofenceConfig) -> Result<GeofenceConfig> {
		seed.validate()?;

		let inserted = sqlx::query(
			r#"
			INSERT INTO geofence_config
				(id, latitude, longitude, radius_meters, allowed_ssid, daily_start, daily_end, updated_at)
			VALUES (1, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO NOTHING
			"#,
		)
		.bind(seed.latitude)
		.bind(seed.longitude)
		.bind(i64::from(seed.radius_meters))
		.bind(&seed.allowed_ssid)
		.bind(format_time_of_day(seed.daily_start))
		.bind(format_time_of_day(seed.daily_end))
		.bind(crate::time::encode(Utc::now()))
		.execute(&self.pool)
		.await?
		.rows_affected();

		if inserted > 0 {
			tracing::info!("seeded default geofence policy");
		}
		self.get().await
	}
}

/// Process-local policy store.
pub struct InMemoryGeofenceConfigStore {
	current: RwLock<Option<Arc<GeofenceConfig>>>,
}

impl InMemoryGeofenceConfigStore {
	pub fn new(config: GeofenceConfig) -> Self {
		Self {
			current: RwLock::new(Some(Arc::new(config))),
		}
	}

	pub fn empty() -> Self {
		Self {
			current: RwLock::new(None),
		}
	}
}

#[async_trait]
impl GeofenceConfigStore for InMemoryGeofenceConfigStore {
	async fn get(&self) -> Result<GeofenceConfig> {
		self.current
			.read()
			.await
			.as_deref()
			.cloned()
			.ok_or_else(|| {
				DbError::NotFound("geofence policy has not been initialized".to_string())
			})
	}

	async fn replace(&self, config: GeofenceConfig) -> Result<()> {
		config.validate()?;
		*self.current.write().await = Some(Arc::new(config));
		tracing::info!("geofence policy replaced");
		Ok(())
	}

	async fn ensure_default(&self, seed: &GeofenceConfig) -> Result<GeofenceConfig> {
		seed.validate()?;
		let mut current = self.current.write().await;
		let config = current.get_or_insert_with(|| Arc::new(seed.clone()));
		Ok((**config).clone())
	}
}
