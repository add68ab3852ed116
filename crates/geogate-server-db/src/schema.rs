// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions. Every statement is idempotent.

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

const GEOFENCE_CONFIG: &str = r#"
	CREATE TABLE IF NOT EXISTS geofence_config (
		id INTEGER PRIMARY KEY CHECK (id = 1),
		latitude REAL NOT NULL,
		longitude REAL NOT NULL,
		radius_meters INTEGER NOT NULL CHECK (radius_meters > 0),
		allowed_ssid TEXT NOT NULL,
		daily_start TEXT NOT NULL,
		daily_end TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
"#;

const WFH_REQUESTS: &str = r#"
	CREATE TABLE IF NOT EXISTS wfh_requests (
		employee_id TEXT PRIMARY KEY NOT NULL,
		reason TEXT NOT NULL,
		status TEXT NOT NULL CHECK (status IN ('pending', 'approved', 'rejected')),
		requested_at TEXT NOT NULL,
		access_start TEXT,
		access_end TEXT,
		admin_comment TEXT,
		resolved_at TEXT
	)
"#;

const ACCESS_LOGS: &str = r#"
	CREATE TABLE IF NOT EXISTS access_logs (
		log_id INTEGER PRIMARY KEY AUTOINCREMENT,
		employee_id TEXT NOT NULL,
		log_type TEXT NOT NULL CHECK (log_type IN ('authentication', 'file')),
		action TEXT NOT NULL,
		file_id TEXT,
		filename TEXT,
		latitude REAL,
		longitude REAL,
		wifi_ssid TEXT,
		success INTEGER NOT NULL,
		reason TEXT NOT NULL,
		timestamp TEXT NOT NULL
	)
"#;

const ACCESS_LOGS_EMPLOYEE_INDEX: &str =
	"CREATE INDEX IF NOT EXISTS idx_access_logs_employee ON access_logs(employee_id, timestamp)";

const ACCESS_LOGS_TIMESTAMP_INDEX: &str =
	"CREATE INDEX IF NOT EXISTS idx_access_logs_timestamp ON access_logs(timestamp)";

/// Creates every table and index the stores need.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for statement in [
		GEOFENCE_CONFIG,
		WFH_REQUESTS,
		ACCESS_LOGS,
		ACCESS_LOGS_EMPLOYEE_INDEX,
		ACCESS_LOGS_TIMESTAMP_INDEX,
	] {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("schema ready");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn test_migrations_are_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let tables: Vec<(String,)> = sqlx::query_as(
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
		)
		.fetch_all(&pool)
		.await
		.unwrap();
		let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
		assert_eq!(names, vec!["access_logs", "geofence_config", "wfh_requests"]);
	}
}
