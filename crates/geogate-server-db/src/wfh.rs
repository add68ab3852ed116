// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-employee work-from-home records.
//!
//! Each employee has at most one record. Lifecycle:
//!
//! - `submit` creates a pending record, replacing a resolved one; it is a
//!   conflict while a request is still pending
//! - `approve` and `reject` apply only to a pending record

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geogate_core::{EmployeeId, WfhRequest, WfhStatus, WfhWindow};
use sqlx::{sqlite::SqlitePool, Row};
use tokio::sync::RwLock;

use crate::error::{DbError, Result};
use crate::time;

pub(crate) const ALREADY_PENDING: &str = "a WFH request is already pending";
pub(crate) const NOT_PENDING: &str = "request not found or already processed";

#[async_trait]
pub trait WfhStore: Send + Sync {
	/// `None` means no override can apply.
	async fn get(&self, employee_id: &EmployeeId) -> Result<Option<WfhRequest>>;

	async fn submit(
		&self,
		employee_id: &EmployeeId,
		reason: &str,
		requested_at: DateTime<Utc>,
	) -> Result<WfhRequest>;

	async fn approve(
		&self,
		employee_id: &EmployeeId,
		window: WfhWindow,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Result<WfhRequest>;

	async fn reject(
		&self,
		employee_id: &EmployeeId,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Result<WfhRequest>;

	/// All records, newest request first.
	async fn list(&self) -> Result<Vec<WfhRequest>>;
}

pub struct SqliteWfhStore {
	pool: SqlitePool,
}

impl SqliteWfhStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

const SELECT_COLUMNS: &str = "employee_id, reason, status, requested_at, access_start, access_end, admin_comment, resolved_at";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<WfhRequest> {
	let employee_id: String = row.get("employee_id");
	let status: String = row.get("status");
	let requested_at: String = row.get("requested_at");
	Ok(WfhRequest {
		employee_id: EmployeeId::new(employee_id),
		reason: row.get("reason"),
		status: status.parse().map_err(DbError::Serialization)?,
		requested_at: time::decode("requested_at", &requested_at)?,
		access_start: time::decode_opt("access_start", row.get("access_start"))?,
		access_end: time::decode_opt("access_end", row.get("access_end"))?,
		admin_comment: row.get("admin_comment"),
		resolved_at: time::decode_opt("resolved_at", row.get("resolved_at"))?,
	})
}

#[async_trait]
impl WfhStore for SqliteWfhStore {
	#[tracing::instrument(skip(self), fields(employee_id = %employee_id))]
	async fn get(&self, employee_id: &EmployeeId) -> Result<Option<WfhRequest>> {
		let sql = format!("SELECT {SELECT_COLUMNS} FROM wfh_requests WHERE employee_id = ?");
		let row = sqlx::query(&sql)
			.bind(employee_id.as_str())
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(row_to_request).transpose()
	}

	#[tracing::instrument(skip(self, reason), fields(employee_id = %employee_id))]
	async fn submit(
		&self,
		employee_id: &EmployeeId,
		reason: &str,
		requested_at: DateTime<Utc>,
	) -> Result<WfhRequest> {
		let request = WfhRequest::pending(employee_id.clone(), reason, requested_at);

		// The WHERE on the upsert keeps a pending record intact; zero rows
		// affected means the employee already has one.
		let affected = sqlx::query(
			r#"
			INSERT INTO wfh_requests
				(employee_id, reason, status, requested_at, access_start, access_end, admin_comment, resolved_at)
			VALUES (?, ?, 'pending', ?, NULL, NULL, NULL, NULL)
			ON CONFLICT(employee_id) DO UPDATE SET
				reason = excluded.reason,
				status = 'pending',
				requested_at = excluded.requested_at,
				access_start = NULL,
				access_end = NULL,
				admin_comment = NULL,
				resolved_at = NULL
			WHERE wfh_requests.status != 'pending'
			"#,
		)
		.bind(employee_id.as_str())
		.bind(&request.reason)
		.bind(time::encode(requested_at))
		.execute(&self.pool)
		.await?
		.rows_affected();

		if affected == 0 {
			return Err(DbError::Conflict(ALREADY_PENDING.to_string()));
		}
		tracing::info!("WFH request submitted");
		Ok(request)
	}

	#[tracing::instrument(skip(self, comment), fields(employee_id = %employee_id))]
	async fn approve(
		&self,
		employee_id: &EmployeeId,
		window: WfhWindow,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Result<WfhRequest> {
		let sql = format!(
			r#"
			UPDATE wfh_requests
			SET status = 'approved', access_start = ?, access_end = ?, admin_comment = ?, resolved_at = ?
			WHERE employee_id = ? AND status = 'pending'
			RETURNING {SELECT_COLUMNS}
			"#
		);
		let row = sqlx::query(&sql)
			.bind(time::encode(window.access_start))
			.bind(time::encode(window.access_end))
			.bind(comment)
			.bind(time::encode(resolved_at))
			.bind(employee_id.as_str())
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(NOT_PENDING.to_string()))?;

		tracing::info!(
			access_start = %window.access_start,
			access_end = %window.access_end,
			"WFH request approved"
		);
		row_to_request(&row)
	}

	#[tracing::instrument(skip(self, comment), fields(employee_id = %employee_id))]
	async fn reject(
		&self,
		employee_id: &EmployeeId,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Result<WfhRequest> {
		let sql = format!(
			r#"
			UPDATE wfh_requests
			SET status = 'rejected', access_start = NULL, access_end = NULL, admin_comment = ?, resolved_at = ?
			WHERE employee_id = ? AND status = 'pending'
			RETURNING {SELECT_COLUMNS}
			"#
		);
		let row = sqlx::query(&sql)
			.bind(comment)
			.bind(time::encode(resolved_at))
			.bind(employee_id.as_str())
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(NOT_PENDING.to_string()))?;

		tracing::info!("WFH request rejected");
		row_to_request(&row)
	}

	#[tracing::instrument(skip(self))]
	async fn list(&self) -> Result<Vec<WfhRequest>> {
		let sql = format!(
			"SELECT {SELECT_COLUMNS} FROM wfh_requests ORDER BY requested_at DESC, employee_id ASC"
		);
		let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
		rows.iter().map(row_to_request).collect()
	}
}

/// Process-local WFH store.
#[derive(Default)]
pub struct InMemoryWfhStore {
	records: RwLock<HashMap<EmployeeId, WfhRequest>>,
}

impl InMemoryWfhStore {
	pub fn new() -> Self {
		Self::default()
	}

	async fn resolve(
		&self,
		employee_id: &EmployeeId,
		transition: impl FnOnce(WfhRequest) -> WfhRequest + Send,
	) -> Result<WfhRequest> {
		let mut records = self.records.write().await;
		let slot = records
			.get_mut(employee_id)
			.filter(|r| r.is_pending())
			.ok_or_else(|| DbError::NotFound(NOT_PENDING.to_string()))?;
		*slot = transition(slot.clone());
		Ok(slot.clone())
	}
}

#[async_trait]
impl WfhStore for InMemoryWfhStore {
	async fn get(&self, employee_id: &EmployeeId) -> Result<Option<WfhRequest>> {
		Ok(self.records.read().await.get(employee_id).cloned())
	}

	async fn submit(
		&self,
		employee_id: &EmployeeId,
		reason: &str,
		requested_at: DateTime<Utc>,
	) -> Result<WfhRequest> {
		let mut records = self.records.write().await;
		if records.get(employee_id).is_some_and(|r| r.is_pending()) {
			return Err(DbError::Conflict(ALREADY_PENDING.to_string()));
		}
		let request = WfhRequest::pending(employee_id.clone(), reason, requested_at);
		records.insert(employee_id.clone(), request.clone());
		Ok(request)
	}

	async fn approve(
		&self,
		employee_id: &EmployeeId,
		window: WfhWindow,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Result<WfhRequest> {
		self.resolve(employee_id, move |r| r.approved(window, comment, resolved_at))
			.await
	}

	async fn reject(
		&self,
		employee_id: &EmployeeId,
		comment: Option<String>,
		resolved_at: DateTime<Utc>,
	) -> Result<WfhRequest> {
		self.resolve(employee_id, move |r| r.rejected(comment, resolved_at))
			.await
	}

	async fn list(&self) -> Result<Vec<WfhRequest>> {
		let mut all: Vec<WfhRequest> = self.records.read().await.values().cloned().collect();
		all.sort_by(|a, b| {
			b.requested_at
				.cmp(&a.requested_at)
				.then_with(|| a.employee_id.cmp(&b.employee_id))
		});
		Ok(all)
	}
}
