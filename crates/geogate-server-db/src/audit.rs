// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The append-only access log.
//!
//! There is deliberately no update or delete. Ids are allocated by the
//! store and are unique and strictly increasing in append order.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geogate_core::{AccessLogEntry, EmployeeId, GeoPoint, LogId, LogType, NewAccessLogEntry};
use sqlx::{sqlite::SqlitePool, QueryBuilder, Row, Sqlite};
use tokio::sync::RwLock;

use crate::error::{DbError, Result};
use crate::time;

/// Cap on entries returned for the raw log display.
pub const MAX_DISPLAY_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogOrder {
	/// Ascending log id.
	#[default]
	Insertion,
	/// Descending timestamp, ties broken by descending log id.
	NewestFirst,
}

/// Query over the access log. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessLogFilter {
	pub employee_id: Option<EmployeeId>,
	pub log_type: Option<LogType>,
	pub success: Option<bool>,
	/// Inclusive lower bound.
	pub from: Option<DateTime<Utc>>,
	/// Inclusive upper bound.
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<usize>,
	pub offset: Option<usize>,
	pub order: LogOrder,
}

impl AccessLogFilter {
	pub fn all() -> Self {
		Self::default()
	}

	/// The admin's raw log view.
	pub fn display() -> Self {
		Self {
			limit: Some(MAX_DISPLAY_ENTRIES),
			order: LogOrder::NewestFirst,
			..Self::default()
		}
	}

	pub fn for_employee(employee_id: impl Into<EmployeeId>) -> Self {
		Self {
			employee_id: Some(employee_id.into()),
			..Self::default()
		}
	}

	pub fn matches(&self, entry: &AccessLogEntry) -> bool {
		self.employee_id
			.as_ref()
			.is_none_or(|id| &entry.employee_id == id)
			&& self.log_type.is_none_or(|t| entry.log_type == t)
			&& self.success.is_none_or(|s| entry.success == s)
			&& self.from.is_none_or(|from| entry.timestamp >= from)
			&& self.to.is_none_or(|to| entry.timestamp <= to)
	}
}

#[async_trait]
pub trait AuditLog: Send + Sync {
	/// Fails only when storage is unavailable.
	async fn append(&self, entry: NewAccessLogEntry) -> Result<LogId>;

	/// A point-in-time snapshot of matching entries.
	async fn query(&self, filter: &AccessLogFilter) -> Result<Vec<AccessLogEntry>>;
}

pub struct SqliteAuditLog {
	pool: SqlitePool,
}

impl SqliteAuditLog {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AccessLogEntry> {
	let log_type: String = row.get("log_type");
	let employee_id: String = row.get("employee_id");
	let timestamp: String = row.get("timestamp");
	let success: i64 = row.get("success");
	Ok(AccessLogEntry {
		log_id: LogId(row.get("log_id")),
		employee_id: EmployeeId::new(employee_id),
		log_type: log_type.parse().map_err(DbError::Serialization)?,
		action: row.get("action"),
		file_id: row.get("file_id"),
		filename: row.get("filename"),
		location: GeoPoint::from_parts(row.get("latitude"), row.get("longitude")),
		wifi_ssid: row.get("wifi_ssid"),
		success: success != 0,
		reason: row.get("reason"),
		timestamp: time::decode("timestamp", &timestamp)?,
	})
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AccessLogFilter) {
	builder.push(" WHERE 1=1");
	if let Some(id) = &filter.employee_id {
		builder.push(" AND employee_id = ").push_bind(id.as_str().to_string());
	}
	if let Some(log_type) = filter.log_type {
		builder.push(" AND log_type = ").push_bind(log_type.to_string());
	}
	if let Some(success) = filter.success {
		builder.push(" AND success = ").push_bind(i64::from(success));
	}
	if let Some(from) = filter.from {
		builder.push(" AND timestamp >= ").push_bind(time::encode(from));
	}
	if let Some(to) = filter.to {
		builder.push(" AND timestamp <= ").push_bind(time::encode(to));
	}
	match filter.order {
		LogOrder::Insertion => builder.push(" ORDER BY log_id ASC"),
		LogOrder::NewestFirst => builder.push(" ORDER BY timestamp DESC, log_id DESC"),
	};
	// SQLite needs a LIMIT before OFFSET; -1 means unbounded.
	let limit = filter
		.limit
		.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
	let offset = filter
		.offset
		.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
	builder
		.push(" LIMIT ")
		.push_bind(limit)
		.push(" OFFSET ")
		.push_bind(offset);
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
	#[tracing::instrument(
		skip(self, entry),
		fields(
			employee_id = %entry.employee_id,
			log_type = %entry.log_type,
			success = entry.success
		)
	)]
	async fn append(&self, entry: NewAccessLogEntry) -> Result<LogId> {
		let (latitude, longitude) = entry
			.location
			.map_or((None, None), |p| (Some(p.latitude), Some(p.longitude)));

		let row = sqlx::query(
			r#"
			INSERT INTO access_logs
				(employee_id, log_type, action, file_id, filename, latitude, longitude, wifi_ssid, success, reason, timestamp)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			RETURNING log_id
			"#,
		)
		.bind(entry.employee_id.as_str())
		.bind(entry.log_type.to_string())
		.bind(&entry.action)
		.bind(&entry.file_id)
		.bind(&entry.filename)
		.bind(latitude)
		.bind(longitude)
		.bind(&entry.wifi_ssid)
		.bind(i64::from(entry.success))
		.bind(&entry.reason)
		.bind(time::encode(entry.timestamp))
		.fetch_one(&self.pool)
		.await
		.inspect_err(|e| tracing::error!(error = %e, "failed to append access log entry"))?;

		let log_id = LogId(row.get("log_id"));
		tracing::debug!(%log_id, "access log entry appended");
		Ok(log_id)
	}

	#[tracing::instrument(skip(self))]
	async fn query(&self, filter: &AccessLogFilter) -> Result<Vec<AccessLogEntry>> {
		let mut builder = QueryBuilder::<Sqlite>::new(
			"SELECT log_id, employee_id, log_type, action, file_id, filename, latitude, longitude, \
			 wifi_ssid, success, reason, timestamp FROM access_logs",
		);
		push_filter(&mut builder, filter);

		let rows = builder.build().fetch_all(&self.pool).await?;
		rows.iter().map(row_to_entry).collect()
	}
}

/// Process-local access log.
///
/// Ids are allocated under the write lock, so concurrent appends never
/// share an id. `close` simulates storage going away.
#[derive(Default)]
pub struct InMemoryAuditLog {
	entries: RwLock<Vec<AccessLogEntry>>,
	closed: AtomicBool,
}

impl InMemoryAuditLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subsequent appends and queries fail with [`DbError::Unavailable`].
	pub fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}

	fn check_open(&self) -> Result<()> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(DbError::Unavailable("audit log is closed".to_string()));
		}
		Ok(())
	}
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
	async fn append(&self, entry: NewAccessLogEntry) -> Result<LogId> {
		self.check_open()?;
		let mut entries = self.entries.write().await;
		let next = entries.last().map_or(1, |e| e.log_id.0 + 1);
		let log_id = LogId(next);
		entries.push(entry.with_id(log_id));
		Ok(log_id)
	}

	async fn query(&self, filter: &AccessLogFilter) -> Result<Vec<AccessLogEntry>> {
		self.check_open()?;
		let mut matched: Vec<AccessLogEntry> = self
			.entries
			.read()
			.await
			.iter()
			.filter(|e| filter.matches(e))
			.cloned()
			.collect();

		if filter.order == LogOrder::NewestFirst {
			matched.sort_by(|a, b| {
				b.timestamp
					.cmp(&a.timestamp)
					.then_with(|| b.log_id.cmp(&a.log_id))
			});
		}

		Ok(matched
			.into_iter()
			.skip(filter.offset.unwrap_or(0))
			.take(filter.limit.unwrap_or(usize::MAX))
			.collect())
	}
}
