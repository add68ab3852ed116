// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the geogate server.
//!
//! Each store is a trait with a SQLite implementation and a process-local
//! in-memory implementation:
//!
//! - [`GeofenceConfigStore`]: the singleton access policy
//! - [`WfhStore`]: per-employee work-from-home records
//! - [`AuditLog`]: the append-only access log

pub mod audit;
pub mod config;
pub mod error;
pub mod pool;
pub mod schema;
pub mod testing;
mod time;
pub mod wfh;

pub use audit::{
	AccessLogFilter, AuditLog, InMemoryAuditLog, LogOrder, SqliteAuditLog, MAX_DISPLAY_ENTRIES,
};
pub use config::{GeofenceConfigStore, InMemoryGeofenceConfigStore, SqliteGeofenceConfigStore};
pub use error::{DbError, Result};
pub use pool::create_pool;
pub use schema::run_migrations;
pub use wfh::{InMemoryWfhStore, SqliteWfhStore, WfhStore};
