// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the geogate context-aware access control system.
//!
//! This crate is free of I/O. It provides:
//!
//! - [`GeofenceConfig`]: the admin-editable access policy
//! - [`WfhRequest`]: per-employee work-from-home records and their windows
//! - [`AccessContext`]: the physical context an employee submits
//! - [`evaluate`]: the decision engine producing a [`Decision`]
//! - [`AccessLogEntry`]: immutable audit records and their builder
//! - [`Clock`]: injectable server time
//!
//! # Example
//!
//! ```ignore
//! use geogate_core::{evaluate, AccessContext, GeofenceConfig};
//!
//! let config = GeofenceConfig::default();
//! let context = AccessContext::new("alice", clock.now())
//! 	.with_coordinates(Some(10.8505), Some(76.2711))
//! 	.with_ssid(Some("OfficeWiFi"));
//! let decision = evaluate(&context, &config, None);
//! ```

pub mod clock;
pub mod context;
pub mod decision;
pub mod error;
pub mod evaluation;
pub mod geo;
pub mod log;
pub mod policy;
pub mod wfh;

pub use clock::{offset_from_minutes, Clock, ManualClock, SystemClock};
pub use context::{AccessContext, EmployeeId};
pub use decision::{
	CheckKind, CheckResult, CheckStatus, Decision, DecisionChecks, ALL_CONDITIONS_MET_REASON,
	WFH_OVERRIDE_REASON,
};
pub use error::ValidationError;
pub use evaluation::evaluate;
pub use geo::{haversine_distance, GeoPoint, EARTH_RADIUS_METERS};
pub use log::{actions, AccessLogBuilder, AccessLogEntry, LogId, LogType, NewAccessLogEntry};
pub use policy::{format_time_of_day, parse_time_of_day, GeofenceConfig};
pub use wfh::{WfhRequest, WfhStatus, WfhWindow};
