// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation errors for policy and WFH window updates.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A rejected update. Raised before any state changes and surfaced to the
/// caller verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
	#[error("radius must be a positive number of meters")]
	NonPositiveRadius,

	#[error("daily window start {start} must be earlier than end {end}")]
	InvertedDailyWindow { start: String, end: String },

	#[error("invalid coordinate (latitude {latitude}, longitude {longitude})")]
	InvalidCoordinate { latitude: f64, longitude: f64 },

	#[error("allowed SSID must not be empty")]
	EmptySsid,

	#[error("invalid time of day '{0}', expected HH:MM")]
	InvalidTimeOfDay(String),

	#[error("access window end {end} must be after start {start}")]
	InvalidAccessWindow {
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	},

	#[error("invalid UTC offset of {0} minutes")]
	InvalidUtcOffset(i32),
}
