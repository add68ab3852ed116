// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server time source.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

use crate::error::ValidationError;

/// Current server time in the reference offset used for daily windows.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock expressed in a fixed reference offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
	offset: FixedOffset,
}

impl SystemClock {
	pub fn new(offset: FixedOffset) -> Self {
		Self { offset }
	}

	pub fn offset(&self) -> FixedOffset {
		self.offset
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new(Utc.fix())
	}
}

impl Clock for SystemClock {
	fn now(&self) -> DateTime<FixedOffset> {
		Utc::now().with_timezone(&self.offset)
	}
}

/// A clock that only moves when told to. Used in tests.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
	pub fn new(now: DateTime<FixedOffset>) -> Self {
		Self {
			now: Mutex::new(now),
		}
	}

	pub fn set(&self, now: DateTime<FixedOffset>) {
		*self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
		*now += by;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<FixedOffset> {
		*self.now.lock().unwrap_or_else(|e| e.into_inner())
	}
}

/// Converts a configured offset in minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, ValidationError> {
	minutes
		.checked_mul(60)
		.and_then(FixedOffset::east_opt)
		.ok_or(ValidationError::InvalidUtcOffset(minutes))
}
