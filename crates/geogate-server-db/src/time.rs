// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Timestamp columns are fixed-width RFC 3339 in UTC so that text ordering
//! matches time ordering.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DbError, Result};

pub(crate) fn encode(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode(column: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Serialization(format!("{column} '{value}': {e}")))
}

pub(crate) fn decode_opt(column: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
	value.map(|v| decode(column, &v)).transpose()
}
