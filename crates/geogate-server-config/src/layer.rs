// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::sections::{
	AnomalyConfigLayer, DatabaseConfigLayer, FilesConfigLayer, LoggingConfigLayer,
	PolicyConfigLayer,
};

/// One partially specified configuration, as produced by a single source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfigLayer {
	pub database: Option<DatabaseConfigLayer>,
	pub files: Option<FilesConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub policy: Option<PolicyConfigLayer>,
	pub anomaly: Option<AnomalyConfigLayer>,
}

impl ServerConfigLayer {
	/// Overlays `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.files, other.files, FilesConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.policy, other.policy, PolicyConfigLayer::merge);
		merge_section(&mut self.anomaly, other.anomaly, AnomalyConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(b), Some(o)) => merge(b, o),
		(None, Some(o)) => *base = Some(o),
		(_, None) => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_fills_missing_sections() {
		let mut base = ServerConfigLayer::default();
		let overlay = ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite::memory:".to_string()),
			}),
			..Default::default()
		};
		base.merge(overlay);
		assert_eq!(
			base.database.unwrap().url.as_deref(),
			Some("sqlite::memory:")
		);
	}

	#[test]
	fn merge_keeps_base_fields_not_in_overlay() {
		let mut base = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".to_string()),
				format: None,
			}),
			..Default::default()
		};
		let overlay = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: None,
				format: Some(crate::sections::LogFormat::Json),
			}),
			..Default::default()
		};
		base.merge(overlay);
		let logging = base.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert_eq!(logging.format, Some(crate::sections::LogFormat::Json));
	}
}
