// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use geogate_core::ValidationError;
use geogate_server_db::DbError;

use crate::store::FileStoreError;

/// Failures of an access service call. A denied decision is not an error.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// The audit log, a store, or file storage failed. Fatal to the request
	/// and not retried here.
	#[error("storage unavailable: {0}")]
	StorageUnavailable(String),

	#[error("file not found: {0}")]
	FileNotFound(String),

	/// WFH lifecycle rule violated: a request is already pending, or there
	/// is no pending request to resolve.
	#[error("{0}")]
	Wfh(String),
}

impl From<DbError> for GatewayError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::Validation(v) => GatewayError::Validation(v),
			DbError::Conflict(m) | DbError::NotFound(m) => GatewayError::Wfh(m),
			other => GatewayError::StorageUnavailable(other.to_string()),
		}
	}
}

impl From<FileStoreError> for GatewayError {
	fn from(e: FileStoreError) -> Self {
		match e {
			FileStoreError::NotFound(id) | FileStoreError::InvalidId(id) => {
				GatewayError::FileNotFound(id)
			}
			other => GatewayError::StorageUnavailable(other.to_string()),
		}
	}
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn db_errors_map_by_kind() {
		assert!(matches!(
			GatewayError::from(DbError::Conflict("pending".into())),
			GatewayError::Wfh(_)
		));
		assert!(matches!(
			GatewayError::from(DbError::Unavailable("closed".into())),
			GatewayError::StorageUnavailable(_)
		));
		assert!(matches!(
			GatewayError::from(DbError::Validation(ValidationError::EmptySsid)),
			GatewayError::Validation(ValidationError::EmptySsid)
		));
	}

	#[test]
	fn validation_message_is_verbatim() {
		let err = GatewayError::from(ValidationError::NonPositiveRadius);
		assert_eq!(err.to_string(), "radius must be a positive number of meters");
	}
}
