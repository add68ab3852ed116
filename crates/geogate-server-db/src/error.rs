// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use geogate_core::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Storage unavailable: {0}")]
	Unavailable(String),

	#[error("Corrupt stored value: {0}")]
	Serialization(String),
}

impl DbError {
	/// True when the store itself failed, as opposed to rejecting the request.
	pub fn is_storage_failure(&self) -> bool {
		matches!(
			self,
			DbError::Database(_) | DbError::Unavailable(_) | DbError::Serialization(_)
		)
	}
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_storage_failure_classification() {
		assert!(DbError::Unavailable("closed".into()).is_storage_failure());
		assert!(DbError::Database(sqlx::Error::PoolClosed).is_storage_failure());
		assert!(!DbError::NotFound("x".into()).is_storage_failure());
		assert!(!DbError::Conflict("x".into()).is_storage_failure());
		assert!(!DbError::Validation(ValidationError::NonPositiveRadius).is_storage_failure());
	}
}
