// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use dealroom_server_db::DbError;

/// Error taxonomy for access operations.
///
/// Variants carry rendered messages rather than source errors so results can
/// be cloned and handed to every waiter of a shared load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Transient: {0}")]
	Transient(String),

	#[error("Invariant violation: {0}")]
	InvariantViolation(String),
}

impl AccessError {
	/// Returns true if the operation may succeed on retry.
	pub fn is_retryable(&self) -> bool {
		matches!(self, AccessError::Transient(_))
	}
}

impl From<DbError> for AccessError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::NotFound(msg) => AccessError::NotFound(msg),
			DbError::Conflict(msg) => AccessError::InvariantViolation(msg),
			DbError::Internal(msg) => AccessError::InvariantViolation(msg),
			DbError::Serialization(e) => {
				AccessError::InvariantViolation(format!("Stored payload: {e}"))
			}
			DbError::Sqlx(e) => match e {
				sqlx::Error::RowNotFound => AccessError::NotFound("Row not found".to_string()),
				sqlx::Error::Database(db) => {
					if db.is_unique_violation()
						|| db.is_foreign_key_violation()
						|| db.is_check_violation()
					{
						AccessError::InvariantViolation(db.to_string())
					} else {
						AccessError::Transient(db.to_string())
					}
				}
				other => AccessError::Transient(other.to_string()),
			},
		}
	}
}

pub type Result<T> = std::result::Result<T, AccessError>;
