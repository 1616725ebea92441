//! Operation log errors

use super::types::IntegrityIssue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
	/// An incoming operation collides with a different operation already
	/// occupying its index. Non-retryable; the caller must re-fetch and
	/// reconcile via branch attachment or an offline merge.
	#[error("Tried to add operation with index {incoming_index} and document is at index {document_index}")]
	Conflict {
		incoming_index: u64,
		document_index: i64,
	},

	/// An operation sequence violates index/skip contiguity.
	#[error("operation sequence failed integrity check with {} issue(s)", .0.len())]
	IntegrityViolation(Vec<IntegrityIssue>),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
