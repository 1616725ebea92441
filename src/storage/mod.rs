//! Storage collaborator traits
//!
//! The physical engines live outside this crate; these traits are the
//! seams they plug into. The in-memory implementations back tests and
//! single-process embeddings.

mod memory;

pub use memory::{MemoryCursorStore, MemoryOperationStore};

use crate::history::{Operation, OperationWithContext};
use crate::sync::{CursorType, RemoteCursor};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
	/// An append landed out of order for its document scope
	#[error("out-of-order append for {document_id}/{scope}/{branch}: got index {got}, expected {expected}")]
	OutOfOrderAppend {
		document_id: String,
		scope: String,
		branch: String,
		got: u64,
		expected: u64,
	},

	/// The backing engine failed
	#[error("storage backend error: {0}")]
	Backend(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Append-only operation log.
#[async_trait]
pub trait OperationStore: Send + Sync {
	/// Durably append operations; each must extend its scope's sequence
	/// contiguously.
	async fn append(&self, operations: &[OperationWithContext]) -> Result<()>;

	/// Operations for one document scope on one branch, in index order.
	async fn read(&self, document_id: &str, scope: &str, branch: &str) -> Result<Vec<Operation>>;
}

/// Persistence for per-remote sync cursors.
#[async_trait]
pub trait SyncCursorStore: Send + Sync {
	async fn upsert(&self, cursor: RemoteCursor) -> Result<()>;
	async fn get(&self, remote_name: &str, cursor_type: CursorType) -> Result<Option<RemoteCursor>>;
	async fn list(&self) -> Result<Vec<RemoteCursor>>;
}
