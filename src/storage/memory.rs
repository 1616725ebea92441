//! In-memory storage implementations

use super::{OperationStore, Result, StorageError, SyncCursorStore};
use crate::history::{Operation, OperationWithContext};
use crate::sync::{CursorType, RemoteCursor};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// (document, scope, branch) key
type StreamKey = (String, String, String);

#[derive(Default)]
pub struct MemoryOperationStore {
	streams: RwLock<HashMap<StreamKey, Vec<Operation>>>,
}

impl MemoryOperationStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl OperationStore for MemoryOperationStore {
	async fn append(&self, operations: &[OperationWithContext]) -> Result<()> {
		let mut streams = self.streams.write().await;

		for op in operations {
			let key = (
				op.context.document_id.clone(),
				op.context.scope.clone(),
				op.context.branch.clone(),
			);
			let stream = streams.entry(key).or_default();
			let expected = stream.len() as u64;
			if op.operation.index != expected {
				return Err(StorageError::OutOfOrderAppend {
					document_id: op.context.document_id.clone(),
					scope: op.context.scope.clone(),
					branch: op.context.branch.clone(),
					got: op.operation.index,
					expected,
				});
			}
			stream.push(op.operation.clone());
		}

		Ok(())
	}

	async fn read(&self, document_id: &str, scope: &str, branch: &str) -> Result<Vec<Operation>> {
		let streams = self.streams.read().await;
		Ok(streams
			.get(&(
				document_id.to_string(),
				scope.to_string(),
				branch.to_string(),
			))
			.cloned()
			.unwrap_or_default())
	}
}

#[derive(Default)]
pub struct MemoryCursorStore {
	cursors: RwLock<HashMap<(String, CursorType), RemoteCursor>>,
}

impl MemoryCursorStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl SyncCursorStore for MemoryCursorStore {
	async fn upsert(&self, cursor: RemoteCursor) -> Result<()> {
		let mut cursors = self.cursors.write().await;
		cursors.insert((cursor.remote_name.clone(), cursor.cursor_type), cursor);
		Ok(())
	}

	async fn get(&self, remote_name: &str, cursor_type: CursorType) -> Result<Option<RemoteCursor>> {
		let cursors = self.cursors.read().await;
		Ok(cursors.get(&(remote_name.to_string(), cursor_type)).cloned())
	}

	async fn list(&self) -> Result<Vec<RemoteCursor>> {
		let cursors = self.cursors.read().await;
		let mut all: Vec<RemoteCursor> = cursors.values().cloned().collect();
		all.sort_by(|a, b| a.remote_name.cmp(&b.remote_name));
		Ok(all)
	}
}
