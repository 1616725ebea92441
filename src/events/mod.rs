//! Event bus for state changes
//!
//! Broadcast-based: emitters never block, and subscribers that lag simply
//! miss events. Payloads are owned and cloneable so they can fan out to
//! any number of receivers.

use crate::history::OperationWithContext;
use crate::jobs::{JobId, JobMeta};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A job's operations are durably appended and ready for sync dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobWriteReadyEvent {
	pub job_id: JobId,
	pub meta: JobMeta,
	pub operations: Vec<OperationWithContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailedEvent {
	pub job_id: JobId,
	pub batch_id: Option<String>,
	pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPendingEvent {
	pub job_id: JobId,
	pub sync_operation_count: usize,
	pub remote_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSucceededEvent {
	pub job_id: JobId,
	pub sync_operation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
	pub remote_name: String,
	pub document_id: String,
	pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailedEvent {
	pub job_id: JobId,
	pub success_count: usize,
	pub failure_count: usize,
	pub errors: Vec<SyncFailure>,
}

/// All events that can be emitted by the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
	/// Operations were appended for a document scope on a branch
	OperationsWritten {
		document_id: String,
		scope: String,
		branch: String,
		latest_index: u64,
	},
	JobWriteReady(JobWriteReadyEvent),
	JobFailed(JobFailedEvent),
	SyncPending(SyncPendingEvent),
	SyncSucceeded(SyncSucceededEvent),
	SyncFailed(SyncFailedEvent),
}

/// Event bus for broadcasting state changes
pub struct EventBus {
	sender: broadcast::Sender<Event>,
}

impl EventBus {
	/// Create a new event bus with the specified capacity
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event to all subscribers. Send errors only mean there are
	/// no subscribers, which is fine.
	pub fn emit(&self, event: Event) {
		let _ = self.sender.send(event);
	}

	/// Subscribe to events
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.sender.subscribe()
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1024)
	}
}
