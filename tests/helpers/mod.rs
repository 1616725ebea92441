//! Shared builders and doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docsync_core::events::JobWriteReadyEvent;
use docsync_core::history::{Action, Operation, OperationContext, OperationWithContext};
use docsync_core::jobs::{JobId, JobMeta};
use docsync_core::sync::{BatchSink, EnvelopeTransport, PreparedBatch, SyncEnvelope};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn op(index: u64, skip: u64) -> Operation {
	Operation {
		id: Uuid::new_v4().to_string(),
		index,
		skip,
		hash: format!("hash-{index}"),
		timestamp_utc_ms: "2026-08-01T12:00:00+00:00".to_string(),
		action: Action {
			id: Uuid::new_v4().to_string(),
			kind: "update".to_string(),
			scope: "global".to_string(),
			input: serde_json::json!({}),
		},
		error: None,
	}
}

pub fn op_with_context(
	document_id: &str,
	scope: &str,
	branch: &str,
	index: u64,
	ordinal: u64,
) -> OperationWithContext {
	OperationWithContext {
		operation: op(index, 0),
		context: OperationContext {
			document_id: document_id.to_string(),
			document_type: "note".to_string(),
			scope: scope.to_string(),
			branch: branch.to_string(),
			ordinal,
		},
	}
}

pub fn write_ready_event(
	batch_id: &str,
	batch_job_ids: Vec<JobId>,
	job_id: JobId,
	operations: Vec<OperationWithContext>,
) -> JobWriteReadyEvent {
	JobWriteReadyEvent {
		job_id,
		meta: JobMeta {
			batch_id: batch_id.to_string(),
			batch_job_ids,
			collections: BTreeMap::new(),
		},
		operations,
	}
}

/// Transport double recording every envelope it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
	pub sent: Mutex<Vec<SyncEnvelope>>,
}

impl RecordingTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn sent(&self) -> Vec<SyncEnvelope> {
		self.sent.lock().unwrap().clone()
	}
}

#[async_trait]
impl EnvelopeTransport for RecordingTransport {
	async fn send(&self, envelope: SyncEnvelope) -> anyhow::Result<()> {
		self.sent.lock().unwrap().push(envelope);
		Ok(())
	}
}

/// Transport double failing every send with a fixed message.
pub struct FailingTransport {
	pub message: String,
}

impl FailingTransport {
	pub fn new(message: &str) -> Arc<Self> {
		Arc::new(Self {
			message: message.to_string(),
		})
	}
}

#[async_trait]
impl EnvelopeTransport for FailingTransport {
	async fn send(&self, _envelope: SyncEnvelope) -> anyhow::Result<()> {
		Err(anyhow::anyhow!("{}", self.message))
	}
}

/// Batch sink double recording released batches, optionally failing.
#[derive(Default)]
pub struct RecordingSink {
	pub batches: Mutex<Vec<PreparedBatch>>,
	pub fail: Mutex<bool>,
}

impl RecordingSink {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn batches(&self) -> Vec<PreparedBatch> {
		self.batches.lock().unwrap().clone()
	}

	pub fn set_failing(&self, fail: bool) {
		*self.fail.lock().unwrap() = fail;
	}
}

#[async_trait]
impl BatchSink for RecordingSink {
	async fn on_batch_ready(&self, batch: PreparedBatch) -> anyhow::Result<()> {
		if *self.fail.lock().unwrap() {
			return Err(anyhow::anyhow!("sink rejected the batch"));
		}
		self.batches.lock().unwrap().push(batch);
		Ok(())
	}
}

/// Let spawned tasks on the current-thread runtime run to completion.
pub async fn settle() {
	for _ in 0..16 {
		tokio::task::yield_now().await;
	}
}
