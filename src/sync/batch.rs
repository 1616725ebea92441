//! Batch aggregator
//!
//! Coalesces per-job write-ready events into release units. Jobs submitted
//! together share a `batch_id` and are held back until every expected job
//! has arrived (or one of them fails), so multi-job submissions reach the
//! sync path as one causally ordered batch.

use crate::events::{JobFailedEvent, JobWriteReadyEvent};
use crate::jobs::JobId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

/// Receives released batches, e.g. the sync manager dispatching them to
/// remotes.
#[async_trait]
pub trait BatchSink: Send + Sync {
	async fn on_batch_ready(&self, batch: PreparedBatch) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
	pub event: JobWriteReadyEvent,
	/// Ordered prior job ids within the same batch this entry causally
	/// depends on. Empty for single-entry batches.
	pub job_dependencies: Vec<JobId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedBatch {
	/// documentId -> collection ids, unioned across the batch's events.
	pub collection_memberships: BTreeMap<String, Vec<String>>,
	pub entries: Vec<BatchEntry>,
}

struct PendingBatch {
	expected_job_ids: HashSet<JobId>,
	arrived_job_ids: HashSet<JobId>,
	events: Vec<JobWriteReadyEvent>,
}

#[derive(Default)]
struct AggregatorState {
	queue: VecDeque<JobWriteReadyEvent>,
	draining: bool,
	pending: HashMap<String, PendingBatch>,
}

pub struct BatchAggregator {
	sink: Arc<dyn BatchSink>,
	state: Mutex<AggregatorState>,
}

impl BatchAggregator {
	pub fn new(sink: Arc<dyn BatchSink>) -> Self {
		Self {
			sink,
			state: Mutex::new(AggregatorState::default()),
		}
	}

	/// Ingest one write-ready event.
	///
	/// Events are serialized through a FIFO queue with a re-entrancy
	/// guard: if a drain is already running this call only appends and
	/// returns, the running drain picks the event up. A failure processing
	/// one event is logged and does not stop the drain.
	pub async fn enqueue_write_ready(&self, event: JobWriteReadyEvent) {
		{
			let mut state = self.lock();
			state.queue.push_back(event);
			if state.draining {
				return;
			}
			state.draining = true;
		}

		loop {
			let next = {
				let mut state = self.lock();
				match state.queue.pop_front() {
					Some(event) => Some(event),
					None => {
						state.draining = false;
						None
					}
				}
			};
			let Some(event) = next else { break };

			if let Some(events) = self.accept(event) {
				self.release(events).await;
			}
		}
	}

	/// A failed job can never complete its batch; release whatever has
	/// arrived so far instead of waiting forever.
	pub async fn handle_job_failed(&self, event: &JobFailedEvent) {
		let Some(batch_id) = &event.batch_id else {
			return;
		};

		let released = {
			let mut state = self.lock();
			state.pending.remove(batch_id)
		};

		if let Some(pending) = released {
			warn!(
				batch_id = %batch_id,
				failed_job = %event.job_id,
				arrived = pending.arrived_job_ids.len(),
				expected = pending.expected_job_ids.len(),
				"releasing partial batch after job failure"
			);
			if !pending.events.is_empty() {
				self.release(pending.events).await;
			}
		}
	}

	/// Discard pending batches and queued events. An event currently being
	/// drained finishes on its own.
	pub fn clear(&self) {
		let mut state = self.lock();
		state.queue.clear();
		state.pending.clear();
	}

	pub fn pending_batch_count(&self) -> usize {
		self.lock().pending.len()
	}

	/// Route one event; returns the events of a batch that became ready.
	fn accept(&self, event: JobWriteReadyEvent) -> Option<Vec<JobWriteReadyEvent>> {
		if event.meta.batch_job_ids.len() <= 1 {
			return Some(vec![event]);
		}

		let mut state = self.lock();
		let batch_id = event.meta.batch_id.clone();
		let pending = state
			.pending
			.entry(batch_id.clone())
			.or_insert_with(|| PendingBatch {
				expected_job_ids: event.meta.batch_job_ids.iter().copied().collect(),
				arrived_job_ids: HashSet::new(),
				events: Vec::new(),
			});

		pending.arrived_job_ids.insert(event.job_id);
		pending.events.push(event);

		if pending.arrived_job_ids.len() >= pending.expected_job_ids.len() {
			let pending = state.pending.remove(&batch_id)?;
			debug!(batch_id = %batch_id, jobs = pending.events.len(), "batch complete");
			Some(pending.events)
		} else {
			None
		}
	}

	async fn release(&self, events: Vec<JobWriteReadyEvent>) {
		let batch = prepare_batch(events);
		if let Err(sink_error) = self.sink.on_batch_ready(batch).await {
			error!(error = %sink_error, "batch sink failed");
		}
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, AggregatorState> {
		self.state
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

/// Build the release unit: union the collection hints and record, per
/// entry, the ordered prior job ids already placed into the batch.
pub fn prepare_batch(events: Vec<JobWriteReadyEvent>) -> PreparedBatch {
	let mut collection_memberships: BTreeMap<String, Vec<String>> = BTreeMap::new();
	for event in &events {
		for (document_id, collections) in &event.meta.collections {
			let entry = collection_memberships
				.entry(document_id.clone())
				.or_default();
			for collection in collections {
				if !entry.contains(collection) {
					entry.push(collection.clone());
				}
			}
		}
	}

	let multi_job = events.len() > 1;
	let mut placed: Vec<JobId> = Vec::new();
	let entries = events
		.into_iter()
		.map(|event| {
			let job_dependencies = if multi_job { placed.clone() } else { Vec::new() };
			placed.push(event.job_id);
			BatchEntry {
				event,
				job_dependencies,
			}
		})
		.collect();

	PreparedBatch {
		collection_memberships,
		entries,
	}
}
