//! Sync manager
//!
//! Owns the configured remotes and fans released batches out to their
//! channels: operations are filtered per remote, grouped per document and
//! branch, wrapped into sync operations and queued on the remote's outbox.
//! Terminal sync-operation outcomes aggregate back into per-job success or
//! failure events on the bus.

use super::batch::{BatchSink, PreparedBatch};
use super::channel::Channel;
use super::envelope::{batch_operations_by_document, filter_operations, RemoteFilter};
use super::error::ChannelError;
use super::operation::{SyncOperation, SyncOperationStatus};
use crate::events::{
	Event, EventBus, SyncFailedEvent, SyncFailure, SyncPendingEvent, SyncSucceededEvent,
};
use crate::jobs::JobId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SyncManagerError {
	#[error("remote '{0}' is already registered")]
	DuplicateRemote(String),

	#[error("remote '{0}' not found")]
	RemoteNotFound(String),

	#[error("sync manager has been shut down")]
	ShutDown,

	#[error(transparent)]
	Channel(#[from] ChannelError),
}

pub struct Remote {
	pub id: Uuid,
	pub name: String,
	pub filter: RemoteFilter,
	pub channel: Arc<Channel>,
}

pub struct SyncManager {
	remotes: RwLock<HashMap<String, Arc<Remote>>>,
	events: Arc<EventBus>,
	shut_down: AtomicBool,
}

impl SyncManager {
	pub fn new(events: Arc<EventBus>) -> Self {
		Self {
			remotes: RwLock::new(HashMap::new()),
			events,
			shut_down: AtomicBool::new(false),
		}
	}

	pub fn add_remote(
		&self,
		name: &str,
		filter: RemoteFilter,
		channel: Arc<Channel>,
	) -> Result<Arc<Remote>, SyncManagerError> {
		if self.is_shut_down() {
			return Err(SyncManagerError::ShutDown);
		}

		let mut remotes = self.write_remotes();
		if remotes.contains_key(name) {
			return Err(SyncManagerError::DuplicateRemote(name.to_string()));
		}

		let remote = Arc::new(Remote {
			id: Uuid::new_v4(),
			name: name.to_string(),
			filter,
			channel,
		});
		remotes.insert(name.to_string(), remote.clone());
		info!(remote = name, "registered sync remote");
		Ok(remote)
	}

	pub fn get_by_name(&self, name: &str) -> Option<Arc<Remote>> {
		self.read_remotes().get(name).cloned()
	}

	pub fn get_by_id(&self, id: Uuid) -> Option<Arc<Remote>> {
		self.read_remotes()
			.values()
			.find(|remote| remote.id == id)
			.cloned()
	}

	pub fn list_remotes(&self) -> Vec<Arc<Remote>> {
		self.read_remotes().values().cloned().collect()
	}

	/// Remove a remote and shut its channel down. Returns `false` when the
	/// name is unknown.
	pub fn remove_remote(&self, name: &str) -> bool {
		let removed = self.write_remotes().remove(name);
		match removed {
			Some(remote) => {
				remote.channel.shutdown();
				true
			}
			None => false,
		}
	}

	pub fn is_shut_down(&self) -> bool {
		self.shut_down.load(Ordering::SeqCst)
	}

	/// One-way: shuts every channel down and rejects further dispatch.
	pub fn shutdown(&self) {
		self.shut_down.store(true, Ordering::SeqCst);
		for remote in self.list_remotes() {
			remote.channel.shutdown();
		}
		info!("sync manager shut down");
	}

	/// Fan a released batch out to every matching remote.
	///
	/// Per entry and remote, matching operations are grouped by document
	/// and branch into sync operations and queued on the remote's outbox.
	/// Emits a pending event per job with sync operations; the per-job
	/// outcome event follows once every sync operation is terminal.
	pub fn dispatch_batch(&self, batch: &PreparedBatch) -> Result<(), SyncManagerError> {
		if self.is_shut_down() {
			return Err(SyncManagerError::ShutDown);
		}

		let remotes = self.list_remotes();

		for entry in &batch.entries {
			let job_id = entry.event.job_id;
			let mut queued: Vec<(Arc<Remote>, Vec<Arc<SyncOperation>>)> = Vec::new();
			let mut remote_names = Vec::new();
			let mut total = 0usize;

			for remote in &remotes {
				let matching = filter_operations(&entry.event.operations, &remote.filter);
				if matching.is_empty() {
					continue;
				}

				let sync_ops: Vec<Arc<SyncOperation>> = batch_operations_by_document(&matching)
					.into_iter()
					.map(|group| {
						let document_id = group[0].context.document_id.clone();
						let branch = group[0].context.branch.clone();
						SyncOperation::new(
							Some(job_id),
							&remote.name,
							&document_id,
							&branch,
							group,
						)
					})
					.collect();

				total += sync_ops.len();
				remote_names.push(remote.name.clone());
				queued.push((remote.clone(), sync_ops));
			}

			if total == 0 {
				debug!(job_id = %job_id, "no remote matched the job's operations");
				continue;
			}

			let outcome = JobOutcome::new(job_id, total, self.events.clone());
			for (_, sync_ops) in &queued {
				for sync_op in sync_ops {
					let outcome = outcome.clone();
					sync_op.on(move |op, _previous, next| outcome.record(op, next));
				}
			}

			for (remote, sync_ops) in &queued {
				remote.channel.enqueue(sync_ops)?;
			}

			self.events.emit(Event::SyncPending(SyncPendingEvent {
				job_id,
				sync_operation_count: total,
				remote_names: remote_names.clone(),
			}));
		}

		Ok(())
	}

	fn read_remotes(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Remote>>> {
		self.remotes
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn write_remotes(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Remote>>> {
		self.remotes
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

#[async_trait]
impl BatchSink for SyncManager {
	async fn on_batch_ready(&self, batch: PreparedBatch) -> anyhow::Result<()> {
		self.dispatch_batch(&batch)?;
		Ok(())
	}
}

/// Collects terminal sync-operation outcomes for one job and emits the
/// aggregate event once every sync operation has settled.
#[derive(Clone)]
struct JobOutcome {
	inner: Arc<Mutex<JobOutcomeState>>,
}

struct JobOutcomeState {
	job_id: JobId,
	total: usize,
	succeeded: usize,
	failures: Vec<SyncFailure>,
	events: Arc<EventBus>,
	emitted: bool,
}

impl JobOutcome {
	fn new(job_id: JobId, total: usize, events: Arc<EventBus>) -> Self {
		Self {
			inner: Arc::new(Mutex::new(JobOutcomeState {
				job_id,
				total,
				succeeded: 0,
				failures: Vec::new(),
				events,
				emitted: false,
			})),
		}
	}

	fn record(&self, sync_op: &SyncOperation, status: SyncOperationStatus) {
		let mut state = self
			.inner
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());

		match status {
			SyncOperationStatus::Applied => state.succeeded += 1,
			SyncOperationStatus::Error => {
				let message = sync_op
					.error()
					.map(|error| error.to_string())
					.unwrap_or_else(|| "unknown channel error".to_string());
				let failure = SyncFailure {
					remote_name: sync_op.remote_name.clone(),
					document_id: sync_op.document_id.clone(),
					error: message,
				};
				state.failures.push(failure);
			}
			_ => return,
		}

		if state.emitted || state.succeeded + state.failures.len() < state.total {
			return;
		}
		state.emitted = true;

		let event = if state.failures.is_empty() {
			Event::SyncSucceeded(SyncSucceededEvent {
				job_id: state.job_id,
				sync_operation_count: state.total,
			})
		} else {
			Event::SyncFailed(SyncFailedEvent {
				job_id: state.job_id,
				success_count: state.succeeded,
				failure_count: state.failures.len(),
				errors: state.failures.clone(),
			})
		};
		state.events.emit(event);
	}
}
