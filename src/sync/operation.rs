//! Sync operation state machine
//!
//! One sync operation carries a group of operations bound for a single
//! document on a single remote. Its status only ever moves forward:
//! `Unknown -> TransportPending -> ExecutionPending -> Applied | Error`.
//! Applied and Error are terminal; a late success can never overwrite a
//! recorded failure.

use super::error::ChannelError;
use super::mailbox::MailboxItem;
use crate::history::OperationWithContext;
use crate::jobs::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperationStatus {
	Unknown,
	TransportPending,
	ExecutionPending,
	Applied,
	Error,
}

impl SyncOperationStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Applied | Self::Error)
	}
}

impl fmt::Display for SyncOperationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unknown => write!(f, "Unknown"),
			Self::TransportPending => write!(f, "TransportPending"),
			Self::ExecutionPending => write!(f, "ExecutionPending"),
			Self::Applied => write!(f, "Applied"),
			Self::Error => write!(f, "Error"),
		}
	}
}

type StatusListener =
	Arc<dyn Fn(&SyncOperation, SyncOperationStatus, SyncOperationStatus) + Send + Sync>;

pub struct SyncOperation {
	pub id: String,
	/// Absent for inbound operations received from a remote.
	pub job_id: Option<JobId>,
	pub remote_name: String,
	pub document_id: String,
	pub scopes: Vec<String>,
	pub branch: String,
	pub operations: Vec<OperationWithContext>,
	status: Mutex<SyncOperationStatus>,
	error: Mutex<Option<ChannelError>>,
	listeners: Mutex<Vec<StatusListener>>,
}

impl SyncOperation {
	pub fn new(
		job_id: Option<JobId>,
		remote_name: &str,
		document_id: &str,
		branch: &str,
		operations: Vec<OperationWithContext>,
	) -> Arc<Self> {
		let mut scopes: Vec<String> = operations
			.iter()
			.map(|op| op.context.scope.clone())
			.collect();
		scopes.sort();
		scopes.dedup();

		Arc::new(Self {
			id: Uuid::new_v4().to_string(),
			job_id,
			remote_name: remote_name.to_string(),
			document_id: document_id.to_string(),
			branch: branch.to_string(),
			scopes,
			operations,
			status: Mutex::new(SyncOperationStatus::Unknown),
			error: Mutex::new(None),
			listeners: Mutex::new(Vec::new()),
		})
	}

	pub fn status(&self) -> SyncOperationStatus {
		*lock(&self.status)
	}

	pub fn error(&self) -> Option<ChannelError> {
		lock(&self.error).clone()
	}

	/// Highest store ordinal carried by this operation group.
	pub fn latest_ordinal(&self) -> u64 {
		self.operations
			.iter()
			.map(|op| op.context.ordinal)
			.max()
			.unwrap_or(0)
	}

	/// Register a status listener, invoked in registration order with the
	/// previous and next status on every accepted transition.
	pub fn on(
		&self,
		listener: impl Fn(&SyncOperation, SyncOperationStatus, SyncOperationStatus)
			+ Send
			+ Sync
			+ 'static,
	) {
		lock(&self.listeners).push(Arc::new(listener));
	}

	pub fn started(&self) {
		self.transition(SyncOperationStatus::TransportPending);
	}

	pub fn transported(&self) {
		self.transition(SyncOperationStatus::ExecutionPending);
	}

	pub fn executed(&self) {
		self.transition(SyncOperationStatus::Applied);
	}

	pub fn failed(&self, error: ChannelError) {
		self.transition_with(SyncOperationStatus::Error, Some(error));
	}

	fn transition(&self, next: SyncOperationStatus) -> bool {
		self.transition_with(next, None)
	}

	/// Forward-only transition. Backward and repeated transitions are
	/// silently ignored; forward skips are allowed. An accepted error is
	/// recorded before listeners fire so they can read it mid-transition.
	fn transition_with(&self, next: SyncOperationStatus, error: Option<ChannelError>) -> bool {
		let previous = {
			let mut status = lock(&self.status);
			let previous = *status;
			if previous.is_terminal() || next <= previous {
				return false;
			}
			*status = next;
			if let Some(error) = error {
				*lock(&self.error) = Some(error);
			}
			previous
		};

		let listeners = lock(&self.listeners).clone();
		for listener in listeners {
			listener(self, previous, next);
		}
		true
	}
}

// listeners are not printable; show the identifying fields and status
impl fmt::Debug for SyncOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SyncOperation")
			.field("id", &self.id)
			.field("job_id", &self.job_id)
			.field("remote_name", &self.remote_name)
			.field("document_id", &self.document_id)
			.field("scopes", &self.scopes)
			.field("branch", &self.branch)
			.field("status", &self.status())
			.finish_non_exhaustive()
	}
}

impl MailboxItem for Arc<SyncOperation> {
	fn mailbox_id(&self) -> String {
		self.id.clone()
	}
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
