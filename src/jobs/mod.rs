//! Job lifecycle
//!
//! A job tracks one write request from submission through durable append
//! to read-model visibility. Transitions are driven externally: the
//! operation store acknowledges the append, the consistency tracker
//! resolves the token wait.

use crate::consistency::ConsistencyToken;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for JobId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<Uuid> for JobId {
	fn from(uuid: Uuid) -> Self {
		Self(uuid)
	}
}

/// Current status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	/// Job is waiting to be processed
	Pending,
	/// Job is currently being processed
	Running,
	/// Operations are durably appended to the operation log
	WriteCompleted,
	/// The read index has caught up; terminal success
	ReadModelsReady,
	/// Terminal failure
	Failed,
}

impl JobStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::ReadModelsReady | Self::Failed)
	}

	pub fn is_active(&self) -> bool {
		matches!(self, Self::Running | Self::WriteCompleted)
	}
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pending => write!(f, "Pending"),
			Self::Running => write!(f, "Running"),
			Self::WriteCompleted => write!(f, "WriteCompleted"),
			Self::ReadModelsReady => write!(f, "ReadModelsReady"),
			Self::Failed => write!(f, "Failed"),
		}
	}
}

#[derive(Debug, Error)]
pub enum JobError {
	#[error("invalid job transition from {from} to {to}")]
	InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Batch membership and collection hints attached at submission time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMeta {
	pub batch_id: String,
	/// Every job expected to arrive together in this batch.
	pub batch_job_ids: Vec<JobId>,
	/// documentId -> collection ids the document belongs to.
	#[serde(default)]
	pub collections: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
	pub id: JobId,
	pub status: JobStatus,
	pub created_at_utc_iso: String,
	pub completed_at_utc_iso: Option<String>,
	pub error: Option<String>,
	pub error_history: Vec<String>,
	pub result: Option<serde_json::Value>,
	pub consistency_token: Option<ConsistencyToken>,
	pub meta: JobMeta,
}

impl Job {
	pub fn new(meta: JobMeta) -> Self {
		Self {
			id: JobId::new(),
			status: JobStatus::Pending,
			created_at_utc_iso: Utc::now().to_rfc3339(),
			completed_at_utc_iso: None,
			error: None,
			error_history: Vec::new(),
			result: None,
			consistency_token: None,
			meta,
		}
	}

	pub fn start(&mut self) -> Result<(), JobError> {
		self.transition(JobStatus::Running)
	}

	/// Mark the append durable and attach the token minted for it.
	pub fn write_completed(&mut self, token: ConsistencyToken) -> Result<(), JobError> {
		self.transition(JobStatus::WriteCompleted)?;
		self.consistency_token = Some(token);
		Ok(())
	}

	/// Terminal success: the read models have caught up to the token.
	pub fn read_models_ready(&mut self) -> Result<(), JobError> {
		self.transition(JobStatus::ReadModelsReady)?;
		self.completed_at_utc_iso = Some(Utc::now().to_rfc3339());
		Ok(())
	}

	/// Terminal failure, allowed from any non-terminal state. A previous
	/// error is appended to the history rather than discarded.
	pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
		if self.status.is_terminal() {
			return Err(JobError::InvalidTransition {
				from: self.status,
				to: JobStatus::Failed,
			});
		}
		if let Some(previous) = self.error.take() {
			self.error_history.push(previous);
		}
		self.error = Some(error.into());
		self.status = JobStatus::Failed;
		self.completed_at_utc_iso = Some(Utc::now().to_rfc3339());
		Ok(())
	}

	/// Forward-only status transition; terminal states are final.
	fn transition(&mut self, to: JobStatus) -> Result<(), JobError> {
		if self.status.is_terminal() || to <= self.status {
			return Err(JobError::InvalidTransition {
				from: self.status,
				to,
			});
		}
		self.status = to;
		Ok(())
	}
}
