//! Core types for the operation log

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Action type used by synthetic skip-carrying operations.
pub const NOOP_ACTION: &str = "NOOP";

/// One recorded state change within a document scope.
///
/// Operations are immutable once appended; corrections are expressed as new
/// operations. `skip` counts how many immediately preceding operations at
/// adjacent indices this operation supersedes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
	pub id: String,
	pub index: u64,
	pub skip: u64,
	pub hash: String,
	pub timestamp_utc_ms: String,
	pub action: Action,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl Operation {
	/// Build a synthetic NOOP operation carrying only a skip increment.
	pub fn noop(index: u64, skip: u64, scope: &str, hash: &str) -> Self {
		let now = Utc::now().to_rfc3339();
		Self {
			id: Uuid::new_v4().to_string(),
			index,
			skip,
			hash: hash.to_string(),
			timestamp_utc_ms: now.clone(),
			action: Action {
				id: Uuid::new_v4().to_string(),
				kind: NOOP_ACTION.to_string(),
				scope: scope.to_string(),
				input: serde_json::Value::Object(Default::default()),
			},
			error: None,
		}
	}

	pub fn is_noop(&self) -> bool {
		self.action.kind == NOOP_ACTION
	}

	/// Wall-clock ordering key, `0` when the timestamp does not parse.
	pub fn timestamp_millis(&self) -> i64 {
		chrono::DateTime::parse_from_rfc3339(&self.timestamp_utc_ms)
			.map(|t| t.timestamp_millis())
			.unwrap_or(0)
	}
}

/// The intent an operation records: a named action within a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub scope: String,
	pub input: serde_json::Value,
}

/// Where an operation belongs: document, scope, branch, plus the global
/// write ordinal assigned by the operation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
	pub document_id: String,
	pub document_type: String,
	pub scope: String,
	pub branch: String,
	pub ordinal: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationWithContext {
	pub operation: Operation,
	pub context: OperationContext,
}

/// Per-scope operation sequences for one document branch.
pub type DocumentOperations = BTreeMap<String, Vec<Operation>>;

/// Starting position handed to a reshuffle strategy: the first reshuffled
/// operation takes this index and skip, the rest follow contiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReshuffleAnchor {
	pub index: u64,
	pub skip: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityIssueKind {
	/// The effective index lands beyond the expected position.
	MissingIndex,
	/// The effective index lands at or before an already-occupied position.
	DuplicatedIndex,
}

impl fmt::Display for IntegrityIssueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MissingIndex => write!(f, "missing index"),
			Self::DuplicatedIndex => write!(f, "duplicated index"),
		}
	}
}

/// One violation of the index/skip contiguity invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityIssue {
	pub index: u64,
	pub skip: u64,
	pub kind: IntegrityIssueKind,
	pub message: String,
}
