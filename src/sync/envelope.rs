//! Wire envelope and remote-side filtering
//!
//! The envelope is the abstract payload exchanged between replicas; the
//! concrete codec behind [`super::channel::EnvelopeTransport`] is up to the
//! embedding application.

use crate::history::OperationWithContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeType {
	Operations,
	Ack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMeta {
	pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorType {
	Inbox,
	Outbox,
}

impl std::fmt::Display for CursorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Inbox => write!(f, "inbox"),
			Self::Outbox => write!(f, "outbox"),
		}
	}
}

/// How far a remote has progressed through our stream, persisted so a
/// restart resumes where the last sync left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCursor {
	pub remote_name: String,
	pub cursor_type: CursorType,
	pub cursor_ordinal: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_synced_at_utc_ms: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEnvelope {
	#[serde(rename = "type")]
	pub envelope_type: EnvelopeType,
	pub channel_meta: ChannelMeta,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub operations: Option<Vec<OperationWithContext>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cursor: Option<RemoteCursor>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub depends_on: Vec<String>,
}

impl SyncEnvelope {
	pub fn operations(channel_id: &str, operations: Vec<OperationWithContext>) -> Self {
		Self {
			envelope_type: EnvelopeType::Operations,
			channel_meta: ChannelMeta {
				id: channel_id.to_string(),
			},
			operations: Some(operations),
			cursor: None,
			key: None,
			depends_on: Vec::new(),
		}
	}

	pub fn ack(channel_id: &str, cursor: RemoteCursor) -> Self {
		Self {
			envelope_type: EnvelopeType::Ack,
			channel_meta: ChannelMeta {
				id: channel_id.to_string(),
			},
			operations: None,
			cursor: Some(cursor),
			key: None,
			depends_on: Vec::new(),
		}
	}
}

/// What a remote wants to see. `None` fields allow everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFilter {
	pub document_ids: Option<Vec<String>>,
	pub scopes: Option<Vec<String>>,
	pub branch: Option<String>,
}

impl RemoteFilter {
	pub fn matches(&self, op: &OperationWithContext) -> bool {
		if let Some(document_ids) = &self.document_ids {
			if !document_ids.contains(&op.context.document_id) {
				return false;
			}
		}
		if let Some(scopes) = &self.scopes {
			if !scopes.contains(&op.context.scope) {
				return false;
			}
		}
		if let Some(branch) = &self.branch {
			if *branch != op.context.branch {
				return false;
			}
		}
		true
	}
}

pub fn filter_operations(
	operations: &[OperationWithContext],
	filter: &RemoteFilter,
) -> Vec<OperationWithContext> {
	operations
		.iter()
		.filter(|op| filter.matches(op))
		.cloned()
		.collect()
}

/// Group operations by (document, scope set, branch) destination, keeping
/// arrival order within each group.
pub fn batch_operations_by_document(
	operations: &[OperationWithContext],
) -> Vec<Vec<OperationWithContext>> {
	let mut order: Vec<(String, String)> = Vec::new();
	let mut groups: BTreeMap<(String, String), Vec<OperationWithContext>> = BTreeMap::new();

	for op in operations {
		let key = (op.context.document_id.clone(), op.context.branch.clone());
		if !groups.contains_key(&key) {
			order.push(key.clone());
		}
		groups.entry(key).or_default().push(op.clone());
	}

	order
		.into_iter()
		.map(|key| groups.remove(&key).unwrap_or_default())
		.collect()
}
