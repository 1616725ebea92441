//! Consistency coordinates and tokens

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const CONSISTENCY_TOKEN_VERSION: u32 = 1;

/// One watermark: the highest operation index known durable for a
/// document's scope on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyCoordinate {
	pub document_id: String,
	pub scope: String,
	pub branch: String,
	pub operation_index: u64,
}

impl ConsistencyCoordinate {
	pub fn new(document_id: &str, scope: &str, branch: &str, operation_index: u64) -> Self {
		Self {
			document_id: document_id.to_string(),
			scope: scope.to_string(),
			branch: branch.to_string(),
			operation_index,
		}
	}

	/// Tracker key, `documentId:scope:branch`.
	pub fn consistency_key(&self) -> String {
		format!("{}:{}:{}", self.document_id, self.scope, self.branch)
	}
}

/// Immutable point-in-time snapshot of one or more watermarks, produced
/// once a write's effects are guaranteed visible to reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyToken {
	pub version: u32,
	pub created_at_utc_iso: String,
	pub coordinates: Vec<ConsistencyCoordinate>,
}

impl ConsistencyToken {
	pub fn new(coordinates: Vec<ConsistencyCoordinate>) -> Self {
		Self {
			version: CONSISTENCY_TOKEN_VERSION,
			created_at_utc_iso: Utc::now().to_rfc3339(),
			coordinates,
		}
	}
}
