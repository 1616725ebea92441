//! Online merge of incoming operations into a live document
//!
//! Unlike the offline reconciliation in [`super::helpers`], the online path
//! never rewrites history: every incoming operation must land exactly on
//! the first not-yet-seen index of its scope. A collision is a synchronous
//! conflict the caller has to resolve upstream, typically by re-fetching
//! and reattaching a branch.

use super::error::{HistoryError, Result};
use super::helpers::sort_operations;
use super::types::{DocumentOperations, Operation};

/// Append incoming operations onto the current per-scope sequences.
///
/// Exact duplicates of already-appended operations are dropped. An index
/// that is already occupied by a different operation, or that leaves a gap,
/// fails with [`HistoryError::Conflict`] and the whole batch is rejected.
pub fn merge_operations(
	current: &DocumentOperations,
	incoming: &[Operation],
) -> Result<DocumentOperations> {
	let mut result = current.clone();

	for op in sort_operations(incoming) {
		let scope_ops = result.entry(op.action.scope.clone()).or_default();
		let document_index = scope_ops.len() as i64 - 1;

		if (op.index as i64) <= document_index {
			let existing = &scope_ops[op.index as usize];
			if *existing == op {
				continue;
			}
			return Err(HistoryError::Conflict {
				incoming_index: op.index,
				document_index,
			});
		}

		if op.index as i64 > document_index + 1 {
			return Err(HistoryError::Conflict {
				incoming_index: op.index,
				document_index,
			});
		}

		scope_ops.push(op);
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::history::types::Action;
	use pretty_assertions::assert_eq;

	fn op(id: &str, index: u64, scope: &str) -> Operation {
		Operation {
			id: id.to_string(),
			index,
			skip: 0,
			hash: format!("hash-{id}"),
			timestamp_utc_ms: "2024-01-01T00:00:00+00:00".to_string(),
			action: Action {
				id: format!("action-{id}"),
				kind: "SET_VALUE".to_string(),
				scope: scope.to_string(),
				input: serde_json::json!({}),
			},
			error: None,
		}
	}

	#[test]
	fn appends_in_index_order() {
		let mut current = DocumentOperations::new();
		current.insert("global".to_string(), vec![op("a", 0, "global")]);

		let merged =
			merge_operations(&current, &[op("c", 2, "global"), op("b", 1, "global")]).unwrap();

		let global = &merged["global"];
		assert_eq!(global.len(), 3);
		assert_eq!(
			global.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
			vec!["a", "b", "c"]
		);
	}

	#[test]
	fn drops_exact_duplicates() {
		let mut current = DocumentOperations::new();
		current.insert("global".to_string(), vec![op("a", 0, "global")]);

		let merged =
			merge_operations(&current, &[op("a", 0, "global"), op("b", 1, "global")]).unwrap();
		assert_eq!(merged["global"].len(), 2);
	}

	#[test]
	fn rejects_index_collisions() {
		let mut current = DocumentOperations::new();
		current.insert("global".to_string(), vec![op("a", 0, "global")]);

		let err = merge_operations(&current, &[op("b", 0, "global")]).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Tried to add operation with index 0 and document is at index 0"
		);
	}

	#[test]
	fn rejects_gaps() {
		let current = DocumentOperations::new();

		let err = merge_operations(&current, &[op("b", 2, "global")]).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Tried to add operation with index 2 and document is at index -1"
		);
	}

	#[test]
	fn scopes_are_independent() {
		let current = DocumentOperations::new();

		let merged =
			merge_operations(&current, &[op("g", 0, "global"), op("l", 0, "local")]).unwrap();
		assert_eq!(merged["global"].len(), 1);
		assert_eq!(merged["local"].len(), 1);
	}

	#[test]
	fn input_is_not_mutated() {
		let mut current = DocumentOperations::new();
		current.insert("global".to_string(), vec![op("a", 0, "global")]);
		let snapshot = current.clone();

		let _ = merge_operations(&current, &[op("b", 1, "global")]).unwrap();
		assert_eq!(current, snapshot);
	}
}
