//! Pure helpers over sorted operation sequences
//!
//! The index/skip arithmetic here is the heart of conflict resolution: a
//! clean sequence satisfies `index - skip == prev.index + 1` for every
//! consecutive pair, and a skip value records how many immediately
//! preceding operations at adjacent indices are superseded. Superseded
//! operations are dropped by garbage collection; the skip markers
//! themselves are kept so history stays auditable.

use super::types::{
	IntegrityIssue, IntegrityIssueKind, Operation, ReshuffleAnchor,
};
use std::collections::{BTreeMap, VecDeque};

/// Stable sort by index, ties broken by skip.
pub fn sort_operations(operations: &[Operation]) -> Vec<Operation> {
	let mut sorted = operations.to_vec();
	sorted.sort_by(|a, b| a.index.cmp(&b.index).then(a.skip.cmp(&b.skip)));
	sorted
}

/// Drop operations superseded by later skips.
///
/// Walks the sorted sequence from the tail; each kept operation swallows
/// every prior operation whose index lies inside its skip window.
pub fn garbage_collect(sorted_operations: &[Operation]) -> Vec<Operation> {
	let mut result = Vec::new();

	let mut i = sorted_operations.len() as i64 - 1;
	while i > -1 {
		let op = &sorted_operations[i as usize];
		result.push(op.clone());
		let skip_until = op.index as i64 - op.skip as i64 - 1;

		let mut j = i - 1;
		while j > -1 && sorted_operations[j as usize].index as i64 > skip_until {
			j -= 1;
		}
		i = j;
	}

	result.reverse();
	result
}

/// Total order predicate over `(index, skip)` pairs. Ties on index only
/// order two revisions of the same operation by their skip.
pub fn precedes(op1: &Operation, op2: &Operation) -> bool {
	op1.index < op2.index || (op1.index == op2.index && op1.id == op2.id && op1.skip < op2.skip)
}

pub fn operations_are_equal(op1: &Operation, op2: &Operation) -> bool {
	op1 == op2
}

/// Smallest skip producing a valid NOOP continuation of the sequence, or
/// `None` when the cleaned sequence cannot absorb another skip.
pub fn next_skip_number(sorted_operations: &[Operation]) -> Option<u64> {
	if sorted_operations.is_empty() {
		return None;
	}

	let cleaned = garbage_collect(sorted_operations);
	let last = cleaned.last()?;

	let mut next_skip = last.skip + 1;
	if cleaned.len() > 1 {
		next_skip += cleaned[cleaned.len() - 2].skip;
	}

	if last.index < next_skip {
		None
	} else {
		Some(next_skip)
	}
}

/// Append a synthetic NOOP undoing the latest operation.
///
/// A trailing NOOP is extended in place (same index, wider skip); anything
/// else gets a fresh NOOP at the next index with skip 1. An empty sequence
/// and a sequence that cannot absorb another skip are returned unchanged.
pub fn add_undo(sorted_operations: &[Operation]) -> Vec<Operation> {
	let mut result = sorted_operations.to_vec();
	let Some(latest) = sorted_operations.last() else {
		return result;
	};

	if latest.is_noop() {
		match next_skip_number(sorted_operations) {
			Some(skip) => {
				let mut undo = latest.clone();
				undo.skip = skip;
				result.push(undo);
			}
			None => {}
		}
	} else {
		result.push(Operation::noop(
			latest.index + 1,
			1,
			&latest.action.scope,
			&latest.hash,
		));
	}

	result
}

/// Splice a divergent branch onto a trunk at the first point the two
/// disagree, returning the new trunk and the superseded trunk suffix that
/// has to be re-applied afterwards. Shared prefix operations present in
/// both sequences are consumed once.
pub fn attach_branch(
	trunk: &[Operation],
	new_branch: &[Operation],
) -> (Vec<Operation>, Vec<Operation>) {
	let mut trunk_copy: VecDeque<Operation> =
		garbage_collect(&sort_operations(trunk)).into();
	let mut new_operations: VecDeque<Operation> =
		garbage_collect(&sort_operations(new_branch)).into();

	if trunk_copy.is_empty() {
		return (new_operations.into(), Vec::new());
	}

	let mut result: Vec<Operation> = Vec::new();
	let mut entered_branch = false;

	while !new_operations.is_empty() {
		let candidate = new_operations[0].clone();

		let mut next_trunk = trunk_copy.pop_front();
		while let Some(ref op) = next_trunk {
			if !precedes(op, &candidate) {
				break;
			}
			result.push(op.clone());
			next_trunk = trunk_copy.pop_front();
		}

		match next_trunk {
			None => entered_branch = true,
			Some(op) if !entered_branch => {
				if operations_are_equal(&op, &candidate) {
					new_operations.pop_front();
					result.push(op);
				} else {
					trunk_copy.push_front(op);
					entered_branch = true;
				}
			}
			Some(op) => trunk_copy.push_front(op),
		}

		if entered_branch {
			while let Some(next) = new_operations.pop_front() {
				result.push(next);
			}
		}
	}

	if !entered_branch {
		while let Some(next) = trunk_copy.pop_front() {
			result.push(next);
		}
	}

	(garbage_collect(&result), trunk_copy.into())
}

/// Partition two sorted histories into their shared prefix and the two
/// divergent suffixes. The prefix ends at the first pairwise inequality.
pub fn split(
	sorted_target_operations: &[Operation],
	sorted_merge_operations: &[Operation],
) -> (Vec<Operation>, Vec<Operation>, Vec<Operation>) {
	let mut common = Vec::new();
	let mut target_diff = Vec::new();
	let mut merge_diff = Vec::new();

	let max_length = sorted_target_operations
		.len()
		.max(sorted_merge_operations.len());

	let mut split_happened = false;
	for i in 0..max_length {
		match (
			sorted_target_operations.get(i),
			sorted_merge_operations.get(i),
		) {
			(Some(target), Some(merge)) => {
				if !split_happened && operations_are_equal(target, merge) {
					common.push(target.clone());
				} else {
					split_happened = true;
					target_diff.push(target.clone());
					merge_diff.push(merge.clone());
				}
			}
			(Some(target), None) => target_diff.push(target.clone()),
			(None, Some(merge)) => merge_diff.push(merge.clone()),
			(None, None) => {}
		}
	}

	(common, target_diff, merge_diff)
}

/// Combine two divergent histories into one re-indexed sequence.
///
/// Both inputs are cleaned and split; the divergent segments are re-indexed
/// past the highest index either side has seen, with a leading skip
/// covering the gap back to the common prefix, using the supplied
/// reshuffle strategy. Incoming operations whose id already exists in the
/// target segment are dropped.
pub fn merge<F>(
	sorted_target_operations: &[Operation],
	sorted_merge_operations: &[Operation],
	reshuffle: F,
) -> Vec<Operation>
where
	F: Fn(ReshuffleAnchor, &[Operation], &[Operation]) -> Vec<Operation>,
{
	let (common, target_ops, merge_ops) = split(
		&garbage_collect(sorted_target_operations),
		&garbage_collect(sorted_merge_operations),
	);

	let max_common_index = max_index(&common);
	let next_index = 1 + max_common_index
		.max(max_index(&target_ops))
		.max(max_index(&merge_ops));

	let filtered_merge_ops = filter_duplicated_operations(&merge_ops, &target_ops);

	let reshuffled = reshuffle(
		ReshuffleAnchor {
			index: next_index as u64,
			skip: (next_index - (max_common_index + 1)) as u64,
		},
		&target_ops,
		&filtered_merge_ops,
	);

	let mut result = common;
	result.extend(reshuffled);
	result
}

fn max_index(sorted_operations: &[Operation]) -> i64 {
	sorted_operations
		.last()
		.map(|op| op.index as i64)
		.unwrap_or(-1)
}

/// Order both segments by wall-clock timestamp and assign contiguous
/// indices starting at the anchor.
pub fn reshuffle_by_timestamp(
	anchor: ReshuffleAnchor,
	ops_a: &[Operation],
	ops_b: &[Operation],
) -> Vec<Operation> {
	let mut combined: Vec<Operation> = ops_a.iter().chain(ops_b.iter()).cloned().collect();
	combined.sort_by_key(|op| op.timestamp_millis());
	reindex(combined, anchor)
}

/// Like [`reshuffle_by_timestamp`] but original index wins over timestamp.
pub fn reshuffle_by_timestamp_and_index(
	anchor: ReshuffleAnchor,
	ops_a: &[Operation],
	ops_b: &[Operation],
) -> Vec<Operation> {
	let mut combined: Vec<Operation> = ops_a.iter().chain(ops_b.iter()).cloned().collect();
	combined.sort_by(|a, b| {
		a.index
			.cmp(&b.index)
			.then(a.timestamp_millis().cmp(&b.timestamp_millis()))
	});
	reindex(combined, anchor)
}

fn reindex(operations: Vec<Operation>, anchor: ReshuffleAnchor) -> Vec<Operation> {
	operations
		.into_iter()
		.enumerate()
		.map(|(i, mut op)| {
			op.index = anchor.index + i as u64;
			op.skip = if i == 0 { anchor.skip } else { 0 };
			op
		})
		.collect()
}

/// Validate index/skip contiguity of an already cleaned, sorted sequence.
/// Returns the list of violations; empty means valid.
pub fn check_cleaned_operations_integrity(
	sorted_operations: &[Operation],
) -> Vec<IntegrityIssue> {
	let mut result = Vec::new();

	let mut current_index: i64 = -1;
	for op in sorted_operations {
		let next_index = op.index as i64 - op.skip as i64;

		if next_index != current_index + 1 {
			let kind = if next_index > current_index + 1 {
				IntegrityIssueKind::MissingIndex
			} else {
				IntegrityIssueKind::DuplicatedIndex
			};
			result.push(IntegrityIssue {
				index: op.index,
				skip: op.skip,
				kind,
				message: format!(
					"Expected index {} with skip 0 or equivalent, got index {} with skip {}",
					current_index + 1,
					op.index,
					op.skip
				),
			});
		}

		current_index = op.index as i64;
	}

	result
}

/// Sort, clean and validate an arbitrary operation sequence.
pub fn check_operations_integrity(operations: &[Operation]) -> Vec<IntegrityIssue> {
	check_cleaned_operations_integrity(&garbage_collect(&sort_operations(operations)))
}

pub fn group_operations_by_scope(operations: &[Operation]) -> BTreeMap<String, Vec<Operation>> {
	let mut result: BTreeMap<String, Vec<Operation>> = BTreeMap::new();
	for op in operations {
		result
			.entry(op.action.scope.clone())
			.or_default()
			.push(op.clone());
	}
	result
}

/// Drop target operations whose id already appears in the source sequence.
/// Operations without an id are never considered duplicates.
pub fn filter_duplicated_operations(
	target_operations: &[Operation],
	source_operations: &[Operation],
) -> Vec<Operation> {
	target_operations
		.iter()
		.filter(|op| {
			op.id.is_empty() || !source_operations.iter().any(|source| source.id == op.id)
		})
		.cloned()
		.collect()
}

/// Operations present in `cleared_a` whose index does not occur in `cleared_b`.
pub fn diff_operations(cleared_a: &[Operation], cleared_b: &[Operation]) -> Vec<Operation> {
	cleared_a
		.iter()
		.filter(|a| !cleared_b.iter().any(|b| a.index == b.index))
		.cloned()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::history::types::Action;
	use pretty_assertions::assert_eq;

	fn ts(i: u64) -> String {
		format!("2024-01-01T00:{:02}:{:02}+00:00", i / 60, i % 60)
	}

	fn op_with(id: &str, index: u64, skip: u64) -> Operation {
		Operation {
			id: id.to_string(),
			index,
			skip,
			hash: format!("hash-{id}"),
			timestamp_utc_ms: ts(index),
			action: Action {
				id: format!("action-{id}"),
				kind: "SET_VALUE".to_string(),
				scope: "global".to_string(),
				input: serde_json::json!({}),
			},
			error: None,
		}
	}

	fn op(index: u64, skip: u64) -> Operation {
		op_with(&format!("op-{index}-{skip}"), index, skip)
	}

	fn shape(ops: &[Operation]) -> Vec<(u64, u64)> {
		ops.iter().map(|o| (o.index, o.skip)).collect()
	}

	fn ids(ops: &[Operation]) -> Vec<&str> {
		ops.iter().map(|o| o.id.as_str()).collect()
	}

	#[test]
	fn sorts_by_index_then_skip() {
		let ops = vec![op(0, 0), op(2, 0), op(1, 0), op(3, 3), op(3, 1)];
		assert_eq!(
			shape(&sort_operations(&ops)),
			vec![(0, 0), (1, 0), (2, 0), (3, 1), (3, 3)]
		);
	}

	#[test]
	fn garbage_collect_keeps_clean_sequences() {
		let ops = vec![op(0, 0), op(1, 0), op(2, 0)];
		assert_eq!(shape(&garbage_collect(&ops)), vec![(0, 0), (1, 0), (2, 0)]);
	}

	#[test]
	fn garbage_collect_drops_superseded_operations() {
		let ops = vec![op(0, 0), op(1, 1), op(2, 0)];
		assert_eq!(shape(&garbage_collect(&ops)), vec![(1, 1), (2, 0)]);

		let ops = vec![op(0, 0), op(1, 1), op(2, 0), op(3, 1)];
		assert_eq!(shape(&garbage_collect(&ops)), vec![(1, 1), (3, 1)]);

		let ops = vec![op(0, 0), op(1, 1), op(2, 0), op(3, 3)];
		assert_eq!(shape(&garbage_collect(&ops)), vec![(3, 3)]);
	}

	#[test]
	fn precedes_orders_by_index_and_same_id_skip() {
		assert!(precedes(&op(0, 0), &op(1, 0)));
		assert!(!precedes(&op(1, 0), &op(0, 0)));

		// same index, different ids: neither precedes the other
		assert!(!precedes(&op_with("a", 2, 0), &op_with("b", 2, 1)));

		// same index and id: lower skip first
		assert!(precedes(&op_with("a", 2, 0), &op_with("a", 2, 1)));
	}

	#[test]
	fn next_skip_number_table() {
		let cases: Vec<(Vec<(u64, u64)>, Option<u64>)> = vec![
			(vec![], None),
			(vec![(0, 0)], None),
			(vec![(0, 0), (1, 0)], Some(1)),
			(vec![(0, 0), (1, 1)], None),
			(vec![(1, 1)], None),
			(vec![(0, 0), (1, 0), (2, 0)], Some(1)),
			(vec![(0, 0), (1, 0), (2, 0), (2, 1)], Some(2)),
			(vec![(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)], None),
			(vec![(0, 0), (1, 1), (2, 0)], Some(2)),
			(vec![(0, 0), (1, 1), (2, 2)], None),
			(vec![(0, 0), (1, 1), (2, 0), (3, 0)], Some(1)),
			(vec![(0, 0), (1, 1), (2, 0), (3, 1)], Some(3)),
			(vec![(0, 0), (1, 1), (2, 0), (3, 3)], None),
		];

		for (input, expected) in cases {
			let ops: Vec<Operation> = input.iter().map(|&(i, s)| op(i, s)).collect();
			assert_eq!(next_skip_number(&ops), expected, "input {input:?}");
		}
	}

	#[test]
	fn add_undo_extends_trailing_noop() {
		let mut ops = vec![op(0, 0), op(1, 0), op(2, 0)];
		ops.push(Operation::noop(3, 1, "global", "hash-2"));

		let result = add_undo(&ops);
		assert_eq!(result.len(), 5);
		let last = result.last().unwrap();
		assert_eq!((last.index, last.skip), (3, 2));
		assert!(last.is_noop());
		assert!(check_operations_integrity(&result).is_empty());
	}

	#[test]
	fn add_undo_appends_fresh_noop() {
		let ops = vec![op(0, 0), op(1, 0), op(2, 0)];

		let result = add_undo(&ops);
		assert_eq!(result.len(), 4);
		let last = result.last().unwrap();
		assert_eq!((last.index, last.skip), (3, 1));
		assert!(last.is_noop());
		assert!(check_operations_integrity(&result).is_empty());
	}

	#[test]
	fn add_undo_on_empty_is_noop() {
		assert!(add_undo(&[]).is_empty());
	}

	#[test]
	fn attach_branch_onto_empty_trunk() {
		let branch = vec![op_with("b0", 0, 0), op_with("b1", 1, 0)];
		let (trunk, tail) = attach_branch(&[], &branch);
		assert_eq!(ids(&trunk), vec!["b0", "b1"]);
		assert!(tail.is_empty());
	}

	#[test]
	fn attach_empty_branch_keeps_trunk() {
		let trunk = vec![op_with("t0", 0, 0), op_with("t1", 1, 0)];
		let (new_trunk, tail) = attach_branch(&trunk, &[]);
		assert_eq!(ids(&new_trunk), vec!["t0", "t1"]);
		assert!(tail.is_empty());
	}

	#[test]
	fn attach_branch_appends_past_the_trunk() {
		let trunk: Vec<Operation> = (0..4).map(|i| op_with(&format!("t{i}"), i, 0)).collect();
		let branch = vec![op_with("b4", 4, 0), op_with("b5", 5, 0)];

		let (new_trunk, tail) = attach_branch(&trunk, &branch);
		assert_eq!(ids(&new_trunk), vec!["t0", "t1", "t2", "t3", "b4", "b5"]);
		assert!(tail.is_empty());
	}

	#[test]
	fn attach_branch_splices_at_divergence() {
		let trunk: Vec<Operation> = (0..4).map(|i| op_with(&format!("t{i}"), i, 0)).collect();
		let branch = vec![op_with("b3", 3, 0), op_with("b4", 4, 0)];

		let (new_trunk, tail) = attach_branch(&trunk, &branch);
		assert_eq!(ids(&new_trunk), vec!["t0", "t1", "t2", "b3", "b4"]);
		assert_eq!(ids(&tail), vec!["t3"]);
	}

	#[test]
	fn attach_branch_early_conflict_supersedes_most_of_the_trunk() {
		let trunk: Vec<Operation> = (0..4).map(|i| op_with(&format!("t{i}"), i, 0)).collect();
		let branch = vec![op_with("b1", 1, 0)];

		let (new_trunk, tail) = attach_branch(&trunk, &branch);
		assert_eq!(ids(&new_trunk), vec!["t0", "b1"]);
		assert_eq!(ids(&tail), vec!["t1", "t2", "t3"]);
	}

	#[test]
	fn attach_branch_consumes_shared_prefix_once() {
		let shared: Vec<Operation> = (0..3).map(|i| op_with(&format!("s{i}"), i, 0)).collect();
		let mut trunk = shared.clone();
		trunk.push(op_with("t3", 3, 0));
		let mut branch = shared;
		branch.push(op_with("b3", 3, 0));

		let (new_trunk, tail) = attach_branch(&trunk, &branch);
		assert_eq!(ids(&new_trunk), vec!["s0", "s1", "s2", "b3"]);
		assert_eq!(ids(&tail), vec!["t3"]);
	}

	#[test]
	fn attach_branch_with_skips_stays_clean() {
		let trunk: Vec<Operation> = (0..6).map(|i| op_with(&format!("t{i}"), i, 0)).collect();
		let branch = vec![op_with("b4", 4, 2), op_with("b5", 5, 0)];

		let (new_trunk, tail) = attach_branch(&trunk, &branch);
		assert_eq!(ids(&new_trunk), vec!["t0", "t1", "b4", "b5"]);
		assert_eq!(shape(&new_trunk), vec![(0, 0), (1, 0), (4, 2), (5, 0)]);
		assert_eq!(ids(&tail), vec!["t4", "t5"]);
		assert!(check_cleaned_operations_integrity(&new_trunk).is_empty());
	}

	#[test]
	fn attach_branch_keeps_restated_trunk_operations_after_the_splice() {
		// the branch supersedes t2..t3 with a skip, then restates them
		// (same ids) past its own operations at fresh indices
		let trunk: Vec<Operation> = (0..6).map(|i| op_with(&format!("t{i}"), i, 0)).collect();
		let branch = vec![
			op_with("b4", 4, 2),
			op_with("b5", 5, 0),
			op_with("t2", 6, 0),
			op_with("t3", 7, 0),
		];

		let (new_trunk, tail) = attach_branch(&trunk, &branch);
		assert_eq!(ids(&new_trunk), vec!["t0", "t1", "b4", "b5", "t2", "t3"]);
		assert_eq!(
			shape(&new_trunk),
			vec![(0, 0), (1, 0), (4, 2), (5, 0), (6, 0), (7, 0)]
		);
		assert_eq!(ids(&tail), vec!["t4", "t5"]);
		assert!(check_cleaned_operations_integrity(&new_trunk).is_empty());
	}

	#[test]
	fn split_finds_common_prefix_and_diffs() {
		let shared: Vec<Operation> = (0..2).map(|i| op_with(&format!("s{i}"), i, 0)).collect();
		let mut target = shared.clone();
		target.push(op_with("t2", 2, 0));
		target.push(op_with("t3", 3, 0));
		let mut merge_side = shared;
		merge_side.push(op_with("m2", 2, 0));

		let (common, target_diff, merge_diff) = split(&target, &merge_side);
		assert_eq!(ids(&common), vec!["s0", "s1"]);
		assert_eq!(ids(&target_diff), vec!["t2", "t3"]);
		assert_eq!(ids(&merge_diff), vec!["m2"]);
	}

	#[test]
	fn merge_reindexes_divergent_segments() {
		// target [0,1,2,a3,a4,a5] and merge [0,1,2,b3,b4:2,b5]; the skip on
		// b4 collapses b3 away, splitting after index 1.
		let shared: Vec<Operation> = (0..3).map(|i| op_with(&format!("s{i}"), i, 0)).collect();

		let mut target = shared.clone();
		for i in 3..6 {
			target.push(op_with(&format!("a{i}"), i, 0));
		}

		let mut merge_side = shared;
		merge_side.push(op_with("b3", 3, 0));
		merge_side.push(op_with("b4", 4, 2));
		merge_side.push(op_with("b5", 5, 0));

		// timestamps put the whole target segment before the merge segment,
		// leaving the shared prefix untouched
		for (i, op) in merge_side.iter_mut().enumerate().skip(3) {
			op.timestamp_utc_ms = ts(100 + i as u64);
		}

		let result = merge(&target, &merge_side, reshuffle_by_timestamp);
		assert_eq!(
			shape(&result),
			vec![(0, 0), (1, 0), (6, 4), (7, 0), (8, 0), (9, 0), (10, 0), (11, 0)]
		);
		assert_eq!(
			ids(&result),
			vec!["s0", "s1", "s2", "a3", "a4", "a5", "b4", "b5"]
		);
		assert!(check_cleaned_operations_integrity(&result).is_empty());
	}

	#[test]
	fn merge_drops_operations_already_in_target() {
		let target = vec![op_with("x", 0, 0)];
		let merge_side = vec![op_with("x", 0, 0), op_with("y", 1, 0)];

		// the shared prefix diverges immediately on nothing; identical first
		// ops land in the common prefix, y is appended past the target
		let result = merge(&target, &merge_side, reshuffle_by_timestamp);
		assert_eq!(ids(&result), vec!["x", "y"]);
	}

	#[test]
	fn integrity_accepts_clean_sequences() {
		assert!(check_cleaned_operations_integrity(&[]).is_empty());
		let ops = vec![op(0, 0), op(2, 1), op(3, 0), op(4, 0)];
		assert!(check_cleaned_operations_integrity(&ops).is_empty());
	}

	#[test]
	fn integrity_flags_missing_and_duplicated_indices() {
		let ops = vec![op(0, 0), op(2, 0)];
		let issues = check_cleaned_operations_integrity(&ops);
		assert_eq!(issues.len(), 1);
		assert_eq!(issues[0].kind, IntegrityIssueKind::MissingIndex);
		assert_eq!(
			issues[0].message,
			"Expected index 1 with skip 0 or equivalent, got index 2 with skip 0"
		);

		let ops = vec![op(0, 0), op(1, 0), op(1, 0)];
		let issues = check_cleaned_operations_integrity(&ops);
		assert_eq!(issues.len(), 1);
		assert_eq!(issues[0].kind, IntegrityIssueKind::DuplicatedIndex);
	}

	#[test]
	fn integrity_cleans_before_checking() {
		// unsorted with an undo; clean form is valid
		let ops = vec![op(2, 0), op(0, 0), op(1, 1)];
		assert!(check_operations_integrity(&ops).is_empty());
	}

	#[test]
	fn reshuffle_by_timestamp_assigns_contiguous_indices() {
		let a = vec![op_with("a", 4, 1)];
		let mut b = vec![op_with("b", 3, 0)];
		b[0].timestamp_utc_ms = ts(999);

		let anchor = ReshuffleAnchor { index: 5, skip: 2 };
		let result = reshuffle_by_timestamp(anchor, &a, &b);
		assert_eq!(ids(&result), vec!["a", "b"]);
		assert_eq!(shape(&result), vec![(5, 2), (6, 0)]);
	}

	#[test]
	fn groups_operations_by_scope() {
		let mut local = op_with("l0", 0, 0);
		local.action.scope = "local".to_string();
		let ops = vec![op_with("g0", 0, 0), local, op_with("g1", 1, 0)];

		let grouped = group_operations_by_scope(&ops);
		assert_eq!(ids(&grouped["global"]), vec!["g0", "g1"]);
		assert_eq!(ids(&grouped["local"]), vec!["l0"]);
	}

	#[test]
	fn filters_duplicates_and_diffs_by_index() {
		let target = vec![op_with("a", 0, 0), op_with("b", 1, 0)];
		let source = vec![op_with("b", 5, 0)];
		assert_eq!(ids(&filter_duplicated_operations(&target, &source)), vec!["a"]);

		let a = vec![op(0, 0), op(1, 0), op(2, 0)];
		let b = vec![op(1, 0)];
		assert_eq!(shape(&diff_operations(&a, &b)), vec![(0, 0), (2, 0)]);
	}
}
