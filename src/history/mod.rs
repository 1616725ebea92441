//! Operation log ordering and conflict resolution
//!
//! Pure functions over per-scope operation sequences: precedence testing,
//! skip arithmetic, undo insertion, branch reattachment and history merging.
//! Nothing in this module performs I/O or mutates its inputs.

mod error;
pub mod helpers;
pub mod merge;
pub mod types;

pub use error::{HistoryError, Result};
pub use helpers::{
	add_undo, attach_branch, check_cleaned_operations_integrity, check_operations_integrity,
	diff_operations, filter_duplicated_operations, garbage_collect, group_operations_by_scope,
	merge as merge_histories, next_skip_number, precedes, reshuffle_by_timestamp,
	reshuffle_by_timestamp_and_index, sort_operations, split,
};
pub use merge::merge_operations;
pub use types::{
	Action, DocumentOperations, IntegrityIssue, IntegrityIssueKind, Operation, OperationContext,
	OperationWithContext, ReshuffleAnchor,
};
