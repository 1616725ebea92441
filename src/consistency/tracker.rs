//! Consistency tracker
//!
//! Keeps a monotonic high-watermark per `documentId:scope:branch` key and
//! lets readers suspend until every coordinate of a token has been reached.
//! The write path and the read path each own their own tracker instance;
//! tokens are minted from the write tracker and awaited against the read
//! tracker.

use super::token::{ConsistencyCoordinate, ConsistencyToken};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConsistencyError {
	/// The caller-supplied deadline elapsed before the read side caught up
	#[error("Consistency wait timed out after {waited_ms}ms")]
	Timeout { waited_ms: u64 },

	/// The waiter was discarded before its watermarks were reached, e.g.
	/// by a tracker reset
	#[error("Consistency wait was cancelled before the watermark advanced")]
	Cancelled,
}

#[derive(Default)]
pub struct ConsistencyTracker {
	inner: Mutex<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
	watermarks: HashMap<String, u64>,
	waiters: Vec<Waiter>,
	next_waiter_id: u64,
}

struct Waiter {
	id: u64,
	/// Key -> index still outstanding; emptied as watermarks advance.
	remaining: HashMap<String, u64>,
	notify: Option<oneshot::Sender<()>>,
}

impl ConsistencyTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Restore a tracker from previously serialized watermarks.
	pub fn hydrate(entries: Vec<(String, u64)>) -> Self {
		let tracker = Self::new();
		{
			let mut state = tracker.lock();
			state.watermarks = entries.into_iter().collect();
		}
		tracker
	}

	/// Advance watermarks; lower indices never regress an existing value.
	/// Waiters whose coordinates are all satisfied are woken.
	pub fn update(&self, coordinates: &[ConsistencyCoordinate]) {
		let mut state = self.lock();

		for coordinate in coordinates {
			let key = coordinate.consistency_key();
			let watermark = state.watermarks.entry(key).or_insert(0);
			if coordinate.operation_index > *watermark {
				*watermark = coordinate.operation_index;
			}
		}

		let watermarks = state.watermarks.clone();
		for waiter in &mut state.waiters {
			waiter
				.remaining
				.retain(|key, index| watermarks.get(key).copied().unwrap_or(0) < *index);
			if waiter.remaining.is_empty() {
				if let Some(notify) = waiter.notify.take() {
					let _ = notify.send(());
				}
			}
		}
		state.waiters.retain(|waiter| waiter.notify.is_some());
	}

	pub fn get_latest(&self, key: &str) -> Option<u64> {
		self.lock().watermarks.get(key).copied()
	}

	/// Snapshot the current watermarks for the given coordinates into an
	/// immutable token. A key the tracker has never seen falls back to the
	/// coordinate's own index.
	pub fn issue_token(&self, coordinates: &[ConsistencyCoordinate]) -> ConsistencyToken {
		let state = self.lock();
		let snapshot = coordinates
			.iter()
			.map(|coordinate| {
				let index = state
					.watermarks
					.get(&coordinate.consistency_key())
					.copied()
					.unwrap_or(coordinate.operation_index);
				ConsistencyCoordinate {
					operation_index: index,
					..coordinate.clone()
				}
			})
			.collect();
		ConsistencyToken::new(snapshot)
	}

	/// Suspend until every coordinate's watermark is at or past the
	/// requested index. An empty coordinate set resolves immediately.
	pub async fn wait_for(
		&self,
		coordinates: &[ConsistencyCoordinate],
		timeout: Option<Duration>,
	) -> Result<(), ConsistencyError> {
		let (waiter_id, receiver) = {
			let mut state = self.lock();

			let remaining: HashMap<String, u64> = coordinates
				.iter()
				.filter(|coordinate| {
					state
						.watermarks
						.get(&coordinate.consistency_key())
						.copied()
						.unwrap_or(0) < coordinate.operation_index
				})
				.map(|coordinate| (coordinate.consistency_key(), coordinate.operation_index))
				.collect();

			if remaining.is_empty() {
				return Ok(());
			}

			let (sender, receiver) = oneshot::channel();
			let id = state.next_waiter_id;
			state.next_waiter_id += 1;
			state.waiters.push(Waiter {
				id,
				remaining,
				notify: Some(sender),
			});
			(id, receiver)
		};

		match timeout {
			Some(deadline) => match tokio::time::timeout(deadline, receiver).await {
				// a dropped sender means the waiter was discarded, not
				// that the watermark was reached
				Ok(Ok(())) => Ok(()),
				Ok(Err(_)) => Err(ConsistencyError::Cancelled),
				Err(_) => {
					let mut state = self.lock();
					state.waiters.retain(|waiter| waiter.id != waiter_id);
					debug!(waited_ms = deadline.as_millis() as u64, "consistency wait timed out");
					Err(ConsistencyError::Timeout {
						waited_ms: deadline.as_millis() as u64,
					})
				}
			},
			None => receiver
				.await
				.map_err(|_| ConsistencyError::Cancelled),
		}
	}

	/// Convenience wrapper awaiting every coordinate of a token.
	pub async fn wait_for_token(
		&self,
		token: &ConsistencyToken,
		timeout: Option<Duration>,
	) -> Result<(), ConsistencyError> {
		self.wait_for(&token.coordinates, timeout).await
	}

	/// Watermarks as sorted `(key, index)` pairs, for persistence.
	pub fn serialize(&self) -> Vec<(String, u64)> {
		let mut entries: Vec<(String, u64)> = self
			.lock()
			.watermarks
			.iter()
			.map(|(key, index)| (key.clone(), *index))
			.collect();
		entries.sort();
		entries
	}

	pub fn clear(&self) {
		let mut state = self.lock();
		state.watermarks.clear();
		state.waiters.clear();
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
		self.inner
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn coordinate(document_id: &str, index: u64) -> ConsistencyCoordinate {
		ConsistencyCoordinate::new(document_id, "global", "main", index)
	}

	#[test]
	fn update_keeps_the_high_watermark() {
		let tracker = ConsistencyTracker::new();
		tracker.update(&[coordinate("doc-1", 5)]);
		tracker.update(&[coordinate("doc-1", 3)]);
		assert_eq!(tracker.get_latest("doc-1:global:main"), Some(5));

		tracker.update(&[coordinate("doc-1", 9)]);
		assert_eq!(tracker.get_latest("doc-1:global:main"), Some(9));
	}

	#[test]
	fn issue_token_snapshots_current_watermarks() {
		let tracker = ConsistencyTracker::new();
		tracker.update(&[coordinate("doc-1", 5)]);

		let token = tracker.issue_token(&[coordinate("doc-1", 0), coordinate("doc-2", 2)]);
		assert_eq!(token.coordinates[0].operation_index, 5);
		// unseen key falls back to the requested index
		assert_eq!(token.coordinates[1].operation_index, 2);
	}

	#[test]
	fn serialize_and_hydrate_round_trip() {
		let tracker = ConsistencyTracker::new();
		tracker.update(&[coordinate("doc-1", 5), coordinate("doc-2", 2)]);

		let entries = tracker.serialize();
		assert_eq!(
			entries,
			vec![
				("doc-1:global:main".to_string(), 5),
				("doc-2:global:main".to_string(), 2),
			]
		);

		let restored = ConsistencyTracker::hydrate(entries);
		assert_eq!(restored.get_latest("doc-1:global:main"), Some(5));
		assert_eq!(restored.get_latest("doc-2:global:main"), Some(2));
	}

	#[tokio::test]
	async fn wait_for_resolves_immediately_when_satisfied() {
		let tracker = ConsistencyTracker::new();
		tracker.update(&[coordinate("doc-1", 5)]);

		tracker
			.wait_for(&[coordinate("doc-1", 5)], None)
			.await
			.unwrap();
		tracker.wait_for(&[], None).await.unwrap();
	}

	#[tokio::test]
	async fn clear_resets_watermarks() {
		let tracker = ConsistencyTracker::new();
		tracker.update(&[coordinate("doc-1", 5)]);
		tracker.clear();
		assert_eq!(tracker.get_latest("doc-1:global:main"), None);
	}
}
