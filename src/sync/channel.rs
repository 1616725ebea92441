//! Per-remote transport channel
//!
//! A channel owns three mailboxes: a plain inbox for operations received
//! from the remote, a debounced outbox that auto-sends on flush, and a
//! dead-letter mailbox holding operations that failed transport and need
//! manual intervention. One channel exists per configured remote and lives
//! until it is explicitly shut down.

use super::buffered::BufferedMailbox;
use super::envelope::{CursorType, EnvelopeType, RemoteCursor, SyncEnvelope};
use super::error::{ChannelError, ChannelErrorSource};
use super::mailbox::Mailbox;
use super::operation::SyncOperation;
use crate::storage::SyncCursorStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// The abstract wire. Concrete codecs (HTTP, GraphQL, in-process) live in
/// the embedding application.
#[async_trait]
pub trait EnvelopeTransport: Send + Sync {
	async fn send(&self, envelope: SyncEnvelope) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
	pub debounce: Duration,
	pub max_queued: usize,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			debounce: Duration::from_millis(500),
			max_queued: 25,
		}
	}
}

pub struct Channel {
	pub channel_id: String,
	pub remote_name: String,
	pub inbox: Arc<Mailbox<Arc<SyncOperation>>>,
	pub outbox: Arc<BufferedMailbox<Arc<SyncOperation>>>,
	pub dead_letter: Arc<Mailbox<Arc<SyncOperation>>>,
	transport: Arc<dyn EnvelopeTransport>,
	cursors: Arc<dyn SyncCursorStore>,
	shut_down: AtomicBool,
}

impl Channel {
	pub fn new(
		remote_name: &str,
		transport: Arc<dyn EnvelopeTransport>,
		cursors: Arc<dyn SyncCursorStore>,
		config: &ChannelConfig,
	) -> Arc<Self> {
		let channel = Arc::new(Self {
			channel_id: Uuid::new_v4().to_string(),
			remote_name: remote_name.to_string(),
			inbox: Arc::new(Mailbox::new()),
			outbox: BufferedMailbox::new(config.debounce, config.max_queued),
			dead_letter: Arc::new(Mailbox::new()),
			transport,
			cursors,
			shut_down: AtomicBool::new(false),
		});

		// every outbox flush turns into a send attempt per sync operation
		let weak = Arc::downgrade(&channel);
		channel.outbox.on_added(move |operations: &[Arc<SyncOperation>]| {
			if let Some(channel) = weak.upgrade() {
				let operations = operations.to_vec();
				tokio::spawn(async move {
					channel.push(operations).await;
				});
			}
			Ok(())
		});

		channel
	}

	pub fn is_shut_down(&self) -> bool {
		self.shut_down.load(Ordering::SeqCst)
	}

	/// Queue sync operations for transport. The actual send happens when
	/// the outbox flushes.
	pub fn enqueue(&self, operations: &[Arc<SyncOperation>]) -> Result<(), ChannelError> {
		if self.is_shut_down() {
			return Err(ChannelError::shut_down(&self.channel_id));
		}
		self.outbox.add(operations).map_err(|aggregate| {
			ChannelError::new(
				ChannelErrorSource::Outbox,
				&self.channel_id,
				aggregate.to_string(),
			)
		})
	}

	/// Accept an envelope from the remote. Fails fast once shut down.
	/// Operation envelopes become execution-pending sync operations in the
	/// inbox; cursors piggybacked on any envelope advance persistence.
	pub async fn receive(
		&self,
		envelope: SyncEnvelope,
	) -> Result<Option<Arc<SyncOperation>>, ChannelError> {
		if self.is_shut_down() {
			return Err(ChannelError::shut_down(&self.channel_id));
		}

		if let Some(cursor) = &envelope.cursor {
			self.update_cursor(cursor.cursor_type, cursor.cursor_ordinal)
				.await?;
		}

		match envelope.envelope_type {
			EnvelopeType::Ack => Ok(None),
			EnvelopeType::Operations => {
				let operations = envelope.operations.unwrap_or_default();
				let document_id = operations
					.first()
					.map(|op| op.context.document_id.clone())
					.unwrap_or_default();
				let branch = operations
					.first()
					.map(|op| op.context.branch.clone())
					.unwrap_or_else(|| "main".to_string());

				let sync_op =
					SyncOperation::new(None, &self.remote_name, &document_id, &branch, operations);
				sync_op.started();
				sync_op.transported();

				let ordinal = sync_op.latest_ordinal();
				self.inbox.add(&[sync_op.clone()]).map_err(|aggregate| {
					ChannelError::new(
						ChannelErrorSource::Inbox,
						&self.channel_id,
						aggregate.to_string(),
					)
				})?;

				if ordinal > 0 {
					self.update_cursor(CursorType::Inbox, ordinal).await?;
				}
				Ok(Some(sync_op))
			}
		}
	}

	/// Persist cursor progress for this remote. Cursors only move forward;
	/// a stale ordinal is ignored.
	pub async fn update_cursor(
		&self,
		cursor_type: CursorType,
		ordinal: u64,
	) -> Result<(), ChannelError> {
		let current = self
			.cursors
			.get(&self.remote_name, cursor_type)
			.await
			.map_err(|error| {
				ChannelError::new(
					ChannelErrorSource::Channel,
					&self.channel_id,
					error.to_string(),
				)
			})?;

		if current.map(|cursor| cursor.cursor_ordinal >= ordinal).unwrap_or(false) {
			return Ok(());
		}

		self.cursors
			.upsert(RemoteCursor {
				remote_name: self.remote_name.clone(),
				cursor_type,
				cursor_ordinal: ordinal,
				last_synced_at_utc_ms: Some(Utc::now().timestamp_millis().to_string()),
			})
			.await
			.map_err(|error| {
				ChannelError::new(
					ChannelErrorSource::Channel,
					&self.channel_id,
					error.to_string(),
				)
			})
	}

	/// Flush anything buffered, then raise the one-way shutdown flag.
	/// Sends already in flight complete or fail on their own.
	pub fn shutdown(self: &Arc<Self>) {
		if let Err(aggregate) = self.outbox.flush() {
			warn!(
				channel_id = %self.channel_id,
				error = %aggregate,
				"outbox flush during shutdown reported subscriber errors"
			);
		}
		self.shut_down.store(true, Ordering::SeqCst);
		debug!(channel_id = %self.channel_id, remote = %self.remote_name, "channel shut down");
	}

	/// Send each flushed sync operation as one envelope. Success removes
	/// it from the outbox and advances the outbox cursor; failure tags it
	/// with an outbox channel error and moves it to the dead-letter
	/// mailbox. Dead-lettered operations are never retried automatically.
	async fn push(self: &Arc<Self>, operations: Vec<Arc<SyncOperation>>) {
		for sync_op in operations {
			sync_op.started();
			let envelope = SyncEnvelope::operations(&self.channel_id, sync_op.operations.clone());

			match self.transport.send(envelope).await {
				Ok(()) => {
					sync_op.executed();
					if let Err(aggregate) = self.outbox.remove(&[sync_op.id.as_str()]) {
						warn!(
							channel_id = %self.channel_id,
							error = %aggregate,
							"outbox removal reported subscriber errors"
						);
					}
					let ordinal = sync_op.latest_ordinal();
					if ordinal > 0 {
						if let Err(cursor_error) =
							self.update_cursor(CursorType::Outbox, ordinal).await
						{
							warn!(
								channel_id = %self.channel_id,
								error = %cursor_error,
								"failed to persist outbox cursor"
							);
						}
					}
					debug!(
						channel_id = %self.channel_id,
						sync_operation = %sync_op.id,
						"sync operation applied"
					);
				}
				Err(send_error) => {
					error!(
						channel_id = %self.channel_id,
						remote = %self.remote_name,
						sync_operation = %sync_op.id,
						error = %send_error,
						"transport send failed, dead-lettering sync operation"
					);
					sync_op.failed(ChannelError::new(
						ChannelErrorSource::Outbox,
						&self.channel_id,
						send_error.to_string(),
					));
					if let Err(aggregate) = self.dead_letter.add(&[sync_op.clone()]) {
						warn!(
							channel_id = %self.channel_id,
							error = %aggregate,
							"dead-letter add reported subscriber errors"
						);
					}
					if let Err(aggregate) = self.outbox.remove(&[sync_op.id.as_str()]) {
						warn!(
							channel_id = %self.channel_id,
							error = %aggregate,
							"outbox removal reported subscriber errors"
						);
					}
				}
			}
		}
	}
}
