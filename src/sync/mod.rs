//! Sync transport
//!
//! Mailboxes, per-remote channels, the sync-operation state machine, the
//! batch aggregator and the manager tying them together.

pub mod batch;
pub mod buffered;
pub mod channel;
pub mod envelope;
mod error;
pub mod mailbox;
pub mod manager;
pub mod operation;

pub use batch::{prepare_batch, BatchAggregator, BatchEntry, BatchSink, PreparedBatch};
pub use buffered::BufferedMailbox;
pub use channel::{Channel, ChannelConfig, EnvelopeTransport};
pub use envelope::{
	batch_operations_by_document, filter_operations, ChannelMeta, CursorType, EnvelopeType,
	RemoteCursor, RemoteFilter, SyncEnvelope,
};
pub use error::{ChannelError, ChannelErrorSource, MailboxAggregateError};
pub use mailbox::{Mailbox, MailboxItem};
pub use manager::{Remote, SyncManager, SyncManagerError};
pub use operation::{SyncOperation, SyncOperationStatus};
