//! Document synchronization core
//!
//! The distributed backbone of a multi-writer document platform:
//! operation-log conflict resolution, read-after-write consistency
//! tracking, and reliable batch transport to remote replicas.

pub mod config;
pub mod consistency;
pub mod document;
pub mod events;
pub mod history;
pub mod jobs;
pub mod storage;
pub mod sync;
pub mod telemetry;

use crate::config::SyncConfig;
use crate::consistency::{ConsistencyError, ConsistencyToken, ConsistencyTracker};
use crate::document::DocumentModelRegistry;
use crate::events::EventBus;
use crate::storage::SyncCursorStore;
use crate::sync::{
	BatchAggregator, Channel, EnvelopeTransport, Remote, RemoteFilter, SyncManager,
	SyncManagerError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Composition root wiring the sync subsystems together.
///
/// The write path records watermarks on `write_tracker` and mints tokens
/// from it; the read-model indexer reports progress to `read_tracker`,
/// which readers await. Write-ready events flow through the aggregator
/// into the manager, which fans batches out to the configured remotes.
pub struct SyncCore {
	config: SyncConfig,
	pub events: Arc<EventBus>,
	pub registry: Arc<DocumentModelRegistry>,
	pub write_tracker: Arc<ConsistencyTracker>,
	pub read_tracker: Arc<ConsistencyTracker>,
	pub manager: Arc<SyncManager>,
	pub aggregator: Arc<BatchAggregator>,
}

impl SyncCore {
	pub fn new(config: SyncConfig) -> Self {
		let events = Arc::new(EventBus::default());
		let manager = Arc::new(SyncManager::new(events.clone()));
		let aggregator = Arc::new(BatchAggregator::new(manager.clone()));

		Self {
			config,
			events,
			registry: Arc::new(DocumentModelRegistry::new()),
			write_tracker: Arc::new(ConsistencyTracker::new()),
			read_tracker: Arc::new(ConsistencyTracker::new()),
			manager,
			aggregator,
		}
	}

	/// Initialize from a data directory, creating a default config file
	/// when none exists.
	pub fn load_or_create(data_dir: PathBuf) -> anyhow::Result<Self> {
		let config = SyncConfig::load_or_create(&data_dir)?;
		info!("Initializing sync core at {:?}", config.data_dir);
		Ok(Self::new(config))
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	/// Build a channel for a remote from the configured outbox settings
	/// and register it with the manager.
	pub fn add_remote(
		&self,
		name: &str,
		filter: RemoteFilter,
		transport: Arc<dyn EnvelopeTransport>,
		cursors: Arc<dyn SyncCursorStore>,
	) -> Result<Arc<Remote>, SyncManagerError> {
		let channel = Channel::new(name, transport, cursors, &self.config.channel_config());
		self.manager.add_remote(name, filter, channel)
	}

	/// Await read-after-write consistency for a token, bounded by the
	/// configured deadline.
	pub async fn wait_for_token(&self, token: &ConsistencyToken) -> Result<(), ConsistencyError> {
		self.read_tracker
			.wait_for_token(token, Some(self.config.consistency_timeout()))
			.await
	}

	/// Shut down every remote channel; one-way.
	pub fn shutdown(&self) {
		self.manager.shutdown();
		info!("sync core shutdown complete");
	}
}
