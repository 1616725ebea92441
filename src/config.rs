//! Sync core configuration

use crate::sync::ChannelConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_FILE: &str = "docsync.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Outbox quiet period before a buffered flush, in milliseconds
	pub outbox_debounce_ms: u64,

	/// Buffered adds/removes that force an immediate flush
	pub outbox_max_queued: usize,

	/// Default deadline for consistency waits, in milliseconds
	pub consistency_timeout_ms: u64,
}

impl SyncConfig {
	/// Load configuration from a data directory, creating the default
	/// config file when none exists yet.
	pub fn load_or_create(data_dir: &PathBuf) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let config: SyncConfig = serde_json::from_str(&json)?;
			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.clone());
			config.save()?;
			Ok(config)
		}
	}

	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: 1,
			data_dir,
			log_level: "info".to_string(),
			outbox_debounce_ms: 500,
			outbox_max_queued: 25,
			consistency_timeout_ms: 30_000,
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn channel_config(&self) -> ChannelConfig {
		ChannelConfig {
			debounce: Duration::from_millis(self.outbox_debounce_ms),
			max_queued: self.outbox_max_queued,
		}
	}

	pub fn consistency_timeout(&self) -> Duration {
		Duration::from_millis(self.consistency_timeout_ms)
	}
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self::default_with_dir(PathBuf::from("."))
	}
}
