//! Sync transport errors

use std::fmt;
use thiserror::Error;

/// Where in the channel a failure originated. Dead-lettered operations
/// carry this tag so operators can tell transport failures from local
/// mailbox failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelErrorSource {
	Channel,
	Inbox,
	Outbox,
}

impl fmt::Display for ChannelErrorSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Channel => write!(f, "channel"),
			Self::Inbox => write!(f, "inbox"),
			Self::Outbox => write!(f, "outbox"),
		}
	}
}

// Display and Error are hand-written: thiserror would treat the `source`
// field as the error cause, but here it tags where the failure originated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelError {
	pub source: ChannelErrorSource,
	pub channel_id: String,
	pub message: String,
}

impl fmt::Display for ChannelError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} error on channel {}: {}",
			self.source, self.channel_id, self.message
		)
	}
}

impl std::error::Error for ChannelError {}

impl ChannelError {
	pub fn new(source: ChannelErrorSource, channel_id: &str, message: impl Into<String>) -> Self {
		Self {
			source,
			channel_id: channel_id.to_string(),
			message: message.into(),
		}
	}

	pub fn shut_down(channel_id: &str) -> Self {
		Self::new(
			ChannelErrorSource::Channel,
			channel_id,
			"channel has been shut down",
		)
	}
}

/// Raised after a mailbox flush has delivered to every subscriber; one bad
/// subscriber never blocks delivery to the others.
#[derive(Debug, Error)]
#[error("mailbox flush failed with {} subscriber error(s)", .errors.len())]
pub struct MailboxAggregateError {
	pub errors: Vec<anyhow::Error>,
}

impl MailboxAggregateError {
	pub fn from_errors(errors: Vec<anyhow::Error>) -> Option<Self> {
		if errors.is_empty() {
			None
		} else {
			Some(Self { errors })
		}
	}
}
