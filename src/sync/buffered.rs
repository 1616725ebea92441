//! Debounced mailbox
//!
//! Items are stored immediately; add/remove notifications are buffered and
//! flushed either after a quiet period or as soon as a buffer reaches
//! `max_queued`, whichever comes first. Each add or remove reschedules its
//! own buffer's flush timer, so a steady trickle coalesces into one batch.

use super::error::MailboxAggregateError;
use super::mailbox::{fan_out, lock, ItemStore, MailboxItem, Subscriber};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::error;

pub struct BufferedMailbox<T: MailboxItem> {
	debounce: Duration,
	max_queued: usize,
	items: Mutex<ItemStore<T>>,
	add_buffer: Mutex<Vec<T>>,
	remove_buffer: Mutex<Vec<T>>,
	add_timer: Mutex<Option<JoinHandle<()>>>,
	remove_timer: Mutex<Option<JoinHandle<()>>>,
	on_added: Mutex<Vec<Subscriber<T>>>,
	on_removed: Mutex<Vec<Subscriber<T>>>,
}

impl<T: MailboxItem> BufferedMailbox<T> {
	pub fn new(debounce: Duration, max_queued: usize) -> Arc<Self> {
		Arc::new(Self {
			debounce,
			max_queued: max_queued.max(1),
			items: Mutex::new(ItemStore::new()),
			add_buffer: Mutex::new(Vec::new()),
			remove_buffer: Mutex::new(Vec::new()),
			add_timer: Mutex::new(None),
			remove_timer: Mutex::new(None),
			on_added: Mutex::new(Vec::new()),
			on_removed: Mutex::new(Vec::new()),
		})
	}

	/// Store items and buffer their add notifications. A batch hitting
	/// `max_queued` flushes synchronously; anything smaller waits for the
	/// debounce window to go quiet.
	pub fn add(self: &Arc<Self>, items: &[T]) -> Result<(), MailboxAggregateError> {
		let buffered = {
			let mut store = lock(&self.items);
			let mut buffer = lock(&self.add_buffer);
			for item in items {
				store.insert(item.clone());
				// a re-add of a pending id collapses into one notification
				buffer.retain(|pending| pending.mailbox_id() != item.mailbox_id());
				buffer.push(item.clone());
			}
			buffer.len()
		};

		if buffered >= self.max_queued {
			self.flush_added()
		} else {
			self.schedule(Buffer::Added);
			Ok(())
		}
	}

	/// Remove items by id and buffer their remove notifications, returning
	/// the removed items.
	pub fn remove<S: AsRef<str>>(
		self: &Arc<Self>,
		ids: &[S],
	) -> Result<Vec<T>, MailboxAggregateError> {
		let (removed, buffered) = {
			let mut store = lock(&self.items);
			let mut add_buffer = lock(&self.add_buffer);
			let mut buffer = lock(&self.remove_buffer);
			let mut removed = Vec::new();
			for id in ids {
				if let Some(item) = store.remove(id.as_ref()) {
					add_buffer.retain(|pending| pending.mailbox_id() != id.as_ref());
					buffer.push(item.clone());
					removed.push(item);
				}
			}
			(removed, buffer.len())
		};

		if buffered >= self.max_queued {
			self.flush_removed()?;
		} else if !removed.is_empty() {
			self.schedule(Buffer::Removed);
		}
		Ok(removed)
	}

	/// Force both buffers out synchronously. Used at shutdown.
	pub fn flush(self: &Arc<Self>) -> Result<(), MailboxAggregateError> {
		let mut errors = Vec::new();
		if let Err(aggregate) = self.flush_added() {
			errors.extend(aggregate.errors);
		}
		if let Err(aggregate) = self.flush_removed() {
			errors.extend(aggregate.errors);
		}
		match MailboxAggregateError::from_errors(errors) {
			Some(aggregate) => Err(aggregate),
			None => Ok(()),
		}
	}

	fn flush_added(self: &Arc<Self>) -> Result<(), MailboxAggregateError> {
		if let Some(timer) = lock(&self.add_timer).take() {
			timer.abort();
		}
		let batch: Vec<T> = lock(&self.add_buffer).drain(..).collect();
		let subscribers = lock(&self.on_added).clone();
		fan_out(&subscribers, &batch)
	}

	fn flush_removed(self: &Arc<Self>) -> Result<(), MailboxAggregateError> {
		if let Some(timer) = lock(&self.remove_timer).take() {
			timer.abort();
		}
		let batch: Vec<T> = lock(&self.remove_buffer).drain(..).collect();
		let subscribers = lock(&self.on_removed).clone();
		fan_out(&subscribers, &batch)
	}

	/// Cancel and restart the buffer's quiet-period timer. Timer-triggered
	/// flush failures are logged; manual flushes surface them instead.
	fn schedule(self: &Arc<Self>, buffer: Buffer) {
		let weak = Arc::downgrade(self);
		let debounce = self.debounce;
		let handle = tokio::spawn(async move {
			tokio::time::sleep(debounce).await;
			let Some(mailbox) = weak.upgrade() else {
				return;
			};
			let result = match buffer {
				Buffer::Added => mailbox.flush_added(),
				Buffer::Removed => mailbox.flush_removed(),
			};
			if let Err(aggregate) = result {
				error!(error = %aggregate, "debounced mailbox flush failed");
			}
		});

		let timer = match buffer {
			Buffer::Added => &self.add_timer,
			Buffer::Removed => &self.remove_timer,
		};
		if let Some(previous) = lock(timer).replace(handle) {
			previous.abort();
		}
	}

	pub fn get(&self, id: &str) -> Option<T> {
		lock(&self.items).get(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		lock(&self.items).contains(id)
	}

	pub fn items(&self) -> Vec<T> {
		lock(&self.items).values()
	}

	pub fn len(&self) -> usize {
		lock(&self.items).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn pending_adds(&self) -> usize {
		lock(&self.add_buffer).len()
	}

	pub fn pending_removes(&self) -> usize {
		lock(&self.remove_buffer).len()
	}

	pub fn on_added(&self, subscriber: impl Fn(&[T]) -> anyhow::Result<()> + Send + Sync + 'static) {
		lock(&self.on_added).push(Arc::new(subscriber));
	}

	pub fn on_removed(
		&self,
		subscriber: impl Fn(&[T]) -> anyhow::Result<()> + Send + Sync + 'static,
	) {
		lock(&self.on_removed).push(Arc::new(subscriber));
	}
}

impl<T: MailboxItem> Drop for BufferedMailbox<T> {
	fn drop(&mut self) {
		for timer in [&self.add_timer, &self.remove_timer] {
			if let Some(handle) = lock(timer).take() {
				handle.abort();
			}
		}
	}
}

#[derive(Clone, Copy)]
enum Buffer {
	Added,
	Removed,
}
