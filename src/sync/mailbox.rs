//! Id-keyed mailbox with synchronous add/remove fan-out

use super::error::MailboxAggregateError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Anything a mailbox can hold: cloneable and addressable by a stable id.
pub trait MailboxItem: Clone + Send + Sync + 'static {
	fn mailbox_id(&self) -> String;
}

pub(crate) type Subscriber<T> = Arc<dyn Fn(&[T]) -> anyhow::Result<()> + Send + Sync>;

/// Insertion-ordered id-keyed storage. Replacing an existing id keeps its
/// original position.
pub(crate) struct ItemStore<T> {
	order: Vec<String>,
	by_id: HashMap<String, T>,
}

impl<T: MailboxItem> ItemStore<T> {
	pub(crate) fn new() -> Self {
		Self {
			order: Vec::new(),
			by_id: HashMap::new(),
		}
	}

	pub(crate) fn insert(&mut self, item: T) {
		let id = item.mailbox_id();
		if self.by_id.insert(id.clone(), item).is_none() {
			self.order.push(id);
		}
	}

	pub(crate) fn remove(&mut self, id: &str) -> Option<T> {
		let removed = self.by_id.remove(id);
		if removed.is_some() {
			self.order.retain(|existing| existing != id);
		}
		removed
	}

	pub(crate) fn get(&self, id: &str) -> Option<T> {
		self.by_id.get(id).cloned()
	}

	pub(crate) fn contains(&self, id: &str) -> bool {
		self.by_id.contains_key(id)
	}

	pub(crate) fn values(&self) -> Vec<T> {
		self.order
			.iter()
			.filter_map(|id| self.by_id.get(id).cloned())
			.collect()
	}

	pub(crate) fn len(&self) -> usize {
		self.by_id.len()
	}
}

/// Deliver a batch to every subscriber, collecting failures. All
/// subscribers run even when earlier ones fail; the collected errors are
/// raised once as a single aggregate after the full fan-out.
pub(crate) fn fan_out<T: MailboxItem>(
	subscribers: &[Subscriber<T>],
	items: &[T],
) -> Result<(), MailboxAggregateError> {
	if items.is_empty() {
		return Ok(());
	}

	let mut errors = Vec::new();
	for subscriber in subscribers {
		if let Err(error) = subscriber(items) {
			errors.push(error);
		}
	}

	match MailboxAggregateError::from_errors(errors) {
		Some(aggregate) => Err(aggregate),
		None => Ok(()),
	}
}

/// Plain mailbox: items are stored and subscribers are notified
/// synchronously on every add and remove.
pub struct Mailbox<T: MailboxItem> {
	items: Mutex<ItemStore<T>>,
	on_added: Mutex<Vec<Subscriber<T>>>,
	on_removed: Mutex<Vec<Subscriber<T>>>,
}

impl<T: MailboxItem> Mailbox<T> {
	pub fn new() -> Self {
		Self {
			items: Mutex::new(ItemStore::new()),
			on_added: Mutex::new(Vec::new()),
			on_removed: Mutex::new(Vec::new()),
		}
	}

	pub fn add(&self, items: &[T]) -> Result<(), MailboxAggregateError> {
		{
			let mut store = lock(&self.items);
			for item in items {
				store.insert(item.clone());
			}
		}
		let subscribers = lock(&self.on_added).clone();
		fan_out(&subscribers, items)
	}

	/// Remove items by id, returning the removed items. Unknown ids are
	/// ignored; subscribers only see items that were actually present.
	pub fn remove<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<T>, MailboxAggregateError> {
		let removed: Vec<T> = {
			let mut store = lock(&self.items);
			ids.iter()
				.filter_map(|id| store.remove(id.as_ref()))
				.collect()
		};
		let subscribers = lock(&self.on_removed).clone();
		fan_out(&subscribers, &removed)?;
		Ok(removed)
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

impl<T: MailboxItem> Default for Mailbox<T> {
	fn default() -> Self {
		Self::new()
	}
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
