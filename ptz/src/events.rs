//! A small push-style bus for PTZ connection-status events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub type Callback = Box<dyn Fn(bool) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct Bus {
	next_id: AtomicU64,
	subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl Bus {
	pub fn subscribe(&self, callback: impl Fn(bool) + Send + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.subscribers.lock().unwrap().push((id, Box::new(callback)));
		id
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.subscribers.lock().unwrap().retain(|(sub_id, _)| *sub_id != id);
	}

	pub fn dispatch(&self, connected: bool) {
		for (_, callback) in self.subscribers.lock().unwrap().iter() {
			callback(connected);
		}
	}
}
