//! Push-style event bus for switcher state changes.
//!
//! Dispatched synchronously from the datagram receive thread, in arrival
//! order per packet and TLV order within a packet. Subscriber callbacks
//! must not block; a callback with real work to do should hand off to its
//! own thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::state::Event;

pub type Callback = Box<dyn Fn(&Event) + Send + 'static>;

/// A handle returned from [`Bus::subscribe`]; drop or pass to
/// [`Bus::unsubscribe`] to stop receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct Bus {
	next_id: AtomicU64,
	subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl Bus {
	pub fn subscribe(&self, callback: impl Fn(&Event) + Send + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.subscribers.lock().unwrap().push((id, Box::new(callback)));
		id
	}

	/// Removes a subscriber; a no-op if it was already removed. Never
	/// leaves a dangling entry that could double-deliver.
	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.subscribers.lock().unwrap().retain(|(sub_id, _)| *sub_id != id);
	}

	pub fn dispatch(&self, event: &Event) {
		for (_, callback) in self.subscribers.lock().unwrap().iter() {
			callback(event);
		}
	}
}
