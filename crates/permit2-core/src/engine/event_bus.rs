//! Event bus for committed Permit2 events.
//!
//! Events are published only after the call that produced them has been
//! committed, in emission order. Publishing without subscribers is not an
//! error.
//!
//! Two kinds of subscription exist. [`EventBus::subscribe`] is a bounded
//! broadcast receiver for live observers; it reports a lag once it falls more
//! than the bus capacity behind. [`EventBus::record`] is unbounded and keeps
//! every event, for consumers such as indexers that must not miss one.

use permit2_types::Permit2Event;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};

/// Broadcast channel carrying [`Permit2Event`]s to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<Permit2Event>,
	recorders: Arc<Mutex<Vec<mpsc::UnboundedSender<Permit2Event>>>>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per lagging subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self {
			sender,
			recorders: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<Permit2Event> {
		self.sender.subscribe()
	}

	/// Records every event published from now on until the receiver is dropped.
	pub fn record(&self) -> mpsc::UnboundedReceiver<Permit2Event> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.recorders
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(tx);
		rx
	}

	/// Publishes an event, returning the number of subscribers that received it.
	pub fn publish(&self, event: Permit2Event) -> usize {
		let recorded = {
			let mut recorders = self
				.recorders
				.lock()
				.unwrap_or_else(PoisonError::into_inner);
			recorders.retain(|tx| tx.send(event.clone()).is_ok());
			recorders.len()
		};
		recorded + self.sender.send(event).unwrap_or(0)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
