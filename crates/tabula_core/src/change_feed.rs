//! Change feed for observing table mutations.
//!
//! Every successful mutation emits one [`ChangeEvent`] after the table's
//! internal lock is released. Events are delivered synchronously, in
//! sequence order, to two kinds of subscriber:
//! - listeners: callbacks run on the mutating thread (live queries use these)
//! - channels: `mpsc` receivers for consumers on other threads
//!
//! A listener may mutate the table again. The nested event is queued and
//! delivered once the current event has reached every listener, so all
//! subscribers observe events in the same order.
//!
//! # Usage
//!
//! ```rust,ignore
//! let receiver = users.changes();
//!
//! std::thread::spawn(move || {
//!     while let Ok(event) = receiver.recv() {
//!         println!("change #{}: {:?}", event.sequence, event.kind);
//!     }
//! });
//!
//! users.insert(row)?;
//! ```

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tabula_value::Row;

/// An updated row: the stored version before and after.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Previous version.
    pub old: Arc<Row>,
    /// New version.
    pub new: Arc<Row>,
}

/// What a mutation did.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// Rows were inserted.
    Insert(Vec<Arc<Row>>),
    /// Rows were updated.
    Update(Vec<Change>),
    /// Rows were removed.
    Remove(Vec<Arc<Row>>),
    /// The table was emptied.
    Clear,
}

/// A single change event from the change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Per-table mutation sequence number, starting at 1.
    pub sequence: u64,
    /// Name of the table.
    pub table: String,
    /// The change.
    pub kind: ChangeKind,
}

/// Identifies a listener registered on a [`ChangeFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Callback invoked for each change event.
pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Delivery {
    pending: VecDeque<ChangeEvent>,
    delivering: bool,
}

/// Distributes change events to subscribers.
///
/// The feed:
/// - Preserves emit order for every subscriber
/// - Allows subscribe and unsubscribe from inside a listener
/// - Is thread-safe
#[derive(Default)]
pub struct ChangeFeed {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    channels: RwLock<Vec<Sender<ChangeEvent>>>,
    delivery: Mutex<Delivery>,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Subscribes through a channel.
    ///
    /// The receiver gets every future event. Dropping it unsubscribes.
    pub fn channel(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.channels.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers.
    ///
    /// Returns once the event, and any event emitted by a listener while it
    /// ran, has been delivered.
    pub fn emit(&self, event: ChangeEvent) {
        {
            let mut delivery = self.delivery.lock();
            delivery.pending.push_back(event);
            if delivery.delivering {
                return;
            }
            delivery.delivering = true;
        }

        let _guard = DeliveryGuard(&self.delivery);
        loop {
            let next = self.delivery.lock().pending.pop_front();
            let Some(event) = next else {
                break;
            };
            self.deliver(&event);
        }
    }

    fn deliver(&self, event: &ChangeEvent) {
        self.channels
            .write()
            .retain(|tx| tx.send(event.clone()).is_ok());

        // Copy so listeners can (un)subscribe while we iterate.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Returns the number of registered listeners and open channels.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len() + self.channels.read().len()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("listeners", &self.listeners.read().len())
            .field("channels", &self.channels.read().len())
            .finish_non_exhaustive()
    }
}

/// Ends a delivery loop, also when a listener panics.
struct DeliveryGuard<'a>(&'a Mutex<Delivery>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        let mut delivery = self.0.lock();
        delivery.delivering = false;
        if std::thread::panicking() {
            delivery.pending.clear();
        }
    }
}
