//! Change-notification primitives.
//!
//! Two pieces: an explicit observer list for synchronous fan-out, and a
//! coalescing batcher for consumers that want one wakeup per burst of
//! changes. Both are scheduler-agnostic: the emitter runs callbacks inline
//! on the mutating thread, and the batcher parks async consumers on a
//! [`tokio::sync::Notify`] without ever dropping the fact that something
//! changed.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;
use weft_types::EntityId;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Observers<T> = Mutex<Vec<(u64, Callback<T>)>>;

/// Synchronous observer-list event.
///
/// `emit` runs every current subscriber inline, in subscription order.
/// Dropping the [`Subscription`] guard unsubscribes; cancellation stops
/// further callbacks but never retracts already-delivered notifications.
pub struct EventEmitter<T> {
    observers: Arc<Observers<T>>,
    next_id: AtomicU64,
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self {
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T: 'static> EventEmitter<T> {
    /// Creates an emitter with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a callback; the returned guard unsubscribes on drop.
    #[must_use]
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .lock()
            .expect("observer lock poisoned")
            .push((id, Arc::new(callback)));

        let weak: Weak<Observers<T>> = Arc::downgrade(&self.observers);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(observers) = weak.upgrade() {
                    observers
                        .lock()
                        .expect("observer lock poisoned")
                        .retain(|(sub_id, _)| *sub_id != id);
                }
            })),
        }
    }

    /// Notifies all current subscribers synchronously.
    pub fn emit(&self, value: &T) {
        // Snapshot the list so a callback may subscribe or unsubscribe
        // without deadlocking.
        let callbacks: Vec<Callback<T>> = self
            .observers
            .lock()
            .expect("observer lock poisoned")
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observers.lock().expect("observer lock poisoned").len()
    }
}

/// Guard for one event subscription; unsubscribes on drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Explicitly cancels the subscription.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Coalesces bursts of entity changes into single wakeups.
///
/// Marks accumulate into a set; a consumer awaiting [`Self::wait_changed`]
/// wakes once per burst and drains the whole set. Marks arriving between
/// a wakeup and the drain are included in that drain, never lost.
#[derive(Default)]
pub struct UpdateBatcher {
    changed: Mutex<BTreeSet<EntityId>>,
    notify: Notify,
}

impl UpdateBatcher {
    /// Creates an empty batcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an entity changed.
    pub fn mark(&self, id: EntityId) {
        self.changed
            .lock()
            .expect("batcher lock poisoned")
            .insert(id);
        self.notify.notify_one();
    }

    /// Takes the accumulated change set without waiting.
    #[must_use]
    pub fn take(&self) -> BTreeSet<EntityId> {
        std::mem::take(&mut *self.changed.lock().expect("batcher lock poisoned"))
    }

    /// Waits until at least one entity has changed, then drains and returns
    /// the accumulated set.
    pub async fn wait_changed(&self) -> BTreeSet<EntityId> {
        loop {
            let notified = self.notify.notified();
            {
                let mut changed = self.changed.lock().expect("batcher lock poisoned");
                if !changed.is_empty() {
                    return std::mem::take(&mut *changed);
                }
            }
            notified.await;
        }
    }
}
