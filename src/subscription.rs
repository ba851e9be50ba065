//! Snapshot Fan-Out
//!
//! Delivers the latest snapshot plus all subsequent ones to any number of
//! observers. Subscribing never triggers a fetch, and cancelling one
//! subscription only stops that observer's delivery; in-flight fetches and
//! other observers are unaffected.

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A live observer registration.
///
/// Dropping the subscription stops delivery. Use [`detach`](Self::detach) to
/// keep receiving for the life of the publisher instead.
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Stop delivering updates to this observer
    pub fn cancel(self) {
        drop(self);
    }

    /// Keep delivering updates without holding on to the subscription
    pub fn detach(mut self) {
        // Dropping the join handle detaches the forwarder instead of
        // aborting it.
        drop(self.task.take());
    }

    /// Whether the forwarder is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Spawn a forwarder that replays the channel's current value (when present)
/// and then every subsequent one into `on_update`.
pub(crate) fn forward<T, F>(mut rx: watch::Receiver<Option<T>>, on_update: F) -> Subscription
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let seeded = rx.borrow_and_update().clone();
        if let Some(value) = seeded {
            on_update(value);
        }
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            if let Some(value) = value {
                on_update(value);
            }
        }
    });
    Subscription::new(task)
}
