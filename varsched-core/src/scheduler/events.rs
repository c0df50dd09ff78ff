//! Set events and subscribers.
//!
//! Every transition the set drives is announced as a [`SetEvent`] to the
//! registered subscribers, in the order it happens. Hosts use this to
//! refresh pickers and panels; tests use it to observe ordering.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::QueryError;
use crate::executor::RequestId;

/// Something that happened in a variable set.
#[derive(Debug, Clone, PartialEq)]
pub enum SetEvent {
    /// The dependency graph was built and ready variables were started.
    Activated,

    /// In-flight updates were cancelled and the graph dropped.
    Deactivated,

    /// An update was issued with the given interpolated query.
    UpdateStarted {
        variable: String,
        request: RequestId,
        query: String,
    },

    /// An update succeeded. `changed` tells whether value or text differ.
    UpdateCompleted {
        variable: String,
        request: RequestId,
        changed: bool,
    },

    /// An update failed.
    UpdateFailed {
        variable: String,
        request: RequestId,
        error: QueryError,
    },

    /// An in-flight update was abandoned.
    UpdateCancelled {
        variable: String,
        request: RequestId,
    },

    /// A variable's value changed, by query or set directly. Its dependents
    /// are being re-triggered.
    ValueChanged { variable: String },

    /// A completion arrived for a request that is no longer in flight.
    StaleCompletionDiscarded {
        variable: String,
        request: RequestId,
    },
}

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A callback registered for set events.
pub struct Subscriber {
    id: SubscriberId,
    notify: Box<dyn Fn(&SetEvent) + Send + Sync>,
}

impl Subscriber {
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(&SetEvent) + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Box::new(notify),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn notify(&self, event: &SetEvent) {
        (self.notify)(event);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}
