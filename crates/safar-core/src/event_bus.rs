//! Simple event bus for decoupled communication between the conversation
//! manager and presentation adapters.
//!
//! Events are buffered and drained by the adapter after each turn. The buffer
//! sits behind a mutex so one bus can serve sessions on several tasks.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use safar_types::event::AgentEvent;

/// Upper bound on undrained events; the oldest are dropped past it.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Shared event bus, clone-cheap via Arc.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<VecDeque<AgentEvent>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event. Called by the conversation manager.
    pub fn emit(&self, event: AgentEvent) {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<AgentEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
