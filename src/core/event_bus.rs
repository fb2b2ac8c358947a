//! Named-event handler bus used by engines to dispatch viewer events.
//!
//! Architecture:
//! - Handlers subscribe to an [`EventKind`] and get a [`HandlerId`] back
//! - emit() invokes handlers immediately AND queues the event for poll()
//! - Once-handlers are unregistered before their first invocation
//!
//! Callback order: FIFO (first-subscribed, first-called) within same kind.
//! Handlers run with no bus lock held, so they may subscribe, unsubscribe
//! or emit re-entrantly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::{trace, warn};

use crate::entities::{EventKind, Handler, HandlerId, ViewerEvent};

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

#[derive(Clone)]
struct Subscription {
    id: HandlerId,
    handler: Handler,
    once: bool,
}

/// Handler bus with deferred inspection support.
///
/// Two modes of operation:
/// 1. Immediate: subscribe() + emit() triggers handlers instantly
/// 2. Deferred: emit() also queues events for poll()
#[derive(Clone)]
pub struct HandlerBus {
    subscribers: Arc<RwLock<HashMap<EventKind, Vec<Subscription>>>>,
    queue: Arc<Mutex<Vec<ViewerEvent>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for HandlerBus {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    // ========== Subscription ==========

    /// Subscribe to every event of `kind`.
    pub fn subscribe(&self, kind: EventKind, handler: Handler) -> HandlerId {
        self.insert(kind, handler, false)
    }

    /// Subscribe to the next event of `kind` only.
    pub fn subscribe_once(&self, kind: EventKind, handler: Handler) -> HandlerId {
        self.insert(kind, handler, true)
    }

    fn insert(&self, kind: EventKind, handler: Handler, once: bool) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .push(Subscription { id, handler, once });
        trace!("HandlerBus: {:?} subscribed to {}", id, kind.name());
        id
    }

    /// Remove one handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        for list in subs.values_mut() {
            if let Some(pos) = list.iter().position(|s| s.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Clear handlers for one kind
    pub fn unsubscribe_all(&self, kind: EventKind) {
        self.subscribers.write().unwrap_or_else(|e| e.into_inner()).remove(&kind);
    }

    /// Clear all handlers, keep queued events
    pub fn clear_handlers(&self) {
        self.subscribers.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Clear all handlers and queue
    pub fn clear(&self) {
        self.subscribers.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    // ========== Dispatch ==========

    /// Emit event: invoke handlers immediately AND queue for poll().
    pub fn emit(&self, event: ViewerEvent) {
        let kind = event.kind();

        // Snapshot handlers and drop once-handlers under the lock,
        // then invoke with no lock held.
        let handlers: Vec<Handler> = {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            match subs.get_mut(&kind) {
                Some(list) => {
                    let snapshot = list.iter().map(|s| Arc::clone(&s.handler)).collect();
                    list.retain(|s| !s.once);
                    snapshot
                }
                None => Vec::new(),
            }
        };

        for handler in &handlers {
            handler(&event);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("HandlerBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(event);
    }

    // ========== Deferred Inspection ==========

    /// Take all events emitted since last poll.
    pub fn poll(&self) -> Vec<ViewerEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Check if there are handlers for `kind`
    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Total registered handlers across all kinds
    pub fn handler_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
