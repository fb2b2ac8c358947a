//! Debounced relay - coalesces bursts of events into one trailing emission.
//!
//! Raw pointer movement arrives far faster than anyone needs it. Instead of
//! forwarding every sample:
//! 1. Each new sample replaces the pending one and restarts the timer
//! 2. Once the input has been quiet for `delay`, the latest sample is released
//!
//! The relay is poll-driven: the host loop calls `tick()` and forwards
//! whatever comes out. Nothing fires after `cancel()`.

use std::time::{Duration, Instant};

/// Default quiet window for pointer relays.
pub const DEFAULT_RELAY_DELAY_MS: u64 = 10;

/// Trailing-edge debouncer holding at most one pending payload.
///
/// # Usage
/// ```ignore
/// // On every raw sample:
/// relay.schedule(event);
///
/// // In update loop:
/// if let Some(event) = relay.tick() {
///     engine.raise_event(ViewerEvent::MouseMove(event));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DebouncedRelay<T> {
    /// Quiet time required before releasing
    delay: Duration,
    /// Pending payload: (payload, trigger_time)
    pending: Option<(T, Instant)>,
}

impl<T> Default for DebouncedRelay<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_DELAY_MS)
    }
}

impl<T> DebouncedRelay<T> {
    /// Create with custom delay
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: None,
        }
    }

    pub fn set_delay(&mut self, delay_ms: u64) {
        self.delay = Duration::from_millis(delay_ms);
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Schedule `payload`, replacing any pending one and resetting the timer.
    pub fn schedule(&mut self, payload: T) {
        self.schedule_at(payload, Instant::now());
    }

    pub fn schedule_at(&mut self, payload: T, now: Instant) {
        self.pending = Some((payload, now + self.delay));
    }

    /// Drop any pending payload
    pub fn cancel(&mut self) {
        if self.pending.is_some() {
            log::trace!("DebouncedRelay: cancelled pending emission");
        }
        self.pending = None;
    }

    /// Release the pending payload if its quiet window has elapsed.
    pub fn tick(&mut self) -> Option<T> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<T> {
        let trigger_at = self.pending.as_ref()?.1;
        if now >= trigger_at {
            self.pending.take().map(|(payload, _)| payload)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
