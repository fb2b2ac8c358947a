//! Interaction shim - cursor state, double-click zoom, pointer relay.
//!
//! - canvas-drag / canvas-drag-end toggle the "grabbing" cursor
//! - canvas-double-click zooms by the configured ratio around the click
//!   (inverse ratio with shift); without a ratio it does nothing here
//! - canvas-move samples go through a [`DebouncedRelay`] and come back out
//!   as `mouse-move` events on the engine when the host calls `tick()`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use log::trace;

use crate::core::DebouncedRelay;
use crate::core::debounced_relay::DEFAULT_RELAY_DELAY_MS;
use crate::entities::{Engine, EventKind, PointerEvent, ViewerEvent};

use super::lifecycle::HandlerBindings;

pub const CURSOR_GRAB: &str = "grab";
pub const CURSOR_GRABBING: &str = "grabbing";

struct Wiring {
    engine: Weak<dyn Engine>,
    relay: DebouncedRelay<PointerEvent>,
}

#[derive(Default)]
struct InteractionState {
    grabbing: AtomicBool,
    /// None when detached; nothing is relayed then
    wiring: Mutex<Option<Wiring>>,
}

#[derive(Clone, Default)]
pub struct Interaction {
    state: Arc<InteractionState>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_grabbing(&self) -> bool {
        self.state.grabbing.load(Ordering::SeqCst)
    }

    /// CSS cursor for the hosting container.
    pub fn cursor(&self) -> &'static str {
        if self.is_grabbing() { CURSOR_GRABBING } else { CURSOR_GRAB }
    }

    /// Subscribe drag, double-click and pointer handlers.
    pub fn install(&self, bindings: &mut HandlerBindings, zoom_per_double_click: Option<f64>) {
        *self.state.wiring.lock().unwrap_or_else(|e| e.into_inner()) = Some(Wiring {
            engine: bindings.engine(),
            relay: DebouncedRelay::new(DEFAULT_RELAY_DELAY_MS),
        });

        let state = Arc::clone(&self.state);
        bindings.on(EventKind::CanvasDrag, move |_e: &ViewerEvent| {
            state.grabbing.store(true, Ordering::SeqCst);
        });

        let state = Arc::clone(&self.state);
        bindings.on(EventKind::CanvasDragEnd, move |_e: &ViewerEvent| {
            state.grabbing.store(false, Ordering::SeqCst);
        });

        let engine = bindings.engine();
        bindings.on(EventKind::CanvasDoubleClick, move |event: &ViewerEvent| {
            let ViewerEvent::CanvasDoubleClick { position, shift } = event else { return };
            let Some(ratio) = zoom_per_double_click else { return };
            let Some(engine) = engine.upgrade() else { return };

            let viewport = engine.viewport();
            let factor = if *shift { 1.0 / ratio } else { ratio };
            let target = viewport.zoom() * factor;
            trace!("Double-click zoom to {:.3}", target);
            viewport.zoom_to(target, Some(viewport.point_from_pixel(*position)), false);
        });

        let state = Arc::clone(&self.state);
        bindings.on(EventKind::CanvasMove, move |event: &ViewerEvent| {
            let ViewerEvent::CanvasMove(pointer) = event else { return };
            if let Some(wiring) = state.wiring.lock().unwrap_or_else(|e| e.into_inner()).as_mut() {
                wiring.relay.schedule(*pointer);
            }
        });
    }

    /// Flush the pointer relay. Returns true if a mouse-move was raised.
    pub fn tick(&self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&self, now: Instant) -> bool {
        let released = {
            let mut wiring = self.state.wiring.lock().unwrap_or_else(|e| e.into_inner());
            wiring
                .as_mut()
                .and_then(|w| w.relay.tick_at(now).map(|pointer| (w.engine.clone(), pointer)))
        };
        // Raise with the lock released; handlers may move the pointer again
        match released {
            Some((engine, pointer)) => match engine.upgrade() {
                Some(engine) => {
                    engine.raise_event(ViewerEvent::MouseMove(pointer));
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn has_pending_move(&self) -> bool {
        self.state
            .wiring
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|w| w.relay.is_pending())
            .unwrap_or(false)
    }

    /// Drop the relay, including any queued sample.
    pub fn detach(&self) {
        if let Some(mut wiring) = self.state.wiring.lock().unwrap_or_else(|e| e.into_inner()).take() {
            wiring.relay.cancel();
        }
        self.state.grabbing.store(false, Ordering::SeqCst);
    }
}
