//! Named engine events.
//!
//! The engine raises these; the bridge subscribes to a handful of them and
//! raises one of its own (`MouseMove`, the debounced pointer relay).

use super::geometry::Point;

/// Event name used for subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CanvasDrag,
    CanvasDragEnd,
    CanvasDoubleClick,
    /// Raw pointer movement over the canvas (undebounced).
    CanvasMove,
    AnimationFinish,
    ViewportChange,
    /// Debounced pointer movement re-raised by the bridge.
    MouseMove,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CanvasDrag => "canvas-drag",
            EventKind::CanvasDragEnd => "canvas-drag-end",
            EventKind::CanvasDoubleClick => "canvas-double-click",
            EventKind::CanvasMove => "canvas-move",
            EventKind::AnimationFinish => "animation-finish",
            EventKind::ViewportChange => "viewport-change",
            EventKind::MouseMove => "mouse-move",
        }
    }
}

/// Pointer position in container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    CanvasDrag { position: Point },
    CanvasDragEnd,
    /// `shift` is the zoom-out modifier.
    CanvasDoubleClick { position: Point, shift: bool },
    CanvasMove(PointerEvent),
    AnimationFinish,
    ViewportChange,
    MouseMove(PointerEvent),
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::CanvasDrag { .. } => EventKind::CanvasDrag,
            ViewerEvent::CanvasDragEnd => EventKind::CanvasDragEnd,
            ViewerEvent::CanvasDoubleClick { .. } => EventKind::CanvasDoubleClick,
            ViewerEvent::CanvasMove(_) => EventKind::CanvasMove,
            ViewerEvent::AnimationFinish => EventKind::AnimationFinish,
            ViewerEvent::ViewportChange => EventKind::ViewportChange,
            ViewerEvent::MouseMove(_) => EventKind::MouseMove,
        }
    }
}
