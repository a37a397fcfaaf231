//! Pointer tracking: turns mouse/touch events into stroke segments.

use crate::brush::BrushSettings;
use crate::render::Segment;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Which device produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Mouse(MouseButton),
    Touch,
}

/// Pointer event in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, kind: PointerKind },
    Move { position: Point, kind: PointerKind },
    Up { position: Point, kind: PointerKind },
    /// Pointer left the canvas element.
    Leave,
}

/// What the host should do with the native event after we handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventDisposition {
    #[default]
    Default,
    /// Suppress the browser default (touch scrolling).
    PreventDefault,
}

/// Result of feeding one event to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerResponse {
    /// Segment to render, emitted on moves while stroking.
    pub segment: Option<Segment>,
    /// A stroke just finished; time for a history checkpoint.
    pub stroke_ended: bool,
    pub disposition: EventDisposition,
}

/// Tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Stroking {
        /// Last position, in surface coordinates.
        last: (i32, i32),
    },
}

/// Round half toward positive infinity, like JavaScript's `Math.round`.
fn js_round(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// Maps client coordinates onto the surface and tracks the active stroke.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    state: TrackerState,
    surface_width: u32,
    surface_height: u32,
    /// Where the canvas element sits on screen, in client coordinates.
    display: Rect,
}

impl PointerTracker {
    /// Create a tracker for a surface displayed at its natural size at the origin.
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self {
            state: TrackerState::Idle,
            surface_width,
            surface_height,
            display: Rect::new(0.0, 0.0, surface_width as f64, surface_height as f64),
        }
    }

    /// Update the on-screen rectangle of the canvas element (after layout/CSS scaling).
    pub fn set_display_rect(&mut self, display: Rect) {
        self.display = display;
    }

    pub fn display_rect(&self) -> Rect {
        self.display
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, TrackerState::Stroking { .. })
    }

    /// Convert a client position to surface coordinates, compensating for CSS scaling.
    pub fn to_surface(&self, client: Point) -> (i32, i32) {
        let scale = |surface: u32, displayed: f64| {
            if displayed > 0.0 {
                surface as f64 / displayed
            } else {
                1.0
            }
        };
        let sx = scale(self.surface_width, self.display.width());
        let sy = scale(self.surface_height, self.display.height());
        (
            js_round((client.x - self.display.x0) * sx),
            js_round((client.y - self.display.y0) * sy),
        )
    }

    /// Process a pointer event.
    pub fn handle(&mut self, event: PointerEvent, brush: &BrushSettings) -> PointerResponse {
        match event {
            PointerEvent::Down { position, kind } => {
                let starts_stroke = matches!(
                    kind,
                    PointerKind::Mouse(MouseButton::Left) | PointerKind::Touch
                );
                if starts_stroke && !self.is_stroking() {
                    self.state = TrackerState::Stroking {
                        last: self.to_surface(position),
                    };
                }
                PointerResponse {
                    disposition: Self::disposition(kind, self.is_stroking()),
                    ..PointerResponse::default()
                }
            }
            PointerEvent::Move { position, kind } => {
                let TrackerState::Stroking { last } = self.state else {
                    return PointerResponse::default();
                };
                let current = self.to_surface(position);
                self.state = TrackerState::Stroking { last: current };
                PointerResponse {
                    segment: Some(Segment::new(last, current, *brush)),
                    stroke_ended: false,
                    disposition: Self::disposition(kind, true),
                }
            }
            PointerEvent::Up { kind, .. } => {
                let was_stroking = self.end_stroke();
                PointerResponse {
                    segment: None,
                    stroke_ended: was_stroking,
                    disposition: Self::disposition(kind, was_stroking),
                }
            }
            PointerEvent::Leave => PointerResponse {
                stroke_ended: self.end_stroke(),
                ..PointerResponse::default()
            },
        }
    }

    /// Drop any active stroke without reporting it. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        self.end_stroke()
    }

    fn end_stroke(&mut self) -> bool {
        let was_stroking = self.is_stroking();
        self.state = TrackerState::Idle;
        was_stroking
    }

    fn disposition(kind: PointerKind, stroking: bool) -> EventDisposition {
        if kind == PointerKind::Touch && stroking {
            EventDisposition::PreventDefault
        } else {
            EventDisposition::Default
        }
    }
}
