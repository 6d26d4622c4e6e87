//! Per-page pointer state machine driving stamp and erase on an overlay surface.

use kurbo::{Point, Rect, Size, Vec2};
use rand::rngs::StdRng;

use crate::config::ToolConfig;
use crate::mosaic;
use crate::surface::{PixelBounds, Surface};
use crate::tool::{Mode, ModeHandle};

/// Pointer input on one page overlay. Only presses and moves carry a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

impl PointerEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self::Down(Point::new(x, y))
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::Move(Point::new(x, y))
    }

    pub fn up() -> Self {
        Self::Up
    }

    pub fn leave() -> Self {
        Self::Leave
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Down(point) | Self::Move(point) => Some(*point),
            Self::Up | Self::Leave => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { last: Point },
}

/// Bound to exactly one overlay surface. The only state shared with other pages is the
/// mode handle.
#[derive(Debug)]
pub struct PointerController {
    mode: ModeHandle,
    tool: ToolConfig,
    drag: DragState,
    rng: StdRng,
}

impl PointerController {
    pub fn new(mode: ModeHandle, tool: ToolConfig, rng: StdRng) -> Self {
        Self {
            mode,
            tool,
            drag: DragState::Idle,
            rng,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn last_point(&self) -> Option<Point> {
        match self.drag {
            DragState::Idle => None,
            DragState::Dragging { last } => Some(last),
        }
    }

    /// Applies one event. Returns the overlay span that was written, if any.
    pub fn handle(&mut self, overlay: &mut Surface, event: PointerEvent) -> Option<PixelBounds> {
        match (event, self.drag) {
            (PointerEvent::Down(position), _) => {
                self.drag = DragState::Dragging { last: position };
                None
            }
            (PointerEvent::Move(position), DragState::Dragging { last }) => {
                // Stamps land on the previous sample, one event behind the pointer.
                let written = match self.mode.get() {
                    Mode::Erase => overlay.clear_rect(self.erase_rect(position)),
                    Mode::Stamp => mosaic::stamp(
                        overlay,
                        last,
                        f64::from(self.tool.stamp_size),
                        &mut self.rng,
                    ),
                    Mode::None => None,
                };
                self.drag = DragState::Dragging { last: position };
                written
            }
            (PointerEvent::Move(_), DragState::Idle) => None,
            (PointerEvent::Up | PointerEvent::Leave, _) => {
                self.drag = DragState::Idle;
                None
            }
        }
    }

    fn erase_rect(&self, position: Point) -> Rect {
        let [dx, dy] = self.tool.erase_offset;
        let size = f64::from(self.tool.erase_size);
        Rect::from_center_size(
            position + Vec2::new(f64::from(dx), f64::from(dy)),
            Size::new(size, size),
        )
    }
}
