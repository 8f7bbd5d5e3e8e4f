//! Host surface: the visual environment the engine observes and acts in.
//!
//! The engine never inspects the host directly. It asks the surface which
//! item names are visible, where a named element sits, and hands it raw
//! pointer/mouse events to replay.

pub mod headless;

pub use headless::HeadlessSurface;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A point in client pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Bounding box in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Point at a fractional offset inside the box, floored to whole pixels.
    pub fn at_fraction(&self, x_pct: f64, y_pct: f64) -> Point {
        Point::new(
            (self.left + self.width * x_pct).floor() as i32,
            (self.top + self.height * y_pct).floor() as i32,
        )
    }

    pub fn center(&self) -> Point {
        self.at_fraction(0.5, 0.5)
    }

    pub fn contains(&self, p: Point) -> bool {
        let (x, y) = (f64::from(p.x), f64::from(p.y));
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Something found on the surface. `name` is set for item elements and
/// empty for containers such as the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: Option<String>,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Down,
    Move,
    Up,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFamily {
    Pointer,
    Mouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: EventKind,
    pub family: EventFamily,
    pub point: Point,
    /// Pressed-button mask: 1 while the primary button is held.
    pub buttons: u8,
}

impl InputEvent {
    pub fn new(kind: EventKind, family: EventFamily, point: Point) -> Self {
        let buttons = match kind {
            EventKind::Down | EventKind::Move => 1,
            EventKind::Up | EventKind::Click => 0,
        };
        Self {
            kind,
            family,
            point,
            buttons,
        }
    }

    pub fn pointer(kind: EventKind, point: Point) -> Self {
        Self::new(kind, EventFamily::Pointer, point)
    }

    pub fn mouse(kind: EventKind, point: Point) -> Self {
        Self::new(kind, EventFamily::Mouse, point)
    }
}

/// Collaborator interface to the host environment.
#[async_trait]
pub trait HostSurface: Send + Sync {
    /// Every item name the host currently offers, regardless of any active
    /// search filter.
    async fn visible_names(&self) -> HashSet<String>;

    /// Sidebar element whose label matches `name` (case-insensitive).
    async fn locate(&self, name: &str) -> Option<Element>;

    /// Topmost element at `point`.
    async fn element_at(&self, point: Point) -> Option<Element>;

    async fn canvas_rect(&self) -> Option<Rect>;

    async fn viewport(&self) -> Viewport;

    /// Type `text` into the host's search box.
    async fn search(&self, text: &str);

    /// Deliver one input event. Returns false when the host rejected it.
    async fn dispatch(&self, event: InputEvent) -> bool;

    /// Host-native drag and drop between two points. Returns false when
    /// unsupported.
    async fn native_drag(&self, from: Point, to: Point) -> bool;

    /// Wait for the operator to click somewhere. `None` means cancelled.
    async fn capture_click(&self, prompt: &str) -> Option<Point>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_fraction_and_contains() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.center(), Point::new(60, 45));
        assert_eq!(rect.at_fraction(0.55, 0.5), Point::new(65, 45));
        assert!(rect.contains(Point::new(10, 20)));
        assert!(!rect.contains(Point::new(110, 20)));
    }

    #[test]
    fn test_event_buttons() {
        assert_eq!(InputEvent::pointer(EventKind::Down, Point::default()).buttons, 1);
        assert_eq!(InputEvent::mouse(EventKind::Up, Point::default()).buttons, 0);
    }
}
