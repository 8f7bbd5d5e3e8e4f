//! In-memory host surface.
//!
//! Layout at any viewport `w x h`:
//! - the canvas covers `x < 0.8w`;
//! - the sidebar covers the rest, one 40px row per item starting at y = 7,
//!   filtered and ranked by the current search text.
//!
//! Drag gestures are interpreted the way the real host reacts to them: a
//! press over a sidebar row or canvas instance grabs it, releasing over the
//! canvas drops it, and dropping within [`COMBINE_RADIUS`] of another instance
//! asks the resolver what the two make. A click near the first clear point
//! followed by a click near the second empties the canvas.

use super::{Element, EventFamily, EventKind, HostSurface, InputEvent, Point, Rect, Viewport};
use crate::knowledge::NOTHING;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Decides what two items combine into; `None` means they do not combine.
pub type Resolver = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

pub const DEFAULT_VIEWPORT: Viewport = Viewport::new(1440, 900);
pub const COMBINE_RADIUS: f64 = 30.0;

const SIDEBAR_FRACTION: f64 = 0.8;
const SIDEBAR_TOP: f64 = 7.0;
const ROW_HEIGHT: f64 = 40.0;
const INSTANCE_SIZE: f64 = 40.0;
const CLEAR_RADIUS: f64 = 20.0;

fn no_combination(_: &str, _: &str) -> Option<String> {
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasInstance {
    pub name: String,
    pub point: Point,
}

impl CanvasInstance {
    fn rect(&self) -> Rect {
        Rect::new(
            f64::from(self.point.x) - INSTANCE_SIZE / 2.0,
            f64::from(self.point.y) - INSTANCE_SIZE / 2.0,
            INSTANCE_SIZE,
            INSTANCE_SIZE,
        )
    }
}

#[derive(Debug)]
struct HeadlessState {
    viewport: Viewport,
    items: Vec<String>,
    query: String,
    canvas: Vec<CanvasInstance>,
    grabbed: Option<String>,
    clear_armed: bool,
    events: Vec<InputEvent>,
    clicks: VecDeque<Option<Point>>,
}

impl HeadlessState {
    fn canvas_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.viewport.width) * SIDEBAR_FRACTION,
            f64::from(self.viewport.height),
        )
    }

    fn sidebar_rect(&self) -> Rect {
        let left = f64::from(self.viewport.width) * SIDEBAR_FRACTION;
        Rect::new(
            left,
            0.0,
            f64::from(self.viewport.width) - left,
            f64::from(self.viewport.height),
        )
    }

    /// Items matching the search text, exact matches first.
    fn filtered(&self) -> Vec<&str> {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return self.items.iter().map(String::as_str).collect();
        }
        let (mut exact, mut partial): (Vec<&str>, Vec<&str>) = self
            .items
            .iter()
            .map(String::as_str)
            .filter(|name| name.to_lowercase().contains(&query))
            .partition(|name| name.to_lowercase() == query);
        exact.append(&mut partial);
        exact
    }

    fn rows(&self) -> Vec<(String, Rect)> {
        let sidebar = self.sidebar_rect();
        self.filtered()
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let rect = Rect::new(
                    sidebar.left,
                    SIDEBAR_TOP + ROW_HEIGHT * i as f64,
                    sidebar.width,
                    ROW_HEIGHT,
                );
                (name.to_string(), rect)
            })
            .take_while(|(_, rect)| rect.bottom() <= sidebar.bottom())
            .collect()
    }

    fn row_at(&self, point: Point) -> Option<(String, Rect)> {
        self.rows().into_iter().find(|(_, rect)| rect.contains(point))
    }

    fn instance_near(&self, point: Point, radius: f64) -> Option<usize> {
        self.canvas
            .iter()
            .enumerate()
            .map(|(i, inst)| (i, inst.point.distance_to(point)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    fn press(&mut self, point: Point) {
        if let Some((name, _)) = self.row_at(point) {
            self.grabbed = Some(name);
        } else if let Some(idx) = self.instance_near(point, INSTANCE_SIZE / 2.0) {
            self.grabbed = Some(self.canvas.remove(idx).name);
        }
    }

    fn release(&mut self, point: Point, resolver: &Resolver) {
        let Some(name) = self.grabbed.take() else {
            return;
        };
        if !self.canvas_rect().contains(point) {
            debug!("[Headless] dropped '{}' outside the canvas at {}", name, point);
            return;
        }
        let Some(idx) = self.instance_near(point, COMBINE_RADIUS) else {
            self.canvas.push(CanvasInstance { name, point });
            return;
        };
        let target = self.canvas[idx].clone();
        let product = resolver(&name, &target.name)
            .filter(|p| !p.trim().is_empty() && p != NOTHING);
        match product {
            Some(product) => {
                debug!(
                    "[Headless] {} + {} => {} at {}",
                    name, target.name, product, target.point
                );
                if !self.items.contains(&product) {
                    self.items.push(product.clone());
                }
                self.canvas[idx] = CanvasInstance {
                    name: product,
                    point: target.point,
                };
            }
            None => self.canvas.push(CanvasInstance { name, point }),
        }
    }

    fn click(&mut self, point: Point, clear_points: &[Point; 2]) {
        if self.clear_armed && point.distance_to(clear_points[1]) <= CLEAR_RADIUS {
            debug!("[Headless] clearing {} canvas instances", self.canvas.len());
            self.canvas.clear();
            self.clear_armed = false;
        } else {
            self.clear_armed = point.distance_to(clear_points[0]) <= CLEAR_RADIUS;
        }
    }
}

pub struct HeadlessSurface {
    state: Mutex<HeadlessState>,
    resolver: Resolver,
    clear_points: [Point; 2],
    pointer_events: bool,
    native_drag: bool,
}

impl HeadlessSurface {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in items.into_iter().map(Into::into) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self {
            state: Mutex::new(HeadlessState {
                viewport: DEFAULT_VIEWPORT,
                items: names,
                query: String::new(),
                canvas: Vec::new(),
                grabbed: None,
                clear_armed: false,
                events: Vec::new(),
                clicks: VecDeque::new(),
            }),
            resolver: Arc::new(no_combination),
            clear_points: [Point::new(1100, 850), Point::new(717, 453)],
            pointer_events: true,
            native_drag: true,
        }
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_viewport(self, viewport: Viewport) -> Self {
        self.state().viewport = viewport;
        self
    }

    /// Points whose consecutive clicks clear the canvas, in this surface's
    /// own pixels.
    pub fn with_clear_points(mut self, points: [Point; 2]) -> Self {
        self.clear_points = points;
        self
    }

    /// When disabled, pointer-family events are rejected and mouse-family
    /// events drive gestures instead.
    pub fn with_pointer_events(mut self, enabled: bool) -> Self {
        self.pointer_events = enabled;
        self
    }

    pub fn with_native_drag(mut self, enabled: bool) -> Self {
        self.native_drag = enabled;
        self
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_item(&self, name: &str) {
        let mut state = self.state();
        if !state.items.iter().any(|n| n == name) {
            state.items.push(name.to_string());
        }
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state().viewport = viewport;
    }

    /// Queue the result of the next `capture_click`.
    pub fn queue_click(&self, point: Option<Point>) {
        self.state().clicks.push_back(point);
    }

    pub fn items(&self) -> Vec<String> {
        self.state().items.clone()
    }

    pub fn canvas(&self) -> Vec<CanvasInstance> {
        self.state().canvas.clone()
    }

    pub fn query(&self) -> String {
        self.state().query.clone()
    }

    /// Every event delivered through `dispatch`, accepted or not.
    pub fn events(&self) -> Vec<InputEvent> {
        self.state().events.clone()
    }
}

#[async_trait]
impl HostSurface for HeadlessSurface {
    async fn visible_names(&self) -> HashSet<String> {
        self.state().items.iter().cloned().collect()
    }

    async fn locate(&self, name: &str) -> Option<Element> {
        let wanted = name.trim().to_lowercase();
        self.state()
            .rows()
            .into_iter()
            .find(|(label, _)| label.trim().to_lowercase() == wanted)
            .map(|(label, rect)| Element {
                name: Some(label),
                rect,
            })
    }

    async fn element_at(&self, point: Point) -> Option<Element> {
        let state = self.state();
        if let Some((label, rect)) = state.row_at(point) {
            return Some(Element {
                name: Some(label),
                rect,
            });
        }
        if let Some(idx) = state.instance_near(point, INSTANCE_SIZE / 2.0) {
            let inst = &state.canvas[idx];
            return Some(Element {
                name: Some(inst.name.clone()),
                rect: inst.rect(),
            });
        }
        let canvas = state.canvas_rect();
        canvas.contains(point).then_some(Element {
            name: None,
            rect: canvas,
        })
    }

    async fn canvas_rect(&self) -> Option<Rect> {
        Some(self.state().canvas_rect())
    }

    async fn viewport(&self) -> Viewport {
        self.state().viewport
    }

    async fn search(&self, text: &str) {
        self.state().query = text.to_string();
    }

    async fn dispatch(&self, event: InputEvent) -> bool {
        let mut state = self.state();
        state.events.push(event);

        let drives_gestures = match event.family {
            EventFamily::Pointer => self.pointer_events,
            EventFamily::Mouse => !self.pointer_events,
        };
        match event.kind {
            EventKind::Click => {
                state.click(event.point, &self.clear_points);
                true
            }
            _ if !drives_gestures => event.family == EventFamily::Mouse,
            EventKind::Down => {
                state.press(event.point);
                true
            }
            EventKind::Move => true,
            EventKind::Up => {
                state.release(event.point, &self.resolver);
                true
            }
        }
    }

    async fn native_drag(&self, from: Point, to: Point) -> bool {
        if !self.native_drag {
            return false;
        }
        let mut state = self.state();
        state.press(from);
        state.release(to, &self.resolver);
        true
    }

    async fn capture_click(&self, _prompt: &str) -> Option<Point> {
        self.state().clicks.pop_front().flatten()
    }
}
