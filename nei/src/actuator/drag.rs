//! Low-level gestures built from individual input events.

use super::geometry::interpolate;
use crate::surface::{EventKind, HostSurface, InputEvent, Point};
use std::time::Duration;
use tracing::debug;

/// Which strategy finally carried a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMethod {
    Pointer,
    Native,
    Mouse,
}

pub(crate) async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Send a pointer event followed by its mouse-family mirror. Returns whether
/// the pointer event was accepted.
async fn dispatch_mirrored(host: &dyn HostSurface, kind: EventKind, point: Point) -> bool {
    let accepted = host.dispatch(InputEvent::pointer(kind, point)).await;
    host.dispatch(InputEvent::mouse(kind, point)).await;
    accepted
}

/// Press at `from`, move in `steps` interpolated steps, release at `to`.
///
/// A rejected press aborts before anything is mirrored, so a fallback can
/// take over without a half-finished gesture on the host.
pub async fn pointer_drag(
    host: &dyn HostSurface,
    from: Point,
    to: Point,
    steps: u32,
    step_delay_ms: u64,
) -> bool {
    if !host.dispatch(InputEvent::pointer(EventKind::Down, from)).await {
        return false;
    }
    host.dispatch(InputEvent::mouse(EventKind::Down, from)).await;
    for point in interpolate(from, to, steps) {
        dispatch_mirrored(host, EventKind::Move, point).await;
        pause(step_delay_ms).await;
    }
    dispatch_mirrored(host, EventKind::Up, to).await;
    true
}

/// Plain mouse-event drag, the last resort.
pub async fn mouse_drag(host: &dyn HostSurface, from: Point, to: Point) {
    for (kind, point) in [
        (EventKind::Down, from),
        (EventKind::Move, from),
        (EventKind::Move, to),
        (EventKind::Up, to),
    ] {
        host.dispatch(InputEvent::mouse(kind, point)).await;
    }
}

/// Drag with fallbacks: pointer path, then native drag, then mouse events.
pub async fn drag(
    host: &dyn HostSurface,
    from: Point,
    to: Point,
    steps: u32,
    step_delay_ms: u64,
) -> DragMethod {
    if pointer_drag(host, from, to, steps, step_delay_ms).await {
        return DragMethod::Pointer;
    }
    debug!("[Actuator] pointer drag {} -> {} rejected, trying native drag", from, to);
    if host.native_drag(from, to).await {
        return DragMethod::Native;
    }
    debug!("[Actuator] native drag unavailable, falling back to mouse events");
    mouse_drag(host, from, to).await;
    DragMethod::Mouse
}

/// Press, hold, release (mirrored), then a mouse click event.
pub async fn click(host: &dyn HostSurface, point: Point, hold_ms: u64, release_ms: u64) {
    dispatch_mirrored(host, EventKind::Down, point).await;
    pause(hold_ms).await;
    dispatch_mirrored(host, EventKind::Up, point).await;
    pause(release_ms).await;
    host.dispatch(InputEvent::mouse(EventKind::Click, point)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{EventFamily, HeadlessSurface};

    const PICKUP: Point = Point::new(1191, 27);
    const DROP: Point = Point::new(600, 600);

    #[tokio::test]
    async fn test_pointer_drag_mirrors_every_event() {
        let host = HeadlessSurface::new(["Water"]);
        assert_eq!(drag(&host, PICKUP, DROP, 4, 0).await, DragMethod::Pointer);

        let events = host.events();
        // down + 4 moves + up, each mirrored
        assert_eq!(events.len(), 12);
        for pair in events.chunks(2) {
            assert_eq!(pair[0].family, EventFamily::Pointer);
            assert_eq!(pair[1].family, EventFamily::Mouse);
            assert_eq!(pair[0].kind, pair[1].kind);
            assert_eq!(pair[0].point, pair[1].point);
        }
        assert_eq!(events[0].point, PICKUP);
        assert_eq!(events[11].point, DROP);
        assert_eq!(host.canvas().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_native_drag() {
        let host = HeadlessSurface::new(["Water"]).with_pointer_events(false);
        assert_eq!(drag(&host, PICKUP, DROP, 4, 0).await, DragMethod::Native);
        assert_eq!(host.events().len(), 1);
        assert_eq!(host.canvas().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_mouse_drag() {
        let host = HeadlessSurface::new(["Water"])
            .with_pointer_events(false)
            .with_native_drag(false);
        assert_eq!(drag(&host, PICKUP, DROP, 4, 0).await, DragMethod::Mouse);
        assert_eq!(host.canvas().len(), 1);
        assert_eq!(host.canvas()[0].point, DROP);
    }

    #[tokio::test]
    async fn test_click_sequence() {
        let host = HeadlessSurface::new(Vec::<String>::new());
        click(&host, Point::new(5, 5), 0, 0).await;
        let kinds: Vec<_> = host.events().iter().map(|e| (e.kind, e.family)).collect();
        assert_eq!(
            kinds,
            vec![
                (EventKind::Down, EventFamily::Pointer),
                (EventKind::Down, EventFamily::Mouse),
                (EventKind::Up, EventFamily::Pointer),
                (EventKind::Up, EventFamily::Mouse),
                (EventKind::Click, EventFamily::Mouse),
            ]
        );
    }
}
