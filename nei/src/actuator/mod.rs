//! Reproduces combinations on the host surface with simulated gestures.
//!
//! An [`Actuator`] is built for one operation from borrowed pieces: the host,
//! a snapshot of the persisted settings and the actuation config. It keeps no
//! state of its own.

pub mod drag;
pub mod geometry;

pub use drag::DragMethod;
pub use geometry::scale_point;

use crate::config::{ActuationConfig, ActuationMode};
use crate::error::{EngineError, EngineResult};
use crate::settings::{BotSettings, PctOffset};
use crate::surface::{Element, HostSurface, Point};
use drag::pause;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const REASON_NO_ELEMENT_AT_CLICK: &str = "no-element-at-click";
pub const REASON_CANVAS_NOT_FOUND: &str = "canvas-not-found";

pub struct Actuator<'a> {
    host: &'a dyn HostSurface,
    settings: &'a BotSettings,
    config: &'a ActuationConfig,
}

impl<'a> Actuator<'a> {
    pub fn new(
        host: &'a dyn HostSurface,
        settings: &'a BotSettings,
        config: &'a ActuationConfig,
    ) -> Self {
        Self {
            host,
            settings,
            config,
        }
    }

    pub fn mode(&self) -> ActuationMode {
        self.config.mode
    }

    async fn scaled(&self, point: Point) -> Point {
        let current = self.host.viewport().await;
        scale_point(point, self.settings.base_viewport, current)
    }

    /// Type `name` into the host search and find where to pick it up.
    async fn pickup_point(&self, name: &str, timeout_ms: u64) -> EngineResult<Point> {
        self.host.search(name).await;
        match self.config.mode {
            ActuationMode::Absolute => {
                pause(self.config.search_settle_ms).await;
                let point = self.settings.pickup_point.unwrap_or(self.config.pickup_point);
                Ok(self.scaled(point).await)
            }
            ActuationMode::Located => {
                let element = self
                    .wait_for_element(name, timeout_ms)
                    .await
                    .ok_or_else(|| EngineError::element_not_found(name))?;
                Ok(match self.settings.pickup_offset {
                    Some(offset) => offset.apply(&element.rect),
                    None => element.rect.center(),
                })
            }
        }
    }

    /// Poll `locate` until it succeeds or `timeout_ms` elapses. Always makes
    /// at least one attempt.
    async fn wait_for_element(&self, name: &str, timeout_ms: u64) -> Option<Element> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(element) = self.host.locate(name).await {
                return Some(element);
            }
            if Instant::now() >= deadline {
                return None;
            }
            pause(self.config.locate_poll_ms.max(1)).await;
        }
    }

    pub async fn drop_point(&self) -> Point {
        if self.config.mode == ActuationMode::Located {
            if let Some(canvas) = self.host.canvas_rect().await {
                let offset = self.settings.drop_offset.unwrap_or(PctOffset::new(
                    self.config.drop_offset_x_pct,
                    self.config.drop_offset_y_pct,
                ));
                return offset.apply(&canvas);
            }
            debug!("[Actuator] no canvas rectangle, using the absolute drop point");
        }
        let point = self.settings.drop_point.unwrap_or(self.config.drop_point);
        self.scaled(point).await
    }

    async fn drag(&self, from: Point, to: Point) -> DragMethod {
        drag::drag(
            self.host,
            from,
            to,
            self.config.drag_steps,
            self.config.drag_step_delay_ms,
        )
        .await
    }

    /// Drag `name` from the sidebar to the drop point. Returns the drop point.
    pub async fn place(&self, name: &str) -> EngineResult<Point> {
        let from = self
            .pickup_point(name, self.config.place_locate_timeout_ms)
            .await?;
        let to = self.drop_point().await;
        let method = self.drag(from, to).await;
        debug!("[Actuator] placed '{}' at {} via {:?}", name, to, method);
        pause(self.config.placement_settle_ms).await;
        Ok(to)
    }

    /// Place `a`, then drag `b` onto it. Returns the point `b` was dropped on.
    pub async fn combine(&self, a: &str, b: &str) -> EngineResult<Point> {
        info!("[Actuator] combine: {} + {}", a, b);
        let dropped = self.place(a).await?;

        let target = match self.config.mode {
            ActuationMode::Absolute => dropped,
            ActuationMode::Located => match self.host.element_at(dropped).await {
                Some(el)
                    if el
                        .name
                        .as_deref()
                        .map_or(false, |n| n.trim().eq_ignore_ascii_case(a.trim())) =>
                {
                    el.rect.center()
                }
                _ => dropped,
            },
        };

        let from = self
            .pickup_point(b, self.config.partner_locate_timeout_ms)
            .await?;
        self.drag(from, target).await;
        pause(self.config.combine_settle_ms).await;
        Ok(target)
    }

    /// Drag `partner` onto something already on the canvas at `target`.
    pub async fn combine_onto(&self, partner: &str, target: Point) -> EngineResult<()> {
        info!("[Actuator] chain combine: {} -> {}", partner, target);
        let from = self
            .pickup_point(partner, self.config.partner_locate_timeout_ms)
            .await?;
        self.drag(from, target).await;
        pause(self.config.chain_settle_ms).await;
        Ok(())
    }

    pub async fn clear_field(&self) {
        let [wait_before, wait_between, wait_after] = self.config.clear_waits_ms;
        let points = self.settings.clear_points.unwrap_or(self.config.clear_points);
        let first = self.scaled(points[0]).await;
        let second = self.scaled(points[1]).await;

        pause(wait_before).await;
        self.click(first).await;
        pause(wait_between).await;
        self.click(second).await;
        pause(wait_after).await;
        debug!("[Actuator] cleared field via {} and {}", first, second);
    }

    async fn click(&self, point: Point) {
        drag::click(
            self.host,
            point,
            self.config.click_hold_ms,
            self.config.click_release_ms,
        )
        .await
    }

    /// Ask the operator to click the item they want picked up; returns the
    /// click's offset inside that element. `None` when cancelled.
    pub async fn calibrate_pickup(&self) -> EngineResult<Option<PctOffset>> {
        let Some(click) = self
            .host
            .capture_click("Click the item's pickup point (Esc to cancel)")
            .await
        else {
            return Ok(None);
        };
        let element = self
            .host
            .element_at(click)
            .await
            .ok_or_else(|| EngineError::ElementNotFound {
                name: format!("element at {}", click),
                reason: REASON_NO_ELEMENT_AT_CLICK.to_string(),
            })?;
        let offset = PctOffset::of_point_in(click, &element.rect);
        info!(
            "[Actuator] pickup calibrated at {} => ({:.2}%, {:.2}%)",
            click,
            offset.x_pct * 100.0,
            offset.y_pct * 100.0
        );
        Ok(Some(offset))
    }

    /// Ask the operator to click the drop point; returns its offset inside the
    /// canvas. `None` when cancelled.
    pub async fn calibrate_drop(&self) -> EngineResult<Option<PctOffset>> {
        let Some(click) = self
            .host
            .capture_click("Click the canvas drop point (Esc to cancel)")
            .await
        else {
            return Ok(None);
        };
        let canvas = self
            .host
            .canvas_rect()
            .await
            .ok_or_else(|| EngineError::ElementNotFound {
                name: "canvas".to_string(),
                reason: REASON_CANVAS_NOT_FOUND.to_string(),
            })?;
        let offset = PctOffset::of_point_in(click, &canvas);
        info!(
            "[Actuator] drop calibrated at {} => ({:.2}%, {:.2}%)",
            click,
            offset.x_pct * 100.0,
            offset.y_pct * 100.0
        );
        Ok(Some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::REASON_SIDEBAR_ITEM_NOT_FOUND;
    use crate::surface::headless::Resolver;
    use crate::surface::{EventKind, HeadlessSurface, Viewport};
    use std::sync::Arc;

    fn steam() -> Resolver {
        Arc::new(|a: &str, b: &str| {
            let mut pair = [a, b];
            pair.sort();
            (pair == ["Fire", "Water"]).then(|| "Steam".to_string())
        })
    }

    fn config(mode: ActuationMode) -> ActuationConfig {
        ActuationConfig {
            mode,
            ..ActuationConfig::default()
        }
        .immediate()
    }

    #[tokio::test]
    async fn test_absolute_combine_and_clear() {
        let host = HeadlessSurface::new(["Water", "Fire"]).with_resolver(steam());
        let settings = BotSettings::default();
        let config = config(ActuationMode::Absolute);
        let actuator = Actuator::new(&host, &settings, &config);

        let target = actuator.combine("Water", "Fire").await.unwrap();
        assert_eq!(target, Point::new(600, 600));
        assert_eq!(host.canvas().len(), 1);
        assert_eq!(host.canvas()[0].name, "Steam");
        assert!(host.items().contains(&"Steam".to_string()));

        actuator.clear_field().await;
        assert!(host.canvas().is_empty());
    }

    #[tokio::test]
    async fn test_absolute_points_scale_with_viewport() {
        let host = HeadlessSurface::new(["Water"]).with_viewport(Viewport::new(720, 450));
        let settings = BotSettings {
            base_viewport: Some(Viewport::new(1440, 900)),
            ..BotSettings::default()
        };
        let config = config(ActuationMode::Absolute);
        let actuator = Actuator::new(&host, &settings, &config);

        let dropped = actuator.place("Water").await.unwrap();
        assert_eq!(dropped, Point::new(300, 300));
        let first = host.events()[0];
        assert_eq!(first.kind, EventKind::Down);
        assert_eq!(first.point, Point::new(596, 14));
        assert_eq!(host.canvas().len(), 1);
    }

    #[tokio::test]
    async fn test_located_combine() {
        let host = HeadlessSurface::new(["Earth", "Water", "Fire"]).with_resolver(steam());
        let settings = BotSettings::default();
        let config = config(ActuationMode::Located);
        let actuator = Actuator::new(&host, &settings, &config);

        assert_eq!(actuator.drop_point().await, Point::new(633, 450));
        actuator.combine("Water", "Fire").await.unwrap();
        let canvas = host.canvas();
        assert_eq!(canvas.len(), 1);
        assert_eq!(canvas[0].name, "Steam");
    }

    #[tokio::test]
    async fn test_located_missing_item() {
        let host = HeadlessSurface::new(["Water"]);
        let settings = BotSettings::default();
        let config = config(ActuationMode::Located);
        let actuator = Actuator::new(&host, &settings, &config);

        let err = actuator.place("Unobtainium").await.unwrap_err();
        assert_eq!(err.reason_code(), Some(REASON_SIDEBAR_ITEM_NOT_FOUND));
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_combine_onto_existing_point() {
        let host = HeadlessSurface::new(["Water", "Fire"]).with_resolver(steam());
        let settings = BotSettings::default();
        let config = config(ActuationMode::Absolute);
        let actuator = Actuator::new(&host, &settings, &config);

        let at = actuator.place("Water").await.unwrap();
        actuator.combine_onto("Fire", at).await.unwrap();
        assert_eq!(host.canvas()[0].name, "Steam");
    }

    #[tokio::test]
    async fn test_calibration() {
        let host = HeadlessSurface::new(["Water"]);
        let settings = BotSettings::default();
        let config = config(ActuationMode::Located);
        let actuator = Actuator::new(&host, &settings, &config);

        // Sidebar row 0 spans x 1152..1440, y 7..47.
        host.queue_click(Some(Point::new(1224, 17)));
        let pickup = actuator.calibrate_pickup().await.unwrap().unwrap();
        assert!((pickup.x_pct - 0.25).abs() < 1e-9);
        assert!((pickup.y_pct - 0.25).abs() < 1e-9);

        host.queue_click(Some(Point::new(576, 225)));
        let drop = actuator.calibrate_drop().await.unwrap().unwrap();
        assert_eq!(drop, PctOffset::new(0.5, 0.25));

        host.queue_click(None);
        assert!(actuator.calibrate_drop().await.unwrap().is_none());

        host.queue_click(Some(Point::new(1300, 800)));
        let err = actuator.calibrate_pickup().await.unwrap_err();
        assert_eq!(err.reason_code(), Some(REASON_NO_ELEMENT_AT_CLICK));
    }
}
