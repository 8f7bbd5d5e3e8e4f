//! Operator settings persisted under the `bot_config` key: calibration
//! offsets, absolute points, reference viewport, clear points and the
//! restricted-name list.

use crate::error::{EngineError, EngineResult};
use crate::selector::is_restricted;
use crate::storage::{self, KeyValueStore, KEY_BOT_CONFIG};
use crate::surface::{Point, Rect, Viewport};
use serde::{Deserialize, Serialize};

/// Fractional position inside a rectangle, each axis in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PctOffset {
    #[serde(alias = "xPct")]
    pub x_pct: f64,
    #[serde(alias = "yPct")]
    pub y_pct: f64,
}

impl PctOffset {
    pub fn new(x_pct: f64, y_pct: f64) -> Self {
        Self {
            x_pct: x_pct.clamp(0.0, 1.0),
            y_pct: y_pct.clamp(0.0, 1.0),
        }
    }

    /// Offset of `point` relative to `rect`, clamped to the rectangle.
    pub fn of_point_in(point: Point, rect: &Rect) -> Self {
        let rel_x = f64::from(point.x) - rect.left;
        let rel_y = f64::from(point.y) - rect.top;
        Self::new(rel_x / rect.width.max(1.0), rel_y / rect.height.max(1.0))
    }

    pub fn apply(&self, rect: &Rect) -> Point {
        rect.at_fraction(self.x_pct, self.y_pct)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    #[serde(alias = "pickupOffset")]
    pub pickup_offset: Option<PctOffset>,
    #[serde(alias = "dropOffset")]
    pub drop_offset: Option<PctOffset>,
    /// Overrides the configured absolute pickup point.
    pub pickup_point: Option<Point>,
    /// Overrides the configured absolute drop point.
    pub drop_point: Option<Point>,
    #[serde(alias = "baseViewport")]
    pub base_viewport: Option<Viewport>,
    #[serde(alias = "clearPoints")]
    pub clear_points: Option<[Point; 2]>,
    pub restricted: Vec<String>,
}

impl BotSettings {
    pub fn load(store: &dyn KeyValueStore) -> EngineResult<Self> {
        let mut settings: BotSettings =
            storage::load_value(store, KEY_BOT_CONFIG)?.unwrap_or_default();
        // A zero-sized reference cannot scale anything.
        if matches!(settings.base_viewport, Some(v) if v.width == 0 || v.height == 0) {
            settings.base_viewport = None;
        }
        Ok(settings)
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> EngineResult<()> {
        storage::save_value(store, KEY_BOT_CONFIG, self)
    }

    /// Add a restricted name. Returns false when it was already present
    /// (compared case-insensitively).
    pub fn add_restricted(&mut self, name: &str) -> EngineResult<bool> {
        let name = non_empty_name(name)?;
        if is_restricted(name, &self.restricted) {
            return Ok(false);
        }
        self.restricted.push(name.to_string());
        Ok(true)
    }

    /// Remove every entry matching `name` case-insensitively. Returns whether
    /// anything was removed.
    pub fn remove_restricted(&mut self, name: &str) -> EngineResult<bool> {
        let name = non_empty_name(name)?.to_lowercase();
        let before = self.restricted.len();
        self.restricted
            .retain(|r| r.trim().to_lowercase() != name);
        Ok(self.restricted.len() != before)
    }

    pub fn set_base_viewport(&mut self, width: i64, height: i64) -> EngineResult<Viewport> {
        let dim = |v: i64, label: &str| {
            u32::try_from(v)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    EngineError::InvalidConfiguration(format!(
                        "viewport {} must be a positive integer, got {}",
                        label, v
                    ))
                })
        };
        let viewport = Viewport::new(dim(width, "width")?, dim(height, "height")?);
        self.base_viewport = Some(viewport);
        Ok(viewport)
    }

    /// Record `current` as the reference viewport when none is known yet.
    pub fn ensure_base_viewport(&mut self, current: Viewport) -> bool {
        if self.base_viewport.is_some() || current.width == 0 || current.height == 0 {
            return false;
        }
        self.base_viewport = Some(current);
        true
    }
}

fn non_empty_name(name: &str) -> EngineResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::InvalidConfiguration(
            "restricted name must not be empty".to_string(),
        ));
    }
    Ok(name)
}
