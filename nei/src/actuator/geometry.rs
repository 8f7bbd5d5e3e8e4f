use crate::surface::{Point, Viewport};

/// Scale a point recorded against `base` to the `current` viewport, rounding
/// each axis. Identity when no usable reference is known.
pub fn scale_point(point: Point, base: Option<Viewport>, current: Viewport) -> Point {
    let Some(base) = base.filter(|b| b.width > 0 && b.height > 0) else {
        return point;
    };
    let sx = f64::from(current.width) / f64::from(base.width);
    let sy = f64::from(current.height) / f64::from(base.height);
    Point::new(
        (f64::from(point.x) * sx).round() as i32,
        (f64::from(point.y) * sy).round() as i32,
    )
}

/// The `steps` points after `start` on the straight line to `end`, the last
/// one being `end` itself.
pub fn interpolate(start: Point, end: Point, steps: u32) -> Vec<Point> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| {
            let t = f64::from(i) / f64::from(steps);
            Point::new(
                (f64::from(start.x) + f64::from(end.x - start.x) * t).round() as i32,
                (f64::from(start.y) + f64::from(end.y - start.y) * t).round() as i32,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_point() {
        let p = Point::new(1191, 27);
        let base = Viewport::new(1440, 900);
        assert_eq!(scale_point(p, None, Viewport::new(720, 450)), p);
        assert_eq!(scale_point(p, Some(base), base), p);
        assert_eq!(
            scale_point(p, Some(base), Viewport::new(720, 450)),
            Point::new(596, 14)
        );
        assert_eq!(
            scale_point(p, Some(Viewport::new(0, 900)), Viewport::new(720, 450)),
            p
        );
    }

    #[test]
    fn test_interpolate_ends_at_target() {
        let path = interpolate(Point::new(0, 0), Point::new(10, -5), 4);
        assert_eq!(
            path,
            vec![
                Point::new(3, -1),
                Point::new(5, -3),
                Point::new(8, -4),
                Point::new(10, -5)
            ]
        );
        assert_eq!(interpolate(Point::new(1, 1), Point::new(2, 2), 0), vec![Point::new(2, 2)]);
    }
}
