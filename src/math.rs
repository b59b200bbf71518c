use std::f64::consts::PI;

#[inline(always)]
pub fn pi(v: f64) -> f64 {
    PI * v
}

#[inline]
pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Rotates `(x, y)` about `(cx, cy)` by `theta` radians.
///
/// With y pointing down, a positive `theta` turns counterclockwise as seen on screen.
pub fn rotate_about((x, y): (f64, f64), (cx, cy): (f64, f64), theta: f64) -> (f64, f64) {
    let (sin, cos) = theta.sin_cos();
    let dx = x - cx;
    let dy = y - cy;
    (cos * dx + sin * dy + cx, -sin * dx + cos * dy + cy)
}

/// Minkowski distance of order `p` between two points. `p = 2.0` gives the Euclidean distance.
pub fn minkowski((x1, y1): (f64, f64), (x2, y2): (f64, f64), p: f64) -> f64 {
    let dx = (x1 - x2).abs();
    let dy = (y1 - y2).abs();
    (dx.powf(p) + dy.powf(p)).powf(p.recip())
}

/// Vertices of a regular `n`-gon with circumradius `r` centered at `center`, starting at angle
/// `start` and proceeding in the direction of increasing angle.
pub fn regular_polygon(center: (f64, f64), r: f64, n: usize, start: f64) -> Vec<(f64, f64)> {
    (0..n)
        .map(|k| {
            let theta = pi(2.0) * k as f64 / n as f64 + start;
            (center.0 + r * theta.cos(), center.1 + r * theta.sin())
        })
        .collect()
}

/// Clips a polygon to the axis-aligned rectangle from `min` to `max` (Sutherland-Hodgman). The
/// result may be empty.
pub fn clip_to_rect(polygon: &[(f64, f64)], min: (f64, f64), max: (f64, f64)) -> Vec<(f64, f64)> {
    let ((x0, y0), (x1, y1)) = (min, max);
    let mut out = polygon.to_vec();
    for side in 0..4 {
        let Some(&last) = out.last() else {
            break;
        };
        let inside = |(x, y): (f64, f64)| match side {
            0 => x >= x0,
            1 => x <= x1,
            2 => y >= y0,
            _ => y <= y1,
        };
        // Only called for segments with one end on each side, so the divisor is never zero.
        let crossing = |(ax, ay): (f64, f64), (bx, by): (f64, f64)| match side {
            0 | 1 => {
                let x = if side == 0 { x0 } else { x1 };
                (x, ay + (x - ax) / (bx - ax) * (by - ay))
            }
            _ => {
                let y = if side == 2 { y0 } else { y1 };
                (ax + (y - ay) / (by - ay) * (bx - ax), y)
            }
        };
        let input = std::mem::take(&mut out);
        let mut prev = last;
        for &cur in &input {
            match (inside(prev), inside(cur)) {
                (true, true) => out.push(cur),
                (true, false) => out.push(crossing(prev, cur)),
                (false, true) => {
                    out.push(crossing(prev, cur));
                    out.push(cur);
                }
                (false, false) => {}
            }
            prev = cur;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        let d = (actual.0 - expected.0).abs().max((actual.1 - expected.1).abs());
        if d > 1e-9 {
            panic!("got {:?}, want {:?}", actual, expected);
        }
    }

    #[test]
    fn test_pi() {
        assert_eq!(pi(0.0), 0.0);
        assert_eq!(pi(1.0), PI);
        assert_eq!(pi(-3.7), -3.7 * PI);
        assert!(pi(f64::NAN).is_nan());
    }

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(7.0), 1.0);
    }

    #[test]
    fn test_rotate_about() {
        let center = (10.0, 10.0);
        assert_close(rotate_about((12.0, 10.0), center, 0.0), (12.0, 10.0));
        // A quarter turn moves a point to the right of the center to above it.
        assert_close(rotate_about((12.0, 10.0), center, pi(0.5)), (10.0, 8.0));
        assert_close(rotate_about((12.0, 10.0), center, pi(1.0)), (8.0, 10.0));
        assert_close(rotate_about(center, center, 1.234), center);
    }

    #[test]
    fn test_minkowski() {
        assert!((minkowski((0.0, 0.0), (3.0, 4.0), 2.0) - 5.0).abs() < 1e-12);
        assert!((minkowski((0.0, 0.0), (3.0, 4.0), 1.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_regular_polygon() {
        let hexagon = regular_polygon((0.0, 0.0), 2.0, 6, 0.0);
        assert_eq!(hexagon.len(), 6);
        assert_close(hexagon[0], (2.0, 0.0));
        assert_close(hexagon[3], (-2.0, 0.0));
        let triangle = regular_polygon((1.0, 1.0), 1.0, 3, pi(1.0));
        assert_close(triangle[0], (0.0, 1.0));
    }

    #[test]
    fn test_clip_to_rect() {
        let inside = [(1.0, 1.0), (3.0, 1.0), (3.0, 3.0)];
        assert_eq!(clip_to_rect(&inside, (0.0, 0.0), (4.0, 4.0)), inside.to_vec());

        let outside = [(10.0, 10.0), (12.0, 10.0), (12.0, 12.0)];
        assert!(clip_to_rect(&outside, (0.0, 0.0), (4.0, 4.0)).is_empty());

        // A huge square around the rectangle clips to the rectangle itself.
        let huge = [(-1e30, -1e30), (1e30, -1e30), (1e30, 1e30), (-1e30, 1e30)];
        let clipped = clip_to_rect(&huge, (0.0, 0.0), (4.0, 2.0));
        assert_eq!(clipped.len(), 4);
        for &(x, y) in &clipped {
            assert!((x == 0.0 || x == 4.0) && (y == 0.0 || y == 2.0), "{:?}", clipped);
        }

        // Half of a square straddling the left edge survives.
        let straddle = [(-2.0, 1.0), (2.0, 1.0), (2.0, 3.0), (-2.0, 3.0)];
        let clipped = clip_to_rect(&straddle, (0.0, 0.0), (4.0, 4.0));
        let xs: Vec<f64> = clipped.iter().map(|p| p.0).collect();
        assert!(xs.iter().all(|&x| x == 0.0 || x == 2.0));
        assert_eq!(clipped.len(), 4);
    }
}
