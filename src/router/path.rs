use crate::geometry::Point;
use std::fmt;

/// Cubic bezier wire between two ports, in screen space.
///
/// Both control points sit at the horizontal midpoint, level with their end,
/// so the wire leaves and enters horizontally and forms an S-curve whatever
/// the vertical offset between the ports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierPath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl BezierPath {
    pub fn between(start: Point, end: Point) -> Self {
        let mid_x = (start.x + end.x) / 2.0;
        Self {
            start,
            control1: Point::new(mid_x, start.y),
            control2: Point::new(mid_x, end.y),
            end,
        }
    }

    /// Evaluates the curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        )
    }

    /// Approximate distance from `point` to the curve, sampled as a polyline.
    pub fn distance_to(&self, point: Point) -> f64 {
        const SAMPLES: usize = 24;
        let mut best = f64::MAX;
        let mut prev = self.start;
        for i in 1..=SAMPLES {
            let next = self.point_at(i as f64 / SAMPLES as f64);
            best = best.min(segment_distance(point, prev, next));
            prev = next;
        }
        best
    }

    pub fn approx_eq(&self, other: &BezierPath, tolerance: f64) -> bool {
        self.start.approx_eq(other.start, tolerance)
            && self.control1.approx_eq(other.control1, tolerance)
            && self.control2.approx_eq(other.control2, tolerance)
            && self.end.approx_eq(other.end, tolerance)
    }

    /// SVG path data, e.g. `M 0 0 C 50 0, 50 80, 100 80`.
    pub fn to_svg(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BezierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.dx * ab.dx + ab.dy * ab.dy;
    if len_sq < f64::EPSILON {
        return p.distance(a);
    }
    let ap = p - a;
    let t = ((ap.dx * ab.dx + ap.dy * ab.dy) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_points_share_midpoint() {
        let path = BezierPath::between(Point::new(0.0, 10.0), Point::new(100.0, 90.0));
        assert_eq!(path.control1, Point::new(50.0, 10.0));
        assert_eq!(path.control2, Point::new(50.0, 90.0));
        assert_eq!(path.to_svg(), "M 0 10 C 50 10, 50 90, 100 90");
    }

    #[test]
    fn test_curve_endpoints_and_distance() {
        let path = BezierPath::between(Point::new(0.0, 0.0), Point::new(200.0, 0.0));
        assert_eq!(path.point_at(0.0), path.start);
        assert_eq!(path.point_at(1.0), path.end);
        assert!(path.distance_to(Point::new(100.0, 5.0)) < 5.0 + 1e-9);
    }
}
