//! Geometry primitives on fixed-point `i64` coordinates.
//!
//! Everything order-sensitive (orientation, point-in-polygon) is computed in
//! `i128`, which is exact for the full coordinate range. Only slope and
//! intersection solving use `f64`, and both are followed by range checks so
//! imprecision can never smuggle a coordinate out of the representable range.

use serde::{Deserialize, Serialize};

/// Coordinates further from zero than this are treated as invalid. Keeping a
/// wide margin below `i64::MAX` leaves headroom for the rounding in the
/// intersection solve.
pub const MAX_COORD: i64 = i64::MAX / 4;

/// Sentinel for a coordinate that overflowed the representable range.
pub const INVALID_COORD: i64 = i64::MAX;

/// An integer point. `y` grows downward, matching the sweep convention.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Point64 {
    pub x: i64,
    pub y: i64,
}

impl std::fmt::Debug for Point64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Point64 {
    pub const fn new(x: i64, y: i64) -> Self {
        Point64 { x, y }
    }
}

impl From<(i64, i64)> for Point64 {
    fn from((x, y): (i64, i64)) -> Self {
        Point64 { x, y }
    }
}

/// A floating-point point, used only at the API boundary by the
/// precision-scaling layer.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointD {
    pub x: f64,
    pub y: f64,
}

impl std::fmt::Debug for PointD {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl PointD {
    pub const fn new(x: f64, y: f64) -> Self {
        PointD { x, y }
    }
}

impl From<(f64, f64)> for PointD {
    fn from((x, y): (f64, f64)) -> Self {
        PointD { x, y }
    }
}

pub type Path64 = Vec<Point64>;
pub type Paths64 = Vec<Path64>;
pub type PathD = Vec<PointD>;
pub type PathsD = Vec<PathD>;

/// Axis-aligned bounding rectangle. `top` is the smaller `y` (y-down).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect64 {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Default for Rect64 {
    fn default() -> Self {
        // A zero-size rect, so that `is_empty` holds until real bounds are set.
        Rect64 {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        }
    }
}

impl Rect64 {
    pub fn is_empty(&self) -> bool {
        self.bottom <= self.top || self.right <= self.left
    }

    pub fn contains_rect(&self, other: &Rect64) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    pub fn mid_point(&self) -> Point64 {
        Point64::new((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

/// Bounds of a path; the empty default rect if the path has no points.
pub fn bounds(path: &[Point64]) -> Rect64 {
    let mut r = Rect64 {
        left: i64::MAX,
        top: i64::MAX,
        right: i64::MIN,
        bottom: i64::MIN,
    };
    if path.is_empty() {
        return Rect64::default();
    }
    for pt in path {
        r.left = r.left.min(pt.x);
        r.right = r.right.max(pt.x);
        r.top = r.top.min(pt.y);
        r.bottom = r.bottom.max(pt.y);
    }
    r
}

/// Cross product of (b - a) x (c - b), exact.
///
/// With y-down coordinates a negative result means the path a->b->c turns
/// counter-clockwise on screen.
pub fn cross(a: Point64, b: Point64, c: Point64) -> i128 {
    (b.x as i128 - a.x as i128) * (c.y as i128 - b.y as i128)
        - (b.y as i128 - a.y as i128) * (c.x as i128 - b.x as i128)
}

/// Dot product of (b - a) . (c - b), exact.
pub fn dot(a: Point64, b: Point64, c: Point64) -> i128 {
    (b.x as i128 - a.x as i128) * (c.x as i128 - b.x as i128)
        + (b.y as i128 - a.y as i128) * (c.y as i128 - b.y as i128)
}

/// Rounds to the nearest integer coordinate, mapping anything non-finite or
/// outside the safe range to [`INVALID_COORD`].
pub fn round_coord(v: f64) -> i64 {
    if !v.is_finite() || v.abs() >= MAX_COORD as f64 {
        INVALID_COORD
    } else {
        v.round() as i64
    }
}

pub fn is_valid_coord(v: i64) -> bool {
    v.abs() < MAX_COORD
}

/// Intersection of the (infinite) lines through `a`-`b` and `c`-`d`, clamped
/// to the `a`-`b` segment. `None` when the lines are parallel.
///
/// The solve is in `f64`; a result far outside the current scanbeam is the
/// caller's cue to re-derive the point from the nearer segment.
pub fn segment_intersect_pt(a: Point64, b: Point64, c: Point64, d: Point64) -> Option<Point64> {
    let dy1 = (b.y - a.y) as f64;
    let dx1 = (b.x - a.x) as f64;
    let dy2 = (d.y - c.y) as f64;
    let dx2 = (d.x - c.x) as f64;
    let det = dy1 * dx2 - dy2 * dx1;
    if det == 0.0 {
        return None;
    }
    let t = ((a.x - c.x) as f64 * dy2 - (a.y - c.y) as f64 * dx2) / det;
    if t <= 0.0 {
        Some(a)
    } else if t >= 1.0 {
        Some(b)
    } else {
        Some(Point64::new(
            round_coord(a.x as f64 + t * dx1),
            round_coord(a.y as f64 + t * dy1),
        ))
    }
}

/// The point on segment `s1`-`s2` closest to `off`, rounded to integers.
pub fn closest_pt_on_segment(off: Point64, s1: Point64, s2: Point64) -> Point64 {
    if s1 == s2 {
        return s1;
    }
    let dx = (s2.x - s1.x) as f64;
    let dy = (s2.y - s1.y) as f64;
    let mut q = ((off.x - s1.x) as f64 * dx + (off.y - s1.y) as f64 * dy) / (dx * dx + dy * dy);
    q = q.clamp(0.0, 1.0);
    Point64::new(
        round_coord(s1.x as f64 + q * dx),
        round_coord(s1.y as f64 + q * dy),
    )
}

/// Squared perpendicular distance from `pt` to the line through `l1`-`l2`.
pub fn perpendic_dist_from_line_sqrd(pt: Point64, l1: Point64, l2: Point64) -> f64 {
    let a = (pt.x - l1.x) as f64;
    let b = (pt.y - l1.y) as f64;
    let c = (l2.x - l1.x) as f64;
    let d = (l2.y - l1.y) as f64;
    if c == 0.0 && d == 0.0 {
        return 0.0;
    }
    let e = a * d - c * b;
    e * e / (c * c + d * d)
}

/// True when the open segments properly cross (endpoint touches excluded).
pub fn segments_intersect(a1: Point64, a2: Point64, b1: Point64, b2: Point64) -> bool {
    let d1 = cross(a1, b1, b2);
    let d2 = cross(a2, b1, b2);
    let d3 = cross(b1, a1, a2);
    let d4 = cross(b2, a1, a2);
    (d1.signum() * d2.signum() < 0) && (d3.signum() * d4.signum() < 0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointInPolygonResult {
    IsOn,
    IsInside,
    IsOutside,
}

/// Winding-parity point-in-polygon test, exact for integer inputs.
pub fn point_in_polygon(pt: Point64, polygon: &[Point64]) -> PointInPolygonResult {
    let len = polygon.len();
    if len < 3 {
        return PointInPolygonResult::IsOutside;
    }
    let mut start = 0;
    while start < len && polygon[start].y == pt.y {
        start += 1;
    }
    if start == len {
        return PointInPolygonResult::IsOutside;
    }

    let mut is_above = polygon[start].y < pt.y;
    let starting_above = is_above;
    let mut val = 0u32;
    let mut i = start + 1;
    let mut end = len;
    loop {
        if i == end {
            if end == 0 || start == 0 {
                break;
            }
            end = start;
            i = 0;
        }

        if is_above {
            while i < end && polygon[i].y < pt.y {
                i += 1;
            }
        } else {
            while i < end && polygon[i].y > pt.y {
                i += 1;
            }
        }
        if i == end {
            continue;
        }

        let curr = polygon[i];
        let prev = if i > 0 { polygon[i - 1] } else { polygon[len - 1] };

        if curr.y == pt.y {
            if curr.x == pt.x || (curr.y == prev.y && ((pt.x < prev.x) != (pt.x < curr.x))) {
                return PointInPolygonResult::IsOn;
            }
            i += 1;
            if i == start {
                break;
            }
            continue;
        }

        if pt.x < curr.x && pt.x < prev.x {
            // the crossing is to our right; parity unchanged
        } else if pt.x > prev.x && pt.x > curr.x {
            val = 1 - val;
        } else {
            let d = cross(prev, curr, pt);
            if d == 0 {
                return PointInPolygonResult::IsOn;
            }
            if (d < 0) == is_above {
                val = 1 - val;
            }
        }
        is_above = !is_above;
        i += 1;
    }

    if is_above != starting_above {
        let j = if i == len { 0 } else { i };
        let d = if j == 0 {
            cross(polygon[len - 1], polygon[0], pt)
        } else {
            cross(polygon[j - 1], polygon[j], pt)
        };
        if d == 0 {
            return PointInPolygonResult::IsOn;
        }
        if (d < 0) == is_above {
            val = 1 - val;
        }
    }

    if val == 0 {
        PointInPolygonResult::IsOutside
    } else {
        PointInPolygonResult::IsInside
    }
}

/// Signed shoelace area. With y-down coordinates, positive area corresponds
/// to the orientation the engine emits for outer rings.
pub fn area(path: &[Point64]) -> f64 {
    if path.len() < 3 {
        return 0.0;
    }
    let mut a = 0.0;
    let mut prev = path[path.len() - 1];
    for &pt in path {
        a += (prev.y as f64 + pt.y as f64) * (prev.x as f64 - pt.x as f64);
        prev = pt;
    }
    a * 0.5
}

/// Twice the signed triangle area; only ever compared, never halved.
pub fn area_triangle(p1: Point64, p2: Point64, p3: Point64) -> f64 {
    (p3.y as f64 + p1.y as f64) * (p3.x as f64 - p1.x as f64)
        + (p1.y as f64 + p2.y as f64) * (p1.x as f64 - p2.x as f64)
        + (p2.y as f64 + p3.y as f64) * (p2.x as f64 - p3.x as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use malachite::num::arithmetic::traits::Abs;
    use malachite::Rational;
    use proptest::prelude::*;

    fn p(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    #[test]
    fn cross_orientation() {
        // y-down: this is a clockwise turn on screen
        assert!(cross(p(0, 0), p(10, 0), p(10, 10)) > 0);
        assert!(cross(p(0, 0), p(10, 0), p(10, -10)) < 0);
        assert_eq!(cross(p(0, 0), p(5, 5), p(10, 10)), 0);
    }

    #[test]
    fn cross_does_not_overflow() {
        let big = MAX_COORD - 1;
        let d = cross(p(-big, -big), p(big, -big), p(big, big));
        assert!(d > 0);
    }

    #[test]
    fn intersect_basic() {
        let ip = segment_intersect_pt(p(0, 0), p(10, 10), p(0, 10), p(10, 0)).unwrap();
        assert_eq!(ip, p(5, 5));
        assert!(segment_intersect_pt(p(0, 0), p(10, 0), p(0, 5), p(10, 5)).is_none());
    }

    #[test]
    fn intersect_clamps_to_first_segment() {
        // lines meet well beyond b; the result clamps to b
        let ip = segment_intersect_pt(p(0, 0), p(2, 2), p(100, 0), p(100, 50)).unwrap();
        assert_eq!(ip, p(2, 2));
    }

    #[test]
    fn closest_point() {
        assert_eq!(closest_pt_on_segment(p(5, 5), p(0, 0), p(10, 0)), p(5, 0));
        assert_eq!(closest_pt_on_segment(p(-3, 7), p(0, 0), p(10, 0)), p(0, 0));
    }

    #[test]
    fn point_in_polygon_square() {
        let sq = vec![p(0, 0), p(10, 0), p(10, 10), p(0, 10)];
        assert_eq!(point_in_polygon(p(5, 5), &sq), PointInPolygonResult::IsInside);
        assert_eq!(point_in_polygon(p(15, 5), &sq), PointInPolygonResult::IsOutside);
        assert_eq!(point_in_polygon(p(10, 5), &sq), PointInPolygonResult::IsOn);
        assert_eq!(point_in_polygon(p(5, 0), &sq), PointInPolygonResult::IsOn);
        assert_eq!(point_in_polygon(p(-1, 0), &sq), PointInPolygonResult::IsOutside);
    }

    #[test]
    fn point_in_polygon_concave() {
        // a "U" shape
        let u = vec![
            p(0, 0),
            p(30, 0),
            p(30, 30),
            p(20, 30),
            p(20, 10),
            p(10, 10),
            p(10, 30),
            p(0, 30),
        ];
        assert_eq!(point_in_polygon(p(5, 20), &u), PointInPolygonResult::IsInside);
        assert_eq!(point_in_polygon(p(15, 20), &u), PointInPolygonResult::IsOutside);
        assert_eq!(point_in_polygon(p(25, 20), &u), PointInPolygonResult::IsInside);
    }

    #[test]
    fn area_signs() {
        let sq = vec![p(0, 0), p(10, 0), p(10, 10), p(0, 10)];
        assert_eq!(area(&sq), 100.0);
        let rev: Vec<_> = sq.iter().rev().copied().collect();
        assert_eq!(area(&rev), -100.0);
    }

    #[test]
    fn invalid_coord_roundtrip() {
        assert_eq!(round_coord(f64::INFINITY), INVALID_COORD);
        assert_eq!(round_coord(1e30), INVALID_COORD);
        assert!(!is_valid_coord(INVALID_COORD));
        assert!(is_valid_coord(round_coord(12.4)));
    }

    // Exact rational solve of the same line-line intersection, for checking
    // the f64 version.
    fn exact_intersection(
        a: Point64,
        b: Point64,
        c: Point64,
        d: Point64,
    ) -> Option<(Rational, Rational)> {
        let dy1 = Rational::from(b.y - a.y);
        let dx1 = Rational::from(b.x - a.x);
        let dy2 = Rational::from(d.y - c.y);
        let dx2 = Rational::from(d.x - c.x);
        let det = &dy1 * &dx2 - &dy2 * &dx1;
        if det == 0 {
            return None;
        }
        let t = (Rational::from(a.x - c.x) * &dy2 - Rational::from(a.y - c.y) * &dx2) / det;
        let t = t.clamp(Rational::from(0), Rational::from(1));
        Some((
            Rational::from(a.x) + &t * dx1,
            Rational::from(a.y) + t * dy1,
        ))
    }

    proptest! {
        #[test]
        fn intersect_matches_exact(
            ax in -1000i64..1000, ay in -1000i64..1000,
            bx in -1000i64..1000, by in -1000i64..1000,
            cx in -1000i64..1000, cy in -1000i64..1000,
            dx in -1000i64..1000, dy in -1000i64..1000,
        ) {
            let (a, b, c, d) = (p(ax, ay), p(bx, by), p(cx, cy), p(dx, dy));
            match (segment_intersect_pt(a, b, c, d), exact_intersection(a, b, c, d)) {
                (Some(ip), Some((ex, ey))) => {
                    // within one unit of the exact clamped solution
                    let rx = Rational::from(ip.x);
                    let ry = Rational::from(ip.y);
                    prop_assert!((rx - ex).abs() <= 1u32);
                    prop_assert!((ry - ey).abs() <= 1u32);
                }
                (None, None) => {}
                (got, want) => prop_assert!(false, "disagree: {got:?} vs {want:?}"),
            }
        }
    }
}
