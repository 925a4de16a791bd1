//! The user-facing layer: error type, floating-point wrapper, and one-shot
//! convenience functions for the common clip operations.

use crate::engine::{ClipType, Clipper64, FillRule, Solution64};
use crate::geom::{round_coord, Path64, PathD, Paths64, PathsD, Point64, PointD};
use crate::polytree::PolyTreeD;
use crate::vertex::PathType;

/// Why a clip could not produce a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipError {
    /// The requested decimal precision is outside the supported range of
    /// -8..=8.
    Precision,
    /// The sweep hit an unresolvable topology (almost always caused by
    /// coordinates near the valid range limit).
    Topology,
}

impl std::fmt::Display for ClipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipError::Precision => write!(f, "precision out of range (-8..=8)"),
            ClipError::Topology => write!(f, "clipping failed: unresolvable path topology"),
        }
    }
}

impl std::error::Error for ClipError {}

/// Result of a clip over `f64` paths.
#[derive(Clone, Debug, Default)]
pub struct SolutionD {
    pub closed: PathsD,
    pub open: PathsD,
}

/// Clips floating-point paths by scaling them onto the integer grid,
/// running [`Clipper64`], and scaling the result back.
///
/// `precision` is the number of decimal digits preserved: inputs are scaled
/// by `10^precision`, so with the default of 2, coordinates are exact to a
/// hundredth of a unit.
#[derive(Clone, Debug)]
pub struct ClipperD {
    inner: Clipper64,
    scale: f64,
    inv_scale: f64,
}

impl ClipperD {
    pub fn new(precision: i32) -> Result<Self, ClipError> {
        if !(-8..=8).contains(&precision) {
            return Err(ClipError::Precision);
        }
        let scale = 10f64.powi(precision);
        Ok(ClipperD {
            inner: Clipper64::new(),
            scale,
            inv_scale: 1.0 / scale,
        })
    }

    pub fn preserve_collinear(&mut self, value: bool) -> &mut Self {
        self.inner.preserve_collinear = value;
        self
    }

    pub fn reverse_solution(&mut self, value: bool) -> &mut Self {
        self.inner.reverse_solution = value;
        self
    }

    pub fn add_subject(&mut self, paths: &PathsD) {
        self.add_paths(paths, PathType::Subject, false);
    }

    pub fn add_open_subject(&mut self, paths: &PathsD) {
        self.add_paths(paths, PathType::Subject, true);
    }

    pub fn add_clip(&mut self, paths: &PathsD) {
        self.add_paths(paths, PathType::Clip, false);
    }

    pub fn add_paths(&mut self, paths: &PathsD, path_type: PathType, is_open: bool) {
        for path in paths {
            let scaled = scale_path(path, self.scale);
            self.inner.add_path(&scaled, path_type, is_open);
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn execute(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<SolutionD, ClipError> {
        let sol = self.inner.execute(clip_type, fill_rule)?;
        Ok(SolutionD {
            closed: unscale_paths(&sol.closed, self.inv_scale),
            open: unscale_paths(&sol.open, self.inv_scale),
        })
    }

    pub fn execute_tree(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<(PolyTreeD, PathsD), ClipError> {
        let (tree, open) = self.inner.execute_tree(clip_type, fill_rule)?;
        let tree_d = tree.map(|path| unscale_path(path, self.inv_scale));
        Ok((tree_d, unscale_paths(&open, self.inv_scale)))
    }
}

fn scale_path(path: &PathD, scale: f64) -> Path64 {
    path.iter()
        .map(|p| Point64::new(round_coord(p.x * scale), round_coord(p.y * scale)))
        .collect()
}

fn unscale_path(path: &Path64, inv_scale: f64) -> PathD {
    path.iter()
        .map(|p| PointD::new(p.x as f64 * inv_scale, p.y as f64 * inv_scale))
        .collect()
}

fn unscale_paths(paths: &Paths64, inv_scale: f64) -> PathsD {
    paths.iter().map(|p| unscale_path(p, inv_scale)).collect()
}

fn boolean_op(
    clip_type: ClipType,
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ClipError> {
    let mut clipper = Clipper64::new();
    clipper.add_subject(subjects);
    clipper.add_clip(clips);
    clipper.execute(clip_type, fill_rule).map(|s| s.closed)
}

/// Intersection of two closed path sets.
pub fn intersect(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ClipError> {
    boolean_op(ClipType::Intersection, subjects, clips, fill_rule)
}

/// Union of two closed path sets.
pub fn union(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ClipError> {
    boolean_op(ClipType::Union, subjects, clips, fill_rule)
}

/// Subjects minus clips.
pub fn difference(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ClipError> {
    boolean_op(ClipType::Difference, subjects, clips, fill_rule)
}

/// Regions covered by exactly one of the two path sets.
pub fn xor(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ClipError> {
    boolean_op(ClipType::Xor, subjects, clips, fill_rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::area;
    use assert_matches::assert_matches;

    fn p64(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    fn square64(x: i64, y: i64, size: i64) -> Path64 {
        vec![
            p64(x, y),
            p64(x + size, y),
            p64(x + size, y + size),
            p64(x, y + size),
        ]
    }

    fn square_d(x: f64, y: f64, size: f64) -> PathD {
        vec![
            PointD::new(x, y),
            PointD::new(x + size, y),
            PointD::new(x + size, y + size),
            PointD::new(x, y + size),
        ]
    }

    #[test]
    fn precision_bounds_are_enforced() {
        assert_matches!(ClipperD::new(9), Err(ClipError::Precision));
        assert_matches!(ClipperD::new(-9), Err(ClipError::Precision));
        assert!(ClipperD::new(8).is_ok());
        assert!(ClipperD::new(-8).is_ok());
        assert!(ClipperD::new(0).is_ok());
    }

    #[test]
    fn scaled_intersection_round_trips() {
        let mut c = ClipperD::new(2).unwrap();
        c.add_subject(&vec![square_d(0.0, 0.0, 1.0)]);
        c.add_clip(&vec![square_d(0.5, 0.5, 1.0)]);
        let sol = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        assert_eq!(sol.closed.len(), 1);
        let mut pts: Vec<(i64, i64)> = sol.closed[0]
            .iter()
            .map(|p| ((p.x * 100.0).round() as i64, (p.y * 100.0).round() as i64))
            .collect();
        pts.sort();
        assert_eq!(pts, vec![(50, 50), (50, 100), (100, 50), (100, 100)]);
    }

    #[test]
    fn sub_precision_detail_is_snapped_away() {
        // at precision 0 a 0.25-unit sliver rounds onto the grid
        let mut c = ClipperD::new(0).unwrap();
        c.add_subject(&vec![square_d(0.0, 0.0, 10.0)]);
        c.add_clip(&vec![square_d(9.75, 0.0, 10.0)]);
        let sol = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        assert!(sol.closed.is_empty() || sol.closed.iter().all(|p| p.len() >= 3));
    }

    #[test]
    fn coordinates_far_beyond_the_grid_clamp_instead_of_panicking() {
        // at precision 8 these scale to ~1e20, past any representable
        // coordinate; they clamp at ingestion and the sweep still runs
        let mut c = ClipperD::new(8).unwrap();
        c.add_subject(&vec![vec![
            PointD::new(0.0, 0.0),
            PointD::new(1e12, 0.0),
            PointD::new(1e12, 1.0),
            PointD::new(0.0, 1.0),
        ]]);
        assert!(c.execute(ClipType::Union, FillRule::NonZero).is_ok());
    }

    #[test]
    fn one_shot_helpers_agree_with_engine() {
        let subj = vec![square64(0, 0, 10)];
        let clip = vec![square64(5, 5, 10)];
        let inter = intersect(&subj, &clip, FillRule::NonZero).unwrap();
        let uni = union(&subj, &clip, FillRule::NonZero).unwrap();
        let diff = difference(&subj, &clip, FillRule::NonZero).unwrap();
        let x = xor(&subj, &clip, FillRule::NonZero).unwrap();
        let sum =
            |paths: &Paths64| -> f64 { paths.iter().map(|p| area(p)).sum() };
        assert_eq!(sum(&inter), 25.0);
        assert_eq!(sum(&uni), 175.0);
        assert_eq!(sum(&diff), 75.0);
        assert_eq!(sum(&x), 150.0);
        // difference and xor partition the union with the intersection
        assert_eq!(sum(&uni), sum(&x) + sum(&inter));
    }

    #[test]
    fn clip_error_displays() {
        assert_eq!(
            ClipperD::new(12).unwrap_err().to_string(),
            "precision out of range (-8..=8)"
        );
    }
}
