//! Polygon boolean operations (intersection, union, difference, xor) on
//! closed polygons and open polylines, using a scanbeam sweep over
//! fixed-point `i64` coordinates.
//!
//! The sweep processes edges from the visually lowest points upward
//! (largest `y` first, with `y` growing downward as in screen coordinates),
//! maintaining winding counts on an active edge list so that any of the four
//! fill rules can decide which regions contribute. Results come back either
//! as flat path sets or as a [`PolyTree`] describing which rings are holes
//! of which.
//!
//! ```
//! use polyclip::{intersect, FillRule, Point64};
//!
//! let subj = vec![vec![
//!     Point64::new(0, 0), Point64::new(10, 0),
//!     Point64::new(10, 10), Point64::new(0, 10),
//! ]];
//! let clip = vec![vec![
//!     Point64::new(5, 5), Point64::new(15, 5),
//!     Point64::new(15, 15), Point64::new(5, 15),
//! ]];
//! let sol = intersect(&subj, &clip, FillRule::NonZero).unwrap();
//! assert_eq!(sol.len(), 1);
//! ```
//!
//! Floating-point paths go through [`ClipperD`], which scales them onto the
//! integer grid at a configurable decimal precision and scales the result
//! back.

mod clipper;
mod engine;
mod geom;
mod output;
mod polytree;
mod scanline;
mod vertex;

pub use clipper::{difference, intersect, union, xor, ClipError, ClipperD, SolutionD};
pub use engine::{ClipType, Clipper64, FillRule, Solution64};
pub use geom::{
    area, bounds, point_in_polygon, Path64, PathD, Paths64, PathsD, Point64, PointD,
    PointInPolygonResult, Rect64, MAX_COORD,
};
pub use polytree::{PolyNodeId, PolyTree, PolyTree64, PolyTreeD};
pub use vertex::PathType;
