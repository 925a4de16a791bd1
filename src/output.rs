//! Turning closed output rings into final paths and trees.
//!
//! The sweep leaves behind rings that may contain collinear runs, 180-degree
//! spikes and the occasional self-intersection (an artifact of snapping
//! intersection points to the integer grid). Everything here runs after the
//! sweep: rings are repaired, flattened into paths, and (for tree output)
//! their provisional owner links are re-checked against actual geometry.

use crate::engine::{Clipper64, OutPtId, OutRecId};
use crate::geom::{
    area_triangle, bounds, cross, dot, point_in_polygon, segment_intersect_pt,
    segments_intersect, Path64, Paths64, Point64, PointInPolygonResult,
};
use crate::polytree::PolyTree64;

fn pts_really_close(a: Point64, b: Point64) -> bool {
    (a.x - b.x).abs() < 2 && (a.y - b.y).abs() < 2
}

impl Clipper64 {
    pub(crate) fn get_real_outrec(&self, outrec: Option<OutRecId>) -> Option<OutRecId> {
        let mut or = outrec;
        while let Some(id) = or {
            if self.outrecs[id.0].pts.is_some() {
                return Some(id);
            }
            or = self.outrecs[id.0].owner;
        }
        None
    }

    fn is_valid_owner(&self, outrec: OutRecId, test_owner: OutRecId) -> bool {
        // an owner chain may never loop back through outrec
        let mut t = Some(test_owner);
        while let Some(x) = t {
            if x == outrec {
                return false;
            }
            t = self.outrecs[x.0].owner;
        }
        true
    }

    fn is_very_small_triangle(&self, op: OutPtId) -> bool {
        let next = self.outpts[op.0].next;
        let prev = self.outpts[op.0].prev;
        let (a, b, c) = (
            self.outpts[prev.0].pt,
            self.outpts[op.0].pt,
            self.outpts[next.0].pt,
        );
        self.outpts[next.0].next == prev
            && (pts_really_close(a, c) || pts_really_close(b, c) || pts_really_close(b, a))
    }

    fn is_valid_closed_path(&self, op: Option<OutPtId>) -> bool {
        let Some(op) = op else { return false };
        let next = self.outpts[op.0].next;
        let prev = self.outpts[op.0].prev;
        if next == op || next == prev {
            return false;
        }
        // a 3-point ring survives unless it has degenerated to near-nothing
        !(self.outpts[next.0].next == prev && self.is_very_small_triangle(op))
    }

    fn dispose_out_pt(&mut self, op: OutPtId) -> Option<OutPtId> {
        let next = self.outpts[op.0].next;
        let prev = self.outpts[op.0].prev;
        let result = if next == op { None } else { Some(next) };
        self.outpts[prev.0].next = next;
        self.outpts[next.0].prev = prev;
        result
    }

    fn ring_area(&self, op: OutPtId) -> f64 {
        let mut area = 0.0;
        let mut op2 = op;
        loop {
            let prev = self.outpts[op2.0].prev;
            let (p, c) = (self.outpts[prev.0].pt, self.outpts[op2.0].pt);
            area += (p.y + c.y) as f64 * (p.x - c.x) as f64;
            op2 = self.outpts[op2.0].next;
            if op2 == op {
                break;
            }
        }
        area * 0.5
    }

    /// Removes collinear vertices (always removing 180-degree spikes, other
    /// collinear points only when `preserve_collinear` is off), then clears
    /// any self-intersections the grid snapping introduced.
    pub(crate) fn clean_collinear(&mut self, outrec: OutRecId) {
        let Some(outrec) = self.get_real_outrec(Some(outrec)) else {
            return;
        };
        if self.outrecs[outrec.0].is_open {
            return;
        }
        if !self.is_valid_closed_path(self.outrecs[outrec.0].pts) {
            self.outrecs[outrec.0].pts = None;
            return;
        }

        let mut start_op = self.outrecs[outrec.0].pts.expect("checked above");
        let mut op2 = start_op;
        loop {
            let prev = self.outpts[op2.0].prev;
            let next = self.outpts[op2.0].next;
            let (pp, pc, pn) = (
                self.outpts[prev.0].pt,
                self.outpts[op2.0].pt,
                self.outpts[next.0].pt,
            );
            if cross(pp, pc, pn) == 0
                && (pc == pp || pc == pn || !self.preserve_collinear || dot(pp, pc, pn) < 0)
            {
                if Some(op2) == self.outrecs[outrec.0].pts {
                    self.outrecs[outrec.0].pts = Some(prev);
                }
                let disposed = self.dispose_out_pt(op2);
                if !self.is_valid_closed_path(disposed) {
                    self.outrecs[outrec.0].pts = None;
                    return;
                }
                op2 = disposed.expect("valid path is non-empty");
                start_op = op2;
                continue;
            }
            op2 = next;
            if op2 == start_op {
                break;
            }
        }
        self.fix_self_intersects(outrec);
    }

    fn fix_self_intersects(&mut self, outrec: OutRecId) {
        let mut op2 = self.outrecs[outrec.0].pts.expect("live ring");
        loop {
            let next = self.outpts[op2.0].next;
            // triangles can't self-intersect
            if self.outpts[op2.0].prev == self.outpts[next.0].next {
                break;
            }
            let a = self.outpts[self.outpts[op2.0].prev.0].pt;
            let b = self.outpts[op2.0].pt;
            let c = self.outpts[next.0].pt;
            let d = self.outpts[self.outpts[next.0].next.0].pt;
            if segments_intersect(a, b, c, d) {
                self.do_split_op(outrec, op2);
                let Some(pts) = self.outrecs[outrec.0].pts else {
                    return;
                };
                op2 = pts;
                continue;
            }
            op2 = next;
            if Some(op2) == self.outrecs[outrec.0].pts {
                break;
            }
        }
    }

    /// Unknots one self-intersection at `split_op`: the crossing segments
    /// are replaced by the intersection point, and the loop that was cut off
    /// becomes a new ring when it's big enough to matter.
    fn do_split_op(&mut self, outrec: OutRecId, split_op: OutPtId) {
        let prev_op = self.outpts[split_op.0].prev;
        let split_next = self.outpts[split_op.0].next;
        let next_next = self.outpts[split_next.0].next;
        self.outrecs[outrec.0].pts = Some(prev_op);

        let (a, b, c, d) = (
            self.outpts[prev_op.0].pt,
            self.outpts[split_op.0].pt,
            self.outpts[split_next.0].pt,
            self.outpts[next_next.0].pt,
        );
        let ip = segment_intersect_pt(a, b, c, d).unwrap_or(b);

        let area1 = self.ring_area(prev_op);
        let abs_area1 = area1.abs();
        if abs_area1 < 2.0 {
            self.outrecs[outrec.0].pts = None;
            return;
        }

        let area2 = area_triangle(ip, b, c);
        let abs_area2 = area2.abs();

        // unlink the crossing pair, inserting the intersection point
        if ip == a || ip == d {
            self.outpts[next_next.0].prev = prev_op;
            self.outpts[prev_op.0].next = next_next;
        } else {
            let new_op = self.insert_between(ip, outrec, prev_op, next_next);
            self.outpts[next_next.0].prev = new_op;
            self.outpts[prev_op.0].next = new_op;
        }

        // if area2 is significant and either exceeds area1 or matches its
        // sign, the cut-off loop is genuine output rather than noise
        if abs_area2 >= 1.0 && (abs_area2 > abs_area1 || (area2 > 0.0) == (area1 > 0.0)) {
            let new_or = self.new_outrec();
            let owner = self.outrecs[outrec.0].owner;
            self.outrecs[new_or.0].owner = owner;
            self.outpts[split_op.0].outrec = new_or;
            self.outpts[split_next.0].outrec = new_or;
            if self.using_polytree {
                self.outrecs[outrec.0].splits.push(new_or);
            }
            let new_op = self.insert_between(ip, new_or, split_next, split_op);
            self.outrecs[new_or.0].pts = Some(new_op);
            self.outpts[split_op.0].prev = new_op;
            self.outpts[split_next.0].next = new_op;
        }
    }

    fn insert_between(
        &mut self,
        pt: Point64,
        outrec: OutRecId,
        prev: OutPtId,
        next: OutPtId,
    ) -> OutPtId {
        let id = OutPtId(self.outpts.len());
        self.outpts.push(crate::engine::OutPt {
            pt,
            next,
            prev,
            outrec,
            horz_marked: false,
        });
        id
    }

    // ------------------------------------------------------------------
    // path extraction

    fn build_path(&self, op: OutPtId, reverse: bool, is_open: bool) -> Option<Path64> {
        let next0 = self.outpts[op.0].next;
        let prev0 = self.outpts[op.0].prev;
        if next0 == op || (!is_open && next0 == prev0) {
            return None;
        }

        let (start, mut last_pt, mut op2) = if reverse {
            (op, self.outpts[op.0].pt, prev0)
        } else {
            (next0, self.outpts[next0.0].pt, self.outpts[next0.0].next)
        };
        let mut path = vec![last_pt];

        while op2 != start {
            let pt = self.outpts[op2.0].pt;
            if pt != last_pt {
                last_pt = pt;
                path.push(pt);
            }
            op2 = if reverse {
                self.outpts[op2.0].prev
            } else {
                self.outpts[op2.0].next
            };
        }

        if path.len() == 3 && self.is_very_small_triangle(op2) {
            return None;
        }
        Some(path)
    }

    pub(crate) fn build_paths(&mut self, closed: &mut Paths64, open: &mut Paths64) {
        // index-based: ring repair can append new records as it splits rings
        let mut i = 0;
        while i < self.outrecs.len() {
            let outrec = OutRecId(i);
            i += 1;
            let Some(pts) = self.outrecs[outrec.0].pts else {
                continue;
            };
            if self.outrecs[outrec.0].is_open {
                if let Some(p) = self.build_path(pts, self.reverse_solution, true) {
                    open.push(p);
                }
                continue;
            }
            self.clean_collinear(outrec);
            if let Some(pts) = self.outrecs[outrec.0].pts {
                if let Some(p) = self.build_path(pts, self.reverse_solution, false) {
                    closed.push(p);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // tree extraction

    /// A path stripped of the axis-collinear runs that make midpoint
    /// containment tests unreliable.
    fn get_clean_path(&self, op: OutPtId) -> Path64 {
        let mut result = Path64::new();
        let mut op2 = op;
        loop {
            let next = self.outpts[op2.0].next;
            let prev = self.outpts[op2.0].prev;
            if next == op {
                break;
            }
            let (c, n, p) = (
                self.outpts[op2.0].pt,
                self.outpts[next.0].pt,
                self.outpts[prev.0].pt,
            );
            if !((c.x == n.x && c.x == p.x) || (c.y == n.y && c.y == p.y)) {
                break;
            }
            op2 = next;
        }
        result.push(self.outpts[op2.0].pt);
        let mut prev_op = op2;
        op2 = self.outpts[op2.0].next;
        while op2 != op {
            let next = self.outpts[op2.0].next;
            let (c, n, p) = (
                self.outpts[op2.0].pt,
                self.outpts[next.0].pt,
                self.outpts[prev_op.0].pt,
            );
            if (c.x != n.x || c.x != p.x) && (c.y != n.y || c.y != p.y) {
                result.push(c);
                prev_op = op2;
            }
            op2 = next;
        }
        result
    }

    /// Point-sampling containment with a midpoint tiebreak, tolerant of
    /// vertices that sit exactly on the other ring.
    pub(crate) fn path1_inside_path2(&self, op1: OutPtId, op2: OutPtId) -> bool {
        let mut path2 = Path64::new();
        let mut op = op2;
        loop {
            path2.push(self.outpts[op.0].pt);
            op = self.outpts[op.0].next;
            if op == op2 {
                break;
            }
        }

        let mut outside_cnt = 0i32;
        let mut op = op1;
        loop {
            match point_in_polygon(self.outpts[op.0].pt, &path2) {
                PointInPolygonResult::IsOutside => outside_cnt += 1,
                PointInPolygonResult::IsInside => outside_cnt -= 1,
                PointInPolygonResult::IsOn => {}
            }
            op = self.outpts[op.0].next;
            if op == op1 || outside_cnt.abs() == 2 {
                break;
            }
        }
        if outside_cnt.abs() > 1 {
            return outside_cnt < 0;
        }
        // still equivocal: fall back to the midpoint of path1's bounds
        let mp = bounds(&self.get_clean_path(op1)).mid_point();
        point_in_polygon(mp, &self.get_clean_path(op2)) != PointInPolygonResult::IsOutside
    }

    /// Repairs the ring if needed and caches its path and bounds. Returns
    /// false when nothing displayable remains.
    fn check_bounds(&mut self, outrec: OutRecId) -> bool {
        if self.outrecs[outrec.0].pts.is_none() {
            return false;
        }
        if !self.outrecs[outrec.0].bounds.is_empty() {
            return true;
        }
        self.clean_collinear(outrec);
        let Some(pts) = self.outrecs[outrec.0].pts else {
            return false;
        };
        let Some(path) = self.build_path(pts, self.reverse_solution, false) else {
            return false;
        };
        self.outrecs[outrec.0].bounds = bounds(&path);
        self.outrecs[outrec.0].path = path;
        true
    }

    /// When a ring was split during the sweep, one of the splits may be the
    /// geometric owner rather than the recorded one. Recurses through nested
    /// splits, guarding against revisiting a split already being checked for
    /// this same outrec.
    fn check_split_owner(&mut self, outrec: OutRecId, splits: &[OutRecId]) -> bool {
        for &s in splits {
            let Some(split) = self.get_real_outrec(Some(s)) else {
                continue;
            };
            if split == outrec || self.outrecs[split.0].recursive_split == Some(outrec) {
                continue;
            }
            self.outrecs[split.0].recursive_split = Some(outrec);
            let inner = self.outrecs[split.0].splits.clone();
            if !inner.is_empty() && self.check_split_owner(outrec, &inner) {
                return true;
            }
            if self.check_bounds(split)
                && self.is_valid_owner(outrec, split)
                && self.outrecs[split.0]
                    .bounds
                    .contains_rect(&self.outrecs[outrec.0].bounds)
                && self.path1_inside_path2(
                    self.outrecs[outrec.0].pts.expect("bounded ring"),
                    self.outrecs[split.0].pts.expect("bounded ring"),
                )
            {
                self.outrecs[outrec.0].owner = Some(split);
                return true;
            }
        }
        false
    }

    /// Walks the provisional owner chain until an owner actually contains
    /// this ring (consulting splits first), then attaches the ring under the
    /// owner's tree node, recursing so owners are attached before children.
    fn recursive_check_owners(&mut self, outrec: OutRecId, tree: &mut PolyTree64) {
        if self.outrecs[outrec.0].polynode.is_some() || self.outrecs[outrec.0].bounds.is_empty() {
            return;
        }

        while let Some(owner) = self.outrecs[outrec.0].owner {
            let splits = self.outrecs[owner.0].splits.clone();
            if !splits.is_empty() && self.check_split_owner(outrec, &splits) {
                break;
            }
            if self.outrecs[owner.0].pts.is_some()
                && self.check_bounds(owner)
                && self.outrecs[owner.0]
                    .bounds
                    .contains_rect(&self.outrecs[outrec.0].bounds)
                && self.path1_inside_path2(
                    self.outrecs[outrec.0].pts.expect("bounded ring"),
                    self.outrecs[owner.0].pts.expect("bounded ring"),
                )
            {
                break;
            }
            let next = self.outrecs[owner.0].owner;
            self.outrecs[outrec.0].owner = next;
        }

        let path = std::mem::take(&mut self.outrecs[outrec.0].path);
        let node = match self.outrecs[outrec.0].owner {
            Some(owner) => {
                if self.outrecs[owner.0].polynode.is_none() {
                    self.recursive_check_owners(owner, tree);
                }
                let parent = self.outrecs[owner.0]
                    .polynode
                    .expect("owner attached above");
                tree.add_child(parent, path)
            }
            None => tree.add_child(tree.root(), path),
        };
        self.outrecs[outrec.0].polynode = Some(node);
    }

    pub(crate) fn build_tree(&mut self, tree: &mut PolyTree64, open: &mut Paths64) {
        let mut i = 0;
        while i < self.outrecs.len() {
            let outrec = OutRecId(i);
            i += 1;
            let Some(pts) = self.outrecs[outrec.0].pts else {
                continue;
            };
            if self.outrecs[outrec.0].is_open {
                if let Some(p) = self.build_path(pts, self.reverse_solution, true) {
                    open.push(p);
                }
                continue;
            }
            if self.check_bounds(outrec) {
                self.recursive_check_owners(outrec, tree);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ClipType, Clipper64, FillRule};
    use crate::geom::area;
    use crate::vertex::PathType;

    fn p(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    fn square(x: i64, y: i64, size: i64) -> Path64 {
        vec![p(x, y), p(x + size, y), p(x + size, y + size), p(x, y + size)]
    }

    #[test]
    fn collinear_points_trimmed_by_default() {
        let mut c = Clipper64::new();
        c.preserve_collinear = false;
        // redundant midpoints along each side
        c.add_path(
            &[
                p(0, 0),
                p(5, 0),
                p(10, 0),
                p(10, 5),
                p(10, 10),
                p(0, 10),
            ],
            PathType::Subject,
            false,
        );
        let sol = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(sol.closed.len(), 1);
        assert_eq!(sol.closed[0].len(), 4);
    }

    #[test]
    fn collinear_points_kept_when_preserved() {
        let mut c = Clipper64::new();
        assert!(c.preserve_collinear);
        c.add_path(
            &[p(0, 0), p(5, 0), p(10, 0), p(10, 10), p(0, 10)],
            PathType::Subject,
            false,
        );
        let sol = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(sol.closed.len(), 1);
        assert_eq!(sol.closed[0].len(), 5);
    }

    #[test]
    fn spike_removed_even_when_preserving_collinear() {
        let mut c = Clipper64::new();
        // (10,0) -> (15,0) -> (10,0) doubles back on itself
        c.add_path(
            &[p(0, 0), p(10, 0), p(15, 0), p(10, 0), p(10, 10), p(0, 10)],
            PathType::Subject,
            false,
        );
        let sol = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(sol.closed.len(), 1);
        assert!(!sol.closed[0].contains(&p(15, 0)));
    }

    #[test]
    fn split_loop_kept_at_the_minimum_area() {
        use crate::engine::OutPt;

        // ring where the segments (0,0)->(4,2) and (5,3)->(0,-1) cross at
        // (10/3, 5/3), snapping to (3,2); the cut-off loop (3,2)-(4,2)-(5,3)
        // has a doubled area of exactly one and winds like the outer ring
        let mut c = Clipper64::new();
        let or = c.new_outrec();
        let ring = [p(0, 0), p(4, 2), p(5, 3), p(0, -1), p(10, -1)];
        let n = ring.len();
        for (i, &pt) in ring.iter().enumerate() {
            c.outpts.push(OutPt {
                pt,
                next: OutPtId((i + 1) % n),
                prev: OutPtId((i + n - 1) % n),
                outrec: or,
                horz_marked: false,
            });
        }
        c.outrecs[or.0].pts = Some(OutPtId(0));

        let before = c.outrecs.len();
        c.do_split_op(or, OutPtId(1));
        assert_eq!(c.outrecs.len(), before + 1);
        let start = c.outrecs[before].pts.expect("loop ring survives the split");
        let mut loop_pts = Vec::new();
        let mut op = start;
        loop {
            loop_pts.push(c.outpts[op.0].pt);
            op = c.outpts[op.0].next;
            if op == start {
                break;
            }
        }
        loop_pts.sort();
        assert_eq!(loop_pts, vec![p(3, 2), p(4, 2), p(5, 3)]);
    }

    #[test]
    fn reverse_solution_flips_orientation() {
        let subj = vec![square(0, 0, 10)];
        let mut c = Clipper64::new();
        c.add_subject(&subj);
        let fwd = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        let mut c = Clipper64::new();
        c.reverse_solution = true;
        c.add_subject(&subj);
        let rev = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(area(&fwd.closed[0]), -area(&rev.closed[0]));
    }

    #[test]
    fn tree_nests_hole_inside_outer() {
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 20), square(5, 5, 10)]);
        let (tree, open) = c.execute_tree(ClipType::Union, FillRule::EvenOdd).unwrap();
        assert!(open.is_empty());
        let outers = tree.children(tree.root());
        assert_eq!(outers.len(), 1);
        let outer = outers[0];
        assert!(!tree.is_hole(outer));
        let holes = tree.children(outer);
        assert_eq!(holes.len(), 1);
        assert!(tree.is_hole(holes[0]));
        assert_eq!(
            area(tree.polygon(holes[0]).expect("hole has a polygon")).abs(),
            100.0
        );
    }

    #[test]
    fn tree_separates_islands_from_holes() {
        // outer ring, hole, island inside the hole
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 30), square(5, 5, 20), square(10, 10, 10)]);
        let (tree, _) = c.execute_tree(ClipType::Union, FillRule::EvenOdd).unwrap();
        let outer = tree.children(tree.root())[0];
        let hole = tree.children(outer)[0];
        let island = tree.children(hole)[0];
        assert!(!tree.is_hole(outer));
        assert!(tree.is_hole(hole));
        assert!(!tree.is_hole(island));
        assert!(tree.children(island).is_empty());
    }
}
