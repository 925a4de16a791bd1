//! The scanbeam clipping engine.
//!
//! One `Clipper64` owns every arena for a run: input vertices, active edges,
//! output records and output points. The sweep advances a horizontal line
//! from the largest distinct `y` to the smallest, pausing at each scanbeam to
//! insert the local minima starting there, drain horizontal edges, apply the
//! edge intersections needed to reach the next beam, and retire maxima.
//! Output topology is built incrementally while edges are "hot" and is only
//! flattened into paths or a tree after the sweep completes.
//!
//! Everything is index-addressed: an edge that leaves the active list is
//! merely unlinked, its arena slot stays valid for the rest of the run.

use serde::{Deserialize, Serialize};

use crate::clipper::ClipError;
use crate::geom::{
    closest_pt_on_segment, cross, is_valid_coord, perpendic_dist_from_line_sqrd,
    segment_intersect_pt, Path64, Paths64, Point64, Rect64,
};
use crate::polytree::{PolyNodeId, PolyTree64};
use crate::scanline::ScanlineQueue;
use crate::vertex::{LocalMinima, PathType, VertexFlags, VertexId, VertexStore};

/// The boolean operation to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipType {
    Intersection,
    Union,
    Difference,
    Xor,
}

/// How winding counts decide interior-ness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillRule {
    EvenOdd,
    NonZero,
    Positive,
    Negative,
}

/// Index into the active-edge arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ActiveId(pub usize);

impl std::fmt::Debug for ActiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a_{}", self.0)
    }
}

/// Index into the output-record arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OutRecId(pub usize);

impl std::fmt::Debug for OutRecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "or_{}", self.0)
    }
}

/// Index into the output-point arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OutPtId(pub usize);

impl std::fmt::Debug for OutPtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op_{}", self.0)
    }
}

/// Marks an edge whose output is provisionally merged with an AEL neighbour.
/// The actual topology work already happened; the mark tells later operations
/// to re-open a region (`split`) if the pair diverges again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JoinWith {
    Nothing,
    Left,
    Right,
}

/// An edge currently crossed by the sweep line.
#[derive(Clone, Debug)]
pub(crate) struct Active {
    pub bot: Point64,
    pub top: Point64,
    /// X at the current scanbeam; recomputed every beam.
    pub cur_x: i64,
    /// Inverse slope (dx per unit y); +/- infinity for horizontals.
    pub dx: f64,
    /// +1 when this bound walks the vertex ring forward, -1 backward.
    pub wind_dx: i32,
    pub wind_count: i32,
    /// Winding of the *other* path type.
    pub wind_count2: i32,
    pub outrec: Option<OutRecId>,
    pub prev_in_ael: Option<ActiveId>,
    pub next_in_ael: Option<ActiveId>,
    pub prev_in_sel: Option<ActiveId>,
    pub next_in_sel: Option<ActiveId>,
    /// Merge-sort skip link; only meaningful during intersection detection.
    pub jump: Option<ActiveId>,
    pub vertex_top: VertexId,
    pub local_min: LocalMinima,
    pub is_left_bound: bool,
    pub join_with: JoinWith,
}

/// One result polygon under construction (or already closed).
#[derive(Clone, Debug)]
pub(crate) struct OutRec {
    pub owner: Option<OutRecId>,
    pub front_edge: Option<ActiveId>,
    pub back_edge: Option<ActiveId>,
    pub pts: Option<OutPtId>,
    pub polynode: Option<PolyNodeId>,
    /// Alternate candidate owners created when self-intersections fork this
    /// polygon; consulted before plain containment during tree building.
    pub splits: Vec<OutRecId>,
    pub recursive_split: Option<OutRecId>,
    pub bounds: Rect64,
    pub path: Path64,
    pub is_open: bool,
}

/// A vertex of the result, in a circular doubly linked ring per OutRec.
#[derive(Clone, Debug)]
pub(crate) struct OutPt {
    pub pt: Point64,
    pub next: OutPtId,
    pub prev: OutPtId,
    pub outrec: OutRecId,
    /// Set once this point anchors a horizontal segment, so a second segment
    /// at the same y can't claim it.
    pub horz_marked: bool,
}

/// A maximal horizontal run of output points at one y.
#[derive(Clone, Copy, Debug)]
struct HorzSegment {
    left_op: OutPtId,
    right_op: Option<OutPtId>,
    left_to_right: bool,
}

/// Two horizontal runs that overlap in x and must be stitched after all
/// horizontals at their y have been processed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HorzJoin {
    pub op1: OutPtId,
    pub op2: OutPtId,
}

#[derive(Clone, Copy, Debug)]
struct IntersectNode {
    pt: Point64,
    edge1: ActiveId,
    edge2: ActiveId,
}

/// Result of a clip over `i64` paths.
#[derive(Clone, Debug, Default)]
pub struct Solution64 {
    pub closed: Paths64,
    pub open: Paths64,
}

/// The clipping engine over fixed-point `i64` coordinates.
///
/// Add subject and clip paths, then call [`execute`](Self::execute) (flat
/// paths) or [`execute_tree`](Self::execute_tree) (ownership tree). Inputs
/// are kept across executions; [`clear`](Self::clear) discards them.
#[derive(Clone, Debug, Default)]
pub struct Clipper64 {
    pub(crate) store: VertexStore,
    pub(crate) actives: Vec<Active>,
    pub(crate) outrecs: Vec<OutRec>,
    pub(crate) outpts: Vec<OutPt>,
    scanlines: ScanlineQueue,
    ael_first: Option<ActiveId>,
    sel_first: Option<ActiveId>,
    intersections: Vec<IntersectNode>,
    horz_segs: Vec<HorzSegment>,
    horz_joins: Vec<HorzJoin>,
    current_loc_min: usize,
    current_bot_y: i64,
    clip_type: Option<ClipType>,
    fill_rule: Option<FillRule>,
    pub(crate) using_polytree: bool,
    pub(crate) succeeded: bool,
    /// Keep exactly-collinear output vertices instead of trimming them.
    pub preserve_collinear: bool,
    /// Emit result rings with reversed winding.
    pub reverse_solution: bool,
}

impl Clipper64 {
    pub fn new() -> Self {
        Clipper64 {
            preserve_collinear: true,
            succeeded: true,
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // ingestion

    pub fn add_subject(&mut self, paths: &Paths64) {
        self.add_paths(paths, PathType::Subject, false);
    }

    pub fn add_open_subject(&mut self, paths: &Paths64) {
        self.add_paths(paths, PathType::Subject, true);
    }

    pub fn add_clip(&mut self, paths: &Paths64) {
        self.add_paths(paths, PathType::Clip, false);
    }

    pub fn add_path(&mut self, path: &[Point64], path_type: PathType, is_open: bool) {
        self.store.add_path(path, path_type, is_open);
    }

    pub fn add_paths(&mut self, paths: &Paths64, path_type: PathType, is_open: bool) {
        for path in paths {
            self.store.add_path(path, path_type, is_open);
        }
    }

    /// Flat-buffer ingestion: `starts[i]` is the offset of sub-path `i` in
    /// `points`; each sub-path runs to the next offset (or the end).
    pub fn add_flat(
        &mut self,
        points: &[Point64],
        starts: &[usize],
        path_type: PathType,
        is_open: bool,
    ) {
        for (i, &s) in starts.iter().enumerate() {
            let s = s.min(points.len());
            let e = starts
                .get(i + 1)
                .copied()
                .unwrap_or(points.len())
                .clamp(s, points.len());
            self.store.add_path(&points[s..e], path_type, is_open);
        }
    }

    /// Discards all input paths and any leftover solution state.
    pub fn clear(&mut self) {
        self.clear_solution_only();
        self.store.clear();
        self.current_loc_min = 0;
    }

    // ------------------------------------------------------------------
    // execution

    /// Runs the sweep and returns the result as flat closed/open path sets.
    pub fn execute(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<Solution64, ClipError> {
        self.using_polytree = false;
        self.execute_internal(clip_type, fill_rule);
        let mut solution = Solution64::default();
        if self.succeeded {
            self.build_paths(&mut solution.closed, &mut solution.open);
        }
        let ok = self.succeeded;
        self.clear_solution_only();
        if ok {
            Ok(solution)
        } else {
            Err(ClipError::Topology)
        }
    }

    /// Runs the sweep and returns closed output as an ownership tree, with
    /// open paths (which cannot nest) returned flat.
    pub fn execute_tree(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<(PolyTree64, Paths64), ClipError> {
        self.using_polytree = true;
        self.execute_internal(clip_type, fill_rule);
        let mut tree = PolyTree64::new();
        let mut open = Paths64::new();
        if self.succeeded {
            self.build_tree(&mut tree, &mut open);
        }
        let ok = self.succeeded;
        self.clear_solution_only();
        if ok {
            Ok((tree, open))
        } else {
            Err(ClipError::Topology)
        }
    }

    fn execute_internal(&mut self, clip_type: ClipType, fill_rule: FillRule) {
        self.clip_type = Some(clip_type);
        self.fill_rule = Some(fill_rule);
        self.reset();
        let Some(mut y) = self.scanlines.pop() else {
            return;
        };
        while self.succeeded {
            self.insert_local_minima_into_ael(y);
            while let Some(e) = self.pop_horz() {
                self.do_horizontal(e);
            }
            if !self.horz_segs.is_empty() {
                self.convert_horz_segs_to_joins();
                self.horz_segs.clear();
            }
            self.current_bot_y = y;
            let Some(top_y) = self.scanlines.pop() else {
                break;
            };
            y = top_y;
            self.do_intersections(y);
            self.do_top_of_scanbeam(y);
            while let Some(e) = self.pop_horz() {
                self.do_horizontal(e);
            }
        }
        if self.succeeded {
            self.process_horz_joins();
        }
    }

    fn reset(&mut self) {
        self.store.sort_minima();
        self.scanlines.clear();
        for i in 0..self.store.minima.len() {
            let y = self.store.pt(self.store.minima[i].vertex).y;
            self.scanlines.insert(y);
        }
        self.current_bot_y = 0;
        self.current_loc_min = 0;
        self.ael_first = None;
        self.sel_first = None;
        self.succeeded = true;
    }

    pub(crate) fn clear_solution_only(&mut self) {
        self.actives.clear();
        self.outrecs.clear();
        self.outpts.clear();
        self.scanlines.clear();
        self.intersections.clear();
        self.horz_segs.clear();
        self.horz_joins.clear();
        self.ael_first = None;
        self.sel_first = None;
        self.succeeded = true;
    }

    // ------------------------------------------------------------------
    // small accessors

    fn ae(&self, id: ActiveId) -> &Active {
        &self.actives[id.0]
    }

    fn fill_rule(&self) -> FillRule {
        self.fill_rule.expect("fill rule set before sweep")
    }

    fn clip_type(&self) -> ClipType {
        self.clip_type.expect("clip type set before sweep")
    }

    fn is_open(&self, e: ActiveId) -> bool {
        self.ae(e).local_min.is_open
    }

    fn is_open_end_edge(&self, e: ActiveId) -> bool {
        self.is_open(e) && self.store.is_open_end(self.ae(e).vertex_top)
    }

    fn is_hot(&self, e: ActiveId) -> bool {
        self.ae(e).outrec.is_some()
    }

    fn is_joined(&self, e: ActiveId) -> bool {
        self.ae(e).join_with != JoinWith::Nothing
    }

    fn is_front(&self, e: ActiveId) -> bool {
        match self.ae(e).outrec {
            Some(or) => self.outrecs[or.0].front_edge == Some(e),
            None => false,
        }
    }

    fn is_horizontal(&self, e: ActiveId) -> bool {
        let a = self.ae(e);
        a.top.y == a.bot.y
    }

    fn is_heading_right_horz(&self, e: ActiveId) -> bool {
        self.ae(e).dx == f64::NEG_INFINITY
    }

    fn is_heading_left_horz(&self, e: ActiveId) -> bool {
        self.ae(e).dx == f64::INFINITY
    }

    fn is_maxima_edge(&self, e: ActiveId) -> bool {
        self.store.is_maxima(self.ae(e).vertex_top)
    }

    fn path_type(&self, e: ActiveId) -> PathType {
        self.ae(e).local_min.path_type
    }

    fn is_same_path_type(&self, e1: ActiveId, e2: ActiveId) -> bool {
        self.path_type(e1) == self.path_type(e2)
    }

    fn get_dx(bot: Point64, top: Point64) -> f64 {
        let dy = top.y - bot.y;
        if dy != 0 {
            (top.x - bot.x) as f64 / dy as f64
        } else if top.x > bot.x {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    }

    fn set_dx(&mut self, e: ActiveId) {
        let a = self.ae(e);
        let dx = Self::get_dx(a.bot, a.top);
        self.actives[e.0].dx = dx;
    }

    fn top_x(&self, e: ActiveId, y: i64) -> i64 {
        let a = self.ae(e);
        if y == a.top.y || a.top.x == a.bot.x {
            a.top.x
        } else if y == a.bot.y {
            a.bot.x
        } else {
            a.bot.x + (a.dx * (y - a.bot.y) as f64).round() as i64
        }
    }

    fn next_vertex(&self, e: ActiveId) -> VertexId {
        let a = self.ae(e);
        if a.wind_dx > 0 {
            self.store.next(a.vertex_top)
        } else {
            self.store.prev(a.vertex_top)
        }
    }

    fn prev_prev_vertex(&self, e: ActiveId) -> VertexId {
        let a = self.ae(e);
        if a.wind_dx > 0 {
            self.store.prev(self.store.prev(a.vertex_top))
        } else {
            self.store.next(self.store.next(a.vertex_top))
        }
    }

    fn get_maxima_pair(&self, e: ActiveId) -> Option<ActiveId> {
        let vt = self.ae(e).vertex_top;
        let mut e2 = self.ae(e).next_in_ael;
        while let Some(id) = e2 {
            if self.ae(id).vertex_top == vt {
                return Some(id);
            }
            e2 = self.ae(id).next_in_ael;
        }
        None
    }

    fn get_curr_y_maxima_vertex(&self, e: ActiveId) -> Option<VertexId> {
        let mut v = self.ae(e).vertex_top;
        if self.ae(e).wind_dx > 0 {
            while self.store.pt(self.store.next(v)).y == self.store.pt(v).y {
                v = self.store.next(v);
            }
        } else {
            while self.store.pt(self.store.prev(v)).y == self.store.pt(v).y {
                v = self.store.prev(v);
            }
        }
        self.store.is_maxima(v).then_some(v)
    }

    fn get_curr_y_maxima_vertex_open(&self, e: ActiveId) -> Option<VertexId> {
        let mut v = self.ae(e).vertex_top;
        let stop = |flags: VertexFlags| {
            flags.contains(VertexFlags::OPEN_END) || flags.contains(VertexFlags::LOCAL_MAX)
        };
        if self.ae(e).wind_dx > 0 {
            while self.store.pt(self.store.next(v)).y == self.store.pt(v).y
                && !stop(self.store.flags(v))
            {
                v = self.store.next(v);
            }
        } else {
            while self.store.pt(self.store.prev(v)).y == self.store.pt(v).y
                && !stop(self.store.flags(v))
            {
                v = self.store.prev(v);
            }
        }
        self.store.is_maxima(v).then_some(v)
    }

    fn get_prev_hot_edge(&self, e: ActiveId) -> Option<ActiveId> {
        let mut prev = self.ae(e).prev_in_ael;
        while let Some(p) = prev {
            if !self.is_open(p) && self.is_hot(p) {
                return Some(p);
            }
            prev = self.ae(p).prev_in_ael;
        }
        None
    }

    fn outrec_is_ascending(&self, hot_edge: ActiveId) -> bool {
        let or = self.ae(hot_edge).outrec.expect("hot edge has outrec");
        self.outrecs[or.0].front_edge == Some(hot_edge)
    }

    fn set_sides(&mut self, outrec: OutRecId, start_edge: ActiveId, end_edge: ActiveId) {
        self.outrecs[outrec.0].front_edge = Some(start_edge);
        self.outrecs[outrec.0].back_edge = Some(end_edge);
    }

    fn swap_front_back_sides(&mut self, outrec: OutRecId) {
        let f = self.outrecs[outrec.0].front_edge;
        let b = self.outrecs[outrec.0].back_edge;
        self.outrecs[outrec.0].front_edge = b;
        self.outrecs[outrec.0].back_edge = f;
        let pts = self.outrecs[outrec.0].pts.expect("sides only swap on live rings");
        self.outrecs[outrec.0].pts = Some(self.outpts[pts.0].next);
    }

    fn swap_outrecs(&mut self, e1: ActiveId, e2: ActiveId) {
        let or1 = self.ae(e1).outrec;
        let or2 = self.ae(e2).outrec;
        if or1 == or2 {
            if let Some(or) = or1 {
                let f = self.outrecs[or.0].front_edge;
                self.outrecs[or.0].front_edge = self.outrecs[or.0].back_edge;
                self.outrecs[or.0].back_edge = f;
            }
            return;
        }
        if let Some(or) = or1 {
            if self.outrecs[or.0].front_edge == Some(e1) {
                self.outrecs[or.0].front_edge = Some(e2);
            } else {
                self.outrecs[or.0].back_edge = Some(e2);
            }
        }
        if let Some(or) = or2 {
            if self.outrecs[or.0].front_edge == Some(e2) {
                self.outrecs[or.0].front_edge = Some(e1);
            } else {
                self.outrecs[or.0].back_edge = Some(e1);
            }
        }
        self.actives[e1.0].outrec = or2;
        self.actives[e2.0].outrec = or1;
    }

    /// Points `outrec`'s owner at `new_owner`, pruning empty records from the
    /// new owner's chain and refusing to create an ownership cycle.
    pub(crate) fn set_owner(&mut self, outrec: OutRecId, new_owner: OutRecId) {
        while let Some(o) = self.outrecs[new_owner.0].owner {
            if self.outrecs[o.0].pts.is_some() {
                break;
            }
            self.outrecs[new_owner.0].owner = self.outrecs[o.0].owner;
        }
        let mut tmp = Some(new_owner);
        while let Some(t) = tmp {
            if t == outrec {
                break;
            }
            tmp = self.outrecs[t.0].owner;
        }
        if tmp.is_some() {
            self.outrecs[new_owner.0].owner = self.outrecs[outrec.0].owner;
        }
        self.outrecs[outrec.0].owner = Some(new_owner);
    }

    fn uncouple_outrec(&mut self, e: ActiveId) {
        let Some(or) = self.ae(e).outrec else { return };
        if let Some(f) = self.outrecs[or.0].front_edge {
            self.actives[f.0].outrec = None;
        }
        if let Some(b) = self.outrecs[or.0].back_edge {
            self.actives[b.0].outrec = None;
        }
        self.outrecs[or.0].front_edge = None;
        self.outrecs[or.0].back_edge = None;
    }

    pub(crate) fn fix_outrec_pts(&mut self, outrec: OutRecId) {
        let start = self.outrecs[outrec.0].pts.expect("ring present");
        let mut op = start;
        loop {
            self.outpts[op.0].outrec = outrec;
            op = self.outpts[op.0].next;
            if op == start {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // arenas

    fn new_active(&mut self, a: Active) -> ActiveId {
        let id = ActiveId(self.actives.len());
        self.actives.push(a);
        id
    }

    pub(crate) fn new_outrec(&mut self) -> OutRecId {
        let id = OutRecId(self.outrecs.len());
        self.outrecs.push(OutRec {
            owner: None,
            front_edge: None,
            back_edge: None,
            pts: None,
            polynode: None,
            splits: Vec::new(),
            recursive_split: None,
            bounds: Rect64::default(),
            path: Path64::new(),
            is_open: false,
        });
        id
    }

    fn new_out_pt(&mut self, pt: Point64, outrec: OutRecId) -> OutPtId {
        let id = OutPtId(self.outpts.len());
        self.outpts.push(OutPt {
            pt,
            next: id,
            prev: id,
            outrec,
            horz_marked: false,
        });
        id
    }

    // ------------------------------------------------------------------
    // AEL ordering and insertion

    /// The total order of the active edge list. `newcomer` shares the sweep
    /// line with `resident`; returns true when `newcomer` belongs to the
    /// right of `resident`. Ties on `cur_x` are broken by turning direction,
    /// then (for fully collinear edges) by insertion recency and bound role.
    fn is_valid_ael_order(&self, resident: ActiveId, newcomer: ActiveId) -> bool {
        let r = self.ae(resident);
        let n = self.ae(newcomer);
        if n.cur_x != r.cur_x {
            return n.cur_x > r.cur_x;
        }
        let d = cross(r.top, n.bot, n.top);
        if d != 0 {
            return d < 0;
        }
        // edges are collinear: for edges just starting, order by where the
        // bound turns next
        if !self.is_maxima_edge(resident) && r.top.y > n.top.y {
            return cross(n.bot, r.top, self.store.pt(self.next_vertex(resident))) <= 0;
        }
        if !self.is_maxima_edge(newcomer) && n.top.y > r.top.y {
            return cross(n.bot, n.top, self.store.pt(self.next_vertex(newcomer))) >= 0;
        }
        let y = n.bot.y;
        let newcomer_is_left = n.is_left_bound;
        if r.bot.y != y || self.store.pt(r.local_min.vertex).y != y {
            return newcomer_is_left;
        }
        // resident was inserted at this same scanbeam
        if r.is_left_bound != newcomer_is_left {
            return newcomer_is_left;
        }
        if cross(self.store.pt(self.prev_prev_vertex(resident)), r.bot, r.top) == 0 {
            return true;
        }
        // compare where the two alternate bounds turn
        (cross(
            self.store.pt(self.prev_prev_vertex(resident)),
            n.bot,
            self.store.pt(self.prev_prev_vertex(newcomer)),
        ) > 0)
            == newcomer_is_left
    }

    fn insert_left_edge(&mut self, e: ActiveId) {
        match self.ael_first {
            None => {
                self.actives[e.0].prev_in_ael = None;
                self.actives[e.0].next_in_ael = None;
                self.ael_first = Some(e);
            }
            Some(first) if !self.is_valid_ael_order(first, e) => {
                self.actives[e.0].prev_in_ael = None;
                self.actives[e.0].next_in_ael = Some(first);
                self.actives[first.0].prev_in_ael = Some(e);
                self.ael_first = Some(e);
            }
            Some(first) => {
                let mut e2 = first;
                while let Some(next) = self.ae(e2).next_in_ael {
                    if !self.is_valid_ael_order(next, e) {
                        break;
                    }
                    e2 = next;
                }
                // never insert between provisionally joined edges
                if self.ae(e2).join_with == JoinWith::Right {
                    e2 = self.ae(e2).next_in_ael.expect("joined edge has a partner");
                }
                let after = self.ae(e2).next_in_ael;
                self.actives[e.0].next_in_ael = after;
                if let Some(a) = after {
                    self.actives[a.0].prev_in_ael = Some(e);
                }
                self.actives[e.0].prev_in_ael = Some(e2);
                self.actives[e2.0].next_in_ael = Some(e);
            }
        }
    }

    fn insert_right_edge(&mut self, e: ActiveId, e2: ActiveId) {
        let after = self.ae(e).next_in_ael;
        self.actives[e2.0].next_in_ael = after;
        if let Some(a) = after {
            self.actives[a.0].prev_in_ael = Some(e2);
        }
        self.actives[e2.0].prev_in_ael = Some(e);
        self.actives[e.0].next_in_ael = Some(e2);
    }

    fn delete_from_ael(&mut self, e: ActiveId) {
        let prev = self.ae(e).prev_in_ael;
        let next = self.ae(e).next_in_ael;
        if prev.is_none() && next.is_none() && self.ael_first != Some(e) {
            return; // already detached
        }
        match prev {
            Some(p) => self.actives[p.0].next_in_ael = next,
            None => self.ael_first = next,
        }
        if let Some(n) = next {
            self.actives[n.0].prev_in_ael = prev;
        }
        self.actives[e.0].prev_in_ael = None;
        self.actives[e.0].next_in_ael = None;
    }

    fn swap_positions_in_ael(&mut self, e1: ActiveId, e2: ActiveId) {
        // precondition: e1 is immediately left of e2
        let next = self.ae(e2).next_in_ael;
        if let Some(n) = next {
            self.actives[n.0].prev_in_ael = Some(e1);
        }
        let prev = self.ae(e1).prev_in_ael;
        if let Some(p) = prev {
            self.actives[p.0].next_in_ael = Some(e2);
        }
        self.actives[e2.0].prev_in_ael = prev;
        self.actives[e2.0].next_in_ael = Some(e1);
        self.actives[e1.0].prev_in_ael = Some(e2);
        self.actives[e1.0].next_in_ael = next;
        if self.ae(e2).prev_in_ael.is_none() {
            self.ael_first = Some(e2);
        }
    }

    // ------------------------------------------------------------------
    // winding

    fn set_wind_count_for_closed_path_edge(&mut self, e: ActiveId) {
        // find the nearest closed edge of the same path type to our left
        let pt = self.path_type(e);
        let mut e2 = self.ae(e).prev_in_ael;
        while let Some(p) = e2 {
            if self.path_type(p) == pt && !self.is_open(p) {
                break;
            }
            e2 = self.ae(p).prev_in_ael;
        }

        if e2.is_none() {
            let wd = self.ae(e).wind_dx;
            self.actives[e.0].wind_count = wd;
        } else if self.fill_rule() == FillRule::EvenOdd {
            let wd = self.ae(e).wind_dx;
            self.actives[e.0].wind_count = wd;
        } else {
            let p = e2.unwrap();
            let (p_count, p_dx) = (self.ae(p).wind_count, self.ae(p).wind_dx);
            let e_dx = self.ae(e).wind_dx;
            let wc = if p_count * p_dx < 0 {
                // the edge to our left is heading the other way, so we're
                // outside its ring
                if p_count.abs() > 1 {
                    // but still inside another ring of the same type
                    if p_dx * e_dx < 0 {
                        p_count
                    } else {
                        p_count + e_dx
                    }
                } else if self.is_open(e) {
                    1
                } else {
                    e_dx
                }
            } else {
                // inside the neighbour's ring
                if p_dx * e_dx < 0 {
                    p_count
                } else {
                    p_count + e_dx
                }
            };
            self.actives[e.0].wind_count = wc;
        }

        // accumulate the other path type's winding across everything between
        // the found neighbour and us
        let mut wc2 = match e2 {
            Some(p) => self.ae(p).wind_count2,
            None => 0,
        };
        let mut walker = match e2 {
            Some(p) => self.ae(p).next_in_ael,
            None => self.ael_first,
        };
        if self.fill_rule() == FillRule::EvenOdd {
            while let Some(w) = walker {
                if w == e {
                    break;
                }
                if self.path_type(w) != pt && !self.is_open(w) {
                    wc2 = if wc2 == 0 { 1 } else { 0 };
                }
                walker = self.ae(w).next_in_ael;
            }
        } else {
            while let Some(w) = walker {
                if w == e {
                    break;
                }
                if self.path_type(w) != pt && !self.is_open(w) {
                    wc2 += self.ae(w).wind_dx;
                }
                walker = self.ae(w).next_in_ael;
            }
        }
        self.actives[e.0].wind_count2 = wc2;
    }

    fn set_wind_count_for_open_path_edge(&mut self, e: ActiveId) {
        let mut e2 = self.ael_first;
        if self.fill_rule() == FillRule::EvenOdd {
            let mut cnt1 = 0;
            let mut cnt2 = 0;
            while let Some(w) = e2 {
                if w == e {
                    break;
                }
                if self.path_type(w) == PathType::Clip {
                    cnt2 += 1;
                } else if !self.is_open(w) {
                    cnt1 += 1;
                }
                e2 = self.ae(w).next_in_ael;
            }
            self.actives[e.0].wind_count = if cnt1 % 2 == 1 { 1 } else { 0 };
            self.actives[e.0].wind_count2 = if cnt2 % 2 == 1 { 1 } else { 0 };
        } else {
            let mut wc = 0;
            let mut wc2 = 0;
            while let Some(w) = e2 {
                if w == e {
                    break;
                }
                if self.path_type(w) == PathType::Clip {
                    wc2 += self.ae(w).wind_dx;
                } else if !self.is_open(w) {
                    wc += self.ae(w).wind_dx;
                }
                e2 = self.ae(w).next_in_ael;
            }
            self.actives[e.0].wind_count = wc;
            self.actives[e.0].wind_count2 = wc2;
        }
    }

    /// The normative contributing-region table for closed paths, keyed by
    /// clip type, fill rule and both winding counts.
    fn is_contributing_closed(&self, e: ActiveId) -> bool {
        let a = self.ae(e);
        match self.fill_rule() {
            FillRule::Positive => {
                if a.wind_count != 1 {
                    return false;
                }
            }
            FillRule::Negative => {
                if a.wind_count != -1 {
                    return false;
                }
            }
            FillRule::NonZero => {
                if a.wind_count.abs() != 1 {
                    return false;
                }
            }
            FillRule::EvenOdd => {}
        }
        match self.clip_type() {
            ClipType::Intersection => match self.fill_rule() {
                FillRule::Positive => a.wind_count2 > 0,
                FillRule::Negative => a.wind_count2 < 0,
                _ => a.wind_count2 != 0,
            },
            ClipType::Union => match self.fill_rule() {
                FillRule::Positive => a.wind_count2 <= 0,
                FillRule::Negative => a.wind_count2 >= 0,
                _ => a.wind_count2 == 0,
            },
            ClipType::Difference => {
                let outside_clip = match self.fill_rule() {
                    FillRule::Positive => a.wind_count2 <= 0,
                    FillRule::Negative => a.wind_count2 >= 0,
                    _ => a.wind_count2 == 0,
                };
                (self.path_type(e) == PathType::Subject) == outside_clip
            }
            ClipType::Xor => true,
        }
    }

    fn is_contributing_open(&self, e: ActiveId) -> bool {
        let a = self.ae(e);
        let (is_in_subj, is_in_clip) = match self.fill_rule() {
            FillRule::Positive => (a.wind_count > 0, a.wind_count2 > 0),
            FillRule::Negative => (a.wind_count < 0, a.wind_count2 < 0),
            _ => (a.wind_count != 0, a.wind_count2 != 0),
        };
        match self.clip_type() {
            ClipType::Intersection => is_in_clip,
            ClipType::Union => !is_in_subj && !is_in_clip,
            _ => !is_in_clip,
        }
    }

    // ------------------------------------------------------------------
    // local minima insertion

    fn has_loc_min_at_y(&self, y: i64) -> bool {
        self.current_loc_min < self.store.minima.len()
            && self.store.pt(self.store.minima[self.current_loc_min].vertex).y == y
    }

    fn insert_local_minima_into_ael(&mut self, bot_y: i64) {
        while self.has_loc_min_at_y(bot_y) {
            let lm = self.store.minima[self.current_loc_min];
            self.current_loc_min += 1;
            let v = lm.vertex;
            let v_pt = self.store.pt(v);
            let flags = self.store.flags(v);

            let mut left: Option<ActiveId> = if flags.contains(VertexFlags::OPEN_START) {
                None
            } else {
                let vt = self.store.prev(v);
                let top = self.store.pt(vt);
                let id = self.new_active(Active {
                    bot: v_pt,
                    top,
                    cur_x: v_pt.x,
                    dx: Self::get_dx(v_pt, top),
                    wind_dx: -1,
                    wind_count: 0,
                    wind_count2: 0,
                    outrec: None,
                    prev_in_ael: None,
                    next_in_ael: None,
                    prev_in_sel: None,
                    next_in_sel: None,
                    jump: None,
                    vertex_top: vt,
                    local_min: lm,
                    is_left_bound: false,
                    join_with: JoinWith::Nothing,
                });
                Some(id)
            };

            let mut right: Option<ActiveId> = if flags.contains(VertexFlags::OPEN_END) {
                None
            } else {
                let vt = self.store.next(v);
                let top = self.store.pt(vt);
                let id = self.new_active(Active {
                    bot: v_pt,
                    top,
                    cur_x: v_pt.x,
                    dx: Self::get_dx(v_pt, top),
                    wind_dx: 1,
                    wind_count: 0,
                    wind_count2: 0,
                    outrec: None,
                    prev_in_ael: None,
                    next_in_ael: None,
                    prev_in_sel: None,
                    next_in_sel: None,
                    jump: None,
                    vertex_top: vt,
                    local_min: lm,
                    is_left_bound: false,
                    join_with: JoinWith::Nothing,
                });
                Some(id)
            };

            if let (Some(l), Some(r)) = (left, right) {
                if self.is_horizontal(l) {
                    if self.is_heading_right_horz(l) {
                        std::mem::swap(&mut left, &mut right);
                    }
                } else if self.is_horizontal(r) {
                    if self.is_heading_left_horz(r) {
                        std::mem::swap(&mut left, &mut right);
                    }
                } else if self.ae(l).dx < self.ae(r).dx {
                    std::mem::swap(&mut left, &mut right);
                }
            } else if left.is_none() {
                left = right.take();
            }

            let lb = left.expect("a minima always yields at least one bound");
            self.actives[lb.0].is_left_bound = true;
            self.insert_left_edge(lb);

            let contributing = if self.is_open(lb) {
                self.set_wind_count_for_open_path_edge(lb);
                self.is_contributing_open(lb)
            } else {
                self.set_wind_count_for_closed_path_edge(lb);
                self.is_contributing_closed(lb)
            };

            if let Some(rb) = right {
                let (wc, wc2) = (self.ae(lb).wind_count, self.ae(lb).wind_count2);
                self.actives[rb.0].wind_count = wc;
                self.actives[rb.0].wind_count2 = wc2;
                self.insert_right_edge(lb, rb);

                if contributing {
                    let bot = self.ae(lb).bot;
                    self.add_local_min_poly(lb, rb, bot, true);
                    if !self.is_horizontal(lb) {
                        let bot = self.ae(lb).bot;
                        self.check_join_left(lb, bot, false);
                    }
                }

                while let Some(next) = self.ae(rb).next_in_ael {
                    if !self.is_valid_ael_order(next, rb) {
                        break;
                    }
                    let bot = self.ae(rb).bot;
                    self.intersect_edges(rb, next, bot);
                    self.swap_positions_in_ael(rb, next);
                }

                if self.is_horizontal(rb) {
                    self.push_horz(rb);
                } else {
                    let bot = self.ae(rb).bot;
                    self.check_join_right(rb, bot, false);
                    let top_y = self.ae(rb).top.y;
                    self.scanlines.insert(top_y);
                }
            } else if contributing {
                let bot = self.ae(lb).bot;
                self.start_open_path(lb, bot);
            }

            if self.is_horizontal(lb) {
                self.push_horz(lb);
            } else {
                let top_y = self.ae(lb).top.y;
                self.scanlines.insert(top_y);
            }
        }
    }

    // ------------------------------------------------------------------
    // output topology events

    fn add_local_min_poly(
        &mut self,
        e1: ActiveId,
        e2: ActiveId,
        pt: Point64,
        is_new: bool,
    ) -> OutPtId {
        let outrec = self.new_outrec();
        self.actives[e1.0].outrec = Some(outrec);
        self.actives[e2.0].outrec = Some(outrec);

        if self.is_open(e1) {
            self.outrecs[outrec.0].is_open = true;
            if self.ae(e1).wind_dx > 0 {
                self.set_sides(outrec, e1, e2);
            } else {
                self.set_sides(outrec, e2, e1);
            }
        } else if let Some(prev_hot) = self.get_prev_hot_edge(e1) {
            // provisional nesting: the true owner is settled during tree
            // building, after all splits are known
            let prev_or = self.ae(prev_hot).outrec.expect("hot edge has outrec");
            if self.using_polytree {
                self.set_owner(outrec, prev_or);
            } else {
                self.outrecs[outrec.0].owner = Some(prev_or);
            }
            if self.outrec_is_ascending(prev_hot) == is_new {
                self.set_sides(outrec, e2, e1);
            } else {
                self.set_sides(outrec, e1, e2);
            }
        } else {
            self.outrecs[outrec.0].owner = None;
            if is_new {
                self.set_sides(outrec, e1, e2);
            } else {
                self.set_sides(outrec, e2, e1);
            }
        }

        let op = self.new_out_pt(pt, outrec);
        self.outrecs[outrec.0].pts = Some(op);
        op
    }

    fn add_local_max_poly(&mut self, e1: ActiveId, e2: ActiveId, pt: Point64) -> Option<OutPtId> {
        if self.is_joined(e1) {
            self.split(e1, pt);
        }
        if self.is_joined(e2) {
            self.split(e2, pt);
        }

        if self.is_front(e1) == self.is_front(e2) {
            if self.is_open_end_edge(e1) {
                let or = self.ae(e1).outrec.expect("open end closing");
                self.swap_front_back_sides(or);
            } else if self.is_open_end_edge(e2) {
                let or = self.ae(e2).outrec.expect("open end closing");
                self.swap_front_back_sides(or);
            } else {
                self.succeeded = false;
                return None;
            }
        }

        let result = self.add_out_pt(e1, pt);
        let or1 = self.ae(e1).outrec.expect("maxima on hot edge");
        let or2 = self.ae(e2).outrec.expect("maxima on hot edge");
        if or1 == or2 {
            self.outrecs[or1.0].pts = Some(result);
            if self.using_polytree {
                match self.get_prev_hot_edge(e1) {
                    None => self.outrecs[or1.0].owner = None,
                    Some(prev) => {
                        let prev_or = self.ae(prev).outrec.expect("hot edge has outrec");
                        // often not the real owner; fixed after the sweep
                        self.set_owner(or1, prev_or);
                    }
                }
            }
            self.uncouple_outrec(e1);
        } else if self.is_open(e1) {
            if self.ae(e1).wind_dx < 0 {
                self.join_outrec_paths(e1, e2);
            } else {
                self.join_outrec_paths(e2, e1);
            }
        } else if or1.0 < or2.0 {
            self.join_outrec_paths(e1, e2);
        } else {
            self.join_outrec_paths(e2, e1);
        }
        Some(result)
    }

    /// Splices `e2`'s ring onto `e1`'s, keeping whichever front/back edge
    /// assignment stays structurally consistent, and retires `e2`'s record.
    fn join_outrec_paths(&mut self, e1: ActiveId, e2: ActiveId) {
        let or1 = self.ae(e1).outrec.expect("join needs hot edges");
        let or2 = self.ae(e2).outrec.expect("join needs hot edges");
        let p1_start = self.outrecs[or1.0].pts.expect("non-empty ring");
        let p2_start = self.outrecs[or2.0].pts.expect("non-empty ring");
        let p1_end = self.outpts[p1_start.0].next;
        let p2_end = self.outpts[p2_start.0].next;

        if self.is_front(e1) {
            self.outpts[p2_end.0].prev = p1_start;
            self.outpts[p1_start.0].next = p2_end;
            self.outpts[p2_start.0].next = p1_end;
            self.outpts[p1_end.0].prev = p2_start;
            self.outrecs[or1.0].pts = Some(p2_start);
            let fe = self.outrecs[or2.0].front_edge;
            self.outrecs[or1.0].front_edge = fe;
            if let Some(f) = fe {
                self.actives[f.0].outrec = Some(or1);
            }
        } else {
            self.outpts[p1_end.0].prev = p2_start;
            self.outpts[p2_start.0].next = p1_end;
            self.outpts[p1_start.0].next = p2_end;
            self.outpts[p2_end.0].prev = p1_start;
            let be = self.outrecs[or2.0].back_edge;
            self.outrecs[or1.0].back_edge = be;
            if let Some(b) = be {
                self.actives[b.0].outrec = Some(or1);
            }
        }

        self.set_owner(or2, or1);

        self.outrecs[or2.0].front_edge = None;
        self.outrecs[or2.0].back_edge = None;
        self.outrecs[or2.0].pts = None;

        if self.is_open_end_edge(e1) {
            let p = self.outrecs[or1.0].pts;
            self.outrecs[or2.0].pts = p;
            self.outrecs[or1.0].pts = None;
        }

        self.actives[e1.0].outrec = None;
        self.actives[e2.0].outrec = None;
    }

    fn add_out_pt(&mut self, e: ActiveId, pt: Point64) -> OutPtId {
        let outrec = self.ae(e).outrec.expect("output on hot edge");
        let to_front = self.is_front(e);
        let op_front = self.outrecs[outrec.0].pts.expect("seeded ring");
        let op_back = self.outpts[op_front.0].next;
        if to_front && pt == self.outpts[op_front.0].pt {
            return op_front;
        }
        if !to_front && pt == self.outpts[op_back.0].pt {
            return op_back;
        }
        let new_op = self.new_out_pt(pt, outrec);
        self.outpts[op_back.0].prev = new_op;
        self.outpts[new_op.0].prev = op_front;
        self.outpts[new_op.0].next = op_back;
        self.outpts[op_front.0].next = new_op;
        if to_front {
            self.outrecs[outrec.0].pts = Some(new_op);
        }
        new_op
    }

    fn start_open_path(&mut self, e: ActiveId, pt: Point64) -> OutPtId {
        let outrec = self.new_outrec();
        self.outrecs[outrec.0].is_open = true;
        if self.ae(e).wind_dx > 0 {
            self.outrecs[outrec.0].front_edge = Some(e);
        } else {
            self.outrecs[outrec.0].back_edge = Some(e);
        }
        self.actives[e.0].outrec = Some(outrec);
        let op = self.new_out_pt(pt, outrec);
        self.outrecs[outrec.0].pts = Some(op);
        op
    }

    fn update_edge_into_ael(&mut self, e: ActiveId) {
        let top = self.ae(e).top;
        self.actives[e.0].bot = top;
        let vt = self.next_vertex(e);
        self.actives[e.0].vertex_top = vt;
        let new_top = self.store.pt(vt);
        self.actives[e.0].top = new_top;
        self.actives[e.0].cur_x = top.x;
        self.set_dx(e);

        if self.is_joined(e) {
            let bot = self.ae(e).bot;
            self.split(e, bot);
        }
        if self.is_horizontal(e) {
            if !self.is_open(e) {
                self.trim_horz(e, self.preserve_collinear);
            }
            return;
        }
        let top_y = self.ae(e).top.y;
        self.scanlines.insert(top_y);
        let bot = self.ae(e).bot;
        self.check_join_left(e, bot, false);
        self.check_join_right(e, bot, true);
    }

    fn find_edge_with_matching_loc_min(&self, e: ActiveId) -> Option<ActiveId> {
        let lm = self.ae(e).local_min;
        let bot = self.ae(e).bot;
        let mut result = self.ae(e).next_in_ael;
        while let Some(r) = result {
            if self.ae(r).local_min == lm {
                return Some(r);
            }
            if !self.is_horizontal(r) && bot != self.ae(r).bot {
                result = None;
            } else {
                result = self.ae(r).next_in_ael;
            }
        }
        let mut result = self.ae(e).prev_in_ael;
        while let Some(r) = result {
            if self.ae(r).local_min == lm {
                return Some(r);
            }
            if !self.is_horizontal(r) && bot != self.ae(r).bot {
                return None;
            }
            result = self.ae(r).prev_in_ael;
        }
        None
    }

    // ------------------------------------------------------------------
    // the intersection decision table

    /// Resolves a crossing of two active edges at `pt`: updates winding
    /// counts and, depending on each edge's hot/not-hot state, starts a
    /// region, closes one, extends one (swapping ring ownership), or does
    /// nothing.
    fn intersect_edges(&mut self, e1: ActiveId, e2: ActiveId, pt: Point64) -> Option<OutPtId> {
        let mut e1 = e1;
        let mut e2 = e2;

        // open-path crossings are handled separately
        if self.store.has_open_paths && (self.is_open(e1) || self.is_open(e2)) {
            if self.is_open(e1) && self.is_open(e2) {
                return None;
            }
            if self.is_open(e2) {
                std::mem::swap(&mut e1, &mut e2);
            }
            // e1 is now the open edge
            if self.is_joined(e2) {
                self.split(e2, pt);
            }

            if self.clip_type() == ClipType::Union {
                if !self.is_hot(e2) {
                    return None;
                }
            } else if self.path_type(e2) == PathType::Subject {
                return None;
            }
            match self.fill_rule() {
                FillRule::Positive => {
                    if self.ae(e2).wind_count != 1 {
                        return None;
                    }
                }
                FillRule::Negative => {
                    if self.ae(e2).wind_count != -1 {
                        return None;
                    }
                }
                _ => {
                    if self.ae(e2).wind_count.abs() != 1 {
                        return None;
                    }
                }
            }

            // the crossing toggles whether the open edge contributes
            if self.is_hot(e1) {
                let op = self.add_out_pt(e1, pt);
                let or = self.ae(e1).outrec.expect("hot edge");
                if self.is_front(e1) {
                    self.outrecs[or.0].front_edge = None;
                } else {
                    self.outrecs[or.0].back_edge = None;
                }
                self.actives[e1.0].outrec = None;
                return Some(op);
            }

            let lm_vertex = self.ae(e1).local_min.vertex;
            if pt == self.store.pt(lm_vertex) && !self.store.is_open_end(lm_vertex) {
                // a horizontal can pass under an open path exactly at its
                // minima vertex; hook onto the other bound if it's hot
                if let Some(e3) = self.find_edge_with_matching_loc_min(e1) {
                    if self.is_hot(e3) {
                        let or = self.ae(e3).outrec.expect("hot edge");
                        self.actives[e1.0].outrec = Some(or);
                        if self.ae(e1).wind_dx > 0 {
                            self.set_sides(or, e1, e3);
                        } else {
                            self.set_sides(or, e3, e1);
                        }
                        return self.outrecs[or.0].pts;
                    }
                }
            }
            return Some(self.start_open_path(e1, pt));
        }

        // closed paths from here on
        if self.is_joined(e1) {
            self.split(e1, pt);
        }
        if self.is_joined(e2) {
            self.split(e2, pt);
        }

        // update winding counts
        if self.is_same_path_type(e1, e2) {
            if self.fill_rule() == FillRule::EvenOdd {
                let w = self.ae(e1).wind_count;
                self.actives[e1.0].wind_count = self.ae(e2).wind_count;
                self.actives[e2.0].wind_count = w;
            } else {
                let (w1, d1) = (self.ae(e1).wind_count, self.ae(e1).wind_dx);
                let (w2, d2) = (self.ae(e2).wind_count, self.ae(e2).wind_dx);
                self.actives[e1.0].wind_count = if w1 + d2 == 0 { -w1 } else { w1 + d2 };
                self.actives[e2.0].wind_count = if w2 - d1 == 0 { -w2 } else { w2 - d1 };
            }
        } else if self.fill_rule() == FillRule::EvenOdd {
            let w1 = self.ae(e1).wind_count2;
            let w2 = self.ae(e2).wind_count2;
            self.actives[e1.0].wind_count2 = if w1 == 0 { 1 } else { 0 };
            self.actives[e2.0].wind_count2 = if w2 == 0 { 1 } else { 0 };
        } else {
            let d1 = self.ae(e1).wind_dx;
            let d2 = self.ae(e2).wind_dx;
            self.actives[e1.0].wind_count2 += d2;
            self.actives[e2.0].wind_count2 -= d1;
        }

        let (e1_wc, e2_wc) = match self.fill_rule() {
            FillRule::Positive => (self.ae(e1).wind_count, self.ae(e2).wind_count),
            FillRule::Negative => (-self.ae(e1).wind_count, -self.ae(e2).wind_count),
            _ => (self.ae(e1).wind_count.abs(), self.ae(e2).wind_count.abs()),
        };

        let e1_in_01 = e1_wc == 0 || e1_wc == 1;
        let e2_in_01 = e2_wc == 0 || e2_wc == 1;
        if (!self.is_hot(e1) && !e1_in_01) || (!self.is_hot(e2) && !e2_in_01) {
            return None;
        }

        if self.is_hot(e1) && self.is_hot(e2) {
            if (e1_wc != 0 && e1_wc != 1)
                || (e2_wc != 0 && e2_wc != 1)
                || (!self.is_same_path_type(e1, e2) && self.clip_type() != ClipType::Xor)
            {
                self.add_local_max_poly(e1, e2, pt)
            } else if self.is_front(e1) || self.ae(e1).outrec == self.ae(e2).outrec {
                // treat as a maxima/minima pair even though the regions
                // continue, so front/back stay coherent
                let op = self.add_local_max_poly(e1, e2, pt);
                self.add_local_min_poly(e1, e2, pt, false);
                op
            } else {
                let op = self.add_out_pt(e1, pt);
                self.add_out_pt(e2, pt);
                self.swap_outrecs(e1, e2);
                Some(op)
            }
        } else if self.is_hot(e1) {
            let op = self.add_out_pt(e1, pt);
            self.swap_outrecs(e1, e2);
            Some(op)
        } else if self.is_hot(e2) {
            let op = self.add_out_pt(e2, pt);
            self.swap_outrecs(e1, e2);
            Some(op)
        } else {
            // neither is hot: maybe a region starts here
            let (e1_wc2, e2_wc2) = match self.fill_rule() {
                FillRule::Positive => (self.ae(e1).wind_count2, self.ae(e2).wind_count2),
                FillRule::Negative => (-self.ae(e1).wind_count2, -self.ae(e2).wind_count2),
                _ => (self.ae(e1).wind_count2.abs(), self.ae(e2).wind_count2.abs()),
            };
            if !self.is_same_path_type(e1, e2) {
                Some(self.add_local_min_poly(e1, e2, pt, false))
            } else if e1_wc == 1 && e2_wc == 1 {
                match self.clip_type() {
                    ClipType::Union => {
                        if e1_wc2 > 0 && e2_wc2 > 0 {
                            None
                        } else {
                            Some(self.add_local_min_poly(e1, e2, pt, false))
                        }
                    }
                    ClipType::Difference => {
                        if (self.path_type(e1) == PathType::Clip && e1_wc2 > 0 && e2_wc2 > 0)
                            || (self.path_type(e1) == PathType::Subject
                                && e1_wc2 <= 0
                                && e2_wc2 <= 0)
                        {
                            Some(self.add_local_min_poly(e1, e2, pt, false))
                        } else {
                            None
                        }
                    }
                    ClipType::Xor => Some(self.add_local_min_poly(e1, e2, pt, false)),
                    ClipType::Intersection => {
                        if e1_wc2 <= 0 || e2_wc2 <= 0 {
                            None
                        } else {
                            Some(self.add_local_min_poly(e1, e2, pt, false))
                        }
                    }
                }
            } else {
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // provisional joins

    /// Re-opens output for a provisionally joined pair that is diverging.
    fn split(&mut self, e: ActiveId, pt: Point64) {
        if self.ae(e).join_with == JoinWith::Right {
            let next = self.ae(e).next_in_ael.expect("right-joined edge has partner");
            self.actives[e.0].join_with = JoinWith::Nothing;
            self.actives[next.0].join_with = JoinWith::Nothing;
            self.add_local_min_poly(e, next, pt, true);
        } else {
            let prev = self.ae(e).prev_in_ael.expect("left-joined edge has partner");
            self.actives[e.0].join_with = JoinWith::Nothing;
            self.actives[prev.0].join_with = JoinWith::Nothing;
            self.add_local_min_poly(prev, e, pt, true);
        }
    }

    fn check_join_left(&mut self, e: ActiveId, pt: Point64, check_cur_x: bool) {
        let Some(prev) = self.ae(e).prev_in_ael else { return };
        if self.is_open(e)
            || self.is_open(prev)
            || !self.is_hot(e)
            || !self.is_hot(prev)
            || self.is_horizontal(e)
            || self.is_horizontal(prev)
        {
            return;
        }
        let e_top = self.ae(e).top;
        let p_top = self.ae(prev).top;
        // reject trivial joins right below either top
        if (pt.y < e_top.y + 2 || pt.y < p_top.y + 2)
            && (self.ae(e).bot.y > pt.y || self.ae(prev).bot.y > pt.y)
        {
            return;
        }
        if check_cur_x {
            let p_bot = self.ae(prev).bot;
            if perpendic_dist_from_line_sqrd(pt, p_bot, p_top) > 0.25 {
                return;
            }
        } else if self.ae(e).cur_x != self.ae(prev).cur_x {
            return;
        }
        if cross(e_top, pt, p_top) != 0 {
            return;
        }

        let e_or = self.ae(e).outrec.expect("hot edge");
        let p_or = self.ae(prev).outrec.expect("hot edge");
        if e_or == p_or {
            self.add_local_max_poly(prev, e, pt);
        } else if e_or.0 < p_or.0 {
            self.join_outrec_paths(e, prev);
        } else {
            self.join_outrec_paths(prev, e);
        }
        self.actives[prev.0].join_with = JoinWith::Right;
        self.actives[e.0].join_with = JoinWith::Left;
    }

    fn check_join_right(&mut self, e: ActiveId, pt: Point64, check_cur_x: bool) {
        let Some(next) = self.ae(e).next_in_ael else { return };
        if self.is_open(e)
            || self.is_open(next)
            || !self.is_hot(e)
            || !self.is_hot(next)
            || self.is_horizontal(e)
            || self.is_horizontal(next)
        {
            return;
        }
        let e_top = self.ae(e).top;
        let n_top = self.ae(next).top;
        if (pt.y < e_top.y + 2 || pt.y < n_top.y + 2)
            && (self.ae(e).bot.y > pt.y || self.ae(next).bot.y > pt.y)
        {
            return;
        }
        if check_cur_x {
            let n_bot = self.ae(next).bot;
            if perpendic_dist_from_line_sqrd(pt, n_bot, n_top) > 0.25 {
                return;
            }
        } else if self.ae(e).cur_x != self.ae(next).cur_x {
            return;
        }
        if cross(e_top, pt, n_top) != 0 {
            return;
        }

        let e_or = self.ae(e).outrec.expect("hot edge");
        let n_or = self.ae(next).outrec.expect("hot edge");
        if e_or == n_or {
            self.add_local_max_poly(e, next, pt);
        } else if e_or.0 < n_or.0 {
            self.join_outrec_paths(e, next);
        } else {
            self.join_outrec_paths(next, e);
        }
        self.actives[e.0].join_with = JoinWith::Right;
        self.actives[next.0].join_with = JoinWith::Left;
    }

    // ------------------------------------------------------------------
    // maxima and top-of-scanbeam

    fn do_top_of_scanbeam(&mut self, y: i64) {
        self.sel_first = None; // reused as the pending-horizontal stack
        let mut ae_opt = self.ael_first;
        while let Some(e) = ae_opt {
            if self.ae(e).top.y == y {
                let top = self.ae(e).top;
                self.actives[e.0].cur_x = top.x;
                if self.is_maxima_edge(e) {
                    ae_opt = self.do_maxima(e);
                    continue;
                }
                // an intermediate vertex
                if self.is_hot(e) {
                    self.add_out_pt(e, top);
                }
                self.update_edge_into_ael(e);
                if self.is_horizontal(e) {
                    self.push_horz(e);
                }
            } else {
                let cx = self.top_x(e, y);
                self.actives[e.0].cur_x = cx;
            }
            ae_opt = self.ae(e).next_in_ael;
        }
    }

    fn do_maxima(&mut self, e: ActiveId) -> Option<ActiveId> {
        let prev = self.ae(e).prev_in_ael;
        let next = self.ae(e).next_in_ael;

        if self.is_open_end_edge(e) {
            if self.is_hot(e) {
                let top = self.ae(e).top;
                self.add_out_pt(e, top);
            }
            if !self.is_horizontal(e) {
                if self.is_hot(e) {
                    let or = self.ae(e).outrec.expect("hot edge");
                    if self.is_front(e) {
                        self.outrecs[or.0].front_edge = None;
                    } else {
                        self.outrecs[or.0].back_edge = None;
                    }
                    self.actives[e.0].outrec = None;
                }
                self.delete_from_ael(e);
            }
            return next;
        }

        let Some(max_pair) = self.get_maxima_pair(e) else {
            // the pair is a horizontal still waiting its turn
            return next;
        };

        if self.is_joined(e) {
            let top = self.ae(e).top;
            self.split(e, top);
        }
        if self.is_joined(max_pair) {
            let top = self.ae(max_pair).top;
            self.split(max_pair, top);
        }

        // resolve every edge trapped between the maxima pair
        let mut between = self.ae(e).next_in_ael;
        while between != Some(max_pair) {
            let Some(b) = between else {
                self.succeeded = false;
                return None;
            };
            let top = self.ae(e).top;
            self.intersect_edges(e, b, top);
            self.swap_positions_in_ael(e, b);
            between = self.ae(e).next_in_ael;
        }

        if self.is_open(e) {
            if self.is_hot(e) {
                let top = self.ae(e).top;
                self.add_local_max_poly(e, max_pair, top);
            }
            self.delete_from_ael(max_pair);
            self.delete_from_ael(e);
            return match prev {
                Some(p) => self.ae(p).next_in_ael,
                None => self.ael_first,
            };
        }

        if self.is_hot(e) {
            let top = self.ae(e).top;
            self.add_local_max_poly(e, max_pair, top);
        }
        self.delete_from_ael(e);
        self.delete_from_ael(max_pair);
        match prev {
            Some(p) => self.ae(p).next_in_ael,
            None => self.ael_first,
        }
    }

    // ------------------------------------------------------------------
    // intersections between scanbeams

    fn do_intersections(&mut self, top_y: i64) {
        if self.build_intersect_list(top_y) {
            self.process_intersect_list();
            self.intersections.clear();
        }
    }

    fn adjust_curr_x_and_copy_to_sel(&mut self, top_y: i64) {
        let mut ae_opt = self.ael_first;
        self.sel_first = ae_opt;
        while let Some(e) = ae_opt {
            let prev = self.ae(e).prev_in_ael;
            let next = self.ae(e).next_in_ael;
            self.actives[e.0].prev_in_sel = prev;
            self.actives[e.0].next_in_sel = next;
            self.actives[e.0].jump = next;
            if self.ae(e).join_with == JoinWith::Left {
                // keep joined pairs exactly coincident
                let px = self.ae(prev.expect("left-joined edge has partner")).cur_x;
                self.actives[e.0].cur_x = px;
            } else {
                let cx = self.top_x(e, top_y);
                self.actives[e.0].cur_x = cx;
            }
            ae_opt = next;
        }
    }

    fn add_new_intersect_node(&mut self, e1: ActiveId, e2: ActiveId, top_y: i64) {
        let (a_bot, a_top, a_dx, a_cur_x) = {
            let a = self.ae(e1);
            (a.bot, a.top, a.dx, a.cur_x)
        };
        let (b_bot, b_top, b_dx) = {
            let b = self.ae(e2);
            (b.bot, b.top, b.dx)
        };
        let mut ip = segment_intersect_pt(a_bot, a_top, b_bot, b_top)
            .unwrap_or(Point64::new(a_cur_x, top_y));
        if !is_valid_coord(ip.x) || !is_valid_coord(ip.y) {
            ip = Point64::new(a_cur_x, top_y);
        }

        if ip.y > self.current_bot_y || ip.y < top_y {
            // rounding pushed the point outside the scanbeam; pull it back
            // onto the less steep edge (or the nearest segment point for
            // near-vertical edges)
            let abs_dx1 = a_dx.abs();
            let abs_dx2 = b_dx.abs();
            if abs_dx1 > 100.0 && abs_dx2 > 100.0 {
                if abs_dx1 > abs_dx2 {
                    ip = closest_pt_on_segment(ip, a_bot, a_top);
                } else {
                    ip = closest_pt_on_segment(ip, b_bot, b_top);
                }
            } else if abs_dx1 > 100.0 {
                ip = closest_pt_on_segment(ip, a_bot, a_top);
            } else if abs_dx2 > 100.0 {
                ip = closest_pt_on_segment(ip, b_bot, b_top);
            } else {
                let y = if ip.y < top_y { top_y } else { self.current_bot_y };
                let x = if abs_dx1 < abs_dx2 {
                    self.top_x(e1, y)
                } else {
                    self.top_x(e2, y)
                };
                ip = Point64::new(x, y);
            }
        }
        self.intersections.push(IntersectNode {
            pt: ip,
            edge1: e1,
            edge2: e2,
        });
    }

    fn extract_from_sel(&mut self, e: ActiveId) -> Option<ActiveId> {
        let next = self.ae(e).next_in_sel;
        let prev = self.ae(e).prev_in_sel.expect("never the SEL head");
        if let Some(n) = next {
            self.actives[n.0].prev_in_sel = Some(prev);
        }
        self.actives[prev.0].next_in_sel = next;
        next
    }

    fn insert1_before2_in_sel(&mut self, e1: ActiveId, e2: ActiveId) {
        let prev = self.ae(e2).prev_in_sel;
        self.actives[e1.0].prev_in_sel = prev;
        if let Some(p) = prev {
            self.actives[p.0].next_in_sel = Some(e1);
        }
        self.actives[e1.0].next_in_sel = Some(e2);
        self.actives[e2.0].prev_in_sel = Some(e1);
    }

    /// Bottom-up merge sort of the SEL keyed by each edge's x at the next
    /// scanbeam. Every inversion the sort corrects is an edge intersection
    /// and is recorded for processing.
    fn build_intersect_list(&mut self, top_y: i64) -> bool {
        let Some(first) = self.ael_first else { return false };
        if self.ae(first).next_in_ael.is_none() {
            return false;
        }
        self.adjust_curr_x_and_copy_to_sel(top_y);

        let mut left = self.sel_first;
        while left.is_some_and(|l| self.ae(l).jump.is_some()) {
            let mut prev_base: Option<ActiveId> = None;
            while let Some(l) = left {
                let Some(jump) = self.ae(l).jump else { break };
                let mut curr_base = l;
                let mut right: Option<ActiveId> = Some(jump);
                let mut l_end: Option<ActiveId> = Some(jump);
                let r_end = self.ae(jump).jump;
                self.actives[l.0].jump = r_end;
                let mut lcur: Option<ActiveId> = Some(l);
                while lcur != l_end && right != r_end {
                    let r = right.expect("right run not exhausted");
                    let lc = lcur.expect("left run not exhausted");
                    if self.ae(r).cur_x < self.ae(lc).cur_x {
                        // inversion: r crosses everything back to lc
                        let mut tmp = self.ae(r).prev_in_sel.expect("has left neighbour");
                        loop {
                            self.add_new_intersect_node(tmp, r, top_y);
                            if tmp == lc {
                                break;
                            }
                            tmp = self.ae(tmp).prev_in_sel.expect("walking back to lcur");
                        }
                        right = self.extract_from_sel(r);
                        l_end = right;
                        self.insert1_before2_in_sel(r, lc);
                        if lcur == Some(curr_base) {
                            curr_base = r;
                            self.actives[curr_base.0].jump = r_end;
                            match prev_base {
                                None => self.sel_first = Some(curr_base),
                                Some(pb) => self.actives[pb.0].jump = Some(curr_base),
                            }
                        }
                    } else {
                        lcur = self.ae(lc).next_in_sel;
                    }
                }
                prev_base = Some(curr_base);
                left = r_end;
            }
            left = self.sel_first;
        }
        !self.intersections.is_empty()
    }

    fn edges_adjacent(&self, node: &IntersectNode) -> bool {
        let e1 = self.ae(node.edge1);
        e1.next_in_ael == Some(node.edge2) || e1.prev_in_ael == Some(node.edge2)
    }

    fn process_intersect_list(&mut self) {
        // intersections must apply bottom-up, and only between edges that
        // are currently AEL-adjacent; re-pair when earlier applications
        // changed adjacency
        self.intersections
            .sort_by(|a, b| b.pt.y.cmp(&a.pt.y).then(a.pt.x.cmp(&b.pt.x)));

        for i in 0..self.intersections.len() {
            if !self.edges_adjacent(&self.intersections[i]) {
                let mut j = i + 1;
                loop {
                    if j >= self.intersections.len() {
                        // no adjacent pair left to process: unrecoverable
                        self.succeeded = false;
                        return;
                    }
                    if self.edges_adjacent(&self.intersections[j]) {
                        break;
                    }
                    j += 1;
                }
                self.intersections.swap(i, j);
            }
            let node = self.intersections[i];
            self.intersect_edges(node.edge1, node.edge2, node.pt);
            self.swap_positions_in_ael(node.edge1, node.edge2);
            self.actives[node.edge1.0].cur_x = node.pt.x;
            self.actives[node.edge2.0].cur_x = node.pt.x;
            self.check_join_left(node.edge2, node.pt, true);
            self.check_join_right(node.edge1, node.pt, true);
        }
    }

    // ------------------------------------------------------------------
    // horizontal edges

    fn push_horz(&mut self, e: ActiveId) {
        self.actives[e.0].next_in_sel = self.sel_first;
        self.sel_first = Some(e);
    }

    fn pop_horz(&mut self) -> Option<ActiveId> {
        let e = self.sel_first?;
        self.sel_first = self.ae(e).next_in_sel;
        Some(e)
    }

    /// Consumes trailing collinear segments of a horizontal: 180-degree
    /// spikes always, plain collinear continuations only when collinear
    /// points aren't being preserved.
    fn trim_horz(&mut self, e: ActiveId, preserve_collinear: bool) {
        let mut trimmed = false;
        let mut pt = self.store.pt(self.next_vertex(e));
        while pt.y == self.ae(e).top.y {
            if preserve_collinear
                && (pt.x < self.ae(e).top.x) != (self.ae(e).bot.x < self.ae(e).top.x)
            {
                break;
            }
            let vt = self.next_vertex(e);
            self.actives[e.0].vertex_top = vt;
            self.actives[e.0].top = pt;
            trimmed = true;
            if self.is_maxima_edge(e) {
                break;
            }
            pt = self.store.pt(self.next_vertex(e));
        }
        if trimmed {
            self.set_dx(e);
        }
    }

    fn horz_is_spike(&self, e: ActiveId) -> bool {
        let a = self.ae(e);
        let next_pt = self.store.pt(self.next_vertex(e));
        (a.bot.x < a.top.x) != (a.top.x < next_pt.x)
    }

    fn reset_horz_direction(
        &self,
        horz: ActiveId,
        vertex_max: Option<VertexId>,
    ) -> (i64, i64, bool) {
        let h = self.ae(horz);
        if h.bot.x == h.top.x {
            // a no-width horizontal; infer direction from where the maxima
            // pair sits
            let x = h.cur_x;
            let mut e = h.next_in_ael;
            while let Some(id) = e {
                if vertex_max.is_some() && Some(self.ae(id).vertex_top) == vertex_max {
                    return (x, x, true);
                }
                e = self.ae(id).next_in_ael;
            }
            (x, x, false)
        } else if h.cur_x < h.top.x {
            (h.cur_x, h.top.x, true)
        } else {
            (h.top.x, h.cur_x, false)
        }
    }

    /// Processes one horizontal edge (or a chain of consecutive horizontals
    /// in the same bound), intersecting with every AEL edge inside its span
    /// and terminating at the maxima pair when the bound ends here.
    fn do_horizontal(&mut self, horz: ActiveId) {
        let horz_is_open = self.is_open(horz);
        let y = self.ae(horz).bot.y;

        let vertex_max: Option<VertexId> = if horz_is_open {
            self.get_curr_y_maxima_vertex_open(horz)
        } else {
            self.get_curr_y_maxima_vertex(horz)
        };

        if let Some(vm) = vertex_max {
            if !horz_is_open && vm != self.ae(horz).vertex_top {
                self.trim_horz(horz, self.preserve_collinear);
            }
        }

        let (mut left_x, mut right_x, mut l2r) = self.reset_horz_direction(horz, vertex_max);

        if self.is_hot(horz) {
            let cx = self.ae(horz).cur_x;
            let op = self.add_out_pt(horz, Point64::new(cx, y));
            self.add_to_horz_seg_list(op);
        }

        loop {
            let mut ae_opt = if l2r {
                self.ae(horz).next_in_ael
            } else {
                self.ae(horz).prev_in_ael
            };

            while let Some(e) = ae_opt {
                if vertex_max.is_some() && Some(self.ae(e).vertex_top) == vertex_max {
                    // reached the horizontal's maxima pair
                    if self.is_hot(horz) && self.is_joined(e) {
                        let t = self.ae(e).top;
                        self.split(e, t);
                    }
                    if self.is_hot(horz) {
                        while Some(self.ae(horz).vertex_top) != vertex_max {
                            let t = self.ae(horz).top;
                            self.add_out_pt(horz, t);
                            self.update_edge_into_ael(horz);
                        }
                        let t = self.ae(horz).top;
                        if l2r {
                            self.add_local_max_poly(horz, e, t);
                        } else {
                            self.add_local_max_poly(e, horz, t);
                        }
                    }
                    self.delete_from_ael(e);
                    self.delete_from_ael(horz);
                    return;
                }

                // unless this horizontal is itself ending at a maxima, stop
                // once `e` is past the end of its span
                if vertex_max != Some(self.ae(horz).vertex_top) || self.is_open_end_edge(horz) {
                    let e_cur_x = self.ae(e).cur_x;
                    if (l2r && e_cur_x > right_x) || (!l2r && e_cur_x < left_x) {
                        break;
                    }
                    if e_cur_x == self.ae(horz).top.x && !self.is_horizontal(e) {
                        let pt = self.store.pt(self.next_vertex(horz));
                        // open edges are kept in play a little longer to
                        // maximise their chance of joining a solution
                        if self.is_open(e) && !self.is_same_path_type(e, horz) && !self.is_hot(e)
                        {
                            if (l2r && self.top_x(e, pt.y) > pt.x)
                                || (!l2r && self.top_x(e, pt.y) < pt.x)
                            {
                                break;
                            }
                        } else if (l2r && self.top_x(e, pt.y) >= pt.x)
                            || (!l2r && self.top_x(e, pt.y) <= pt.x)
                        {
                            break;
                        }
                    }
                }

                let pt = Point64::new(self.ae(e).cur_x, y);
                if l2r {
                    self.intersect_edges(horz, e, pt);
                    self.swap_positions_in_ael(horz, e);
                    let cx = self.ae(e).cur_x;
                    self.actives[horz.0].cur_x = cx;
                    ae_opt = self.ae(horz).next_in_ael;
                } else {
                    self.intersect_edges(e, horz, pt);
                    self.swap_positions_in_ael(e, horz);
                    let cx = self.ae(e).cur_x;
                    self.actives[horz.0].cur_x = cx;
                    ae_opt = self.ae(horz).prev_in_ael;
                }
                if self.is_hot(horz) {
                    let op = self.get_last_op(horz);
                    self.add_to_horz_seg_list(op);
                }
            }

            // the span is exhausted; does the bound continue horizontally?
            if horz_is_open && self.is_open_end_edge(horz) {
                // open at the top
                if self.is_hot(horz) {
                    let t = self.ae(horz).top;
                    self.add_out_pt(horz, t);
                    let or = self.ae(horz).outrec.expect("hot edge");
                    if self.is_front(horz) {
                        self.outrecs[or.0].front_edge = None;
                    } else {
                        self.outrecs[or.0].back_edge = None;
                    }
                    self.actives[horz.0].outrec = None;
                }
                self.delete_from_ael(horz);
                return;
            } else if self.store.pt(self.next_vertex(horz)).y != self.ae(horz).top.y {
                break;
            }

            // another horizontal segment follows in the same bound
            if self.is_hot(horz) {
                let t = self.ae(horz).top;
                self.add_out_pt(horz, t);
            }
            self.update_edge_into_ael(horz);

            if self.preserve_collinear && !horz_is_open && self.horz_is_spike(horz) {
                self.trim_horz(horz, true);
            }

            let dir = self.reset_horz_direction(horz, vertex_max);
            left_x = dir.0;
            right_x = dir.1;
            l2r = dir.2;
        }

        // an intermediate horizontal: the bound carries on upward
        if self.is_hot(horz) {
            let t = self.ae(horz).top;
            let op = self.add_out_pt(horz, t);
            self.add_to_horz_seg_list(op);
        }
        self.update_edge_into_ael(horz);
    }

    fn get_last_op(&self, hot_edge: ActiveId) -> OutPtId {
        let or = self.ae(hot_edge).outrec.expect("hot edge");
        let pts = self.outrecs[or.0].pts.expect("seeded ring");
        if self.outrecs[or.0].front_edge == Some(hot_edge) {
            pts
        } else {
            self.outpts[pts.0].next
        }
    }

    // ------------------------------------------------------------------
    // horizontal joins

    fn add_to_horz_seg_list(&mut self, op: OutPtId) {
        if self.outrecs[self.outpts[op.0].outrec.0].is_open {
            return;
        }
        self.horz_segs.push(HorzSegment {
            left_op: op,
            right_op: None,
            left_to_right: true,
        });
    }

    /// Extends a recorded segment to the maximal run of same-`y` output
    /// points around it; discards zero-width or already claimed runs.
    fn update_horz_segment(&mut self, i: usize) -> bool {
        let op = self.horz_segs[i].left_op;
        let outrec = self
            .get_real_outrec(Some(self.outpts[op.0].outrec))
            .expect("op belongs to a live outrec");
        let outrec_has_edges = self.outrecs[outrec.0].front_edge.is_some();
        let curr_y = self.outpts[op.0].pt.y;
        let mut op_p = op;
        let mut op_n = op;
        if outrec_has_edges {
            let op_a = self.outrecs[outrec.0].pts.expect("live ring");
            let op_z = self.outpts[op_a.0].next;
            while op_p != op_z && self.outpts[self.outpts[op_p.0].prev.0].pt.y == curr_y {
                op_p = self.outpts[op_p.0].prev;
            }
            while op_n != op_a && self.outpts[self.outpts[op_n.0].next.0].pt.y == curr_y {
                op_n = self.outpts[op_n.0].next;
            }
        } else {
            while self.outpts[op_p.0].prev != op_n
                && self.outpts[self.outpts[op_p.0].prev.0].pt.y == curr_y
            {
                op_p = self.outpts[op_p.0].prev;
            }
            while self.outpts[op_n.0].next != op_p
                && self.outpts[self.outpts[op_n.0].next.0].pt.y == curr_y
            {
                op_n = self.outpts[op_n.0].next;
            }
        }

        let p_pt = self.outpts[op_p.0].pt;
        let n_pt = self.outpts[op_n.0].pt;
        let result = if p_pt.x == n_pt.x {
            false
        } else {
            if p_pt.x < n_pt.x {
                self.horz_segs[i].left_op = op_p;
                self.horz_segs[i].right_op = Some(op_n);
                self.horz_segs[i].left_to_right = true;
            } else {
                self.horz_segs[i].left_op = op_n;
                self.horz_segs[i].right_op = Some(op_p);
                self.horz_segs[i].left_to_right = false;
            }
            !self.outpts[self.horz_segs[i].left_op.0].horz_marked
        };
        if result {
            let lo = self.horz_segs[i].left_op;
            self.outpts[lo.0].horz_marked = true;
        } else {
            self.horz_segs[i].right_op = None;
        }
        result
    }

    fn duplicate_op(&mut self, op: OutPtId, insert_after: bool) -> OutPtId {
        let pt = self.outpts[op.0].pt;
        let outrec = self.outpts[op.0].outrec;
        let result = self.new_out_pt(pt, outrec);
        if insert_after {
            let next = self.outpts[op.0].next;
            self.outpts[result.0].next = next;
            self.outpts[next.0].prev = result;
            self.outpts[result.0].prev = op;
            self.outpts[op.0].next = result;
        } else {
            let prev = self.outpts[op.0].prev;
            self.outpts[result.0].prev = prev;
            self.outpts[prev.0].next = result;
            self.outpts[result.0].next = op;
            self.outpts[op.0].prev = result;
        }
        result
    }

    /// Pairs overlapping opposite-direction horizontal runs recorded at this
    /// `y`, registering a pending join for each pair.
    fn convert_horz_segs_to_joins(&mut self) {
        let mut k = 0;
        for i in 0..self.horz_segs.len() {
            if self.update_horz_segment(i) {
                k += 1;
            }
        }
        if k < 2 {
            return;
        }
        // valid segments first, ordered by left x
        let outpts = &self.outpts;
        self.horz_segs.sort_by(|a, b| match (a.right_op, b.right_op) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(_), Some(_)) => outpts[a.left_op.0].pt.x.cmp(&outpts[b.left_op.0].pt.x),
        });

        for i in 0..k - 1 {
            for j in i + 1..k {
                let hs1 = self.horz_segs[i];
                let hs2 = self.horz_segs[j];
                let hs1_right = hs1.right_op.expect("valid segment");
                let hs2_right = hs2.right_op.expect("valid segment");
                if self.outpts[hs2.left_op.0].pt.x >= self.outpts[hs1_right.0].pt.x {
                    break; // sorted by left x, so nothing later overlaps either
                }
                if hs2.left_to_right == hs1.left_to_right
                    || self.outpts[hs2_right.0].pt.x <= self.outpts[hs1.left_op.0].pt.x
                {
                    continue;
                }
                let curr_y = self.outpts[hs1.left_op.0].pt.y;
                let mut h1_left = hs1.left_op;
                let mut h2_left = hs2.left_op;
                if hs1.left_to_right {
                    loop {
                        let nx = self.outpts[h1_left.0].next;
                        if self.outpts[nx.0].pt.y != curr_y
                            || self.outpts[nx.0].pt.x > self.outpts[h2_left.0].pt.x
                        {
                            break;
                        }
                        h1_left = nx;
                    }
                    loop {
                        let pv = self.outpts[h2_left.0].prev;
                        if self.outpts[pv.0].pt.y != curr_y
                            || self.outpts[pv.0].pt.x > self.outpts[h1_left.0].pt.x
                        {
                            break;
                        }
                        h2_left = pv;
                    }
                    let op1 = self.duplicate_op(h1_left, true);
                    let op2 = self.duplicate_op(h2_left, false);
                    self.horz_joins.push(HorzJoin { op1, op2 });
                } else {
                    loop {
                        let pv = self.outpts[h1_left.0].prev;
                        if self.outpts[pv.0].pt.y != curr_y
                            || self.outpts[pv.0].pt.x > self.outpts[h2_left.0].pt.x
                        {
                            break;
                        }
                        h1_left = pv;
                    }
                    loop {
                        let nx = self.outpts[h2_left.0].next;
                        if self.outpts[nx.0].pt.y != curr_y
                            || self.outpts[nx.0].pt.x > self.outpts[h1_left.0].pt.x
                        {
                            break;
                        }
                        h2_left = nx;
                    }
                    let op1 = self.duplicate_op(h2_left, true);
                    let op2 = self.duplicate_op(h1_left, false);
                    self.horz_joins.push(HorzJoin { op1, op2 });
                }
                self.horz_segs[i].left_op = h1_left;
                self.horz_segs[j].left_op = h2_left;
            }
        }
    }

    pub(crate) fn move_splits(&mut self, from: OutRecId, to: OutRecId) {
        let splits = std::mem::take(&mut self.outrecs[from.0].splits);
        self.outrecs[to.0].splits.extend(splits);
    }

    /// Applies the pending horizontal joins collected over the whole sweep.
    /// A join within one OutRec splits it in two; across two OutRecs, one
    /// absorbs the other.
    fn process_horz_joins(&mut self) {
        for idx in 0..self.horz_joins.len() {
            let j = self.horz_joins[idx];
            let or1 = self
                .get_real_outrec(Some(self.outpts[j.op1.0].outrec))
                .expect("join op in live outrec");
            let or2 = self
                .get_real_outrec(Some(self.outpts[j.op2.0].outrec))
                .expect("join op in live outrec");

            let op1b = self.outpts[j.op1.0].next;
            let op2b = self.outpts[j.op2.0].prev;
            self.outpts[j.op1.0].next = j.op2;
            self.outpts[j.op2.0].prev = j.op1;
            self.outpts[op1b.0].prev = op2b;
            self.outpts[op2b.0].next = op1b;

            if or1 == or2 {
                // the "join" split one ring into two
                let new_or = self.new_outrec();
                self.outrecs[new_or.0].pts = Some(op1b);
                self.fix_outrec_pts(new_or);

                if self.outpts[self.outrecs[or1.0].pts.expect("live ring").0].outrec == new_or {
                    self.outrecs[or1.0].pts = Some(j.op1);
                    self.outpts[j.op1.0].outrec = or1;
                }

                if self.using_polytree {
                    let p1 = self.outrecs[or1.0].pts.expect("live ring");
                    let p2 = self.outrecs[new_or.0].pts.expect("live ring");
                    if self.path1_inside_path2(p1, p2) {
                        self.outrecs[new_or.0].pts = Some(p1);
                        self.outrecs[or1.0].pts = Some(p2);
                        self.fix_outrec_pts(or1);
                        self.fix_outrec_pts(new_or);
                        self.outrecs[new_or.0].owner = Some(or1);
                    } else if self.path1_inside_path2(p2, p1) {
                        self.outrecs[new_or.0].owner = Some(or1);
                    } else {
                        let o = self.outrecs[or1.0].owner;
                        self.outrecs[new_or.0].owner = o;
                    }
                    self.outrecs[or1.0].splits.push(new_or);
                } else {
                    self.outrecs[new_or.0].owner = Some(or1);
                }
            } else {
                self.outrecs[or2.0].pts = None;
                if self.using_polytree {
                    self.set_owner(or2, or1);
                    self.move_splits(or2, or1);
                } else {
                    self.outrecs[or2.0].owner = Some(or1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::area;

    fn p(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    fn square(x: i64, y: i64, size: i64) -> Path64 {
        vec![p(x, y), p(x + size, y), p(x + size, y + size), p(x, y + size)]
    }

    fn total_area(paths: &Paths64) -> f64 {
        paths.iter().map(|p| area(p)).sum()
    }

    #[test]
    fn overlapping_squares_intersection() {
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 10)]);
        c.add_clip(&vec![square(5, 5, 10)]);
        let sol = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        assert_eq!(sol.closed.len(), 1);
        assert_eq!(total_area(&sol.closed), 25.0);
        assert!(sol.open.is_empty());
        let mut pts = sol.closed[0].clone();
        pts.sort();
        assert_eq!(pts, vec![p(5, 5), p(5, 10), p(10, 5), p(10, 10)]);
    }

    #[test]
    fn disjoint_squares_intersection_is_empty() {
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 10)]);
        c.add_clip(&vec![square(20, 20, 5)]);
        let sol = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        assert!(sol.closed.is_empty());
    }

    #[test]
    fn union_of_overlapping_squares() {
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 10)]);
        c.add_clip(&vec![square(5, 5, 10)]);
        let sol = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(sol.closed.len(), 1);
        assert_eq!(total_area(&sol.closed), 175.0);
    }

    #[test]
    fn difference_leaves_an_l_shape() {
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 10)]);
        c.add_clip(&vec![square(5, 5, 10)]);
        let sol = c.execute(ClipType::Difference, FillRule::NonZero).unwrap();
        assert_eq!(total_area(&sol.closed), 75.0);
    }

    #[test]
    fn execute_twice_reuses_inputs() {
        let mut c = Clipper64::new();
        c.add_subject(&vec![square(0, 0, 10)]);
        c.add_clip(&vec![square(5, 5, 10)]);
        let a = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        let b = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        assert_eq!(total_area(&a.closed), total_area(&b.closed));
    }

    #[test]
    fn fill_rules_agree_except_negative_for_ccw_input() {
        // both inputs wound counter-clockwise (positive winding)
        for (rule, expected) in [
            (FillRule::EvenOdd, 25.0),
            (FillRule::NonZero, 25.0),
            (FillRule::Positive, 25.0),
            (FillRule::Negative, 0.0),
        ] {
            let mut c = Clipper64::new();
            c.add_subject(&vec![square(0, 0, 10)]);
            c.add_clip(&vec![square(5, 5, 10)]);
            let sol = c.execute(ClipType::Intersection, rule).unwrap();
            assert_eq!(total_area(&sol.closed), expected, "{rule:?}");
        }
    }

    #[test]
    fn bounds_sharing_a_bottom_vertex_insert_in_order() {
        // two triangles meet at (10, 10), so four bounds start from the same
        // scanbeam and must be ordered by slope
        let mut c = Clipper64::new();
        c.add_subject(&vec![
            vec![p(0, 10), p(5, 0), p(10, 10)],
            vec![p(10, 10), p(15, 0), p(20, 10)],
        ]);
        let sol = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(total_area(&sol.closed), 100.0);
    }

    #[test]
    fn flat_ingestion_tolerates_out_of_range_offsets() {
        let mut c = Clipper64::new();
        let pts = [p(0, 0), p(10, 0), p(10, 10), p(0, 10)];
        // offsets past the buffer yield empty sub-paths, not a panic
        c.add_flat(&pts, &[0, 99], PathType::Subject, false);
        let sol = c.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(total_area(&sol.closed), 100.0);
    }

    #[test]
    fn coincident_bounds_order_by_their_alternate_bounds() {
        // three triangles all sharing the bound (5,10)->(0,0); each ring's
        // other bound leaves (5,10) on the same side, so only the turn of
        // the alternate bounds can decide the order
        let mut c = Clipper64::new();
        c.store.add_path(&[p(5, 10), p(0, 0), p(9, 2)], PathType::Subject, false);
        c.store.add_path(&[p(5, 10), p(0, 0), p(12, 4)], PathType::Subject, false);
        c.store.add_path(&[p(5, 10), p(0, 0), p(6, 0)], PathType::Subject, false);

        let bound = |lm_vertex: usize, top: usize| Active {
            bot: p(5, 10),
            top: p(0, 0),
            cur_x: 5,
            dx: Clipper64::get_dx(p(5, 10), p(0, 0)),
            wind_dx: 1,
            wind_count: 0,
            wind_count2: 0,
            outrec: None,
            prev_in_ael: None,
            next_in_ael: None,
            prev_in_sel: None,
            next_in_sel: None,
            jump: None,
            vertex_top: VertexId(top),
            local_min: LocalMinima {
                vertex: VertexId(lm_vertex),
                path_type: PathType::Subject,
                is_open: false,
            },
            is_left_bound: true,
            join_with: JoinWith::Nothing,
        };
        let resident = c.new_active(bound(0, 1));
        // alternate bound toward (12,4) turns to the far side of the
        // resident's alternate, so this newcomer sorts to the left
        let left_newcomer = c.new_active(bound(3, 4));
        assert!(!c.is_valid_ael_order(resident, left_newcomer));
        // toward (6,0) it turns to the near side, sorting to the right
        let right_newcomer = c.new_active(bound(6, 7));
        assert!(c.is_valid_ael_order(resident, right_newcomer));
    }

    #[test]
    fn open_path_clipped_to_clip_region() {
        let mut c = Clipper64::new();
        c.add_open_subject(&vec![vec![p(-5, 5), p(15, 5)]]);
        c.add_clip(&vec![square(0, 0, 10)]);
        let sol = c.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
        assert!(sol.closed.is_empty());
        assert_eq!(sol.open.len(), 1);
        let mut seg = sol.open[0].clone();
        seg.sort();
        assert_eq!(seg, vec![p(0, 5), p(10, 5)]);
    }
}
