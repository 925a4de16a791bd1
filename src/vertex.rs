//! Input vertex storage.
//!
//! Each sub-path becomes a doubly linked ring of vertices in one growable
//! arena, built once per clip run and immutable afterwards. While linking we
//! classify every ascending/descending transition, which yields the local
//! minima the sweep starts bounds from.

use serde::{Deserialize, Serialize};

use crate::geom::{Point64, MAX_COORD};

/// Index into the vertex arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub usize);

impl std::fmt::Debug for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v_{}", self.0)
    }
}

/// Whether a path belongs to the subject or the clip set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathType {
    Subject,
    Clip,
}

/// Bit-set of per-vertex roles. A vertex can be both a local minimum and a
/// local maximum (an open-path apex).
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexFlags(u8);

impl VertexFlags {
    pub const NONE: VertexFlags = VertexFlags(0);
    pub const OPEN_START: VertexFlags = VertexFlags(1);
    pub const OPEN_END: VertexFlags = VertexFlags(2);
    pub const LOCAL_MAX: VertexFlags = VertexFlags(4);
    pub const LOCAL_MIN: VertexFlags = VertexFlags(8);

    pub fn contains(self, other: VertexFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: VertexFlags) {
        self.0 |= other.0;
    }
}

impl std::fmt::Debug for VertexFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::OPEN_START) {
            names.push("OpenStart");
        }
        if self.contains(Self::OPEN_END) {
            names.push("OpenEnd");
        }
        if self.contains(Self::LOCAL_MAX) {
            names.push("LocalMax");
        }
        if self.contains(Self::LOCAL_MIN) {
            names.push("LocalMin");
        }
        if names.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub pt: Point64,
    pub flags: VertexFlags,
    pub prev: VertexId,
    pub next: VertexId,
}

/// A sweep start event: the bottom vertex of a pair of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalMinima {
    pub vertex: VertexId,
    pub path_type: PathType,
    pub is_open: bool,
}

/// Arena of input vertices plus the local-minima list derived from them.
#[derive(Clone, Debug, Default)]
pub struct VertexStore {
    pub verts: Vec<Vertex>,
    pub minima: Vec<LocalMinima>,
    minima_sorted: bool,
    pub has_open_paths: bool,
}

impl VertexStore {
    pub fn clear(&mut self) {
        self.verts.clear();
        self.minima.clear();
        self.minima_sorted = false;
        self.has_open_paths = false;
    }

    pub fn pt(&self, id: VertexId) -> Point64 {
        self.verts[id.0].pt
    }

    pub fn next(&self, id: VertexId) -> VertexId {
        self.verts[id.0].next
    }

    pub fn prev(&self, id: VertexId) -> VertexId {
        self.verts[id.0].prev
    }

    pub fn flags(&self, id: VertexId) -> VertexFlags {
        self.verts[id.0].flags
    }

    pub fn is_maxima(&self, id: VertexId) -> bool {
        self.flags(id).contains(VertexFlags::LOCAL_MAX)
    }

    pub fn is_open_end(&self, id: VertexId) -> bool {
        self.flags(id)
            .contains(VertexFlags(VertexFlags::OPEN_START.0 | VertexFlags::OPEN_END.0))
    }

    fn add_loc_min(&mut self, id: VertexId, path_type: PathType, is_open: bool) {
        // a vertex is registered as a minimum at most once
        if self.flags(id).contains(VertexFlags::LOCAL_MIN) {
            return;
        }
        self.verts[id.0].flags.insert(VertexFlags::LOCAL_MIN);
        self.minima.push(LocalMinima {
            vertex: id,
            path_type,
            is_open,
        });
        self.minima_sorted = false;
    }

    /// Appends one sub-path to the arena, linking its ring and registering
    /// local minima. Consecutive duplicate points are skipped, as is a closing
    /// point that repeats the start of a closed path. A closed path that is
    /// flat in `y` produces no minima and is dropped as degenerate.
    /// Coordinates outside `-MAX_COORD..=MAX_COORD` are clamped onto that
    /// range, which keeps later edge arithmetic free of overflow.
    pub fn add_path(&mut self, path: &[Point64], path_type: PathType, is_open: bool) {
        if is_open {
            self.has_open_paths = true;
        }

        let v0 = VertexId(self.verts.len());
        let mut prev: Option<VertexId> = None;
        for &pt in path {
            let pt = Point64::new(
                pt.x.clamp(-MAX_COORD, MAX_COORD),
                pt.y.clamp(-MAX_COORD, MAX_COORD),
            );
            match prev {
                None => {
                    self.verts.push(Vertex {
                        pt,
                        flags: VertexFlags::NONE,
                        prev: v0,
                        next: v0,
                    });
                    prev = Some(v0);
                }
                Some(pv) if self.pt(pv) != pt => {
                    let id = VertexId(self.verts.len());
                    self.verts.push(Vertex {
                        pt,
                        flags: VertexFlags::NONE,
                        prev: pv,
                        next: v0,
                    });
                    self.verts[pv.0].next = id;
                    prev = Some(id);
                }
                Some(_) => {}
            }
        }
        let Some(mut last) = prev else { return };
        if last == v0 {
            // a single distinct point can't form an edge
            self.verts.truncate(v0.0);
            return;
        }
        if !is_open && self.pt(last) == self.pt(v0) {
            let drop = last;
            last = self.prev(last);
            debug_assert_eq!(drop.0, self.verts.len() - 1);
            self.verts.truncate(drop.0);
            if last == v0 {
                self.verts.truncate(v0.0);
                return;
            }
        }
        self.verts[last.0].next = v0;
        self.verts[v0.0].prev = last;

        // Establish the sweep direction at v0. "Going up" here means heading
        // toward smaller y, i.e. toward where the sweep will finish.
        let going_up0;
        if is_open {
            let mut v = self.next(v0);
            while v != v0 && self.pt(v).y == self.pt(v0).y {
                v = self.next(v);
            }
            going_up0 = self.pt(v).y <= self.pt(v0).y;
            self.verts[v0.0].flags.insert(VertexFlags::OPEN_START);
            if going_up0 {
                self.add_loc_min(v0, path_type, true);
            } else {
                self.verts[v0.0].flags.insert(VertexFlags::LOCAL_MAX);
            }
        } else {
            let mut pv = self.prev(v0);
            while pv != v0 && self.pt(pv).y == self.pt(v0).y {
                pv = self.prev(pv);
            }
            if pv == v0 {
                // closed path entirely flat in y: degenerate
                return;
            }
            going_up0 = self.pt(pv).y > self.pt(v0).y;
        }

        let mut going_up = going_up0;
        let mut pv = v0;
        let mut v = self.next(v0);
        while v != v0 {
            if self.pt(v).y > self.pt(pv).y && going_up {
                self.verts[pv.0].flags.insert(VertexFlags::LOCAL_MAX);
                going_up = false;
            } else if self.pt(v).y < self.pt(pv).y && !going_up {
                going_up = true;
                self.add_loc_min(pv, path_type, is_open);
            }
            pv = v;
            v = self.next(v);
        }

        if is_open {
            self.verts[pv.0].flags.insert(VertexFlags::OPEN_END);
            if going_up {
                self.verts[pv.0].flags.insert(VertexFlags::LOCAL_MAX);
            } else {
                self.add_loc_min(pv, path_type, true);
            }
        } else if going_up != going_up0 {
            if going_up0 {
                self.add_loc_min(pv, path_type, false);
            } else {
                self.verts[pv.0].flags.insert(VertexFlags::LOCAL_MAX);
            }
        }
    }

    /// Sorts minima bottom-up (descending y) so the driver can consume them
    /// sequentially as the sweep advances.
    pub fn sort_minima(&mut self) {
        if !self.minima_sorted {
            let verts = &self.verts;
            self.minima
                .sort_by_key(|lm| std::cmp::Reverse(verts[lm.vertex.0].pt.y));
            self.minima_sorted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point64;

    fn p(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    fn flags_summary(store: &VertexStore) -> String {
        store
            .verts
            .iter()
            .map(|v| format!("{:?}@{:?}", v.flags, v.pt))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn square_has_one_min_one_max() {
        let mut store = VertexStore::default();
        store.add_path(
            &[p(0, 0), p(10, 0), p(10, 10), p(0, 10)],
            PathType::Subject,
            false,
        );
        assert_eq!(store.minima.len(), 1);
        // the minima vertex sits at the bottom edge (largest y)
        let lm = store.minima[0];
        assert_eq!(store.pt(lm.vertex).y, 10);
        insta::assert_snapshot!(
            flags_summary(&store),
            @"-@(0, 0) LocalMax@(10, 0) -@(10, 10) LocalMin@(0, 10)"
        );
    }

    #[test]
    fn duplicate_and_closing_points_are_trimmed() {
        let mut store = VertexStore::default();
        store.add_path(
            &[p(0, 0), p(0, 0), p(10, 0), p(10, 10), p(10, 10), p(0, 10), p(0, 0)],
            PathType::Subject,
            false,
        );
        assert_eq!(store.verts.len(), 4);
        assert_eq!(store.minima.len(), 1);
    }

    #[test]
    fn flat_closed_path_is_rejected() {
        let mut store = VertexStore::default();
        store.add_path(&[p(0, 5), p(10, 5), p(20, 5)], PathType::Subject, false);
        assert!(store.minima.is_empty());
    }

    #[test]
    fn zigzag_registers_every_valley() {
        // three descents, three ascents: minima at both inner valleys and at
        // the ring's bottom vertex
        let mut store = VertexStore::default();
        store.add_path(
            &[p(0, 0), p(10, 20), p(20, 5), p(30, 20), p(40, 0), p(20, 40)],
            PathType::Subject,
            false,
        );
        assert_eq!(store.minima.len(), 3);
        let mut ys: Vec<i64> = store.minima.iter().map(|lm| store.pt(lm.vertex).y).collect();
        ys.sort();
        assert_eq!(ys, vec![20, 20, 40]);
    }

    #[test]
    fn open_path_endpoint_flags() {
        let mut store = VertexStore::default();
        // first motion heads toward larger y, so the start is a local max
        store.add_path(&[p(0, 0), p(5, 10), p(10, 0)], PathType::Subject, true);
        assert!(store.flags(VertexId(0)).contains(VertexFlags::OPEN_START));
        assert!(store.flags(VertexId(0)).contains(VertexFlags::LOCAL_MAX));
        assert!(store.flags(VertexId(2)).contains(VertexFlags::OPEN_END));
        // the valley vertex is the one local minimum
        assert_eq!(store.minima.len(), 1);
        assert_eq!(store.pt(store.minima[0].vertex), p(5, 10));
    }

    #[test]
    fn open_path_start_can_seed_minimum() {
        let mut store = VertexStore::default();
        // first motion heads toward smaller y: start doubles as the minimum
        store.add_path(&[p(0, 10), p(5, 0)], PathType::Subject, true);
        assert_eq!(store.minima.len(), 1);
        assert_eq!(store.minima[0].vertex, VertexId(0));
        assert!(store.minima[0].is_open);
    }

    #[test]
    fn out_of_range_coordinates_clamp_onto_the_grid() {
        let mut store = VertexStore::default();
        store.add_path(
            &[p(0, 0), p(i64::MAX, 0), p(i64::MAX, 10), p(0, 10)],
            PathType::Subject,
            false,
        );
        assert_eq!(store.verts.len(), 4);
        assert!(store.verts.iter().all(|v| v.pt.x <= MAX_COORD && v.pt.y <= MAX_COORD));
        assert_eq!(store.pt(VertexId(1)), p(MAX_COORD, 0));
    }

    #[test]
    fn minima_sort_is_bottom_up() {
        let mut store = VertexStore::default();
        store.add_path(&[p(0, 0), p(10, 0), p(5, 8)], PathType::Subject, false);
        store.add_path(&[p(0, 20), p(10, 20), p(5, 30)], PathType::Clip, false);
        store.sort_minima();
        let ys: Vec<i64> = store.minima.iter().map(|lm| store.pt(lm.vertex).y).collect();
        assert_eq!(ys, vec![30, 8]);
    }
}
