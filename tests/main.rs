use proptest::prelude::*;

use polyclip::{
    area, difference, intersect, union, xor, ClipType, Clipper64, ClipperD, FillRule, Path64,
    PathD, PathType, Paths64, Point64, PointD,
};

fn p(x: i64, y: i64) -> Point64 {
    Point64::new(x, y)
}

fn rect(left: i64, top: i64, width: i64, height: i64) -> Path64 {
    vec![
        p(left, top),
        p(left + width, top),
        p(left + width, top + height),
        p(left, top + height),
    ]
}

fn signed_area(paths: &Paths64) -> f64 {
    paths.iter().map(|path| area(path)).sum()
}

#[test]
fn intersection_of_overlapping_rects() {
    let solution = intersect(
        &vec![rect(0, 0, 10, 10)],
        &vec![rect(5, 5, 10, 10)],
        FillRule::NonZero,
    )
    .unwrap();
    assert_eq!(solution.len(), 1);
    let mut pts = solution[0].clone();
    pts.sort();
    insta::assert_snapshot!(format!("{pts:?}"), @"[(5, 5), (5, 10), (10, 5), (10, 10)]");
}

#[test]
fn operations_partition_the_plane() {
    let subj = vec![rect(0, 0, 10, 10)];
    let clip = vec![rect(5, 5, 10, 10)];
    let inter = signed_area(&intersect(&subj, &clip, FillRule::NonZero).unwrap());
    let uni = signed_area(&union(&subj, &clip, FillRule::NonZero).unwrap());
    let diff = signed_area(&difference(&subj, &clip, FillRule::NonZero).unwrap());
    let sym = signed_area(&xor(&subj, &clip, FillRule::NonZero).unwrap());
    assert_eq!(inter, 25.0);
    assert_eq!(uni, 175.0);
    assert_eq!(diff, 75.0);
    assert_eq!(sym, 150.0);
    assert_eq!(uni, sym + inter);
    assert_eq!(uni, diff + 100.0); // diff + clip area
}

#[test]
fn empty_inputs_yield_empty_output() {
    let solution = intersect(&vec![], &vec![rect(0, 0, 5, 5)], FillRule::NonZero).unwrap();
    assert!(solution.is_empty());
    let solution = union(&vec![], &vec![], FillRule::EvenOdd).unwrap();
    assert!(solution.is_empty());
}

#[test]
fn degenerate_paths_are_ignored() {
    let mut clipper = Clipper64::new();
    clipper.add_path(&[], PathType::Subject, false);
    clipper.add_path(&[p(1, 1)], PathType::Subject, false);
    clipper.add_path(&[p(1, 1), p(2, 2)], PathType::Subject, false);
    // a flat "polygon" with no interior
    clipper.add_path(&[p(0, 0), p(5, 0), p(9, 0)], PathType::Subject, false);
    let solution = clipper.execute(ClipType::Union, FillRule::NonZero).unwrap();
    assert!(solution.closed.is_empty());
    assert!(solution.open.is_empty());
}

#[test]
fn even_odd_turns_double_cover_into_a_hole() {
    let subj = vec![rect(0, 0, 10, 10), rect(5, 5, 10, 10)];
    let eo = union(&subj, &vec![], FillRule::EvenOdd).unwrap();
    assert_eq!(eo.len(), 2);
    assert_eq!(signed_area(&eo), 150.0); // 175 outline minus a 25 hole
    let nz = union(&subj, &vec![], FillRule::NonZero).unwrap();
    assert_eq!(nz.len(), 1);
    assert_eq!(signed_area(&nz), 175.0);
}

#[test]
fn positive_and_negative_rules_see_opposite_orientations() {
    // wound clockwise, so its signed area is negative
    let cw = vec![vec![p(0, 0), p(0, 10), p(10, 10), p(10, 0)]];
    let pos = union(&cw, &vec![], FillRule::Positive).unwrap();
    assert!(pos.is_empty());
    let neg = union(&cw, &vec![], FillRule::Negative).unwrap();
    assert_eq!(neg.len(), 1);
    assert_eq!(signed_area(&neg).abs(), 100.0);
}

#[test]
fn nonzero_ignores_double_winding() {
    // the same square traced twice over
    let doubled = vec![vec![
        p(0, 0),
        p(10, 0),
        p(10, 10),
        p(0, 10),
        p(0, 0),
        p(10, 0),
        p(10, 10),
        p(0, 10),
    ]];
    let nz = union(&doubled, &vec![], FillRule::NonZero).unwrap();
    assert_eq!(signed_area(&nz), 100.0);
    let eo = union(&doubled, &vec![], FillRule::EvenOdd).unwrap();
    assert_eq!(signed_area(&eo), 0.0);
}

#[test]
fn touching_rects_union_into_one() {
    let solution = union(
        &vec![rect(0, 0, 10, 10)],
        &vec![rect(10, 0, 10, 10)],
        FillRule::NonZero,
    )
    .unwrap();
    assert_eq!(solution.len(), 1);
    assert_eq!(signed_area(&solution), 200.0);
}

#[test]
fn open_path_is_trimmed_to_the_clip() {
    let mut clipper = Clipper64::new();
    clipper.add_open_subject(&vec![vec![p(-10, 3), p(30, 3)]]);
    clipper.add_clip(&vec![rect(0, 0, 10, 10), rect(20, 0, 10, 10)]);
    let solution = clipper
        .execute(ClipType::Intersection, FillRule::NonZero)
        .unwrap();
    assert!(solution.closed.is_empty());
    assert_eq!(solution.open.len(), 2);
    let mut total = 0;
    for seg in &solution.open {
        assert_eq!(seg.len(), 2);
        total += (seg[1].x - seg[0].x).abs();
    }
    assert_eq!(total, 20);
}

#[test]
fn open_path_difference_keeps_the_outside() {
    let mut clipper = Clipper64::new();
    clipper.add_open_subject(&vec![vec![p(-10, 5), p(20, 5)]]);
    clipper.add_clip(&vec![rect(0, 0, 10, 10)]);
    let solution = clipper
        .execute(ClipType::Difference, FillRule::NonZero)
        .unwrap();
    assert_eq!(solution.open.len(), 2);
}

#[test]
fn open_path_vertical_segment_survives() {
    let mut clipper = Clipper64::new();
    clipper.add_open_subject(&vec![vec![p(5, -5), p(5, 15)]]);
    clipper.add_clip(&vec![rect(0, 0, 10, 10)]);
    let solution = clipper
        .execute(ClipType::Intersection, FillRule::NonZero)
        .unwrap();
    assert_eq!(solution.open.len(), 1);
    let mut seg = solution.open[0].clone();
    seg.sort();
    assert_eq!(seg, vec![p(5, 0), p(5, 10)]);
}

#[test]
fn polytree_reports_hole_nesting() {
    let mut clipper = Clipper64::new();
    clipper.add_subject(&vec![
        rect(0, 0, 40, 40),
        rect(5, 5, 30, 30),
        rect(10, 10, 20, 20),
        rect(15, 15, 10, 10),
    ]);
    let (tree, open) = clipper
        .execute_tree(ClipType::Union, FillRule::EvenOdd)
        .unwrap();
    assert!(open.is_empty());
    assert_eq!(tree.len(), 4);

    let outer = tree.children(tree.root())[0];
    let hole = tree.children(outer)[0];
    let island = tree.children(hole)[0];
    let inner_hole = tree.children(island)[0];
    assert!(!tree.is_hole(outer));
    assert!(tree.is_hole(hole));
    assert!(!tree.is_hole(island));
    assert!(tree.is_hole(inner_hole));
    assert_eq!(tree.level(inner_hole), 4);
    assert_eq!(tree.parent(hole), Some(outer));
}

#[test]
fn polytree_keeps_separate_outers_apart() {
    let mut clipper = Clipper64::new();
    clipper.add_subject(&vec![rect(0, 0, 10, 10), rect(100, 0, 10, 10)]);
    let (tree, _) = clipper
        .execute_tree(ClipType::Union, FillRule::NonZero)
        .unwrap();
    assert_eq!(tree.children(tree.root()).len(), 2);
    for &outer in tree.children(tree.root()) {
        assert!(tree.children(outer).is_empty());
    }
}

fn path_d_area(path: &[PointD]) -> f64 {
    let mut sum = 0.0;
    for i in 0..path.len() {
        let a = path[i];
        let b = path[(i + 1) % path.len()];
        sum += (a.y + b.y) * (a.x - b.x);
    }
    sum * 0.5
}

#[test]
fn clipper_d_scales_and_restores() {
    let mut clipper = ClipperD::new(2).unwrap();
    clipper.add_subject(&vec![vec![
        PointD::new(0.0, 0.0),
        PointD::new(1.0, 0.0),
        PointD::new(1.0, 1.0),
        PointD::new(0.0, 1.0),
    ]]);
    clipper.add_clip(&vec![vec![
        PointD::new(0.25, 0.25),
        PointD::new(1.25, 0.25),
        PointD::new(1.25, 1.25),
        PointD::new(0.25, 1.25),
    ]]);
    let solution = clipper
        .execute(ClipType::Intersection, FillRule::NonZero)
        .unwrap();
    assert_eq!(solution.closed.len(), 1);
    assert!((path_d_area(&solution.closed[0]).abs() - 0.5625).abs() < 1e-9);
}

#[test]
fn clipper_d_rejects_out_of_range_precision() {
    assert!(ClipperD::new(9).is_err());
    assert!(ClipperD::new(-42).is_err());
}

#[test]
fn preserve_collinear_is_respected_end_to_end() {
    let path: PathD = vec![
        PointD::new(0.0, 0.0),
        PointD::new(0.5, 0.0),
        PointD::new(1.0, 0.0),
        PointD::new(1.0, 1.0),
        PointD::new(0.0, 1.0),
    ];
    let mut keep = ClipperD::new(2).unwrap();
    keep.add_subject(&vec![path.clone()]);
    let kept = keep.execute(ClipType::Union, FillRule::NonZero).unwrap();
    assert_eq!(kept.closed[0].len(), 5);

    let mut trim = ClipperD::new(2).unwrap();
    trim.preserve_collinear(false);
    trim.add_subject(&vec![path]);
    let trimmed = trim.execute(ClipType::Union, FillRule::NonZero).unwrap();
    assert_eq!(trimmed.closed[0].len(), 4);
}

#[test]
fn self_intersecting_bowtie_splits_under_even_odd() {
    // figure-eight: crosses itself at (10, 10)
    let bowtie = vec![vec![p(0, 0), p(20, 20), p(20, 0), p(0, 20)]];
    let solution = union(&bowtie, &vec![], FillRule::EvenOdd).unwrap();
    assert_eq!(solution.len(), 2);
    let total: f64 = solution.iter().map(|path| area(path).abs()).sum();
    assert_eq!(total, 200.0);
}

#[test]
fn sliver_triangle_collapses_to_nothing() {
    // every corner sits within a couple of grid units of another; too
    // narrow to be meaningful output
    let sliver = vec![vec![p(0, 0), p(1, 0), p(0, 1)]];
    assert!(union(&sliver, &vec![], FillRule::NonZero).unwrap().is_empty());
    // the same shape with well-separated corners survives
    let tri = vec![vec![p(0, 0), p(10, 0), p(0, 10)]];
    let solution = union(&tri, &vec![], FillRule::NonZero).unwrap();
    assert_eq!(solution.len(), 1);
    assert_eq!(signed_area(&solution).abs(), 50.0);
}

#[test]
fn precision_round_trip_at_two_scales() {
    // the same f64 clip lands on the same answer at both precisions, to
    // within one rounding unit of the coarser grid
    for precision in [2, 5] {
        let mut clipper = ClipperD::new(precision).unwrap();
        clipper.add_subject(&vec![vec![
            PointD::new(0.0, 0.0),
            PointD::new(1.0, 0.0),
            PointD::new(1.0, 1.0),
            PointD::new(0.0, 1.0),
        ]]);
        clipper.add_clip(&vec![vec![
            PointD::new(0.5, 0.5),
            PointD::new(1.5, 0.5),
            PointD::new(1.5, 1.5),
            PointD::new(0.5, 1.5),
        ]]);
        let solution = clipper
            .execute(ClipType::Intersection, FillRule::NonZero)
            .unwrap();
        assert_eq!(solution.closed.len(), 1);
        let unit = 10f64.powi(-precision);
        assert!((path_d_area(&solution.closed[0]).abs() - 0.25).abs() <= unit);
        // every reported coordinate sits exactly on the chosen grid
        let scale = 10f64.powi(precision);
        for pt in &solution.closed[0] {
            assert!((pt.x * scale).fract().abs() < 1e-6);
            assert!((pt.y * scale).fract().abs() < 1e-6);
        }
    }
}

fn arb_rect() -> impl Strategy<Value = Path64> {
    (0i64..100, 0i64..100, 1i64..50, 1i64..50).prop_map(|(x, y, w, h)| rect(x, y, w, h))
}

proptest! {
    #[test]
    fn intersection_commutes(a in arb_rect(), b in arb_rect()) {
        let ab = intersect(&vec![a.clone()], &vec![b.clone()], FillRule::NonZero).unwrap();
        let ba = intersect(&vec![b], &vec![a], FillRule::NonZero).unwrap();
        prop_assert_eq!(signed_area(&ab), signed_area(&ba));
    }

    #[test]
    fn union_commutes(a in arb_rect(), b in arb_rect()) {
        let ab = union(&vec![a.clone()], &vec![b.clone()], FillRule::NonZero).unwrap();
        let ba = union(&vec![b], &vec![a], FillRule::NonZero).unwrap();
        prop_assert_eq!(signed_area(&ab), signed_area(&ba));
    }

    #[test]
    fn union_with_self_is_identity_area(a in arb_rect()) {
        let doubled = union(&vec![a.clone()], &vec![a.clone()], FillRule::NonZero).unwrap();
        prop_assert_eq!(signed_area(&doubled), area(&a));
    }

    #[test]
    fn difference_and_intersection_partition_subject(a in arb_rect(), b in arb_rect()) {
        // axis-aligned integer rectangles clip exactly, so the areas add up
        let inter = intersect(&vec![a.clone()], &vec![b.clone()], FillRule::NonZero).unwrap();
        let diff = difference(&vec![a.clone()], &vec![b], FillRule::NonZero).unwrap();
        prop_assert_eq!(signed_area(&inter) + signed_area(&diff), area(&a));
    }

    #[test]
    fn xor_complements_intersection_in_union(a in arb_rect(), b in arb_rect()) {
        let uni = union(&vec![a.clone()], &vec![b.clone()], FillRule::NonZero).unwrap();
        let inter = intersect(&vec![a.clone()], &vec![b.clone()], FillRule::NonZero).unwrap();
        let sym = xor(&vec![a], &vec![b], FillRule::NonZero).unwrap();
        prop_assert_eq!(signed_area(&uni), signed_area(&inter) + signed_area(&sym));
    }
}
