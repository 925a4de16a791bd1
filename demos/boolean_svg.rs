//! Renders a boolean operation on two sample shapes to an SVG file.
//!
//! ```sh
//! cargo run --example boolean_svg -- --op intersection out.svg
//! ```

use anyhow::Result;
use clap::Parser;
use svg::node::element::Path as SvgPath;

use polyclip::{ClipType, Clipper64, FillRule, Path64, Point64};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Op {
    Intersection,
    Union,
    Difference,
    Xor,
}

impl From<Op> for ClipType {
    fn from(op: Op) -> ClipType {
        match op {
            Op::Intersection => ClipType::Intersection,
            Op::Union => ClipType::Union,
            Op::Difference => ClipType::Difference,
            Op::Xor => ClipType::Xor,
        }
    }
}

#[derive(Parser)]
struct Args {
    /// The boolean operation to apply.
    #[arg(long, value_enum, default_value = "intersection")]
    op: Op,

    /// Where to write the rendered SVG.
    output: std::path::PathBuf,
}

fn star(cx: i64, cy: i64, outer: i64, inner: i64, points: u32) -> Path64 {
    let n = points * 2;
    (0..n)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let theta = std::f64::consts::TAU * i as f64 / n as f64 - std::f64::consts::FRAC_PI_2;
            Point64::new(
                cx + (r as f64 * theta.cos()).round() as i64,
                cy + (r as f64 * theta.sin()).round() as i64,
            )
        })
        .collect()
}

fn polygon(cx: i64, cy: i64, radius: i64, sides: u32) -> Path64 {
    (0..sides)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / sides as f64;
            Point64::new(
                cx + (radius as f64 * theta.cos()).round() as i64,
                cy + (radius as f64 * theta.sin()).round() as i64,
            )
        })
        .collect()
}

fn to_svg_data(paths: &[Path64]) -> svg::node::element::path::Data {
    let mut data = svg::node::element::path::Data::new();
    for path in paths {
        let mut iter = path.iter();
        if let Some(first) = iter.next() {
            data = data.move_to((first.x as f64, first.y as f64));
            for p in iter {
                data = data.line_to((p.x as f64, p.y as f64));
            }
            data = data.close();
        }
    }
    data
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subject = vec![star(200, 200, 180, 75, 7)];
    let clip = vec![polygon(260, 240, 130, 32)];

    let mut clipper = Clipper64::new();
    clipper.add_subject(&subject);
    clipper.add_clip(&clip);
    let solution = clipper.execute(args.op.into(), FillRule::NonZero)?;

    let doc = svg::Document::new()
        .set("viewBox", (0, 0, 420, 420))
        .add(
            SvgPath::new()
                .set("d", to_svg_data(&subject))
                .set("fill", "none")
                .set("stroke", "#c0c0c0"),
        )
        .add(
            SvgPath::new()
                .set("d", to_svg_data(&clip))
                .set("fill", "none")
                .set("stroke", "#c0c0c0"),
        )
        .add(
            SvgPath::new()
                .set("d", to_svg_data(&solution.closed))
                .set("fill", "#66aadd")
                .set("fill-rule", "evenodd")
                .set("stroke", "#225588"),
        );

    svg::save(&args.output, &doc)?;
    println!(
        "{:?} produced {} closed path(s); wrote {}",
        ClipType::from(args.op),
        solution.closed.len(),
        args.output.display()
    );
    Ok(())
}
