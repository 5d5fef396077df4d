use crate::model::{ArrowStyle, Point, distance_to_segment};

/// Width of the invisible hit path around an arrow (the visible stroke is
/// much thinner; targeting uses this generous band).
pub(super) const HIT_WIDTH: f32 = 12.0;

const CURVE_SEGMENTS: usize = 24;

pub(super) fn quad_point(start: Point, control: Point, end: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point {
        x: u * u * start.x + 2.0 * u * t * control.x + t * t * end.x,
        y: u * u * start.y + 2.0 * u * t * control.y + t * t * end.y,
    }
}

fn flatten_quad(start: Point, control: Point, end: Point) -> Vec<Point> {
    (0..=CURVE_SEGMENTS)
        .map(|i| quad_point(start, control, end, i as f32 / CURVE_SEGMENTS as f32))
        .collect()
}

/// Default control point for a curved *preview*: midpoint displaced
/// perpendicular to the start→end direction by 20% of its components.
pub(super) fn curve_control(start: Point, end: Point) -> Point {
    let mid = Point::midpoint(start, end);
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    Point {
        x: mid.x - dy * 0.2,
        y: mid.y + dx * 0.2,
    }
}

/// Transient preview polyline for the drawing gesture. Only here does the
/// arrow style matter; committed arrows go through [`committed_path`].
pub(super) fn preview_path(start: Point, end: Point, style: ArrowStyle) -> Vec<Point> {
    match style {
        ArrowStyle::Straight => vec![start, end],
        ArrowStyle::Curved => flatten_quad(start, curve_control(start, end), end),
        ArrowStyle::Orthogonal => {
            let mid_x = (start.x + end.x) / 2.0;
            vec![
                start,
                Point::new(mid_x, start.y),
                Point::new(mid_x, end.y),
                end,
            ]
        }
    }
}

/// Committed rendering contract: a quadratic curve through the stored (or
/// defaulted) control point, whatever the arrow's creation style was.
pub(super) fn committed_path(start: Point, control: Point, end: Point) -> Vec<Point> {
    flatten_quad(start, control, end)
}

pub(super) fn distance_to_path(points: &[Point], pos: Point) -> f32 {
    let p = pos.to_pos2();
    points
        .windows(2)
        .map(|pair| distance_to_segment(p, pair[0].to_pos2(), pair[1].to_pos2()))
        .fold(f32::INFINITY, f32::min)
}

/// Hit test against the wide invisible band sharing the visible geometry.
pub(super) fn hit_test(points: &[Point], pos: Point, stroke_width: f32) -> bool {
    if points.len() < 2 {
        return false;
    }
    distance_to_path(points, pos) <= (HIT_WIDTH / 2.0).max(stroke_width)
}

/// Last distinct segment of the path; orients the arrowhead along the
/// tangent at the endpoint.
pub(super) fn end_direction(points: &[Point]) -> Option<(Point, Point)> {
    let last = *points.last()?;
    let before = points
        .iter()
        .rev()
        .skip(1)
        .find(|p| (p.x - last.x).abs() > f32::EPSILON || (p.y - last.y).abs() > f32::EPSILON)?;
    Some((*before, last))
}

/// SVG path description of a committed arrow.
pub(super) fn quad_d(start: Point, control: Point, end: Point) -> String {
    format!(
        "M {} {} Q {} {} {} {}",
        start.x, start.y, control.x, control.y, end.x, end.y
    )
}
