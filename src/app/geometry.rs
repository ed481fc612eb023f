use crate::model::Point;

/// Iteration cap for [`clamp_to_polygon`].
pub(super) const CLAMP_MAX_ITERATIONS: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(super) struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width * 0.5,
            self.min_y + self.height * 0.5,
        )
    }
}

/// Axis-aligned bounds of `points`. An empty slice yields the zero box.
pub(super) fn bounding_box(points: &[Point]) -> BoundingBox {
    let mut it = points.iter();
    let Some(first) = it.next() else {
        return BoundingBox::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in it {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BoundingBox {
        min_x,
        min_y,
        max_x,
        max_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// Scales every point about the bounding-box origin so the box becomes
/// `new_width` x `new_height`. A zero-extent axis keeps its scale at 1.
pub(super) fn rescale(points: &[Point], new_width: f32, new_height: f32) -> Vec<Point> {
    let bb = bounding_box(points);
    let sx = if bb.width.abs() <= f32::EPSILON {
        1.0
    } else {
        new_width / bb.width
    };
    let sy = if bb.height.abs() <= f32::EPSILON {
        1.0
    } else {
        new_height / bb.height
    };
    points
        .iter()
        .map(|p| Point::new(bb.min_x + (p.x - bb.min_x) * sx, bb.min_y + (p.y - bb.min_y) * sy))
        .collect()
}

pub(super) fn translate(points: &[Point], dx: f32, dy: f32) -> Vec<Point> {
    points.iter().map(|p| p.offset(dx, dy)).collect()
}

/// Closed path commands: `M x,y L x,y ... Z`.
pub(super) fn to_path_string(points: &[Point]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("M{},{}", p.x, p.y));
        } else {
            out.push_str(&format!(" L{},{}", p.x, p.y));
        }
    }
    if !out.is_empty() {
        out.push_str(" Z");
    }
    out
}

/// Rounds `value` to the nearest multiple of `grid_size`. Non-positive or
/// non-finite grids leave the value untouched.
pub(super) fn snap(value: f32, grid_size: f32) -> f32 {
    if grid_size <= 0.0 || !grid_size.is_finite() {
        return value;
    }
    (value / grid_size).round() * grid_size
}

pub(super) fn snap_point(p: Point, grid_size: f32) -> Point {
    Point::new(snap(p.x, grid_size), snap(p.y, grid_size))
}

/// Even-odd ray cast. Fewer than three vertices means no constraint.
pub(super) fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return true;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Vertex mean. Not guaranteed to lie inside a concave polygon.
pub(super) fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Walks an outside point toward the centroid by `step_fraction` of the
/// remaining distance per iteration until it lands inside or the cap is hit.
/// The result may still be outside for strongly concave polygons.
pub(super) fn clamp_to_polygon(point: Point, polygon: &[Point], step_fraction: f32) -> Point {
    if point_in_polygon(point, polygon) {
        return point;
    }
    let target = centroid(polygon);
    let step = step_fraction.clamp(0.0, 1.0);
    let mut p = point;
    for _ in 0..CLAMP_MAX_ITERATIONS {
        p.x += (target.x - p.x) * step;
        p.y += (target.y - p.y) * step;
        if point_in_polygon(p, polygon) {
            break;
        }
    }
    p
}

fn signed_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        twice += points[j].x * points[i].y - points[i].x * points[j].y;
        j = i;
    }
    twice * 0.5
}

/// Shoelace area, always non-negative.
pub(super) fn polygon_area(points: &[Point]) -> f32 {
    signed_area(points).abs()
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn strictly_inside_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    (d1 > 0.0 && d2 > 0.0 && d3 > 0.0) || (d1 < 0.0 && d2 < 0.0 && d3 < 0.0)
}

/// Ear-clipping triangulation of a simple polygon, as vertex index triples.
/// Self-intersecting input yields a partial result.
pub(super) fn triangulate(points: &[Point]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let orientation = signed_area(points).signum();
    let mut ring: Vec<usize> = (0..n).collect();
    let mut out = Vec::with_capacity(n - 2);
    while ring.len() > 3 {
        let m = ring.len();
        let ear = (0..m).find(|&i| {
            let (a, b, c) = (ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]);
            if cross(points[a], points[b], points[c]) * orientation <= 0.0 {
                return false;
            }
            !ring.iter().any(|&k| {
                k != a
                    && k != b
                    && k != c
                    && strictly_inside_triangle(points[k], points[a], points[b], points[c])
            })
        });
        let Some(i) = ear else {
            break;
        };
        out.push([ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]]);
        ring.remove(i);
    }
    if ring.len() == 3 {
        out.push([ring[0], ring[1], ring[2]]);
    }
    out
}

pub(super) fn distance(a: Point, b: Point) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square(size: f32) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn empty_bounding_box_is_zero() {
        assert_eq!(bounding_box(&[]), BoundingBox::default());
    }

    #[test]
    fn concave_outline_triangulates_to_its_area() {
        let l = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 40.0),
            Point::new(40.0, 40.0),
            Point::new(40.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let tris = triangulate(&l);
        assert_eq!(tris.len(), 4);
        let total: f32 = tris
            .iter()
            .map(|t| polygon_area(&[l[t[0]], l[t[1]], l[t[2]]]))
            .sum();
        assert!((total - polygon_area(&l)).abs() < 1e-3);
        assert!(triangulate(&l[..2]).is_empty());
    }

    #[test]
    fn rescale_keeps_origin_and_hits_target_size() {
        let pts = vec![
            Point::new(10.0, 20.0),
            Point::new(110.0, 20.0),
            Point::new(110.0, 70.0),
            Point::new(10.0, 70.0),
        ];
        let out = rescale(&pts, 300.0, 25.0);
        let bb = bounding_box(&out);
        assert_eq!((bb.min_x, bb.min_y), (10.0, 20.0));
        assert!((bb.width - 300.0).abs() < 1e-3);
        assert!((bb.height - 25.0).abs() < 1e-3);
    }

    #[test]
    fn rescale_zero_extent_axis_is_left_alone() {
        let line = vec![Point::new(0.0, 5.0), Point::new(10.0, 5.0), Point::new(20.0, 5.0)];
        let out = rescale(&line, 40.0, 100.0);
        assert!(out.iter().all(|p| p.y == 5.0));
        assert_eq!(bounding_box(&out).width, 40.0);
    }

    #[test]
    fn path_string_closes_path() {
        let path = to_path_string(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 5.5)]);
        assert_eq!(path, "M0,0 L10,0 L10,5.5 Z");
        assert_eq!(to_path_string(&[]), "");
    }

    #[test]
    fn snap_rounds_to_nearest_multiple() {
        assert_eq!(snap(117.0, 40.0), 120.0);
        assert_eq!(snap(97.0, 40.0), 80.0);
        assert_eq!(snap(-21.0, 40.0), -40.0);
        assert_eq!(snap(13.7, 0.0), 13.7);
        assert_eq!(snap(13.7, -5.0), 13.7);
    }

    #[test]
    fn degenerate_polygon_contains_everything() {
        let p = Point::new(1e6, -1e6);
        assert!(point_in_polygon(p, &[]));
        assert!(point_in_polygon(p, &[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]));
    }

    #[test]
    fn point_in_concave_polygon() {
        // L with the notch at the top right.
        let l = vec![
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 60.0),
            Point::new(100.0, 60.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        assert!(point_in_polygon(Point::new(20.0, 20.0), &l));
        assert!(point_in_polygon(Point::new(80.0, 80.0), &l));
        assert!(!point_in_polygon(Point::new(80.0, 20.0), &l));
    }

    #[test]
    fn clamp_leaves_inside_points() {
        let sq = square(100.0);
        let p = Point::new(30.0, 40.0);
        assert_eq!(clamp_to_polygon(p, &sq, 0.2), p);
    }

    #[test]
    fn clamp_pulls_outside_point_in() {
        let sq = square(100.0);
        let out = clamp_to_polygon(Point::new(180.0, 50.0), &sq, 0.2);
        assert!(point_in_polygon(out, &sq));
        assert!(out.x < 100.0);
    }

    #[test]
    fn clamp_with_zero_step_gives_up_after_cap() {
        let sq = square(100.0);
        let p = Point::new(500.0, 500.0);
        assert_eq!(clamp_to_polygon(p, &sq, 0.0), p);
    }

    #[test]
    fn area_of_rectangle() {
        assert_eq!(polygon_area(&square(10.0)), 100.0);
        assert_eq!(polygon_area(&square(10.0)[..2]), 0.0);
    }

    proptest! {
        #[test]
        fn bounding_box_matches_extremes(
            pts in prop::collection::vec((-1e4f32..1e4, -1e4f32..1e4), 1..32)
        ) {
            let pts: Vec<Point> = pts.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            let bb = bounding_box(&pts);
            let max_x = pts.iter().map(|p| p.x).fold(f32::MIN, f32::max);
            let min_x = pts.iter().map(|p| p.x).fold(f32::MAX, f32::min);
            let max_y = pts.iter().map(|p| p.y).fold(f32::MIN, f32::max);
            let min_y = pts.iter().map(|p| p.y).fold(f32::MAX, f32::min);
            prop_assert_eq!(bb.width, max_x - min_x);
            prop_assert_eq!(bb.height, max_y - min_y);
        }

        #[test]
        fn rescaled_rectangle_has_requested_size(
            x in -1e3f32..1e3, y in -1e3f32..1e3,
            w in 1f32..2e3, h in 1f32..2e3,
            nw in 1f32..2e3, nh in 1f32..2e3,
        ) {
            let rect = vec![
                Point::new(x, y),
                Point::new(x + w, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ];
            let bb = bounding_box(&rescale(&rect, nw, nh));
            prop_assert!((bb.width - nw).abs() <= nw * 1e-4 + 1e-2);
            prop_assert!((bb.height - nh).abs() <= nh * 1e-4 + 1e-2);

            let same = bounding_box(&rect);
            let unchanged = rescale(&rect, same.width, same.height);
            for (a, b) in rect.iter().zip(&unchanged) {
                prop_assert!((a.x - b.x).abs() < 1e-2 && (a.y - b.y).abs() < 1e-2);
            }
        }

        #[test]
        fn snap_lands_on_grid_and_is_idempotent(v in -1e5f32..1e5, g in 0.5f32..200.0) {
            let s = snap(v, g);
            let ratio = s / g;
            prop_assert!((ratio - ratio.round()).abs() < 1e-3);
            prop_assert_eq!(snap(s, g), s);
        }

        #[test]
        fn rectangle_contains_centroid_not_far_points(
            x in -1e3f32..1e3, y in -1e3f32..1e3,
            w in 1f32..1e3, h in 1f32..1e3,
        ) {
            let rect = vec![
                Point::new(x, y),
                Point::new(x + w, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ];
            prop_assert!(point_in_polygon(centroid(&rect), &rect));
            prop_assert!(!point_in_polygon(Point::new(x + 3.0 * w + 10.0, y + 3.0 * h + 10.0), &rect));
        }
    }
}
