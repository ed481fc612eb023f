use crate::model::Point;

/// Wall thickness as a share of the shorter side.
pub(super) const WALL_THICKNESS_RATIO: f32 = 0.3;
pub(super) const MIN_WALL_THICKNESS: f32 = 16.0;
/// Walls never take more than this share of the shorter side, so small
/// outlines keep their notch and stay inside the requested box.
pub(super) const MAX_WALL_SHARE: f32 = 0.45;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ShapeTemplate {
    Rectangle,
    L,
    U,
    T,
}

impl ShapeTemplate {
    pub const ALL: [ShapeTemplate; 4] = [
        ShapeTemplate::Rectangle,
        ShapeTemplate::L,
        ShapeTemplate::U,
        ShapeTemplate::T,
    ];

    pub fn token(self) -> &'static str {
        match self {
            ShapeTemplate::Rectangle => "rectangle",
            ShapeTemplate::L => "L",
            ShapeTemplate::U => "U",
            ShapeTemplate::T => "T",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.token() == token)
    }

    pub fn label(self) -> &'static str {
        match self {
            ShapeTemplate::Rectangle => "Chữ nhật",
            ShapeTemplate::L => "Chữ L",
            ShapeTemplate::U => "Chữ U",
            ShapeTemplate::T => "Chữ T",
        }
    }

    /// Canonical outline with its top-left corner at `origin`.
    pub fn points(self, origin: Point, width: f32, height: f32) -> Vec<Point> {
        let t = wall_thickness(width, height);
        let local = match self {
            ShapeTemplate::Rectangle => rectangle(width, height),
            ShapeTemplate::L => l_shape(width, height, t),
            ShapeTemplate::U => u_shape(width, height, t),
            ShapeTemplate::T => t_shape(width, height, t),
        };
        local
            .into_iter()
            .map(|p| p.offset(origin.x, origin.y))
            .collect()
    }
}

pub(super) fn wall_thickness(width: f32, height: f32) -> f32 {
    let short = width.min(height).max(0.0);
    (short * WALL_THICKNESS_RATIO)
        .max(MIN_WALL_THICKNESS)
        .min(short * MAX_WALL_SHARE)
}

pub(super) fn rectangle(w: f32, h: f32) -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ]
}

/// Vertical wing on the left, horizontal wing along the bottom.
pub(super) fn l_shape(w: f32, h: f32, t: f32) -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(t, 0.0),
        Point::new(t, h - t),
        Point::new(w, h - t),
        Point::new(w, h),
        Point::new(0.0, h),
    ]
}

/// Opening faces up.
pub(super) fn u_shape(w: f32, h: f32, t: f32) -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(t, 0.0),
        Point::new(t, h - t),
        Point::new(w - t, h - t),
        Point::new(w - t, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ]
}

/// Full-width bar on top with a centered stem.
pub(super) fn t_shape(w: f32, h: f32, t: f32) -> Vec<Point> {
    let stem_left = (w - t) * 0.5;
    let stem_right = (w + t) * 0.5;
    vec![
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, t),
        Point::new(stem_right, t),
        Point::new(stem_right, h),
        Point::new(stem_left, h),
        Point::new(stem_left, t),
        Point::new(0.0, t),
    ]
}
