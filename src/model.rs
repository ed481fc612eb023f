use eframe::egui;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node id reserved for the building outline. Markers are numbered from 1.
pub const OUTLINE_ID: u64 = 0;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    pub const ALL: [LineStyle; 3] = [LineStyle::Solid, LineStyle::Dashed, LineStyle::Dotted];

    pub fn label(self) -> &'static str {
        match self {
            LineStyle::Solid => "Solid",
            LineStyle::Dashed => "Dashed",
            LineStyle::Dotted => "Dotted",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct OutlineStyle {
    pub stroke: Rgba,
    pub stroke_width: f32,
    pub fill: Rgba,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            stroke: Rgba::rgb(45, 55, 72),
            stroke_width: 3.0,
            fill: Rgba {
                r: 226,
                g: 232,
                b: 240,
                a: 160,
            },
        }
    }
}

/// Footprint of the building on the active floor. A scene holds at most one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BuildingOutline {
    pub points: Vec<Point>,
    #[serde(default)]
    pub style: OutlineStyle,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Room,
    Corridor,
    Door,
    Stairs,
    Elevator,
    Exit,
    Extinguisher,
    Clinic,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 8] = [
        MarkerKind::Room,
        MarkerKind::Corridor,
        MarkerKind::Door,
        MarkerKind::Stairs,
        MarkerKind::Elevator,
        MarkerKind::Exit,
        MarkerKind::Extinguisher,
        MarkerKind::Clinic,
    ];

    /// Token used in drag payloads and in the persisted record.
    pub fn token(self) -> &'static str {
        match self {
            MarkerKind::Room => "room",
            MarkerKind::Corridor => "corridor",
            MarkerKind::Door => "door",
            MarkerKind::Stairs => "stairs",
            MarkerKind::Elevator => "elevator",
            MarkerKind::Exit => "exit",
            MarkerKind::Extinguisher => "extinguisher",
            MarkerKind::Clinic => "clinic",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.token() == token)
    }

    pub fn default_size(self) -> Size {
        let (width, height) = match self {
            MarkerKind::Room => (160.0, 120.0),
            MarkerKind::Corridor => (240.0, 60.0),
            MarkerKind::Door => (70.0, 40.0),
            MarkerKind::Stairs => (80.0, 80.0),
            MarkerKind::Elevator => (70.0, 70.0),
            MarkerKind::Exit => (80.0, 40.0),
            MarkerKind::Extinguisher => (40.0, 40.0),
            MarkerKind::Clinic => (120.0, 100.0),
        };
        Size { width, height }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            MarkerKind::Room => "Phòng",
            MarkerKind::Corridor => "Hành lang",
            MarkerKind::Door => "Cửa",
            MarkerKind::Stairs => "Cầu thang",
            MarkerKind::Elevator => "Thang máy",
            MarkerKind::Exit => "Lối thoát",
            MarkerKind::Extinguisher => "Bình chữa cháy",
            MarkerKind::Clinic => "Phòng y tế",
        }
    }

    pub fn color(self) -> Rgba {
        match self {
            MarkerKind::Room => Rgba::rgb(191, 219, 254),
            MarkerKind::Corridor => Rgba::rgb(229, 231, 235),
            MarkerKind::Door => Rgba::rgb(180, 120, 60),
            MarkerKind::Stairs => Rgba::rgb(167, 139, 250),
            MarkerKind::Elevator => Rgba::rgb(96, 165, 250),
            MarkerKind::Exit => Rgba::rgb(34, 197, 94),
            MarkerKind::Extinguisher => Rgba::rgb(239, 68, 68),
            MarkerKind::Clinic => Rgba::rgb(244, 114, 182),
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            MarkerKind::Room => "▭",
            MarkerKind::Corridor => "═",
            MarkerKind::Door => "🚪",
            MarkerKind::Stairs => "☰",
            MarkerKind::Elevator => "⇅",
            MarkerKind::Exit => "➜",
            MarkerKind::Extinguisher => "🔥",
            MarkerKind::Clinic => "✚",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub id: u64,
    pub kind: MarkerKind,
    pub position: Point,
    pub size: Size,
    pub label: String,
}

impl Marker {
    pub fn rect(&self) -> egui::Rect {
        egui::Rect::from_min_size(
            self.position.to_pos2(),
            egui::vec2(self.size.width, self.size.height),
        )
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.size.width * 0.5,
            self.position.y + self.size.height * 0.5,
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub source: u64,
    pub target: u64,
    #[serde(default)]
    pub style: LineStyle,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    #[serde(default)]
    pub outline: Option<BuildingOutline>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.outline.is_none() && self.markers.is_empty() && self.edges.is_empty()
    }

    pub fn marker(&self, id: u64) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn marker_mut(&mut self, id: u64) -> Option<&mut Marker> {
        self.markers.iter_mut().find(|m| m.id == id)
    }

    pub fn contains_node(&self, id: u64) -> bool {
        if id == OUTLINE_ID {
            return self.outline.is_some();
        }
        self.marker(id).is_some()
    }

    pub fn next_marker_id(&self) -> u64 {
        self.markers.iter().map(|m| m.id).max().unwrap_or(OUTLINE_ID) + 1
    }

    /// Edges that repeat an earlier (source, target) pair.
    pub fn duplicate_edge_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.edges
            .iter()
            .filter(|e| !seen.insert((e.source, e.target)))
            .count()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewMeta {
    pub pixels_per_meter: f32,
    pub grid_spacing_pixels: f32,
    #[serde(default)]
    pub saved_at: u64,
}

impl Default for ViewMeta {
    fn default() -> Self {
        Self {
            pixels_per_meter: 80.0,
            grid_spacing_pixels: 40.0,
            saved_at: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutKey {
    pub building_id: String,
    pub floor_id: String,
}

impl LayoutKey {
    pub fn new(building_id: impl Into<String>, floor_id: impl Into<String>) -> Self {
        Self {
            building_id: building_id.into(),
            floor_id: floor_id.into(),
        }
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "building {}, floor {}", self.building_id, self.floor_id)
    }
}

/// One persisted floor: the scene plus the scale it was drawn at.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub building_id: String,
    pub floor_id: String,
    pub scene: Scene,
    pub meta: ViewMeta,
}

impl LayoutRecord {
    pub fn key(&self) -> LayoutKey {
        LayoutKey::new(self.building_id.clone(), self.floor_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_defaults() {
        assert_eq!(
            MarkerKind::Door.default_size(),
            Size {
                width: 70.0,
                height: 40.0
            }
        );
        assert_eq!(MarkerKind::Door.default_label(), "Cửa");
    }

    #[test]
    fn marker_tokens_are_unique_and_parse_back() {
        for kind in MarkerKind::ALL {
            assert_eq!(MarkerKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(MarkerKind::from_token("sofa"), None);
    }

    #[test]
    fn next_marker_id_skips_existing() {
        let mut scene = Scene::default();
        assert_eq!(scene.next_marker_id(), 1);
        scene.markers.push(Marker {
            id: 7,
            kind: MarkerKind::Room,
            position: Point::default(),
            size: MarkerKind::Room.default_size(),
            label: "R".to_string(),
        });
        assert_eq!(scene.next_marker_id(), 8);
    }

    #[test]
    fn duplicate_edges_are_counted_not_removed() {
        let mut scene = Scene::default();
        for _ in 0..3 {
            scene.edges.push(Edge {
                source: 1,
                target: 2,
                style: LineStyle::Solid,
            });
        }
        scene.edges.push(Edge {
            source: 2,
            target: 1,
            style: LineStyle::Solid,
        });
        assert_eq!(scene.edges.len(), 4);
        assert_eq!(scene.duplicate_edge_count(), 2);
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let record = LayoutRecord {
            building_id: "A".to_string(),
            floor_id: "2".to_string(),
            scene: Scene::default(),
            meta: ViewMeta::default(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["buildingId"], "A");
        assert_eq!(json["floorId"], "2");
        assert_eq!(json["meta"]["pixelsPerMeter"], 80.0);
        assert_eq!(json["meta"]["gridSpacingPixels"], 40.0);
        assert!(json["scene"]["outline"].is_null());
    }

    #[test]
    fn marker_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MarkerKind::Extinguisher).unwrap();
        assert_eq!(json, "\"extinguisher\"");
    }
}
