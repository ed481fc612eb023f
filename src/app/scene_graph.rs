use crate::model::{
    BuildingOutline, Edge, LineStyle, Marker, MarkerKind, OUTLINE_ID, OutlineStyle, Point, Scene,
    Size,
};

use super::geometry::{
    bounding_box, distance, point_in_polygon, polygon_area, rescale, snap, translate,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum DimensionField {
    Width,
    Height,
}

/// Owns the editable scene and the single selection. Every mutation returns
/// `true` when something changed; stale ids and indices are silent no-ops.
#[derive(Clone, Debug)]
pub(super) struct SceneGraph {
    scene: Scene,
    selection: Option<u64>,
    grid_spacing: f32,
    next_marker_id: u64,
}

impl SceneGraph {
    pub fn new(grid_spacing: f32) -> Self {
        Self::from_scene(Scene::default(), grid_spacing)
    }

    pub fn from_scene(scene: Scene, grid_spacing: f32) -> Self {
        let next_marker_id = scene.next_marker_id();
        Self {
            scene,
            selection: None,
            grid_spacing,
            next_marker_id,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn replace_scene(&mut self, scene: Scene) {
        self.next_marker_id = scene.next_marker_id();
        self.scene = scene;
        self.selection = None;
    }

    pub fn grid_spacing(&self) -> f32 {
        self.grid_spacing
    }

    /// Zero disables snapping.
    pub fn set_grid_spacing(&mut self, grid_spacing: f32) {
        self.grid_spacing = grid_spacing.max(0.0);
    }

    pub fn outline(&self) -> Option<&BuildingOutline> {
        self.scene.outline.as_ref()
    }

    pub fn set_outline(&mut self, points: Vec<Point>) -> bool {
        self.scene.outline = Some(BuildingOutline {
            points,
            style: OutlineStyle::default(),
        });
        true
    }

    pub fn move_vertex(&mut self, node_id: u64, vertex_index: usize, dx: f32, dy: f32) -> bool {
        if node_id != OUTLINE_ID {
            return false;
        }
        let grid = self.grid_spacing;
        let Some(vertex) = self
            .scene
            .outline
            .as_mut()
            .and_then(|o| o.points.get_mut(vertex_index))
        else {
            return false;
        };
        let moved = Point::new(snap(vertex.x + dx, grid), snap(vertex.y + dy, grid));
        if moved == *vertex {
            return false;
        }
        *vertex = moved;
        true
    }

    pub fn translate_outline(&mut self, dx: f32, dy: f32) -> bool {
        let Some(outline) = self.scene.outline.as_mut() else {
            return false;
        };
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        outline.points = translate(&outline.points, dx, dy);
        true
    }

    pub fn add_marker(&mut self, kind: MarkerKind, position: Point) -> u64 {
        let id = self.next_marker_id;
        self.next_marker_id += 1;
        self.scene.markers.push(Marker {
            id,
            kind,
            position,
            size: kind.default_size(),
            label: kind.default_label().to_string(),
        });
        id
    }

    pub fn move_marker(&mut self, node_id: u64, position: Point) -> bool {
        let Some(marker) = self.scene.marker_mut(node_id) else {
            return false;
        };
        if marker.position == position {
            return false;
        }
        marker.position = position;
        true
    }

    pub fn update_marker_label(&mut self, node_id: u64, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        let Some(marker) = self.scene.marker_mut(node_id) else {
            return false;
        };
        if marker.label == trimmed {
            return false;
        }
        marker.label = trimmed.to_string();
        true
    }

    /// Sets one dimension from meters. The outline is rescaled about its
    /// bounding-box origin and ignores non-positive sizes; markers clamp at 0.
    pub fn resize_node(
        &mut self,
        node_id: u64,
        field: DimensionField,
        meters: f32,
        pixels_per_meter: f32,
    ) -> bool {
        if pixels_per_meter <= 0.0 || !meters.is_finite() {
            return false;
        }
        let pixels = meters * pixels_per_meter;
        if node_id == OUTLINE_ID {
            let Some(outline) = self.scene.outline.as_mut() else {
                return false;
            };
            if pixels <= 0.0 {
                return false;
            }
            let bb = bounding_box(&outline.points);
            let (w, h) = match field {
                DimensionField::Width => (pixels, bb.height),
                DimensionField::Height => (bb.width, pixels),
            };
            outline.points = rescale(&outline.points, w, h);
            return true;
        }
        let Some(marker) = self.scene.marker_mut(node_id) else {
            return false;
        };
        let pixels = pixels.max(0.0);
        match field {
            DimensionField::Width => marker.size.width = pixels,
            DimensionField::Height => marker.size.height = pixels,
        }
        true
    }

    /// Appends an edge. Repeated pairs are kept as separate edges.
    pub fn connect(&mut self, source: u64, target: u64) -> bool {
        if !self.scene.contains_node(source) || !self.scene.contains_node(target) {
            return false;
        }
        self.scene.edges.push(Edge {
            source,
            target,
            style: LineStyle::Solid,
        });
        true
    }

    pub fn set_edge_style(&mut self, index: usize, style: LineStyle) -> bool {
        match self.scene.edges.get_mut(index) {
            Some(edge) if edge.style != style => {
                edge.style = style;
                true
            }
            _ => false,
        }
    }

    pub fn remove_edge(&mut self, index: usize) -> bool {
        if index >= self.scene.edges.len() {
            return false;
        }
        self.scene.edges.remove(index);
        true
    }

    /// Drops the node and every edge touching it.
    pub fn remove_node(&mut self, node_id: u64) -> bool {
        let removed = if node_id == OUTLINE_ID {
            self.scene.outline.take().is_some()
        } else {
            let before = self.scene.markers.len();
            self.scene.markers.retain(|m| m.id != node_id);
            self.scene.markers.len() != before
        };
        if !removed {
            return false;
        }
        self.scene
            .edges
            .retain(|e| e.source != node_id && e.target != node_id);
        if self.selection == Some(node_id) {
            self.selection = None;
        }
        true
    }

    pub fn reset(&mut self) -> bool {
        let changed = !self.scene.is_empty();
        self.scene = Scene::default();
        self.selection = None;
        self.next_marker_id = OUTLINE_ID + 1;
        changed
    }

    pub fn selection(&self) -> Option<u64> {
        self.selection
    }

    /// Single selection: choosing a node replaces the previous one.
    pub fn select(&mut self, node_id: Option<u64>) {
        self.selection = node_id.filter(|id| self.scene.contains_node(*id));
    }

    pub fn hit_marker(&self, p: Point) -> Option<u64> {
        self.scene
            .markers
            .iter()
            .rev()
            .find(|m| m.rect().contains(p.to_pos2()))
            .map(|m| m.id)
    }

    /// Topmost node under `p`: markers first, then the outline body.
    pub fn hit_test(&self, p: Point) -> Option<u64> {
        if let Some(id) = self.hit_marker(p) {
            return Some(id);
        }
        let outline = self.scene.outline.as_ref()?;
        (outline.points.len() >= 3 && point_in_polygon(p, &outline.points)).then_some(OUTLINE_ID)
    }

    pub fn vertex_at(&self, p: Point, radius: f32) -> Option<usize> {
        let outline = self.scene.outline.as_ref()?;
        outline
            .points
            .iter()
            .enumerate()
            .filter(|(_, v)| distance(**v, p) <= radius)
            .min_by(|a, b| distance(*a.1, p).total_cmp(&distance(*b.1, p)))
            .map(|(i, _)| i)
    }

    /// Marker whose connection handle (middle of its right edge) is near `p`.
    pub fn connect_handle_at(&self, p: Point, radius: f32) -> Option<u64> {
        self.scene
            .markers
            .iter()
            .rev()
            .find(|m| distance(connect_handle(m), p) <= radius)
            .map(|m| m.id)
    }

    /// Topmost marker lying entirely inside the box spanned by `a` and `b`.
    pub fn topmost_marker_inside(&self, a: Point, b: Point) -> Option<u64> {
        let area = eframe::egui::Rect::from_two_pos(a.to_pos2(), b.to_pos2());
        self.scene
            .markers
            .iter()
            .rev()
            .find(|m| area.contains_rect(m.rect()))
            .map(|m| m.id)
    }

    pub fn node_center(&self, node_id: u64) -> Option<Point> {
        if node_id == OUTLINE_ID {
            let outline = self.scene.outline.as_ref()?;
            return Some(bounding_box(&outline.points).center());
        }
        self.scene.marker(node_id).map(Marker::center)
    }

    pub fn outline_size_m(&self, pixels_per_meter: f32) -> Option<(f32, f32)> {
        let outline = self.scene.outline.as_ref()?;
        if pixels_per_meter <= 0.0 {
            return None;
        }
        let bb = bounding_box(&outline.points);
        Some((bb.width / pixels_per_meter, bb.height / pixels_per_meter))
    }

    pub fn outline_area_m2(&self, pixels_per_meter: f32) -> Option<f32> {
        let outline = self.scene.outline.as_ref()?;
        if pixels_per_meter <= 0.0 {
            return None;
        }
        Some(polygon_area(&outline.points) / (pixels_per_meter * pixels_per_meter))
    }

    pub fn marker_size_m(&self, node_id: u64, pixels_per_meter: f32) -> Option<Size> {
        let marker = self.scene.marker(node_id)?;
        if pixels_per_meter <= 0.0 {
            return None;
        }
        Some(Size {
            width: marker.size.width / pixels_per_meter,
            height: marker.size.height / pixels_per_meter,
        })
    }
}

pub(super) fn connect_handle(marker: &Marker) -> Point {
    Point::new(
        marker.position.x + marker.size.width,
        marker.position.y + marker.size.height * 0.5,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::shapes::ShapeTemplate;

    fn graph_with_square() -> SceneGraph {
        let mut g = SceneGraph::new(40.0);
        g.set_outline(vec![
            Point::new(100.0, 100.0),
            Point::new(500.0, 100.0),
            Point::new(500.0, 400.0),
            Point::new(100.0, 400.0),
        ]);
        g
    }

    #[test]
    fn set_outline_replaces_previous() {
        let mut g = graph_with_square();
        g.set_outline(ShapeTemplate::L.points(Point::default(), 200.0, 200.0));
        let outline = g.outline().unwrap();
        assert_eq!(outline.points.len(), 6);
        assert_eq!(outline.points[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn move_vertex_snaps_to_grid() {
        let mut g = graph_with_square();
        assert!(g.move_vertex(OUTLINE_ID, 0, 17.0, -3.0));
        assert_eq!(g.outline().unwrap().points[0], Point::new(120.0, 80.0));
    }

    #[test]
    fn move_vertex_ignores_stale_targets() {
        let mut g = graph_with_square();
        let before = g.scene().clone();
        assert!(!g.move_vertex(OUTLINE_ID, 4, 10.0, 10.0));
        assert!(!g.move_vertex(3, 0, 10.0, 10.0));
        assert_eq!(g.scene(), &before);

        let mut empty = SceneGraph::new(40.0);
        assert!(!empty.move_vertex(OUTLINE_ID, 0, 10.0, 10.0));
    }

    #[test]
    fn markers_get_kind_defaults_and_fresh_ids() {
        let mut g = SceneGraph::new(40.0);
        let door = g.add_marker(MarkerKind::Door, Point::new(10.0, 20.0));
        let exit = g.add_marker(MarkerKind::Exit, Point::new(0.0, 0.0));
        assert_ne!(door, exit);
        assert_ne!(door, OUTLINE_ID);
        let m = g.scene().marker(door).unwrap();
        assert_eq!(m.size, Size { width: 70.0, height: 40.0 });
        assert_eq!(m.label, "Cửa");
        assert_eq!(m.position, Point::new(10.0, 20.0));
    }

    #[test]
    fn ids_continue_after_rehydrate() {
        let mut g = SceneGraph::new(40.0);
        g.add_marker(MarkerKind::Room, Point::default());
        let second = g.add_marker(MarkerKind::Room, Point::default());
        let mut restored = SceneGraph::from_scene(g.scene().clone(), 40.0);
        let third = restored.add_marker(MarkerKind::Room, Point::default());
        assert!(third > second);
    }

    #[test]
    fn blank_label_keeps_previous() {
        let mut g = SceneGraph::new(40.0);
        let id = g.add_marker(MarkerKind::Stairs, Point::default());
        assert!(!g.update_marker_label(id, "   "));
        assert_eq!(g.scene().marker(id).unwrap().label, "Cầu thang");
        assert!(g.update_marker_label(id, "  Cầu thang B "));
        assert_eq!(g.scene().marker(id).unwrap().label, "Cầu thang B");
        assert!(!g.update_marker_label(999, "x"));
    }

    #[test]
    fn resize_outline_rescales_one_axis() {
        let mut g = graph_with_square();
        assert!(g.resize_node(OUTLINE_ID, DimensionField::Width, 10.0, 80.0));
        let bb = bounding_box(&g.outline().unwrap().points);
        assert_eq!((bb.min_x, bb.min_y), (100.0, 100.0));
        assert_eq!(bb.width, 800.0);
        assert_eq!(bb.height, 300.0);
        assert!(!g.resize_node(OUTLINE_ID, DimensionField::Height, 0.0, 80.0));
        assert!(!g.resize_node(OUTLINE_ID, DimensionField::Height, 5.0, 0.0));
    }

    #[test]
    fn resize_marker_clamps_at_zero() {
        let mut g = SceneGraph::new(40.0);
        let id = g.add_marker(MarkerKind::Room, Point::default());
        assert!(g.resize_node(id, DimensionField::Height, 2.5, 80.0));
        assert_eq!(g.scene().marker(id).unwrap().size.height, 200.0);
        assert!(g.resize_node(id, DimensionField::Width, -3.0, 80.0));
        assert_eq!(g.scene().marker(id).unwrap().size.width, 0.0);
    }

    #[test]
    fn connect_allows_duplicates_but_not_unknown_nodes() {
        let mut g = graph_with_square();
        let a = g.add_marker(MarkerKind::Room, Point::default());
        let b = g.add_marker(MarkerKind::Door, Point::default());
        assert!(g.connect(a, b));
        assert!(g.connect(a, b));
        assert!(g.connect(b, OUTLINE_ID));
        assert!(!g.connect(a, 42));
        assert_eq!(g.scene().edges.len(), 3);
        assert_eq!(g.scene().duplicate_edge_count(), 1);
    }

    #[test]
    fn edge_style_changes_only_existing_edges() {
        let mut g = graph_with_square();
        let a = g.add_marker(MarkerKind::Room, Point::default());
        assert!(g.connect(a, OUTLINE_ID));
        assert!(g.set_edge_style(0, LineStyle::Dashed));
        assert!(!g.set_edge_style(0, LineStyle::Dashed));
        assert!(!g.set_edge_style(3, LineStyle::Dotted));
        assert_eq!(g.scene().edges[0].style, LineStyle::Dashed);
    }

    #[test]
    fn remove_node_drops_incident_edges_and_selection() {
        let mut g = graph_with_square();
        let a = g.add_marker(MarkerKind::Room, Point::default());
        let b = g.add_marker(MarkerKind::Door, Point::default());
        let c = g.add_marker(MarkerKind::Exit, Point::default());
        g.connect(a, b);
        g.connect(b, c);
        g.connect(a, c);
        g.select(Some(b));
        assert!(g.remove_node(b));
        assert_eq!(g.selection(), None);
        assert_eq!(g.scene().edges.len(), 1);
        assert!(!g.remove_node(b));
        assert!(g.remove_node(OUTLINE_ID));
        assert!(g.outline().is_none());
    }

    #[test]
    fn selection_is_single() {
        let mut g = SceneGraph::new(40.0);
        let a = g.add_marker(MarkerKind::Room, Point::default());
        let b = g.add_marker(MarkerKind::Room, Point::default());
        g.select(Some(a));
        g.select(Some(b));
        assert_eq!(g.selection(), Some(b));
        g.select(Some(77));
        assert_eq!(g.selection(), None);
    }

    #[test]
    fn hit_test_prefers_markers_over_outline() {
        let mut g = graph_with_square();
        let m = g.add_marker(MarkerKind::Room, Point::new(200.0, 200.0));
        assert_eq!(g.hit_test(Point::new(210.0, 210.0)), Some(m));
        assert_eq!(g.hit_test(Point::new(450.0, 150.0)), Some(OUTLINE_ID));
        assert_eq!(g.hit_test(Point::new(900.0, 900.0)), None);
    }

    #[test]
    fn vertex_lookup_uses_radius() {
        let g = graph_with_square();
        assert_eq!(g.vertex_at(Point::new(503.0, 398.0), 8.0), Some(2));
        assert_eq!(g.vertex_at(Point::new(300.0, 250.0), 8.0), None);
    }

    #[test]
    fn marquee_picks_fully_enclosed_marker() {
        let mut g = SceneGraph::new(40.0);
        let inside = g.add_marker(MarkerKind::Door, Point::new(10.0, 10.0));
        g.add_marker(MarkerKind::Room, Point::new(50.0, 50.0));
        assert_eq!(
            g.topmost_marker_inside(Point::new(0.0, 0.0), Point::new(100.0, 100.0)),
            Some(inside)
        );
        assert_eq!(
            g.topmost_marker_inside(Point::new(0.0, 0.0), Point::new(20.0, 20.0)),
            None
        );
    }

    #[test]
    fn derived_measurements_use_scale() {
        let g = graph_with_square();
        assert_eq!(g.outline_size_m(40.0), Some((10.0, 7.5)));
        assert_eq!(g.outline_area_m2(40.0), Some(75.0));
        assert_eq!(g.outline_size_m(0.0), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut g = graph_with_square();
        let a = g.add_marker(MarkerKind::Room, Point::default());
        g.select(Some(a));
        assert!(g.reset());
        assert!(g.scene().is_empty());
        assert_eq!(g.selection(), None);
        assert!(!g.reset());
    }
}
