//! Editing session for one floor: turns pointer gestures into scene graph
//! mutations and keeps the layout store in step through debounced autosave.
//!
//! Everything here works in world (pixel) coordinates. The egui layer
//! converts screen positions through the view transform before calling in.

use crate::model::{LayoutKey, LineStyle, MarkerKind, OUTLINE_ID, Point, Scene, Size, ViewMeta};
use log::{debug, info, warn};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::autosave::{DeferredTask, TaskHandle};
use super::geometry::{clamp_to_polygon, snap_point};
use super::scene_graph::{DimensionField, SceneGraph};
use super::shapes::ShapeTemplate;
use super::store::{LayoutStore, StoreError};

/// Fraction of the remaining distance a misplaced marker moves per step
/// while it is pulled inside the outline.
pub(super) const CLAMP_STEP_FRACTION: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum PaletteItem {
    Shape(ShapeTemplate),
    Marker(MarkerKind),
}

impl PaletteItem {
    pub fn all() -> Vec<PaletteItem> {
        ShapeTemplate::ALL
            .into_iter()
            .map(PaletteItem::Shape)
            .chain(MarkerKind::ALL.into_iter().map(PaletteItem::Marker))
            .collect()
    }

    pub fn payload(self) -> &'static str {
        match self {
            PaletteItem::Shape(t) => t.token(),
            PaletteItem::Marker(k) => k.token(),
        }
    }

    pub fn from_payload(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        ShapeTemplate::from_token(payload)
            .map(PaletteItem::Shape)
            .or_else(|| MarkerKind::from_token(payload).map(PaletteItem::Marker))
    }

    pub fn label(self) -> String {
        match self {
            PaletteItem::Shape(t) => t.label().to_string(),
            PaletteItem::Marker(k) => format!("{} {}", k.icon(), k.default_label()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct EditorConfig {
    pub pixels_per_meter: f32,
    pub grid_spacing: f32,
    pub snap_to_grid: bool,
    pub building_width_m: f32,
    pub building_height_m: f32,
    pub clamp_markers_to_outline: bool,
    pub autosave_delay: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: 80.0,
            grid_spacing: 40.0,
            snap_to_grid: true,
            building_width_m: 18.0,
            building_height_m: 10.0,
            clamp_markers_to_outline: true,
            autosave_delay: Duration::from_millis(500),
        }
    }
}

/// A pointer gesture in flight. Exactly one at a time; the release event
/// always ends it.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum Gesture {
    PaletteDrag {
        payload: String,
        hover: Option<Point>,
    },
    VertexDrag {
        vertex: usize,
        start_pointer: Point,
        start_vertex: Point,
        moving: bool,
    },
    MoveMarker {
        node_id: u64,
        start_pointer: Point,
        start_position: Point,
    },
    MoveOutline {
        start_pointer: Point,
        applied: Point,
    },
    Connect {
        source: u64,
        current: Point,
    },
    Marquee {
        start: Point,
        current: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct LabelEdit {
    pub node_id: u64,
    pub original: String,
    pub buffer: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LoadOutcome {
    Loaded,
    Missing,
}

enum DragStep {
    Vertex { vertex: usize, target: Point },
    Marker { node_id: u64, target: Point },
    Outline { dx: f32, dy: f32 },
}

pub(super) struct EditorController {
    graph: SceneGraph,
    store: LayoutStore,
    key: LayoutKey,
    config: EditorConfig,
    gesture: Option<Gesture>,
    label_edit: Option<LabelEdit>,
    autosave: DeferredTask<LayoutKey>,
    autosave_handle: Option<TaskHandle>,
    dirty: bool,
    notice: Option<String>,
}

impl EditorController {
    pub fn new(store: LayoutStore, key: LayoutKey, config: EditorConfig) -> Self {
        let mut editor = Self {
            graph: SceneGraph::new(0.0),
            store,
            key,
            config,
            gesture: None,
            label_edit: None,
            autosave: DeferredTask::new(config.autosave_delay),
            autosave_handle: None,
            dirty: false,
            notice: None,
        };
        editor.sync_grid();
        if editor.rehydrate() == LoadOutcome::Loaded {
            info!("restored layout for {}", editor.key);
        }
        editor
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn scene(&self) -> &Scene {
        self.graph.scene()
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn key(&self) -> &LayoutKey {
        &self.key
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    pub fn label_edit(&self) -> Option<&LabelEdit> {
        self.label_edit.as_ref()
    }

    pub fn label_edit_mut(&mut self) -> Option<&mut LabelEdit> {
        self.label_edit.as_mut()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty || self.autosave.is_pending() || self.store.has_unwritten()
    }

    pub fn selection(&self) -> Option<u64> {
        self.graph.selection()
    }

    pub fn select(&mut self, node_id: Option<u64>) {
        self.graph.select(node_id);
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.dirty = true;
        }
        changed
    }

    fn sync_grid(&mut self) {
        let grid = if self.config.snap_to_grid {
            self.config.grid_spacing
        } else {
            0.0
        };
        self.graph.set_grid_spacing(grid);
    }

    // ----- scale and grid -----

    pub fn set_pixels_per_meter(&mut self, pixels_per_meter: f32) -> bool {
        if pixels_per_meter <= 0.0 || pixels_per_meter == self.config.pixels_per_meter {
            return false;
        }
        self.config.pixels_per_meter = pixels_per_meter;
        self.touch(true)
    }

    pub fn set_grid_spacing(&mut self, grid_spacing: f32) -> bool {
        if grid_spacing < 0.0 || grid_spacing == self.config.grid_spacing {
            return false;
        }
        self.config.grid_spacing = grid_spacing;
        self.sync_grid();
        self.touch(true)
    }

    pub fn set_snap_to_grid(&mut self, snap_to_grid: bool) {
        self.config.snap_to_grid = snap_to_grid;
        self.sync_grid();
    }

    pub fn set_building_size_m(&mut self, width_m: f32, height_m: f32) {
        self.config.building_width_m = width_m.max(0.0);
        self.config.building_height_m = height_m.max(0.0);
    }

    pub fn set_clamp_markers_to_outline(&mut self, clamp: bool) {
        self.config.clamp_markers_to_outline = clamp;
    }

    pub fn set_autosave_delay(&mut self, delay: Duration) {
        self.config.autosave_delay = delay;
        self.autosave.set_delay(delay);
    }

    // ----- palette drag and drop -----

    pub fn begin_palette_drag(&mut self, payload: &str) {
        if matches!(self.gesture, Some(Gesture::PaletteDrag { .. })) {
            return;
        }
        self.gesture = Some(Gesture::PaletteDrag {
            payload: payload.to_string(),
            hover: None,
        });
    }

    pub fn cancel_palette_drag(&mut self) {
        if matches!(self.gesture, Some(Gesture::PaletteDrag { .. })) {
            self.gesture = None;
        }
    }

    /// Instantiates the dropped palette item at `world`. Unknown payloads
    /// create nothing.
    pub fn drop_payload(&mut self, payload: &str, world: Point) -> bool {
        self.cancel_palette_drag();
        let Some(item) = PaletteItem::from_payload(payload) else {
            debug!("ignoring drop payload {payload:?}");
            return false;
        };
        match item {
            PaletteItem::Shape(template) => {
                let origin = snap_point(world, self.graph.grid_spacing());
                let width = self.config.building_width_m * self.config.pixels_per_meter;
                let height = self.config.building_height_m * self.config.pixels_per_meter;
                self.graph.set_outline(template.points(origin, width, height));
                self.graph.select(Some(OUTLINE_ID));
                info!("placed {} outline on {}", template.token(), self.key);
            }
            PaletteItem::Marker(kind) => {
                let position = self.place_marker(world, kind.default_size());
                let id = self.graph.add_marker(kind, position);
                self.graph.select(Some(id));
                debug!("placed {} marker {id}", kind.token());
            }
        }
        self.touch(true)
    }

    /// Snaps the anchor and pulls the marker center inside the outline.
    fn place_marker(&self, anchor: Point, size: Size) -> Point {
        let position = snap_point(anchor, self.graph.grid_spacing());
        if !self.config.clamp_markers_to_outline {
            return position;
        }
        let Some(outline) = self.graph.outline() else {
            return position;
        };
        let (hw, hh) = (size.width * 0.5, size.height * 0.5);
        let center = clamp_to_polygon(position.offset(hw, hh), &outline.points, CLAMP_STEP_FRACTION);
        center.offset(-hw, -hh)
    }

    // ----- canvas pointer gestures -----

    /// Pointer went down at `world`. `radius` is the handle grab distance in
    /// world units.
    pub fn pointer_pressed(&mut self, world: Point, radius: f32) {
        if self.label_edit.is_some() {
            self.commit_label_edit();
        }
        if let Some(source) = self.graph.connect_handle_at(world, radius) {
            self.graph.select(Some(source));
            self.gesture = Some(Gesture::Connect {
                source,
                current: world,
            });
            return;
        }
        if let Some(vertex) = self.graph.vertex_at(world, radius) {
            let start_vertex = self
                .graph
                .outline()
                .and_then(|o| o.points.get(vertex))
                .copied()
                .unwrap_or(world);
            self.graph.select(Some(OUTLINE_ID));
            self.gesture = Some(Gesture::VertexDrag {
                vertex,
                start_pointer: world,
                start_vertex,
                moving: false,
            });
            return;
        }
        match self.graph.hit_test(world) {
            Some(OUTLINE_ID) if self.graph.selection() == Some(OUTLINE_ID) => {
                self.gesture = Some(Gesture::MoveOutline {
                    start_pointer: world,
                    applied: Point::default(),
                });
            }
            Some(OUTLINE_ID) => {
                self.graph.select(Some(OUTLINE_ID));
                self.gesture = Some(Gesture::Marquee {
                    start: world,
                    current: world,
                });
            }
            Some(node_id) => {
                self.graph.select(Some(node_id));
                let start_position = self
                    .graph
                    .scene()
                    .marker(node_id)
                    .map(|m| m.position)
                    .unwrap_or(world);
                self.gesture = Some(Gesture::MoveMarker {
                    node_id,
                    start_pointer: world,
                    start_position,
                });
            }
            None => {
                self.graph.select(None);
                self.gesture = Some(Gesture::Marquee {
                    start: world,
                    current: world,
                });
            }
        }
    }

    /// Returns `true` when the scene changed.
    pub fn pointer_moved(&mut self, world: Point) -> bool {
        let grid = self.graph.grid_spacing();
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        let step = match gesture {
            Gesture::PaletteDrag { hover, .. } => {
                *hover = Some(world);
                return false;
            }
            Gesture::Connect { current, .. } | Gesture::Marquee { current, .. } => {
                *current = world;
                return false;
            }
            Gesture::VertexDrag {
                vertex,
                start_pointer,
                start_vertex,
                moving,
            } => {
                *moving = true;
                DragStep::Vertex {
                    vertex: *vertex,
                    target: start_vertex.offset(world.x - start_pointer.x, world.y - start_pointer.y),
                }
            }
            Gesture::MoveMarker {
                node_id,
                start_pointer,
                start_position,
            } => DragStep::Marker {
                node_id: *node_id,
                target: start_position.offset(world.x - start_pointer.x, world.y - start_pointer.y),
            },
            Gesture::MoveOutline {
                start_pointer,
                applied,
            } => {
                let total = snap_point(
                    Point::new(world.x - start_pointer.x, world.y - start_pointer.y),
                    grid,
                );
                let (dx, dy) = (total.x - applied.x, total.y - applied.y);
                *applied = total;
                DragStep::Outline { dx, dy }
            }
        };

        let changed = match step {
            DragStep::Vertex { vertex, target } => {
                let Some(current) = self
                    .graph
                    .outline()
                    .and_then(|o| o.points.get(vertex))
                    .copied()
                else {
                    self.gesture = None;
                    return false;
                };
                self.graph
                    .move_vertex(OUTLINE_ID, vertex, target.x - current.x, target.y - current.y)
            }
            DragStep::Marker { node_id, target } => {
                let Some(size) = self.graph.scene().marker(node_id).map(|m| m.size) else {
                    self.gesture = None;
                    return false;
                };
                let position = self.place_marker(target, size);
                self.graph.move_marker(node_id, position)
            }
            DragStep::Outline { dx, dy } => self.graph.translate_outline(dx, dy),
        };
        self.touch(changed)
    }

    /// Drops the gesture in flight. Edits it already applied are kept.
    pub fn cancel_gesture(&mut self) {
        self.gesture = None;
    }

    /// Ends the current gesture. Returns `true` when the scene changed.
    pub fn pointer_released(&mut self, world: Point) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        match gesture {
            Gesture::Connect { source, .. } => match self.graph.hit_marker(world) {
                Some(target) if target != source => {
                    let changed = self.graph.connect(source, target);
                    self.touch(changed)
                }
                _ => {
                    debug!("connection from {source} released over nothing");
                    false
                }
            },
            Gesture::Marquee { start, .. } => {
                if let Some(id) = self.graph.topmost_marker_inside(start, world) {
                    self.graph.select(Some(id));
                }
                false
            }
            Gesture::PaletteDrag { .. }
            | Gesture::VertexDrag { .. }
            | Gesture::MoveMarker { .. }
            | Gesture::MoveOutline { .. } => false,
        }
    }

    // ----- label editing -----

    pub fn begin_label_edit(&mut self, node_id: u64) -> bool {
        if self.label_edit.is_some() {
            self.commit_label_edit();
        }
        let Some(marker) = self.graph.scene().marker(node_id) else {
            return false;
        };
        self.label_edit = Some(LabelEdit {
            node_id,
            original: marker.label.clone(),
            buffer: marker.label.clone(),
        });
        self.graph.select(Some(node_id));
        true
    }

    /// Applies the edit buffer; a blank buffer keeps the previous label.
    pub fn commit_label_edit(&mut self) -> bool {
        let Some(edit) = self.label_edit.take() else {
            return false;
        };
        let changed = self.graph.update_marker_label(edit.node_id, &edit.buffer);
        self.touch(changed)
    }

    pub fn cancel_label_edit(&mut self) -> bool {
        self.label_edit.take().is_some()
    }

    // ----- direct edits -----

    pub fn resize_node(&mut self, node_id: u64, field: DimensionField, meters: f32) -> bool {
        let changed = self
            .graph
            .resize_node(node_id, field, meters, self.config.pixels_per_meter);
        self.touch(changed)
    }

    pub fn connect(&mut self, source: u64, target: u64) -> bool {
        let changed = self.graph.connect(source, target);
        self.touch(changed)
    }

    pub fn set_edge_style(&mut self, index: usize, style: LineStyle) -> bool {
        let changed = self.graph.set_edge_style(index, style);
        self.touch(changed)
    }

    pub fn remove_edge(&mut self, index: usize) -> bool {
        let changed = self.graph.remove_edge(index);
        self.touch(changed)
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(node_id) = self.graph.selection() else {
            return false;
        };
        if self.label_edit.as_ref().is_some_and(|e| e.node_id == node_id) {
            self.label_edit = None;
        }
        let changed = self.graph.remove_node(node_id);
        self.touch(changed)
    }

    pub fn reset_scene(&mut self) -> bool {
        self.gesture = None;
        self.label_edit = None;
        let changed = self.graph.reset();
        self.touch(changed)
    }

    // ----- persistence -----

    /// Drives the autosave timer. Returns `true` when a save ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.dirty {
            self.dirty = false;
            if let Some(previous) = self.autosave_handle.take() {
                self.autosave.cancel(previous);
            }
            self.autosave_handle = Some(self.autosave.schedule(now, self.key.clone()));
        }
        let Some(key) = self.autosave.poll(now) else {
            return false;
        };
        if self.persist(&key).is_ok() {
            return true;
        }
        // Retry after another quiet period.
        if key == self.key {
            self.autosave_handle = Some(self.autosave.schedule(now, key));
        }
        false
    }

    pub fn time_until_autosave(&self, now: Instant) -> Option<Duration> {
        self.autosave.time_until_due(now)
    }

    /// Saves immediately, dropping any pending autosave.
    pub fn save_now(&mut self) -> Result<(), StoreError> {
        self.dirty = false;
        self.autosave.cancel_all();
        let key = self.key.clone();
        self.persist(&key)?;
        self.notice = Some(format!("Saved layout for {key}"));
        Ok(())
    }

    /// Writes out anything not yet persisted for the active key.
    pub fn flush_pending(&mut self) -> Result<(), StoreError> {
        let pending = self.autosave.flush().is_some();
        if self.dirty || pending {
            return self.save_now();
        }
        self.store.flush()
    }

    /// Replaces the scene with the stored one, discarding unsaved edits. When
    /// nothing is stored the scene is left as it is.
    pub fn load_now(&mut self) -> LoadOutcome {
        if self.store.load(&self.key).is_none() {
            self.notice = Some(format!("No saved layout for {}", self.key));
            return LoadOutcome::Missing;
        }
        self.gesture = None;
        self.label_edit = None;
        self.autosave.cancel_all();
        self.dirty = false;
        let outcome = self.rehydrate();
        self.notice = Some(format!("Loaded layout for {}", self.key));
        outcome
    }

    /// Moves the session to another floor. Pending edits for the current key
    /// are written first. Returns `None` when `key` is already active.
    pub fn switch_key(&mut self, key: LayoutKey) -> Option<LoadOutcome> {
        if key == self.key {
            return None;
        }
        if let Err(e) = self.flush_pending() {
            warn!("could not flush {} before switching: {e}", self.key);
            self.notice = Some(format!("Could not write {}: {e}", self.key));
        }
        info!("switching from {} to {key}", self.key);
        self.key = key;
        self.gesture = None;
        self.label_edit = None;
        self.autosave.cancel_all();
        self.dirty = false;
        let outcome = self.rehydrate();
        if outcome == LoadOutcome::Missing {
            self.graph.replace_scene(Scene::default());
        }
        Some(outcome)
    }

    fn rehydrate(&mut self) -> LoadOutcome {
        let Some(record) = self.store.load(&self.key) else {
            return LoadOutcome::Missing;
        };
        self.graph.replace_scene(record.scene);
        if record.meta.pixels_per_meter > 0.0 {
            self.config.pixels_per_meter = record.meta.pixels_per_meter;
        }
        if record.meta.grid_spacing_pixels >= 0.0 {
            self.config.grid_spacing = record.meta.grid_spacing_pixels;
        }
        self.sync_grid();
        LoadOutcome::Loaded
    }

    fn persist(&mut self, key: &LayoutKey) -> Result<(), StoreError> {
        if *key != self.key {
            debug!("dropping stale autosave for {key}");
            return Ok(());
        }
        let meta = ViewMeta {
            pixels_per_meter: self.config.pixels_per_meter,
            grid_spacing_pixels: self.config.grid_spacing,
            saved_at: now_millis(),
        };
        match self.store.save(key, self.graph.scene(), meta) {
            Ok(()) => {
                debug!("persisted layout for {key}");
                Ok(())
            }
            Err(e) => {
                warn!("saving layout for {key} failed: {e}");
                self.notice = Some(format!("Save failed: {e}"));
                Err(e)
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
