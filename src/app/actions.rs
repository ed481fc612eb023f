use crate::model::{LayoutKey, Point};
use eframe::egui;

use super::interaction::{LoadOutcome, PaletteItem};
use super::{FloorPlanApp, settings, svg};

impl FloorPlanApp {
    /// Moves any controller notice into the status line.
    pub(super) fn drain_notice(&mut self) {
        if let Some(notice) = self.editor.take_notice() {
            self.status = Some(notice);
        }
    }

    pub(super) fn save_layout(&mut self) {
        match self.editor.save_now() {
            Ok(()) => self.drain_notice(),
            Err(e) => self.status = Some(format!("Save failed: {e}")),
        }
    }

    pub(super) fn load_layout(&mut self) {
        let outcome = self.editor.load_now();
        self.drain_notice();
        if outcome == LoadOutcome::Loaded && self.sync_scale_from_editor() {
            self.persist_settings();
        }
    }

    /// Switches to the building and floor typed in the toolbar.
    pub(super) fn apply_layout_key(&mut self) {
        let building = self.building_input.trim().to_string();
        let floor = self.floor_input.trim().to_string();
        if building.is_empty() || floor.is_empty() {
            self.status = Some("Building and floor are required".to_string());
            return;
        }
        let key = LayoutKey::new(building, floor);
        let Some(outcome) = self.editor.switch_key(key.clone()) else {
            return;
        };
        self.status = Some(match outcome {
            LoadOutcome::Loaded => format!("Opened {key}"),
            LoadOutcome::Missing => format!("New layout for {key}"),
        });
        // A failed flush of the previous floor takes precedence.
        self.drain_notice();
        self.sync_scale_from_editor();
        self.settings.building_id = key.building_id;
        self.settings.floor_id = key.floor_id;
        self.persist_settings();
    }

    /// Pulls the scale and grid a loaded record carried into the toolbar.
    /// Returns `true` when the settings changed.
    fn sync_scale_from_editor(&mut self) -> bool {
        let config = *self.editor.config();
        let changed = self.settings.pixels_per_meter != config.pixels_per_meter
            || self.settings.grid_spacing != config.grid_spacing;
        self.settings.pixels_per_meter = config.pixels_per_meter;
        self.settings.grid_spacing = config.grid_spacing;
        changed
    }

    pub(super) fn set_pixels_per_meter(&mut self, pixels_per_meter: f32) {
        if self.editor.set_pixels_per_meter(pixels_per_meter) {
            self.settings.pixels_per_meter = pixels_per_meter;
            self.persist_settings();
        }
    }

    pub(super) fn set_grid_spacing(&mut self, grid_spacing: f32) {
        if self.editor.set_grid_spacing(grid_spacing) {
            self.settings.grid_spacing = grid_spacing;
            self.persist_settings();
        }
    }

    pub(super) fn toggle_snap(&mut self) {
        let snap = !self.editor.config().snap_to_grid;
        self.editor.set_snap_to_grid(snap);
        self.settings.snap_to_grid = snap;
        self.persist_settings();
    }

    /// Palette insert without dragging: shapes land at the world origin,
    /// markers at the middle of the visible canvas.
    pub(super) fn insert_palette_item(&mut self, item: PaletteItem) {
        let at = match item {
            PaletteItem::Shape(_) => Point::default(),
            PaletteItem::Marker(_) => Point::from_pos2(self.canvas_center_world),
        };
        if self.editor.drop_payload(item.payload(), at) {
            self.status = Some(format!("Added {}", item.label()));
        }
    }

    pub(super) fn delete_selected(&mut self) {
        if self.editor.delete_selected() {
            self.status = Some("Deleted selection".to_string());
        }
    }

    pub(super) fn reset_scene(&mut self) {
        if self.editor.reset_scene() {
            self.status = Some(format!("Cleared {}", self.editor.key()));
        }
    }

    pub(super) fn export_svg_to_path(&mut self) {
        let svg = svg::scene_to_svg(self.editor.graph(), self.editor.config().pixels_per_meter);
        match std::fs::write(&self.settings.svg_path, svg) {
            Ok(()) => self.status = Some(format!("Exported {}", self.settings.svg_path)),
            Err(e) => self.status = Some(format!("SVG export failed: {e}")),
        }
    }

    pub(super) fn export_svg_dialog(&mut self) {
        let key = self.editor.key();
        let default_name = format!("{}-{}.svg", key.building_id, key.floor_id);
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("SVG", &["svg"])
            .save_file()
        {
            let path_str = path.display().to_string();
            let svg = svg::scene_to_svg(self.editor.graph(), self.editor.config().pixels_per_meter);
            match std::fs::write(&path, svg) {
                Ok(()) => {
                    self.settings.svg_path = path_str.clone();
                    self.persist_settings();
                    self.status = Some(format!("Exported {path_str}"));
                }
                Err(e) => self.status = Some(format!("SVG export failed: {e}")),
            }
        }
    }

    pub(super) fn persist_settings(&mut self) {
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            log::warn!("settings save to {} failed: {e}", self.settings_path);
            self.status = Some(format!("Settings save failed: {e}"));
        }
    }

    /// Writes out anything the debounce has not flushed yet.
    pub(super) fn flush_before_exit(&mut self) {
        if let Err(e) = self.editor.flush_pending() {
            log::error!("final save for {} failed: {e}", self.editor.key());
        }
    }

    pub(super) fn screen_radius_to_world(&self, radius: f32) -> f32 {
        radius / self.view.zoom
    }

    pub(super) fn world_at(&self, origin: egui::Pos2, screen: egui::Pos2) -> Point {
        Point::from_pos2(self.view.screen_to_world(origin, screen))
    }
}
