use crate::model::LayoutKey;
use eframe::egui;
use std::time::Duration;

mod actions;
mod autosave;
mod command_palette;
mod geometry;
mod help;
mod interaction;
mod render;
mod scene_graph;
mod settings;
mod shapes;
mod store;
mod svg;
mod update;

use interaction::{EditorConfig, EditorController};
use store::LayoutStore;

#[derive(Clone, Copy, Debug)]
struct View {
    pan_screen: egui::Vec2,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::vec2(40.0, 40.0),
            zoom: 0.5,
        }
    }
}

impl View {
    fn world_to_screen(&self, origin: egui::Pos2, world: egui::Pos2) -> egui::Pos2 {
        origin + self.pan_screen + world.to_vec2() * self.zoom
    }

    fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.pan_screen) / self.zoom).to_pos2()
    }

    fn zoom_about_screen_point(
        &mut self,
        origin: egui::Pos2,
        screen_point: egui::Pos2,
        zoom_delta: f32,
    ) {
        let before = self.screen_to_world(origin, screen_point);
        self.zoom = (self.zoom * zoom_delta).clamp(0.1, 8.0);
        let after_screen = self.world_to_screen(origin, before);
        self.pan_screen += screen_point - after_screen;
    }
}

pub struct FloorPlanApp {
    editor: EditorController,
    view: View,
    settings: settings::EditorSettings,
    settings_path: String,
    building_input: String,
    floor_input: String,
    status: Option<String>,
    command_palette: command_palette::CommandPalette,
    canvas_center_world: egui::Pos2,
    focus_label_edit: bool,
    show_help: bool,
}

impl FloorPlanApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = std::path::PathBuf::from(home).join(".config").join("sodo.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("settings.toml").exists() {
            return Some("settings.toml".to_string());
        }
        None
    }

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = Self::config_path().unwrap_or_else(|| "settings.toml".to_string());
        let settings = settings::load_settings(&settings_path)
            .or_else(|| settings::load_settings("settings.json"))
            .unwrap_or_default();
        log::info!("settings from {settings_path}");

        let store = LayoutStore::init(&settings.store_path);
        let key = LayoutKey::new(settings.building_id.clone(), settings.floor_id.clone());
        let editor = EditorController::new(store, key, editor_config(&settings));

        Self {
            editor,
            view: View::default(),
            building_input: settings.building_id.clone(),
            floor_input: settings.floor_id.clone(),
            settings,
            settings_path,
            status: None,
            command_palette: command_palette::CommandPalette::default(),
            canvas_center_world: egui::Pos2::ZERO,
            focus_label_edit: false,
            show_help: false,
        }
    }
}

fn editor_config(settings: &settings::EditorSettings) -> EditorConfig {
    EditorConfig {
        pixels_per_meter: settings.pixels_per_meter,
        grid_spacing: settings.grid_spacing,
        snap_to_grid: settings.snap_to_grid,
        building_width_m: settings.default_building_width_m,
        building_height_m: settings.default_building_height_m,
        clamp_markers_to_outline: settings.clamp_markers_to_outline,
        autosave_delay: Duration::from_millis(settings.autosave_debounce_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_round_trips_points() {
        let origin = egui::pos2(10.0, 20.0);
        let view = View {
            pan_screen: egui::vec2(5.0, -7.0),
            zoom: 2.0,
        };
        let world = egui::pos2(123.0, 45.0);
        let back = view.screen_to_world(origin, view.world_to_screen(origin, world));
        assert!((back - world).length() < 1e-4);
    }

    #[test]
    fn zoom_keeps_point_under_cursor() {
        let origin = egui::pos2(0.0, 0.0);
        let mut view = View::default();
        let cursor = egui::pos2(300.0, 200.0);
        let before = view.screen_to_world(origin, cursor);
        view.zoom_about_screen_point(origin, cursor, 1.25);
        let after = view.screen_to_world(origin, cursor);
        assert!((before - after).length() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let origin = egui::pos2(0.0, 0.0);
        let mut view = View::default();
        for _ in 0..100 {
            view.zoom_about_screen_point(origin, egui::pos2(0.0, 0.0), 1.25);
        }
        assert_eq!(view.zoom, 8.0);
    }

    fn app_in(dir: &std::path::Path) -> FloorPlanApp {
        let settings = settings::EditorSettings {
            store_path: dir.join("layouts.json").display().to_string(),
            ..settings::EditorSettings::default()
        };
        let store = LayoutStore::init(&settings.store_path);
        let key = LayoutKey::new(settings.building_id.clone(), settings.floor_id.clone());
        FloorPlanApp {
            editor: EditorController::new(store, key, editor_config(&settings)),
            view: View::default(),
            building_input: settings.building_id.clone(),
            floor_input: settings.floor_id.clone(),
            settings,
            settings_path: dir.join("sodo.toml").display().to_string(),
            status: None,
            command_palette: command_palette::CommandPalette::default(),
            canvas_center_world: egui::Pos2::ZERO,
            focus_label_edit: false,
            show_help: false,
        }
    }

    #[test]
    fn loading_a_layout_persists_its_scale() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.editor.set_pixels_per_meter(50.0);
        app.editor.save_now().unwrap();
        app.editor.set_pixels_per_meter(80.0);

        app.load_layout();
        assert_eq!(app.settings.pixels_per_meter, 50.0);
        let on_disk = settings::load_settings(&app.settings_path).unwrap();
        assert_eq!(on_disk.pixels_per_meter, 50.0);
    }

    #[test]
    fn settings_map_onto_editor_config() {
        let mut s = settings::EditorSettings::default();
        s.autosave_debounce_ms = 250;
        s.snap_to_grid = false;
        let config = editor_config(&s);
        assert_eq!(config.autosave_delay, Duration::from_millis(250));
        assert!(!config.snap_to_grid);
        assert_eq!(config.pixels_per_meter, 80.0);
    }
}
