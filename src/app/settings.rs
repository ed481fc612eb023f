use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(super) struct EditorSettings {
    pub store_path: String,
    pub svg_path: String,
    pub building_id: String,
    pub floor_id: String,
    pub pixels_per_meter: f32,
    pub grid_spacing: f32,
    pub snap_to_grid: bool,
    pub autosave_debounce_ms: u64,
    pub default_building_width_m: f32,
    pub default_building_height_m: f32,
    pub clamp_markers_to_outline: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            store_path: "floor_layouts.json".to_string(),
            svg_path: "floor_plan.svg".to_string(),
            building_id: "A".to_string(),
            floor_id: "1".to_string(),
            pixels_per_meter: 80.0,
            grid_spacing: 40.0,
            snap_to_grid: true,
            autosave_debounce_ms: 500,
            default_building_width_m: 18.0,
            default_building_height_m: 10.0,
            clamp_markers_to_outline: true,
        }
    }
}

pub(super) fn load_settings(path: &str) -> Option<EditorSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    parse_settings(path, &s)
}

fn parse_settings(path: &str, s: &str) -> Option<EditorSettings> {
    if path.ends_with(".toml") {
        toml::from_str::<EditorSettings>(s)
            .ok()
            .or_else(|| serde_json::from_str::<EditorSettings>(s).ok())
    } else {
        serde_json::from_str::<EditorSettings>(s)
            .ok()
            .or_else(|| toml::from_str::<EditorSettings>(s).ok())
    }
}

pub(super) fn save_settings(path: &str, settings: &EditorSettings) -> Result<(), String> {
    if path.ends_with(".toml") {
        let toml = toml::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, toml).map_err(|e| e.to_string())
    } else {
        let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| e.to_string())
    }
}
