//! Durable map of `(building, floor)` to a saved floor layout.
//!
//! The whole map lives in one JSON document under a fixed namespace and is
//! rewritten on every save with the write-rename pattern, so a reader never
//! sees a half-written file. Anything unreadable on disk is treated as an
//! empty store.

use crate::model::{LayoutKey, LayoutRecord, Scene, ViewMeta};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub(super) const NAMESPACE: &str = "sodo.floor-layouts";

/// building id -> floor id -> record
pub(super) type LayoutMap = BTreeMap<String, BTreeMap<String, LayoutRecord>>;

#[derive(Serialize, Deserialize)]
struct LayoutFile {
    namespace: String,
    #[serde(default)]
    layouts: LayoutMap,
}

#[derive(Debug)]
pub(super) enum StoreError {
    Io(io::Error),
    Encode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Encode(msg) => write!(f, "Encoding error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Encode(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub(super) struct LayoutStore {
    path: Option<PathBuf>,
    layouts: LayoutMap,
    unwritten: bool,
}

impl LayoutStore {
    /// Reads the namespace from `path`. Missing or malformed files start empty.
    pub fn init(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let layouts = read_layouts(&path);
        info!(
            "layout store {}: {} building(s)",
            path.display(),
            layouts.len()
        );
        Self {
            path: Some(path),
            layouts,
            unwritten: false,
        }
    }

    /// Store without a backing file; writes only touch memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            layouts: LayoutMap::new(),
            unwritten: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self, key: &LayoutKey) -> Option<LayoutRecord> {
        self.layouts
            .get(&key.building_id)
            .and_then(|floors| floors.get(&key.floor_id))
            .cloned()
    }

    /// Overwrites the entry for `key` and persists the whole map.
    pub fn save(&mut self, key: &LayoutKey, scene: &Scene, meta: ViewMeta) -> Result<(), StoreError> {
        let record = LayoutRecord {
            building_id: key.building_id.clone(),
            floor_id: key.floor_id.clone(),
            scene: scene.clone(),
            meta,
        };
        self.layouts
            .entry(key.building_id.clone())
            .or_default()
            .insert(key.floor_id.clone(), record);
        self.unwritten = true;
        debug!("saving layout for {key}");
        self.write()
    }

    /// Replaces every stored layout in a single write.
    pub fn save_all(&mut self, layouts: LayoutMap) -> Result<(), StoreError> {
        self.layouts = layouts;
        self.unwritten = true;
        self.write()
    }

    pub fn keys(&self) -> Vec<LayoutKey> {
        self.layouts
            .iter()
            .flat_map(|(building, floors)| {
                floors
                    .keys()
                    .map(move |floor| LayoutKey::new(building.clone(), floor.clone()))
            })
            .collect()
    }

    /// True when the last write did not reach disk.
    pub fn has_unwritten(&self) -> bool {
        self.unwritten
    }

    /// Retries a write that failed earlier. No-op when the file is current.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if !self.unwritten {
            return Ok(());
        }
        self.write()
    }

    fn write(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            self.unwritten = false;
            return Ok(());
        };
        let file = LayoutFile {
            namespace: NAMESPACE.to_string(),
            layouts: self.layouts.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| StoreError::Encode(e.to_string()))?;
        atomic_write(path, json.as_bytes())?;
        self.unwritten = false;
        Ok(())
    }
}

fn read_layouts(path: &Path) -> LayoutMap {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no layout file at {}", path.display());
            return LayoutMap::new();
        }
        Err(e) => {
            warn!("cannot read layout file {}: {e}", path.display());
            return LayoutMap::new();
        }
    };
    match serde_json::from_str::<LayoutFile>(&text) {
        Ok(file) if file.namespace == NAMESPACE => drop_misfiled(file.layouts),
        Ok(file) => {
            warn!(
                "layout file {} has namespace {:?}, expected {NAMESPACE:?}; starting empty",
                path.display(),
                file.namespace
            );
            LayoutMap::new()
        }
        Err(e) => {
            warn!("layout file {} is malformed ({e}); starting empty", path.display());
            LayoutMap::new()
        }
    }
}

/// Keeps only records whose own building/floor match where they are filed.
fn drop_misfiled(mut layouts: LayoutMap) -> LayoutMap {
    for (building, floors) in layouts.iter_mut() {
        floors.retain(|floor, record| {
            let key = record.key();
            let filed = key.building_id == *building && key.floor_id == *floor;
            if !filed {
                warn!("skipping record for {key} filed under building {building}, floor {floor}");
            }
            filed
        });
    }
    layouts.retain(|_, floors| !floors.is_empty());
    layouts
}

/// Writes to `{path}.tmp`, syncs, then renames over `path`.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BuildingOutline, Edge, LineStyle, Marker, MarkerKind, OutlineStyle, Point, Size,
    };

    fn sample_scene() -> Scene {
        Scene {
            outline: Some(BuildingOutline {
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(1440.0, 0.0),
                    Point::new(1440.0, 800.0),
                    Point::new(0.0, 800.0),
                ],
                style: OutlineStyle::default(),
            }),
            markers: vec![Marker {
                id: 1,
                kind: MarkerKind::Door,
                position: Point::new(40.0, 80.0),
                size: Size {
                    width: 70.0,
                    height: 40.0,
                },
                label: "Cửa chính".to_string(),
            }],
            edges: vec![Edge {
                source: 1,
                target: 0,
                style: LineStyle::Dashed,
            }],
        }
    }

    fn meta() -> ViewMeta {
        ViewMeta {
            pixels_per_meter: 80.0,
            grid_spacing_pixels: 40.0,
            saved_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn load_of_unknown_key_is_none() {
        let store = LayoutStore::in_memory();
        assert!(store.load(&LayoutKey::new("A", "1")).is_none());
    }

    #[test]
    fn save_then_load_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        let key = LayoutKey::new("A", "3");

        let mut store = LayoutStore::init(&path);
        store.save(&key, &sample_scene(), meta()).unwrap();
        assert!(!dir.path().join("layouts.json.tmp").exists());

        let reopened = LayoutStore::init(&path);
        let record = reopened.load(&key).unwrap();
        assert_eq!(record.scene, sample_scene());
        assert_eq!(record.meta, meta());
        assert_eq!(record.key(), key);
    }

    #[test]
    fn save_overwrites_last_write_wins() {
        let mut store = LayoutStore::in_memory();
        let key = LayoutKey::new("A", "1");
        store.save(&key, &sample_scene(), meta()).unwrap();
        store.save(&key, &Scene::default(), meta()).unwrap();
        assert_eq!(store.load(&key).unwrap().scene, Scene::default());
        assert_eq!(store.keys(), vec![key]);
    }

    #[test]
    fn file_is_nested_by_building_then_floor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        let mut store = LayoutStore::init(&path);
        store
            .save(&LayoutKey::new("B", "2"), &sample_scene(), meta())
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["namespace"], NAMESPACE);
        let record = &raw["layouts"]["B"]["2"];
        assert_eq!(record["buildingId"], "B");
        assert_eq!(record["scene"]["markers"][0]["kind"], "door");
        assert_eq!(record["scene"]["edges"][0]["source"], 1);
        assert_eq!(record["meta"]["savedAt"], 1_700_000_000_000u64);
    }

    #[test]
    fn misfiled_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        let mut store = LayoutStore::init(&path);
        store.save(&LayoutKey::new("B", "2"), &sample_scene(), meta()).unwrap();
        store.save(&LayoutKey::new("B", "4"), &Scene::default(), meta()).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let moved = raw["layouts"]["B"]["2"].take();
        raw["layouts"]["B"]["3"] = moved;
        raw["layouts"]["B"].as_object_mut().unwrap().remove("2");
        fs::write(&path, raw.to_string()).unwrap();

        let reopened = LayoutStore::init(&path);
        assert_eq!(reopened.keys(), vec![LayoutKey::new("B", "4")]);
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        fs::write(&path, "{ not json").unwrap();
        let store = LayoutStore::init(&path);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn foreign_namespace_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        fs::write(&path, r#"{"namespace":"something-else","layouts":{}}"#).unwrap();
        assert!(LayoutStore::init(&path).keys().is_empty());
    }

    #[test]
    fn save_all_replaces_the_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/layouts.json");
        let mut store = LayoutStore::init(&path);
        store
            .save(&LayoutKey::new("A", "1"), &sample_scene(), meta())
            .unwrap();

        let mut map = LayoutMap::new();
        let record = LayoutRecord {
            building_id: "C".to_string(),
            floor_id: "7".to_string(),
            scene: Scene::default(),
            meta: meta(),
        };
        map.entry("C".to_string())
            .or_default()
            .insert("7".to_string(), record);
        store.save_all(map).unwrap();

        let reopened = LayoutStore::init(&path);
        assert!(reopened.load(&LayoutKey::new("A", "1")).is_none());
        assert!(reopened.load(&LayoutKey::new("C", "7")).is_some());
    }

    #[test]
    fn flush_is_a_noop_when_current() {
        let mut store = LayoutStore::in_memory();
        assert!(store.flush().is_ok());
    }
}
