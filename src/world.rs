//! Capability interfaces for the live world and the asset index, plus the
//! in-memory implementations used by the demo server and the tests.
//!
//! `WorldBackend` methods must only be called on the owner thread (see
//! [`crate::bridge`]). `AssetIndex` is `Send + Sync` and may be read from any
//! caller thread.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;

use crate::model::{
    AssetClass, AssetDetails, AssetFilter, AssetRecord, BoundingBox, Entity, MaterialSlot,
    Rotator, SpawnRequest, TransformUpdate, Vec3,
};

// ── Capability traits ───────────────────────────────────────────

pub trait WorldBackend: Send + 'static {
    /// Name of the currently loaded level.
    fn level_name(&self) -> String;

    /// Iterate the live entities in backend order. Cheap to call repeatedly.
    fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_>;

    fn find_entity(&self, name: &str) -> Option<&Entity>;

    /// Place a new entity. Returns a snapshot of what was spawned.
    fn spawn_entity(&mut self, request: SpawnRequest) -> Result<Entity, String>;

    /// Apply a partial transform. Returns `false` when the entity is gone.
    fn set_transform(&mut self, name: &str, update: TransformUpdate) -> bool;

    /// Remove an entity. Returns `false` when the backend refused.
    fn destroy_entity(&mut self, name: &str) -> bool;

    /// System entities that must never be deleted.
    fn is_protected(&self, name: &str) -> bool;

    /// Whether a mesh asset at `object_path` can be loaded.
    fn mesh_exists(&self, object_path: &str) -> bool;

    /// Make a newly imported mesh loadable by later spawns.
    fn register_mesh(&mut self, object_path: &str);
}

pub trait AssetIndex: Send + Sync {
    /// Snapshot of all assets whose class passes `filter`, in index order.
    fn query_by_type(&self, filter: &AssetFilter) -> Vec<AssetRecord>;

    /// Import an external file into `destination` (a content path such as
    /// `/Game/MCP_Imports/Rock`). Existing assets at that path are replaced.
    fn import_file(&self, source: &Path, destination: &str) -> Result<AssetRecord, String>;

    fn get(&self, object_path: &str) -> Option<AssetRecord>;
}

// ── In-memory world ─────────────────────────────────────────────

pub const BUILDER_BRUSH_NAME: &str = "Brush_0";
pub const WORLD_SETTINGS_NAME: &str = "WorldSettings_0";
pub const CUBE_MESH_PATH: &str = "/Engine/BasicShapes/Cube.Cube";

/// A simple world that keeps entities in insertion order.
pub struct InMemoryWorld {
    level: String,
    entities: Vec<Entity>,
    meshes: Vec<String>,
    protected: Vec<String>,
    /// Per-class counter for generated names (`StaticMeshActor_3`).
    name_counters: HashMap<String, u32>,
}

impl InMemoryWorld {
    /// An empty level containing only the protected system entities.
    pub fn new(level: impl Into<String>) -> Self {
        let mut world = Self {
            level: level.into(),
            entities: Vec::new(),
            meshes: vec![CUBE_MESH_PATH.to_string()],
            protected: vec![BUILDER_BRUSH_NAME.to_string(), WORLD_SETTINGS_NAME.to_string()],
            name_counters: HashMap::new(),
        };
        for (name, class) in [(BUILDER_BRUSH_NAME, "Brush"), (WORLD_SETTINGS_NAME, "WorldSettings")] {
            world.entities.push(Entity {
                name: name.to_string(),
                class: class.to_string(),
                label: class.to_string(),
                location: Vec3::ZERO,
                rotation: Rotator::default(),
                scale: Vec3::ONE,
                mesh: None,
            });
        }
        world
    }

    fn next_name(&mut self, class: &str) -> String {
        loop {
            let counter = self.name_counters.entry(class.to_string()).or_insert(0);
            let candidate = format!("{class}_{counter}");
            *counter += 1;
            if self.find_entity(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl WorldBackend for InMemoryWorld {
    fn level_name(&self) -> String {
        self.level.clone()
    }

    fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_> {
        Box::new(self.entities.iter())
    }

    fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    fn spawn_entity(&mut self, request: SpawnRequest) -> Result<Entity, String> {
        let name = match request.name {
            Some(name) if !name.is_empty() => {
                if self.find_entity(&name).is_some() {
                    return Err(format!("An actor named '{name}' already exists"));
                }
                name
            }
            _ => self.next_name(&request.class),
        };
        let entity = Entity {
            name,
            class: request.class,
            label: request.label,
            location: request.location,
            rotation: Rotator::default(),
            scale: Vec3::ONE,
            mesh: request.mesh,
        };
        self.entities.push(entity.clone());
        Ok(entity)
    }

    fn set_transform(&mut self, name: &str, update: TransformUpdate) -> bool {
        let Some(entity) = self.entities.iter_mut().find(|e| e.name == name) else {
            return false;
        };
        if let Some(location) = update.location {
            entity.location = location;
        }
        if let Some(rotation) = update.rotation {
            entity.rotation = rotation;
        }
        if let Some(scale) = update.scale {
            entity.scale = scale;
        }
        true
    }

    fn destroy_entity(&mut self, name: &str) -> bool {
        if self.is_protected(name) {
            return false;
        }
        let before = self.entities.len();
        self.entities.retain(|e| e.name != name);
        self.entities.len() < before
    }

    fn is_protected(&self, name: &str) -> bool {
        self.protected.iter().any(|p| p == name)
    }

    fn mesh_exists(&self, object_path: &str) -> bool {
        self.meshes.iter().any(|m| m == object_path)
    }

    fn register_mesh(&mut self, object_path: &str) {
        if !self.mesh_exists(object_path) {
            self.meshes.push(object_path.to_string());
        }
    }
}

// ── In-memory asset index ───────────────────────────────────────

const MESH_EXTENSIONS: &[&str] = &["fbx", "obj", "glb", "gltf"];
const TEXTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga"];

/// Thread-safe asset index backed by an ordered list.
#[derive(Default)]
pub struct InMemoryAssetIndex {
    records: RwLock<Vec<AssetRecord>>,
}

impl InMemoryAssetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record keyed by object path.
    pub fn insert(&self, record: AssetRecord) {
        let mut records = self.records.write();
        if let Some(existing) = records.iter_mut().find(|r| r.object_path == record.object_path) {
            *existing = record;
        } else {
            records.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl AssetIndex for InMemoryAssetIndex {
    fn query_by_type(&self, filter: &AssetFilter) -> Vec<AssetRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| filter.matches(r.class))
            .cloned()
            .collect()
    }

    fn import_file(&self, source: &Path, destination: &str) -> Result<AssetRecord, String> {
        if !source.is_file() {
            return Err(format!("Source file does not exist: {}", source.display()));
        }
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let asset_name = destination
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("Invalid destination path: {destination}"))?
            .to_string();
        let object_path = format!("{destination}.{asset_name}");

        let (class, details) = if MESH_EXTENSIONS.contains(&ext.as_str()) {
            (
                AssetClass::StaticMesh,
                AssetDetails::StaticMesh {
                    bounds: BoundingBox {
                        min: Vec3::new(-50.0, -50.0, -50.0),
                        max: Vec3::new(50.0, 50.0, 50.0),
                    },
                    material_slots: vec![MaterialSlot {
                        slot_name: "Material_0".into(),
                        default_material: None,
                    }],
                },
            )
        } else if TEXTURE_EXTENSIONS.contains(&ext.as_str()) {
            (AssetClass::Texture, AssetDetails::None)
        } else {
            return Err(format!("No importer for '.{ext}' files"));
        };

        let record = AssetRecord {
            asset_name,
            object_path,
            class,
            tags: vec!["ImportedFrom".into()],
            details,
        };
        self.insert(record.clone());
        Ok(record)
    }

    fn get(&self, object_path: &str) -> Option<AssetRecord> {
        self.records
            .read()
            .iter()
            .find(|r| r.object_path == object_path)
            .cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn spawn(world: &mut InMemoryWorld, name: Option<&str>) -> Entity {
        world
            .spawn_entity(SpawnRequest {
                class: "StaticMeshActor".into(),
                name: name.map(String::from),
                location: Vec3::new(1.0, 2.0, 3.0),
                mesh: None,
                label: "Label".into(),
            })
            .unwrap()
    }

    #[test]
    fn test_new_world_has_protected_entities() {
        let world = InMemoryWorld::new("Level");
        assert_eq!(world.entities().count(), 2);
        assert!(world.is_protected(BUILDER_BRUSH_NAME));
        assert!(world.mesh_exists(CUBE_MESH_PATH));
    }

    #[test]
    fn test_generated_names_are_unique() {
        let mut world = InMemoryWorld::new("Level");
        let a = spawn(&mut world, None);
        let b = spawn(&mut world, None);
        assert_eq!(a.name, "StaticMeshActor_0");
        assert_eq!(b.name, "StaticMeshActor_1");
    }

    #[test]
    fn test_requested_name_collision_fails() {
        let mut world = InMemoryWorld::new("Level");
        spawn(&mut world, Some("Rock"));
        let err = world
            .spawn_entity(SpawnRequest {
                class: "StaticMeshActor".into(),
                name: Some("Rock".into()),
                location: Vec3::ZERO,
                mesh: None,
                label: String::new(),
            })
            .unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_register_mesh_makes_it_loadable_once() {
        let mut world = InMemoryWorld::new("Level");
        let path = "/Game/MCP_Imports/Boulder.Boulder";
        assert!(!world.mesh_exists(path));
        world.register_mesh(path);
        world.register_mesh(path);
        assert!(world.mesh_exists(path));
        assert_eq!(world.meshes.iter().filter(|m| m.as_str() == path).count(), 1);
    }

    #[test]
    fn test_destroy_refuses_protected() {
        let mut world = InMemoryWorld::new("Level");
        assert!(!world.destroy_entity(BUILDER_BRUSH_NAME));
        let e = spawn(&mut world, None);
        assert!(world.destroy_entity(&e.name));
        assert!(!world.destroy_entity(&e.name));
    }

    #[test]
    fn test_set_transform_partial() {
        let mut world = InMemoryWorld::new("Level");
        let e = spawn(&mut world, None);
        assert!(world.set_transform(
            &e.name,
            TransformUpdate {
                scale: Some(Vec3::new(2.0, 2.0, 2.0)),
                ..TransformUpdate::default()
            }
        ));
        let updated = world.find_entity(&e.name).unwrap();
        assert_eq!(updated.location, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(updated.scale, Vec3::new(2.0, 2.0, 2.0));
        assert!(!world.set_transform("missing", TransformUpdate::default()));
    }

    #[test]
    fn test_import_creates_static_mesh_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Rock.fbx");
        std::fs::write(&file, b"mesh").unwrap();

        let index = InMemoryAssetIndex::new();
        let rec = index.import_file(&file, "/Game/MCP_Imports/Rock").unwrap();
        assert_eq!(rec.object_path, "/Game/MCP_Imports/Rock.Rock");
        assert_eq!(rec.class, AssetClass::StaticMesh);

        index.import_file(&file, "/Game/MCP_Imports/Rock").unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("/Game/MCP_Imports/Rock.Rock").is_some());
    }

    #[test]
    fn test_import_rejects_missing_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let index = InMemoryAssetIndex::new();
        assert!(index
            .import_file(&dir.path().join("nope.fbx"), "/Game/X/nope")
            .is_err());

        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(index.import_file(&file, "/Game/X/notes").is_err());
        assert!(index.is_empty());
    }
}
