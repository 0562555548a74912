use crate::model::{
    AssetClass, AssetDetails, AssetRecord, BoundingBox, MaterialSlot, Rotator, SpawnRequest, Vec3,
};
use crate::world::{InMemoryAssetIndex, InMemoryWorld, WorldBackend, CUBE_MESH_PATH};

pub const DEMO_LEVEL: &str = "DemoLevel";

const ROCK_MESH: &str = "/Game/Environment/SM_Rock.SM_Rock";
const TREE_MESH: &str = "/Game/Environment/SM_Tree.SM_Tree";
const CHAIR_MESH: &str = "/Game/Props/SM_Chair.SM_Chair";

fn mesh_record(name: &str, object_path: &str, half_extent: Vec3, slots: &[&str]) -> AssetRecord {
    AssetRecord {
        asset_name: name.to_string(),
        object_path: object_path.to_string(),
        class: AssetClass::StaticMesh,
        tags: vec!["Environment".into()],
        details: AssetDetails::StaticMesh {
            bounds: BoundingBox {
                min: Vec3::new(-half_extent.x, -half_extent.y, 0.0),
                max: Vec3::new(half_extent.x, half_extent.y, half_extent.z * 2.0),
            },
            material_slots: slots
                .iter()
                .map(|slot| MaterialSlot {
                    slot_name: (*slot).to_string(),
                    default_material: Some(format!("/Game/Materials/M_{slot}.M_{slot}")),
                })
                .collect(),
        },
    }
}

fn plain_record(name: &str, object_path: &str, class: AssetClass) -> AssetRecord {
    AssetRecord {
        asset_name: name.to_string(),
        object_path: object_path.to_string(),
        class,
        tags: Vec::new(),
        details: AssetDetails::None,
    }
}

/// An asset index with a handful of meshes, materials and a blueprint.
pub fn create_demo_assets() -> InMemoryAssetIndex {
    let index = InMemoryAssetIndex::new();
    index.insert(mesh_record("SM_Rock", ROCK_MESH, Vec3::new(60.0, 45.0, 30.0), &["Stone"]));
    index.insert(mesh_record("SM_Tree", TREE_MESH, Vec3::new(120.0, 120.0, 350.0), &["Bark", "Leaves"]));
    index.insert(mesh_record("SM_Chair", CHAIR_MESH, Vec3::new(40.0, 40.0, 45.0), &["Wood"]));
    index.insert(mesh_record("Cube", CUBE_MESH_PATH, Vec3::new(50.0, 50.0, 50.0), &["Default"]));
    index.insert(plain_record("M_Stone", "/Game/Materials/M_Stone.M_Stone", AssetClass::Material));
    index.insert(plain_record(
        "MI_Stone_Wet",
        "/Game/Materials/MI_Stone_Wet.MI_Stone_Wet",
        AssetClass::MaterialInstanceConstant,
    ));
    index.insert(plain_record("BP_Door", "/Game/Blueprints/BP_Door.BP_Door", AssetClass::Blueprint));
    index.insert(plain_record("T_Noise", "/Game/Textures/T_Noise.T_Noise", AssetClass::Texture));
    index
}

/// A small level: a floor, some rocks along a path, a tree and a chair.
#[allow(clippy::cast_precision_loss)]
pub fn create_demo_world() -> InMemoryWorld {
    let mut world = InMemoryWorld::new(DEMO_LEVEL);
    for mesh in [ROCK_MESH, TREE_MESH, CHAIR_MESH] {
        world.register_mesh(mesh);
    }

    let mut place = |label: &str, mesh: &str, location: Vec3| {
        let spawned = world.spawn_entity(SpawnRequest {
            class: "StaticMeshActor".into(),
            name: None,
            location,
            mesh: Some(mesh.to_string()),
            label: label.to_string(),
        });
        if let Err(e) = spawned {
            tracing::warn!(%label, error = %e, "demo actor not placed");
        }
    };

    place("Floor", CUBE_MESH_PATH, Vec3::new(0.0, 0.0, -5.0));
    for i in 0..5 {
        let x = i as f64 * 250.0;
        place(&format!("Rock_{i}"), ROCK_MESH, Vec3::new(x, 150.0, 0.0));
    }
    place("Tree", TREE_MESH, Vec3::new(600.0, -300.0, 0.0));
    place("Chair", CHAIR_MESH, Vec3::new(-120.0, 40.0, 0.0));

    // Give the tree a slight lean so rotations show up in listings.
    let tree = world.entities().find(|e| e.label == "Tree").map(|e| e.name.clone());
    if let Some(tree) = tree {
        world.set_transform(
            &tree,
            crate::model::TransformUpdate {
                rotation: Some(Rotator::from([0.0, 35.0, 2.0])),
                ..Default::default()
            },
        );
    }
    world
}
