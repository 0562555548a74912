//! World and asset data types shared by the backends and the command handlers.

use serde::{Deserialize, Serialize};

// ── Spatial types ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Euler rotation in degrees. Wire order is `[pitch, yaw, roll]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotator {
    pub fn to_array(self) -> [f64; 3] {
        [self.pitch, self.yaw, self.roll]
    }
}

impl From<[f64; 3]> for Rotator {
    fn from([pitch, yaw, roll]: [f64; 3]) -> Self {
        Self { pitch, yaw, roll }
    }
}

// ── Entities ────────────────────────────────────────────────────

/// A placed object in the live world.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// Unique, engine-assigned identifier.
    pub name: String,
    /// Class name, e.g. `StaticMeshActor`.
    pub class: String,
    /// User-facing display label.
    pub label: String,
    pub location: Vec3,
    pub rotation: Rotator,
    pub scale: Vec3,
    /// Object path of the bound mesh asset, if any.
    pub mesh: Option<String>,
}

/// Everything the world needs to place a new entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub class: String,
    /// Requested unique name. `None` lets the backend generate one.
    pub name: Option<String>,
    pub location: Vec3,
    pub mesh: Option<String>,
    pub label: String,
}

/// Partial transform update. Absent fields are left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformUpdate {
    pub location: Option<Vec3>,
    pub rotation: Option<Rotator>,
    pub scale: Option<Vec3>,
}

impl TransformUpdate {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

// ── Assets ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    StaticMesh,
    Blueprint,
    Material,
    MaterialInstanceConstant,
    Texture,
}

impl AssetClass {
    pub fn name(self) -> &'static str {
        match self {
            Self::StaticMesh => "StaticMesh",
            Self::Blueprint => "Blueprint",
            Self::Material => "Material",
            Self::MaterialInstanceConstant => "MaterialInstanceConstant",
            Self::Texture => "Texture2D",
        }
    }

    /// Fully qualified class path, e.g. `/Script/Engine.StaticMesh`.
    pub fn class_path(self) -> String {
        format!("/Script/Engine.{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn size(&self) -> Vec3 {
        Vec3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSlot {
    pub slot_name: String,
    pub default_material: Option<String>,
}

/// Type-specific data only some asset kinds carry.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetDetails {
    StaticMesh {
        bounds: BoundingBox,
        material_slots: Vec<MaterialSlot>,
    },
    None,
}

/// One entry in the persistent asset index.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub asset_name: String,
    pub object_path: String,
    pub class: AssetClass,
    /// Metadata tag keys attached to the asset.
    pub tags: Vec<String>,
    pub details: AssetDetails,
}

/// Class filter derived from a caller-supplied type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetFilter {
    Classes(Vec<AssetClass>),
    /// Unknown tag: no class restriction.
    Any,
}

impl AssetFilter {
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "StaticMesh" => Self::Classes(vec![AssetClass::StaticMesh]),
            "Blueprint" => Self::Classes(vec![AssetClass::Blueprint]),
            // Both plain materials and material instances.
            "Material" => Self::Classes(vec![
                AssetClass::Material,
                AssetClass::MaterialInstanceConstant,
            ]),
            _ => Self::Any,
        }
    }

    pub fn matches(&self, class: AssetClass) -> bool {
        match self {
            Self::Classes(classes) => classes.contains(&class),
            Self::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_filter_includes_instances() {
        let f = AssetFilter::from_type_tag("Material");
        assert!(f.matches(AssetClass::Material));
        assert!(f.matches(AssetClass::MaterialInstanceConstant));
        assert!(!f.matches(AssetClass::StaticMesh));
    }

    #[test]
    fn test_unknown_tag_matches_everything() {
        let f = AssetFilter::from_type_tag("Sound");
        assert_eq!(f, AssetFilter::Any);
        assert!(f.matches(AssetClass::Texture));
    }

    #[test]
    fn test_bounding_box_size() {
        let b = BoundingBox {
            min: Vec3::new(-50.0, -50.0, 0.0),
            max: Vec3::new(50.0, 50.0, 100.0),
        };
        assert_eq!(b.size(), Vec3::new(100.0, 100.0, 100.0));
    }
}
