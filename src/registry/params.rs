use schemars::JsonSchema;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::model::{Rotator, Vec3};

use super::validation::validate_finite_vector;

// ── Raw params accessor ─────────────────────────────────────────

/// The `params` object of a request with typed, field-specific accessors.
///
/// `null` is treated the same as an absent field. A present field of the
/// wrong shape is reported as "Invalid", never as "Missing".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map.clone())),
            _ => Err(AppError::validation("'params' must be an object")),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn require_str(&self, key: &str) -> Result<&str, AppError> {
        self.opt_str(key)?.ok_or_else(|| missing(key))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, AppError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(invalid(key, "expected a string")),
        }
    }

    pub fn require_triple(&self, key: &str) -> Result<[f64; 3], AppError> {
        self.opt_triple(key)?.ok_or_else(|| missing(key))
    }

    /// A `[x, y, z]` array of three finite numbers.
    pub fn opt_triple(&self, key: &str) -> Result<Option<[f64; 3]>, AppError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let expected = || invalid(key, "expected an array of 3 numbers");
        let items = value.as_array().ok_or_else(expected)?;
        let [x, y, z] = items.as_slice() else {
            return Err(expected());
        };
        let triple = [
            x.as_f64().ok_or_else(expected)?,
            y.as_f64().ok_or_else(expected)?,
            z.as_f64().ok_or_else(expected)?,
        ];
        validate_finite_vector(triple, key)?;
        Ok(Some(triple))
    }

    pub fn opt_object(&self, key: &str) -> Result<Option<Params>, AppError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Params(map.clone()))),
            Some(_) => Err(invalid(key, "expected an object")),
        }
    }
}

fn missing(key: &str) -> AppError {
    AppError::validation(format!("Missing '{key}' field"))
}

fn invalid(key: &str, detail: &str) -> AppError {
    AppError::validation(format!("Invalid '{key}' field: {detail}"))
}

/// Typed extraction of a param struct from raw request params.
pub trait FromParams: Sized {
    fn from_params(params: &Params) -> Result<Self, AppError>;
}

// ── Command params ──────────────────────────────────────────────

/// For commands that take no parameters. Extra fields are ignored.
#[derive(Debug, Clone, Default, JsonSchema)]
pub struct NoParams {}

impl FromParams for NoParams {
    fn from_params(_: &Params) -> Result<Self, AppError> {
        Ok(Self {})
    }
}

#[derive(Debug, Clone, JsonSchema)]
pub struct GetAssetInfoParams {
    /// Asset type tag: `StaticMesh`, `Blueprint` or `Material`. Other values
    /// list every asset.
    #[serde(rename = "type")]
    pub asset_type: String,
}

impl FromParams for GetAssetInfoParams {
    fn from_params(p: &Params) -> Result<Self, AppError> {
        Ok(Self {
            asset_type: p.require_str("type")?.to_string(),
        })
    }
}

#[derive(Debug, Clone, JsonSchema)]
pub struct ImportAssetParams {
    /// Path of the file to import (fbx, obj, glb, gltf, or an image). Required;
    /// its absence is reported as a failed import rather than a validation error.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Where to place the actor for an imported mesh. Defaults to the origin.
    #[serde(default)]
    pub location: Option<[f64; 3]>,
}

impl FromParams for ImportAssetParams {
    fn from_params(p: &Params) -> Result<Self, AppError> {
        Ok(Self {
            file_path: p.opt_str("file_path")?.map(String::from),
            location: p.opt_triple("location")?,
        })
    }
}

#[derive(Debug, Clone, JsonSchema)]
pub struct CreateObjectParams {
    /// `StaticMeshActor` (exact) or `cube` (any case).
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub location: [f64; 3],
    /// Mesh asset path for a `StaticMeshActor`.
    #[serde(default)]
    pub mesh: Option<String>,
    /// Display label. Generated when omitted.
    #[serde(default)]
    pub label: Option<String>,
}

impl FromParams for CreateObjectParams {
    fn from_params(p: &Params) -> Result<Self, AppError> {
        Ok(Self {
            kind: p.require_str("type")?.to_string(),
            name: p.require_str("name")?.to_string(),
            location: p.require_triple("location")?,
            mesh: p.opt_str("mesh")?.map(String::from),
            label: p.opt_str("label")?.map(String::from),
        })
    }
}

impl CreateObjectParams {
    pub fn location(&self) -> Vec3 {
        Vec3::from(self.location)
    }
}

#[derive(Debug, Clone, JsonSchema)]
pub struct ModifyObjectParams {
    pub name: String,
    #[serde(default)]
    pub location: Option<[f64; 3]>,
    /// `[pitch, yaw, roll]` in degrees.
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
    #[serde(default)]
    pub scale: Option<[f64; 3]>,
}

impl FromParams for ModifyObjectParams {
    fn from_params(p: &Params) -> Result<Self, AppError> {
        Ok(Self {
            name: p.require_str("name")?.to_string(),
            location: p.opt_triple("location")?,
            rotation: p.opt_triple("rotation")?,
            scale: p.opt_triple("scale")?,
        })
    }
}

impl ModifyObjectParams {
    pub fn location(&self) -> Option<Vec3> {
        self.location.map(Vec3::from)
    }

    pub fn rotation(&self) -> Option<Rotator> {
        self.rotation.map(Rotator::from)
    }

    pub fn scale(&self) -> Option<Vec3> {
        self.scale.map(Vec3::from)
    }
}

#[derive(Debug, Clone, JsonSchema)]
pub struct NameParams {
    pub name: String,
}

impl FromParams for NameParams {
    fn from_params(p: &Params) -> Result<Self, AppError> {
        Ok(Self {
            name: p.require_str("name")?.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, JsonSchema)]
pub struct ExecutePythonParams {
    /// Inline Python source.
    #[serde(default)]
    pub code: Option<String>,
    /// Path to a Python file. Used when `code` is absent.
    #[serde(default)]
    pub file: Option<String>,
    /// Legacy envelope: `{ "data": { "code": ... } }`.
    #[serde(default)]
    pub data: Option<ExecutePythonData>,
}

#[derive(Debug, Clone, Default, JsonSchema)]
pub struct ExecutePythonData {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

impl FromParams for ExecutePythonParams {
    fn from_params(p: &Params) -> Result<Self, AppError> {
        let data = p
            .opt_object("data")?
            .map(|d| -> Result<_, AppError> {
                Ok(ExecutePythonData {
                    code: d.opt_str("code")?.map(String::from),
                    file: d.opt_str("file")?.map(String::from),
                })
            })
            .transpose()?;
        Ok(Self {
            code: p.opt_str("code")?.map(String::from),
            file: p.opt_str("file")?.map(String::from),
            data,
        })
    }
}
