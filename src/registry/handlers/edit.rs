#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use rand::Rng;

use crate::error::AppError;
use crate::model::{SpawnRequest, TransformUpdate};
use crate::registry::params::{CreateObjectParams, ModifyObjectParams, NameParams};
use crate::registry::validation::validate_non_empty;
use crate::response::Response;
use crate::state::AppState;
use crate::world::{WorldBackend, CUBE_MESH_PATH};

// ── Supported kinds ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    StaticMeshActor,
    Cube,
}

impl ObjectKind {
    /// `StaticMeshActor` must match exactly; `cube` in any case.
    fn parse(kind: &str) -> Result<Self, AppError> {
        if kind == "StaticMeshActor" {
            Ok(Self::StaticMeshActor)
        } else if kind.eq_ignore_ascii_case("cube") {
            Ok(Self::Cube)
        } else {
            Err(AppError::UnsupportedKind {
                what: "actor type".into(),
                kind: kind.to_string(),
            })
        }
    }

    fn label_prefix(self) -> &'static str {
        match self {
            Self::StaticMeshActor => "MCP_StaticMesh",
            Self::Cube => "MCP_Cube",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::StaticMeshActor => "Failed to create StaticMeshActor",
            Self::Cube => "Failed to create cube",
        }
    }
}

fn generated_label(kind: ObjectKind) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("{}_{suffix}", kind.label_prefix())
}

/// The requested name when it is free, otherwise let the world pick one.
pub(crate) fn spawn_name(world: &dyn WorldBackend, requested: String) -> Option<String> {
    world.find_entity(&requested).is_none().then_some(requested)
}

// ── Handlers ────────────────────────────────────────────────────

pub fn create_object(state: &Arc<AppState>, p: CreateObjectParams) -> Result<Response, AppError> {
    let kind = ObjectKind::parse(&p.kind)?;
    validate_non_empty(&p.name, "name")?;

    let location = p.location();
    let label = p
        .label
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| generated_label(kind));
    let name = p.name;
    let mesh = p.mesh;

    let spawned = state.with_world_mut("create_object", move |world| {
        let mesh = match kind {
            ObjectKind::Cube => {
                if !world.mesh_exists(CUBE_MESH_PATH) {
                    tracing::warn!("cube mesh is not available");
                    return Err(kind.failure_message().to_string());
                }
                Some(CUBE_MESH_PATH.to_string())
            }
            ObjectKind::StaticMeshActor => match mesh.filter(|m| !m.is_empty()) {
                Some(m) if world.mesh_exists(&m) => Some(m),
                Some(m) => {
                    tracing::warn!(mesh = %m, "failed to load mesh, leaving actor empty");
                    None
                }
                None => None,
            },
        };
        let request = SpawnRequest {
            class: "StaticMeshActor".into(),
            name: spawn_name(world, name),
            location,
            mesh,
            label,
        };
        world.spawn_entity(request).map_err(|e| {
            tracing::error!(error = %e, "spawn failed");
            kind.failure_message().to_string()
        })
    })?;

    match spawned {
        Ok(entity) => {
            tracing::info!(name = %entity.name, label = %entity.label, ?location, "created actor");
            Ok(Response::success(serde_json::json!({
                "name": entity.name,
                "label": entity.label,
            })))
        }
        Err(message) => Ok(Response::error(message)),
    }
}

pub fn modify_object(state: &Arc<AppState>, p: ModifyObjectParams) -> Result<Response, AppError> {
    let update = TransformUpdate {
        location: p.location(),
        rotation: p.rotation(),
        scale: p.scale(),
    };
    let name = p.name.clone();

    // Ok(false): actor exists but nothing to apply.
    let applied = state.with_world_mut("modify_object", move |world| {
        if world.find_entity(&name).is_none() {
            return Err(AppError::actor_not_found(name));
        }
        if update.is_empty() {
            return Ok(false);
        }
        if world.set_transform(&name, update) {
            Ok(true)
        } else {
            Err(AppError::actor_not_found(name))
        }
    })??;

    if applied {
        tracing::info!(name = %p.name, ?update, "updated actor transform");
        Ok(Response::success(serde_json::json!({ "name": p.name })))
    } else {
        tracing::warn!(name = %p.name, "no modifications specified");
        Ok(Response::warning("No modifications specified"))
    }
}

pub fn delete_object(state: &Arc<AppState>, p: NameParams) -> Result<Response, AppError> {
    let name = p.name.clone();
    state.with_world_mut("delete_object", move |world| {
        if world.find_entity(&name).is_none() {
            return Err(AppError::actor_not_found(name));
        }
        if world.is_protected(&name) {
            return Err(AppError::ProtectedEntity { name });
        }
        if world.destroy_entity(&name) {
            Ok(())
        } else {
            Err(AppError::backend(format!("Failed to delete actor: {name}")))
        }
    })??;

    tracing::info!(name = %p.name, "deleted actor");
    Ok(Response::ok())
}
