#![allow(clippy::needless_pass_by_value)]

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AppError;
use crate::model::{AssetClass, SpawnRequest, Vec3};
use crate::paths;
use crate::registry::params::ImportAssetParams;
use crate::registry::validation::asset_name_from_path;
use crate::response::Response;
use crate::state::AppState;

use super::edit::spawn_name;

const IMPORT_FAILED: &str = "Failed to import asset or spawn actor in Unreal Engine. Check logs.";

/// Import a mesh file and place an actor named after it. Import and spawn
/// are reported as one outcome; an import that yields anything other than a
/// static mesh is a failure.
pub fn import_asset(state: &Arc<AppState>, p: ImportAssetParams) -> Result<Response, AppError> {
    let Some(file_path) = p.file_path else {
        tracing::warn!("import_asset called without file_path");
        return Ok(Response::failed("Missing 'file_path' parameter."));
    };

    let asset_name = match asset_name_from_path(&file_path) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(%file_path, error = %e, "cannot derive asset name");
            return Ok(Response::failed(IMPORT_FAILED));
        }
    };
    let destination = paths::content_destination(&state.settings.import_root, &asset_name);
    let location = p.location.map_or(Vec3::ZERO, Vec3::from);
    let source = PathBuf::from(&file_path);
    let assets = Arc::clone(&state.assets);

    let outcome = state.with_world_mut("import_asset", move |world| -> Result<String, String> {
        let record = assets.import_file(&source, &destination)?;
        if record.class != AssetClass::StaticMesh {
            return Err(format!(
                "imported asset {} is a {}, not a static mesh",
                record.object_path,
                record.class.name()
            ));
        }
        world.register_mesh(&record.object_path);
        let name = spawn_name(world, record.asset_name.clone());
        let actor = world.spawn_entity(SpawnRequest {
            class: "StaticMeshActor".into(),
            name,
            location,
            mesh: Some(record.object_path.clone()),
            label: record.asset_name.clone(),
        })?;
        tracing::info!(actor = %actor.name, mesh = %record.object_path, "placed imported mesh");
        Ok(record.object_path)
    })?;

    match outcome {
        Ok(object_path) => {
            tracing::info!(%file_path, %object_path, "asset imported");
            Ok(Response::success(serde_json::json!({ "name": object_path })))
        }
        Err(message) => {
            tracing::error!(%file_path, %message, "import failed");
            Ok(Response::failed(IMPORT_FAILED))
        }
    }
}
