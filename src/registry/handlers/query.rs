#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use serde_json::{json, Value};

use crate::enumerate::enumerate_bounded;
use crate::error::AppError;
use crate::model::{AssetDetails, AssetFilter, AssetRecord, Entity};
use crate::registry::params::{GetAssetInfoParams, NoParams};
use crate::response::Response;
use crate::state::AppState;

fn actor_summary(entity: &Entity) -> Value {
    json!({
        "name": entity.name,
        "type": entity.class,
        "label": entity.label,
        "location": entity.location.to_array(),
    })
}

fn asset_summary(record: &AssetRecord) -> Value {
    let mut info = json!({
        "AssetName": record.asset_name,
        "ObjectPath": record.object_path,
        "AssetClass": record.class.class_path(),
        "tags": record.tags,
    });
    if let AssetDetails::StaticMesh {
        bounds,
        material_slots,
    } = &record.details
    {
        info["dimensions"] = json!({
            "min": bounds.min.to_array(),
            "max": bounds.max.to_array(),
            "size": bounds.size().to_array(),
        });
        info["material_slots"] = material_slots
            .iter()
            .map(|slot| {
                let mut s = json!({ "slot_name": slot.slot_name });
                if let Some(material) = &slot.default_material {
                    s["default_material"] = json!(material);
                }
                s
            })
            .collect();
    }
    info
}

/// Live world state is only readable on the owner thread, so the whole
/// listing happens in one bridged call.
pub fn get_scene_info(state: &Arc<AppState>, _: NoParams) -> Result<Response, AppError> {
    let limit = state.settings.max_actors_in_scene_info;
    let (level, listing) = state.with_world("get_scene_info", move |world| {
        let listing = enumerate_bounded(|| world.entities(), limit, actor_summary)?;
        Ok::<_, AppError>((world.level_name(), listing))
    })??;

    if listing.limit_reached {
        tracing::warn!(
            limit,
            returned = listing.returned_count,
            total = listing.total_count,
            "actor limit reached"
        );
    }
    tracing::info!(
        returned = listing.returned_count,
        total = listing.total_count,
        "get_scene_info"
    );

    Ok(Response::success(json!({
        "level": level,
        "actor_count": listing.total_count,
        "returned_actor_count": listing.returned_count,
        "limit_reached": listing.limit_reached,
        "actors": listing.items,
    })))
}

/// The asset index is thread-safe, so this runs on the caller thread.
pub fn get_asset_info(state: &Arc<AppState>, p: GetAssetInfoParams) -> Result<Response, AppError> {
    let filter = AssetFilter::from_type_tag(&p.asset_type);
    if filter == AssetFilter::Any {
        tracing::debug!(asset_type = %p.asset_type, "unknown asset type, listing all assets");
    }

    let records = state.assets.query_by_type(&filter);
    let limit = state.settings.max_assets_in_asset_info;
    let listing = enumerate_bounded(|| records.iter(), limit, asset_summary)?;

    if listing.limit_reached {
        tracing::warn!(
            limit,
            returned = listing.returned_count,
            total = listing.total_count,
            "asset limit reached"
        );
    }
    tracing::info!(asset_type = %p.asset_type, returned = listing.returned_count, "get_asset_info");

    Ok(Response::success(json!({
        "asset_count": listing.total_count,
        "returned_asset_count": listing.returned_count,
        "limit_reached": listing.limit_reached,
        "assets": listing.items,
    })))
}
