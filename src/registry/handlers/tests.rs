#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::demo::create_demo_assets;
use crate::error::AppError;
use crate::python::{ScriptHost, ScriptJob, ScriptRunner};
use crate::registry::params::Params;
use crate::registry::{CommandCategory, CommandHandler, CommandInfo, CommandRegistry, Request};
use crate::response::{Response, Status};
use crate::settings::ServerSettings;
use crate::state::{AppState, Runtime};
use crate::world::{InMemoryAssetIndex, InMemoryWorld, BUILDER_BRUSH_NAME};

// ── Fixtures ────────────────────────────────────────────────────

/// Writes whatever the test configured instead of running an interpreter.
struct CannedHost {
    status: &'static str,
    stdout: &'static str,
    stderr: &'static str,
}

impl ScriptHost for CannedHost {
    fn execute(&self, job: &ScriptJob, _timeout: Option<Duration>) -> Result<(), AppError> {
        fs::write(&job.output, self.stdout)?;
        fs::write(&job.error, self.stderr)?;
        fs::write(&job.status, self.status)?;
        Ok(())
    }
}

struct Harness {
    runtime: Runtime,
    registry: CommandRegistry,
    _temp: tempfile::TempDir,
}

impl Harness {
    fn state(&self) -> &Arc<AppState> {
        &self.runtime.state
    }

    fn call(&self, command: &str, params: Value) -> Response {
        self.registry
            .dispatch(self.state(), &Request::new(command, params))
    }
}

fn settings() -> ServerSettings {
    ServerSettings {
        max_actors_in_scene_info: 5,
        max_assets_in_asset_info: 2,
        bridge_timeout_secs: 5,
        ..ServerSettings::default()
    }
}

fn harness_with(assets: InMemoryAssetIndex, host: CannedHost) -> Harness {
    let temp = tempfile::tempdir().unwrap();
    let runner = ScriptRunner::new(Arc::new(host), temp.path().join("scripts"));
    let runtime = Runtime::start_with_runner(
        Box::new(InMemoryWorld::new("TestLevel")),
        Arc::new(assets),
        runner,
        settings(),
    )
    .unwrap();
    Harness {
        runtime,
        registry: CommandRegistry::with_builtin_commands(),
        _temp: temp,
    }
}

fn harness() -> Harness {
    harness_with(
        create_demo_assets(),
        CannedHost {
            status: "1",
            stdout: "hi\n",
            stderr: "",
        },
    )
}

fn result(r: &Response) -> &Value {
    r.result.as_ref().expect("response has a result")
}

fn create_cube(h: &Harness, name: &str) -> String {
    let r = h.call(
        "create_object",
        json!({ "type": "cube", "name": name, "location": [0, 0, 0] }),
    );
    assert!(r.is_success(), "{r:?}");
    result(&r)["name"].as_str().unwrap().to_string()
}

// ── Dispatch ────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    let h = harness();
    let r = h.call("fly_to_moon", json!({}));
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.message.as_deref(), Some("unsupported command: fly_to_moon"));
}

#[test]
fn test_malformed_json_line() {
    let h = harness();
    let r = h.registry.dispatch_str(h.state(), "{\"type\": ");
    assert_eq!(r.status, Status::Error);
    assert!(r.message.unwrap().starts_with("Invalid JSON"));

    let r = h.registry.dispatch_str(h.state(), r#"{"params": {}}"#);
    assert_eq!(r.message.as_deref(), Some("Missing 'type' field"));
}

#[test]
fn test_missing_field_names_the_field() {
    let h = harness();
    let r = h.call("create_object", json!({ "type": "cube", "location": [0, 0, 0] }));
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.message.as_deref(), Some("Missing 'name' field"));

    let r = h.call("modify_object", json!({ "name": "x", "scale": [1, "big", 1] }));
    assert!(r.message.unwrap().starts_with("Invalid 'scale' field"));
}

struct Exploding;

impl CommandHandler for Exploding {
    fn info(&self) -> CommandInfo {
        CommandInfo {
            name: "explode",
            description: "always panics",
            category: CommandCategory::Query,
        }
    }

    fn execute(&self, _: &Arc<AppState>, _: &Params) -> Result<Response, AppError> {
        panic!("kaboom");
    }
}

#[test]
fn test_panicking_handler_becomes_error_and_registry_survives() {
    let mut h = harness();
    h.registry.register(Arc::new(Exploding));

    let r = h.call("explode", json!({}));
    assert_eq!(r.status, Status::Error);
    let message = r.message.unwrap();
    assert!(message.contains("explode"), "{message}");
    assert!(message.contains("kaboom"), "{message}");

    assert!(h.call("get_scene_info", json!({})).is_success());
}

struct FixedSceneInfo;

impl CommandHandler for FixedSceneInfo {
    fn info(&self) -> CommandInfo {
        CommandInfo {
            name: "get_scene_info",
            description: "replacement",
            category: CommandCategory::Query,
        }
    }

    fn execute(&self, _: &Arc<AppState>, _: &Params) -> Result<Response, AppError> {
        Ok(Response::success(json!({ "replaced": true })))
    }
}

#[test]
fn test_later_registration_replaces_earlier() {
    let mut h = harness();
    let before = h.registry.len();
    h.registry.register(Arc::new(FixedSceneInfo));

    assert_eq!(h.registry.len(), before);
    let info = h.registry.get("get_scene_info").unwrap().info();
    assert_eq!(info.description, "replacement");
    assert!(h.registry.get("no_such_command").is_none());
    let r = h.call("get_scene_info", json!({}));
    assert_eq!(result(&r)["replaced"], true);
}

// ── Scene ───────────────────────────────────────────────────────

#[test]
fn test_create_cube_generates_label() {
    let h = harness();
    let r = h.call(
        "create_object",
        json!({ "type": "CUBE", "name": "MyCube", "location": [1, 2, 3] }),
    );
    assert!(r.is_success());
    let out = result(&r);
    assert_eq!(out["name"], "MyCube");
    let label = out["label"].as_str().unwrap();
    let digits = label.strip_prefix("MCP_Cube_").unwrap();
    assert_eq!(digits.len(), 4);
    assert!(digits.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn test_create_with_taken_name_gets_generated_name() {
    let h = harness();
    let first = create_cube(&h, "Box");
    let second = create_cube(&h, "Box");
    assert_eq!(first, "Box");
    assert_ne!(second, "Box");
}

#[test]
fn test_create_unsupported_kind() {
    let h = harness();
    let r = h.call(
        "create_object",
        json!({ "type": "Sphere", "name": "s", "location": [0, 0, 0] }),
    );
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.message.as_deref(), Some("Unsupported actor type: Sphere"));
}

#[test]
fn test_create_modify_then_list() {
    let h = harness();
    let name = create_cube(&h, "Mover");

    let r = h.call(
        "modify_object",
        json!({ "name": name, "location": [10.5, -4, 2], "rotation": [0, 90, 0] }),
    );
    assert!(r.is_success(), "{r:?}");
    assert_eq!(result(&r)["name"], name.as_str());

    let r = h.call("get_scene_info", json!({}));
    let actors = result(&r)["actors"].as_array().unwrap();
    let actor = actors.iter().find(|a| a["name"] == name.as_str()).unwrap();
    let location: Vec<f64> = actor["location"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    for (got, want) in location.iter().zip([10.5, -4.0, 2.0]) {
        assert!((got - want).abs() < 1e-6, "{location:?}");
    }
    assert_eq!(actor["type"], "StaticMeshActor");
}

#[test]
fn test_modify_without_fields_warns() {
    let h = harness();
    let name = create_cube(&h, "Idle");
    let r = h.call("modify_object", json!({ "name": name }));
    assert_eq!(r.status, Status::Warning);
    assert_eq!(r.message.as_deref(), Some("No modifications specified"));
}

#[test]
fn test_modify_missing_actor() {
    let h = harness();
    let r = h.call("modify_object", json!({ "name": "Ghost", "location": [0, 0, 0] }));
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.message.as_deref(), Some("Actor not found: Ghost"));
}

#[test]
fn test_delete_paths() {
    let h = harness();

    let r = h.call("delete_object", json!({ "name": BUILDER_BRUSH_NAME }));
    assert_eq!(r.status, Status::Error);
    assert!(r.message.unwrap().starts_with("Cannot delete special actor"));

    let r = h.call("delete_object", json!({ "name": "Nope" }));
    assert_eq!(r.message.as_deref(), Some("Actor not found: Nope"));

    let name = create_cube(&h, "Doomed");
    let r = h.call("delete_object", json!({ "name": name }));
    assert_eq!(r.status, Status::Success);
    assert!(r.result.is_none());

    let r = h.call("delete_object", json!({ "name": name }));
    assert_eq!(r.status, Status::Error);
}

#[test]
fn test_scene_info_caps_actor_list() {
    let h = harness();
    for i in 0..6 {
        create_cube(&h, &format!("C{i}"));
    }
    let r = h.call("get_scene_info", json!({}));
    let out = result(&r);
    assert_eq!(out["level"], "TestLevel");
    // two system actors plus six cubes
    assert_eq!(out["actor_count"], 8);
    assert_eq!(out["returned_actor_count"], 5);
    assert_eq!(out["limit_reached"], true);
    assert_eq!(out["actors"].as_array().unwrap().len(), 5);
}

// ── Assets ──────────────────────────────────────────────────────

#[test]
fn test_asset_info_caps_and_describes_meshes() {
    let h = harness();
    let r = h.call("get_asset_info", json!({ "type": "StaticMesh" }));
    let out = result(&r);
    assert_eq!(out["asset_count"], 4);
    assert_eq!(out["returned_asset_count"], 2);
    assert_eq!(out["limit_reached"], true);

    let first = &out["assets"][0];
    assert_eq!(first["AssetClass"], "/Script/Engine.StaticMesh");
    assert!(first["dimensions"]["size"].is_array());
    assert!(first["material_slots"].is_array());
}

#[test]
fn test_asset_info_under_limit() {
    let h = harness();
    let r = h.call("get_asset_info", json!({ "type": "Blueprint" }));
    let out = result(&r);
    assert_eq!(out["asset_count"], 1);
    assert_eq!(out["limit_reached"], false);
    assert!(out["assets"][0].get("dimensions").is_none());
}

#[test]
fn test_import_mesh_places_actor() {
    let h = harness_with(
        InMemoryAssetIndex::new(),
        CannedHost {
            status: "1",
            stdout: "",
            stderr: "",
        },
    );
    let dir = tempfile::tempdir().unwrap();
    let file: PathBuf = dir.path().join("Boulder.fbx");
    fs::write(&file, b"mesh").unwrap();

    let r = h.call(
        "import_asset",
        json!({ "file_path": file.to_string_lossy(), "location": [5, 5, 0] }),
    );
    assert!(r.is_success(), "{r:?}");
    assert_eq!(result(&r)["name"], "/Game/MCP_Imports/Boulder.Boulder");

    let r = h.call("get_scene_info", json!({}));
    let actors = result(&r)["actors"].as_array().unwrap();
    let placed = actors.iter().find(|a| a["label"] == "Boulder").unwrap();
    assert_eq!(placed["name"], "Boulder");

    let r = h.call("get_asset_info", json!({ "type": "StaticMesh" }));
    assert_eq!(result(&r)["asset_count"], 1);

    // Importing the same file again keeps the name unique.
    let r = h.call("import_asset", json!({ "file_path": file.to_string_lossy() }));
    assert!(r.is_success(), "{r:?}");
    assert_eq!(actor_count(&h), 4);
}

fn actor_count(h: &Harness) -> u64 {
    let r = h.call("get_scene_info", json!({}));
    result(&r)["actor_count"].as_u64().unwrap()
}

fn mesh_of(h: &Harness, name: &str) -> Option<String> {
    let name = name.to_string();
    h.state()
        .with_world("inspect", move |world| {
            world.find_entity(&name).and_then(|e| e.mesh.clone())
        })
        .unwrap()
}

#[test]
fn test_imported_mesh_usable_by_create_object() {
    let h = harness_with(
        InMemoryAssetIndex::new(),
        CannedHost {
            status: "1",
            stdout: "",
            stderr: "",
        },
    );
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Boulder.obj");
    fs::write(&file, b"mesh").unwrap();
    assert!(h
        .call("import_asset", json!({ "file_path": file.to_string_lossy() }))
        .is_success());

    let mesh = "/Game/MCP_Imports/Boulder.Boulder";
    let r = h.call(
        "create_object",
        json!({ "type": "StaticMeshActor", "name": "Second", "location": [0, 0, 0], "mesh": mesh }),
    );
    assert!(r.is_success(), "{r:?}");
    assert_eq!(mesh_of(&h, "Second").as_deref(), Some(mesh));
    assert_eq!(mesh_of(&h, "Boulder").as_deref(), Some(mesh));
}

#[test]
fn test_non_mesh_import_is_failed_and_places_nothing() {
    let h = harness_with(
        InMemoryAssetIndex::new(),
        CannedHost {
            status: "1",
            stdout: "",
            stderr: "",
        },
    );
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Noise.png");
    fs::write(&file, b"png").unwrap();

    let r = h.call("import_asset", json!({ "file_path": file.to_string_lossy() }));
    assert_eq!(r.status, Status::Failed);
    assert_eq!(
        r.message.as_deref(),
        Some("Failed to import asset or spawn actor in Unreal Engine. Check logs.")
    );
    assert_eq!(actor_count(&h), 2);
}

#[test]
fn test_import_failures_are_failed_status() {
    let h = harness();
    let r = h.call("import_asset", json!({}));
    assert_eq!(r.status, Status::Failed);
    assert_eq!(r.message.as_deref(), Some("Missing 'file_path' parameter."));

    let r = h.call("import_asset", json!({ "file_path": "/definitely/not/here.fbx" }));
    assert_eq!(r.status, Status::Failed);
}

// ── Python ──────────────────────────────────────────────────────

#[test]
fn test_execute_python_success() {
    let h = harness();
    let r = h.call("execute_python", json!({ "code": "print('hi')" }));
    assert!(r.is_success());
    assert_eq!(result(&r)["output"], "hi\n");
}

#[test]
fn test_execute_python_failure_keeps_output() {
    let h = harness_with(
        create_demo_assets(),
        CannedHost {
            status: "0",
            stdout: "partial\n",
            stderr: "Traceback: NameError\n",
        },
    );
    let r = h.call("execute_python", json!({ "data": { "code": "boom()" } }));
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.message.as_deref(), Some("Python execution failed with errors"));
    let out = result(&r);
    assert_eq!(out["output"], "partial\n");
    assert!(out["error"].as_str().unwrap().contains("NameError"));
}

#[test]
fn test_execute_python_requires_source() {
    let h = harness();
    let r = h.call("execute_python", json!({}));
    assert_eq!(r.status, Status::Error);
    assert!(r.message.unwrap().starts_with("Missing 'code' or 'file' field"));
}

#[test]
fn test_shutdown_then_world_calls_fail() {
    let h = harness();
    let state = Arc::clone(h.state());
    let registry = CommandRegistry::with_builtin_commands();
    h.runtime.shutdown();

    let r = registry.dispatch(&state, &Request::new("get_scene_info", json!({})));
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.message.as_deref(), Some("Owner thread is not running"));
}
