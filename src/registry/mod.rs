pub mod catalog;
pub mod handlers;
pub mod params;
pub mod validation;

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{panic_message, AppError};
use crate::response::Response;
use crate::state::AppState;

use params::{
    CreateObjectParams, ExecutePythonParams, FromParams, GetAssetInfoParams, ImportAssetParams,
    ModifyObjectParams, NameParams, NoParams, Params,
};

// ── Handler modules (dispatch targets) ──────────────────────────
use handlers::{edit, import, python, query};

// ── Command metadata ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandCategory {
    Query,
    Import,
    Edit,
    Python,
}

impl CommandCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Import => "import",
            Self::Edit => "edit",
            Self::Python => "python",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Query => "Inspect the level and the asset index",
            Self::Import => "Bring external files into the project",
            Self::Edit => "Create, move and delete actors",
            Self::Python => "Run Python inside the editor",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[Self::Query, Self::Import, Self::Edit, Self::Python]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
}

// ── Handler contract ────────────────────────────────────────────

/// One remotely callable command.
///
/// Handlers validate their own params before any side effect and report
/// domain failures through the returned [`Response`] or an [`AppError`];
/// the registry turns errors and panics into error envelopes.
pub trait CommandHandler: Send + Sync {
    fn info(&self) -> CommandInfo;

    /// JSON schema of the params object, for the catalog.
    fn params_schema(&self) -> Value {
        catalog::empty_object_schema()
    }

    fn execute(&self, state: &Arc<AppState>, params: &Params) -> Result<Response, AppError>;
}

/// Adapts a plain handler function taking a typed param struct.
pub struct TypedHandler<P> {
    info: CommandInfo,
    run: fn(&Arc<AppState>, P) -> Result<Response, AppError>,
    _params: PhantomData<fn() -> P>,
}

impl<P> TypedHandler<P> {
    pub fn new(info: CommandInfo, run: fn(&Arc<AppState>, P) -> Result<Response, AppError>) -> Self {
        Self {
            info,
            run,
            _params: PhantomData,
        }
    }
}

impl<P: FromParams + schemars::JsonSchema + 'static> CommandHandler for TypedHandler<P> {
    fn info(&self) -> CommandInfo {
        self.info
    }

    fn params_schema(&self) -> Value {
        catalog::schema_value::<P>()
    }

    fn execute(&self, state: &Arc<AppState>, params: &Params) -> Result<Response, AppError> {
        let typed = P::from_params(params)?;
        (self.run)(state, typed)
    }
}

// ── Requests ────────────────────────────────────────────────────

/// A decoded wire request: `{"type": "<command>", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub command: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(command: impl Into<String>, params: Value) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        let obj = value
            .as_object()
            .ok_or_else(|| AppError::validation("Request must be a JSON object"))?;
        let command = match obj.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(AppError::validation("Invalid 'type' field: expected a string")),
            None => return Err(AppError::validation("Missing 'type' field")),
        };
        Ok(Self {
            command,
            params: obj.get("params").cloned().unwrap_or(Value::Null),
        })
    }
}

// ── Registry ────────────────────────────────────────────────────

/// Name → handler map. Built once at startup, then shared read-only.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: IndexMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command.
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        for handler in builtin_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Register `handler` under its own name. A later registration for the
    /// same name replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        let name = handler.info().name;
        if self.handlers.insert(name, handler).is_some() {
            tracing::warn!(command = name, "duplicate command registration, replacing earlier handler");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(name)
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn CommandHandler>> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route `request` to its handler. Never panics and never fails: every
    /// outcome, including a panicking handler, becomes a [`Response`].
    pub fn dispatch(&self, state: &Arc<AppState>, request: &Request) -> Response {
        let Some(handler) = self.get(&request.command) else {
            tracing::warn!(command = %request.command, "unsupported command");
            return AppError::UnknownCommand {
                name: request.command.clone(),
            }
            .into();
        };

        let params = match Params::from_value(&request.params) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        tracing::debug!(command = %request.command, "dispatching");
        match catch_unwind(AssertUnwindSafe(|| handler.execute(state, &params))) {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(command = %request.command, error = %e, "command failed");
                e.into()
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(command = %request.command, %message, "handler panicked");
                AppError::Internal {
                    command: request.command.clone(),
                    message,
                }
                .into()
            }
        }
    }

    /// Decode a JSON request value and dispatch it.
    pub fn dispatch_value(&self, state: &Arc<AppState>, value: &Value) -> Response {
        match Request::from_value(value) {
            Ok(request) => self.dispatch(state, &request),
            Err(e) => e.into(),
        }
    }

    /// Decode one line of wire text and dispatch it.
    pub fn dispatch_str(&self, state: &Arc<AppState>, text: &str) -> Response {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.dispatch_value(state, &value),
            Err(e) => {
                tracing::warn!(error = %e, "malformed request");
                Response::error(format!("Invalid JSON: {e}"))
            }
        }
    }
}

// ── define_commands! macro ──────────────────────────────────────

/// Single source of truth for the built-in commands: name, category,
/// description, param type and handler function. Generates
/// `builtin_handlers()`.
macro_rules! define_commands {
    (
        $(
            [ $cat:expr ]
            $name:literal ( $params:ty ) => $handler:path : $desc:literal ;
        )*
    ) => {
        /// Every built-in command as a registrable handler, in catalog order.
        pub fn builtin_handlers() -> Vec<Arc<dyn CommandHandler>> {
            vec![
                $(
                    Arc::new(TypedHandler::<$params>::new(
                        CommandInfo {
                            name: $name,
                            description: $desc,
                            category: $cat,
                        },
                        $handler,
                    )) as Arc<dyn CommandHandler>,
                )*
            ]
        }
    };
}

// ── Command definitions ─────────────────────────────────────────

define_commands! {
    // ── Query ───────────────────────────────────────────────────
    [CommandCategory::Query]
    "get_scene_info" (NoParams)
    => query::get_scene_info : "List actors in the current level (capped; see limit_reached).";

    [CommandCategory::Query]
    "get_asset_info" (GetAssetInfoParams)
    => query::get_asset_info : "List assets of a type (StaticMesh, Blueprint, Material) with metadata.";

    // ── Import ──────────────────────────────────────────────────
    [CommandCategory::Import]
    "import_asset" (ImportAssetParams)
    => import::import_asset : "Import a file into the project and place meshes in the level.";

    // ── Edit ────────────────────────────────────────────────────
    [CommandCategory::Edit]
    "create_object" (CreateObjectParams)
    => edit::create_object : "Spawn a StaticMeshActor or a cube at a location.";

    [CommandCategory::Edit]
    "modify_object" (ModifyObjectParams)
    => edit::modify_object : "Change the location, rotation or scale of an actor.";

    [CommandCategory::Edit]
    "delete_object" (NameParams)
    => edit::delete_object : "Delete an actor by name. System actors cannot be deleted.";

    // ── Python ──────────────────────────────────────────────────
    [CommandCategory::Python]
    "execute_python" (ExecutePythonParams)
    => python::execute_python : "Run Python code or a Python file and return its output.";
}
