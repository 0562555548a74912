use std::path::Path;
use std::sync::Arc;

use crate::bridge::{OwnerHandle, OwnerThread};
use crate::error::AppError;
use crate::python::ScriptRunner;
use crate::settings::ServerSettings;
use crate::world::{AssetIndex, WorldBackend};

/// The world as held by the owner thread.
pub type World = Box<dyn WorldBackend>;

// ── Application State ──────────────────────────────────────────────

/// Shared by every connection and every handler.
pub struct AppState {
    /// Route to the owner thread. All world access goes through here.
    pub world: OwnerHandle<World>,
    /// Thread-safe; read directly from caller threads.
    pub assets: Arc<dyn AssetIndex>,
    pub scripts: ScriptRunner,
    pub settings: ServerSettings,
}

impl AppState {
    pub fn new(
        world: OwnerHandle<World>,
        assets: Arc<dyn AssetIndex>,
        scripts: ScriptRunner,
        settings: ServerSettings,
    ) -> Self {
        Self {
            world,
            assets,
            scripts,
            settings,
        }
    }

    /// Read-only access to the world on the owner thread. Blocks until `f`
    /// has run or the bridge timeout expires.
    pub fn with_world<F, R>(&self, operation: &str, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&dyn WorldBackend) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.world.call(operation, move |w: &mut World| f(&**w))
    }

    /// Mutating access to the world on the owner thread.
    pub fn with_world_mut<F, R>(&self, operation: &str, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut dyn WorldBackend) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.world.call(operation, move |w: &mut World| f(&mut **w))
    }
}

/// A running bridge: shared state plus the owner thread that serves it.
/// Dropping it stops the owner thread.
pub struct Runtime {
    pub state: Arc<AppState>,
    owner: OwnerThread,
}

impl Runtime {
    /// Validate `settings`, move `world` onto a fresh owner thread and build
    /// the shared state around it.
    pub fn start(
        world: World,
        assets: Arc<dyn AssetIndex>,
        settings: ServerSettings,
        config_dir: &Path,
    ) -> Result<Self, AppError> {
        settings.validate()?;
        let scripts = ScriptRunner::from_settings(&settings.script, config_dir);
        Self::start_with_runner(world, assets, scripts, settings)
    }

    /// Like [`start`](Self::start) with a caller-supplied script runner.
    pub fn start_with_runner(
        world: World,
        assets: Arc<dyn AssetIndex>,
        scripts: ScriptRunner,
        settings: ServerSettings,
    ) -> Result<Self, AppError> {
        settings.validate()?;
        let (handle, owner) = OwnerThread::spawn(world, settings.bridge_timeout())?;
        tracing::info!(
            timeout_secs = settings.bridge_timeout_secs,
            "owner thread started"
        );
        Ok(Self {
            state: Arc::new(AppState::new(handle, assets, scripts, settings)),
            owner,
        })
    }

    pub fn shutdown(self) {
        self.owner.shutdown();
    }
}
