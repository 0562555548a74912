// CLI binary: exiting on unrecoverable startup errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use scene_bridge::demo::{create_demo_assets, create_demo_world};
use scene_bridge::error::AppError;
use scene_bridge::paths;
use scene_bridge::registry::{catalog, CommandRegistry, Request};
use scene_bridge::response::{Response, Status};
use scene_bridge::server::Server;
use scene_bridge::settings::{self, ServerSettings};
use scene_bridge::state::Runtime;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "scene-bridge", about = "Remote command bridge for a live scene", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override (holds scene-bridge.json and PythonTemp/)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "warn,scene_bridge=trace". Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve newline-delimited JSON commands over TCP against the demo level
    Serve {
        /// Listen address, overriding the settings file
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one command against the demo level and print the response
    Exec {
        /// Command name, e.g. get_scene_info
        command: String,
        /// Params object as JSON
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// List command categories, the commands in one, or one command's params
    Commands { topic: Option<String> },
    /// Inspect or edit scene-bridge.json in the config directory
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Write a settings file with every default filled in
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Change one setting, e.g. `script.timeout_secs 60`
    Set { key: String, value: String },
}

// ── Setup ────────────────────────────────────────────────────────

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,scene_bridge=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with(e: AppError) -> ! {
    eprintln!("Error: {e}");
    process::exit(1);
}

fn load_settings_or_exit(config_dir: &std::path::Path) -> ServerSettings {
    settings::load_settings(config_dir).unwrap_or_else(|e| exit_with(e))
}

fn start_runtime(config_dir: &std::path::Path, settings: ServerSettings) -> Runtime {
    Runtime::start(
        Box::new(create_demo_world()),
        Arc::new(create_demo_assets()),
        settings,
        config_dir,
    )
    .unwrap_or_else(|e| exit_with(e))
}

fn run_config(config_dir: &std::path::Path, action: ConfigAction) {
    let path = paths::settings_path(config_dir);

    match action {
        ConfigAction::Show => {
            let current = load_settings_or_exit(config_dir);
            println!("{}", serde_json::to_string_pretty(&current).unwrap());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                eprintln!("{} already exists (use --force to overwrite)", path.display());
                process::exit(1);
            }
            settings::save_settings(config_dir, &ServerSettings::default())
                .unwrap_or_else(|e| exit_with(e));
            println!("Wrote {}", path.display());
        }
        ConfigAction::Set { key, value } => {
            let current = load_settings_or_exit(config_dir);
            let updated = settings::with_setting(&current, &key, &value)
                .unwrap_or_else(|e| exit_with(e));
            settings::save_settings(config_dir, &updated).unwrap_or_else(|e| exit_with(e));
            println!("{key} updated in {}", path.display());
        }
    }
}

// ── Output ───────────────────────────────────────────────────────

fn print_response(response: &Response, raw: bool) {
    if raw {
        println!("{}", serde_json::to_string(response).unwrap_or_default());
        return;
    }

    let status = match response.status {
        Status::Success => "ok",
        Status::Warning => "warning",
        Status::Error => "error",
        Status::Failed => "failed",
    };
    match &response.message {
        Some(message) => println!("[{status}] {message}"),
        None => println!("[{status}]"),
    }
    if let Some(result) = &response.result {
        match result {
            Value::String(s) => println!("{s}"),
            other => println!("{}", serde_json::to_string_pretty(other).unwrap_or_default()),
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config_dir = cli.config.clone().unwrap_or_else(paths::default_config_dir);
    let registry = CommandRegistry::with_builtin_commands();

    match cli.command {
        Commands::Commands { topic } => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&catalog::to_json_schema(&registry)).unwrap()
                );
            } else {
                println!("{}", catalog::help_text(&registry, topic.as_deref()));
            }
        }
        Commands::Config { action } => run_config(&config_dir, action),
        Commands::Exec { command, params } => {
            let params: Value = serde_json::from_str(&params).unwrap_or_else(|e| {
                eprintln!("Error: --params is not valid JSON: {e}");
                process::exit(2);
            });
            let runtime = start_runtime(&config_dir, load_settings_or_exit(&config_dir));
            let state = Arc::clone(&runtime.state);
            let response = tokio::task::spawn_blocking(move || {
                registry.dispatch(&state, &Request::new(command, params))
            })
            .await
            .unwrap_or_else(|e| Response::error(format!("Internal error: {e}")));
            runtime.shutdown();

            print_response(&response, cli.json);
            if !response.is_success() {
                process::exit(1);
            }
        }
        Commands::Serve { bind } => {
            let mut settings = load_settings_or_exit(&config_dir);
            if let Some(bind) = bind {
                settings.bind_address = bind;
            }
            let addr = settings.bind_address;
            let runtime = start_runtime(&config_dir, settings);

            let server = Server::bind(addr, Arc::clone(&runtime.state), Arc::new(registry))
                .await
                .unwrap_or_else(|e| exit_with(e));
            if let Ok(local) = server.local_addr() {
                eprintln!("scene-bridge listening on {local} (Ctrl-C to stop)");
            }
            if let Err(e) = server.serve().await {
                tracing::error!(error = %e, "server stopped with error");
            }
            runtime.shutdown();
        }
    }
}
