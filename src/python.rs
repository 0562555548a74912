use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::AppError;
use crate::paths;
use crate::settings::ScriptSettings;

// ── Job description ───────────────────────────────────────────────

/// What to run: inline code, or a script file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Inline(String),
    File(PathBuf),
}

/// Result of one script run. `success` mirrors the status marker the wrapper
/// wrote; anything but `"1"` (including no marker at all) is a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Paths of one job. Everything lives under `workspace`, which is removed
/// when the job finishes.
#[derive(Debug, Clone)]
pub struct ScriptJob {
    pub workspace: PathBuf,
    pub wrapper: PathBuf,
    pub output: PathBuf,
    pub error: PathBuf,
    pub status: PathBuf,
    pub interpreter_log: PathBuf,
}

impl ScriptJob {
    fn in_workspace(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            wrapper: paths::script_wrapper_path(workspace),
            output: paths::script_output_path(workspace),
            error: paths::script_error_path(workspace),
            status: paths::script_status_path(workspace),
            interpreter_log: paths::script_interpreter_log_path(workspace),
        }
    }
}

// ── Interpreter host ──────────────────────────────────────────────

/// Runs a prepared wrapper script to completion.
pub trait ScriptHost: Send + Sync {
    /// Block until the interpreter has finished with `job.wrapper`, or fail
    /// with `ScriptTimeout` after killing it.
    fn execute(&self, job: &ScriptJob, timeout: Option<Duration>) -> Result<(), AppError>;
}

/// Launches an external interpreter process per job.
pub struct ProcessHost {
    interpreter: String,
    args: Vec<String>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl ProcessHost {
    pub fn new(interpreter: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            args,
        }
    }
}

impl ScriptHost for ProcessHost {
    fn execute(&self, job: &ScriptJob, timeout: Option<Duration>) -> Result<(), AppError> {
        let launch_err = |e: std::io::Error| AppError::ScriptLaunch {
            interpreter: self.interpreter.clone(),
            message: e.to_string(),
        };

        // Anything the interpreter prints before the wrapper takes over its
        // streams (e.g. a broken install) lands here.
        let log = fs::File::create(&job.interpreter_log).map_err(launch_err)?;
        let mut child = Command::new(&self.interpreter)
            .args(&self.args)
            .arg(&job.wrapper)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(launch_err)?;

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(status) = child.try_wait().map_err(launch_err)? {
                tracing::debug!(code = ?status.code(), "interpreter exited");
                return Ok(());
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let _ = child.kill();
                let _ = child.wait();
                let timeout_secs = timeout.map_or(0, |t| t.as_secs());
                tracing::warn!(timeout_secs, "script timed out, interpreter killed");
                return Err(AppError::ScriptTimeout { timeout_secs });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

// ── Wrapper template ──────────────────────────────────────────────

const WRAPPER_TEMPLATE: &str = r#"import sys
import traceback

output_file = open(@OUTPUT_PATH@, 'w', encoding='utf-8')
error_file = open(@ERROR_PATH@, 'w', encoding='utf-8')

saved_stdout = sys.stdout
saved_stderr = sys.stderr
sys.stdout = output_file
sys.stderr = error_file

success = True
try:
    with open(@SOURCE_PATH@, 'r', encoding='utf-8') as f:
        user_code = f.read()
    try:
        code_obj = compile(user_code, @DISPLAY_NAME@, 'exec')
        exec(code_obj, {'__name__': '__main__'})
    except SystemExit as e:
        success = e.code is None or e.code == 0
    except SyntaxError:
        traceback.print_exc()
        success = False
    except BaseException:
        traceback.print_exc()
        success = False
except BaseException:
    traceback.print_exc()
    success = False
finally:
    sys.stdout = saved_stdout
    sys.stderr = saved_stderr
    output_file.close()
    error_file.close()
    with open(@STATUS_PATH@, 'w') as f:
        f.write('1' if success else '0')
"#;

/// Render `s` as a Python string literal. JSON string syntax is a subset of
/// Python's, so quotes, backslashes and control characters are all escaped.
pub fn python_string_literal(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn path_literal(path: &Path) -> Result<String, AppError> {
    path.to_str()
        .map(python_string_literal)
        .ok_or_else(|| AppError::ScriptWrite {
            path: path.display().to_string(),
            message: "path is not valid UTF-8".into(),
        })
}

/// Fill the wrapper template. Only paths are embedded; user code never is.
pub fn render_wrapper(job: &ScriptJob, source: &Path, display_name: &str) -> Result<String, AppError> {
    Ok(WRAPPER_TEMPLATE
        .replace("@OUTPUT_PATH@", &path_literal(&job.output)?)
        .replace("@ERROR_PATH@", &path_literal(&job.error)?)
        .replace("@STATUS_PATH@", &path_literal(&job.status)?)
        .replace("@SOURCE_PATH@", &path_literal(source)?)
        .replace("@DISPLAY_NAME@", &python_string_literal(display_name)))
}

// ── Runner ────────────────────────────────────────────────────────

/// Runs scripts in private per-job workspaces and reports captured output.
pub struct ScriptRunner {
    host: Arc<dyn ScriptHost>,
    temp_root: PathBuf,
    job_prefix: String,
    timeout: Option<Duration>,
    script_roots: Vec<PathBuf>,
}

impl ScriptRunner {
    pub fn new(host: Arc<dyn ScriptHost>, temp_root: PathBuf) -> Self {
        let defaults = ScriptSettings::default();
        let timeout = defaults.timeout();
        Self {
            host,
            temp_root,
            job_prefix: defaults.job_prefix,
            timeout,
            script_roots: Vec::new(),
        }
    }

    /// Runner backed by a real interpreter process, configured from settings.
    pub fn from_settings(settings: &ScriptSettings, config_dir: &Path) -> Self {
        let host = ProcessHost::new(settings.interpreter.clone(), settings.interpreter_args.clone());
        Self {
            host: Arc::new(host),
            temp_root: settings.resolved_temp_root(config_dir),
            job_prefix: settings.job_prefix.clone(),
            timeout: settings.timeout(),
            script_roots: settings.script_roots.clone(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_script_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.script_roots = roots;
        self
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Reject file-mode scripts outside the configured roots.
    fn check_allowed(&self, file: &Path) -> Result<(), AppError> {
        if self.script_roots.is_empty() {
            return Ok(());
        }
        let resolved = file.canonicalize().map_err(|_| {
            AppError::validation(format!("Python file not found: {}", file.display()))
        })?;
        let allowed = self
            .script_roots
            .iter()
            .filter_map(|root| root.canonicalize().ok())
            .any(|root| resolved.starts_with(root));
        if allowed {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Python file is outside the allowed script roots: {}",
                file.display()
            )))
        }
    }

    /// Run `source` to completion. Script-level failures come back as
    /// `Ok(ScriptOutcome { success: false, .. })`; `Err` means the runner
    /// itself could not do its job.
    pub fn run_script(&self, source: &ScriptSource) -> Result<ScriptOutcome, AppError> {
        if let ScriptSource::File(file) = source {
            self.check_allowed(file)?;
        }

        let workspace_err = |e: std::io::Error| AppError::ScriptWorkspace {
            path: self.temp_root.display().to_string(),
            message: e.to_string(),
        };
        fs::create_dir_all(&self.temp_root).map_err(workspace_err)?;
        let workspace = tempfile::Builder::new()
            .prefix(&self.job_prefix)
            .tempdir_in(&self.temp_root)
            .map_err(workspace_err)?;
        let job = ScriptJob::in_workspace(workspace.path());
        tracing::debug!(workspace = %job.workspace.display(), "script job created");

        let result = self.prepare_and_execute(&job, source);

        let cleanup_path = job.workspace.clone();
        if let Err(e) = workspace.close() {
            tracing::warn!(path = %cleanup_path.display(), error = %e, "failed to remove script workspace");
        }
        result
    }

    fn prepare_and_execute(&self, job: &ScriptJob, source: &ScriptSource) -> Result<ScriptOutcome, AppError> {
        let write_err = |path: &Path| {
            let path = path.display().to_string();
            move |e: std::io::Error| AppError::ScriptWrite {
                path,
                message: e.to_string(),
            }
        };

        let (source_path, display_name) = match source {
            ScriptSource::Inline(code) => {
                let path = paths::script_source_path(&job.workspace);
                fs::write(&path, code).map_err(write_err(&path))?;
                (path, "<string>".to_string())
            }
            ScriptSource::File(file) => (file.clone(), file.display().to_string()),
        };

        let wrapper = render_wrapper(job, &source_path, &display_name)?;
        fs::write(&job.wrapper, wrapper).map_err(write_err(&job.wrapper))?;

        self.host.execute(job, self.timeout)?;
        Ok(collect_outcome(job))
    }
}

/// Read the capture files. Missing files read as empty.
fn collect_outcome(job: &ScriptJob) -> ScriptOutcome {
    let read = |path: &Path| fs::read_to_string(path).unwrap_or_default();

    let status = read(&job.status);
    let success = status.trim() == "1";
    let stdout = read(&job.output);
    let mut stderr = read(&job.error);

    // No marker means the wrapper never reached its `finally`; surface
    // whatever the interpreter itself printed.
    if status.trim().is_empty() {
        let log = read(&job.interpreter_log);
        if !log.trim().is_empty() {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&log);
        }
    }

    ScriptOutcome {
        success,
        stdout,
        stderr,
    }
}
