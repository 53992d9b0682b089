/// Python Subprocess Runtime.
///
/// Backs the runtime ports with a host Python interpreter:
/// - Runtime: `<python> --version` must succeed
/// - Package manager: `<python> -m pip`
/// - Execution: a small driver reads the script from stdin, runs it and
///   reports the value of the trailing expression as one JSON line.
///
/// Each `run` is its own process, so concurrent runs are safe.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::errors::ExecutionError;
use crate::ports::{InterpreterRuntime, PackageManager, RuntimeLoader};

/// Runs all statements but a trailing expression, then evaluates that
/// expression. Output printed by the script goes to stderr so stdout only
/// carries the reply.
pub const DRIVER: &str = r#"import ast, contextlib, json, sys

source = sys.stdin.buffer.read().decode("utf-8")
reply_stream = sys.stdout
try:
    tree = ast.parse(source, "<analysis>", "exec")
    tail = None
    if tree.body and isinstance(tree.body[-1], ast.Expr):
        tail = ast.Expression(tree.body.pop().value)
    namespace = {"__name__": "__main__"}
    value = None
    with contextlib.redirect_stdout(sys.stderr):
        exec(compile(tree, "<analysis>", "exec"), namespace)
        if tail is not None:
            value = eval(compile(tail, "<analysis>", "eval"), namespace)
    reply = {"status": "ok", "value": None if value is None else str(value)}
except BaseException as exc:
    reply = {"status": "error", "kind": type(exc).__name__, "message": str(exc)}
reply_stream.write(json.dumps(reply) + "\n")
reply_stream.flush()
"#;

// ═══════════════════════════════════════════════════════════════════════════
// Command Specs
// ═══════════════════════════════════════════════════════════════════════════

/// A command line, built without being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(python: &Path, args: &[&str]) -> Self {
        Self {
            program: python.to_string_lossy().into_owned(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

pub fn build_version_spec(python: &Path) -> CommandSpec {
    CommandSpec::new(python, &["--version"])
}

pub fn build_pip_version_spec(python: &Path) -> CommandSpec {
    CommandSpec::new(python, &["-m", "pip", "--version"])
}

pub fn build_import_check_spec(python: &Path, package: &str) -> CommandSpec {
    let statement = format!("import {}", module_name(package));
    CommandSpec::new(python, &["-c", &statement])
}

pub fn build_install_spec(python: &Path, package: &str, index_url: Option<&str>) -> CommandSpec {
    let mut spec = CommandSpec::new(
        python,
        &["-m", "pip", "install", "--disable-pip-version-check", "--quiet"],
    );
    if let Some(url) = index_url {
        spec.args.push("--index-url".to_string());
        spec.args.push(url.to_string());
    }
    spec.args.push(package.to_string());
    spec
}

pub fn build_run_spec(python: &Path) -> CommandSpec {
    CommandSpec::new(python, &["-c", DRIVER])
}

/// Import name for a pip requirement, e.g. `py-flow>=1.0` -> `py_flow`.
pub fn module_name(package: &str) -> String {
    let end = package
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '[' | ';' | '@' | ' '))
        .unwrap_or(package.len());
    package[..end].trim().replace('-', "_").to_lowercase()
}

// ═══════════════════════════════════════════════════════════════════════════
// Driver Reply
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum DriverReply {
    Ok { value: Option<String> },
    Error { kind: String, message: String },
}

/// Decode the driver's reply from the last non-empty stdout line.
pub fn parse_reply(stdout: &str) -> Result<Option<String>, ExecutionError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ExecutionError::EntryPoint("driver produced no reply".to_string()))?;

    let reply: DriverReply = serde_json::from_str(line)
        .map_err(|e| ExecutionError::EntryPoint(format!("malformed driver reply: {}", e)))?;

    match reply {
        DriverReply::Ok { value } => Ok(value),
        DriverReply::Error { kind, message } => Err(ExecutionError::Raised { kind, message }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Implementations
// ═══════════════════════════════════════════════════════════════════════════

/// Run a probe command and return its trimmed version banner.
async fn probe(spec: &CommandSpec) -> Result<String> {
    let output = spec
        .command()
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to execute `{}`", spec))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        bail!(
            "`{}` exited with code {:?}: {}",
            spec,
            output.status.code(),
            stderr.trim()
        );
    }

    // Old interpreters print the version banner on stderr.
    let banner = if stdout.trim().is_empty() { stderr } else { stdout };
    Ok(banner.trim().to_string())
}

pub struct PythonLoader {
    config: BridgeConfig,
}

impl PythonLoader {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RuntimeLoader for PythonLoader {
    async fn load_runtime(&self) -> Result<Arc<dyn InterpreterRuntime>> {
        let spec = build_version_spec(&self.config.python);
        let version = probe(&spec).await.with_context(|| {
            format!(
                "{} is not usable; install Python 3 or set `python` in the config",
                self.config.python.display()
            )
        })?;
        info!(python = %self.config.python.display(), %version, "using interpreter");

        Ok(Arc::new(PythonRuntime {
            python: self.config.python.clone(),
            version,
            index_url: self.config.index_url.clone(),
            prefer_installed: self.config.prefer_installed,
        }))
    }
}

pub struct PythonRuntime {
    python: PathBuf,
    version: String,
    index_url: Option<String>,
    prefer_installed: bool,
}

#[async_trait]
impl InterpreterRuntime for PythonRuntime {
    async fn load_package_manager(&self) -> Result<Arc<dyn PackageManager>> {
        let spec = build_pip_version_spec(&self.python);
        let pip_version = probe(&spec)
            .await
            .context("pip is not available for this interpreter")?;
        debug!(%pip_version, "pip available");

        Ok(Arc::new(PipManager {
            python: self.python.clone(),
            index_url: self.index_url.clone(),
            prefer_installed: self.prefer_installed,
        }))
    }

    async fn run(&self, script: &str) -> Result<Option<String>, ExecutionError> {
        let spec = build_run_spec(&self.python);
        let mut child = spec
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExecutionError::EntryPoint("interpreter stdin unavailable".to_string()))?;
        stdin.write_all(script.as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(output = %stderr.trim(), "script output");
        }

        if !output.status.success() && stdout.trim().is_empty() {
            return Err(ExecutionError::EntryPoint(format!(
                "interpreter exited with code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }
        parse_reply(&stdout)
    }

    fn supports_concurrent_runs(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.python.display(), self.version)
    }
}

pub struct PipManager {
    python: PathBuf,
    index_url: Option<String>,
    prefer_installed: bool,
}

#[async_trait]
impl PackageManager for PipManager {
    async fn install(&self, name: &str) -> Result<()> {
        if self.prefer_installed {
            let check = build_import_check_spec(&self.python, name);
            if probe(&check).await.is_ok() {
                info!(package = name, "package already importable, skipping install");
                return Ok(());
            }
        }

        let spec = build_install_spec(&self.python, name, self.index_url.as_deref());
        info!(package = name, "installing package");
        let output = spec
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to execute `{}`", spec))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("pip exited with code {:?}: {}", output.status.code(), stderr.trim());
        }
        info!(package = name, "package installed");
        Ok(())
    }
}
