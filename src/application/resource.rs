//! Shared Runtime Loader
//!
//! Lazily initializes the interpreter runtime at most once per owner:
//! load runtime, load package manager, install the analysis package.
//! Concurrent callers are coalesced onto a single in-flight attempt and a
//! failed attempt leaves the loader retryable.
//!
//! Lifecycle: `Unloaded -> Loading -> Ready`, with `Loading -> Failed` on
//! error. `Failed` behaves like `Unloaded` for the next `acquire`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{ExecutionError, LoadError};
use crate::ports::{InterpreterRuntime, RuntimeLoader};

type PendingLoad = Shared<BoxFuture<'static, Result<Arc<RuntimeHandle>, LoadError>>>;

/// Fully initialized runtime with the analysis package installed.
pub struct RuntimeHandle {
    runtime: Arc<dyn InterpreterRuntime>,
    package: String,
    attempt: u64,
    // Serializes runs for engines that are not safe to run concurrently.
    exec_gate: tokio::sync::Mutex<()>,
}

impl RuntimeHandle {
    pub fn runtime(&self) -> &Arc<dyn InterpreterRuntime> {
        &self.runtime
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// The initialization attempt that produced this handle.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Run `script` on the runtime, one at a time unless the runtime
    /// supports concurrent runs.
    pub async fn run(&self, script: &str) -> Result<Option<String>, ExecutionError> {
        if self.runtime.supports_concurrent_runs() {
            return self.runtime.run(script).await;
        }
        let _gate = self.exec_gate.lock().await;
        self.runtime.run(script).await
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("runtime", &self.runtime.describe())
            .field("package", &self.package)
            .field("attempt", &self.attempt)
            .finish()
    }
}

enum LoadState {
    Unloaded,
    Loading { attempt: u64, pending: PendingLoad },
    Ready(Arc<RuntimeHandle>),
    Failed(LoadError),
}

/// Observable snapshot of the loader state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    Loading { attempt: u64 },
    Ready { attempt: u64 },
    Failed { error: LoadError },
}

/// Process-wide owner of the lazily loaded runtime.
pub struct SharedRuntime {
    loader: Arc<dyn RuntimeLoader>,
    package: String,
    state: Mutex<LoadState>,
    attempts: AtomicU64,
}

impl SharedRuntime {
    pub fn new(loader: Arc<dyn RuntimeLoader>, package: impl Into<String>) -> Self {
        Self {
            loader,
            package: package.into(),
            state: Mutex::new(LoadState::Unloaded),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Number of initialization attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> LoadPhase {
        match &*self.state.lock() {
            LoadState::Unloaded => LoadPhase::Unloaded,
            LoadState::Loading { attempt, .. } => LoadPhase::Loading { attempt: *attempt },
            LoadState::Ready(handle) => LoadPhase::Ready {
                attempt: handle.attempt,
            },
            LoadState::Failed(error) => LoadPhase::Failed {
                error: error.clone(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.lock(), LoadState::Ready(_))
    }

    /// Get the ready runtime, initializing it if no attempt has succeeded yet.
    ///
    /// Returns immediately once a handle exists. While an attempt is in
    /// flight every caller awaits that same attempt and sees its outcome.
    pub async fn acquire(&self) -> Result<Arc<RuntimeHandle>, LoadError> {
        let (attempt, pending) = {
            let mut state = self.state.lock();
            let joined = match &*state {
                LoadState::Ready(handle) => return Ok(Arc::clone(handle)),
                LoadState::Loading { attempt, pending } => Some((*attempt, pending.clone())),
                LoadState::Unloaded | LoadState::Failed(_) => None,
            };
            match joined {
                Some((attempt, pending)) => {
                    debug!(attempt, "runtime is loading, joining in-flight attempt");
                    (attempt, pending)
                }
                None => {
                    let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
                    info!(attempt, package = %self.package, "initiating runtime load");
                    let pending = initialize(Arc::clone(&self.loader), self.package.clone(), attempt)
                        .boxed()
                        .shared();
                    *state = LoadState::Loading {
                        attempt,
                        pending: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let outcome = pending.await;
        self.settle(attempt, &outcome);
        outcome
    }

    /// Start loading in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_preload(self: &Arc<Self>) -> JoinHandle<Result<Arc<RuntimeHandle>, LoadError>> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = shared.acquire().await;
            if let Err(e) = &outcome {
                error!(error = %e, "background runtime preload failed");
            }
            outcome
        })
    }

    // Only the attempt that currently owns `Loading` may move the state on.
    fn settle(&self, attempt: u64, outcome: &Result<Arc<RuntimeHandle>, LoadError>) {
        let mut state = self.state.lock();
        let owns_state = matches!(
            &*state,
            LoadState::Loading { attempt: current, .. } if *current == attempt
        );
        if !owns_state {
            return;
        }
        *state = match outcome {
            Ok(handle) => LoadState::Ready(Arc::clone(handle)),
            Err(e) => LoadState::Failed(e.clone()),
        };
    }
}

async fn initialize(
    loader: Arc<dyn RuntimeLoader>,
    package: String,
    attempt: u64,
) -> Result<Arc<RuntimeHandle>, LoadError> {
    let outcome = run_steps(loader.as_ref(), &package, attempt).await;
    match &outcome {
        Ok(_) => info!(attempt, package = %package, "runtime ready"),
        Err(e) => error!(attempt, error = %e, "runtime setup failed"),
    }
    outcome
}

async fn run_steps(
    loader: &dyn RuntimeLoader,
    package: &str,
    attempt: u64,
) -> Result<Arc<RuntimeHandle>, LoadError> {
    debug!(attempt, "loading interpreter runtime");
    let runtime = loader
        .load_runtime()
        .await
        .map_err(|e| LoadError::RuntimeLoad(format!("{e:#}")))?;

    debug!(attempt, runtime = %runtime.describe(), "runtime loaded, loading package manager");
    let manager = runtime
        .load_package_manager()
        .await
        .map_err(|e| LoadError::PackageManagerLoad(format!("{e:#}")))?;

    debug!(attempt, package, "package manager loaded, installing package");
    manager
        .install(package)
        .await
        .map_err(|e| LoadError::PackageInstall {
            package: package.to_string(),
            reason: format!("{e:#}"),
        })?;

    Ok(Arc::new(RuntimeHandle {
        runtime,
        package: package.to_string(),
        attempt,
        exec_gate: tokio::sync::Mutex::new(()),
    }))
}
