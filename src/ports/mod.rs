//! Ports to the external interpreter runtime.
//!
//! The three collaborators the loader drives: something that produces a
//! runtime, the runtime's package manager, and its execution entry point.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::errors::ExecutionError;

#[async_trait]
pub trait RuntimeLoader: Send + Sync {
    /// Produce a fresh interpreter runtime.
    async fn load_runtime(&self) -> Result<Arc<dyn InterpreterRuntime>>;
}

#[async_trait]
pub trait InterpreterRuntime: Send + Sync {
    /// Load the package-management sub-component.
    async fn load_package_manager(&self) -> Result<Arc<dyn PackageManager>>;

    /// Run `script` and return the value of its last expression, if it has one.
    async fn run(&self, script: &str) -> Result<Option<String>, ExecutionError>;

    /// Whether `run` may be called concurrently on the same runtime.
    fn supports_concurrent_runs(&self) -> bool {
        false
    }

    /// Short human-readable description used in logs.
    fn describe(&self) -> String {
        "interpreter runtime".to_string()
    }
}

#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn install(&self, name: &str) -> Result<()>;
}
