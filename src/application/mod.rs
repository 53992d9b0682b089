//! Flowchart generation use case.
//!
//! `analyze` builds a script that embeds the caller's snippet and runs it in
//! the shared interpreter. It executes code derived from caller input; the
//! runtime applies no sandboxing.

pub mod resource;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::domain::AnalysisScript;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::infrastructure::python::PythonLoader;

pub use resource::{LoadPhase, RuntimeHandle, SharedRuntime};

pub struct FlowchartService {
    runtime: Arc<SharedRuntime>,
}

impl FlowchartService {
    pub fn new(runtime: Arc<SharedRuntime>) -> Self {
        Self { runtime }
    }

    /// Service backed by a host Python interpreter.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let loader = Arc::new(PythonLoader::new(config.clone()));
        Self::new(Arc::new(SharedRuntime::new(loader, config.package.clone())))
    }

    pub fn runtime(&self) -> &Arc<SharedRuntime> {
        &self.runtime
    }

    /// Make sure the runtime is loaded without analyzing anything.
    pub async fn preload(&self) -> AnalysisResult<()> {
        self.runtime.acquire().await?;
        Ok(())
    }

    /// Generate the flowchart text for a Python snippet.
    ///
    /// Services sharing one `SharedRuntime` also share its run serialization.
    pub async fn analyze(&self, snippet: &str) -> AnalysisResult<String> {
        debug!(bytes = snippet.len(), "flowchart requested");

        let handle = self.runtime.acquire().await?;
        let script = AnalysisScript::build(snippet);
        if script.escaped_delimiters() > 0 {
            debug!(escaped = script.escaped_delimiters(), "escaped delimiters in snippet");
        }

        let value = handle.run(script.as_str()).await?;

        let text = value.ok_or_else(|| {
            AnalysisError::Unexpected("analysis script produced no value".to_string())
        })?;
        info!(bytes = text.len(), "flowchart generated");
        Ok(text)
    }
}
