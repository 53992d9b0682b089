//! Error taxonomy for PyFlow Bridge.
//!
//! Initialization failures are `Clone` so a single failed attempt can be
//! handed to every caller that joined it.

use std::path::PathBuf;
use thiserror::Error;

/// Fixed prefix carried by every [`AnalysisError`] message.
pub const ANALYSIS_ERROR_PREFIX: &str = "Flowchart generation failed";

/// Failure of one step of the runtime initialization sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("runtime failed to load: {0}")]
    RuntimeLoad(String),

    #[error("package manager failed to load: {0}")]
    PackageManagerLoad(String),

    #[error("failed to install package '{package}': {reason}")]
    PackageInstall { package: String, reason: String },
}

/// Failure while running a script through the execution entry point.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The script itself raised.
    #[error("{kind}: {message}")]
    Raised { kind: String, message: String },

    /// The entry point failed before the script could report back.
    #[error("execution entry point failed: {0}")]
    EntryPoint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error surfaced to callers of `FlowchartService::analyze`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{prefix}: {0}", prefix = ANALYSIS_ERROR_PREFIX)]
    Load(#[from] LoadError),

    #[error("{prefix}: {0}", prefix = ANALYSIS_ERROR_PREFIX)]
    Execution(#[from] ExecutionError),

    #[error("{prefix}: {0}", prefix = ANALYSIS_ERROR_PREFIX)]
    Unexpected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
