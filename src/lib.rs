// Main library entry point for PyFlow Bridge.

pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infrastructure;
pub mod ports;

pub use application::{FlowchartService, LoadPhase, RuntimeHandle, SharedRuntime};
pub use config::BridgeConfig;
pub use errors::{AnalysisError, ExecutionError, LoadError, ANALYSIS_ERROR_PREFIX};
