// Infrastructure implementations for PyFlow Bridge.

pub mod logging;
pub mod python;

pub use logging::init_logging;
pub use python::{PipManager, PythonLoader, PythonRuntime};
