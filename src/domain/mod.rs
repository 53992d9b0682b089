// Domain types for PyFlow Bridge.

pub mod script;

pub use script::{AnalysisScript, DELIMITER, ESCAPED_DELIMITER};
