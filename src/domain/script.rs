//! Analysis Script Builder
//!
//! Embeds a caller-supplied Python snippet into the fixed script that asks
//! `pyflowchart` for a flowchart. The script is executed as-is by the
//! interpreter runtime, so building one is running code on the caller's
//! behalf. No sandboxing is applied.

/// Delimiter of the triple-quoted literal that carries the snippet.
pub const DELIMITER: &str = "\"\"\"";

/// Replacement for every [`DELIMITER`] found inside the snippet.
pub const ESCAPED_DELIMITER: &str = "\\\"\\\"\\\"";

const PROLOGUE: &str = "from pyflowchart import Flowchart\n\ncode_for_flowchart = \"\"\"\n";

// The final bare `result` is the value handed back by the entry point.
const EPILOGUE: &str = "\n\"\"\"\n\nfc = Flowchart.from_code(code_for_flowchart)\nresult = fc.flowchart()\nresult\n";

/// A ready-to-run analysis script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisScript {
    source: String,
    escaped: usize,
}

impl AnalysisScript {
    /// Build the script for `snippet`.
    pub fn build(snippet: &str) -> Self {
        let escaped = snippet.matches(DELIMITER).count();
        let body = escape_delimiter(snippet);

        let mut source = String::with_capacity(PROLOGUE.len() + body.len() + EPILOGUE.len());
        source.push_str(PROLOGUE);
        source.push_str(&body);
        source.push_str(EPILOGUE);

        Self { source, escaped }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of delimiter occurrences that were escaped in the snippet.
    pub fn escaped_delimiters(&self) -> usize {
        self.escaped
    }

    pub fn into_string(self) -> String {
        self.source
    }
}

impl AsRef<str> for AnalysisScript {
    fn as_ref(&self) -> &str {
        &self.source
    }
}

/// Replace every non-overlapping `"""` (left to right) with `\"\"\"`.
///
/// Only the delimiter itself is handled. Backslashes or escape sequences
/// already present in the snippet are passed through untouched.
pub fn escape_delimiter(snippet: &str) -> String {
    snippet.replace(DELIMITER, ESCAPED_DELIMITER)
}
