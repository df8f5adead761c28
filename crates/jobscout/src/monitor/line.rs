//! Log lines as reconstructed from the run stream.

use serde::{Deserialize, Serialize};

/// Display severity derived from an optional bracketed tag in the line.
/// Interpretation never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeverity {
    Error,
    Success,
    Warning,
    Debug,
    Info,
}

/// One newline-delimited unit of run output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLine(String);

impl LogLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Synthesized line recording a failure of the run itself.
    pub fn error(detail: impl std::fmt::Display) -> Self {
        Self(format!("[ERROR] Failed to run pipeline: {}", detail))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for empty lines. A lone `\r` is content and is kept.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    pub fn severity(&self) -> LineSeverity {
        let line = self.0.as_str();
        if line.contains("[ERROR]") || line.contains("[EXCEPTION]") {
            LineSeverity::Error
        } else if line.contains("[SUCCESS]") {
            LineSeverity::Success
        } else if line.contains("[WARNING]") {
            LineSeverity::Warning
        } else if line.contains("[DEBUG]") {
            LineSeverity::Debug
        } else {
            LineSeverity::Info
        }
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogLine {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
