//! Finding types and the pipe-delimited output protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type LintResult<T> = Result<T, LintError>;

/// Verdict attached to a single finding.
///
/// `Fail` and `Warn` are advisory toward the review outcome; they never
/// translate into a nonzero process exit on their own. `Skip` records that a
/// check or rule could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl Status {
    /// The token used on the wire (`PASS`, `WARN`, `FAIL`, `SKIP`).
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single analyzer finding.
///
/// Serialized form is one line: `STATUS|CHECK|DETAIL[|fix: HINT]`. The
/// detail must not contain the field separator; [`Finding::render`] replaces
/// any stray `|` so the line always stays machine-splittable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub status: Status,
    /// Stable check or rule identifier (e.g. `lifecycle/signal-balance`).
    pub check: String,
    pub detail: String,
    /// Optional one-line remediation hint, appended as `|fix: ...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Finding {
    pub fn new(status: Status, check: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            check: check.to_string(),
            detail: detail.into(),
            fix: None,
        }
    }

    pub fn pass(check: &str, detail: impl Into<String>) -> Self {
        Self::new(Status::Pass, check, detail)
    }

    pub fn warn(check: &str, detail: impl Into<String>) -> Self {
        Self::new(Status::Warn, check, detail)
    }

    pub fn fail(check: &str, detail: impl Into<String>) -> Self {
        Self::new(Status::Fail, check, detail)
    }

    pub fn skip(check: &str, detail: impl Into<String>) -> Self {
        Self::new(Status::Skip, check, detail)
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// Render the finding as one protocol line (without trailing newline).
    pub fn render(&self) -> String {
        let detail = self.detail.replace('|', "/");
        match &self.fix {
            Some(fix) => format!(
                "{}|{}|{}|fix: {}",
                self.status,
                self.check,
                detail,
                fix.replace('|', "/")
            ),
            None => format!("{}|{}|{}", self.status, self.check, detail),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Analyzer errors.
///
/// Per-file read failures inside a running check are normally swallowed
/// (the file's potential hits are lost, the run continues); these variants
/// surface only at the few places where an error becomes a SKIP finding or
/// an argument failure.
#[derive(Error, Debug)]
pub enum LintError {
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Invalid metadata.json: {message}")]
    ManifestParse { message: String },

    #[error("Rule file not found: {path}")]
    RuleFileMissing { path: PathBuf },
}
