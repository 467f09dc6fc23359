//! Inline suppression comments.
//!
//! Authors silence a finding with a magic comment on the flagged line or the
//! line above it:
//!
//! ```text
//! eval(trusted);            // ego-lint-ignore: R-SEC-01
//! // ego-lint-ignore-next-line
//! eval(trusted);
//! ```
//!
//! A bare directive suppresses every check; a directive with an identifier
//! suppresses only that check. Matching is purely textual.

use regex::Regex;
use std::sync::LazyLock;

static SUPPRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ego-lint-ignore(?:-next-line)?(?::\s*(\S+))?").unwrap());

fn directive_matches(line: &str, check_id: &str) -> bool {
    if !line.contains("ego-lint-ignore") {
        return false;
    }
    match SUPPRESS_RE.captures(line) {
        Some(caps) => match caps.get(1) {
            Some(specified) => specified.as_str() == check_id,
            None => true,
        },
        None => false,
    }
}

/// Whether a finding for `check_id` on `line` is suppressed, given the
/// previous line (if any).
pub fn is_suppressed(line: &str, prev_line: Option<&str>, check_id: &str) -> bool {
    if directive_matches(line, check_id) {
        return true;
    }
    if let Some(prev) = prev_line {
        if directive_matches(prev, check_id) {
            return true;
        }
    }
    false
}
