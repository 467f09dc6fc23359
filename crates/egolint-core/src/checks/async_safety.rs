//! Async safety: in-flight operations must be cancellable from disable().

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::source::{brace_delta, find_method_body, strip_comments};
use regex::Regex;
use std::sync::LazyLock;

static GIO_ASYNC_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"load_contents_async\s*\(",
        r"send_and_read_async\s*\(",
        r"read_bytes_async\s*\(",
        r"write_bytes_async\s*\(",
        r"query_info_async\s*\(",
        r"enumerate_children_async\s*\(",
        r"replace_contents_async\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static FUNC_PARAMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:async\s+)?\w+\s*\(([^)]*)\)\s*\{").unwrap());
static ASYNC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\basync\b").unwrap());
static AWAIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bawait\b").unwrap());
static CANCEL_ABORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(cancel|abort)\s*\(").unwrap());
static DESTROYED_SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_destroyed\s*=\s*true").unwrap());

const CANCELLABLE_PARAMS: &[&str] = &["iscancelled", "cancellable", "cancel"];

/// Bundle-wide: Gio async calls without any Gio.Cancellable in sight.
fn check_cancellable_usage(ctx: &CheckContext) -> Vec<Finding> {
    let mut has_cancellable = false;
    let mut locations: Vec<String> = Vec::new();

    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let clean = strip_comments(&raw);
        let rel = ctx.rel(path);

        if clean.contains("Gio.Cancellable") {
            has_cancellable = true;
        }
        for re in GIO_ASYNC_RES.iter() {
            for m in re.find_iter(&clean) {
                let lineno = clean[..m.start()].matches('\n').count() + 1;
                locations.push(format!("{rel}:{lineno}"));
            }
        }
    }

    if locations.is_empty() {
        return Vec::new();
    }
    if has_cancellable {
        vec![Finding::pass(
            "async/cancellable-used",
            "Gio.Cancellable used with async operations",
        )]
    } else {
        vec![Finding::warn(
            "async/no-cancellable",
            format!(
                "Gio async calls at {} without Gio.Cancellable - async operations should be cancellable via disable()",
                locations[..locations.len().min(3)].join(", ")
            ),
        )]
    }
}

/// Per-call: `_async(` without a cancellable argument on the same line.
///
/// Suppressed when the enclosing function takes a cancellable-like parameter
/// (the caller manages cancellation) or the file carries a `_destroyed`
/// sentinel (an alternative async safety mechanism).
fn check_inline_cancellable(ctx: &CheckContext) -> Vec<Finding> {
    let mut missing: Vec<String> = Vec::new();

    for path in &ctx.runtime_files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        if content.contains("_destroyed") {
            continue;
        }
        let rel = ctx.rel(path);

        let mut has_cancellable_param = false;
        let mut scope_depth = 0i32;
        let mut scope_start_depth = -1i32;

        for (idx, line) in content.lines().enumerate() {
            let stripped = line.trim_start();
            if stripped.starts_with("//") || stripped.starts_with('*') {
                continue;
            }

            if let Some(caps) = FUNC_PARAMS_RE.captures(line) {
                let params = caps[1].to_lowercase();
                let names: Vec<&str> = params
                    .split(',')
                    .map(|p| p.split('=').next().unwrap_or("").trim())
                    .collect();
                if names.iter().any(|n| CANCELLABLE_PARAMS.contains(n)) {
                    has_cancellable_param = true;
                    scope_start_depth = scope_depth;
                }
            }

            scope_depth += brace_delta(line);

            if has_cancellable_param && scope_depth <= scope_start_depth {
                has_cancellable_param = false;
            }

            if !stripped.contains("_async(") {
                continue;
            }
            if line.to_lowercase().contains("cancellable") {
                continue;
            }
            if has_cancellable_param {
                continue;
            }
            missing.push(format!("{rel}:{}", idx + 1));
        }
    }

    if missing.is_empty() {
        vec![Finding::pass(
            "async/missing-cancellable",
            "All _async() calls have cancellable argument",
        )]
    } else {
        let extra = if missing.len() > 3 {
            format!(" (+{} more)", missing.len() - 3)
        } else {
            String::new()
        };
        vec![Finding::warn(
            "async/missing-cancellable",
            format!(
                "_async() calls without Gio.Cancellable at {}{} - async operations may run after disable()",
                missing[..missing.len().min(3)].join(", "),
                extra
            ),
        )]
    }
}

/// disable() must cancel, abort, or flag in-flight async work.
fn check_disable_cancellation(ctx: &CheckContext) -> Vec<Finding> {
    let Some(entry) = ctx.entry_file() else {
        return Vec::new();
    };
    let Some(raw) = ctx.read(&entry) else {
        return Vec::new();
    };
    let clean = strip_comments(&raw);

    if !(ASYNC_RE.is_match(&clean) && AWAIT_RE.is_match(&clean)) {
        return Vec::new();
    }
    let Some(disable) = find_method_body(&clean, "disable") else {
        return Vec::new();
    };

    let has_cancel = CANCEL_ABORT_RE.is_match(&disable.body);
    let has_destroyed = DESTROYED_SET_RE.is_match(&disable.body);

    if has_cancel || has_destroyed {
        vec![Finding::pass(
            "async/disable-cancellation",
            "disable() handles async cancellation",
        )]
    } else {
        vec![Finding::warn(
            "async/disable-no-cancel",
            "Extension uses async but disable() has no .cancel(), .abort(), or _destroyed flag - async operations may outlive disable()",
        )]
    }
}

/// Run the full async family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return vec![Finding::skip("async/no-js", "No JavaScript files found")];
    }
    let mut findings = Vec::new();
    findings.extend(check_cancellable_usage(ctx));
    findings.extend(check_inline_cancellable(ctx));
    findings.extend(check_disable_cancellation(ctx));
    findings
}
