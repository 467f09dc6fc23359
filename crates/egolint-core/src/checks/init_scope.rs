//! Init-time Shell mutation.
//!
//! Extensions must not touch Shell globals or allocate GObjects at module
//! scope or in constructor() bodies. All Shell modification belongs inside
//! enable() and must be reversed in disable().

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::source::{brace_delta, constructor_lines, module_scope_lines, strip_comments};
use regex::Regex;
use std::sync::LazyLock;

/// Shell globals that may only be accessed from enable()/disable().
static SHELL_GLOBALS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bMain\.(panel|overview|layoutManager|sessionMode|messageTray|wm|extensionManager|notify)\b",
    )
    .unwrap()
});

/// GObject constructors allocate resources; any GI namespace is forbidden
/// at init time.
static GOBJECT_CTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bnew\s+(St\.\w+|Clutter\.\w+|Gio\.\w+|GLib\.\w+|GObject\.\w+|Meta\.\w+|Shell\.\w+|Pango\.\w+|Soup\.\w+|Cogl\.\w+|Atk\.\w+|GdkPixbuf\.\w+)\b",
    )
    .unwrap()
});

static EXPORT_BRACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^export\s*\{").unwrap());
static ENABLE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\benable\s*\(").unwrap());

/// Imports, `Gio._promisify`, and side-effect-free re-exports are fine at
/// module scope.
fn is_skip_line(line: &str) -> bool {
    let stripped = line.trim();
    if stripped.is_empty() {
        return true;
    }
    if stripped.starts_with("import ") || stripped.starts_with("import{") {
        return true;
    }
    if stripped.contains("Gio._promisify") {
        return true;
    }
    EXPORT_BRACE_RE.is_match(stripped)
}

/// Shell globals or GObject construction at module scope / in constructors.
fn check_init_modifications(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return vec![Finding::pass(
            "init/shell-modification",
            "No init-time Shell modifications detected",
        )];
    }

    let mut violations: Vec<String> = Vec::new();

    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let cleaned = strip_comments(&raw);
        let lines: Vec<&str> = cleaned.lines().collect();
        let rel = ctx.rel(path);

        for (lineno, line) in module_scope_lines(&lines)
            .into_iter()
            .chain(constructor_lines(&lines))
        {
            if is_skip_line(line) {
                continue;
            }
            if SHELL_GLOBALS_RE.is_match(line) || GOBJECT_CTOR_RE.is_match(line) {
                violations.push(format!("{rel}:{lineno}"));
            }
        }
    }

    if violations.is_empty() {
        vec![Finding::pass(
            "init/shell-modification",
            "No init-time Shell modifications detected",
        )]
    } else {
        violations
            .into_iter()
            .map(|loc| {
                Finding::fail(
                    "init/shell-modification",
                    format!("{loc}: Shell modification outside enable()"),
                )
            })
            .collect()
    }
}

/// `Gio._promisify()` belongs at module scope, not inside enable().
fn check_promisify_placement(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return vec![Finding::pass(
            "init/promisify-in-enable",
            "No Gio._promisify() placement issues",
        )];
    }

    let mut violations: Vec<String> = Vec::new();

    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let cleaned = strip_comments(&raw);
        let rel = ctx.rel(path);

        let mut in_enable = false;
        let mut enable_depth = 0i32;

        for (idx, line) in cleaned.lines().enumerate() {
            let lineno = idx + 1;

            if !in_enable && ENABLE_HEADER_RE.is_match(line) {
                in_enable = true;
                enable_depth = brace_delta(line);
                if enable_depth <= 0 && line.contains('{') {
                    // Single-line enable body
                    if line.contains("Gio._promisify") {
                        violations.push(format!("{rel}:{lineno}"));
                    }
                    in_enable = false;
                }
                continue;
            }

            if in_enable {
                enable_depth += brace_delta(line);
                if line.contains("Gio._promisify") {
                    violations.push(format!("{rel}:{lineno}"));
                }
                if enable_depth <= 0 {
                    in_enable = false;
                }
            }
        }
    }

    if violations.is_empty() {
        vec![Finding::pass(
            "init/promisify-in-enable",
            "No Gio._promisify() placement issues",
        )]
    } else {
        violations
            .into_iter()
            .map(|loc| {
                Finding::warn(
                    "init/promisify-in-enable",
                    format!("{loc}: Gio._promisify() inside enable() - should be at module scope"),
                )
            })
            .collect()
    }
}

/// Run the full init family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(check_init_modifications(ctx));
    findings.extend(check_promisify_placement(ctx));
    findings
}
