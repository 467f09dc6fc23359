//! Quality and trust heuristics: structural smells that correlate with
//! machine-generated or low-review-effort submissions.

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::manifest::Manifest;
use crate::source::line_number_at;
use crate::suppress::is_suppressed;
use regex::Regex;
use std::sync::LazyLock;

static FUNC_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(function|async\s+function)\s+\w+\s*\(").unwrap());
static METHOD_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(async\s+)?\w+\s*\([^)]*\)\s*\{").unwrap());
static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(if|else|for|while|switch|catch|do)\b").unwrap());
static TRY_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btry\s*\{").unwrap());
static DESTROY_WRAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"try\s*\{[^}]*\.destroy\(\)[^}]*\}\s*catch").unwrap());
static IS_LOCKED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sessionMode\.isLocked").unwrap());
static UNLOCK_CHECK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"currentMode\s*===?\s*['"]unlock-dialog['"]"#).unwrap());
static MODULE_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(let|var)\s+(\w+)").unwrap());
static CATCH_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\bcatch\s*(?:\([^)]*\))?\s*\{(.*?)\}").unwrap());
static TRY_BODY_BEFORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\btry\s*\{(.*)\}\s*$").unwrap());
static CLEANUP_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.(disconnect|cancel|destroy|close)\s*\(|import\s*\(|\.(get_value|set_value|get_string|set_string|get_int|set_int|get_boolean|set_boolean|get_double|set_double)\s*\(",
    )
    .unwrap()
});
static MOCK_TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)use_mock|mock_trigger|MOCK_MODE|\.mock\b").unwrap());
static TRY_IMPORT_GUARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)try\s*\{[^}]*import\s*\([^}]*\}\s*catch").unwrap());
static CTOR_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:constructor|_init)\s*\([^)]*\)\s*\{").unwrap());
static CLASS_EXTENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+(\w+)\s+extends\s+([\w.]+)").unwrap());
static CLASS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"class\s+\w+").unwrap());
static NEXT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\nclass\s+\w+").unwrap());
static DESTROY_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdestroy\s*\(\s*\)\s*\{").unwrap());
static CONSOLE_DEBUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"console\.debug\(").unwrap());
static CONSOLE_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"console\.(debug|warn|error|info)\(").unwrap());
static NOTIFY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Main\.notify\s*\(").unwrap());
static GETTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Gettext\.dgettext\s*\(").unwrap());
static VERBOSE_CLEANUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"if\s*\(this\._\w+\)\s*\{[^}]*\.destroy\(\)").unwrap());
static IDIOMATIC_CLEANUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?\.\s*destroy\s*\(").unwrap());
static PROMPT_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)//\s*(Important|Note|Remember|TODO|FIXME):\s*(Make sure|Ensure|Always|Don't forget|Handle|Never|Check|Verify)",
    )
    .unwrap()
});
static HEX_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b_0x[0-9a-f]{2,}\b").unwrap());
static SHORT_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:const|let|var|function)\s+([a-z]\d+)\b").unwrap());
static DEBUG_LOG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconsole\.(debug|log)\s*\(").unwrap());
static LOG_GUARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\bsettings\b|_debug\b|\bDEBUG\b|\bverbose\b|\blogLevel\b)").unwrap()
});
static DOMAIN_VOCAB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(dbus|polkit|upower|networkmanager|bluez|logind|systemd|pipewire|pulseaudio|wayland|x11|xdg|freedesktop|brightness|backlight|cpu|gpu|battery|thermal|inhibit|suspend|hibernate|idle|screensaver)\b",
    )
    .unwrap()
});
static ALGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(<<|>>|&\s*0x|\|\s*0x|Math\.(floor|ceil|round|pow|sqrt|log|min|max)\b|for\s*\(\s*let\s+\w+\s*=\s*\w+[^;]*;\s*\w+[^;]*;\s*\w+)",
    )
    .unwrap()
});
static DEBUG_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)//\s*(workaround|hack|fixme|bug\s*#?\d+|regression|quirk|compat|upstream|backport|see\s+https?://|gnome\.org|gitlab)",
    )
    .unwrap()
});
static PRIVATE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"this\.(_[a-z][a-zA-Z0-9]+)").unwrap());
static NULL_CHECK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"===?\s*null\b",
        r"!==?\s*null\b",
        r"===?\s*undefined\b",
        r#"typeof\s+\w+\s*!==?\s*['"]undefined['"]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static SETTINGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.getSettings\s*\(|new\s+Gio\.Settings\s*\()").unwrap());
static PRIVATE_API_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"Main\.panel[^;]*\._\w+", "Main.panel private API access"),
        (r"statusArea[^;]*\._\w+", "statusArea private API access"),
        (r"quickSettings[^;]*\._\w+", "quickSettings private API access"),
        (r"Main\.overview[^;]*\._\w+", "Main.overview private API access"),
        (
            r"Main\.layoutManager[^;]*\._\w+",
            "Main.layoutManager private API access",
        ),
        (r"Main\.wm[^;]*\._\w+", "Main.wm private API access"),
    ]
    .iter()
    .map(|(p, d)| (Regex::new(p).unwrap(), *d))
    .collect()
});

/// GObject widget base classes whose constructors run inside the
/// enable/disable lifecycle, so allocation there is acceptable.
const WIDGET_BASES: &[&str] = &[
    "St.Widget",
    "St.BoxLayout",
    "St.Button",
    "St.Label",
    "St.Bin",
    "St.Icon",
    "St.Entry",
    "St.ScrollView",
    "St.Viewport",
    "Clutter.Actor",
    "Clutter.LayoutManager",
    "GObject.Object",
    "QuickToggle",
    "QuickMenuToggle",
    "QuickSlider",
    "SystemIndicator",
    "PanelMenu.Button",
    "PanelMenu.ButtonBox",
    "PopupMenu.PopupBaseMenuItem",
    "PopupMenu.PopupMenuItem",
    "PopupMenu.PopupSwitchMenuItem",
    "PopupMenu.PopupSubMenuMenuItem",
    "Adw.PreferencesPage",
    "Adw.PreferencesGroup",
    "Adw.ActionRow",
    "Adw.ExpanderRow",
    "Adw.ComboRow",
    "Adw.SwitchRow",
    "Adw.SpinRow",
    "Adw.EntryRow",
    "Gtk.Widget",
    "Gtk.Box",
    "Gtk.Button",
];

const CONSTRUCTOR_BAD_PATTERNS: &[(&str, &str)] = &[
    (r"this\.getSettings\s*\(", "this.getSettings()"),
    (r"\.connect\s*\(", ".connect()"),
    (r"\.connectObject\s*\(", ".connectObject()"),
    (r"timeout_add", "GLib.timeout_add()"),
    (r"new\s+Gio\.DBusProxy", "new Gio.DBusProxy()"),
];

fn is_comment_line(line: &str) -> bool {
    let stripped = line.trim_start();
    stripped.starts_with("//") || stripped.starts_with('*')
}

fn is_widget_base(base: &str) -> bool {
    if WIDGET_BASES.contains(&base) {
        return true;
    }
    let short = base.rsplit('.').next().unwrap_or(base);
    WIDGET_BASES
        .iter()
        .any(|b| b.rsplit('.').next().unwrap_or(b) == short)
}

/// Try/catch blocks per function, plus try-wrapped destroy() calls.
fn check_try_catch_density(ctx: &CheckContext) -> Vec<Finding> {
    let mut total_try = 0usize;
    let mut total_funcs = 0usize;
    let mut destroy_wraps: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        let lines: Vec<&str> = content.lines().collect();
        let mut func_count = 0usize;
        let mut try_count = 0usize;

        for (i, line) in lines.iter().enumerate() {
            if FUNC_DECL_RE.is_match(line) {
                func_count += 1;
            } else if METHOD_DECL_RE.is_match(line) && !KEYWORD_RE.is_match(line) {
                func_count += 1;
            }

            if TRY_OPEN_RE.is_match(line) {
                try_count += 1;
                let block = lines[i..lines.len().min(i + 5)].join("\n");
                if DESTROY_WRAP_RE.is_match(&block) {
                    destroy_wraps.push(format!("{rel}:{}", i + 1));
                }
            }
        }

        total_try += try_count;
        total_funcs += func_count.max(1);
    }

    let ratio = total_try as f64 / total_funcs.max(1) as f64;
    let mut findings = Vec::new();
    if ratio > 0.5 && total_try >= 3 {
        findings.push(Finding::warn(
            "quality/try-catch-density",
            format!(
                "{total_try} try-catch blocks across {total_funcs} functions (ratio: {ratio:.1}) - review for necessity"
            ),
        ));
    } else {
        findings.push(Finding::pass(
            "quality/try-catch-density",
            format!("Try-catch ratio acceptable ({total_try}/{total_funcs})"),
        ));
    }

    for loc in destroy_wraps {
        findings.push(Finding::warn(
            "quality/destroy-try-catch",
            format!("{loc}: try-catch around .destroy() - usually unnecessary"),
        ));
    }
    findings
}

/// Lock-screen state checks in an extension that never runs there.
fn check_impossible_state(ctx: &CheckContext) -> Vec<Finding> {
    let has_lock = ctx
        .manifest
        .as_ref()
        .is_some_and(|m| m.has_session_mode("unlock-dialog") || m.has_session_mode("gdm"));
    if has_lock {
        return vec![Finding::pass(
            "quality/impossible-state",
            "Extension declares lock screen session-modes",
        )];
    }

    let mut findings = Vec::new();
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        for (idx, line) in content.lines().enumerate() {
            if IS_LOCKED_RE.is_match(line) {
                findings.push(Finding::warn(
                    "quality/impossible-state",
                    format!(
                        "{rel}:{}: checks isLocked but extension does not run in lock screen",
                        idx + 1
                    ),
                ));
            } else if UNLOCK_CHECK_RE.is_match(line) {
                findings.push(Finding::warn(
                    "quality/impossible-state",
                    format!(
                        "{rel}:{}: checks for unlock-dialog but extension does not declare this session-mode",
                        idx + 1
                    ),
                ));
            }
        }
    }

    if findings.is_empty() {
        findings.push(Finding::pass(
            "quality/impossible-state",
            "No impossible state checks found",
        ));
    }
    findings
}

/// `_pendingDestroy` + `_initializing` coordination is over-engineered.
fn check_pendulum_pattern(ctx: &CheckContext) -> Vec<Finding> {
    let mut has_pending = false;
    let mut has_initializing = false;
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        if content.contains("_pendingDestroy") {
            has_pending = true;
        }
        if content.contains("_initializing") {
            has_initializing = true;
        }
    }

    if has_pending && has_initializing {
        vec![Finding::warn(
            "quality/pendulum-pattern",
            "Uses _pendingDestroy + _initializing coordination - consider simpler _destroyed flag pattern per GNOME conventions",
        )]
    } else {
        vec![Finding::pass(
            "quality/pendulum-pattern",
            "No over-engineered async coordination detected",
        )]
    }
}

/// Module-level let/var declarations, unless reset to null somewhere.
fn check_module_state(ctx: &CheckContext) -> Vec<Finding> {
    let mut found: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        let mut brace_depth = 0i32;

        for (i, line) in content.lines().enumerate() {
            brace_depth += crate::source::brace_delta(line);

            if brace_depth <= 0 {
                if let Some(caps) = MODULE_VAR_RE.captures(line) {
                    let var_name = &caps[2];
                    let reset = Regex::new(&format!(r"\b{}\s*=\s*null\b", regex::escape(var_name)))
                        .expect("escaped identifier always compiles");
                    if reset.is_match(&content) {
                        continue; // developer manages cleanup
                    }
                    found.push(format!("{rel}:{}", i + 1));
                }
            }
        }
    }

    if found.is_empty() {
        vec![Finding::pass(
            "quality/module-state",
            "No module-level mutable state found",
        )]
    } else {
        let locations = found[..found.len().min(5)].join(", ");
        vec![Finding::warn(
            "quality/module-state",
            format!(
                "Module-level mutable state at {locations} - ensure reset in both enable() and disable()"
            ),
        )]
    }
}

/// Empty catch blocks, unless the try body was itself cleanup or a dynamic
/// module load.
fn check_empty_catch(ctx: &CheckContext) -> Vec<Finding> {
    let mut found: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);

        for m in CATCH_BLOCK_RE.captures_iter(&content) {
            let body = m[1].trim().to_string();
            let only_comments = body.is_empty()
                || body.lines().all(|line| {
                    let t = line.trim();
                    t.is_empty() || t.starts_with("//") || t.starts_with('*')
                });
            if !only_comments {
                continue;
            }

            let whole = m.get(0).expect("group 0 always present");
            let before_catch = &content[..whole.start()];
            if let Some(try_caps) = TRY_BODY_BEFORE_RE.captures(before_catch) {
                if CLEANUP_CALL_RE.is_match(&try_caps[1]) {
                    continue;
                }
            }

            found.push(format!("{rel}:{}", line_number_at(&content, whole.start())));
        }
    }

    if found.is_empty() {
        vec![Finding::pass(
            "quality/empty-catch",
            "No empty catch blocks found",
        )]
    } else {
        found
            .into_iter()
            .map(|loc| {
                Finding::warn(
                    "quality/empty-catch",
                    format!("{loc}: empty catch block - at minimum log with console.debug()"),
                )
            })
            .collect()
    }
}

/// Density of destroyed-flag checks across the bundle.
fn check_destroyed_density(ctx: &CheckContext) -> Vec<Finding> {
    const PATTERNS: &[&str] = &["_destroyed", "_pendingDestroy", "_initializing"];
    let mut total_occurrences = 0usize;
    let mut total_lines = 0usize;
    let mut file_counts: Vec<(String, usize)> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        total_lines += content.lines().filter(|l| !l.trim().is_empty()).count();
        let count: usize = content
            .lines()
            .map(|line| PATTERNS.iter().map(|p| line.matches(p).count()).sum::<usize>())
            .sum();
        if count > 0 {
            file_counts.push((rel, count));
        }
        total_occurrences += count;
    }

    if total_occurrences >= 10 && total_lines > 0 {
        let ratio = total_occurrences as f64 / total_lines as f64;
        if ratio > 0.02 {
            let mut sorted = file_counts.clone();
            sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let files_summary = sorted
                .iter()
                .take(3)
                .map(|(f, c)| format!("{f}({c})"))
                .collect::<Vec<_>>()
                .join(", ");
            return vec![Finding::warn(
                "quality/destroyed-density",
                format!(
                    "{total_occurrences} _destroyed/_pendingDestroy/_initializing checks across {} files (ratio: {ratio:.3}) - top: {files_summary}",
                    file_counts.len()
                ),
            )];
        }
    }

    vec![Finding::pass(
        "quality/destroyed-density",
        format!("Destroyed-flag density acceptable ({total_occurrences} in {total_lines} lines)"),
    )]
}

/// Mock/test code shipped in the production bundle.
fn check_mock_in_production(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();

    for path in &ctx.files {
        let rel = ctx.rel(path);
        let basename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();

        if basename.starts_with("mock")
            || basename.starts_with("test")
            || basename.starts_with("spec")
            || basename.ends_with(".test.js")
            || basename.ends_with(".spec.js")
        {
            findings.push(Finding::warn(
                "quality/mock-in-production",
                format!("{rel}: mock/test file should not ship in production extension"),
            ));
        }

        let Some(content) = ctx.read(path) else {
            continue;
        };
        let has_try_import_guard = TRY_IMPORT_GUARD_RE.is_match(&content);

        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            if MOCK_TRIGGER_RE.is_match(line) {
                if has_try_import_guard {
                    continue;
                }
                let prev = if idx >= 1 { Some(lines[idx - 1]) } else { None };
                if is_suppressed(line, prev, "quality/mock-in-production") {
                    continue;
                }
                findings.push(Finding::warn(
                    "quality/mock-in-production",
                    format!("{rel}:{}: runtime mock trigger detected - remove for production", idx + 1),
                ));
            }
        }
    }

    if findings.is_empty() {
        findings.push(Finding::pass(
            "quality/mock-in-production",
            "No mock/test code detected in production files",
        ));
    }
    findings
}

/// Resource allocation inside constructors.
///
/// Widget subclasses and classes with their own destroy() method are
/// exempt: their constructors run within the enable/disable lifecycle.
fn check_constructor_resources(ctx: &CheckContext) -> Vec<Finding> {
    let bad: Vec<(Regex, &str)> = CONSTRUCTOR_BAD_PATTERNS
        .iter()
        .map(|(p, d)| (Regex::new(p).unwrap(), *d))
        .collect();

    let mut findings = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);

        for m in CTOR_HEADER_RE.find_iter(&content) {
            // Nearest class declaration above this constructor.
            let last_base = CLASS_EXTENDS_RE
                .captures_iter(&content)
                .take_while(|c| c.get(0).unwrap().start() < m.start())
                .last()
                .map(|c| c[2].to_string());
            if last_base.as_deref().is_some_and(is_widget_base) {
                continue;
            }

            // Lifecycle-aware classes (own destroy()) manage themselves.
            let class_start = CLASS_HEADER_RE
                .find_iter(&content)
                .take_while(|c| c.start() < m.start())
                .last()
                .map(|c| c.start());
            if let Some(start) = class_start {
                let class_end = NEXT_CLASS_RE
                    .find(&content[m.start()..])
                    .map(|n| m.start() + n.start())
                    .unwrap_or(content.len());
                if DESTROY_METHOD_RE.is_match(&content[start..class_end]) {
                    continue;
                }
            }

            // Constructor body via brace walk.
            let bytes = content.as_bytes();
            let mut depth = 1i32;
            let mut pos = m.end();
            while pos < bytes.len() && depth > 0 {
                match bytes[pos] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                pos += 1;
            }
            let body_end = if depth == 0 { pos - 1 } else { pos };
            let body = &content[m.end()..body_end.max(m.end())];
            let body_start_line = line_number_at(&content, m.start());

            for (re, name) in &bad {
                for hit in re.find_iter(body) {
                    let hit_line = body_start_line + body[..hit.start()].matches('\n').count() + 1;
                    findings.push(Finding::warn(
                        "quality/constructor-resources",
                        format!("{rel}:{hit_line}: {name} in constructor - move to enable()"),
                    ));
                }
            }
        }
    }

    if findings.is_empty() {
        findings.push(Finding::pass(
            "quality/constructor-resources",
            "No resource allocation in constructors",
        ));
    }
    findings
}

/// Total bundle volume.
fn check_code_volume(ctx: &CheckContext) -> Vec<Finding> {
    let mut total_lines = 0usize;
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        total_lines += content.lines().filter(|l| !l.trim().is_empty()).count();
    }

    if total_lines > 8000 {
        vec![Finding::warn(
            "quality/code-volume",
            format!(
                "{total_lines} non-blank JS lines - large codebase; ensure all code is necessary and manually reviewed"
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/code-volume",
            format!("Code volume OK ({total_lines} non-blank lines)"),
        )]
    }
}

/// Comment-to-code ratio per file (license header excluded).
fn check_comment_density(ctx: &CheckContext) -> Vec<Finding> {
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < 50 {
            continue;
        }

        let mut comment_lines = 0usize;
        let mut code_lines = 0usize;
        let mut in_block_comment = false;

        for line in lines.iter().skip(10) {
            let stripped = line.trim();
            if stripped.is_empty() {
                continue;
            }
            if in_block_comment {
                comment_lines += 1;
                if stripped.contains("*/") {
                    in_block_comment = false;
                }
                continue;
            }
            if stripped.starts_with("/*") {
                comment_lines += 1;
                if !stripped.contains("*/") {
                    in_block_comment = true;
                }
                continue;
            }
            if stripped.starts_with("//") || stripped.starts_with('*') {
                comment_lines += 1;
            } else {
                code_lines += 1;
            }
        }

        let total = comment_lines + code_lines;
        if total > 0 && comment_lines as f64 / total as f64 > 0.4 {
            return vec![Finding::warn(
                "quality/comment-density",
                format!(
                    "{rel}: {comment_lines}/{total} lines are comments ({}%) - may indicate AI-generated verbose comments",
                    comment_lines * 100 / total
                ),
            )];
        }
    }

    vec![Finding::pass(
        "quality/comment-density",
        "Comment density acceptable",
    )]
}

/// Per-file non-blank line thresholds; prefs.js builds widget trees in code
/// and gets a higher allowance.
fn check_file_complexity(ctx: &CheckContext) -> Vec<Finding> {
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let count = content.lines().filter(|l| !l.trim().is_empty()).count();
        let is_prefs = path.file_name().and_then(|n| n.to_str()) == Some("prefs.js");
        let threshold = if is_prefs { 2000 } else { 1500 };
        if count > threshold {
            return vec![Finding::warn(
                "quality/file-complexity",
                format!(
                    "{}: {count} non-blank lines - consider splitting into modules",
                    ctx.rel(path)
                ),
            )];
        }
    }

    vec![Finding::pass(
        "quality/file-complexity",
        "No individual files exceed complexity thresholds",
    )]
}

/// console.debug() call volume.
fn check_debug_volume(ctx: &CheckContext) -> Vec<Finding> {
    let mut total = 0usize;
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            if is_comment_line(line) {
                continue;
            }
            total += CONSOLE_DEBUG_RE.find_iter(line).count();
        }
    }

    if total > 15 {
        vec![Finding::warn(
            "quality/debug-volume",
            format!(
                "{total} console.debug() calls - excessive for production; remove or reduce debug logging before submission"
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/debug-volume",
            format!("Debug logging volume OK ({total} calls)"),
        )]
    }
}

/// Total console.* call volume, threshold scaling with bundle size.
fn check_logging_volume(ctx: &CheckContext) -> Vec<Finding> {
    let mut total = 0usize;
    let mut total_non_blank = 0usize;
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            if is_comment_line(line) {
                continue;
            }
            if !line.trim().is_empty() {
                total_non_blank += 1;
            }
            // console.log excluded - already a blocking pattern rule
            total += CONSOLE_ANY_RE.find_iter(line).count();
        }
    }

    let threshold = 30.max(total_non_blank / 70);
    if total > threshold {
        vec![Finding::warn(
            "quality/logging-volume",
            format!(
                "{total} total console.* calls (threshold: {threshold} for {total_non_blank} lines) - excessive logging may cause rejection; keep only essential error/warning messages"
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/logging-volume",
            format!("Total logging volume OK ({total} calls, threshold: {threshold})"),
        )]
    }
}

/// Main.notify() call volume.
fn check_notification_volume(ctx: &CheckContext) -> Vec<Finding> {
    let mut total = 0usize;
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            if is_comment_line(line) {
                continue;
            }
            total += NOTIFY_RE.find_iter(line).count();
        }
    }

    if total > 5 {
        vec![Finding::warn(
            "quality/notification-volume",
            format!(
                "{total} Main.notify() call sites - reviewers consider excessive notifications a rejection risk; keep 2-3 essential (errors, one-time setup)"
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/notification-volume",
            format!("Notification volume OK ({total} call sites)"),
        )]
    }
}

/// Private underscore-prefixed Shell API access.
fn check_private_api(ctx: &CheckContext) -> Vec<Finding> {
    let mut matches: Vec<(String, usize, &'static str)> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            let prev = if idx >= 1 { Some(lines[idx - 1]) } else { None };
            if is_suppressed(line, prev, "quality/private-api") {
                continue;
            }
            for (re, desc) in PRIVATE_API_RES.iter() {
                if re.is_match(line) {
                    matches.push((rel.clone(), idx + 1, *desc));
                }
            }
        }
    }

    if matches.is_empty() {
        return vec![Finding::pass(
            "quality/private-api",
            "No private GNOME Shell API access detected",
        )];
    }

    let mut findings: Vec<Finding> = matches
        .iter()
        .take(5)
        .map(|(rel, lineno, desc)| {
            Finding::warn(
                "quality/private-api",
                format!("{rel}:{lineno}: {desc} - requires reviewer justification and version pinning"),
            )
        })
        .collect();
    if matches.len() > 5 {
        findings.push(Finding::warn(
            "quality/private-api",
            format!("...and {} more private API access(es)", matches.len() - 5),
        ));
    }
    findings
}

/// Direct Gettext.dgettext() in entry points, where this.gettext() exists.
fn check_gettext_pattern(ctx: &CheckContext) -> Vec<Finding> {
    let mut locations: Vec<String> = Vec::new();

    for path in &ctx.files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name != "extension.js" && name != "prefs.js" {
            continue;
        }
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        for (idx, line) in content.lines().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            if GETTEXT_RE.is_match(line) {
                locations.push(format!("{rel}:{}", idx + 1));
            }
        }
    }

    if locations.is_empty() {
        vec![Finding::pass(
            "quality/gettext-pattern",
            "Gettext usage follows recommended pattern",
        )]
    } else {
        vec![Finding::warn(
            "quality/gettext-pattern",
            format!(
                "Uses Gettext.dgettext() directly ({}) - hardcoded gettext domain creates maintenance burden if domain changes; use this.gettext() from the Extension base class",
                locations[..locations.len().min(5)].join(", ")
            ),
        )]
    }
}

/// Verbose destroy guards vs idiomatic optional chaining.
fn check_redundant_cleanup(ctx: &CheckContext) -> Vec<Finding> {
    let mut verbose = 0usize;
    let mut idiomatic = 0usize;

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        verbose += VERBOSE_CLEANUP_RE.find_iter(&content).count();
        idiomatic += IDIOMATIC_CLEANUP_RE.find_iter(&content).count();
    }

    let total = verbose + idiomatic;
    if total >= 4 && verbose as f64 / total.max(1) as f64 > 0.6 {
        vec![Finding::warn(
            "quality/redundant-cleanup",
            format!(
                "{verbose} verbose destroy guards vs {idiomatic} idiomatic '?.destroy()' - prefer optional chaining for cleanup"
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/redundant-cleanup",
            format!("Cleanup pattern balance OK (verbose: {verbose}, idiomatic: {idiomatic})"),
        )]
    }
}

/// Imperative instructional comments read like LLM prompts.
fn check_comment_prompt_density(ctx: &CheckContext) -> Vec<Finding> {
    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let count = content
            .lines()
            .filter(|line| PROMPT_COMMENT_RE.is_match(line))
            .count();
        if count > 5 {
            return vec![Finding::warn(
                "quality/comment-prompt-density",
                format!(
                    "{}: {count} imperative instructional comments - reads like LLM prompts; explain 'why' not 'what to do'",
                    ctx.rel(path)
                ),
            )];
        }
    }

    vec![Finding::pass(
        "quality/comment-prompt-density",
        "No excessive instructional comment patterns",
    )]
}

/// run_dispose() bypasses normal GObject lifecycle and needs justification.
fn check_run_dispose_comment(ctx: &CheckContext) -> Vec<Finding> {
    let mut found: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        let lines: Vec<&str> = content.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            if !line.contains(".run_dispose()") {
                continue;
            }
            if line.contains("//") {
                continue;
            }
            if i > 0 && lines[i - 1].trim_start().starts_with("//") {
                continue;
            }
            found.push(format!("{rel}:{}", i + 1));
        }
    }

    if found.is_empty() {
        vec![Finding::pass(
            "quality/run-dispose-no-comment",
            "All run_dispose() calls have comments or none found",
        )]
    } else {
        found
            .into_iter()
            .map(|loc| {
                Finding::warn(
                    "quality/run-dispose-no-comment",
                    format!("{loc}: run_dispose() without explanatory comment - reviewers require justification"),
                )
            })
            .collect()
    }
}

/// Clipboard use must be disclosed in the store description.
fn check_clipboard_disclosure(ctx: &CheckContext) -> Vec<Finding> {
    let uses_clipboard = ctx.files.iter().any(|path| {
        ctx.read(path)
            .is_some_and(|content| content.contains("St.Clipboard"))
    });
    if !uses_clipboard {
        return vec![Finding::pass(
            "quality/clipboard-disclosure",
            "No St.Clipboard usage detected",
        )];
    }

    match Manifest::load(&ctx.ext_dir) {
        Ok(Some(manifest)) => {
            let description = manifest.description().unwrap_or("").to_lowercase();
            if description.contains("clipboard") {
                vec![Finding::pass(
                    "quality/clipboard-disclosure",
                    "St.Clipboard usage disclosed in metadata description",
                )]
            } else {
                vec![Finding::warn(
                    "quality/clipboard-disclosure",
                    "St.Clipboard used but metadata description does not mention clipboard access",
                )]
            }
        }
        Ok(None) => vec![Finding::warn(
            "quality/clipboard-disclosure",
            "St.Clipboard used but metadata.json not found",
        )],
        Err(_) => vec![Finding::warn(
            "quality/clipboard-disclosure",
            "St.Clipboard used but metadata.json could not be read",
        )],
    }
}

/// Network APIs must be disclosed in the store description.
fn check_network_disclosure(ctx: &CheckContext) -> Vec<Finding> {
    const NETWORK_PATTERNS: &[&str] = &["Soup.Session", "Soup.Message", "Soup.URI", "GLib.Uri"];
    const DISCLOSURE_KEYWORDS: &[&str] = &[
        "network", "internet", "http", "api", "server", "online", "fetch", "request", "web",
        "service",
    ];

    let has_network = ctx
        .files
        .iter()
        .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some("prefs.js"))
        .any(|path| {
            ctx.read(path)
                .is_some_and(|content| NETWORK_PATTERNS.iter().any(|p| content.contains(p)))
        });
    if !has_network {
        return vec![Finding::pass(
            "quality/network-disclosure",
            "No network API usage detected",
        )];
    }

    match Manifest::load(&ctx.ext_dir) {
        Ok(Some(manifest)) => {
            let description = manifest.description().unwrap_or("").to_lowercase();
            for keyword in DISCLOSURE_KEYWORDS {
                if description.contains(keyword) {
                    return vec![Finding::pass(
                        "quality/network-disclosure",
                        format!(
                            "Network API usage disclosed in metadata description (keyword: '{keyword}')"
                        ),
                    )];
                }
            }
            vec![Finding::warn(
                "quality/network-disclosure",
                "Network APIs used (Soup/GLib.Uri) but metadata description does not mention network access - reviewers expect disclosure",
            )]
        }
        Ok(None) => vec![Finding::warn(
            "quality/network-disclosure",
            "Network APIs used but metadata.json not found",
        )],
        Err(_) => vec![Finding::warn(
            "quality/network-disclosure",
            "Network APIs used but metadata.json could not be read",
        )],
    }
}

/// Null/undefined checks where optional chaining would do.
fn check_excessive_null_checks(ctx: &CheckContext) -> Vec<Finding> {
    let mut total_checks = 0usize;
    let mut total_lines = 0usize;

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        total_lines += content.lines().filter(|l| !l.trim().is_empty()).count();
        for line in content.lines() {
            if is_comment_line(line) {
                continue;
            }
            for re in NULL_CHECK_RES.iter() {
                total_checks += re.find_iter(line).count();
            }
        }
    }

    if total_lines > 0 && total_checks >= 15 {
        let ratio = total_checks as f64 / total_lines as f64;
        if ratio > 0.02 {
            return vec![Finding::warn(
                "quality/excessive-null-checks",
                format!(
                    "{total_checks} null/undefined checks across {total_lines} lines (ratio: {ratio:.3}) - prefer optional chaining (?.) or nullish coalescing (??)"
                ),
            )];
        }
    }

    vec![Finding::pass(
        "quality/excessive-null-checks",
        format!("Null/undefined check density acceptable ({total_checks} in {total_lines} lines)"),
    )]
}

/// Repeated settings construction across the runtime surface.
fn check_repeated_settings(ctx: &CheckContext) -> Vec<Finding> {
    let mut total = 0usize;
    let mut locations: Vec<String> = Vec::new();

    for path in &ctx.files {
        if path.file_name().and_then(|n| n.to_str()) == Some("prefs.js") {
            continue; // multiple getSettings in prefs is normal
        }
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        for (idx, line) in content.lines().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            if SETTINGS_RE.is_match(line) {
                total += 1;
                locations.push(format!("{rel}:{}", idx + 1));
            }
        }
    }

    if total > 2 {
        vec![Finding::warn(
            "quality/repeated-settings",
            format!(
                "{total} getSettings()/Gio.Settings instances across extension files ({}) - store a single instance and pass via dependency injection",
                locations[..locations.len().min(5)].join(", ")
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/repeated-settings",
            format!("Settings instances OK ({total} across extension files)"),
        )]
    }
}

/// Obfuscator-style identifiers (hex vars, letter+digit declarations).
fn check_obfuscated_names(ctx: &CheckContext) -> Vec<Finding> {
    let mut names: Vec<String> = Vec::new();
    let mut total_usages = 0usize;

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            if is_comment_line(line) {
                continue;
            }
            let stripped = line.trim_start();
            for m in HEX_VAR_RE.find_iter(stripped) {
                names.push(m.as_str().to_string());
                total_usages += 1;
            }
            for caps in SHORT_DECL_RE.captures_iter(stripped) {
                names.push(caps[1].to_string());
                total_usages += 1;
            }
        }
    }

    names.sort();
    names.dedup();

    if names.len() >= 15 || total_usages >= 50 {
        vec![Finding::fail(
            "quality/obfuscated-names",
            format!(
                "Detected {} obfuscator-style variable names ({total_usages} usages) - code appears minified or obfuscated",
                names.len()
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/obfuscated-names",
            format!("No significant obfuscation detected ({} suspect names)", names.len()),
        )]
    }
}

/// Files mixing tab and space indentation.
fn check_mixed_indentation(ctx: &CheckContext) -> Vec<Finding> {
    let mut mixed_files: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let mut tab_lines = 0usize;
        let mut space_lines = 0usize;
        for line in content.lines() {
            if line.starts_with('\t') && !line.starts_with("\t//") {
                tab_lines += 1;
            } else if line.starts_with("    ") {
                space_lines += 1;
            }
        }

        let total = tab_lines + space_lines;
        if total > 10 && tab_lines > 0 && space_lines > 0 {
            let minority = tab_lines.min(space_lines);
            if minority as f64 / total as f64 > 0.10 {
                mixed_files.push(format!(
                    "{}(tabs:{tab_lines},spaces:{space_lines})",
                    ctx.rel(path)
                ));
            }
        }
    }

    if mixed_files.is_empty() {
        vec![Finding::pass(
            "quality/mixed-indentation",
            "Consistent indentation style",
        )]
    } else {
        vec![Finding::warn(
            "quality/mixed-indentation",
            format!(
                "Mixed tab/space indentation in {} file(s): {}",
                mixed_files.len(),
                mixed_files[..mixed_files.len().min(3)].join(", ")
            ),
        )]
    }
}

/// Heavy console.debug/log without any settings guard.
fn check_excessive_logging(ctx: &CheckContext) -> Vec<Finding> {
    let mut debug_count = 0usize;
    let mut has_guard = false;

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            if is_comment_line(line) {
                continue;
            }
            let stripped = line.trim_start();
            if DEBUG_LOG_RE.is_match(stripped) {
                debug_count += 1;
            }
            if LOG_GUARD_RE.is_match(stripped) {
                has_guard = true;
            }
        }
    }

    if debug_count > 15 && !has_guard {
        vec![Finding::warn(
            "quality/excessive-logging",
            format!(
                "{debug_count} console.debug/log calls without a settings guard - consider making debug output configurable"
            ),
        )]
    } else {
        vec![Finding::pass(
            "quality/excessive-logging",
            format!("Logging volume acceptable ({debug_count} debug/log calls)"),
        )]
    }
}

/// Positive indicators of hand-written authorship. Informational only.
fn check_code_provenance(ctx: &CheckContext) -> Vec<Finding> {
    let mut domain_vocab = 0usize;
    let mut nontrivial_algo = 0usize;
    let mut debug_comments = 0usize;
    let mut camel = 0usize;
    let mut snake = 0usize;

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            let stripped = line.trim();
            if stripped.is_empty() {
                continue;
            }

            domain_vocab += DOMAIN_VOCAB_RE.find_iter(stripped).count();
            if ALGO_RE.is_match(stripped) {
                nontrivial_algo += 1;
            }
            if DEBUG_COMMENT_RE.is_match(stripped) {
                debug_comments += 1;
            }
            for caps in PRIVATE_NAME_RE.captures_iter(stripped) {
                if caps[1][1..].contains('_') {
                    snake += 1;
                } else {
                    camel += 1;
                }
            }
        }
    }

    let mut signals: Vec<String> = Vec::new();
    if domain_vocab >= 5 {
        signals.push(format!("domain-vocabulary({domain_vocab})"));
    }
    if nontrivial_algo >= 3 {
        signals.push(format!("nontrivial-algorithms({nontrivial_algo})"));
    }
    if debug_comments >= 2 {
        signals.push(format!("debug-comments({debug_comments})"));
    }
    let total_names = camel + snake;
    if total_names >= 10 && camel.max(snake) as f64 / total_names as f64 > 0.9 {
        signals.push("consistent-naming-style".to_string());
    }

    let score = signals.len();
    let mut detail_parts = vec![format!("provenance-score={score}")];
    if !signals.is_empty() {
        detail_parts.push(format!("signals=[{}]", signals.join(", ")));
    }
    detail_parts.push(format!("files={}", ctx.files.len()));

    let prefix = if score >= 3 {
        "Strong hand-written indicators"
    } else if score >= 1 {
        "Some hand-written indicators"
    } else {
        "No strong provenance indicators"
    };
    vec![Finding::pass(
        "quality/code-provenance",
        format!("{prefix}: {}", detail_parts.join("; ")),
    )]
}

/// Run the full quality family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.files.is_empty() {
        return vec![Finding::skip("quality/no-js", "No JavaScript files found")];
    }
    let mut findings = Vec::new();
    findings.extend(check_try_catch_density(ctx));
    findings.extend(check_impossible_state(ctx));
    findings.extend(check_pendulum_pattern(ctx));
    findings.extend(check_module_state(ctx));
    findings.extend(check_empty_catch(ctx));
    findings.extend(check_destroyed_density(ctx));
    findings.extend(check_mock_in_production(ctx));
    findings.extend(check_constructor_resources(ctx));
    findings.extend(check_code_volume(ctx));
    findings.extend(check_comment_density(ctx));
    findings.extend(check_file_complexity(ctx));
    findings.extend(check_debug_volume(ctx));
    findings.extend(check_logging_volume(ctx));
    findings.extend(check_notification_volume(ctx));
    findings.extend(check_private_api(ctx));
    findings.extend(check_gettext_pattern(ctx));
    findings.extend(check_redundant_cleanup(ctx));
    findings.extend(check_comment_prompt_density(ctx));
    findings.extend(check_run_dispose_comment(ctx));
    findings.extend(check_clipboard_disclosure(ctx));
    findings.extend(check_network_disclosure(ctx));
    findings.extend(check_excessive_null_checks(ctx));
    findings.extend(check_repeated_settings(ctx));
    findings.extend(check_obfuscated_names(ctx));
    findings.extend(check_mixed_indentation(ctx));
    findings.extend(check_excessive_logging(ctx));
    findings.extend(check_code_provenance(ctx));
    findings
}
