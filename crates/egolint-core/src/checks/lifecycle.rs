//! Lifecycle heuristics: resources allocated in enable() must be released
//! in disable().

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::source::{find_method_body, strip_comments};
use regex::Regex;
use std::sync::LazyLock;

static ENABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\benable\s*\(").unwrap());
static DISABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bdisable\s*\(").unwrap());
static DEFAULT_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\s+class\b").unwrap());
static CONNECT_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.connectObject\s*\(").unwrap());
static CONNECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.connect\s*\(").unwrap());
static DISCONNECT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.disconnect").unwrap());
static DISCONNECT_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.disconnectObject\s*\(").unwrap());
static DISCONNECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.disconnect\s*\(").unwrap());
static TIMEOUT_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(timeout_add|idle_add)\s*\(").unwrap());
static TIMEOUT_STORED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(=|return)\s*.*(timeout_add|idle_add)").unwrap());
static STORED_TIMEOUT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"this\.(_\w+)\s*=\s*.*?(timeout_add|idle_add)").unwrap());
static SOURCE_REMOVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Source\.remove|source_remove)\s*\(").unwrap());
static STORED_CONNECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*\w+\.connect\s*\(").unwrap());
static ASYNC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\basync\b").unwrap());
static AWAIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bawait\b").unwrap());
static DESTROYED_FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(_destroyed|_isDestroyed)\b").unwrap());
static ADD_KEYBINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.addKeybinding\s*\(").unwrap());
static REMOVE_KEYBINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.removeKeybinding\s*\(").unwrap());
static DBUS_PROXY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Gio\.DBusProxy\.new_for_bus|new\s+Gio\.DBusProxy|makeProxyWrapper").unwrap()
});
static FILE_MONITOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.monitor_file\s*\(|\.monitor_directory\s*\(|\.monitor_children\s*\(").unwrap()
});
static CANCEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.cancel\s*\(").unwrap());
static INJECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"new\s+InjectionManager\s*\(").unwrap());
static CLEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.clear\s*\(").unwrap());
static PROTOTYPE_SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+\.prototype\.\w+)\s*=").unwrap());
static PROTOTYPE_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Object\.assign\s*\(\s*(\w+\.prototype)").unwrap());
static SESSION_GUARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(currentMode|sessionMode|unlock-dialog|session-modes)").unwrap());
static EARLY_RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"if\s*\(([^)]+)\)\s*return\s*;").unwrap());
static NULL_GUARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\s*this\._\w+$").unwrap());
static LOCK_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)//.*\b(unlock|lock|session|mode)\b").unwrap());

const KEYBOARD_SIGNALS: &[&str] = &["key-press-event", "key-release-event", "captured-event"];

fn is_comment_line(line: &str) -> bool {
    let stripped = line.trim_start();
    stripped.starts_with("//") || stripped.starts_with('*')
}

/// Entry file must define the enable()/disable() pair.
fn check_enable_disable(ctx: &CheckContext) -> Vec<Finding> {
    let Some(entry) = ctx.entry_file() else {
        return Vec::new(); // file-structure checks cover a missing entry file
    };
    let Some(raw) = ctx.read(&entry) else {
        return Vec::new();
    };
    let content = strip_comments(&raw);

    let has_enable = ENABLE_RE.is_match(&content);
    let has_disable = DISABLE_RE.is_match(&content);

    let mut findings = Vec::new();
    if !has_enable {
        findings.push(Finding::fail(
            "lifecycle/enable-method",
            "extension.js missing enable() method",
        ));
    }
    if !has_disable {
        findings.push(Finding::fail(
            "lifecycle/disable-method",
            "extension.js missing disable() method",
        ));
    }
    if has_enable && has_disable {
        findings.push(Finding::pass(
            "lifecycle/enable-disable",
            "enable() and disable() both defined",
        ));
    }
    findings
}

/// Entry file should use the GNOME 45+ default-class-export form.
fn check_default_export(ctx: &CheckContext) -> Vec<Finding> {
    let Some(entry) = ctx.entry_file() else {
        return Vec::new();
    };
    let Some(raw) = ctx.read(&entry) else {
        return Vec::new();
    };
    let content = strip_comments(&raw);

    if DEFAULT_EXPORT_RE.is_match(&content) {
        vec![Finding::pass(
            "lifecycle/default-export",
            "extension.js has default export class",
        )]
    } else {
        vec![Finding::warn(
            "lifecycle/default-export",
            "extension.js missing 'export default class' - required for GNOME 45+",
        )]
    }
}

/// Manual connect/disconnect call balance across the runtime surface.
fn check_signal_balance(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut pure_connects = 0usize;
    let mut pure_disconnects = 0usize;
    let mut connect_objects = 0usize;

    for path in &ctx.runtime_files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        for line in content.lines() {
            if CONNECT_OBJECT_RE.is_match(line) {
                connect_objects += 1;
            } else if CONNECT_RE.is_match(line) && !DISCONNECT_WORD_RE.is_match(line) {
                pure_connects += 1;
            }
            if DISCONNECT_OBJECT_RE.is_match(line) {
                // auto-cleanup
            } else if DISCONNECT_RE.is_match(line) && !CONNECT_RE.is_match(line) {
                pure_disconnects += 1;
            }
        }
    }

    // connectObject auto-disconnects; only manual connects need matches.
    if pure_connects.saturating_sub(pure_disconnects) > 2 {
        vec![Finding::warn(
            "lifecycle/signal-balance",
            format!(
                "{pure_connects} manual .connect() calls but only {pure_disconnects} .disconnect() calls - verify all signals are disconnected in disable()"
            ),
        )]
    } else {
        vec![Finding::pass(
            "lifecycle/signal-balance",
            format!(
                "Signal balance OK ({pure_connects} connects, {pure_disconnects} disconnects, {connect_objects} connectObject)"
            ),
        )]
    }
}

/// timeout_add/idle_add return values must be stored somewhere removable.
fn check_untracked_timeouts(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();
    let mut any = false;
    for path in &ctx.runtime_files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        for (idx, line) in content.lines().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            let stripped = line.trim();
            if TIMEOUT_CALL_RE.is_match(stripped) && !TIMEOUT_STORED_RE.is_match(stripped) {
                any = true;
                findings.push(Finding::warn(
                    "lifecycle/untracked-timeout",
                    format!(
                        "{rel}:{}: timeout_add/idle_add return value not stored - cannot be removed in disable()",
                        idx + 1
                    ),
                ));
            }
        }
    }

    if !any {
        findings.push(Finding::pass(
            "lifecycle/untracked-timeout",
            "All timeout/idle sources have stored IDs",
        ));
    }
    findings
}

/// Stored timeout IDs in the entry file need Source.remove() in disable().
fn check_timeout_removal_in_disable(ctx: &CheckContext) -> Vec<Finding> {
    let Some(entry) = ctx.entry_file() else {
        return Vec::new();
    };
    let Some(raw) = ctx.read(&entry) else {
        return Vec::new();
    };
    let content = strip_comments(&raw);

    let mut stored_ids: Vec<String> = STORED_TIMEOUT_ID_RE
        .captures_iter(&content)
        .map(|caps| caps[1].to_string())
        .collect();
    stored_ids.sort();
    stored_ids.dedup();
    if stored_ids.is_empty() {
        return Vec::new();
    }

    let Some(disable) = find_method_body(&content, "disable") else {
        return Vec::new(); // the enable/disable check reports the absence
    };

    let has_general_remove = SOURCE_REMOVE_RE.is_match(&disable.body);
    let mut findings = Vec::new();
    for var in &stored_ids {
        let var_removed = Regex::new(&format!(
            r"(Source\.remove|source_remove)\s*\(\s*this\.{}",
            regex::escape(var)
        ))
        .expect("escaped identifier always compiles")
        .is_match(&disable.body);
        if !var_removed && !has_general_remove {
            findings.push(Finding::warn(
                "lifecycle/timeout-not-removed",
                format!(
                    "this.{var} stores timeout/idle source but no GLib.Source.remove() call found in disable()"
                ),
            ));
        }
    }

    if findings.is_empty() {
        findings.push(Finding::pass(
            "lifecycle/timeout-not-removed",
            "All stored timeout/idle IDs have Source.remove() in disable()",
        ));
    }
    findings
}

/// Suggest connectObject() once manual stored connections pile up.
fn check_connect_object_migration(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut manual_pairs = 0usize;
    let mut has_connect_object = false;
    for path in &ctx.runtime_files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        if CONNECT_OBJECT_RE.is_match(&content) {
            has_connect_object = true;
        }
        manual_pairs += STORED_CONNECT_RE.find_iter(&content).count();
    }

    if manual_pairs >= 3 && !has_connect_object {
        vec![Finding::warn(
            "lifecycle/connectObject-migration",
            format!(
                "{manual_pairs} manual signal connections found - consider using connectObject() for automatic cleanup"
            ),
        )]
    } else {
        vec![Finding::pass(
            "lifecycle/connectObject-migration",
            "Signal connection pattern OK",
        )]
    }
}

/// await without a destroyed flag can act on stale state after disable().
fn check_async_destroyed_guard(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut has_async_await = false;
    let mut has_destroyed_flag = false;
    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        if ASYNC_RE.is_match(&content) && AWAIT_RE.is_match(&content) {
            has_async_await = true;
        }
        if DESTROYED_FLAG_RE.is_match(&content) {
            has_destroyed_flag = true;
        }
    }

    if has_async_await && !has_destroyed_flag {
        vec![Finding::warn(
            "lifecycle/async-destroyed-guard",
            "async/await used without _destroyed or _isDestroyed guard - extension may act on stale state after disable()",
        )]
    } else if has_async_await {
        vec![Finding::pass(
            "lifecycle/async-destroyed-guard",
            "async/await with _destroyed guard detected",
        )]
    } else {
        Vec::new()
    }
}

/// Timeout callbacks must resolve to SOURCE_REMOVE or SOURCE_CONTINUE within
/// a short lookahead window.
fn check_timeout_return_value(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut missing: Vec<String> = Vec::new();
    'files: for path in &ctx.runtime_files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            if TIMEOUT_CALL_RE.is_match(line.trim()) {
                let window = lines[idx..lines.len().min(idx + 20)].join("\n");
                if !window.contains("SOURCE_REMOVE") && !window.contains("SOURCE_CONTINUE") {
                    missing.push(format!("{rel}:{}", idx + 1));
                    if missing.len() >= 3 {
                        break 'files;
                    }
                }
            }
        }
    }

    if missing.is_empty() {
        vec![Finding::pass(
            "lifecycle/timeout-return-value",
            "All timeout/idle callbacks return SOURCE_REMOVE or SOURCE_CONTINUE",
        )]
    } else {
        vec![Finding::warn(
            "lifecycle/timeout-return-value",
            format!(
                "timeout_add/idle_add callback missing SOURCE_REMOVE/SOURCE_CONTINUE: {}",
                missing.join(", ")
            ),
        )]
    }
}

/// addKeybinding() without removeKeybinding() leaks past disable().
fn check_keybinding_cleanup(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.files.is_empty() {
        return Vec::new();
    }

    let mut add_count = 0usize;
    let mut remove_count = 0usize;
    for path in &ctx.files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        add_count += ADD_KEYBINDING_RE.find_iter(&content).count();
        remove_count += REMOVE_KEYBINDING_RE.find_iter(&content).count();
    }

    if add_count > 0 && remove_count == 0 {
        vec![Finding::fail(
            "lifecycle/keybinding-cleanup",
            format!(
                "{add_count} addKeybinding() call(s) but no removeKeybinding() - keybindings will leak after disable()"
            ),
        )]
    } else if add_count > 0 {
        vec![Finding::pass(
            "lifecycle/keybinding-cleanup",
            format!("Keybinding balance OK ({add_count} add, {remove_count} remove)"),
        )]
    } else {
        Vec::new()
    }
}

/// D-Bus proxies should be disconnected somewhere.
fn check_dbus_proxy_lifecycle(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut has_proxy = false;
    let mut has_disconnect = false;
    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        if DBUS_PROXY_RE.is_match(&content) {
            has_proxy = true;
        }
        if content.contains("disconnectObject") || DISCONNECT_RE.is_match(&content) {
            has_disconnect = true;
        }
    }

    if has_proxy && !has_disconnect {
        vec![Finding::warn(
            "lifecycle/dbus-proxy-cleanup",
            "DBus proxy created but no disconnect/disconnectObject found - signals may leak after disable()",
        )]
    } else if has_proxy {
        vec![Finding::pass(
            "lifecycle/dbus-proxy-cleanup",
            "DBus proxy with disconnect pattern detected",
        )]
    } else {
        Vec::new()
    }
}

/// File monitors should be cancelled somewhere.
fn check_file_monitor_lifecycle(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut has_monitor = false;
    let mut has_cancel = false;
    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        if FILE_MONITOR_RE.is_match(&content) {
            has_monitor = true;
        }
        if CANCEL_RE.is_match(&content) {
            has_cancel = true;
        }
    }

    if has_monitor && !has_cancel {
        vec![Finding::warn(
            "lifecycle/file-monitor-cleanup",
            "File monitor created but no .cancel() found - monitor will continue after disable()",
        )]
    } else if has_monitor {
        vec![Finding::pass(
            "lifecycle/file-monitor-cleanup",
            "File monitor with cancel pattern detected",
        )]
    } else {
        Vec::new()
    }
}

/// InjectionManager must be cleared; bare prototype overrides must be
/// restored in disable().
fn check_injection_manager(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.runtime_files.is_empty() {
        return Vec::new();
    }

    let mut has_injection = false;
    let mut has_clear = false;
    let mut overrides: Vec<(String, String)> = Vec::new();

    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        if INJECTION_RE.is_match(&content) {
            has_injection = true;
        }
        if CLEAR_RE.is_match(&content) {
            has_clear = true;
        }

        let rel = ctx.rel(path);
        for caps in PROTOTYPE_SET_RE.captures_iter(&content) {
            overrides.push((rel.clone(), caps[1].to_string()));
        }
        for caps in PROTOTYPE_ASSIGN_RE.captures_iter(&content) {
            overrides.push((rel.clone(), format!("Object.assign({}, ...)", &caps[1])));
        }
    }

    let mut findings = Vec::new();
    if has_injection && !has_clear {
        findings.push(Finding::fail(
            "lifecycle/injection-cleanup",
            "new InjectionManager() found but no .clear() call - injections will persist after disable()",
        ));
    } else if has_injection {
        findings.push(Finding::pass(
            "lifecycle/injection-cleanup",
            "InjectionManager with .clear() cleanup detected",
        ));
    }

    if !overrides.is_empty() {
        let disable_restores = ctx
            .entry_file()
            .and_then(|entry| ctx.read(&entry))
            .map(|raw| strip_comments(&raw))
            .and_then(|content| find_method_body(&content, "disable"))
            .is_some_and(|disable| PROTOTYPE_SET_RE.is_match(&disable.body));

        if !disable_restores {
            for (rel, desc) in overrides {
                findings.push(Finding::warn(
                    "lifecycle/prototype-override",
                    format!(
                        "{rel}: {desc} - direct prototype modification should be restored in disable()"
                    ),
                ));
            }
        }
    }

    findings
}

/// Keyboard signals on the lock screen need a session-mode guard.
fn check_lockscreen_signals(ctx: &CheckContext) -> Vec<Finding> {
    if !ctx.has_session_mode("unlock-dialog") {
        return Vec::new();
    }

    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        let rel = ctx.rel(path);

        if !KEYBOARD_SIGNALS.iter().any(|sig| content.contains(sig)) {
            continue;
        }

        // Report once, on the first file binding a keyboard signal.
        return if SESSION_GUARD_RE.is_match(&content) {
            vec![Finding::pass(
                "lifecycle/lockscreen-signals",
                format!("{rel}: keyboard signal with session mode guard detected"),
            )]
        } else {
            vec![Finding::fail(
                "lifecycle/lockscreen-signals",
                format!(
                    "{rel}: keyboard signal connected but session-modes includes 'unlock-dialog' - must disconnect or guard keyboard signals on lock screen"
                ),
            )]
        };
    }

    Vec::new()
}

/// Conditional early returns in disable() skip cleanup.
fn check_selective_disable(ctx: &CheckContext) -> Vec<Finding> {
    let Some(entry) = ctx.entry_file() else {
        return Vec::new();
    };
    let Some(raw) = ctx.read(&entry) else {
        return Vec::new();
    };
    let content = strip_comments(&raw);
    let Some(disable) = find_method_body(&content, "disable") else {
        return Vec::new();
    };

    for caps in EARLY_RETURN_RE.captures_iter(&disable.body) {
        let condition = caps[1].trim().to_string();

        // `if (!this._x) return;` protects a single destroy; allowed.
        if NULL_GUARD_RE.is_match(&condition) {
            continue;
        }

        return vec![Finding::fail(
            "lifecycle/selective-disable",
            format!(
                "disable() has conditional return: 'if ({condition}) return;' - disable() must always clean up all resources regardless of state"
            ),
        )];
    }

    vec![Finding::pass(
        "lifecycle/selective-disable",
        "disable() does not conditionally skip cleanup",
    )]
}

/// Lock-screen extensions must document disable() behavior in a comment.
fn check_unlock_dialog_comment(ctx: &CheckContext) -> Vec<Finding> {
    if !ctx.has_session_mode("unlock-dialog") {
        return Vec::new();
    }
    let Some(entry) = ctx.entry_file() else {
        return Vec::new();
    };
    // Raw content: the whole point is reading the comments.
    let Some(raw) = ctx.read(&entry) else {
        return Vec::new();
    };
    let Some(disable) = find_method_body(&raw, "disable") else {
        return Vec::new();
    };

    if LOCK_COMMENT_RE.is_match(&disable.body) {
        vec![Finding::pass(
            "lifecycle/unlock-dialog-comment",
            "disable() has comment documenting lock screen behavior",
        )]
    } else {
        vec![Finding::warn(
            "lifecycle/unlock-dialog-comment",
            "extension declares 'unlock-dialog' session mode but disable() has no comment explaining lock screen behavior - add a comment documenting which resources need special handling on the lock screen",
        )]
    }
}

/// Clipboard access plus keybinding registration in one file is a keylogger
/// smell.
fn check_clipboard_keybinding(ctx: &CheckContext) -> Vec<Finding> {
    for path in &ctx.runtime_files {
        let Some(raw) = ctx.read(path) else {
            continue;
        };
        let content = strip_comments(&raw);
        if content.contains("St.Clipboard") && content.contains("addKeybinding") {
            return vec![Finding::warn(
                "lifecycle/clipboard-keybinding",
                format!(
                    "{}: St.Clipboard and addKeybinding() in same file - review whether keybinding-triggered clipboard access is intended and not a keylogger pattern",
                    ctx.rel(path)
                ),
            )];
        }
    }
    Vec::new()
}

/// Run the full lifecycle family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(check_enable_disable(ctx));
    findings.extend(check_default_export(ctx));
    findings.extend(check_signal_balance(ctx));
    findings.extend(check_untracked_timeouts(ctx));
    findings.extend(check_timeout_removal_in_disable(ctx));
    findings.extend(check_connect_object_migration(ctx));
    findings.extend(check_async_destroyed_guard(ctx));
    findings.extend(check_timeout_return_value(ctx));
    findings.extend(check_keybinding_cleanup(ctx));
    findings.extend(check_dbus_proxy_lifecycle(ctx));
    findings.extend(check_file_monitor_lifecycle(ctx));
    findings.extend(check_injection_manager(ctx));
    findings.extend(check_lockscreen_signals(ctx));
    findings.extend(check_selective_disable(ctx));
    findings.extend(check_unlock_dialog_comment(ctx));
    findings.extend(check_clipboard_keybinding(ctx));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Status;
    use std::fs;
    use tempfile::TempDir;

    fn ctx_with(files: &[(&str, &str)]) -> (TempDir, CheckContext) {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        let ctx = CheckContext::new(dir.path());
        (dir, ctx)
    }

    fn by_check<'a>(findings: &'a [Finding], check: &str) -> Vec<&'a Finding> {
        findings.iter().filter(|f| f.check == check).collect()
    }

    // ===== enable/disable and export =====

    #[test]
    fn test_enable_disable_pair_pass() {
        let (_d, ctx) = ctx_with(&[(
            "extension.js",
            "export default class E {\n  enable() {}\n  disable() {}\n}\n",
        )]);
        let findings = check_enable_disable(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check, "lifecycle/enable-disable");
        assert_eq!(findings[0].status, Status::Pass);
    }

    #[test]
    fn test_missing_disable_fails() {
        let (_d, ctx) = ctx_with(&[("extension.js", "class E {\n  enable() {}\n}\n")]);
        let findings = check_enable_disable(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check, "lifecycle/disable-method");
        assert_eq!(findings[0].status, Status::Fail);
    }

    #[test]
    fn test_commented_out_methods_do_not_count() {
        let (_d, ctx) = ctx_with(&[(
            "extension.js",
            "// enable() {}\n/* disable() {} */\nclass E {}\n",
        )]);
        let findings = check_enable_disable(&ctx);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.status == Status::Fail));
    }

    #[test]
    fn test_default_export_warn() {
        let (_d, ctx) = ctx_with(&[("extension.js", "class E {}\n")]);
        let findings = check_default_export(&ctx);
        assert_eq!(findings[0].status, Status::Warn);
    }

    // ===== Signal balance =====

    #[test]
    fn test_signal_balance_imbalance_warns() {
        let src = "a.connect('1', cb);\nb.connect('2', cb);\nc.connect('3', cb);\nd.connect('4', cb);\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_signal_balance(&ctx);
        assert_eq!(findings[0].status, Status::Warn);
        assert!(findings[0].detail.contains("4 manual .connect() calls"));
    }

    #[test]
    fn test_signal_balance_connect_object_not_counted() {
        let src = "a.connectObject('1', cb, this);\nb.connectObject('2', cb, this);\nc.connectObject('3', cb, this);\nd.connectObject('4', cb, this);\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_signal_balance(&ctx);
        assert_eq!(findings[0].status, Status::Pass);
    }

    // ===== Timeouts =====

    #[test]
    fn test_untracked_timeout_warns_per_site() {
        let src = "GLib.timeout_add(0, 1000, cb);\nthis._id = GLib.timeout_add(0, 5, cb);\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_untracked_timeouts(&ctx);
        let warns = by_check(&findings, "lifecycle/untracked-timeout");
        assert_eq!(warns.len(), 1);
        assert!(warns[0].detail.starts_with("extension.js:1"));
    }

    #[test]
    fn test_balanced_timeout_scenario() {
        // Spec scenario 1: stored id, removed in disable, SOURCE_REMOVE returned.
        let src = "export default class E {\n  enable() {\n    this._id = GLib.timeout_add(GLib.PRIORITY_DEFAULT, 1000, () => {\n      tick();\n      return GLib.SOURCE_REMOVE;\n    });\n  }\n  disable() {\n    GLib.Source.remove(this._id);\n    this._id = null;\n  }\n}\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);

        let removal = check_timeout_removal_in_disable(&ctx);
        assert_eq!(removal.len(), 1);
        assert_eq!(removal[0].check, "lifecycle/timeout-not-removed");
        assert_eq!(removal[0].status, Status::Pass);

        let untracked = check_untracked_timeouts(&ctx);
        assert_eq!(untracked[0].check, "lifecycle/untracked-timeout");
        assert_eq!(untracked[0].status, Status::Pass);

        let ret = check_timeout_return_value(&ctx);
        assert_eq!(ret[0].check, "lifecycle/timeout-return-value");
        assert_eq!(ret[0].status, Status::Pass);
    }

    #[test]
    fn test_stored_timeout_without_removal_warns() {
        let src = "export default class E {\n  enable() {\n    this._tick = GLib.timeout_add(0, 5, cb);\n  }\n  disable() {\n    this._other = null;\n  }\n}\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_timeout_removal_in_disable(&ctx);
        assert_eq!(findings[0].status, Status::Warn);
        assert!(findings[0].detail.contains("this._tick"));
    }

    #[test]
    fn test_timeout_return_value_missing() {
        let src = "GLib.timeout_add(0, 1000, () => {\n  tick();\n});\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_timeout_return_value(&ctx);
        assert_eq!(findings[0].status, Status::Warn);
        assert!(findings[0].detail.contains("extension.js:1"));
    }

    // ===== Keybindings, dbus, monitors =====

    #[test]
    fn test_keybinding_leak_fails() {
        let (_d, ctx) = ctx_with(&[("extension.js", "Main.wm.addKeybinding('k', s, 0, 0, cb);\n")]);
        let findings = check_keybinding_cleanup(&ctx);
        assert_eq!(findings[0].status, Status::Fail);
    }

    #[test]
    fn test_keybinding_balanced_passes() {
        let src = "Main.wm.addKeybinding('k', s, 0, 0, cb);\nMain.wm.removeKeybinding('k');\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_keybinding_cleanup(&ctx);
        assert_eq!(findings[0].status, Status::Pass);
    }

    #[test]
    fn test_no_keybindings_silent() {
        let (_d, ctx) = ctx_with(&[("extension.js", "enable() {}\n")]);
        assert!(check_keybinding_cleanup(&ctx).is_empty());
    }

    #[test]
    fn test_dbus_proxy_without_disconnect_warns() {
        let (_d, ctx) = ctx_with(&[(
            "extension.js",
            "this._proxy = Gio.DBusProxy.new_for_bus(...);\n",
        )]);
        let findings = check_dbus_proxy_lifecycle(&ctx);
        assert_eq!(findings[0].status, Status::Warn);
    }

    #[test]
    fn test_file_monitor_with_cancel_passes() {
        let src = "this._mon = file.monitor_file(0, null);\nthis._mon.cancel();\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_file_monitor_lifecycle(&ctx);
        assert_eq!(findings[0].status, Status::Pass);
    }

    // ===== Injection and prototypes =====

    #[test]
    fn test_injection_without_clear_fails() {
        let (_d, ctx) = ctx_with(&[("extension.js", "this._inj = new InjectionManager();\n")]);
        let findings = check_injection_manager(&ctx);
        assert!(by_check(&findings, "lifecycle/injection-cleanup")[0].status == Status::Fail);
    }

    #[test]
    fn test_prototype_override_without_restore_warns() {
        let (_d, ctx) = ctx_with(&[(
            "patch.js",
            "Panel.prototype.vfunc_allocate = function() {};\n",
        )]);
        let findings = check_injection_manager(&ctx);
        let warns = by_check(&findings, "lifecycle/prototype-override");
        assert_eq!(warns.len(), 1);
        assert!(warns[0].detail.contains("Panel.prototype.vfunc_allocate"));
    }

    #[test]
    fn test_prototype_override_restored_in_disable_ok() {
        let (_d, ctx) = ctx_with(&[
            ("patch.js", "Panel.prototype.vfunc_allocate = patched;\n"),
            (
                "extension.js",
                "export default class E {\n  disable() {\n    Panel.prototype.vfunc_allocate = original;\n  }\n}\n",
            ),
        ]);
        let findings = check_injection_manager(&ctx);
        assert!(by_check(&findings, "lifecycle/prototype-override").is_empty());
    }

    // ===== Lock screen =====

    const LOCK_META: &str =
        r#"{"uuid": "x@y", "session-modes": ["user", "unlock-dialog"], "shell-version": ["46"]}"#;

    #[test]
    fn test_lockscreen_keyboard_signal_unguarded_fails() {
        let (_d, ctx) = ctx_with(&[
            ("metadata.json", LOCK_META),
            (
                "extension.js",
                "global.stage.connect('key-press-event', cb);\n",
            ),
        ]);
        let findings = check_lockscreen_signals(&ctx);
        assert_eq!(findings[0].status, Status::Fail);
    }

    #[test]
    fn test_lockscreen_keyboard_signal_guarded_passes() {
        let (_d, ctx) = ctx_with(&[
            ("metadata.json", LOCK_META),
            (
                "extension.js",
                "if (Main.sessionMode.currentMode !== 'unlock-dialog')\n  global.stage.connect('key-press-event', cb);\n",
            ),
        ]);
        let findings = check_lockscreen_signals(&ctx);
        assert_eq!(findings[0].status, Status::Pass);
    }

    #[test]
    fn test_lockscreen_irrelevant_without_mode() {
        let (_d, ctx) = ctx_with(&[(
            "extension.js",
            "global.stage.connect('key-press-event', cb);\n",
        )]);
        assert!(check_lockscreen_signals(&ctx).is_empty());
    }

    // ===== Selective disable =====

    #[test]
    fn test_selective_disable_fails() {
        // Spec scenario 4.
        let src = "export default class E {\n  disable() {\n    if (this._enabled === false) return;\n    this._cleanup();\n  }\n}\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_selective_disable(&ctx);
        assert_eq!(findings[0].check, "lifecycle/selective-disable");
        assert_eq!(findings[0].status, Status::Fail);
        assert!(findings[0].detail.contains("this._enabled === false"));
    }

    #[test]
    fn test_null_guard_return_allowed() {
        let src = "export default class E {\n  disable() {\n    if (!this._indicator) return;\n    this._indicator.destroy();\n  }\n}\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_selective_disable(&ctx);
        assert_eq!(findings[0].status, Status::Pass);
    }

    // ===== unlock-dialog comment =====

    #[test]
    fn test_unlock_dialog_comment_missing_warns() {
        let (_d, ctx) = ctx_with(&[
            ("metadata.json", LOCK_META),
            (
                "extension.js",
                "export default class E {\n  disable() {\n    this._x?.destroy();\n  }\n}\n",
            ),
        ]);
        let findings = check_unlock_dialog_comment(&ctx);
        assert_eq!(findings[0].status, Status::Warn);
    }

    #[test]
    fn test_unlock_dialog_comment_present_passes() {
        let (_d, ctx) = ctx_with(&[
            ("metadata.json", LOCK_META),
            (
                "extension.js",
                "export default class E {\n  disable() {\n    // keep the indicator on the lock screen\n    this._x?.destroy();\n  }\n}\n",
            ),
        ]);
        let findings = check_unlock_dialog_comment(&ctx);
        assert_eq!(findings[0].status, Status::Pass);
    }

    // ===== Clipboard cross-reference =====

    #[test]
    fn test_clipboard_keybinding_cooccurrence_warns() {
        let src = "const c = St.Clipboard.get_default();\nMain.wm.addKeybinding('k', s, 0, 0, cb);\n";
        let (_d, ctx) = ctx_with(&[("extension.js", src)]);
        let findings = check_clipboard_keybinding(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Warn);
    }

    // ===== Family runner =====

    #[test]
    fn test_run_emits_group_in_order() {
        let (_d, ctx) = ctx_with(&[(
            "extension.js",
            "export default class E {\n  enable() {}\n  disable() {}\n}\n",
        )]);
        let findings = run(&ctx);
        assert!(!findings.is_empty());
        assert_eq!(findings[0].check, "lifecycle/enable-disable");
    }
}
