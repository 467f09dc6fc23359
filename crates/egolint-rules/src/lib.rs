//! Check catalog for egolint - EGO review prediction for GNOME Shell extensions.
//!
//! This crate holds the static identifiers of every built-in heuristic check
//! plus the bundled default Tier 1 pattern rule file. Keeping the catalog in
//! its own crate lets the CLI and any future integration surface enumerate
//! checks without pulling in the engine.
//!
//! # Usage
//!
//! ```
//! use egolint_rules::CHECKS_DATA;
//!
//! // CHECKS_DATA is a static array of (check_id, summary) tuples
//! for (id, summary) in CHECKS_DATA {
//!     println!("{}: {}", id, summary);
//! }
//! ```
//!
//! # Check families
//!
//! - **lifecycle/**: resource release balance between enable() and disable()
//! - **resource-tracking/**: cross-file ownership graph orphans
//! - **quality/**: structural review-effort and trust heuristics
//! - **async/**: cancellation of in-flight operations
//! - **init/**: init-time Shell mutation
//! - **metadata/**, **css/**, **gobject/**, **prefs/**: packaging surfaces

/// The Tier 1 pattern rule file shipped with egolint.
///
/// Parsed at runtime by `egolint-core`; `egolint patterns --validate` is run
/// against this text in this crate's tests to keep it well-formed.
pub const DEFAULT_PATTERNS: &str = include_str!("../patterns.yaml");

/// Static catalog of built-in check identifiers.
///
/// The order matches registration order in the engine, which is also the
/// emission order of `egolint all`.
pub static CHECKS_DATA: &[(&str, &str)] = &[
    ("lifecycle/enable-method", "extension.js defines enable()"),
    ("lifecycle/disable-method", "extension.js defines disable()"),
    ("lifecycle/enable-disable", "enable()/disable() pair present"),
    ("lifecycle/default-export", "extension.js exports a default class"),
    ("lifecycle/signal-balance", "connect/disconnect call balance"),
    ("lifecycle/untracked-timeout", "timeout source IDs are stored"),
    ("lifecycle/timeout-not-removed", "stored timeout IDs removed in disable()"),
    ("lifecycle/connectObject-migration", "connectObject() migration advisory"),
    ("lifecycle/async-destroyed-guard", "await guarded by a destroyed flag"),
    ("lifecycle/timeout-return-value", "timeout callbacks return a source disposition"),
    ("lifecycle/keybinding-cleanup", "addKeybinding has matching removeKeybinding"),
    ("lifecycle/dbus-proxy-cleanup", "D-Bus proxies are disconnected"),
    ("lifecycle/file-monitor-cleanup", "file monitors are cancelled"),
    ("lifecycle/injection-cleanup", "InjectionManager is cleared"),
    ("lifecycle/prototype-override", "prototype overrides restored in disable()"),
    ("lifecycle/lockscreen-signals", "keyboard signals guarded on the lock screen"),
    ("lifecycle/selective-disable", "disable() never conditionally skips cleanup"),
    ("lifecycle/unlock-dialog-comment", "unlock-dialog behavior documented in disable()"),
    ("lifecycle/clipboard-keybinding", "clipboard + keybinding co-occurrence"),
    ("resource-tracking/orphan-signal", "signal with no disconnect in destroy chain"),
    ("resource-tracking/orphan-timeout", "timeout with no Source.remove in destroy chain"),
    ("resource-tracking/orphan-widget", "widget with no destroy in destroy chain"),
    ("resource-tracking/orphan-filemonitor", "monitor with no cancel in destroy chain"),
    ("resource-tracking/orphan-dbus", "D-Bus proxy with no disconnect in destroy chain"),
    ("resource-tracking/orphan-gsettings", "settings with no disconnect in destroy chain"),
    ("resource-tracking/no-destroy-method", "owned module allocates but has no cleanup method"),
    ("resource-tracking/destroy-not-called", "owned module cleanup is never invoked by parent"),
    ("resource-tracking/ownership", "ownership graph summary"),
    ("quality/try-catch-density", "try/catch blocks per function"),
    ("quality/destroy-try-catch", "try/catch wrapped around destroy()"),
    ("quality/impossible-state", "lock-screen checks without lock session modes"),
    ("quality/pendulum-pattern", "over-engineered async coordination flags"),
    ("quality/module-state", "module-level mutable state"),
    ("quality/empty-catch", "empty catch blocks"),
    ("quality/destroyed-density", "destroyed-flag check density"),
    ("quality/mock-in-production", "mock/test code in the shipped bundle"),
    ("quality/constructor-resources", "resource allocation in constructors"),
    ("quality/code-volume", "total non-blank line volume"),
    ("quality/comment-density", "comment-to-code ratio"),
    ("quality/file-complexity", "per-file non-blank line thresholds"),
    ("quality/debug-volume", "console.debug call volume"),
    ("quality/logging-volume", "total console.* call volume"),
    ("quality/notification-volume", "Main.notify call volume"),
    ("quality/private-api", "private underscore Shell API access"),
    ("quality/gettext-pattern", "Gettext.dgettext in entry points"),
    ("quality/redundant-cleanup", "verbose destroy guards vs optional chaining"),
    ("quality/comment-prompt-density", "imperative instructional comments"),
    ("quality/run-dispose-no-comment", "run_dispose() without justification"),
    ("quality/clipboard-disclosure", "clipboard use disclosed in the description"),
    ("quality/network-disclosure", "network use disclosed in the description"),
    ("quality/excessive-null-checks", "null checks vs optional chaining"),
    ("quality/repeated-settings", "repeated settings instance construction"),
    ("quality/obfuscated-names", "obfuscator-style identifiers"),
    ("quality/mixed-indentation", "mixed tab/space indentation"),
    ("quality/excessive-logging", "unguarded debug logging volume"),
    ("quality/code-provenance", "hand-written authorship indicators"),
    ("async/no-cancellable", "Gio async calls without a Cancellable"),
    ("async/cancellable-used", "Gio async calls paired with a Cancellable"),
    ("async/missing-cancellable", "per-call cancellable argument"),
    ("async/disable-no-cancel", "disable() cancels in-flight async work"),
    ("async/disable-cancellation", "disable() async cancellation present"),
    ("init/shell-modification", "Shell mutation outside enable()"),
    ("init/promisify-in-enable", "Gio._promisify placement"),
    ("metadata/exists", "metadata.json present"),
    ("metadata/valid-json", "metadata.json parses"),
    ("metadata/required-fields", "uuid/name/description/shell-version present"),
    ("metadata/uuid-format", "uuid character set"),
    ("metadata/uuid-matches-dir", "uuid matches the bundle directory"),
    ("metadata/uuid-no-gnome-org", "uuid outside the @gnome.org namespace"),
    ("metadata/shell-version-array", "shell-version is an array"),
    ("metadata/shell-version-current", "shell-version covers current GNOME"),
    ("metadata/session-modes", "no redundant session-modes key"),
    ("metadata/settings-schema", "settings-schema prefix"),
    ("css/scoping", "stylesheet class scoping"),
    ("css/unscoped-class", "bare generic class selectors"),
    ("css/important", "!important usage"),
    ("gobject/missing-gtypename", "registerClass carries GTypeName"),
    ("gobject/missing-super-init", "_init calls super._init()"),
    ("gobject/cairo-dispose", "draw callbacks dispose the Cairo context"),
    ("prefs/exists", "prefs.js present and readable"),
    ("prefs/prefs-method", "preferences entry method"),
    ("prefs/dual-prefs-pattern", "legacy + modern prefs methods combined"),
    ("prefs/missing-prefs-method", "no preferences entry method"),
    ("prefs/default-export", "prefs.js exports a default class"),
    ("prefs/extends-base", "prefs class extends ExtensionPreferences"),
    ("prefs/resource-path", "prefs.js avoids Shell UI resource paths"),
];

/// Returns the total number of cataloged checks.
pub fn check_count() -> usize {
    CHECKS_DATA.len()
}

/// Looks up a check by ID, returning the summary if found.
pub fn get_check_summary(id: &str) -> Option<&'static str> {
    CHECKS_DATA
        .iter()
        .find(|(check_id, _)| *check_id == id)
        .map(|(_, summary)| *summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_data_not_empty() {
        assert!(!CHECKS_DATA.is_empty(), "CHECKS_DATA should not be empty");
    }

    #[test]
    fn test_check_count() {
        assert_eq!(check_count(), CHECKS_DATA.len());
    }

    #[test]
    fn test_get_check_summary_exists() {
        let summary = get_check_summary("lifecycle/enable-method");
        assert!(summary.is_some(), "lifecycle/enable-method should exist");
    }

    #[test]
    fn test_get_check_summary_not_exists() {
        let summary = get_check_summary("nonexistent/check");
        assert!(summary.is_none(), "Nonexistent check should return None");
    }

    #[test]
    fn test_no_duplicate_ids() {
        let mut ids: Vec<&str> = CHECKS_DATA.iter().map(|(id, _)| *id).collect();
        let original_len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), original_len, "Should have no duplicate check IDs");
    }

    #[test]
    fn test_default_patterns_embedded() {
        assert!(DEFAULT_PATTERNS.contains("- id: R-SEC-01"));
        assert!(DEFAULT_PATTERNS.contains("severity: blocking"));
    }
}
