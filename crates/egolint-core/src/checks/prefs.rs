//! Preference surface (`prefs.js`) checks.

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::source::strip_comments;
use regex::Regex;
use std::sync::LazyLock;

static WIDGET_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgetPreferencesWidget\b").unwrap());
static FILL_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfillPreferencesWindow\b").unwrap());
static DEFAULT_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\s+class\b").unwrap());
static EXTENDS_BASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextends\s+ExtensionPreferences\b").unwrap());

/// Shell UI modules are not loadable from the preferences process.
const SHELL_UI_RESOURCE: &str = "resource:///org/gnome/shell/ui/";

/// Run the prefs family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let prefs_path = ctx.ext_dir.join("prefs.js");
    if !prefs_path.is_file() {
        return vec![Finding::skip("prefs/exists", "No prefs.js found")];
    }
    let Some(raw) = ctx.read(&prefs_path) else {
        return vec![Finding::skip("prefs/exists", "prefs.js could not be read")];
    };
    let content = strip_comments(&raw);

    let mut findings = Vec::new();

    let has_widget = WIDGET_METHOD_RE.is_match(&content);
    let has_fill = FILL_METHOD_RE.is_match(&content);

    if has_widget && has_fill {
        findings.push(Finding::fail(
            "prefs/dual-prefs-pattern",
            "prefs.js defines both getPreferencesWidget() and fillPreferencesWindow() - use only fillPreferencesWindow() for GNOME 45+",
        ));
    } else if has_fill {
        findings.push(Finding::pass(
            "prefs/prefs-method",
            "prefs.js uses fillPreferencesWindow()",
        ));
    } else if has_widget {
        findings.push(Finding::pass(
            "prefs/prefs-method",
            "prefs.js uses getPreferencesWidget()",
        ));
    } else {
        findings.push(Finding::warn(
            "prefs/missing-prefs-method",
            "prefs.js does not define fillPreferencesWindow() or getPreferencesWidget()",
        ));
    }

    let has_default_export = DEFAULT_EXPORT_RE.is_match(&content);
    if has_default_export {
        findings.push(Finding::pass(
            "prefs/default-export",
            "prefs.js has default export class",
        ));
        if EXTENDS_BASE_RE.is_match(&content) {
            findings.push(Finding::pass(
                "prefs/extends-base",
                "prefs.js extends ExtensionPreferences",
            ));
        } else {
            findings.push(Finding::warn(
                "prefs/extends-base",
                "prefs.js default class does not extend ExtensionPreferences - required for GNOME 45+",
            ));
        }
    } else {
        findings.push(Finding::warn(
            "prefs/default-export",
            "prefs.js missing 'export default class' - required for GNOME 45+",
        ));
    }

    // Raw content: the wrong path may sit inside a template string.
    if raw.contains(SHELL_UI_RESOURCE) {
        findings.push(Finding::fail(
            "prefs/resource-path",
            "prefs.js uses Shell UI resource path (resource:///org/gnome/shell/ui/) - Shell UI modules are not available in the preferences process",
        ));
    } else {
        findings.push(Finding::pass("prefs/resource-path", "Resource paths OK"));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Status;
    use std::fs;
    use tempfile::TempDir;

    fn run_on(prefs: Option<&str>) -> Vec<Finding> {
        let dir = TempDir::new().unwrap();
        if let Some(content) = prefs {
            fs::write(dir.path().join("prefs.js"), content).unwrap();
        }
        run(&CheckContext::new(dir.path()))
    }

    fn find<'a>(findings: &'a [Finding], check: &str) -> &'a Finding {
        findings.iter().find(|f| f.check == check).unwrap()
    }

    const MODERN: &str = "import {ExtensionPreferences} from 'resource:///org/gnome/Shell/Extensions/js/extensions/prefs.js';\nexport default class ClockPrefs extends ExtensionPreferences {\n  fillPreferencesWindow(window) {\n  }\n}\n";

    #[test]
    fn test_no_prefs_skips() {
        let findings = run_on(None);
        assert_eq!(findings[0].check, "prefs/exists");
        assert_eq!(findings[0].status, Status::Skip);
    }

    #[test]
    fn test_modern_prefs_all_pass() {
        let findings = run_on(Some(MODERN));
        assert_eq!(find(&findings, "prefs/prefs-method").status, Status::Pass);
        assert_eq!(find(&findings, "prefs/default-export").status, Status::Pass);
        assert_eq!(find(&findings, "prefs/extends-base").status, Status::Pass);
        assert_eq!(find(&findings, "prefs/resource-path").status, Status::Pass);
    }

    #[test]
    fn test_dual_pattern_fails() {
        let src = "export default class P extends ExtensionPreferences {\n  getPreferencesWidget() {}\n  fillPreferencesWindow(w) {}\n}\n";
        let findings = run_on(Some(src));
        assert_eq!(find(&findings, "prefs/dual-prefs-pattern").status, Status::Fail);
    }

    #[test]
    fn test_missing_method_warns() {
        let findings = run_on(Some("export default class P {}\n"));
        assert_eq!(find(&findings, "prefs/missing-prefs-method").status, Status::Warn);
    }

    #[test]
    fn test_missing_default_export_warns() {
        let findings = run_on(Some("class P {\n  fillPreferencesWindow(w) {}\n}\n"));
        assert_eq!(find(&findings, "prefs/default-export").status, Status::Warn);
    }

    #[test]
    fn test_not_extending_base_warns() {
        let findings = run_on(Some("export default class P {\n  fillPreferencesWindow(w) {}\n}\n"));
        assert_eq!(find(&findings, "prefs/extends-base").status, Status::Warn);
    }

    #[test]
    fn test_shell_ui_resource_path_fails() {
        let src = "import Main from 'resource:///org/gnome/shell/ui/main.js';\nexport default class P extends ExtensionPreferences {\n  fillPreferencesWindow(w) {}\n}\n";
        let findings = run_on(Some(src));
        assert_eq!(find(&findings, "prefs/resource-path").status, Status::Fail);
    }
}
