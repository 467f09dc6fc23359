//! Stylesheet scoping checks.

use crate::checks::CheckContext;
use crate::findings::Finding;
use regex::Regex;
use std::sync::LazyLock;

/// GNOME Shell theme classes an extension may legitimately target.
const KNOWN_SHELL_CLASSES: &[&str] = &[
    "panel",
    "panel-button",
    "system-status-icon",
    "popup-menu",
    "popup-menu-item",
    "popup-separator-menu-item",
    "popup-sub-menu",
    "popup-menu-section",
    "quick-toggle",
    "quick-settings",
    "quick-settings-item",
    "message",
    "message-list",
    "notification",
    "overview",
    "workspace",
    "search-entry",
    "app-well-icon",
    "dash",
    "show-apps",
];

static CSS_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static CLASS_SELECTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\.([\w-]+)").unwrap());

fn stylesheet(ctx: &CheckContext) -> Option<String> {
    let path = ctx.ext_dir.join("stylesheet.css");
    if !path.is_file() {
        return None;
    }
    ctx.read(&path)
        .map(|content| CSS_COMMENT_RE.replace_all(&content, "").into_owned())
}

/// Bare generic class selectors without a namespace prefix.
fn check_unscoped_classes(ctx: &CheckContext) -> Vec<Finding> {
    let Some(content) = stylesheet(ctx) else {
        return vec![Finding::skip("css/scoping", "No stylesheet.css found")];
    };

    let mut classes: Vec<String> = CLASS_SELECTOR_RE
        .captures_iter(&content)
        .map(|caps| caps[1].to_string())
        .collect();
    classes.sort();
    classes.dedup();

    // "Scoped" means a hyphen or underscore acting as a namespace prefix.
    let unscoped: Vec<String> = classes
        .into_iter()
        .filter(|cls| !cls.contains('-') && !cls.contains('_'))
        .filter(|cls| !KNOWN_SHELL_CLASSES.contains(&cls.to_lowercase().as_str()))
        .collect();

    if unscoped.is_empty() {
        vec![Finding::pass(
            "css/scoping",
            "CSS classes appear properly scoped",
        )]
    } else {
        let names = unscoped
            .iter()
            .take(5)
            .map(|c| format!(".{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        vec![Finding::warn(
            "css/unscoped-class",
            format!(
                "Found {} potentially unscoped CSS class(es): {names} - add a namespace prefix to avoid conflicts",
                unscoped.len()
            ),
        )]
    }
}

/// `!important` overrides the Shell theme.
fn check_important_usage(ctx: &CheckContext) -> Vec<Finding> {
    let Some(content) = stylesheet(ctx) else {
        return Vec::new();
    };

    let count = content.matches("!important").count();
    if count > 0 {
        vec![Finding::warn(
            "css/important",
            format!(
                "Found {count} !important usage(s) in stylesheet.css - !important overrides Shell theme; prefer higher specificity"
            ),
        )]
    } else {
        vec![Finding::pass("css/important", "No !important usage")]
    }
}

/// Run the css family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(check_unscoped_classes(ctx));
    findings.extend(check_important_usage(ctx));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Status;
    use std::fs;
    use tempfile::TempDir;

    fn run_on(css: Option<&str>) -> Vec<Finding> {
        let dir = TempDir::new().unwrap();
        if let Some(content) = css {
            fs::write(dir.path().join("stylesheet.css"), content).unwrap();
        }
        run(&CheckContext::new(dir.path()))
    }

    #[test]
    fn test_no_stylesheet_skips() {
        let findings = run_on(None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Skip);
    }

    #[test]
    fn test_scoped_classes_pass() {
        let findings = run_on(Some(".myext-button { color: red; }\n.myext-label {}\n"));
        assert_eq!(findings[0].check, "css/scoping");
        assert_eq!(findings[0].status, Status::Pass);
    }

    #[test]
    fn test_unscoped_class_warns() {
        let findings = run_on(Some(".button { color: red; }\n"));
        assert_eq!(findings[0].check, "css/unscoped-class");
        assert_eq!(findings[0].status, Status::Warn);
        assert!(findings[0].detail.contains(".button"));
    }

    #[test]
    fn test_known_shell_class_allowed() {
        let findings = run_on(Some(".panel { background: black; }\n"));
        assert_eq!(findings[0].status, Status::Pass);
    }

    #[test]
    fn test_commented_selector_ignored() {
        let findings = run_on(Some("/* .button {} */\n.myext-ok {}\n"));
        assert_eq!(findings[0].status, Status::Pass);
    }

    #[test]
    fn test_important_warns() {
        let findings = run_on(Some(".myext-x { color: red !important; }\n"));
        let important = findings.iter().find(|f| f.check == "css/important").unwrap();
        assert_eq!(important.status, Status::Warn);
        assert!(important.detail.contains("1 !important"));
    }
}
