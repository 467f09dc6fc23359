//! Manifest (`metadata.json`) packaging checks.

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::manifest::Manifest;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._@-]+$").unwrap());

const REQUIRED_FIELDS: &[&str] = &["uuid", "name", "description", "shell-version"];

/// The GNOME release EGO currently reviews against.
const CURRENT_SHELL: &str = "48";

/// Run the metadata family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let mut findings = Vec::new();

    let manifest = match Manifest::load(&ctx.ext_dir) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            findings.push(Finding::fail("metadata/exists", "metadata.json not found"));
            return findings;
        }
        Err(e) => {
            findings.push(Finding::fail(
                "metadata/valid-json",
                format!("Invalid JSON: {e}"),
            ));
            return findings;
        }
    };

    findings.push(Finding::pass(
        "metadata/valid-json",
        "metadata.json is valid JSON",
    ));

    let raw = manifest.raw();

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .filter(|field| raw.get(**field).is_none())
        .copied()
        .collect();
    if missing.is_empty() {
        findings.push(Finding::pass(
            "metadata/required-fields",
            "All required fields present",
        ));
    } else {
        findings.push(Finding::fail(
            "metadata/required-fields",
            format!("Missing required field(s): {}", missing.join(", ")),
        ));
    }

    if let Some(uuid) = manifest.uuid() {
        if !uuid.is_empty() {
            if UUID_RE.is_match(uuid) {
                findings.push(Finding::pass(
                    "metadata/uuid-format",
                    format!("UUID format is valid: {uuid}"),
                ));
            } else {
                findings.push(Finding::fail(
                    "metadata/uuid-format",
                    format!("UUID contains invalid characters: {uuid}"),
                ));
            }

            let dir_name = ctx
                .ext_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");
            if uuid == dir_name {
                findings.push(Finding::pass(
                    "metadata/uuid-matches-dir",
                    "UUID matches directory name",
                ));
            } else {
                findings.push(Finding::fail(
                    "metadata/uuid-matches-dir",
                    format!("UUID '{uuid}' does not match directory '{dir_name}'"),
                ));
            }

            if uuid.contains("@gnome.org") {
                findings.push(Finding::fail(
                    "metadata/uuid-no-gnome-org",
                    "UUID must not use @gnome.org namespace",
                ));
            } else {
                findings.push(Finding::pass(
                    "metadata/uuid-no-gnome-org",
                    "UUID does not use @gnome.org namespace",
                ));
            }
        }
    }

    match raw.get("shell-version") {
        Some(Value::Array(_)) => {
            findings.push(Finding::pass(
                "metadata/shell-version-array",
                "shell-version is an array",
            ));
            if manifest.shell_versions().iter().any(|v| v == CURRENT_SHELL) {
                findings.push(Finding::pass(
                    "metadata/shell-version-current",
                    format!("shell-version includes current GNOME {CURRENT_SHELL}"),
                ));
            } else {
                findings.push(Finding::warn(
                    "metadata/shell-version-current",
                    format!("shell-version does not include GNOME {CURRENT_SHELL}"),
                ));
            }
        }
        Some(other) => {
            let type_name = match other {
                Value::String(_) => "str",
                Value::Number(_) => "number",
                Value::Bool(_) => "bool",
                Value::Object(_) => "object",
                _ => "value",
            };
            findings.push(Finding::fail(
                "metadata/shell-version-array",
                format!("shell-version must be an array, got {type_name}"),
            ));
        }
        None => {}
    }

    let redundant_user_mode = raw.get("session-modes")
        == Some(&Value::Array(vec![Value::String("user".to_string())]));
    if redundant_user_mode {
        findings.push(Finding::warn(
            "metadata/session-modes",
            "session-modes [\"user\"] is redundant (EGO default)",
        ));
    } else {
        findings.push(Finding::pass(
            "metadata/session-modes",
            "No redundant session-modes key",
        ));
    }

    if let Some(schema) = manifest.settings_schema() {
        if schema.starts_with("org.gnome.shell.extensions.") {
            findings.push(Finding::pass(
                "metadata/settings-schema",
                format!("settings-schema has correct prefix: {schema}"),
            ));
        } else {
            findings.push(Finding::fail(
                "metadata/settings-schema",
                format!("settings-schema should start with org.gnome.shell.extensions., got: {schema}"),
            ));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Status;
    use std::fs;
    use tempfile::TempDir;

    fn run_on(metadata: Option<&str>) -> Vec<Finding> {
        let dir = TempDir::new().unwrap();
        if let Some(content) = metadata {
            fs::write(dir.path().join("metadata.json"), content).unwrap();
        }
        run(&CheckContext::new(dir.path()))
    }

    fn find<'a>(findings: &'a [Finding], check: &str) -> &'a Finding {
        findings
            .iter()
            .find(|f| f.check == check)
            .unwrap_or_else(|| panic!("no finding for {check}"))
    }

    #[test]
    fn test_missing_manifest_fails() {
        let findings = run_on(None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check, "metadata/exists");
        assert_eq!(findings[0].status, Status::Fail);
    }

    #[test]
    fn test_invalid_json_fails() {
        let findings = run_on(Some("{broken"));
        assert_eq!(findings[0].check, "metadata/valid-json");
        assert_eq!(findings[0].status, Status::Fail);
    }

    #[test]
    fn test_complete_manifest_passes() {
        let findings = run_on(Some(
            r#"{"uuid": "clock@example.com", "name": "Clock", "description": "Shows a clock", "shell-version": ["47", "48"]}"#,
        ));
        assert_eq!(find(&findings, "metadata/valid-json").status, Status::Pass);
        assert_eq!(find(&findings, "metadata/required-fields").status, Status::Pass);
        assert_eq!(find(&findings, "metadata/uuid-format").status, Status::Pass);
        assert_eq!(find(&findings, "metadata/shell-version-array").status, Status::Pass);
        assert_eq!(find(&findings, "metadata/shell-version-current").status, Status::Pass);
        // tempdir name never equals the uuid
        assert_eq!(find(&findings, "metadata/uuid-matches-dir").status, Status::Fail);
    }

    #[test]
    fn test_missing_required_fields() {
        let findings = run_on(Some(r#"{"uuid": "x@y"}"#));
        let f = find(&findings, "metadata/required-fields");
        assert_eq!(f.status, Status::Fail);
        assert!(f.detail.contains("name"));
        assert!(f.detail.contains("shell-version"));
    }

    #[test]
    fn test_uuid_invalid_characters() {
        let findings = run_on(Some(r#"{"uuid": "bad uuid!", "shell-version": ["48"]}"#));
        assert_eq!(find(&findings, "metadata/uuid-format").status, Status::Fail);
    }

    #[test]
    fn test_uuid_gnome_org_namespace_fails() {
        let findings = run_on(Some(r#"{"uuid": "clock@gnome.org"}"#));
        assert_eq!(find(&findings, "metadata/uuid-no-gnome-org").status, Status::Fail);
    }

    #[test]
    fn test_shell_version_not_array_fails() {
        let findings = run_on(Some(r#"{"uuid": "x@y", "shell-version": "48"}"#));
        let f = find(&findings, "metadata/shell-version-array");
        assert_eq!(f.status, Status::Fail);
        assert!(f.detail.contains("got str"));
    }

    #[test]
    fn test_old_shell_version_warns() {
        let findings = run_on(Some(r#"{"uuid": "x@y", "shell-version": ["44"]}"#));
        assert_eq!(find(&findings, "metadata/shell-version-current").status, Status::Warn);
    }

    #[test]
    fn test_redundant_session_modes_warns() {
        let findings = run_on(Some(r#"{"uuid": "x@y", "session-modes": ["user"]}"#));
        assert_eq!(find(&findings, "metadata/session-modes").status, Status::Warn);
    }

    #[test]
    fn test_session_modes_with_unlock_dialog_ok() {
        let findings = run_on(Some(
            r#"{"uuid": "x@y", "session-modes": ["user", "unlock-dialog"]}"#,
        ));
        assert_eq!(find(&findings, "metadata/session-modes").status, Status::Pass);
    }

    #[test]
    fn test_settings_schema_prefix() {
        let good = run_on(Some(
            r#"{"uuid": "x@y", "settings-schema": "org.gnome.shell.extensions.clock"}"#,
        ));
        assert_eq!(find(&good, "metadata/settings-schema").status, Status::Pass);

        let bad = run_on(Some(r#"{"uuid": "x@y", "settings-schema": "com.example.clock"}"#));
        assert_eq!(find(&bad, "metadata/settings-schema").status, Status::Fail);
    }
}
