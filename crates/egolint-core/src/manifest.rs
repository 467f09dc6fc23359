//! Extension manifest (`metadata.json`) reader.
//!
//! The engine consumes only a handful of fields: the uuid, the declared
//! shell versions, the session modes, and the description. Everything else
//! is kept opaque in the raw document; the metadata check inspects shapes
//! (e.g. "shell-version must be an array") directly on the raw value.

use crate::findings::{LintError, LintResult};
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

static LEADING_INT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(\d+)").unwrap());

/// Parsed `metadata.json`.
#[derive(Debug, Clone)]
pub struct Manifest {
    raw: Value,
}

impl Manifest {
    /// Load `<root>/metadata.json`.
    ///
    /// Returns `Ok(None)` when the file does not exist; a present but
    /// malformed manifest is an error (the metadata check reports it, the
    /// version gate treats it as "no declared versions").
    pub fn load(ext_dir: &Path) -> LintResult<Option<Manifest>> {
        let path = ext_dir.join("metadata.json");
        if !path.is_file() {
            return Ok(None);
        }
        let content = crate::source::read_source(&path)?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| LintError::ManifestParse {
            message: e.to_string(),
        })?;
        Ok(Some(Manifest { raw }))
    }

    /// Load leniently: any missing or malformed manifest becomes `None`.
    pub fn load_lenient(ext_dir: &Path) -> Option<Manifest> {
        Manifest::load(ext_dir).ok().flatten()
    }

    pub fn from_value(raw: Value) -> Manifest {
        Manifest { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.str_field("uuid")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    pub fn settings_schema(&self) -> Option<&str> {
        self.str_field("settings-schema")
    }

    /// Declared `shell-version` entries as strings; empty unless the field
    /// is an array.
    pub fn shell_versions(&self) -> Vec<String> {
        match self.raw.get("shell-version") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Leading major numbers of the declared shell versions ("46.1" -> 46).
    pub fn shell_version_majors(&self) -> Vec<u32> {
        self.shell_versions()
            .iter()
            .filter_map(|v| {
                LEADING_INT_RE
                    .captures(v)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            })
            .collect()
    }

    /// Declared `session-modes` entries; empty unless the field is an array.
    pub fn session_modes(&self) -> Vec<&str> {
        match self.raw.get("session-modes") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_session_mode(&self, mode: &str) -> bool {
        self.session_modes().contains(&mode)
    }
}

/// Declared shell-version majors for a bundle, or empty when the manifest
/// is absent or malformed (version-gated rules fail closed on empty).
pub fn declared_shell_majors(ext_dir: &Path) -> Vec<u32> {
    Manifest::load_lenient(ext_dir)
        .map(|m| m.shell_version_majors())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn manifest(value: Value) -> Manifest {
        Manifest::from_value(value)
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(Manifest::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("metadata.json"), "{not json").unwrap();
        assert!(Manifest::load(dir.path()).is_err());
        assert!(Manifest::load_lenient(dir.path()).is_none());
    }

    #[test]
    fn test_load_valid() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metadata.json"),
            r#"{"uuid": "clock@example.com", "shell-version": ["46", "47"]}"#,
        )
        .unwrap();
        let m = Manifest::load(dir.path()).unwrap().unwrap();
        assert_eq!(m.uuid(), Some("clock@example.com"));
        assert_eq!(m.shell_versions(), vec!["46", "47"]);
    }

    #[test]
    fn test_shell_version_majors_parse_leading_int() {
        let m = manifest(json!({"shell-version": ["45", "46.2", "nightly"]}));
        assert_eq!(m.shell_version_majors(), vec![45, 46]);
    }

    #[test]
    fn test_shell_version_non_array_is_empty() {
        let m = manifest(json!({"shell-version": "46"}));
        assert!(m.shell_versions().is_empty());
        assert!(m.shell_version_majors().is_empty());
    }

    #[test]
    fn test_session_modes() {
        let m = manifest(json!({"session-modes": ["user", "unlock-dialog"]}));
        assert!(m.has_session_mode("unlock-dialog"));
        assert!(!m.has_session_mode("gdm"));

        let none = manifest(json!({}));
        assert!(none.session_modes().is_empty());
    }

    #[test]
    fn test_declared_shell_majors_fail_closed() {
        let dir = TempDir::new().unwrap();
        assert!(declared_shell_majors(dir.path()).is_empty());

        fs::write(dir.path().join("metadata.json"), "broken").unwrap();
        assert!(declared_shell_majors(dir.path()).is_empty());
    }
}
