//! Rule store parsing and static validation.
//!
//! The store is a deliberately constrained mapping-sequence text format: each
//! rule opens with `- `, keys are colon-separated scalars, values are plain
//! scalars, quoted strings, or bracketed inline lists. Blank lines and `#`
//! comments are ignored. The parser is line-oriented and single-pass; it
//! never loads a general serialization library.

use regex::Regex;
use std::collections::HashMap;

/// Fields every rule must carry.
pub const REQUIRED_FIELDS: &[&str] = &["id", "pattern", "scope", "severity", "message"];

/// Fields the runtime understands. Anything else is kept but only surfaces
/// as a validator warning.
pub const KNOWN_FIELDS: &[&str] = &[
    "id",
    "pattern",
    "scope",
    "severity",
    "message",
    "min-version",
    "max-version",
    "replacement-pattern",
    "fix",
    "deduplicate",
];

/// A parsed option value: scalar or inline list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Scalar(String),
    List(Vec<String>),
}

/// One rule entry as it appears in the store, keys in source order.
///
/// Later occurrences of a key shadow earlier ones, matching the mapping
/// semantics of the format.
#[derive(Debug, Clone, Default)]
pub struct RawRule {
    entries: Vec<(String, RuleValue)>,
}

impl RawRule {
    fn insert(&mut self, key: String, value: RuleValue) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&RuleValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Scalar value for `key`; `None` when absent or a list.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(RuleValue::Scalar(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Keys in first-occurrence order.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for (k, _) in &self.entries {
            if !seen.contains(&k.as_str()) {
                seen.push(k.as_str());
            }
        }
        seen
    }
}

/// Rule severity; `Blocking` maps to FAIL, `Advisory` to WARN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Blocking,
    Advisory,
}

/// A rule record ready for execution.
///
/// Version gates are kept as raw strings: a present-but-unparseable gate
/// must fail closed at gate time, not be silently dropped at parse time.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub id: String,
    pub pattern: String,
    pub scope: Vec<String>,
    pub severity: Severity,
    pub message: String,
    pub min_version: Option<String>,
    pub max_version: Option<String>,
    pub replacement: Option<String>,
    pub fix: Option<String>,
    pub deduplicate: bool,
}

impl PatternRule {
    /// Build an executable rule from a raw entry, applying runtime defaults
    /// (missing fields are a validator concern, not a runtime crash).
    pub fn from_raw(raw: &RawRule) -> PatternRule {
        let id = raw.scalar("id").unwrap_or("?").to_string();
        let scope = match raw.get("scope") {
            Some(RuleValue::Scalar(s)) => vec![s.clone()],
            Some(RuleValue::List(items)) => items.clone(),
            None => vec!["*.js".to_string()],
        };
        let severity = match raw.scalar("severity") {
            Some("blocking") => Severity::Blocking,
            _ => Severity::Advisory,
        };
        let message = raw
            .scalar("message")
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        PatternRule {
            pattern: raw.scalar("pattern").unwrap_or("").to_string(),
            scope,
            severity,
            message,
            min_version: raw.scalar("min-version").map(str::to_string),
            max_version: raw.scalar("max-version").map(str::to_string),
            replacement: raw.scalar("replacement-pattern").map(str::to_string),
            fix: raw.scalar("fix").map(str::to_string),
            deduplicate: raw.scalar("deduplicate") == Some("true"),
            id,
        }
    }

    /// Whether this rule applies to the declared shell versions.
    ///
    /// A `min-version` gate needs at least one declared version `>=` it; a
    /// `max-version` gate at least one `<=` it. When the rule is gated and
    /// no versions are known (or a gate does not parse), the rule does not
    /// apply - fail closed rather than flag unconfirmed code.
    pub fn applies_to(&self, shell_majors: &[u32]) -> bool {
        if self.min_version.is_none() && self.max_version.is_none() {
            return true;
        }
        if shell_majors.is_empty() {
            return false;
        }
        if let Some(min) = &self.min_version {
            let Ok(min) = min.parse::<u32>() else {
                return false;
            };
            if !shell_majors.iter().any(|&v| v >= min) {
                return false;
            }
        }
        if let Some(max) = &self.max_version {
            let Ok(max) = max.parse::<u32>() else {
                return false;
            };
            if !shell_majors.iter().any(|&v| v <= max) {
                return false;
            }
        }
        true
    }
}

/// Parse the rule store text into raw rule entries.
pub fn parse_rules(text: &str) -> Vec<RawRule> {
    let mut rules = Vec::new();
    let mut current: Option<RawRule> = None;

    for raw_line in text.lines() {
        let stripped = raw_line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if let Some(rest) = stripped.strip_prefix("- ") {
            if let Some(done) = current.take() {
                rules.push(done);
            }
            let mut rule = RawRule::default();
            let rest = rest.trim();
            if !rest.is_empty() {
                if let Some((key, value)) = rest.split_once(':') {
                    rule.insert(key.trim().to_string(), parse_value(value.trim()));
                }
            }
            current = Some(rule);
        } else if let Some(rule) = current.as_mut() {
            if let Some((key, value)) = stripped.split_once(':') {
                rule.insert(key.trim().to_string(), parse_value(value.trim()));
            }
        }
    }

    if let Some(done) = current {
        rules.push(done);
    }
    rules
}

/// Parse a scalar or inline-list value.
fn parse_value(v: &str) -> RuleValue {
    if v.starts_with('[') && v.ends_with(']') {
        let inner = &v[1..v.len() - 1];
        if inner.trim().is_empty() {
            return RuleValue::List(Vec::new());
        }
        let items = inner
            .split(',')
            .map(|item| {
                item.trim()
                    .trim_matches('"')
                    .trim_matches('\'')
                    .to_string()
            })
            .collect();
        return RuleValue::List(items);
    }
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        return RuleValue::Scalar(unescape_double(&v[1..v.len() - 1]));
    }
    if v.len() >= 2 && v.starts_with('\'') && v.ends_with('\'') {
        // Single quotes: no escape processing
        return RuleValue::Scalar(v[1..v.len() - 1].to_string());
    }
    RuleValue::Scalar(v.to_string())
}

/// Process double-quote escape sequences (subset: `\\ \" \n \t \r`).
/// Unknown escapes are preserved verbatim.
fn unescape_double(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Outcome of statically linting a rule store.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rule_count: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Statically lint a rule store: required fields, enumerated severity,
/// regex compilability, ID uniqueness. Unknown keys warn but do not reject.
pub fn validate_store(rules: &[RawRule]) -> ValidationReport {
    let mut report = ValidationReport {
        rule_count: rules.len(),
        ..Default::default()
    };
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for (i, rule) in rules.iter().enumerate() {
        let rid = rule
            .scalar("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("(rule #{})", i + 1));

        for field in REQUIRED_FIELDS {
            if !rule.has(field) {
                report
                    .errors
                    .push(format!("{rid}: missing required field '{field}'"));
            }
        }

        if let Some(id) = rule.scalar("id") {
            if let Some(first) = seen_ids.get(id) {
                report.errors.push(format!(
                    "{rid}: duplicate ID (first seen at rule #{})",
                    first + 1
                ));
            }
            seen_ids.insert(id.to_string(), i);
        }

        if let Some(severity) = rule.scalar("severity") {
            if severity != "blocking" && severity != "advisory" {
                report.errors.push(format!(
                    "{rid}: invalid severity '{severity}' (must be 'blocking' or 'advisory')"
                ));
            }
        }

        if let Some(pattern) = rule.scalar("pattern") {
            if !pattern.is_empty() {
                if let Err(e) = Regex::new(pattern) {
                    report.errors.push(format!("{rid}: invalid regex: {e}"));
                }
            }
        }

        for key in rule.keys() {
            if !KNOWN_FIELDS.contains(&key) {
                report
                    .warnings
                    .push(format!("{rid}: unknown field '{key}' (ignored)"));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Parsing =====

    #[test]
    fn test_parse_single_rule() {
        let text = "- id: R-X\n  pattern: \"eval\"\n  scope: \"*.js\"\n  severity: blocking\n  message: no eval\n";
        let rules = parse_rules(text);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].scalar("id"), Some("R-X"));
        assert_eq!(rules[0].scalar("pattern"), Some("eval"));
        assert_eq!(rules[0].scalar("message"), Some("no eval"));
    }

    #[test]
    fn test_parse_multiple_rules_and_comments() {
        let text = "# comment\n\n- id: A\n  pattern: a\n# interleaved\n- id: B\n  pattern: b\n";
        let rules = parse_rules(text);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].scalar("id"), Some("B"));
    }

    #[test]
    fn test_parse_key_on_dash_line() {
        let rules = parse_rules("- id: R-1\n  severity: advisory\n");
        assert_eq!(rules[0].scalar("id"), Some("R-1"));
    }

    #[test]
    fn test_parse_inline_list() {
        let rules = parse_rules("- id: R\n  scope: [\"*.js\", '*.css', metadata.json]\n");
        assert_eq!(
            rules[0].get("scope"),
            Some(&RuleValue::List(vec![
                "*.js".into(),
                "*.css".into(),
                "metadata.json".into()
            ]))
        );
    }

    #[test]
    fn test_parse_empty_list() {
        let rules = parse_rules("- id: R\n  scope: []\n");
        assert_eq!(rules[0].get("scope"), Some(&RuleValue::List(vec![])));
    }

    #[test]
    fn test_parse_crlf() {
        let rules = parse_rules("- id: R-1\r\n  pattern: x\r\n");
        assert_eq!(rules[0].scalar("pattern"), Some("x"));
    }

    #[test]
    fn test_double_quote_escapes() {
        let rules = parse_rules(r#"- pattern: "a\\b\"c\n\t\r""#);
        assert_eq!(rules[0].scalar("pattern"), Some("a\\b\"c\n\t\r"));
    }

    #[test]
    fn test_unknown_escape_preserved() {
        let rules = parse_rules(r#"- pattern: "\beval\b""#);
        assert_eq!(rules[0].scalar("pattern"), Some(r"\beval\b"));
    }

    #[test]
    fn test_single_quotes_no_escapes() {
        let rules = parse_rules(r"- pattern: '\n'");
        assert_eq!(rules[0].scalar("pattern"), Some(r"\n"));
    }

    #[test]
    fn test_value_with_colon() {
        let rules = parse_rules("- message: prefix: detail\n");
        assert_eq!(rules[0].scalar("message"), Some("prefix: detail"));
    }

    #[test]
    fn test_later_key_shadows_earlier() {
        let rules = parse_rules("- id: A\n  id: B\n");
        assert_eq!(rules[0].scalar("id"), Some("B"));
    }

    // ===== PatternRule conversion =====

    fn rule_from(text: &str) -> PatternRule {
        PatternRule::from_raw(&parse_rules(text)[0])
    }

    #[test]
    fn test_from_raw_defaults() {
        let rule = rule_from("- id: R-1\n  pattern: x\n");
        assert_eq!(rule.scope, vec!["*.js"]);
        assert_eq!(rule.severity, Severity::Advisory);
        assert_eq!(rule.message, "R-1");
        assert!(!rule.deduplicate);
    }

    #[test]
    fn test_from_raw_blocking_and_dedup() {
        let rule = rule_from("- id: R\n  pattern: x\n  severity: blocking\n  deduplicate: true\n");
        assert_eq!(rule.severity, Severity::Blocking);
        assert!(rule.deduplicate);
    }

    // ===== Version gating =====

    #[test]
    fn test_applies_without_gate() {
        let rule = rule_from("- id: R\n  pattern: x\n");
        assert!(rule.applies_to(&[]));
        assert!(rule.applies_to(&[46]));
    }

    #[test]
    fn test_gated_rule_fails_closed_without_versions() {
        let rule = rule_from("- id: R\n  pattern: x\n  min-version: 45\n");
        assert!(!rule.applies_to(&[]));
    }

    #[test]
    fn test_min_version_gate() {
        let rule = rule_from("- id: R\n  pattern: x\n  min-version: 48\n");
        assert!(!rule.applies_to(&[46]));
        assert!(rule.applies_to(&[46, 48]));
    }

    #[test]
    fn test_max_version_gate() {
        let rule = rule_from("- id: R\n  pattern: x\n  max-version: 44\n");
        assert!(!rule.applies_to(&[45, 46]));
        assert!(rule.applies_to(&[44, 45]));
    }

    #[test]
    fn test_unparseable_gate_fails_closed() {
        let rule = rule_from("- id: R\n  pattern: x\n  min-version: next\n");
        assert!(!rule.applies_to(&[46]));
    }

    // ===== Validation =====

    #[test]
    fn test_validate_ok_store() {
        let rules = parse_rules(
            "- id: A\n  pattern: a\n  scope: \"*.js\"\n  severity: blocking\n  message: m\n",
        );
        let report = validate_store(&rules);
        assert!(report.is_ok(), "errors: {:?}", report.errors);
        assert_eq!(report.rule_count, 1);
    }

    #[test]
    fn test_validate_missing_fields() {
        let report = validate_store(&parse_rules("- id: A\n"));
        assert_eq!(report.errors.len(), 4); // pattern, scope, severity, message
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let text = "- id: A\n  pattern: a\n  scope: s\n  severity: advisory\n  message: m\n\
                    - id: A\n  pattern: b\n  scope: s\n  severity: advisory\n  message: m\n";
        let report = validate_store(&parse_rules(text));
        assert!(report.errors.iter().any(|e| e.contains("duplicate ID")));
    }

    #[test]
    fn test_validate_bad_severity() {
        let text = "- id: A\n  pattern: a\n  scope: s\n  severity: fatal\n  message: m\n";
        let report = validate_store(&parse_rules(text));
        assert!(report.errors.iter().any(|e| e.contains("invalid severity")));
    }

    #[test]
    fn test_validate_bad_regex() {
        let text = "- id: A\n  pattern: \"[unclosed\"\n  scope: s\n  severity: advisory\n  message: m\n";
        let report = validate_store(&parse_rules(text));
        assert!(report.errors.iter().any(|e| e.contains("invalid regex")));
    }

    #[test]
    fn test_validate_unknown_key_warns_not_errors() {
        let text = "- id: A\n  pattern: a\n  scope: s\n  severity: advisory\n  message: m\n  frobnicate: yes\n";
        let report = validate_store(&parse_rules(text));
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("frobnicate")));
    }

    #[test]
    fn test_bundled_patterns_validate_clean() {
        let rules = parse_rules(egolint_rules::DEFAULT_PATTERNS);
        let report = validate_store(&rules);
        assert!(report.is_ok(), "bundled rules invalid: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
        assert!(report.rule_count >= 10);
    }
}
