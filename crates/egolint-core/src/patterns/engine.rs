//! Pattern rule execution.
//!
//! Each rule walks its scope globs, matches per line, honors inline
//! suppression, and produces findings in a fixed shape: per-hit lines by
//! default, one aggregated line in deduplicate mode, exactly one PASS when
//! nothing matched, and SKIP when the rule cannot be applied (version gate,
//! bad regex). A rule is never silent.

use crate::findings::{Finding, Status};
use crate::manifest::declared_shell_majors;
use crate::patterns::store::{parse_rules, PatternRule, Severity};
use crate::source::{read_source, rel_path, SKIP_DIRS};
use crate::suppress::is_suppressed;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Expand a rule's scope globs into candidate files, sorted and deduplicated.
///
/// Each scope is expanded both recursively under the root and directly at
/// the root. Entries inside skip directories are dropped; unparseable globs
/// contribute nothing.
fn candidate_files(ext_dir: &Path, scopes: &[String]) -> Vec<PathBuf> {
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    for scope in scopes {
        let patterns = [
            format!("{}/**/{}", ext_dir.display(), scope),
            format!("{}/{}", ext_dir.display(), scope),
        ];
        for pattern in &patterns {
            let Ok(paths) = glob::glob(pattern) else {
                continue;
            };
            for path in paths.flatten() {
                if !path.is_file() {
                    continue;
                }
                let rel = rel_path(&path, ext_dir);
                if rel.split('/').any(|part| SKIP_DIRS.contains(&part)) {
                    continue;
                }
                seen.insert(path);
            }
        }
    }
    seen.into_iter().collect()
}

/// Execute a single rule against an extension directory.
pub fn run_rule(rule: &PatternRule, ext_dir: &Path, shell_majors: &[u32]) -> Vec<Finding> {
    if !rule.applies_to(shell_majors) {
        return vec![Finding::skip(
            &rule.id,
            "Not applicable for declared shell-version(s)",
        )];
    }

    let Ok(compiled) = Regex::new(&rule.pattern) else {
        return vec![Finding::skip(
            &rule.id,
            format!("Invalid regex: {}", rule.pattern),
        )];
    };

    let status = match rule.severity {
        Severity::Blocking => Status::Fail,
        Severity::Advisory => Status::Warn,
    };

    let mut findings = Vec::new();
    let mut dedup_files: BTreeSet<String> = BTreeSet::new();
    let mut found = false;

    for path in candidate_files(ext_dir, &rule.scope) {
        let Ok(content) = read_source(&path) else {
            continue;
        };

        // Replacement gate: the file already contains the modern form, so
        // the deprecated one is assumed backward-compatible coexistence.
        if let Some(replacement) = &rule.replacement {
            if !replacement.is_empty() && content.contains(replacement.as_str()) {
                continue;
            }
        }

        let rel = rel_path(&path, ext_dir);
        let mut prev_line: Option<&str> = None;
        for (idx, line) in content.lines().enumerate() {
            if compiled.is_match(line) && !is_suppressed(line, prev_line, &rule.id) {
                found = true;
                if rule.deduplicate {
                    dedup_files.insert(rel.clone());
                } else {
                    let mut finding = Finding::new(
                        status,
                        &rule.id,
                        format!("{}:{}: {}", rel, idx + 1, rule.message),
                    );
                    if let Some(fix) = &rule.fix {
                        finding = finding.with_fix(fix.clone());
                    }
                    findings.push(finding);
                }
            }
            prev_line = Some(line);
        }
    }

    if rule.deduplicate && !dedup_files.is_empty() {
        let files_list = dedup_files.iter().cloned().collect::<Vec<_>>().join(", ");
        let mut finding = Finding::new(
            status,
            &rule.id,
            format!(
                "{} in {} file(s): {}",
                rule.message,
                dedup_files.len(),
                files_list
            ),
        );
        if let Some(fix) = &rule.fix {
            finding = finding.with_fix(fix.clone());
        }
        findings.push(finding);
    } else if !found {
        findings.push(Finding::pass(&rule.id, "No matches"));
    }

    findings
}

/// Execute every rule in a store text against an extension directory.
///
/// Findings are grouped per rule in declaration order, so output is stable
/// across runs.
pub fn run_rules(rules_text: &str, ext_dir: &Path) -> Vec<Finding> {
    let shell_majors = declared_shell_majors(ext_dir);
    parse_rules(rules_text)
        .iter()
        .map(PatternRule::from_raw)
        .flat_map(|rule| run_rule(&rule, ext_dir, &shell_majors))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ext_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn single_rule(text: &str) -> PatternRule {
        PatternRule::from_raw(&parse_rules(text)[0])
    }

    const EVAL_RULE: &str =
        "- id: R-SEC-01\n  pattern: \"\\\\beval\\\\s*\\\\(\"\n  scope: \"*.js\"\n  severity: blocking\n  message: eval is forbidden\n";

    #[test]
    fn test_per_hit_findings() {
        let dir = ext_dir(&[("extension.js", "eval(a);\nok();\neval(b);\n")]);
        let findings = run_rule(&single_rule(EVAL_RULE), dir.path(), &[]);
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[0].render(),
            "FAIL|R-SEC-01|extension.js:1: eval is forbidden"
        );
        assert_eq!(
            findings[1].render(),
            "FAIL|R-SEC-01|extension.js:3: eval is forbidden"
        );
    }

    #[test]
    fn test_pass_when_no_hits() {
        let dir = ext_dir(&[("extension.js", "safe();\n")]);
        let findings = run_rule(&single_rule(EVAL_RULE), dir.path(), &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].render(), "PASS|R-SEC-01|No matches");
    }

    #[test]
    fn test_recursive_scope_and_skip_dirs() {
        let dir = ext_dir(&[
            ("lib/deep/util.js", "eval(x);\n"),
            ("node_modules/dep/index.js", "eval(y);\n"),
        ]);
        let findings = run_rule(&single_rule(EVAL_RULE), dir.path(), &[]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].detail.starts_with("lib/deep/util.js:1"));
    }

    #[test]
    fn test_suppression_same_line_and_previous_line() {
        let dir = ext_dir(&[(
            "extension.js",
            "eval(a); // ego-lint-ignore: R-SEC-01\n// ego-lint-ignore-next-line\neval(b);\neval(c);\n",
        )]);
        let findings = run_rule(&single_rule(EVAL_RULE), dir.path(), &[]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].detail.starts_with("extension.js:4"));
    }

    #[test]
    fn test_dedup_collapses_to_one_line() {
        let rule = single_rule(
            "- id: R-X\n  pattern: todo\n  scope: \"*.js\"\n  severity: advisory\n  message: leftover marker\n  deduplicate: true\n",
        );
        let dir = ext_dir(&[
            ("a.js", "todo\nmore todo\n"),
            ("b.js", "todo\n"),
            ("c.js", "clean\n"),
        ]);
        let findings = run_rule(&rule, dir.path(), &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].render(),
            "WARN|R-X|leftover marker in 2 file(s): a.js, b.js"
        );
    }

    #[test]
    fn test_replacement_pattern_exempts_file() {
        let rule = single_rule(
            "- id: R-API-03\n  pattern: ByteArray\n  scope: \"*.js\"\n  severity: advisory\n  message: deprecated\n  replacement-pattern: TextDecoder\n",
        );
        let dir = ext_dir(&[
            ("old.js", "ByteArray.toString(b);\n"),
            ("migrated.js", "ByteArray.toString(b);\nnew TextDecoder();\n"),
        ]);
        let findings = run_rule(&rule, dir.path(), &[]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].detail.starts_with("old.js:1"));
    }

    #[test]
    fn test_version_gate_skip_detail() {
        let rule = single_rule(
            "- id: R-G\n  pattern: x\n  scope: \"*.js\"\n  severity: advisory\n  message: m\n  min-version: 48\n",
        );
        let findings = run_rule(&rule, Path::new("/nonexistent"), &[46]);
        assert_eq!(
            findings[0].render(),
            "SKIP|R-G|Not applicable for declared shell-version(s)"
        );
    }

    #[test]
    fn test_invalid_regex_skips() {
        let rule = single_rule(
            "- id: R-B\n  pattern: \"[broken\"\n  scope: \"*.js\"\n  severity: advisory\n  message: m\n",
        );
        let dir = ext_dir(&[]);
        let findings = run_rule(&rule, dir.path(), &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Skip);
        assert!(findings[0].detail.contains("Invalid regex"));
    }

    #[test]
    fn test_fix_appended() {
        let rule = single_rule(
            "- id: R-F\n  pattern: eval\n  scope: \"*.js\"\n  severity: blocking\n  message: m\n  fix: remove it\n",
        );
        let dir = ext_dir(&[("a.js", "eval(x)\n")]);
        let findings = run_rule(&rule, dir.path(), &[]);
        assert!(findings[0].render().ends_with("|fix: remove it"));
    }

    #[test]
    fn test_run_rules_version_gate_reads_manifest() {
        let dir = ext_dir(&[
            ("metadata.json", r#"{"uuid": "x@y", "shell-version": ["46"]}"#),
            ("extension.js", "legacy();\n"),
        ]);
        let text =
            "- id: R-G\n  pattern: legacy\n  scope: \"*.js\"\n  severity: blocking\n  message: m\n  min-version: 48\n";
        let findings = run_rules(text, dir.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Skip);
    }

    #[test]
    fn test_run_rules_deterministic() {
        let dir = ext_dir(&[
            ("b.js", "eval(x);\n"),
            ("a.js", "eval(y);\n"),
            ("metadata.json", r#"{"shell-version": ["46"]}"#),
        ]);
        let first = run_rules(EVAL_RULE, dir.path());
        let second = run_rules(EVAL_RULE, dir.path());
        let render = |fs: &[Finding]| fs.iter().map(Finding::render).collect::<Vec<_>>();
        assert_eq!(render(&first), render(&second));
        // Sorted candidate expansion: a.js before b.js
        assert!(first[0].detail.starts_with("a.js"));
    }

    #[test]
    fn test_bundled_rules_run_against_empty_dir() {
        let dir = ext_dir(&[]);
        let findings = run_rules(egolint_rules::DEFAULT_PATTERNS, dir.path());
        // Every rule reports: PASS or SKIP, never WARN/FAIL on an empty bundle.
        assert!(findings
            .iter()
            .all(|f| matches!(f.status, Status::Pass | Status::Skip)));
    }
}
