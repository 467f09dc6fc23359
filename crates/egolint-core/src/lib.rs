//! # egolint-core
//!
//! Core analysis engine for egolint: a multi-pass static analyzer that
//! predicts whether a GNOME Shell extension bundle will survive EGO review.
//!
//! Analyzes:
//! - Lifecycle leaks (signals, timeouts, monitors, proxies, widgets,
//!   keybindings, settings not released in disable())
//! - Manifest and packaging violations (metadata.json, CSS scoping, prefs)
//! - Quality and trust heuristics (generated-code smells, undisclosed
//!   sensitive APIs)
//! - Declarative Tier 1 pattern rules with scoping, version gating,
//!   suppression, and deduplication
//! - A cross-file resource-ownership graph with orphan detection
//!
//! Every analysis emits [`Finding`] values; one finding renders as one
//! pipe-delimited line (`STATUS|CHECK|DETAIL`). Findings are the product:
//! WARN and FAIL are advisory lines, never process errors.

/// Built-in heuristic check catalog and registry.
pub mod checks;
/// Finding, status, and error types.
pub mod findings;
/// Cross-file resource ownership graph.
pub mod graph;
/// Extension manifest (`metadata.json`) reader.
pub mod manifest;
/// Declarative pattern rule store and runtime.
pub mod patterns;
/// Source walking, comment stripping, and brace scaffolding.
pub mod source;
/// Inline suppression comments.
pub mod suppress;

pub use checks::{find_check, run_all, CheckContext, CheckDef, BUILTIN_CHECKS};
pub use findings::{Finding, LintError, LintResult, Status};
pub use graph::ResourceGraph;
pub use manifest::Manifest;
pub use patterns::{
    parse_rules, run_rules, validate_store, PatternRule, Severity, ValidationReport,
};
