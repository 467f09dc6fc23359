//! Declarative Tier 1 pattern rules: store format, validation, and runtime.

mod engine;
mod store;

pub use engine::{run_rule, run_rules};
pub use store::{
    parse_rules, validate_store, PatternRule, RawRule, RuleValue, Severity, ValidationReport,
};
