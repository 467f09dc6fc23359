//! egolint - EGO review prediction for GNOME Shell extension bundles.
//!
//! Findings go to stdout, one pipe-delimited line each. The exit code is 0
//! even when WARN/FAIL findings are emitted - those are advisory lines for
//! the driver to aggregate. Nonzero exits are reserved for malformed
//! arguments and rule-store validation errors.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use egolint_core::checks::{run_all, CheckContext};
use egolint_core::patterns::{parse_rules, run_rules, validate_store};
use egolint_core::{find_check, Finding, ResourceGraph};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "egolint",
    version,
    about = "Predict EGO review outcomes for GNOME Shell extensions",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run Tier 1 pattern rules from a rule file against an extension
    Patterns {
        /// Validate the rule file instead of executing it
        #[arg(long)]
        validate: bool,
        /// Rule file in the constrained mapping-sequence format
        rules_file: PathBuf,
        /// Extension directory (omitted with --validate)
        ext_dir: Option<PathBuf>,
    },
    /// Print the cross-file resource ownership graph as JSON
    ResourceGraph {
        /// Extension directory
        ext_dir: PathBuf,
    },
    /// Run a single analyzer family (see --list)
    Check {
        /// List available analyzer families and exit
        #[arg(long, exclusive = true)]
        list: bool,
        /// Analyzer family name (e.g. lifecycle, quality, resources)
        #[arg(required_unless_present = "list")]
        name: Option<String>,
        /// Extension directory
        #[arg(required_unless_present = "list")]
        ext_dir: Option<PathBuf>,
    },
    /// Run every analyzer family plus the bundled pattern rules
    All {
        /// Extension directory
        ext_dir: PathBuf,
    },
}

fn emit(findings: &[Finding]) {
    for finding in findings {
        println!("{}", finding.render());
    }
}

/// Argument failures still speak the finding grammar so drivers can parse
/// them, but they exit nonzero.
fn args_failure(check: &str, detail: String) -> ExitCode {
    println!("{}", Finding::fail(check, detail).render());
    ExitCode::from(2)
}

fn require_dir(path: &Path, check: &str) -> Result<(), ExitCode> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(args_failure(
            check,
            format!("Not a directory: {}", path.display()),
        ))
    }
}

fn read_rules_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Rules file not found: {}", path.display()))
}

fn cmd_patterns(validate: bool, rules_file: &Path, ext_dir: Option<&Path>) -> ExitCode {
    let text = match read_rules_file(rules_file) {
        Ok(text) => text,
        Err(e) => return args_failure("patterns/args", e.to_string()),
    };

    if validate {
        return cmd_validate(&text);
    }

    let Some(ext_dir) = ext_dir else {
        return args_failure("patterns/args", "No extension directory provided".to_string());
    };
    if let Err(code) = require_dir(ext_dir, "patterns/args") {
        return code;
    }

    emit(&run_rules(&text, ext_dir));
    ExitCode::SUCCESS
}

fn cmd_validate(text: &str) -> ExitCode {
    let rules = parse_rules(text);
    let report = validate_store(&rules);

    for warning in &report.warnings {
        eprintln!("{}: {warning}", "WARNING".yellow());
    }
    for error in &report.errors {
        println!("{}: {error}", "ERROR".red());
    }

    if report.is_ok() {
        println!("{}: {} rules validated", "OK".green(), report.rule_count);
        ExitCode::SUCCESS
    } else {
        println!(
            "\n{} error(s) found in {} rules",
            report.errors.len(),
            report.rule_count
        );
        ExitCode::FAILURE
    }
}

fn cmd_resource_graph(ext_dir: &Path) -> ExitCode {
    if !ext_dir.is_dir() {
        eprintln!("Error: {} is not a directory", ext_dir.display());
        return ExitCode::from(2);
    }
    match ResourceGraph::build(ext_dir) {
        Ok(graph) => {
            println!("{}", graph.to_json());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: failed to build resource graph: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(name: &str, ext_dir: &Path) -> ExitCode {
    let Some(def) = find_check(name) else {
        return args_failure(
            &format!("{name}/args"),
            format!(
                "Unknown check '{name}' (available: {})",
                check_names().join(", ")
            ),
        );
    };
    if let Err(code) = require_dir(ext_dir, &format!("{name}/args")) {
        return code;
    }

    let ctx = CheckContext::new(ext_dir);
    emit(&(def.run)(&ctx));
    ExitCode::SUCCESS
}

fn cmd_all(ext_dir: &Path) -> ExitCode {
    if let Err(code) = require_dir(ext_dir, "all/args") {
        return code;
    }

    let ctx = CheckContext::new(ext_dir);
    emit(&run_all(&ctx));
    emit(&run_rules(egolint_rules::DEFAULT_PATTERNS, ext_dir));
    ExitCode::SUCCESS
}

fn check_names() -> Vec<&'static str> {
    egolint_core::BUILTIN_CHECKS
        .iter()
        .map(|def| def.name)
        .collect()
}

fn cmd_list_checks() -> ExitCode {
    for def in egolint_core::BUILTIN_CHECKS {
        println!("{}", def.name);
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Patterns {
            validate,
            rules_file,
            ext_dir,
        } => cmd_patterns(validate, &rules_file, ext_dir.as_deref()),
        Command::ResourceGraph { ext_dir } => cmd_resource_graph(&ext_dir),
        Command::Check { list: true, .. } => cmd_list_checks(),
        Command::Check { name, ext_dir, .. } => {
            // clap guarantees both are present when --list is absent
            cmd_check(
                name.as_deref().unwrap_or_default(),
                ext_dir.as_deref().unwrap_or(Path::new(".")),
            )
        }
        Command::All { ext_dir } => cmd_all(&ext_dir),
    }
}
