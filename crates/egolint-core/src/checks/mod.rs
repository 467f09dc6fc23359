//! Heuristic check catalog.
//!
//! Checks are grouped into families matching the analyzer surface: each
//! family is one [`CheckDef`] record in a static registry, enumerated in
//! declaration order so `run_all` output is deterministic. Individual checks
//! are plain functions over a [`CheckContext`].

pub mod async_safety;
pub mod css;
pub mod gobject;
pub mod init_scope;
pub mod lifecycle;
pub mod metadata;
pub mod prefs;
pub mod quality;
pub mod resources;

use crate::findings::Finding;
use crate::manifest::Manifest;
use crate::source::{find_source_files, read_source, rel_path};
use std::path::{Path, PathBuf};

/// Analyzer family, used for grouping in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lifecycle,
    ResourceTracking,
    Quality,
    Async,
    Init,
    Packaging,
}

/// One registered analyzer family.
pub struct CheckDef {
    pub name: &'static str,
    pub category: Category,
    pub run: fn(&CheckContext) -> Vec<Finding>,
}

/// Built-in analyzer families, in execution order.
pub const BUILTIN_CHECKS: &[CheckDef] = &[
    CheckDef {
        name: "lifecycle",
        category: Category::Lifecycle,
        run: lifecycle::run,
    },
    CheckDef {
        name: "resources",
        category: Category::ResourceTracking,
        run: resources::run,
    },
    CheckDef {
        name: "quality",
        category: Category::Quality,
        run: quality::run,
    },
    CheckDef {
        name: "async",
        category: Category::Async,
        run: async_safety::run,
    },
    CheckDef {
        name: "init",
        category: Category::Init,
        run: init_scope::run,
    },
    CheckDef {
        name: "metadata",
        category: Category::Packaging,
        run: metadata::run,
    },
    CheckDef {
        name: "css",
        category: Category::Packaging,
        run: css::run,
    },
    CheckDef {
        name: "gobject",
        category: Category::Quality,
        run: gobject::run,
    },
    CheckDef {
        name: "prefs",
        category: Category::Packaging,
        run: prefs::run,
    },
];

/// Look up an analyzer family by name.
pub fn find_check(name: &str) -> Option<&'static CheckDef> {
    BUILTIN_CHECKS.iter().find(|def| def.name == name)
}

/// Shared per-run state handed to every check.
#[derive(Debug)]
pub struct CheckContext {
    pub ext_dir: PathBuf,
    /// Every source file in the bundle, sorted.
    pub files: Vec<PathBuf>,
    /// Source files excluding the preference surface (`prefs.js`), sorted.
    pub runtime_files: Vec<PathBuf>,
    /// Leniently loaded manifest; `None` when absent or malformed.
    pub manifest: Option<Manifest>,
}

impl CheckContext {
    pub fn new(ext_dir: &Path) -> CheckContext {
        CheckContext {
            ext_dir: ext_dir.to_path_buf(),
            files: find_source_files(ext_dir, false),
            runtime_files: find_source_files(ext_dir, true),
            manifest: Manifest::load_lenient(ext_dir),
        }
    }

    /// Relative display path for a file under the extension root.
    pub fn rel(&self, path: &Path) -> String {
        rel_path(path, &self.ext_dir)
    }

    /// Read a file, swallowing I/O errors (the file's hits are lost, the
    /// run continues).
    pub fn read(&self, path: &Path) -> Option<String> {
        read_source(path).ok()
    }

    /// The conventional entry file, when present.
    pub fn entry_file(&self) -> Option<PathBuf> {
        let path = self.ext_dir.join("extension.js");
        path.is_file().then_some(path)
    }

    pub fn has_session_mode(&self, mode: &str) -> bool {
        self.manifest
            .as_ref()
            .is_some_and(|m| m.has_session_mode(mode))
    }
}

/// Run every registered analyzer family in order.
pub fn run_all(ctx: &CheckContext) -> Vec<Finding> {
    BUILTIN_CHECKS
        .iter()
        .flat_map(|def| (def.run)(ctx))
        .collect()
}
