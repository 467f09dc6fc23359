//! Cross-file resource ownership graph.
//!
//! Scans every runtime source file, links instantiations to defining files
//! through their imports, and classifies create-sites in owned files whose
//! release cannot be traced. Built once per run, then read-only.

mod ownership;
mod orphans;
mod scan;

pub use ownership::{build_ownership, compute_depth, parents_of, OwnedInstance, OwnershipMap};
pub use orphans::{detect_orphans, Orphan, OrphanReason};
pub use scan::{scan_file, CreateSite, DestroySite, FileScan, Instantiation, ResourceKind};

use crate::findings::LintResult;
use crate::source::find_source_files;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Lexically resolve a relative import against the importing file's
/// directory, both given relative to the extension root.
pub(crate) fn resolve_relative(base_rel_dir: &str, import: &str) -> String {
    let mut parts: Vec<&str> = if base_rel_dir.is_empty() {
        Vec::new()
    } else {
        base_rel_dir.split('/').collect()
    };
    for comp in import.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Aggregate counters for the graph document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSummary {
    pub total_creates: usize,
    pub total_destroys: usize,
    pub orphan_count: usize,
    pub files_scanned: usize,
    pub ownership_depth: usize,
}

/// The complete ownership graph for one extension directory.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceGraph {
    /// Per-file creates/destroys/instantiates, keyed by relative path.
    pub files: BTreeMap<String, FileScan>,
    pub ownership: OwnershipMap,
    pub orphans: Vec<Orphan>,
    pub summary: GraphSummary,
}

impl ResourceGraph {
    /// Scan the extension directory and build the graph.
    ///
    /// `prefs.js` is excluded: the preferences process has its own
    /// lifecycle and is covered by the prefs surface checks.
    pub fn build(ext_dir: &Path) -> LintResult<ResourceGraph> {
        let sources = find_source_files(ext_dir, true);
        if sources.is_empty() {
            return Ok(ResourceGraph {
                files: BTreeMap::new(),
                ownership: OwnershipMap::new(),
                orphans: Vec::new(),
                summary: GraphSummary::default(),
            });
        }

        let mut files = BTreeMap::new();
        for path in &sources {
            let scan = scan_file(path, ext_dir)?;
            files.insert(scan.rel.clone(), scan);
        }

        let ownership = build_ownership(&files);
        let depth = compute_depth(&ownership, &files);
        let orphans = detect_orphans(&files, &ownership);

        let summary = GraphSummary {
            total_creates: files.values().map(|s| s.creates.len()).sum(),
            total_destroys: files.values().map(|s| s.destroys.len()).sum(),
            orphan_count: orphans.len(),
            files_scanned: files.len(),
            ownership_depth: depth,
        };

        Ok(ResourceGraph {
            files,
            ownership,
            orphans,
            summary,
        })
    }

    /// Serialize the graph as the structured inspection document.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("graph serialization is infallible")
    }
}
