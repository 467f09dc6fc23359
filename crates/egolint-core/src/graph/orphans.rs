//! Orphan detection over the ownership graph.
//!
//! Only owned files are inspected: root files are covered by the analyzers
//! that look at the entry file's lifecycle directly. A create-site becomes an
//! orphan when its release cannot be traced to a destroy-site, a lifecycle
//! null-assignment, or the parent's release of the owning instance.

use crate::graph::ownership::OwnershipMap;
use crate::graph::scan::{FileScan, ResourceKind};
use crate::source::find_method_body;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

static NULL_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(this[._]\w+)\s*=\s*null").unwrap());

/// Why a create-site could not be traced to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrphanReason {
    /// The enclosing file has no destroy()/disable()/_destroy* method.
    NoCleanupMethod { file: String },
    /// The file cleans itself up, but its parent never invokes it.
    ParentNeverReleases { file: String },
    /// The lifecycle method exists and runs, but this binding is never
    /// released there.
    BindingNotReleased { binding: String },
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrphanReason::NoCleanupMethod { file } => {
                write!(f, "no destroy()/disable() method in {file}")
            }
            OrphanReason::ParentNeverReleases { file } => {
                write!(f, "parent does not call destroy() on {file}")
            }
            OrphanReason::BindingNotReleased { binding } => {
                write!(f, "{binding} created but not cleaned up in destroy()")
            }
        }
    }
}

impl Serialize for OrphanReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A create-site with no traceable release.
#[derive(Debug, Clone, Serialize)]
pub struct Orphan {
    pub file: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub pattern: String,
    pub reason: OrphanReason,
}

/// Bindings assigned `null` inside any lifecycle method body - treated as a
/// release even when the resource auto-cleans itself.
fn nulled_refs(scan: &FileScan) -> BTreeSet<String> {
    let mut nulled = BTreeSet::new();
    for method in ["destroy", "disable", "_destroy"] {
        if let Some(mb) = find_method_body(&scan.content, method) {
            for caps in NULL_ASSIGN_RE.captures_iter(&mb.body) {
                nulled.insert(caps[1].to_string());
            }
        }
    }
    nulled
}

/// Classify every create-site in every owned file.
pub fn detect_orphans(
    scans: &BTreeMap<String, FileScan>,
    ownership: &OwnershipMap,
) -> Vec<Orphan> {
    let parent_of = crate::graph::ownership::parents_of(ownership, scans);
    let mut orphans = Vec::new();

    for (rel, scan) in scans {
        let Some(parent_rel) = parent_of.get(rel) else {
            continue;
        };
        if scan.creates.is_empty() {
            continue;
        }

        // No cleanup method at all: every create is unreleasable.
        if !scan.has_cleanup_method() {
            for create in &scan.creates {
                orphans.push(Orphan {
                    file: rel.clone(),
                    line: create.line,
                    kind: create.kind,
                    pattern: create.pattern.clone(),
                    reason: OrphanReason::NoCleanupMethod { file: rel.clone() },
                });
            }
            continue;
        }

        // Cleanup method exists; is it ever invoked by the parent?
        let parent_releases = ownership
            .get(parent_rel)
            .is_some_and(|refs| {
                refs.values().any(|info| {
                    info.source_file.as_deref() == Some(rel.as_str())
                        && info.destroyed_line.is_some()
                })
            });
        if !parent_releases {
            for create in &scan.creates {
                orphans.push(Orphan {
                    file: rel.clone(),
                    line: create.line,
                    kind: create.kind,
                    pattern: create.pattern.clone(),
                    reason: OrphanReason::ParentNeverReleases { file: rel.clone() },
                });
            }
            continue;
        }

        let nulled = nulled_refs(scan);

        // The cleanup method runs; check each stored binding individually.
        for create in &scan.creates {
            let Some(stored) = &create.stored_as else {
                // Untracked resource: no confident signal, no orphan.
                continue;
            };

            // Widgets adopted as container children are destroyed with the
            // container.
            if create.kind == ResourceKind::Widget && scan.child_refs.contains(stored) {
                continue;
            }

            // makeProxyWrapper builds a proxy class, not an instance.
            if create.kind == ResourceKind::Dbus && create.pattern.contains("makeProxyWrapper") {
                continue;
            }

            let released = scan.destroys.iter().any(|d| {
                d.reference.as_deref() == Some(stored.as_str())
                    || (d.reference.is_some() && d.pattern.contains(stored.as_str()))
            }) || nulled.contains(stored);

            if !released {
                orphans.push(Orphan {
                    file: rel.clone(),
                    line: create.line,
                    kind: create.kind,
                    pattern: create.pattern.clone(),
                    reason: OrphanReason::BindingNotReleased {
                        binding: stored.clone(),
                    },
                });
            }
        }
    }

    orphans
}
