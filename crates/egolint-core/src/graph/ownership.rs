//! Ownership resolution over per-file scans.
//!
//! An instantiation whose class name resolves through the file's imports to
//! another scanned file installs a parent -> child edge. Files are held in a
//! flat path-keyed collection; edges live in adjacency maps, never as cyclic
//! in-memory references.

use crate::graph::scan::FileScan;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One owned instance recorded on its parent file.
#[derive(Debug, Clone, Serialize)]
pub struct OwnedInstance {
    pub class: String,
    /// Defining file, when the class resolved through imports.
    pub source_file: Option<String>,
    pub created_line: usize,
    pub destroyed_line: Option<usize>,
}

/// parent file -> (storage binding -> owned instance)
pub type OwnershipMap = BTreeMap<String, BTreeMap<String, OwnedInstance>>;

/// Build the ownership map from all file scans.
///
/// The class -> file import map is merged across files in sorted path
/// order; a class name imported from two places resolves to the last one,
/// deterministically.
pub fn build_ownership(scans: &BTreeMap<String, FileScan>) -> OwnershipMap {
    let mut global_imports: BTreeMap<&str, &str> = BTreeMap::new();
    for scan in scans.values() {
        for (class, source) in &scan.imports {
            global_imports.insert(class.as_str(), source.as_str());
        }
    }

    let mut ownership = OwnershipMap::new();
    for (rel, scan) in scans {
        let mut file_ownership = BTreeMap::new();
        for inst in &scan.instantiates {
            file_ownership.insert(
                inst.stored_as.clone(),
                OwnedInstance {
                    class: inst.class.clone(),
                    source_file: global_imports.get(inst.class.as_str()).map(|s| s.to_string()),
                    created_line: inst.line,
                    destroyed_line: inst.destroy_line,
                },
            );
        }
        if !file_ownership.is_empty() {
            ownership.insert(rel.clone(), file_ownership);
        }
    }
    ownership
}

/// Files that are instantiated by some other scanned file, with their first
/// parent in sorted-path order.
pub fn parents_of(
    ownership: &OwnershipMap,
    scans: &BTreeMap<String, FileScan>,
) -> BTreeMap<String, String> {
    let mut parent_of = BTreeMap::new();
    for (rel, refs) in ownership {
        for info in refs.values() {
            if let Some(child) = &info.source_file {
                if scans.contains_key(child) {
                    parent_of.entry(child.clone()).or_insert_with(|| rel.clone());
                }
            }
        }
    }
    parent_of
}

/// Maximum ownership chain depth, by BFS from each root with visit sets.
///
/// A cycle is tolerated (visited nodes are not re-entered) and does not
/// increase depth. When every file is owned, the first file in sorted order
/// is used as the sole root.
pub fn compute_depth(ownership: &OwnershipMap, scans: &BTreeMap<String, FileScan>) -> usize {
    if scans.is_empty() {
        return 0;
    }

    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut owned: BTreeSet<&str> = BTreeSet::new();
    for (rel, refs) in ownership {
        for info in refs.values() {
            if let Some(child) = &info.source_file {
                if scans.contains_key(child) {
                    children.entry(rel.as_str()).or_default().push(child);
                }
                owned.insert(child.as_str());
            }
        }
    }

    let mut roots: Vec<&str> = scans
        .keys()
        .map(String::as_str)
        .filter(|rel| !owned.contains(rel))
        .collect();
    if roots.is_empty() {
        roots = scans.keys().take(1).map(String::as_str).collect();
    }

    let mut max_depth = 1;
    for root in roots {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((root, 1));
        while let Some((node, depth)) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            max_depth = max_depth.max(depth);
            for &child in children.get(node).into_iter().flatten() {
                if !visited.contains(child) {
                    queue.push_back((child, depth + 1));
                }
            }
        }
    }

    max_depth
}
