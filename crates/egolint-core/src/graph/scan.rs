//! Per-file resource scanning.
//!
//! Detects create-sites, destroy-sites, instantiations, imports, lifecycle
//! method presence, and container child adoption for one source file. The
//! scanner is line-regex based on comment-stripped content; imports are
//! parsed from the raw content so path strings inside comments cannot shift
//! line numbers.

use crate::findings::LintResult;
use crate::graph::resolve_relative;
use crate::source::{find_method_body, read_source, rel_path, strip_comments};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

/// The closed set of tracked resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Signal,
    Timeout,
    Widget,
    Dbus,
    FileMonitor,
    Gsettings,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Signal => "signal",
            ResourceKind::Timeout => "timeout",
            ResourceKind::Widget => "widget",
            ResourceKind::Dbus => "dbus",
            ResourceKind::FileMonitor => "filemonitor",
            ResourceKind::Gsettings => "gsettings",
        }
    }
}

// serde(rename_all = "lowercase") would emit "filemonitor" too, but the
// wire strings are load-bearing for the classifier; keep one source of truth.
impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn regexes(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static CREATE_PATTERNS: LazyLock<Vec<(ResourceKind, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            ResourceKind::Signal,
            regexes(&[r"\.connect\s*\(", r"\.connectObject\s*\("]),
        ),
        (
            ResourceKind::Timeout,
            regexes(&[
                r"timeout_add\s*\(",
                r"idle_add\s*\(",
                r"timeout_add_seconds\s*\(",
            ]),
        ),
        (
            ResourceKind::Widget,
            regexes(&[r"new\s+St\.\w+", r"new\s+Clutter\.\w+", r"new\s+PanelMenu\.\w+"]),
        ),
        (
            ResourceKind::Dbus,
            regexes(&[
                r"Gio\.DBusProxy\.new_for_bus",
                r"new\s+Gio\.DBusProxy",
                r"makeProxyWrapper",
            ]),
        ),
        (
            ResourceKind::FileMonitor,
            regexes(&[
                r"\.monitor_file\s*\(",
                r"\.monitor_directory\s*\(",
                r"\.monitor_children\s*\(",
            ]),
        ),
        (
            ResourceKind::Gsettings,
            regexes(&[r"\.getSettings\s*\(", r"new\s+Gio\.Settings\s*\("]),
        ),
    ]
});

static DESTROY_PATTERNS: LazyLock<Vec<(ResourceKind, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            ResourceKind::Signal,
            regexes(&[r"\.disconnect\s*\(", r"\.disconnectObject\s*\("]),
        ),
        (
            ResourceKind::Timeout,
            regexes(&[r"Source\.remove\s*\(", r"GLib\.Source\.remove\s*\("]),
        ),
        (ResourceKind::Widget, regexes(&[r"\.destroy\s*\("])),
        (
            ResourceKind::Dbus,
            regexes(&[r"\.disconnect\s*\(", r"\.disconnectSignal\s*\("]),
        ),
        (ResourceKind::FileMonitor, regexes(&[r"\.cancel\s*\("])),
        (
            ResourceKind::Gsettings,
            regexes(&[r"\.disconnectObject\s*\(", r"\.disconnect\s*\("]),
        ),
    ]
});

static STORED_PRIVATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(this\._\w+)\s*=").unwrap());
static STORED_PUBLIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(this\.\w+)\s*=").unwrap());
static DESTROY_RECEIVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(this[._]\w+(?:\._\w+)*)\??\.\w+\s*\(").unwrap());
static DESTROY_ARGUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\.\w+\s*\(\s*(this\._\w+)").unwrap());
static INSTANTIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(this[._]\w+)\s*=\s*new\s+(\w+)\s*\(").unwrap());
static CHILD_ADD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.(?:add_child|insert_child_below|insert_child_above|insert_child_at_index|set_child|add_actor)\s*\(\s*(this[._]\w+)",
    )
    .unwrap()
});
static IMPORT_NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+\{([^}]+)\}\s+from\s+['"](\.[^"']+)['"]"#).unwrap()
});
static IMPORT_DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+(\w+)\s+from\s+['"](\.[^"']+)['"]"#).unwrap());
static IMPORT_NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+\*\s+as\s+(\w+)\s+from\s+['"](\.[^"']+)['"]"#).unwrap()
});
static PRIVATE_DESTROY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|\s)_destroy\w*\s*\([^)]*\)\s*\{").unwrap());

const EXCERPT_CAP: usize = 120;

fn excerpt(line: &str) -> String {
    if line.len() <= EXCERPT_CAP {
        return line.to_string();
    }
    let mut end = EXCERPT_CAP;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line[..end].to_string()
}

/// A resource allocation site.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSite {
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Trimmed source excerpt, capped at 120 chars.
    pub pattern: String,
    /// `this._x`-style storage binding, when one could be extracted.
    pub stored_as: Option<String>,
}

/// A resource release site.
#[derive(Debug, Clone, Serialize)]
pub struct DestroySite {
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub pattern: String,
    /// The reference being released (receiver or argument).
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// A `this._x = new ClassName(...)` site.
#[derive(Debug, Clone, Serialize)]
pub struct Instantiation {
    pub line: usize,
    pub class: String,
    pub stored_as: String,
    pub has_destroy_call: bool,
    pub destroy_line: Option<usize>,
}

/// Everything the resolver and orphan detector need to know about one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileScan {
    #[serde(skip)]
    pub rel: String,
    pub creates: Vec<CreateSite>,
    pub destroys: Vec<DestroySite>,
    pub instantiates: Vec<Instantiation>,
    /// Symbol -> defining file (relative path), from relative-path imports.
    #[serde(skip)]
    pub imports: BTreeMap<String, String>,
    #[serde(skip)]
    pub has_destroy: bool,
    #[serde(skip)]
    pub has_disable: bool,
    #[serde(skip)]
    pub has_private_destroy: bool,
    /// Storage bindings attached as children of a container (auto-released
    /// by container destruction).
    #[serde(skip)]
    pub child_refs: BTreeSet<String>,
    /// Comment-stripped content, cached for lifecycle-body scans.
    #[serde(skip)]
    pub content: String,
}

impl FileScan {
    pub fn has_cleanup_method(&self) -> bool {
        self.has_destroy || self.has_disable || self.has_private_destroy
    }
}

/// Extract the left-hand-side storage binding of an assignment, preferring
/// the private (`this._x`) form.
fn extract_stored_ref(line: &str) -> Option<String> {
    STORED_PRIVATE_RE
        .captures(line)
        .or_else(|| STORED_PUBLIC_RE.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Extract the reference being released: a method receiver
/// (`this._monitor.cancel()`) or a passed handle
/// (`display.disconnect(this._id)`).
fn extract_destroy_ref(line: &str) -> Option<String> {
    DESTROY_RECEIVER_RE
        .captures(line)
        .or_else(|| DESTROY_ARGUMENT_RE.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Parse the three relative-path import shapes into a symbol -> file map.
fn parse_imports(raw_content: &str, file_rel: &str) -> BTreeMap<String, String> {
    let base_dir = match file_rel.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let mut imports = BTreeMap::new();

    for caps in IMPORT_NAMED_RE.captures_iter(raw_content) {
        let resolved = resolve_relative(base_dir, &caps[2]);
        for name in caps[1].split(',') {
            let name = name.rsplit(" as ").next().unwrap_or("").trim();
            if !name.is_empty() {
                imports.insert(name.to_string(), resolved.clone());
            }
        }
    }
    for caps in IMPORT_DEFAULT_RE.captures_iter(raw_content) {
        imports.insert(caps[1].to_string(), resolve_relative(base_dir, &caps[2]));
    }
    for caps in IMPORT_NAMESPACE_RE.captures_iter(raw_content) {
        imports.insert(caps[1].to_string(), resolve_relative(base_dir, &caps[2]));
    }

    imports
}

/// Scan one source file.
pub fn scan_file(path: &Path, ext_dir: &Path) -> LintResult<FileScan> {
    let raw_content = read_source(path)?;
    let content = strip_comments(&raw_content);
    let rel = rel_path(path, ext_dir);

    let imports = parse_imports(&raw_content, &rel);

    let mut creates = Vec::new();
    let mut destroys = Vec::new();
    let mut instantiates = Vec::new();
    let mut child_refs = BTreeSet::new();

    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let lineno = idx + 1;
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }

        // At most one create per kind per line; first pattern wins.
        for (kind, patterns) in CREATE_PATTERNS.iter() {
            if patterns.iter().any(|p| p.is_match(stripped)) {
                creates.push(CreateSite {
                    line: lineno,
                    kind: *kind,
                    pattern: excerpt(stripped),
                    stored_as: extract_stored_ref(stripped),
                });
            }
        }

        for (kind, patterns) in DESTROY_PATTERNS.iter() {
            if patterns.iter().any(|p| p.is_match(stripped)) {
                destroys.push(DestroySite {
                    line: lineno,
                    kind: *kind,
                    pattern: excerpt(stripped),
                    reference: extract_destroy_ref(stripped),
                });
            }
        }

        if let Some(caps) = INSTANTIATION_RE.captures(stripped) {
            instantiates.push(Instantiation {
                line: lineno,
                class: caps[2].to_string(),
                stored_as: caps[1].to_string(),
                has_destroy_call: false,
                destroy_line: None,
            });
        }

        if let Some(caps) = CHILD_ADD_RE.captures(stripped) {
            child_refs.insert(caps[1].to_string());
        }
    }

    // Post-pass: does any line call ref.destroy() / ref?.destroy()?
    for inst in &mut instantiates {
        let destroy_pat = Regex::new(&format!(
            r"{}\??\.destroy\s*\(",
            regex::escape(&inst.stored_as)
        ))
        .expect("escaped binding always compiles");
        for (idx, line) in lines.iter().enumerate() {
            if destroy_pat.is_match(line) {
                inst.has_destroy_call = true;
                inst.destroy_line = Some(idx + 1);
                break;
            }
        }
    }

    let has_destroy = find_method_body(&content, "destroy").is_some();
    let has_disable = find_method_body(&content, "disable").is_some();
    let has_private_destroy = PRIVATE_DESTROY_RE.is_match(&content);

    Ok(FileScan {
        rel,
        creates,
        destroys,
        instantiates,
        imports,
        has_destroy,
        has_disable,
        has_private_destroy,
        child_refs,
        content,
    })
}
