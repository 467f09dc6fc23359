//! Extension source enumeration, comment stripping, and brace scaffolding.
//!
//! Everything downstream - pattern rules, heuristic checks, the resource
//! graph - shares these primitives. Method body extraction is brace-counted
//! and therefore inexact (string literals containing braces can skew it);
//! checks that depend on it stay advisory.

use crate::findings::{LintError, LintResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// Directories never scanned inside an extension bundle.
pub const SKIP_DIRS: &[&str] = &["node_modules", ".git", "__pycache__"];

static BLOCK_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());
static REGISTER_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GObject\.registerClass\s*\(").unwrap());
static CONSTRUCTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconstructor\s*\(").unwrap());

/// Enumerate `.js` files under the extension root, sorted for determinism.
///
/// `exclude_prefs` drops `prefs.js` for analyses that only apply to the
/// runtime surface (the preferences process has its own lifecycle).
pub fn find_source_files(root: &Path, exclude_prefs: bool) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIP_DIRS.contains(&name)))
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("js"))
        .filter(|path| {
            !(exclude_prefs && path.file_name().and_then(|n| n.to_str()) == Some("prefs.js"))
        })
        .collect();
    files.sort();
    files
}

/// Read a source file as UTF-8 with replacement on decode error.
pub fn read_source(path: &Path) -> LintResult<String> {
    let bytes = std::fs::read(path).map_err(|source| LintError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Remove block comments (`/* ... */`, non-greedy).
pub fn strip_block_comments(content: &str) -> String {
    BLOCK_COMMENT_RE.replace_all(content, "").into_owned()
}

/// Remove line comments (`//` to end of line).
pub fn strip_line_comments(content: &str) -> String {
    LINE_COMMENT_RE.replace_all(content, "").into_owned()
}

/// Remove block then line comments.
///
/// Apply before structural heuristics; keep the raw content around for
/// analyses that must see comments (suppression, commentary checks).
pub fn strip_comments(content: &str) -> String {
    strip_line_comments(&strip_block_comments(content))
}

/// Forward-slash relative display path.
pub fn rel_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// 1-based line number of a byte offset.
pub fn line_number_at(content: &str, byte_pos: usize) -> usize {
    content[..byte_pos].matches('\n').count() + 1
}

/// Net brace depth change contributed by one line.
pub fn brace_delta(line: &str) -> i32 {
    line.bytes().fold(0, |delta, b| match b {
        b'{' => delta + 1,
        b'}' => delta - 1,
        _ => delta,
    })
}

/// An extracted method body with its line span.
#[derive(Debug, Clone)]
pub struct MethodBody {
    pub start_line: usize,
    pub end_line: usize,
    pub body: String,
}

/// Walk forward from an opening brace to its matching close.
///
/// Returns the byte offset just past the closing brace, or the content
/// length when the braces never balance.
fn scan_to_matching_brace(content: &str, open: usize) -> (usize, bool) {
    let bytes = content.as_bytes();
    let mut depth = 1i32;
    let mut pos = open + 1;
    while pos < bytes.len() && depth > 0 {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        pos += 1;
    }
    (pos, depth == 0)
}

/// Heuristically extract the body of a named method.
///
/// Finds the first `name(...) {` header, then walks braces to the matching
/// close. Returns `None` when no header matches.
pub fn find_method_body(content: &str, method_name: &str) -> Option<MethodBody> {
    let pattern = format!(
        r"(?m)(?:^|\s){}\s*\([^)]*\)\s*\{{",
        regex::escape(method_name)
    );
    let header = Regex::new(&pattern).ok()?;
    let m = header.find(content)?;
    let brace_pos = m.start() + content[m.start()..].find('{')?;
    let (end, balanced) = scan_to_matching_brace(content, brace_pos);

    let body = if balanced {
        content[brace_pos + 1..end - 1].to_string()
    } else {
        content[brace_pos + 1..].to_string()
    };

    Some(MethodBody {
        start_line: line_number_at(content, brace_pos),
        end_line: line_number_at(content, end.min(content.len())),
        body,
    })
}

/// Lines at module scope (brace depth zero), as `(1-based line, text)`.
pub fn module_scope_lines<'a>(lines: &[&'a str]) -> Vec<(usize, &'a str)> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    for (idx, line) in lines.iter().enumerate() {
        if depth == 0 {
            out.push((idx + 1, *line));
        }
        depth += brace_delta(line);
        if depth < 0 {
            depth = 0;
        }
    }
    out
}

/// Lines inside `constructor()` bodies, as `(1-based line, text)`.
///
/// Constructors inside `GObject.registerClass(...)` wrappers are skipped:
/// those only run when the class is explicitly instantiated, not at module
/// init time.
pub fn constructor_lines<'a>(lines: &[&'a str]) -> Vec<(usize, &'a str)> {
    let mut out = Vec::new();
    let mut in_ctor = false;
    let mut ctor_depth = 0i32;
    let mut in_register = false;
    let mut depth = 0i32;

    for (idx, line) in lines.iter().enumerate() {
        let lineno = idx + 1;

        if !in_register && REGISTER_CLASS_RE.is_match(line) {
            in_register = true;
        }

        depth += brace_delta(line);
        if depth < 0 {
            depth = 0;
        }

        if in_register && line.contains(')') && depth == 0 {
            in_register = false;
            continue;
        }

        if !in_ctor && CONSTRUCTOR_RE.is_match(line) {
            if in_register {
                continue;
            }
            in_ctor = true;
            let open = line.matches('{').count() as i32;
            let close = line.matches('}').count() as i32;
            if open > 0 {
                ctor_depth = open - close;
                out.push((lineno, *line));
                if ctor_depth <= 0 {
                    in_ctor = false;
                }
            } else {
                ctor_depth = 0;
            }
            continue;
        }

        if in_ctor {
            out.push((lineno, *line));
            ctor_depth += brace_delta(line);
            if ctor_depth <= 0 {
                in_ctor = false;
            }
        }
    }

    out
}
