//! GObject subclassing patterns.

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::source::line_number_at;
use regex::Regex;
use std::sync::LazyLock;

static REGISTER_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GObject\.registerClass\s*\(").unwrap());
static CLASS_EXTENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s+extends\s+[\w.]+\s*\{").unwrap());
static INIT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_init\s*\([^)]*\)\s*\{").unwrap());
static DRAW_CALLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(vfunc_repaint|set_draw_func)\s*[({]").unwrap());

/// `registerClass` without a GTypeName risks type collisions between
/// extensions.
fn check_gtypename(ctx: &CheckContext) -> Vec<Finding> {
    let mut missing: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        for m in REGISTER_CLASS_RE.find_iter(&content) {
            // The metadata object sits right after the call opener.
            let window = &content[m.start()..content.len().min(m.start() + 300)];
            if !window.contains("GTypeName") {
                missing.push(format!("{rel}:{}", line_number_at(&content, m.start())));
            }
        }
    }

    if missing.is_empty() {
        vec![Finding::pass(
            "gobject/missing-gtypename",
            "All registerClass calls include GTypeName",
        )]
    } else {
        missing
            .into_iter()
            .take(5)
            .map(|loc| {
                Finding::warn(
                    "gobject/missing-gtypename",
                    format!(
                        "{loc}: GObject.registerClass without GTypeName - add GTypeName to avoid conflicts between extensions"
                    ),
                )
            })
            .collect()
    }
}

/// `_init()` in a registered subclass must chain up.
fn check_super_init(ctx: &CheckContext) -> Vec<Finding> {
    let mut missing: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);

        for m in CLASS_EXTENDS_RE.find_iter(&content) {
            let preceding = &content[m.start().saturating_sub(80)..m.start()];
            if !preceding.contains("registerClass") {
                continue;
            }

            let class_body = &content[m.end()..];
            let Some(init) = INIT_HEADER_RE.find(class_body) else {
                continue;
            };

            let mut depth = 1i32;
            let bytes = class_body.as_bytes();
            let mut pos = init.end();
            while pos < bytes.len() && depth > 0 {
                match bytes[pos] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                pos += 1;
            }
            let body_end = if depth == 0 { pos - 1 } else { pos };
            let init_body = &class_body[init.end()..body_end.max(init.end())];

            if !init_body.contains("super._init") && !init_body.contains("super(params)") {
                let lineno = line_number_at(&content, m.start())
                    + class_body[..init.start()].matches('\n').count();
                missing.push(format!("{rel}:{lineno}"));
            }
        }
    }

    if missing.is_empty() {
        vec![Finding::pass(
            "gobject/missing-super-init",
            "All GObject subclass _init() methods call super._init()",
        )]
    } else {
        missing
            .into_iter()
            .take(5)
            .map(|loc| {
                Finding::warn(
                    "gobject/missing-super-init",
                    format!("{loc}: GObject subclass _init() missing super._init() call"),
                )
            })
            .collect()
    }
}

/// Drawing callbacks that take a Cairo context must dispose it.
fn check_cairo_dispose(ctx: &CheckContext) -> Vec<Finding> {
    let mut missing: Vec<String> = Vec::new();

    for path in &ctx.files {
        let Some(content) = ctx.read(path) else {
            continue;
        };
        let rel = ctx.rel(path);
        for m in DRAW_CALLBACK_RE.find_iter(&content) {
            let window = &content[m.start()..content.len().min(m.start() + 500)];
            if window.contains("get_context") && !window.contains("$dispose") {
                missing.push(format!("{rel}:{}", line_number_at(&content, m.start())));
            }
        }
    }

    if missing.is_empty() {
        vec![Finding::pass(
            "gobject/cairo-dispose",
            "All drawing callbacks dispose Cairo context",
        )]
    } else {
        missing
            .into_iter()
            .map(|loc| {
                Finding::warn(
                    "gobject/cairo-dispose",
                    format!(
                        "{loc}: Drawing callback uses get_context() without cr.$dispose() - will leak Cairo context"
                    ),
                )
            })
            .collect()
    }
}

/// Run the gobject family.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    if ctx.files.is_empty() {
        return vec![Finding::skip("gobject/no-js", "No JavaScript files found")];
    }
    let mut findings = Vec::new();
    findings.extend(check_gtypename(ctx));
    findings.extend(check_super_init(ctx));
    findings.extend(check_cairo_dispose(ctx));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Status;
    use std::fs;
    use tempfile::TempDir;

    fn run_on(src: &str) -> Vec<Finding> {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("widget.js"), src).unwrap();
        run(&CheckContext::new(dir.path()))
    }

    fn find<'a>(findings: &'a [Finding], check: &str) -> &'a Finding {
        findings.iter().find(|f| f.check == check).unwrap()
    }

    #[test]
    fn test_gtypename_present_passes() {
        let src = "const W = GObject.registerClass({\n  GTypeName: 'MyExtWidget',\n}, class W extends St.Widget {});\n";
        let findings = run_on(src);
        assert_eq!(find(&findings, "gobject/missing-gtypename").status, Status::Pass);
    }

    #[test]
    fn test_gtypename_missing_warns() {
        let src = "const W = GObject.registerClass(\nclass W extends St.Widget {});\n";
        let findings = run_on(src);
        let f = find(&findings, "gobject/missing-gtypename");
        assert_eq!(f.status, Status::Warn);
        assert!(f.detail.starts_with("widget.js:1"));
    }

    #[test]
    fn test_super_init_missing_warns() {
        let src = "GObject.registerClass(\nclass W extends St.Widget {\n  _init() {\n    this.label = 'x';\n  }\n});\n";
        let findings = run_on(src);
        assert_eq!(find(&findings, "gobject/missing-super-init").status, Status::Warn);
    }

    #[test]
    fn test_super_init_present_passes() {
        let src = "GObject.registerClass(\nclass W extends St.Widget {\n  _init(params) {\n    super._init(params);\n  }\n});\n";
        let findings = run_on(src);
        assert_eq!(find(&findings, "gobject/missing-super-init").status, Status::Pass);
    }

    #[test]
    fn test_plain_class_not_checked_for_super_init() {
        let src = "class Helper extends Base {\n  _init() {\n    this.x = 1;\n  }\n}\n";
        let findings = run_on(src);
        assert_eq!(find(&findings, "gobject/missing-super-init").status, Status::Pass);
    }

    #[test]
    fn test_cairo_dispose_missing_warns() {
        let src = "vfunc_repaint() {\n  const cr = this.get_context();\n  cr.paint();\n}\n";
        let findings = run_on(src);
        let f = find(&findings, "gobject/cairo-dispose");
        assert_eq!(f.status, Status::Warn);
    }

    #[test]
    fn test_cairo_dispose_present_passes() {
        let src = "vfunc_repaint() {\n  const cr = this.get_context();\n  cr.paint();\n  cr.$dispose();\n}\n";
        let findings = run_on(src);
        assert_eq!(find(&findings, "gobject/cairo-dispose").status, Status::Pass);
    }
}
