//! Cross-file resource tracking: builds the ownership graph and classifies
//! orphans into stable check identifiers.

use crate::checks::CheckContext;
use crate::findings::Finding;
use crate::graph::{Orphan, OrphanReason, ResourceGraph};

const ERROR_DETAIL_CAP: usize = 200;

/// Map an orphan to its check ID and detail line.
fn classify(orphan: &Orphan) -> (String, String) {
    let check = match &orphan.reason {
        OrphanReason::NoCleanupMethod { .. } => "resource-tracking/no-destroy-method".to_string(),
        OrphanReason::ParentNeverReleases { .. } => {
            "resource-tracking/destroy-not-called".to_string()
        }
        OrphanReason::BindingNotReleased { .. } => {
            format!("resource-tracking/orphan-{}", orphan.kind)
        }
    };
    let detail = format!("{}:{} - {}", orphan.file, orphan.line, orphan.reason);
    (check, detail)
}

/// Run the resource-tracking family.
///
/// Graph construction failure is not a finding about the extension: it
/// demotes to a single SKIP on the summary ID and no orphan-level findings
/// are emitted.
pub fn run(ctx: &CheckContext) -> Vec<Finding> {
    let graph = match ResourceGraph::build(&ctx.ext_dir) {
        Ok(graph) => graph,
        Err(e) => {
            let mut message = format!("resource graph construction failed: {e}");
            message.truncate(ERROR_DETAIL_CAP);
            return vec![Finding::skip("resource-tracking/ownership", message)];
        }
    };

    let mut findings = Vec::new();
    for orphan in &graph.orphans {
        let (check, detail) = classify(orphan);
        findings.push(Finding::warn(&check, detail));
    }

    let summary = &graph.summary;
    if summary.orphan_count == 0 {
        findings.push(Finding::pass(
            "resource-tracking/ownership",
            format!(
                "{} files scanned, depth {}, 0 orphans",
                summary.files_scanned, summary.ownership_depth
            ),
        ));
    } else {
        let plural = if summary.orphan_count == 1 { "" } else { "s" };
        findings.push(Finding::warn(
            "resource-tracking/ownership",
            format!(
                "{} files scanned, depth {}, {} orphan{} detected",
                summary.files_scanned, summary.ownership_depth, summary.orphan_count, plural
            ),
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Status;
    use std::fs;
    use tempfile::TempDir;

    fn run_on(files: &[(&str, &str)]) -> Vec<Finding> {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            fs::write(dir.path().join(rel), content).unwrap();
        }
        run(&CheckContext::new(dir.path()))
    }

    #[test]
    fn test_empty_extension_passes() {
        let findings = run_on(&[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check, "resource-tracking/ownership");
        assert_eq!(findings[0].status, Status::Pass);
        assert!(findings[0].detail.contains("0 files scanned"));
    }

    #[test]
    fn test_orphan_signal_in_owned_module() {
        // Spec scenario 2: entry instantiates Foo, never destroys it; foo.js
        // connects a signal and has no destroy method.
        let findings = run_on(&[
            (
                "extension.js",
                "import {Foo} from './foo.js';\nexport default class E {\n  enable() {\n    this._foo = new Foo();\n  }\n  disable() {\n  }\n}\n",
            ),
            (
                "foo.js",
                "export class Foo {\n  start() {\n    this._sig = global.display.connect('x', () => {});\n  }\n}\n",
            ),
        ]);

        let orphan = findings
            .iter()
            .find(|f| f.check == "resource-tracking/no-destroy-method")
            .expect("no-destroy-method finding");
        assert_eq!(orphan.status, Status::Warn);
        assert!(orphan.detail.starts_with("foo.js:3"));
        assert!(orphan.detail.contains("no destroy()/disable() method in foo.js"));

        let summary = findings.last().unwrap();
        assert_eq!(summary.check, "resource-tracking/ownership");
        assert_eq!(summary.status, Status::Warn);
        assert!(summary.detail.contains("1 orphan detected"));
    }

    #[test]
    fn test_destroy_not_called_classification() {
        let findings = run_on(&[
            (
                "extension.js",
                "import {Foo} from './foo.js';\nthis._foo = new Foo();\n",
            ),
            (
                "foo.js",
                "export class Foo {\n  start() {\n    this._sig = x.connect('a', cb);\n  }\n  destroy() {\n    x.disconnect(this._sig);\n  }\n}\n",
            ),
        ]);
        assert!(findings
            .iter()
            .any(|f| f.check == "resource-tracking/destroy-not-called"));
    }

    #[test]
    fn test_orphan_kind_specific_id() {
        let findings = run_on(&[
            (
                "extension.js",
                "import {Mon} from './mon.js';\nexport default class E {\n  enable() {\n    this._mon = new Mon();\n  }\n  disable() {\n    this._mon.destroy();\n  }\n}\n",
            ),
            (
                "mon.js",
                "export class Mon {\n  start() {\n    this._monitor = file.monitor_file(0, null);\n  }\n  destroy() {\n  }\n}\n",
            ),
        ]);
        let orphan = findings
            .iter()
            .find(|f| f.check == "resource-tracking/orphan-filemonitor")
            .expect("filemonitor orphan");
        assert!(orphan.detail.contains("this._monitor created but not cleaned up"));
    }

    #[test]
    fn test_clean_extension_summary_passes() {
        let findings = run_on(&[(
            "extension.js",
            "export default class E {\n  enable() {}\n  disable() {}\n}\n",
        )]);
        let summary = findings.last().unwrap();
        assert_eq!(summary.status, Status::Pass);
        assert!(summary.detail.contains("1 files scanned"));
    }
}
