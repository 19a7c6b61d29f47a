//! Documentation coverage from the artifact written during the docs build.
//!
//! The artifact counts documented objects per file and lists every object
//! missing documentation:
//!
//! ```json
//! {"documented": {"pkg/a.py": 4},
//!  "undocumented": [{"file": "pkg/a.py", "object": "pkg.a.f", "issue": "missing docstring", "line": 3}]}
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{decode, read_artifact, Analyzer, StageContext, StageReport};
use crate::errors::{AdapterError, StageError};
use crate::models::{Cell, Headline, IssueList, MetricTable, RichText, SectionKind, Subsection};
use crate::utils::{esc, rel_path};

const TOOL: &str = "doc coverage";
pub const COLUMNS: [&str; 4] = ["File", "Documented", "Undocumented", "Coverage"];

#[derive(Debug, Default, Deserialize)]
struct DocCoverageReport {
    #[serde(default)]
    documented: BTreeMap<String, u64>,
    #[serde(default)]
    undocumented: Vec<Undocumented>,
}

#[derive(Debug, Deserialize)]
struct Undocumented {
    file: String,
    object: String,
    #[serde(default)]
    issue: String,
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    text: Option<String>,
}

/// floor(documented / inspected * 100); nothing inspected counts as fully
/// documented.
pub fn coverage_percent(documented: u64, undocumented: u64) -> f64 {
    let total = documented + undocumented;
    if total == 0 {
        return 100.0;
    }
    ((documented as f64 / total as f64) * 100.0).floor()
}

/// "Undocumented" list plus the per-file table with the overall headline.
pub fn parse_doc_coverage(raw: &str, root: &Path) -> Result<(IssueList, MetricTable), AdapterError> {
    let report: DocCoverageReport = decode(TOOL, raw)?;

    let mut per_file: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for (file, count) in &report.documented {
        per_file.entry(rel_path(Path::new(file), root)).or_default().0 += count;
    }

    let mut list = IssueList::titled("Undocumented");
    for u in &report.undocumented {
        let file = rel_path(Path::new(&u.file), root);
        per_file.entry(file.clone()).or_default().1 += 1;
        let mut summary = format!("<code>{}</code>", esc(&u.object));
        if !u.issue.is_empty() {
            summary.push_str(&format!(": {}", esc(&u.issue)));
        }
        let mut details = match u.line {
            Some(line) => format!("{}:{}", esc(&file), line),
            None => esc(&file),
        };
        if let Some(text) = u.text.as_deref().filter(|t| !t.trim().is_empty()) {
            details.push_str(&format!("<pre>{}</pre>", esc(text)));
        }
        list.add(RichText::safe(summary), RichText::safe(details));
    }

    let documented: u64 = per_file.values().map(|(d, _)| d).sum();
    let undocumented: u64 = per_file.values().map(|(_, u)| u).sum();
    let mut table = MetricTable::new(None, COLUMNS)
        .with_headline(Headline::Percent(coverage_percent(documented, undocumented)));
    for (file, (d, u)) in per_file {
        table.add_row(vec![
            Cell::text(file),
            Cell::from(d as i64),
            Cell::from(u as i64),
            Cell::from(coverage_percent(d, u)),
        ])?;
    }
    Ok((list, table))
}

pub struct DocCoverageAnalyzer;

impl Analyzer for DocCoverageAnalyzer {
    fn section(&self) -> SectionKind {
        SectionKind::DocCoverage
    }

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError> {
        let tool = &ctx.settings.tools.doc_coverage;
        ctx.run_pre(tool);
        let stdout = if tool.is_configured() {
            ctx.clear_artifact(TOOL, tool)?;
            Some(ctx.invoke(&tool.command)?.stdout)
        } else {
            None
        };
        let raw = match (&tool.artifact, stdout) {
            (Some(path), _) => match read_artifact(TOOL, path) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("{e}");
                    let list = IssueList::unavailable(
                        Some("Undocumented".to_string()),
                        "Documentation coverage data unavailable",
                        format!("{} was not produced by the documentation build", path.display()),
                    );
                    return Ok(StageReport::new(vec![list.into()], false));
                }
            },
            (None, Some(stdout)) => stdout,
            (None, None) => {
                return Err(AdapterError::malformed(TOOL, "neither a command nor an artifact is configured").into())
            }
        };
        let (list, table) = parse_doc_coverage(&raw, ctx.root())?;
        let passed = list.count() == 0;
        let subsections: Vec<Subsection> = vec![table.into(), list.into()];
        Ok(StageReport::new(subsections, passed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing;
    use crate::tools::fake::FakeRunner;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = indoc! {r#"
        {
          "documented": {"src/pkg/a.py": 7, "src/pkg/b.py": 2},
          "undocumented": [
            {"file": "src/pkg/b.py", "object": "pkg.b.helper", "issue": "missing docstring", "line": 14},
            {"file": "src/pkg/c.py", "object": "pkg.c", "issue": "missing module docstring",
             "text": "def run(x):\n    return x < 1"}
          ]
        }
    "#};

    #[test]
    fn test_percent_floors_and_handles_empty() {
        assert_eq!(coverage_percent(2, 1), 66.0);
        assert_eq!(coverage_percent(0, 0), 100.0);
        assert_eq!(coverage_percent(0, 3), 0.0);
    }

    #[test]
    fn test_table_and_list() {
        let (list, table) = parse_doc_coverage(SAMPLE, Path::new("/repo")).unwrap();
        // 9 documented of 11 inspected
        assert_eq!(table.headline, Some(Headline::Percent(81.0)));
        assert_eq!(table.count(), 3);
        assert_eq!(table.get(1, "File"), Some(&Cell::text("src/pkg/b.py")));
        assert_eq!(table.get(1, "Coverage"), Some(&Cell::Number(66.0)));
        assert_eq!(table.get(2, "Documented"), Some(&Cell::Integer(0)));
        assert_eq!(list.count(), 2);
        assert_eq!(
            list.issues()[0].summary.as_str(),
            "<code>pkg.b.helper</code>: missing docstring"
        );
        assert_eq!(
            list.issues()[1].details.as_str(),
            "src/pkg/c.py<pre>def run(x):\n    return x &lt; 1</pre>"
        );
    }

    #[test]
    fn test_empty_artifact_is_fully_covered() {
        let (list, table) = parse_doc_coverage("{}", Path::new("/repo")).unwrap();
        assert_eq!(list.count(), 0);
        assert_eq!(table.headline, Some(Headline::Percent(100.0)));
    }

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let settings = testing::settings(dir.path());
        let runner = FakeRunner::new();
        let report = DocCoverageAnalyzer
            .analyze(&StageContext::new(&settings, &runner))
            .unwrap();
        assert!(!report.passed);
        match &report.subsections[0] {
            Subsection::IssueList(list) => assert!(list.is_unavailable()),
            other => panic!("unexpected subsection {other:?}"),
        }
        // no command configured by default
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_reads_artifact_from_docs_build() {
        let dir = tempfile::tempdir().unwrap();
        let settings = testing::settings(dir.path());
        let artifact = settings.tools.doc_coverage.artifact.clone().unwrap();
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, SAMPLE).unwrap();
        let report = DocCoverageAnalyzer
            .analyze(&StageContext::new(&settings, &FakeRunner::new()))
            .unwrap();
        assert_eq!(report.subsections.len(), 2);
        assert!(matches!(report.subsections[0], Subsection::MetricTable(_)));
    }
}
