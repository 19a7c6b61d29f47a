//! Documentation build through sphinx-build.

use std::path::Path;

use super::{Analyzer, StageContext, StageReport};
use crate::errors::{AdapterError, StageError};
use crate::models::{Cell, Headline, IssueList, MetricTable, RichText, SectionKind};
use crate::tools::ToolRun;
use crate::utils::{esc, rel_path};

pub const COLUMNS: [&str; 3] = ["Builder", "Output", "Result"];

/// `WARNING:` and `ERROR:` lines from the build log, in order.
pub fn parse_warnings(stderr: &str, root: &Path) -> IssueList {
    let mut list = IssueList::titled("Warnings");
    for line in stderr.lines() {
        let Some((location, kind, message)) = ["WARNING", "ERROR"].iter().find_map(|kind| {
            let marker = format!("{kind}: ");
            line.find(&marker)
                .map(|at| (&line[..at], *kind, &line[at + marker.len()..]))
        }) else {
            continue;
        };
        let location = location.trim_end().trim_end_matches(':');
        let location = match location.rsplit_once(':') {
            Some((file, line_no)) if line_no.chars().all(|c| c.is_ascii_digit()) => {
                format!("{}:{}", rel_path(Path::new(file), root), line_no)
            }
            _ if location.is_empty() => String::new(),
            _ => rel_path(Path::new(location), root),
        };
        let summary = if kind == "ERROR" {
            format!("<b>ERROR</b> {}", esc(message))
        } else {
            esc(message)
        };
        list.add(RichText::safe(summary), location);
    }
    list
}

fn builder(argv: &[String]) -> String {
    argv.iter()
        .position(|a| a == "-b")
        .and_then(|i| argv.get(i + 1))
        .cloned()
        .unwrap_or_else(|| "html".to_string())
}

/// Build summary table: one row, with the pass/fail outcome as headline.
pub fn build_table(argv: &[String], run: &ToolRun, root: &Path) -> Result<MetricTable, AdapterError> {
    let output = argv
        .last()
        .map(|o| rel_path(Path::new(o), root))
        .unwrap_or_default();
    let mut table =
        MetricTable::new(None, COLUMNS).with_headline(Headline::Passed(run.success()));
    let result = if run.success() {
        "passed".to_string()
    } else {
        format!("failed (exit {})", run.code)
    };
    table.add_row(vec![
        Cell::text(builder(argv)),
        Cell::text(output),
        Cell::text(result),
    ])?;
    Ok(table)
}

pub struct DocsAnalyzer;

impl Analyzer for DocsAnalyzer {
    fn section(&self) -> SectionKind {
        SectionKind::Docs
    }

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError> {
        let tool = &ctx.settings.tools.docs;
        ctx.run_pre(tool);
        // the doc-coverage data is written by this build
        ctx.clear_artifact("doc coverage", &ctx.settings.tools.doc_coverage)?;
        let run = ctx.invoke(&tool.command)?;
        let warnings = parse_warnings(&run.stderr, ctx.root());
        let table = build_table(&tool.command, &run, ctx.root())?;
        Ok(StageReport::new(
            vec![table.into(), warnings.into()],
            run.success(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing;
    use crate::tools::fake::{FakeRunner, Script};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_warnings_with_locations() {
        let stderr = indoc! {"
            /repo/docs/index.rst:12: WARNING: undefined label: 'setup' <ref>
            /repo/docs/api.rst: WARNING: document isn't included in any toctree
            WARNING: html_static_path entry '_static' does not exist
            /repo/docs/conf.py:3: ERROR: Unknown directive type \"foo\".
            reading sources... [100%] index
        "};
        let list = parse_warnings(stderr, Path::new("/repo"));
        assert_eq!(list.count(), 4);
        let issues = list.issues();
        assert_eq!(issues[0].summary.as_str(), "undefined label: 'setup' &lt;ref&gt;");
        assert_eq!(issues[0].details.as_str(), "docs/index.rst:12");
        assert_eq!(issues[1].details.as_str(), "docs/api.rst");
        assert_eq!(issues[2].details.as_str(), "");
        assert!(issues[3].summary.as_str().starts_with("<b>ERROR</b>"));
    }

    #[test]
    fn test_build_table_reports_outcome() {
        let argv: Vec<String> = ["sphinx-build", "-b", "dirhtml", "/repo/docs", "/repo/docs/html"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let run = ToolRun {
            code: 2,
            ..ToolRun::default()
        };
        let table = build_table(&argv, &run, Path::new("/repo")).unwrap();
        assert_eq!(table.headline, Some(Headline::Passed(false)));
        assert_eq!(table.get(0, "Builder"), Some(&Cell::text("dirhtml")));
        assert_eq!(table.get(0, "Output"), Some(&Cell::text("docs/html")));
        assert_eq!(table.get(0, "Result"), Some(&Cell::text("failed (exit 2)")));
    }

    #[test]
    fn test_analyze_clean_build() {
        let dir = tempfile::tempdir().unwrap();
        let settings = testing::settings(dir.path());
        let runner = FakeRunner::new().script("sphinx-build", Script::ok());
        let report = DocsAnalyzer
            .analyze(&StageContext::new(&settings, &runner))
            .unwrap();
        assert!(report.passed);
        assert_eq!(report.subsections.len(), 2);
        assert_eq!(report.subsections[1].heading(), Some("Warnings"));
    }

    #[test]
    fn test_build_clears_previous_doc_coverage_data() {
        let dir = tempfile::tempdir().unwrap();
        let settings = testing::settings(dir.path());
        let data = settings.tools.doc_coverage.artifact.clone().unwrap();
        std::fs::create_dir_all(data.parent().unwrap()).unwrap();
        std::fs::write(&data, "{}").unwrap();
        let runner = FakeRunner::new().script("sphinx-build", Script::exit(2, ""));
        let report = DocsAnalyzer
            .analyze(&StageContext::new(&settings, &runner))
            .unwrap();
        assert!(!report.passed);
        assert!(!data.exists());
    }
}
