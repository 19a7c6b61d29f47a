//! Unit tests under coverage, reported as a per-module coverage table.
//!
//! Each module row links to a listing of the module with run, missing and
//! excluded lines marked.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::{annotate, decode, source_link, Analyzer, StageContext, StageReport};
use crate::errors::{AdapterError, StageError};
use crate::models::{Cell, Headline, IssueList, LineMark, MetricTable, RichText, SectionKind, SourceView};
use crate::tools::ToolRun;
use crate::utils::{esc, rel_path, tail};

const TOOL: &str = "coverage";
pub const COLUMNS: [&str; 5] = ["Module", "Statements", "Missing", "Excluded", "Coverage"];

#[derive(Debug, Deserialize)]
struct CoverageReport {
    #[serde(default)]
    files: BTreeMap<String, FileEntry>,
    totals: Totals,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    summary: FileSummary,
    #[serde(default)]
    executed_lines: Vec<u64>,
    #[serde(default)]
    missing_lines: Vec<u64>,
    #[serde(default)]
    excluded_lines: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct FileSummary {
    num_statements: i64,
    missing_lines: i64,
    #[serde(default)]
    excluded_lines: i64,
    percent_covered: f64,
}

#[derive(Debug, Deserialize)]
struct Totals {
    percent_covered: f64,
}

/// Coverage table with the floored total as its headline, and a listing for
/// every module that can still be read.
pub fn parse_coverage(raw: &str, root: &Path) -> Result<(MetricTable, Vec<SourceView>), AdapterError> {
    let report: CoverageReport = decode(TOOL, raw)?;
    let total = report.totals.percent_covered;
    if !(0.0..=100.0).contains(&total) {
        return Err(AdapterError::malformed(
            TOOL,
            format!("total coverage {total} is out of range"),
        ));
    }
    let mut table = MetricTable::new(None, COLUMNS).with_headline(Headline::Percent(total.floor()));
    let mut sources = Vec::new();
    for (name, entry) in report.files {
        let file = rel_path(Path::new(&name), root);
        let marks = [
            (entry.executed_lines.as_slice(), LineMark::Run),
            (entry.missing_lines.as_slice(), LineMark::Missing),
            (entry.excluded_lines.as_slice(), LineMark::Excluded),
        ];
        let module = match annotate(root, &file, &marks, None) {
            Some(view) => {
                sources.push(view);
                Cell::safe(source_link(SectionKind::Tests, &file, None, &file))
            }
            None => Cell::text(file),
        };
        let s = entry.summary;
        table.add_row(vec![
            module,
            Cell::from(s.num_statements),
            Cell::from(s.missing_lines),
            Cell::from(s.excluded_lines),
            Cell::from(s.percent_covered),
        ])?;
    }
    Ok((table, sources))
}

fn failure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<kind>FAIL|ERROR): (?P<test>\S+)(?: \((?P<case>[^)]+)\))?")
            .expect("static unittest pattern")
    })
}

/// Failing tests named in unittest's output. A failed run that names none
/// still yields one issue carrying the tail of the output.
pub fn parse_failures(run: &ToolRun) -> IssueList {
    let mut list = IssueList::titled("Failures");
    if run.success() {
        return list;
    }
    let output = format!("{}\n{}", run.stderr, run.stdout);
    for line in output.lines() {
        if let Some(caps) = failure_pattern().captures(line) {
            let test = match caps.name("case") {
                // newer unittest already prints the qualified name
                Some(case) if case.as_str().ends_with(&caps["test"]) => case.as_str().to_string(),
                Some(case) => format!("{}.{}", case.as_str(), &caps["test"]),
                None => caps["test"].to_string(),
            };
            list.add(
                RichText::safe(format!("<b>{}</b> {}", &caps["kind"], esc(&test))),
                line.to_string(),
            );
        }
    }
    if list.count() == 0 {
        list.add(
            format!("Test run exited with {}", run.code),
            RichText::safe(format!("<pre>{}</pre>", esc(&tail(&output, 40)))),
        );
    }
    list
}

pub struct TestsAnalyzer;

impl Analyzer for TestsAnalyzer {
    fn section(&self) -> SectionKind {
        SectionKind::Tests
    }

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError> {
        let tests = &ctx.settings.tools.tests;
        ctx.run_pre(tests);
        let run = ctx.invoke(&tests.command)?;
        let failures = parse_failures(&run);

        let coverage = &ctx.settings.tools.coverage;
        ctx.clear_artifact(TOOL, coverage)?;
        let json_run = ctx.invoke(&coverage.command)?;
        let raw = ctx.output(TOOL, coverage, &json_run)?;
        let (table, sources) = parse_coverage(&raw, ctx.root())?;

        let mut subsections = vec![table.into()];
        if failures.count() > 0 {
            subsections.push(failures.into());
        }
        Ok(StageReport::new(subsections, run.success()).with_sources(sources))
    }
}
