//! Output rendering for build, report, and doc commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form carries the
//! outcome, the version, one entry per section summary, and the stage records.

use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::Path;

use crate::pipeline::{PipelineOutcome, PipelineState};
use crate::summary::{SummaryEntry, SummaryValue};

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// What a finished command produced, for printing.
pub struct RunSummary<'a> {
    pub outcome: &'a PipelineOutcome,
    pub summaries: &'a [SummaryEntry],
    pub version: Option<&'a str>,
    pub report_path: Option<&'a Path>,
}

/// Whether an entry reads as clean.
fn is_clean(entry: &SummaryEntry) -> bool {
    match entry.value {
        SummaryValue::Count(n) => n == 0,
        SummaryValue::Percent(p) => p >= 90.0,
        SummaryValue::Passed(p) => p,
        SummaryValue::Unavailable => false,
    }
}

/// Print the run summary in the requested format.
pub fn print_run(run: &RunSummary<'_>, output: &str) {
    match output {
        "json" => match serde_json::to_string_pretty(&compose_run_json(run)) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} {}", crate::utils::error_prefix(), e),
        },
        _ => {
            let color = use_colors(output);
            for entry in run.summaries {
                let icon = match (is_clean(entry), entry.value) {
                    (_, SummaryValue::Unavailable) => "?".yellow().to_string(),
                    (true, _) => "✔".green().to_string(),
                    (false, _) => "✖".red().to_string(),
                };
                let name = if color {
                    entry.section.name().bold().to_string()
                } else {
                    entry.section.name().to_string()
                };
                if color {
                    println!("{} {} {}", icon, name, entry.display());
                } else {
                    println!("{} {}", name, entry.display());
                }
            }
            let outcome = match &run.outcome.state {
                PipelineState::Completed => "— Build completed —".to_string(),
                PipelineState::Aborted(message) => format!("— Build aborted — {}", message),
            };
            if color {
                match run.outcome.state {
                    PipelineState::Completed => println!("{}", outcome.green().bold()),
                    PipelineState::Aborted(_) => println!("{}", outcome.red().bold()),
                }
            } else {
                println!("{}", outcome);
            }
            if let Some(version) = run.version {
                println!("version: {}", version);
            }
            if let Some(path) = run.report_path {
                println!("report: {}", path.to_string_lossy());
            }
        }
    }
}

/// Compose the JSON document for a finished run.
pub fn compose_run_json(run: &RunSummary<'_>) -> JsonVal {
    let (outcome, message) = match &run.outcome.state {
        PipelineState::Completed => ("completed", None),
        PipelineState::Aborted(m) => ("aborted", Some(m.clone())),
    };
    let sections: Vec<JsonVal> = run
        .summaries
        .iter()
        .map(|e| {
            let value = match e.value {
                SummaryValue::Count(n) => json!(n),
                SummaryValue::Percent(p) => json!(p.floor() as i64),
                SummaryValue::Passed(p) => json!(p),
                SummaryValue::Unavailable => JsonVal::Null,
            };
            json!({
                "name": e.section.name(),
                "metric": e.name,
                "value": value,
                "unit": e.unit,
                "display": e.display(),
            })
        })
        .collect();
    let stages: Vec<JsonVal> = run
        .outcome
        .records
        .iter()
        .map(|r| {
            json!({
                "stage": r.stage,
                "passed": r.passed,
                "failure": r.failure,
            })
        })
        .collect();
    json!({
        "outcome": outcome,
        "message": message,
        "version": run.version,
        "report": run.report_path.map(|p| p.to_string_lossy().to_string()),
        "sections": sections,
        "stages": stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueList, MetricTable, Headline, Report, SectionKind};
    use crate::pipeline::{Stage, StageRecord};
    use crate::summary::summarize_report;

    fn outcome(state: PipelineState) -> PipelineOutcome {
        let mut report = Report::new();
        let mut style = IssueList::new();
        style.add("a", "b");
        report
            .add_section(SectionKind::Style, vec![style.into()])
            .unwrap();
        let table = MetricTable::new(None, ["Module"]).with_headline(Headline::Percent(87.0));
        report
            .add_section(SectionKind::Tests, vec![table.into()])
            .unwrap();
        PipelineOutcome {
            report,
            records: vec![
                StageRecord {
                    stage: Stage::Style,
                    passed: false,
                    failure: None,
                },
                StageRecord {
                    stage: Stage::Tests,
                    passed: true,
                    failure: None,
                },
            ],
            state,
        }
    }

    #[test]
    fn test_compose_run_json_completed() {
        let out = outcome(PipelineState::Completed);
        let summaries = summarize_report(&out.report);
        let run = RunSummary {
            outcome: &out,
            summaries: &summaries,
            version: Some("2024.3.6"),
            report_path: None,
        };
        let v = compose_run_json(&run);
        assert_eq!(v["outcome"], "completed");
        assert_eq!(v["version"], "2024.3.6");
        assert_eq!(v["sections"][0]["name"], "Style");
        assert_eq!(v["sections"][0]["value"], 1);
        assert_eq!(v["sections"][0]["unit"], "issue");
        assert_eq!(v["sections"][1]["value"], 87);
        assert_eq!(v["sections"][1]["display"], "87%");
        assert_eq!(v["stages"][1]["stage"], "tests");
        assert!(v["message"].is_null());
    }

    #[test]
    fn test_compose_run_json_aborted() {
        let out = outcome(PipelineState::Aborted("Tests stage failed".into()));
        let run = RunSummary {
            outcome: &out,
            summaries: &[],
            version: None,
            report_path: Some(Path::new("/r/report/report.html")),
        };
        let v = compose_run_json(&run);
        assert_eq!(v["outcome"], "aborted");
        assert_eq!(v["message"], "Tests stage failed");
        assert!(v["version"].is_null());
        assert_eq!(v["report"], "/r/report/report.html");
    }
}
