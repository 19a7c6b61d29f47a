//! Stage sequencing and the continue-or-abort decision.
//!
//! Stages run strictly in declared order, one at a time. Findings never stop
//! the pipeline. A tool that cannot run is advisory except for the test
//! stage; malformed output and model violations always abort. An aborted run
//! still yields its partial report plus a "Build Error" section.

use serde::Serialize;

use crate::adapters::coverage::TestsAnalyzer;
use crate::adapters::doc_coverage::DocCoverageAnalyzer;
use crate::adapters::docs::DocsAnalyzer;
use crate::adapters::security::SecurityAnalyzer;
use crate::adapters::style::StyleAnalyzer;
use crate::adapters::types::TypesAnalyzer;
use crate::adapters::{Analyzer, StageContext};
use crate::errors::StageError;
use crate::models::{IssueList, Report, SectionKind};
use crate::utils::esc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Style,
    Types,
    Security,
    Tests,
    Docs,
    DocCoverage,
}

/// What a tool that could not run means for the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Advisory,
    Fatal,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Style,
        Stage::Types,
        Stage::Security,
        Stage::Tests,
        Stage::Docs,
        Stage::DocCoverage,
    ];

    pub fn section(self) -> SectionKind {
        match self {
            Self::Style => SectionKind::Style,
            Self::Types => SectionKind::Types,
            Self::Security => SectionKind::Security,
            Self::Tests => SectionKind::Tests,
            Self::Docs => SectionKind::Docs,
            Self::DocCoverage => SectionKind::DocCoverage,
        }
    }

    pub fn name(self) -> &'static str {
        self.section().name()
    }

    pub fn tool_failure(self) -> FailurePolicy {
        match self {
            Self::Tests => FailurePolicy::Fatal,
            _ => FailurePolicy::Advisory,
        }
    }

    fn analyzer(self) -> &'static dyn Analyzer {
        match self {
            Self::Style => &StyleAnalyzer,
            Self::Types => &TypesAnalyzer,
            Self::Security => &SecurityAnalyzer,
            Self::Tests => &TestsAnalyzer,
            Self::Docs => &DocsAnalyzer,
            Self::DocCoverage => &DocCoverageAnalyzer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub passed: bool,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum PipelineState {
    Completed,
    Aborted(String),
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: Report,
    pub records: Vec<StageRecord>,
    pub state: PipelineState,
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == PipelineState::Completed
    }

    pub fn fatal_message(&self) -> Option<&str> {
        match &self.state {
            PipelineState::Completed => None,
            PipelineState::Aborted(message) => Some(message),
        }
    }

    /// Process exit status: 0 when completed, 1 when aborted.
    pub fn exit_code(&self) -> i32 {
        if self.is_completed() {
            0
        } else {
            1
        }
    }

    /// Whether `stage` ran and met its criterion; `None` when it never ran.
    pub fn stage_passed(&self, stage: Stage) -> Option<bool> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.passed)
    }
}

pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Stage::ALL.to_vec(),
        }
    }

    /// Only the given stages, still in declared order.
    pub fn with_stages(stages: &[Stage]) -> Self {
        Self {
            stages: Stage::ALL
                .into_iter()
                .filter(|s| stages.contains(s))
                .collect(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn run(&self, ctx: &StageContext<'_>) -> PipelineOutcome {
        let mut report = Report::new();
        let mut records = Vec::new();

        for &stage in &self.stages {
            log::info!("running stage {}", stage.name());
            let analyzer = stage.analyzer();
            if analyzer.section() != stage.section() {
                let message = format!(
                    "{} stage is wired to the {} analyzer",
                    stage.name(),
                    analyzer.section()
                );
                records.push(StageRecord {
                    stage,
                    passed: false,
                    failure: Some(message.clone()),
                });
                return abort(report, records, message);
            }
            let result = analyzer.analyze(ctx);
            let (subsections, sources, record) = match result {
                Ok(out) => (
                    out.subsections,
                    out.sources,
                    StageRecord {
                        stage,
                        passed: out.passed,
                        failure: None,
                    },
                ),
                Err(StageError::Tool(e)) if stage.tool_failure() == FailurePolicy::Advisory => {
                    log::warn!("{} stage could not run: {e}", stage.name());
                    let notice = IssueList::unavailable(
                        None,
                        format!("{} analysis could not run", stage.name()),
                        esc(&e.to_string()),
                    );
                    (
                        vec![notice.into()],
                        Vec::new(),
                        StageRecord {
                            stage,
                            passed: false,
                            failure: Some(e.to_string()),
                        },
                    )
                }
                Err(e) => {
                    let message = format!("{} stage failed: {e}", stage.name());
                    records.push(StageRecord {
                        stage,
                        passed: false,
                        failure: Some(e.to_string()),
                    });
                    return abort(report, records, message);
                }
            };
            if let Err(e) = report.add_section_with_sources(stage.section(), subsections, sources) {
                let message = format!("{} stage failed: {e}", stage.name());
                records.push(StageRecord {
                    failure: Some(e.to_string()),
                    passed: false,
                    ..record
                });
                return abort(report, records, message);
            }
            records.push(record);
        }

        PipelineOutcome {
            report,
            records,
            state: PipelineState::Completed,
        }
    }
}

fn abort(mut report: Report, records: Vec<StageRecord>, message: String) -> PipelineOutcome {
    log::error!("build aborted: {message}");
    let mut list = IssueList::new();
    list.add(message.clone(), "The pipeline stopped; later stages did not run.");
    if let Err(e) = report.add_section(SectionKind::Failure, vec![list.into()]) {
        log::error!("could not record the failure section: {e}");
    }
    PipelineOutcome {
        report,
        records,
        state: PipelineState::Aborted(message),
    }
}
