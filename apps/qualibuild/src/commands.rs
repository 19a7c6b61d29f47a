//! The `build`, `report`, and `doc` flows.
//!
//! Each flow starts from an empty temporary directory, runs its pipeline and
//! renders the report (also when aborted). Only `build` regenerates badges,
//! persists the next version and packages the project.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fs;
use std::path::PathBuf;

use crate::adapters::StageContext;
use crate::badge::{BadgeSet, BuildStatus};
use crate::clean::clean_tmp;
use crate::config::Effective;
use crate::errors::{Error, Result};
use crate::pipeline::{Pipeline, PipelineOutcome, Stage};
use crate::render::{render, write_report, RenderMeta};
use crate::summary::{summarize_report, SummaryEntry};
use crate::tools::ToolRunner;
use crate::version::{CalVersion, VersionFile};

const UNVERSIONED: &str = "unversioned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    Report,
    Doc,
}

impl Mode {
    pub fn pipeline(self) -> Pipeline {
        match self {
            Self::Build | Self::Report => Pipeline::new(),
            Self::Doc => Pipeline::with_stages(&[Stage::Docs, Stage::DocCoverage]),
        }
    }

    fn writes_badges(self) -> bool {
        self == Self::Build
    }
}

/// Inputs that vary per invocation but not per stage.
pub struct RunOptions {
    pub today: NaiveDate,
    pub now: DateTime<FixedOffset>,
    pub keep_tmp: bool,
}

#[derive(Debug)]
pub struct RunResult {
    pub outcome: PipelineOutcome,
    pub summaries: Vec<SummaryEntry>,
    /// Version shown in the report: the new one for completed builds, the
    /// stored one otherwise.
    pub version: String,
    pub report_path: PathBuf,
    /// `Some(false)` when the packaging command failed or could not run.
    pub packaged: Option<bool>,
}

impl RunResult {
    /// 0 when completed (and packaged, for builds), 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match (self.outcome.exit_code(), self.packaged) {
            (0, Some(false)) => 1,
            (code, _) => code,
        }
    }
}

fn stored_version(settings: &Effective) -> Result<Option<String>> {
    if !settings.version_file.exists() {
        log::warn!(
            "metadata file {} not found; version is not tracked",
            settings.version_file.display()
        );
        return Ok(None);
    }
    VersionFile::new(&settings.version_file).read()
}

fn package(settings: &Effective, ctx: &StageContext<'_>) -> bool {
    let tool = &settings.tools.package;
    if !tool.is_configured() {
        return true;
    }
    match ctx.invoke(&tool.command) {
        Ok(run) if run.success() => true,
        Ok(run) => {
            log::error!("packaging exited with {}: {}", run.code, crate::utils::tail(&run.stderr, 5));
            false
        }
        Err(e) => {
            log::error!("packaging could not run: {e}");
            false
        }
    }
}

pub fn execute(
    mode: Mode,
    settings: &Effective,
    runner: &dyn ToolRunner,
    opts: &RunOptions,
) -> Result<RunResult> {
    // leftovers of a kept or interrupted run must not be read as fresh output
    clean_tmp(&settings.tmp_dir)?;
    fs::create_dir_all(&settings.tmp_dir)
        .map_err(|e| Error::file_system("failed to create temporary directory", &settings.tmp_dir, e))?;
    let ctx = StageContext::new(settings, runner);

    let previous = stored_version(settings)?;
    let planned = match mode {
        Mode::Build => Some(CalVersion::next(previous.as_deref(), opts.today)),
        Mode::Report | Mode::Doc => None,
    };

    let outcome = mode.pipeline().run(&ctx);
    let summaries = summarize_report(&outcome.report);

    let version = match (&planned, &previous) {
        (Some(next), _) if outcome.is_completed() => next.to_string(),
        (_, Some(prev)) => prev.clone(),
        (_, None) => UNVERSIONED.to_string(),
    };

    // version and package only after a completed pipeline
    let mut packaged = None;
    if let (Some(next), true) = (&planned, outcome.is_completed()) {
        if previous.is_some() {
            VersionFile::new(&settings.version_file).write(next)?;
        } else {
            log::warn!(
                "no version assignment in {}; version {next} is not persisted",
                settings.version_file.display()
            );
        }
        packaged = Some(package(settings, &ctx));
    }

    let meta = RenderMeta {
        app_name: settings.name.clone(),
        version: version.clone(),
        timestamp: opts.now,
        fatal: outcome.fatal_message().map(str::to_string),
    };
    let html = render(&outcome.report, &summaries, &meta);
    let report_path = write_report(&settings.report_dir, &html)?;
    log::info!("report written to {}", report_path.display());

    if mode.writes_badges() {
        let status = BuildStatus {
            tests_passed: outcome.stage_passed(Stage::Tests),
            build_passed: outcome.is_completed() && packaged.unwrap_or(true),
        };
        BadgeSet::from_summaries(&summaries, status).write(&settings.badge_dir)?;
    }

    if !opts.keep_tmp {
        clean_tmp(&settings.tmp_dir)?;
    }

    Ok(RunResult {
        outcome,
        summaries,
        version,
        report_path,
        packaged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing;
    use crate::models::SectionKind;
    use crate::summary::SummaryValue;
    use crate::tools::fake::{FakeRunner, Script};
    use chrono::TimeZone;

    fn opts() -> RunOptions {
        RunOptions {
            today: NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(),
            now: FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 28, 9, 30, 0)
                .unwrap(),
            keep_tmp: false,
        }
    }

    fn clean_runner(settings: &Effective) -> FakeRunner {
        let tools = &settings.tools;
        FakeRunner::new()
            .script("flake8", Script::writing(0, tools.style.artifact.as_deref().unwrap(), "{}"))
            .script("bandit", Script::writing(0, tools.security.artifact.as_deref().unwrap(), "{}"))
            .script("safety", Script::writing_after(0, "--save-json", "{}"))
            .script(
                "coverage",
                Script::writing(
                    0,
                    tools.coverage.artifact.as_deref().unwrap(),
                    "{\"totals\": {\"percent_covered\": 99.5}}",
                ),
            )
            .script(
                "sphinx-build",
                Script::writing(0, tools.doc_coverage.artifact.as_deref().unwrap(), "{}"),
            )
    }

    fn project() -> (tempfile::TempDir, Effective) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("setup.cfg"), "[metadata]\nname = demo\nversion = 2024.3.5\n").unwrap();
        let settings = testing::settings(dir.path());
        (dir, settings)
    }

    #[test]
    fn test_build_bumps_version_and_writes_outputs() {
        let (_dir, settings) = project();
        let runner = clean_runner(&settings);
        let result = execute(Mode::Build, &settings, &runner, &opts()).unwrap();
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.version, "2024.3.6");
        assert_eq!(result.packaged, Some(true));
        let cfg = fs::read_to_string(&settings.version_file).unwrap();
        assert!(cfg.contains("version = 2024.3.6"));
        let html = fs::read_to_string(&result.report_path).unwrap();
        assert!(html.contains("2024.3.6"));
        assert!(settings.badge_dir.join("badges.json").exists());
        assert!(!settings.tmp_dir.exists());
        assert!(runner.calls.borrow().iter().any(|c| c.starts_with("python -m build")));
    }

    #[test]
    fn test_aborted_build_keeps_version_and_fails_badge() {
        let (_dir, settings) = project();
        let runner = clean_runner(&settings).script("coverage", Script::Missing);
        let result = execute(Mode::Build, &settings, &runner, &opts()).unwrap();
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.packaged, None);
        // the planned 2024.3.6 was never persisted
        assert_eq!(result.version, "2024.3.5");
        let cfg = fs::read_to_string(&settings.version_file).unwrap();
        assert!(cfg.contains("version = 2024.3.5"));
        let html = fs::read_to_string(&result.report_path).unwrap();
        assert!(html.contains("Version 2024.3.5"));
        assert!(!html.contains("2024.3.6"));
        assert!(result.report_path.exists());
        let manifest = fs::read_to_string(settings.badge_dir.join("badges.json")).unwrap();
        assert!(manifest.contains("failing"));
        assert!(!runner.calls.borrow().iter().any(|c| c.starts_with("python")));
    }

    #[test]
    fn test_failed_packaging_is_non_zero() {
        let (_dir, settings) = project();
        let runner = clean_runner(&settings).script("python", Script::stderr(1, "error: invalid setup"));
        let result = execute(Mode::Build, &settings, &runner, &opts()).unwrap();
        assert!(result.outcome.is_completed());
        assert_eq!(result.packaged, Some(false));
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn test_report_mode_leaves_version_alone() {
        let (_dir, settings) = project();
        let runner = clean_runner(&settings);
        let mut o = opts();
        o.keep_tmp = true;
        let result = execute(Mode::Report, &settings, &runner, &o).unwrap();
        assert_eq!(result.version, "2024.3.5");
        assert_eq!(result.packaged, None);
        assert!(settings.tmp_dir.exists());
        let cfg = fs::read_to_string(&settings.version_file).unwrap();
        assert!(cfg.contains("version = 2024.3.5"));
    }

    #[test]
    fn test_report_mode_writes_no_badges() {
        let (_dir, settings) = project();
        let runner = clean_runner(&settings);
        let result = execute(Mode::Report, &settings, &runner, &opts()).unwrap();
        assert_eq!(result.exit_code(), 0);
        assert!(result.report_path.exists());
        assert!(!settings.badge_dir.exists());
    }

    #[test]
    fn test_leftover_tmp_output_is_not_reported() {
        let (_dir, settings) = project();
        // a clean dependency report from an earlier `--keep` run
        let stale = settings.tools.dependencies.artifact.clone().unwrap();
        fs::create_dir_all(&settings.tmp_dir).unwrap();
        fs::write(&stale, "{\"vulnerabilities\": []}").unwrap();
        fs::write(settings.tmp_dir.join("old.txt"), "x").unwrap();
        let runner = clean_runner(&settings).script("safety", Script::stderr(64, "connection error"));
        let mut o = opts();
        o.keep_tmp = true;
        let result = execute(Mode::Report, &settings, &runner, &o).unwrap();
        let security = result
            .summaries
            .iter()
            .find(|e| e.section == SectionKind::Security)
            .unwrap();
        assert_eq!(security.value, SummaryValue::Unavailable);
        assert!(!settings.tmp_dir.join("old.txt").exists());
    }

    #[test]
    fn test_doc_mode_runs_doc_stages_only() {
        let (_dir, settings) = project();
        let runner = clean_runner(&settings);
        let result = execute(Mode::Doc, &settings, &runner, &opts()).unwrap();
        assert_eq!(result.outcome.report.len(), 2);
        assert!(!runner.calls.borrow().iter().any(|c| c.starts_with("flake8")));
        assert!(!settings.badge_dir.exists());
    }
}
