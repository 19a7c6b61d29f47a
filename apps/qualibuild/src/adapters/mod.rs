//! Analyzer adapters.
//!
//! Each adapter runs its external tool(s) through a `ToolRunner` and maps the
//! raw output onto the subsections of exactly one report section. Parsing is
//! done by plain functions over strings so it can be tested without
//! processes.
//!
//! Adapters:
//! - `style`: flake8 JSON, after best-effort isort/black runs.
//! - `types`: mypy text output.
//! - `security`: bandit JSON plus one safety report per dependency target.
//! - `coverage`: unittest under coverage, then `coverage json`.
//! - `docs`: sphinx-build status and warnings.
//! - `doc_coverage`: documentation coverage artifact from the docs build.

pub mod coverage;
pub mod doc_coverage;
pub mod docs;
pub mod security;
pub mod style;
pub mod types;

use std::fs;
use std::io;
use std::path::Path;

use crate::config::{Effective, ToolSpec};
use crate::errors::{AdapterError, StageError, ToolError};
use crate::models::{LineMark, SectionKind, SourceView, Subsection};
use crate::tools::{Invocation, ToolRun, ToolRunner};
use crate::utils::{esc, esc_attr};

/// Everything an adapter needs for one build.
pub struct StageContext<'a> {
    pub settings: &'a Effective,
    pub runner: &'a dyn ToolRunner,
}

impl<'a> StageContext<'a> {
    pub fn new(settings: &'a Effective, runner: &'a dyn ToolRunner) -> Self {
        Self { settings, runner }
    }

    /// Runs one command line from the repository root.
    pub fn invoke(&self, argv: &[String]) -> Result<ToolRun, ToolError> {
        let invocation = Invocation::new(argv.to_vec(), &self.settings.repo_root);
        self.runner.run(&invocation)
    }

    /// Runs the tool's `pre` commands; their failures only produce warnings.
    pub fn run_pre(&self, tool: &ToolSpec) {
        for argv in &tool.pre {
            match self.invoke(argv) {
                Ok(run) if !run.success() => {
                    log::warn!("{} exited with {}", run.program, run.code)
                }
                Ok(_) => {}
                Err(e) => log::warn!("skipping pre-command: {e}"),
            }
        }
    }

    /// Deletes the tool's artifact so only this run's output can be read.
    pub fn clear_artifact(&self, tool_name: &str, tool: &ToolSpec) -> Result<(), AdapterError> {
        match &tool.artifact {
            Some(path) => remove_artifact(tool_name, path),
            None => Ok(()),
        }
    }

    /// Tool output: the artifact when one is configured, stdout otherwise.
    pub fn output(&self, tool_name: &str, tool: &ToolSpec, run: &ToolRun) -> Result<String, AdapterError> {
        match &tool.artifact {
            Some(path) => read_artifact(tool_name, path),
            None => Ok(run.stdout.clone()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.settings.repo_root
    }
}

pub fn read_artifact(tool_name: &str, path: &Path) -> Result<String, AdapterError> {
    fs::read_to_string(path).map_err(|source| AdapterError::Artifact {
        tool: tool_name.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

pub fn remove_artifact(tool_name: &str, path: &Path) -> Result<(), AdapterError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale {} output {}", tool_name, path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(AdapterError::Artifact {
            tool: tool_name.to_string(),
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Listing of `path` with `marks` applied. `None` when the file cannot be
/// read or no longer has the marked lines; the report then goes without it.
pub(crate) fn annotate(
    root: &Path,
    path: &str,
    marks: &[(&[u64], LineMark)],
    context: Option<usize>,
) -> Option<SourceView> {
    let mut view = match SourceView::read(root, path) {
        Ok(view) => view,
        Err(e) => {
            log::debug!("no source listing for {path}: {e}");
            return None;
        }
    };
    for (lines, mark) in marks {
        if let Err(e) = view.mark(lines.iter().copied(), *mark) {
            log::warn!("dropping source listing: {e}");
            return None;
        }
    }
    Some(match context {
        Some(lines) => view.with_context(lines),
        None => view,
    })
}

/// Escaped link to a listing, or to one of its lines.
pub(crate) fn source_link(section: SectionKind, path: &str, line: Option<u64>, text: &str) -> String {
    let target = match line {
        Some(line) => SourceView::line_anchor(section, path, line),
        None => SourceView::anchor(section, path),
    };
    format!("<a href=\"#{}\">{}</a>", esc_attr(&target), esc(text))
}

/// Decodes a JSON document, treating blank output as an empty object.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    raw: &str,
) -> Result<T, AdapterError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|source| AdapterError::Json {
        tool: tool_name.to_string(),
        source,
    })
}

/// What an adapter produced for its section.
#[derive(Debug, Default)]
pub struct StageReport {
    pub subsections: Vec<Subsection>,
    pub sources: Vec<SourceView>,
    /// Whether the stage's own criterion held (no findings, tests green, docs built).
    pub passed: bool,
}

impl StageReport {
    pub fn new(subsections: Vec<Subsection>, passed: bool) -> Self {
        Self {
            subsections,
            sources: Vec::new(),
            passed,
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceView>) -> Self {
        self.sources = sources;
        self
    }
}

pub trait Analyzer {
    fn section(&self) -> SectionKind;

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError>;
}
