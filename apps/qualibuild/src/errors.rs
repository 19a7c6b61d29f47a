//! Error types shared across the pipeline.
//!
//! Advisory findings are never errors; they live in the report. What is here
//! is the set of conditions that stop a stage (`ToolError`), stop the build
//! (`ModelError`, `AdapterError`) or stop the command (`Error`).

use std::path::PathBuf;
use thiserror::Error;

use crate::models::SectionKind;

/// Invariant violations of the canonical report model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("section '{0}' was registered twice")]
    DuplicateSection(SectionKind),

    #[error("row has {given} cells but table '{table}' has {expected} columns")]
    ColumnMismatch {
        table: String,
        expected: usize,
        given: usize,
    },

    #[error("line {line} is outside {path}, which has {lines} line(s)")]
    LineOutOfRange { path: String, line: u64, lines: usize },

    #[error("section '{section}' lists source {path} twice")]
    DuplicateSource { section: SectionKind, path: String },
}

/// Raw analyzer output that could not be mapped onto the model.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{tool} output is not valid JSON: {source}")]
    Json {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tool} output is malformed: {message}")]
    Malformed { tool: String, message: String },

    #[error("could not read {tool} output at {path}: {source}")]
    Artifact {
        tool: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AdapterError {
    pub fn malformed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// An external tool that could not be executed to completion.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("'{program}' was not found on PATH")]
    NotFound { program: String },

    #[error("'{program}' could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' was terminated before it finished")]
    Crashed { program: String },

    #[error("empty command line")]
    EmptyCommand,
}

/// Why a single pipeline stage did not produce a report.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl From<ModelError> for StageError {
    fn from(err: ModelError) -> Self {
        Self::Adapter(AdapterError::Model(err))
    }
}

/// Top-level error for commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}: {}", path.display())]
    FileSystem {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error in {}: {message}", path.display())]
    Configuration { path: PathBuf, message: String },

    #[error("no version assignment found in {}", path.display())]
    VersionMarker { path: PathBuf },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// File system error carrying the offending path.
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
