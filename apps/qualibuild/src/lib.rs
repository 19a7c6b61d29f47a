//! qualibuild core library.
//!
//! Runs a fixed pipeline of external code-quality analyzers over a source
//! tree and folds their output into one report model, from which the HTML
//! report, the badge set and the next calendar version are derived.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `tools`: Process execution behind the `ToolRunner` seam.
//! - `adapters`: One analyzer adapter per pipeline stage.
//! - `models`: The canonical report model.
//! - `pipeline`: Stage order and the continue-or-abort policy.
//! - `summary`: One headline metric per section.
//! - `render`: Self-contained HTML report.
//! - `version`, `badge`: Calendar version and status badges.
//! - `commands`: The build/report/doc flows tying the above together.
//! - `output`: Human/JSON printers.
//! - `clean`: Artifact removal.
//! - `errors`, `utils`: Supporting types and helpers.
pub mod adapters;
pub mod badge;
pub mod clean;
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod summary;
pub mod tools;
pub mod utils;
pub mod version;
