//! Issue lists and metric tables, the two shapes a section can hold.

use serde::Serialize;

use super::text::{Cell, RichText};
use crate::errors::ModelError;

/// One finding reported by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub summary: RichText,
    pub details: RichText,
}

impl Issue {
    pub fn new(summary: impl Into<RichText>, details: impl Into<RichText>) -> Self {
        Self {
            summary: summary.into(),
            details: details.into(),
        }
    }
}

/// Whether a list reflects a finished analysis.
///
/// `Unavailable` lists stand in for output that could not be produced and
/// must never be read as a clean result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    #[default]
    Complete,
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueList {
    pub heading: Option<String>,
    pub status: ListStatus,
    issues: Vec<Issue>,
}

impl IssueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titled(heading: impl Into<String>) -> Self {
        Self {
            heading: Some(heading.into()),
            ..Self::default()
        }
    }

    /// A list holding a single notice that the analysis could not be done.
    pub fn unavailable(
        heading: Option<String>,
        summary: impl Into<RichText>,
        details: impl Into<RichText>,
    ) -> Self {
        Self {
            heading,
            status: ListStatus::Unavailable,
            issues: vec![Issue::new(summary, details)],
        }
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn add(&mut self, summary: impl Into<RichText>, details: impl Into<RichText>) {
        self.push(Issue::new(summary, details));
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == ListStatus::Unavailable
    }
}

/// Aggregate value a table reports for its whole section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Headline {
    Percent(f64),
    Passed(bool),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricTable {
    pub heading: Option<String>,
    pub headline: Option<Headline>,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MetricTable {
    pub fn new<I, S>(heading: Option<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            heading,
            headline: None,
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_headline(mut self, headline: Headline) -> Self {
        self.headline = Some(headline);
        self
    }

    /// Appends a row; the number of cells must match the number of columns.
    pub fn add_row(&mut self, cells: Vec<Cell>) -> Result<(), ModelError> {
        if cells.len() != self.columns.len() {
            return Err(ModelError::ColumnMismatch {
                table: self.heading.clone().unwrap_or_default(),
                expected: self.columns.len(),
                given: cells.len(),
            });
        }
        self.rows.push(cells);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Looks up a cell by row index and column heading.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subsection {
    IssueList(IssueList),
    MetricTable(MetricTable),
}

impl Subsection {
    pub fn heading(&self) -> Option<&str> {
        match self {
            Self::IssueList(l) => l.heading.as_deref(),
            Self::MetricTable(t) => t.heading.as_deref(),
        }
    }
}

impl From<IssueList> for Subsection {
    fn from(list: IssueList) -> Self {
        Self::IssueList(list)
    }
}

impl From<MetricTable> for Subsection {
    fn from(table: MetricTable) -> Self {
        Self::MetricTable(table)
    }
}
