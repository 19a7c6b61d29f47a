//! Canonical report model shared by adapters, summaries and renderers.

pub mod report;
pub mod source;
pub mod subsection;
pub mod text;

pub use report::{Report, Section, SectionKind};
pub use source::{LineMark, SourceView, CONTEXT_LINES};
pub use subsection::{Headline, Issue, IssueList, ListStatus, MetricTable, Subsection};
pub use text::{Cell, RichText};
