//! Headline metric per section.
//!
//! Each section kind has one fixed reduction. Percentage and pass/fail
//! sections read the headline of their metric table; issue lists in those
//! sections are supporting detail and never change the headline.

use serde::Serialize;
use std::fmt;

use crate::models::{Headline, Report, Section, SectionKind, Subsection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    IssueCount,
    Percentage,
    PassFail,
}

impl SectionKind {
    /// Reduction used to summarize this section.
    pub fn reduction(self) -> Reduction {
        match self {
            Self::Style | Self::Types | Self::Security | Self::Failure => Reduction::IssueCount,
            Self::Tests | Self::DocCoverage => Reduction::Percentage,
            Self::Docs => Reduction::PassFail,
        }
    }

    fn metric_name(self) -> &'static str {
        match self.reduction() {
            Reduction::IssueCount => "Issues",
            Reduction::Percentage => "Coverage",
            Reduction::PassFail => "Status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SummaryValue {
    Count(usize),
    Percent(f64),
    Passed(bool),
    Unavailable,
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Percent(p) => write!(f, "{}", p.floor()),
            Self::Passed(true) => f.write_str("passing"),
            Self::Passed(false) => f.write_str("failing"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub section: SectionKind,
    pub name: &'static str,
    pub value: SummaryValue,
    pub unit: &'static str,
}

impl SummaryEntry {
    /// Value and unit as shown next to section names, e.g. `87%` or `3 issues`.
    pub fn display(&self) -> String {
        match (self.value, self.unit) {
            (SummaryValue::Percent(_), unit) => format!("{}{unit}", self.value),
            (_, "") => self.value.to_string(),
            (_, unit) => format!("{} {unit}", self.value),
        }
    }
}

/// Computes the summary of one section from its own subsections.
pub fn summarize(section: &Section) -> SummaryEntry {
    let kind = section.kind;
    let (value, unit) = match kind.reduction() {
        Reduction::IssueCount => count_issues(section.subsections()),
        Reduction::Percentage => match first_headline(section.subsections(), percent) {
            Some(p) => (SummaryValue::Percent(p), "%"),
            None => (SummaryValue::Unavailable, ""),
        },
        Reduction::PassFail => match first_headline(section.subsections(), passed) {
            Some(p) => (SummaryValue::Passed(p), ""),
            None => (SummaryValue::Unavailable, ""),
        },
    };
    SummaryEntry {
        section: kind,
        name: kind.metric_name(),
        value,
        unit,
    }
}

/// One entry per section, in report order.
pub fn summarize_report(report: &Report) -> Vec<SummaryEntry> {
    report.sections().map(summarize).collect()
}

fn count_issues(subsections: &[Subsection]) -> (SummaryValue, &'static str) {
    let mut total = 0usize;
    for sub in subsections {
        if let Subsection::IssueList(list) = sub {
            if list.is_unavailable() {
                return (SummaryValue::Unavailable, "");
            }
            total += list.count();
        }
    }
    let unit = if total == 1 { "issue" } else { "issues" };
    (SummaryValue::Count(total), unit)
}

fn first_headline<T>(subsections: &[Subsection], pick: fn(Headline) -> Option<T>) -> Option<T> {
    subsections.iter().find_map(|sub| match sub {
        Subsection::MetricTable(t) => t.headline.and_then(pick),
        Subsection::IssueList(_) => None,
    })
}

fn percent(h: Headline) -> Option<f64> {
    match h {
        Headline::Percent(p) => Some(p),
        Headline::Passed(_) => None,
    }
}

fn passed(h: Headline) -> Option<bool> {
    match h {
        Headline::Passed(p) => Some(p),
        Headline::Percent(_) => None,
    }
}
