//! The canonical report: sections in pipeline order, append-only.

use serde::Serialize;
use std::fmt;

use super::source::SourceView;
use super::subsection::Subsection;
use crate::errors::ModelError;

/// Identity of a top-level report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Style,
    Types,
    Security,
    Tests,
    Docs,
    DocCoverage,
    Failure,
}

impl SectionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Style => "Style",
            Self::Types => "Types",
            Self::Security => "Security",
            Self::Tests => "Tests",
            Self::Docs => "Documentation",
            Self::DocCoverage => "Doc Coverage",
            Self::Failure => "Build Error",
        }
    }

    /// Anchor fragment: the display name with whitespace stripped.
    pub fn anchor(self) -> String {
        crate::utils::anchor(self.name())
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    subsections: Vec<Subsection>,
    /// Annotated files the subsections link to; one per path.
    sources: Vec<SourceView>,
}

impl Section {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn subsections(&self) -> &[Subsection] {
        &self.subsections
    }

    pub fn sources(&self) -> &[SourceView] {
        &self.sources
    }
}

/// Sections in insertion order. Once added, a section cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    sections: Vec<Section>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(
        &mut self,
        kind: SectionKind,
        subsections: Vec<Subsection>,
    ) -> Result<(), ModelError> {
        self.add_section_with_sources(kind, subsections, Vec::new())
    }

    /// Adds a section together with the source listings it links to.
    pub fn add_section_with_sources(
        &mut self,
        kind: SectionKind,
        subsections: Vec<Subsection>,
        sources: Vec<SourceView>,
    ) -> Result<(), ModelError> {
        if self.contains(kind) {
            return Err(ModelError::DuplicateSection(kind));
        }
        for (i, view) in sources.iter().enumerate() {
            if sources[..i].iter().any(|v| v.path == view.path) {
                return Err(ModelError::DuplicateSource {
                    section: kind,
                    path: view.path.clone(),
                });
            }
        }
        log::debug!(
            "report: adding section {} with {} subsection(s) and {} source(s)",
            kind,
            subsections.len(),
            sources.len()
        );
        self.sections.push(Section {
            kind,
            subsections,
            sources,
        });
        Ok(())
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.sections.iter().any(|s| s.kind == kind)
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn sections(&self) -> impl ExactSizeIterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueList;

    #[test]
    fn test_sections_keep_insertion_order() {
        let mut report = Report::new();
        report
            .add_section(SectionKind::Tests, vec![IssueList::new().into()])
            .unwrap();
        report
            .add_section(SectionKind::Style, vec![IssueList::new().into()])
            .unwrap();
        let names: Vec<_> = report.sections().map(Section::name).collect();
        assert_eq!(names, vec!["Tests", "Style"]);
    }

    #[test]
    fn test_duplicate_section_is_rejected() {
        let mut report = Report::new();
        report.add_section(SectionKind::Types, Vec::new()).unwrap();
        let err = report.add_section(SectionKind::Types, Vec::new()).unwrap_err();
        assert_eq!(err, ModelError::DuplicateSection(SectionKind::Types));
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_source_listed_twice_is_rejected() {
        let mut report = Report::new();
        let sources = vec![
            SourceView::new("src/a.py", "x = 1\n"),
            SourceView::new("src/a.py", "x = 1\n"),
        ];
        let err = report
            .add_section_with_sources(SectionKind::Tests, Vec::new(), sources)
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateSource {
                section: SectionKind::Tests,
                path: "src/a.py".into()
            }
        );
        assert!(report.is_empty());
        report
            .add_section_with_sources(
                SectionKind::Tests,
                Vec::new(),
                vec![SourceView::new("src/a.py", "")],
            )
            .unwrap();
        assert_eq!(report.section(SectionKind::Tests).unwrap().sources().len(), 1);
    }

    #[test]
    fn test_anchor_strips_whitespace() {
        assert_eq!(SectionKind::DocCoverage.anchor(), "DocCoverage");
        assert_eq!(SectionKind::Failure.anchor(), "BuildError");
    }
}
