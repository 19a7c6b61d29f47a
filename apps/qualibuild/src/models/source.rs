//! Annotated source listings.
//!
//! A listing shows one file of the analyzed tree with some of its lines
//! marked. Table rows and issue details of the same section link to a
//! listing, or to a single line of it, by anchor.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::report::SectionKind;
use crate::errors::ModelError;
use crate::utils::anchor;

/// Lines shown before and after each marked line of a narrowed listing.
pub const CONTEXT_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMark {
    Run,
    Missing,
    Excluded,
    Finding,
}

impl LineMark {
    /// Legend order.
    pub const ALL: [LineMark; 4] = [
        LineMark::Run,
        LineMark::Missing,
        LineMark::Excluded,
        LineMark::Finding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Run => "Run",
            Self::Missing => "Missing",
            Self::Excluded => "Excluded",
            Self::Finding => "Finding",
        }
    }

    /// CSS class of a marked line.
    pub fn class(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Missing => "missing",
            Self::Excluded => "excluded",
            Self::Finding => "finding",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceView {
    /// Path as shown in the report, relative to the repository root.
    pub path: String,
    lines: Vec<String>,
    marks: BTreeMap<usize, LineMark>,
    /// When set, only marked lines and this many neighbours are shown.
    context: Option<usize>,
}

impl SourceView {
    pub fn new(path: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
            marks: BTreeMap::new(),
            context: None,
        }
    }

    /// Reads `path`, relative to `root` unless absolute.
    pub fn read(root: &Path, path: &str) -> io::Result<Self> {
        let text = fs::read_to_string(root.join(path))?;
        Ok(Self::new(path, &text))
    }

    pub fn with_context(mut self, lines: usize) -> Self {
        self.context = Some(lines);
        self
    }

    /// Marks 1-based line numbers; a later mark replaces an earlier one.
    pub fn mark<I>(&mut self, lines: I, mark: LineMark) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = u64>,
    {
        for line in lines {
            let n = usize::try_from(line).unwrap_or(usize::MAX);
            if n == 0 || n > self.lines.len() {
                return Err(ModelError::LineOutOfRange {
                    path: self.path.clone(),
                    line,
                    lines: self.lines.len(),
                });
            }
            self.marks.insert(n, mark);
        }
        Ok(())
    }

    pub fn line(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn mark_at(&self, n: usize) -> Option<LineMark> {
        self.marks.get(&n).copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Marks present in the listing, in legend order.
    pub fn legend(&self) -> Vec<LineMark> {
        LineMark::ALL
            .into_iter()
            .filter(|m| self.marks.values().any(|v| v == m))
            .collect()
    }

    /// Visible lines as inclusive 1-based ranges, merged where they touch.
    pub fn blocks(&self) -> Vec<(usize, usize)> {
        if self.lines.is_empty() {
            return Vec::new();
        }
        let Some(context) = self.context else {
            return vec![(1, self.lines.len())];
        };
        let mut blocks: Vec<(usize, usize)> = Vec::new();
        for &n in self.marks.keys() {
            let first = n.saturating_sub(context).max(1);
            let last = n.saturating_add(context).min(self.lines.len());
            match blocks.last_mut() {
                Some(prev) if first <= prev.1 + 1 => prev.1 = prev.1.max(last),
                _ => blocks.push((first, last)),
            }
        }
        blocks
    }

    /// Element id of the listing of `path` within `section`.
    pub fn anchor(section: SectionKind, path: &str) -> String {
        format!("{}-src-{}", section.anchor(), anchor(path))
    }

    /// Element id of one line of that listing.
    pub fn line_anchor(section: SectionKind, path: &str, line: u64) -> String {
        format!("{}-L{}", Self::anchor(section, path), line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_marks_replace_and_feed_the_legend() {
        let mut view = SourceView::new("src/a.py", &numbered(5));
        view.mark([1, 2, 3], LineMark::Run).unwrap();
        view.mark([3], LineMark::Missing).unwrap();
        assert_eq!(view.mark_at(3), Some(LineMark::Missing));
        assert_eq!(view.mark_at(4), None);
        assert_eq!(view.legend(), vec![LineMark::Run, LineMark::Missing]);
        assert_eq!(view.line(1), Some("line 1"));
        assert_eq!(view.line(0), None);
    }

    #[test]
    fn test_line_outside_the_file_is_rejected() {
        let mut view = SourceView::new("src/a.py", &numbered(2));
        let err = view.mark([3], LineMark::Finding).unwrap_err();
        assert_eq!(
            err,
            ModelError::LineOutOfRange {
                path: "src/a.py".into(),
                line: 3,
                lines: 2
            }
        );
        assert!(view.mark([0], LineMark::Finding).is_err());
    }

    #[test]
    fn test_blocks_full_file_or_merged_windows() {
        let mut view = SourceView::new("src/a.py", &numbered(40));
        view.mark([5, 12, 35], LineMark::Finding).unwrap();
        assert_eq!(view.blocks(), vec![(1, 40)]);
        // windows 2-8 and 9-15 touch and merge
        let narrowed = view.with_context(3);
        assert_eq!(narrowed.blocks(), vec![(2, 15), (32, 38)]);
        let unmarked = SourceView::new("src/b.py", &numbered(3)).with_context(3);
        assert!(unmarked.blocks().is_empty());
    }

    #[test]
    fn test_anchors_strip_whitespace() {
        assert_eq!(
            SourceView::line_anchor(SectionKind::DocCoverage, "src/my file.py", 7),
            "DocCoverage-src-src/myfile.py-L7"
        );
    }
}
