//! Style findings from flake8's JSON formatter.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{decode, Analyzer, StageContext, StageReport};
use crate::errors::{AdapterError, StageError};
use crate::models::{IssueList, RichText, SectionKind};
use crate::utils::{esc, rel_path};

const TOOL: &str = "flake8";

#[derive(Debug, Deserialize)]
struct Violation {
    code: String,
    line_number: u64,
    #[serde(default)]
    column_number: u64,
    text: String,
}

/// One list per offending file, ordered by path. A clean run yields a single
/// empty list.
pub fn parse_flake8(raw: &str, root: &Path) -> Result<Vec<IssueList>, AdapterError> {
    let files: BTreeMap<String, Vec<Violation>> = decode(TOOL, raw)?;
    let mut lists = Vec::new();
    for (file, violations) in files {
        if violations.is_empty() {
            continue;
        }
        let path = rel_path(Path::new(&file), root);
        let mut list = IssueList::titled(path.clone());
        for v in violations {
            list.add(
                RichText::safe(format!(
                    "<code>{}</code> {}",
                    esc(&v.code),
                    esc(&v.text)
                )),
                format!("{}:{}:{}", path, v.line_number, v.column_number),
            );
        }
        lists.push(list);
    }
    if lists.is_empty() {
        lists.push(IssueList::new());
    }
    Ok(lists)
}

pub struct StyleAnalyzer;

impl Analyzer for StyleAnalyzer {
    fn section(&self) -> SectionKind {
        SectionKind::Style
    }

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError> {
        let tool = &ctx.settings.tools.style;
        ctx.run_pre(tool);
        ctx.clear_artifact(TOOL, tool)?;
        let run = ctx.invoke(&tool.command)?;
        let raw = ctx.output(TOOL, tool, &run)?;
        let lists = parse_flake8(&raw, ctx.root())?;
        let passed = lists.iter().all(|l| l.count() == 0);
        Ok(StageReport::new(lists.into_iter().map(Into::into).collect(), passed))
    }
}
