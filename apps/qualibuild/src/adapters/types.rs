//! Type-checker findings from mypy's text output.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::{Analyzer, StageContext, StageReport};
use crate::errors::{AdapterError, StageError};
use crate::models::{IssueList, RichText, SectionKind};
use crate::utils::{esc, rel_path, tail};

const TOOL: &str = "mypy";

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<file>[^:\n]+):(?P<line>\d+)(?::(?P<col>\d+))?: (?P<kind>error|warning|note): (?P<msg>.*?)(?:\s+\[(?P<code>[\w-]+)\])?\s*$",
        )
        .expect("static mypy pattern")
    })
}

struct Finding {
    line: String,
    kind: String,
    message: String,
    code: Option<String>,
    notes: Vec<String>,
}

/// One list per file, ordered by path. Notes attach to the finding before
/// them in the same file and are dropped when there is none; other lines
/// (summaries, banners) are skipped.
pub fn parse_mypy(raw: &str, root: &Path) -> Vec<IssueList> {
    let mut files: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
    for line in raw.lines() {
        let Some(caps) = line_pattern().captures(line) else {
            continue;
        };
        let file = rel_path(Path::new(&caps["file"]), root);
        let message = caps["msg"].to_string();
        if &caps["kind"] == "note" {
            match files.get_mut(&file).and_then(|f| f.last_mut()) {
                Some(last) => last.notes.push(message),
                None => log::debug!("{TOOL}: dropping note without a finding: {message}"),
            }
            continue;
        }
        files.entry(file).or_default().push(Finding {
            line: caps["line"].to_string(),
            kind: caps["kind"].to_string(),
            message,
            code: caps.name("code").map(|m| m.as_str().to_string()),
            notes: Vec::new(),
        });
    }

    let mut lists = Vec::new();
    for (file, findings) in files {
        let mut list = IssueList::titled(file.clone());
        for f in findings {
            let summary = match &f.code {
                Some(code) => format!("<code>{}</code> {}", esc(code), esc(&f.message)),
                None => esc(&f.message),
            };
            let mut details = format!("{}:{} ({})", esc(&file), f.line, esc(&f.kind));
            for note in &f.notes {
                details.push_str("<br>");
                details.push_str(&esc(note));
            }
            list.add(RichText::safe(summary), RichText::safe(details));
        }
        lists.push(list);
    }
    if lists.is_empty() {
        lists.push(IssueList::new());
    }
    lists
}

pub struct TypesAnalyzer;

impl Analyzer for TypesAnalyzer {
    fn section(&self) -> SectionKind {
        SectionKind::Types
    }

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError> {
        let tool = &ctx.settings.tools.types;
        ctx.run_pre(tool);
        let run = ctx.invoke(&tool.command)?;
        let raw = ctx.output(TOOL, tool, &run)?;
        let lists = parse_mypy(&raw, ctx.root());
        let findings: usize = lists.iter().map(IssueList::count).sum();
        // exit 1 means findings; anything above is mypy failing on its own
        if run.code > 1 && findings == 0 {
            let output = if run.stderr.trim().is_empty() { &raw } else { &run.stderr };
            return Err(AdapterError::malformed(
                TOOL,
                format!("exited with {}: {}", run.code, tail(output, 5)),
            )
            .into());
        }
        Ok(StageReport::new(lists.into_iter().map(Into::into).collect(), findings == 0))
    }
}
