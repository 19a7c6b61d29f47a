//! Security findings: bandit for the code, safety for dependencies.
//!
//! Dependencies are checked in the active environment and in every file
//! matched by the `dependency_files` targets, one list each. The check needs
//! an online vulnerability database; when a report cannot be produced its
//! list is marked unavailable instead of looking clean.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{
    annotate, decode, read_artifact, remove_artifact, source_link, Analyzer, StageContext,
    StageReport,
};
use crate::errors::{AdapterError, StageError};
use crate::models::{IssueList, LineMark, RichText, SectionKind, SourceView, CONTEXT_LINES};
use crate::utils::{esc, esc_attr, rel_path};

const BANDIT: &str = "bandit";
const SAFETY: &str = "safety";
const CODE: &str = "Code";
const DEPENDENCIES: &str = "Dependencies";

#[derive(Debug, Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditResult>,
}

#[derive(Debug, Deserialize)]
struct BanditResult {
    test_id: String,
    test_name: String,
    issue_text: String,
    issue_severity: String,
    issue_confidence: String,
    filename: String,
    #[serde(default)]
    line_range: Vec<u64>,
    #[serde(default)]
    more_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SafetyReport {
    #[serde(default)]
    vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Deserialize)]
struct Vulnerability {
    vulnerability_id: String,
    package_name: String,
    #[serde(default)]
    vulnerable_spec: Option<String>,
    #[serde(default)]
    analyzed_version: Option<String>,
    #[serde(default)]
    advisory: String,
}

fn lines(range: &[u64]) -> String {
    match (range.first(), range.last()) {
        (Some(a), Some(b)) if a != b => format!("{a}-{b}"),
        (Some(a), _) => a.to_string(),
        _ => "?".to_string(),
    }
}

/// Bandit results in report order, under the "Code" heading, plus one
/// listing per affected file that can still be read. Details link to the
/// first line of each finding.
pub fn parse_bandit(raw: &str, root: &Path) -> Result<(IssueList, Vec<SourceView>), AdapterError> {
    let report: BanditReport = decode(BANDIT, raw)?;
    let mut marked: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for r in &report.results {
        marked
            .entry(rel_path(Path::new(&r.filename), root))
            .or_default()
            .extend(&r.line_range);
    }
    let views: BTreeMap<String, SourceView> = marked
        .iter()
        .filter_map(|(file, lines)| {
            annotate(root, file, &[(lines.as_slice(), LineMark::Finding)], Some(CONTEXT_LINES))
                .map(|view| (file.clone(), view))
        })
        .collect();

    let mut list = IssueList::titled(CODE);
    for r in report.results {
        let summary = format!(
            "<b>{}</b> ({} confidence) <code>{}</code> {}: {}",
            esc(&r.issue_severity),
            esc(&r.issue_confidence.to_lowercase()),
            esc(&r.test_id),
            esc(&r.test_name),
            esc(&r.issue_text)
        );
        let file = rel_path(Path::new(&r.filename), root);
        let location = format!("{}:{}", file, lines(&r.line_range));
        let mut details = if views.contains_key(&file) {
            source_link(SectionKind::Security, &file, r.line_range.first().copied(), &location)
        } else {
            esc(&location)
        };
        if let Some(url) = r.more_info.filter(|u| !u.is_empty()) {
            details.push_str(&format!(
                " <a href=\"{}\">more info</a>",
                esc_attr(&url)
            ));
        }
        list.add(RichText::safe(summary), RichText::safe(details));
    }
    Ok((list, views.into_values().collect()))
}

/// Vulnerable dependencies, under the "Dependencies" heading.
pub fn parse_safety(raw: &str) -> Result<IssueList, AdapterError> {
    let report: SafetyReport = decode(SAFETY, raw)?;
    let mut list = IssueList::titled(DEPENDENCIES);
    for v in report.vulnerabilities {
        let version = v.analyzed_version.as_deref().unwrap_or("?");
        let mut summary = format!(
            "<code>{}</code> {} {}",
            esc(&v.vulnerability_id),
            esc(&v.package_name),
            esc(version)
        );
        if let Some(spec) = v.vulnerable_spec.filter(|s| !s.is_empty()) {
            summary.push_str(&format!(" (affected: {})", esc(&spec)));
        }
        list.add(RichText::safe(summary), v.advisory);
    }
    Ok(list)
}

fn dependencies_unavailable(heading: &str, reason: &str) -> IssueList {
    IssueList::unavailable(
        Some(heading.to_string()),
        "Dependency vulnerability check unavailable",
        reason.to_string(),
    )
}

/// Files matched by the target patterns, sorted and de-duplicated.
pub fn dependency_targets(patterns: &[String]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for pattern in patterns {
        match glob::glob(pattern) {
            Ok(paths) => found.extend(paths.flatten().filter(|p| p.is_file())),
            Err(e) => log::warn!("ignoring dependency target {pattern}: {e}"),
        }
    }
    found.sort();
    found.dedup();
    found
}

/// One safety run. Anything short of a readable report makes the list
/// unavailable; a report that does not parse is an error.
fn check(
    ctx: &StageContext<'_>,
    heading: &str,
    argv: &[String],
    artifact: Option<&Path>,
) -> Result<IssueList, AdapterError> {
    if let Some(path) = artifact {
        remove_artifact(SAFETY, path)?;
    }
    let run = match ctx.invoke(argv) {
        Ok(run) => run,
        Err(e) => {
            log::warn!("dependency check skipped: {e}");
            return Ok(dependencies_unavailable(heading, &e.to_string()));
        }
    };
    let raw = match artifact {
        Some(path) => match read_artifact(SAFETY, path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("{e}");
                return Ok(dependencies_unavailable(
                    heading,
                    &format!(
                        "{} exited with {} without writing {}",
                        SAFETY,
                        run.code,
                        path.display()
                    ),
                ));
            }
        },
        None => run.stdout,
    };
    let mut list = parse_safety(&raw)?;
    list.heading = Some(heading.to_string());
    Ok(list)
}

pub struct SecurityAnalyzer;

impl SecurityAnalyzer {
    fn dependencies(&self, ctx: &StageContext<'_>) -> Result<Vec<IssueList>, AdapterError> {
        let tool = &ctx.settings.tools.dependencies;
        let mut lists = vec![if tool.is_configured() {
            check(ctx, DEPENDENCIES, &tool.command, tool.artifact.as_deref())?
        } else {
            dependencies_unavailable(DEPENDENCIES, "no dependency checker is configured")
        }];

        let files = &ctx.settings.tools.dependency_files;
        if !files.is_configured() {
            return Ok(lists);
        }
        for target in dependency_targets(&files.targets) {
            let name = target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let file = target.to_string_lossy();
            let fill = |arg: &str| arg.replace("{file}", &file).replace("{name}", &name);
            let argv: Vec<String> = files.command.iter().map(|a| fill(a)).collect();
            let artifact = files
                .artifact
                .as_ref()
                .map(|p| PathBuf::from(fill(&p.to_string_lossy())));
            let heading = format!("{} ({})", DEPENDENCIES, rel_path(&target, ctx.root()));
            lists.push(check(ctx, &heading, &argv, artifact.as_deref())?);
        }
        Ok(lists)
    }
}

impl Analyzer for SecurityAnalyzer {
    fn section(&self) -> SectionKind {
        SectionKind::Security
    }

    fn analyze(&self, ctx: &StageContext<'_>) -> Result<StageReport, StageError> {
        let tool = &ctx.settings.tools.security;
        ctx.run_pre(tool);
        ctx.clear_artifact(BANDIT, tool)?;
        let run = ctx.invoke(&tool.command)?;
        let raw = ctx.output(BANDIT, tool, &run)?;
        let (code, sources) = parse_bandit(&raw, ctx.root())?;
        let dependencies = self.dependencies(ctx)?;
        let passed = code.count() == 0
            && dependencies
                .iter()
                .all(|l| l.count() == 0 && !l.is_unavailable());
        let mut subsections = vec![code.into()];
        subsections.extend(dependencies.into_iter().map(Into::into));
        Ok(StageReport::new(subsections, passed).with_sources(sources))
    }
}
