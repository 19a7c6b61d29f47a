//! HTML rendering of the report.
//!
//! The document is self-contained: styles are inlined, every section is
//! reachable from the navigation list and annotated source listings are
//! embedded in the section that links to them. Rendering is a pure function of its
//! inputs, so the same report and metadata always produce the same bytes.

use chrono::{DateTime, FixedOffset};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::models::{IssueList, LineMark, MetricTable, Report, Section, SectionKind, SourceView, Subsection};
use crate::summary::SummaryEntry;
use crate::utils::anchor;

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
nav{min-width:16em;padding:1em;background:#f4f4f4}\
nav ul{list-style:none;padding:0}\
main{padding:1em 2em;flex:1}\
article{margin-bottom:2em}\
.headline{color:#555}\
.no-issues{color:#2a7d2a;font-weight:bold}\
.unavailable{color:#b00020;font-weight:bold}\
.fatal{background:#b00020;color:#fff;padding:.5em 1em}\
details{border-bottom:1px solid #ddd;padding:.3em 0}\
table{border-collapse:collapse}\
th,td{border:1px solid #ccc;padding:.2em .6em;text-align:left}\
table.listing td{border:none;padding:0 .6em}\
table.listing pre,.legend span{margin:0;padding:0 .4em}\
td.ln{color:#888;text-align:right}\
.run{background:#e3f6e3}\
.missing,.finding{background:#fbe0e0}\
.excluded{background:#ececec}";

pub struct RenderMeta {
    pub app_name: String,
    pub version: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Set when the pipeline aborted; shown as a banner above all sections.
    pub fatal: Option<String>,
}

/// Renders the full document.
pub fn render(report: &Report, summaries: &[SummaryEntry], meta: &RenderMeta) -> String {
    let title = format!("{} {} report", meta.app_name, meta.version);
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                nav {
                    h1 { (meta.app_name) }
                    p { "Version " (meta.version) }
                    p { "Generated " (meta.timestamp.format("%Y-%m-%d %H:%M:%S %:z").to_string()) }
                    ul {
                        @for section in report.sections() {
                            li {
                                a href={ "#" (section.kind.anchor()) } {
                                    (section.name())
                                    @if let Some(entry) = summary_for(summaries, section) {
                                        " (" (entry.display()) ")"
                                    }
                                }
                            }
                        }
                    }
                }
                main {
                    @if let Some(message) = &meta.fatal {
                        p class="fatal" { "Build aborted: " (message) }
                    }
                    @for section in report.sections() {
                        (render_section(section, summary_for(summaries, section)))
                    }
                }
            }
        }
    };
    markup.into_string()
}

fn summary_for<'a>(summaries: &'a [SummaryEntry], section: &Section) -> Option<&'a SummaryEntry> {
    summaries.iter().find(|e| e.section == section.kind)
}

fn render_section(section: &Section, entry: Option<&SummaryEntry>) -> Markup {
    let section_anchor = section.kind.anchor();
    html! {
        article id=(section_anchor) {
            h2 { (section.name()) }
            @if let Some(entry) = entry {
                p class="headline" { (entry.name) ": " (entry.display()) }
            }
            @for sub in section.subsections() {
                @let id = sub.heading().map(|h| format!("{}-{}", section_anchor, anchor(h)));
                @match sub {
                    Subsection::IssueList(list) => { (render_list(list, id.as_deref())) }
                    Subsection::MetricTable(table) => { (render_table(table, id.as_deref())) }
                }
            }
            @if !section.sources().is_empty() {
                section class="sources" {
                    h3 { "Sources" }
                    @for view in section.sources() {
                        (render_source(section.kind, view))
                    }
                }
            }
        }
    }
}

fn render_source(kind: SectionKind, view: &SourceView) -> Markup {
    let legend = view.legend();
    html! {
        details class="source" id=(SourceView::anchor(kind, &view.path)) {
            summary { code { (view.path) } }
            @if !legend.is_empty() {
                p class="legend" {
                    @for mark in &legend {
                        span class=(mark.class()) { (mark.label()) }
                    }
                }
            }
            table class="listing" {
                @for (i, (first, last)) in view.blocks().into_iter().enumerate() {
                    @if i > 0 {
                        tr class="gap" { td class="ln" { "…" } td {} }
                    }
                    @for n in first..=last {
                        tr id=(SourceView::line_anchor(kind, &view.path, n as u64))
                            class=[view.mark_at(n).map(LineMark::class)] {
                            td class="ln" { (n) }
                            td { pre { (view.line(n).unwrap_or_default()) } }
                        }
                    }
                }
            }
        }
    }
}

fn render_list(list: &IssueList, id: Option<&str>) -> Markup {
    html! {
        section class="issues" id=[id] {
            @if let Some(heading) = &list.heading {
                h3 { (heading) }
            }
            @if list.is_unavailable() {
                p class="unavailable" { "Analysis unavailable" }
            }
            @if list.count() == 0 {
                p class="no-issues" { "No Issues" }
            } @else {
                @for issue in list.issues() {
                    details {
                        summary { (issue.summary) }
                        div class="details" { (issue.details) }
                    }
                }
            }
        }
    }
}

fn render_table(table: &MetricTable, id: Option<&str>) -> Markup {
    html! {
        section class="metrics" id=[id] {
            @if let Some(heading) = &table.heading {
                h3 { (heading) }
            }
            table {
                thead {
                    tr {
                        @for column in table.columns() {
                            th { (column) }
                        }
                    }
                }
                tbody {
                    @for row in table.rows() {
                        tr {
                            @for cell in row {
                                td { (cell) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Writes the rendered document to `<report_dir>/report.html`, replacing any
/// previous report.
pub fn write_report(report_dir: &Path, html: &str) -> Result<PathBuf> {
    fs::create_dir_all(report_dir)
        .map_err(|e| Error::file_system("failed to create report directory", report_dir, e))?;
    let path = report_dir.join("report.html");
    fs::write(&path, html).map_err(|e| Error::file_system("failed to write report", &path, e))?;
    Ok(path)
}
