//! Status badges derived from section summaries.
//!
//! The badge set is fixed: every build produces the same labels, and a
//! badge whose data is missing (stage not run, analysis unavailable) shows
//! `unknown` in the bottom tier.

use maud::html;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::models::SectionKind;
use crate::summary::{SummaryEntry, SummaryValue};

/// Badge colors from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTier {
    BrightGreen,
    Green,
    YellowGreen,
    Yellow,
    Orange,
    Red,
}

impl ColorTier {
    pub const TOP: ColorTier = ColorTier::BrightGreen;
    pub const BOTTOM: ColorTier = ColorTier::Red;

    pub fn name(self) -> &'static str {
        match self {
            Self::BrightGreen => "brightgreen",
            Self::Green => "green",
            Self::YellowGreen => "yellowgreen",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }

    fn hex(self) -> &'static str {
        match self {
            Self::BrightGreen => "#4c1",
            Self::Green => "#97ca00",
            Self::YellowGreen => "#a4a61d",
            Self::Yellow => "#dfb317",
            Self::Orange => "#fe7d37",
            Self::Red => "#e05d44",
        }
    }
}

/// Minimum percentage for each tier; anything lower is red.
const PERCENT_THRESHOLDS: [(f64, ColorTier); 5] = [
    (99.0, ColorTier::BrightGreen),
    (98.0, ColorTier::Green),
    (96.0, ColorTier::YellowGreen),
    (94.0, ColorTier::Yellow),
    (90.0, ColorTier::Orange),
];

/// Maximum issue count for each tier; anything higher is red.
const ISSUE_THRESHOLDS: [(usize, ColorTier); 3] = [
    (0, ColorTier::BrightGreen),
    (5, ColorTier::Yellow),
    (20, ColorTier::Orange),
];

const VULNERABILITY_THRESHOLDS: [(usize, ColorTier); 1] = [(0, ColorTier::BrightGreen)];

pub fn percent_tier(value: f64) -> ColorTier {
    let value = value.floor();
    PERCENT_THRESHOLDS
        .iter()
        .find(|(min, _)| value >= *min)
        .map_or(ColorTier::BOTTOM, |(_, tier)| *tier)
}

fn count_tier(thresholds: &[(usize, ColorTier)], count: usize) -> ColorTier {
    thresholds
        .iter()
        .find(|(max, _)| count <= *max)
        .map_or(ColorTier::BOTTOM, |(_, tier)| *tier)
}

pub fn issue_tier(count: usize) -> ColorTier {
    count_tier(&ISSUE_THRESHOLDS, count)
}

pub fn vulnerability_tier(count: usize) -> ColorTier {
    count_tier(&VULNERABILITY_THRESHOLDS, count)
}

pub fn pass_fail_tier(passed: bool) -> ColorTier {
    if passed {
        ColorTier::TOP
    } else {
        ColorTier::BOTTOM
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum BadgeReading {
    Percent(f64),
    Count(usize),
    PassFail(bool),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub label: String,
    pub message: String,
    pub reading: BadgeReading,
    pub color: ColorTier,
}

impl Badge {
    fn new(label: &str, reading: BadgeReading, color: ColorTier) -> Self {
        let message = match reading {
            BadgeReading::Percent(p) => format!("{}%", p.floor()),
            BadgeReading::Count(n) => n.to_string(),
            BadgeReading::PassFail(true) => "passing".to_string(),
            BadgeReading::PassFail(false) => "failing".to_string(),
            BadgeReading::Unknown => "unknown".to_string(),
        };
        Self {
            label: label.to_string(),
            message,
            reading,
            color,
        }
    }

    fn unknown(label: &str) -> Self {
        Self::new(label, BadgeReading::Unknown, ColorTier::BOTTOM)
    }

    pub fn file_name(&self) -> String {
        format!("{}.svg", self.label.replace(' ', "_"))
    }

    /// Static shields.io URL showing the same badge.
    pub fn shields_url(&self) -> String {
        format!(
            "https://img.shields.io/static/v1?label={}&message={}&color={}",
            urlencoding::encode(&self.label),
            urlencoding::encode(&self.message),
            self.color.name()
        )
    }

    /// Flat SVG badge.
    pub fn to_svg(&self) -> String {
        let left = text_width(&self.label);
        let right = text_width(&self.message);
        let total = left + right;
        let aria = format!("{}: {}", self.label, self.message);
        html! {
            svg xmlns="http://www.w3.org/2000/svg" width=(total) height="20" role="img" aria-label=(aria) {
                title { (aria) }
                rect width=(left) height="20" fill="#555" {}
                rect x=(left) width=(right) height="20" fill=(self.color.hex()) {}
                g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11" {
                    text x=(left / 2) y="14" { (self.label) }
                    text x=(left + right / 2) y="14" { (self.message) }
                }
            }
        }
        .into_string()
    }
}

fn text_width(text: &str) -> usize {
    text.chars().count() * 7 + 10
}

/// What the build knows beyond the section summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStatus {
    /// `None` when the test stage never ran.
    pub tests_passed: Option<bool>,
    /// Pipeline completed and packaging (if any) succeeded.
    pub build_passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadgeRule {
    Issues,
    Vulnerabilities,
    Percent,
    PassFail,
}

/// Badge label and thresholding rule for each analyzer section.
fn badge_rule(kind: SectionKind) -> Option<(&'static str, BadgeRule)> {
    match kind {
        SectionKind::Style => Some(("style issues", BadgeRule::Issues)),
        SectionKind::Types => Some(("type issues", BadgeRule::Issues)),
        SectionKind::Security => Some(("vulnerabilities", BadgeRule::Vulnerabilities)),
        SectionKind::Tests => Some(("test coverage", BadgeRule::Percent)),
        SectionKind::Docs => Some(("docs", BadgeRule::PassFail)),
        SectionKind::DocCoverage => Some(("doc coverage", BadgeRule::Percent)),
        SectionKind::Failure => None,
    }
}

const BADGE_SECTIONS: [SectionKind; 6] = [
    SectionKind::Style,
    SectionKind::Types,
    SectionKind::Security,
    SectionKind::Tests,
    SectionKind::Docs,
    SectionKind::DocCoverage,
];

fn badge_from_entry(label: &str, rule: BadgeRule, entry: &SummaryEntry) -> Badge {
    match (rule, entry.value) {
        (BadgeRule::Issues, SummaryValue::Count(n)) => {
            Badge::new(label, BadgeReading::Count(n), issue_tier(n))
        }
        (BadgeRule::Vulnerabilities, SummaryValue::Count(n)) => {
            Badge::new(label, BadgeReading::Count(n), vulnerability_tier(n))
        }
        (BadgeRule::Percent, SummaryValue::Percent(p)) => {
            Badge::new(label, BadgeReading::Percent(p), percent_tier(p))
        }
        (BadgeRule::PassFail, SummaryValue::Passed(p)) => {
            Badge::new(label, BadgeReading::PassFail(p), pass_fail_tier(p))
        }
        _ => Badge::unknown(label),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeSet {
    pub badges: Vec<Badge>,
}

impl BadgeSet {
    pub fn from_summaries(summaries: &[SummaryEntry], status: BuildStatus) -> Self {
        let mut badges: Vec<Badge> = BADGE_SECTIONS
            .iter()
            .filter_map(|kind| {
                let (label, rule) = badge_rule(*kind)?;
                Some(match summaries.iter().find(|e| e.section == *kind) {
                    Some(entry) => badge_from_entry(label, rule, entry),
                    None => Badge::unknown(label),
                })
            })
            .collect();
        badges.push(match status.tests_passed {
            Some(p) => Badge::new("tests", BadgeReading::PassFail(p), pass_fail_tier(p)),
            None => Badge::unknown("tests"),
        });
        badges.push(Badge::new(
            "build",
            BadgeReading::PassFail(status.build_passed),
            pass_fail_tier(status.build_passed),
        ));
        Self { badges }
    }

    pub fn get(&self, label: &str) -> Option<&Badge> {
        self.badges.iter().find(|b| b.label == label)
    }

    /// Replaces the badge directory with this set: one SVG per badge plus a
    /// `badges.json` manifest.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if dir.exists() {
            fs::remove_dir_all(dir)
                .map_err(|e| Error::file_system("failed to clear badge directory", dir, e))?;
        }
        fs::create_dir_all(dir)
            .map_err(|e| Error::file_system("failed to create badge directory", dir, e))?;
        let mut written = Vec::with_capacity(self.badges.len() + 1);
        for badge in &self.badges {
            let path = dir.join(badge.file_name());
            fs::write(&path, badge.to_svg())
                .map_err(|e| Error::file_system("failed to write badge", &path, e))?;
            written.push(path);
        }
        let manifest: Vec<_> = self
            .badges
            .iter()
            .map(|b| {
                serde_json::json!({
                    "label": b.label,
                    "message": b.message,
                    "color": b.color.name(),
                    "file": b.file_name(),
                    "url": b.shields_url(),
                })
            })
            .collect();
        let path = dir.join("badges.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)
            .map_err(|e| Error::file_system("failed to write badge manifest", &path, e))?;
        written.push(path);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(section: SectionKind, value: SummaryValue) -> SummaryEntry {
        SummaryEntry {
            section,
            name: "x",
            value,
            unit: "",
        }
    }

    #[test]
    fn test_percent_thresholds() {
        assert_eq!(percent_tier(100.0), ColorTier::TOP);
        assert_eq!(percent_tier(99.2), ColorTier::BrightGreen);
        assert_eq!(percent_tier(98.9), ColorTier::Green);
        assert_eq!(percent_tier(95.0), ColorTier::Yellow);
        assert_eq!(percent_tier(90.0), ColorTier::Orange);
        assert_eq!(percent_tier(89.9), ColorTier::BOTTOM);
    }

    #[test]
    fn test_count_thresholds() {
        assert_eq!(vulnerability_tier(0), ColorTier::TOP);
        assert_eq!(vulnerability_tier(1), ColorTier::BOTTOM);
        assert_eq!(issue_tier(0), ColorTier::TOP);
        assert_eq!(issue_tier(3), ColorTier::Yellow);
        assert_eq!(issue_tier(21), ColorTier::Red);
    }

    #[test]
    fn test_badge_set_tiers_from_summaries() {
        let summaries = vec![
            entry(SectionKind::Tests, SummaryValue::Percent(100.0)),
            entry(SectionKind::Security, SummaryValue::Count(2)),
        ];
        let set = BadgeSet::from_summaries(
            &summaries,
            BuildStatus {
                tests_passed: Some(true),
                build_passed: true,
            },
        );
        assert_eq!(set.get("test coverage").unwrap().color, ColorTier::TOP);
        assert_eq!(set.get("test coverage").unwrap().message, "100%");
        assert_eq!(set.get("vulnerabilities").unwrap().color, ColorTier::BOTTOM);
        assert_eq!(set.get("style issues").unwrap().message, "unknown");
        assert_eq!(set.get("build").unwrap().message, "passing");
        assert_eq!(set.badges.len(), 8);
    }

    #[test]
    fn test_unavailable_summary_gives_unknown_badge() {
        let summaries = vec![entry(SectionKind::Security, SummaryValue::Unavailable)];
        let set = BadgeSet::from_summaries(
            &summaries,
            BuildStatus {
                tests_passed: None,
                build_passed: false,
            },
        );
        let vuln = set.get("vulnerabilities").unwrap();
        assert_eq!(vuln.reading, BadgeReading::Unknown);
        assert_eq!(vuln.color, ColorTier::BOTTOM);
        assert_eq!(set.get("tests").unwrap().message, "unknown");
        assert_eq!(set.get("build").unwrap().color, ColorTier::BOTTOM);
    }

    #[test]
    fn test_svg_and_url_escape_text() {
        let badge = Badge::new("doc coverage", BadgeReading::Percent(97.5), ColorTier::YellowGreen);
        let svg = badge.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("doc coverage: 97%"));
        assert_eq!(
            badge.shields_url(),
            "https://img.shields.io/static/v1?label=doc%20coverage&message=97%25&color=yellowgreen"
        );
        assert_eq!(badge.file_name(), "doc_coverage.svg");
    }

    #[test]
    fn test_write_replaces_previous_badges() {
        let dir = tempfile::tempdir().unwrap();
        let badges = dir.path().join("badges");
        fs::create_dir_all(&badges).unwrap();
        fs::write(badges.join("stale.svg"), "old").unwrap();
        let set = BadgeSet::from_summaries(
            &[],
            BuildStatus {
                tests_passed: Some(false),
                build_passed: false,
            },
        );
        let written = set.write(&badges).unwrap();
        assert_eq!(written.len(), 9);
        assert!(!badges.join("stale.svg").exists());
        assert!(badges.join("build.svg").exists());
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(badges.join("badges.json")).unwrap())
                .unwrap();
        assert_eq!(manifest[7]["label"], "build");
        assert_eq!(manifest[7]["color"], "red");
    }
}
