//! Calendar versioning (`year.month.sequence`).
//!
//! The next version depends only on the previous version string and the
//! current date. Within one month the sequence increases by one per build;
//! a new month starts again at 1.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalVersion {
    pub year: i32,
    pub month: u32,
    pub sequence: u32,
}

impl CalVersion {
    pub fn new(year: i32, month: u32, sequence: u32) -> Self {
        Self {
            year,
            month,
            sequence,
        }
    }

    fn first_of(today: NaiveDate) -> Self {
        Self::new(today.year(), today.month(), 1)
    }

    /// Version for a build on `today` following `previous`.
    ///
    /// A previous version from a later month than `today` keeps its month and
    /// bumps the sequence, so versions never go backwards.
    pub fn next(previous: Option<&str>, today: NaiveDate) -> Self {
        let Some(prev) = previous.and_then(|s| s.parse::<CalVersion>().ok()) else {
            if let Some(raw) = previous {
                log::warn!("version '{raw}' is not year.month.sequence; starting a new series");
            }
            return Self::first_of(today);
        };
        let current = (today.year(), today.month());
        match (prev.year, prev.month).cmp(&current) {
            std::cmp::Ordering::Equal => Self::new(prev.year, prev.month, prev.sequence + 1),
            std::cmp::Ordering::Less => Self::first_of(today),
            std::cmp::Ordering::Greater => {
                log::warn!("stored version {prev} is newer than today's date; keeping its period");
                Self::new(prev.year, prev.month, prev.sequence + 1)
            }
        }
    }
}

impl fmt::Display for CalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid calendar version '{}'", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for CalVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        let [year, month, sequence] = parts.as_slice() else {
            return Err(err());
        };
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        let sequence: u32 = sequence.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) || year < 0 {
            return Err(err());
        }
        Ok(Self::new(year, month, sequence))
    }
}

/// The project metadata file holding the `version = ...` marker.
pub struct VersionFile {
    path: PathBuf,
    pattern: Regex,
}

impl VersionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            // prefix, opening quote, value, closing quote
            pattern: Regex::new(r#"(?m)^([ \t]*version[ \t]*=[ \t]*)("?)([^"\r\n]*?)("?)[ \t]*$"#)
                .expect("static version pattern"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn contents(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .map_err(|e| Error::file_system("failed to read metadata file", &self.path, e))
    }

    /// The stored version string, if the file has a version assignment.
    pub fn read(&self) -> Result<Option<String>> {
        let contents = self.contents()?;
        Ok(self
            .pattern
            .captures(&contents)
            .map(|c| c[3].trim().to_string()))
    }

    /// Replaces the first version assignment, keeping its quoting.
    pub fn write(&self, version: &CalVersion) -> Result<()> {
        let contents = self.contents()?;
        if !self.pattern.is_match(&contents) {
            return Err(Error::VersionMarker {
                path: self.path.clone(),
            });
        }
        let replacement = format!("${{1}}${{2}}{version}${{4}}");
        let updated = self.pattern.replacen(&contents, 1, replacement.as_str());
        fs::write(&self.path, updated.as_ref())
            .map_err(|e| Error::file_system("failed to write metadata file", &self.path, e))?;
        log::info!("version set to {version} in {}", self.path.display());
        Ok(())
    }
}
