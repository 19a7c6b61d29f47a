//! Text and cell values carried by the report.
//!
//! Analyzer output ends up inside an HTML document. `RichText::Plain` is
//! escaped when rendered; `RichText::Safe` is inserted as-is and must only be
//! built from markup whose analyzer-provided parts were escaped first.

use maud::{html, Markup, PreEscaped, Render};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum RichText {
    Plain(String),
    Safe(String),
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Marks already-escaped markup for literal inclusion.
    pub fn safe(markup: impl Into<String>) -> Self {
        Self::Safe(markup.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(s) | Self::Safe(s) => s,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for RichText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl From<&str> for RichText {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_string())
    }
}

impl From<String> for RichText {
    fn from(s: String) -> Self {
        Self::Plain(s)
    }
}

impl Render for RichText {
    fn render(&self) -> Markup {
        match self {
            Self::Plain(s) => html! { (s) },
            Self::Safe(s) => PreEscaped(s.clone()),
        }
    }
}

/// A single table value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(RichText),
    Integer(i64),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(RichText::plain(s))
    }

    pub fn safe(markup: impl Into<String>) -> Self {
        Self::Text(RichText::safe(markup))
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Self::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<RichText> for Cell {
    fn from(t: RichText) -> Self {
        Self::Text(t)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t.as_str()),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v:.2}"),
        }
    }
}

impl Render for Cell {
    fn render(&self) -> Markup {
        match self {
            Self::Text(t) => t.render(),
            other => html! { (other.to_string()) },
        }
    }
}
