//! Small helpers: console prefixes, paths, anchors and escaping.

use owo_colors::OwoColorize;
use std::path::Path;

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".yellow().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if colors_enabled() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// Path of `target` relative to `base`, falling back to the path as given.
pub fn rel_path(target: &Path, base: &Path) -> String {
    let target = if target.is_absolute() {
        target.to_path_buf()
    } else {
        base.join(target)
    };
    pathdiff::diff_paths(&target, base)
        .unwrap_or(target)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Anchor fragment for a heading: whitespace removed.
pub fn anchor(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Escapes analyzer text for inclusion in safe markup.
pub fn esc(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escapes a value placed inside a double-quoted attribute.
pub fn esc_attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

/// Keeps at most the last `max` lines of tool output.
pub fn tail(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rel_path_relative_and_absolute() {
        let base = Path::new("/repo");
        assert_eq!(rel_path(Path::new("/repo/src/a.py"), base), "src/a.py");
        assert_eq!(rel_path(Path::new("src/b.py"), base), "src/b.py");
    }

    #[test]
    fn test_esc_and_tail() {
        assert_eq!(esc("<script>&"), "&lt;script&gt;&amp;");
        assert_eq!(esc_attr("a\"b"), "a&quot;b");
        assert_eq!(tail("1\n2\n3\n4", 2), "3\n4");
        assert_eq!(anchor(" Doc  Coverage "), "DocCoverage");
    }
}
