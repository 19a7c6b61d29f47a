//! Artifact cleanup for `qualibuild remove` and the temporary directory.

use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Paths matched by `patterns` under `root`, sorted and de-duplicated.
/// Patterns may not reach outside the repository.
pub fn find_artifacts(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for pat in patterns {
        if Path::new(pat).is_absolute() || pat.split(['/', '\\']).any(|p| p == "..") {
            log::warn!("ignoring remove pattern outside the repository: {pat}");
            continue;
        }
        let full = root.join(pat).to_string_lossy().to_string();
        for entry in glob(&full)?.flatten() {
            if entry.starts_with(root) && entry != root {
                found.push(entry);
            }
        }
    }
    found.sort();
    found.dedup();
    // parents first, so children of removed directories are skipped
    let mut pruned: Vec<PathBuf> = Vec::new();
    for path in found {
        if !pruned.iter().any(|p| path.starts_with(p)) {
            pruned.push(path);
        }
    }
    Ok(pruned)
}

fn remove_path(path: &Path) -> Result<()> {
    let res = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    res.map_err(|e| Error::file_system("failed to remove", path, e))
}

/// Deletes everything matched by `patterns`; returns what was removed.
pub fn remove_artifacts(root: &Path, patterns: &[String], dry_run: bool) -> Result<Vec<PathBuf>> {
    let found = find_artifacts(root, patterns)?;
    if !dry_run {
        for path in &found {
            log::debug!("removing {}", path.display());
            remove_path(path)?;
        }
    }
    Ok(found)
}

/// Removes the temporary directory if it exists.
pub fn clean_tmp(tmp_dir: &Path) -> Result<()> {
    if tmp_dir.exists() {
        remove_path(tmp_dir)?;
    }
    Ok(())
}
