//! Running external analyzers.
//!
//! `ToolRunner` is the seam between the pipeline and the processes it
//! starts; `ProcessRunner` is the real implementation.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::ToolError;

/// One command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRun {
    pub program: String,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolRun {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait ToolRunner {
    /// Runs the invocation to completion. A non-zero exit code is a normal
    /// result; only a process that could not run is an error.
    fn run(&self, invocation: &Invocation) -> Result<ToolRun, ToolError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolRun, ToolError> {
        let (program, args) = invocation
            .argv
            .split_first()
            .ok_or(ToolError::EmptyCommand)?;
        let resolved = which::which(program).map_err(|_| ToolError::NotFound {
            program: program.clone(),
        })?;
        log::debug!("running {}", invocation.display());
        let output = Command::new(resolved)
            .args(args)
            .current_dir(&invocation.cwd)
            .output()
            .map_err(|source| ToolError::Spawn {
                program: program.clone(),
                source,
            })?;
        // No exit code means the process was killed by a signal.
        let code = output.status.code().ok_or_else(|| ToolError::Crashed {
            program: program.clone(),
        })?;
        log::debug!("{} exited with {}", program, code);
        Ok(ToolRun {
            program: program.clone(),
            code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Expands `{root}`, `{src}` and `{tmp}` in each argument.
pub fn expand(argv: &[String], root: &Path, src: &Path, tmp: &Path) -> Vec<String> {
    argv.iter()
        .map(|a| {
            a.replace("{root}", &root.to_string_lossy())
                .replace("{src}", &src.to_string_lossy())
                .replace("{tmp}", &tmp.to_string_lossy())
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_placeholders() {
        let argv = vec!["flake8".into(), "--output-file".into(), "{tmp}/style.json".into(), "{src}".into()];
        let out = expand(&argv, Path::new("/r"), Path::new("/r/src"), Path::new("/r/tmp"));
        assert_eq!(out, vec!["flake8", "--output-file", "/r/tmp/style.json", "/r/src"]);
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let inv = Invocation::new(vec!["qualibuild-no-such-tool-xyz".into()], ".");
        assert!(matches!(
            ProcessRunner.run(&inv),
            Err(ToolError::NotFound { .. })
        ));
        assert!(matches!(
            ProcessRunner.run(&Invocation::new(Vec::new(), ".")),
            Err(ToolError::EmptyCommand)
        ));
    }
}
