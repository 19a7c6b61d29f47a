//! Configuration discovery and effective settings resolution.
//!
//! qualibuild reads `qualibuild.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config.
//! Defaults:
//! - `name`: repository directory name
//! - `src`: `src`, `report_dir`: `report`, `tmp_dir`: `tmp`
//! - `badge_dir`: `data/badges`
//! - `output`: `human`
//! - `version.file`: `setup.cfg`
//! - `tools.*`: flake8, mypy, bandit, safety, coverage, sphinx-build
//! - `tools.dependency_files.targets`: `setup.cfg`, `requirements*.txt`
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::tools::expand;

const CONFIG_NAMES: [&str; 3] = ["qualibuild.toml", "qualibuild.yaml", "qualibuild.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// One external tool under `[tools.<name>]`.
pub struct ToolCfg {
    pub command: Option<Vec<String>>,
    /// File the tool writes its machine-readable output to.
    pub artifact: Option<String>,
    /// Commands run before `command`; their failures are ignored.
    pub pre: Option<Vec<Vec<String>>>,
    /// Glob patterns, relative to the repository root, of files the command
    /// runs against one at a time (`{file}` and `{name}` placeholders).
    pub targets: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Tool overrides under `[tools]`.
pub struct ToolsCfg {
    pub style: Option<ToolCfg>,
    pub types: Option<ToolCfg>,
    pub security: Option<ToolCfg>,
    pub dependencies: Option<ToolCfg>,
    pub dependency_files: Option<ToolCfg>,
    pub tests: Option<ToolCfg>,
    pub coverage: Option<ToolCfg>,
    pub docs: Option<ToolCfg>,
    pub doc_coverage: Option<ToolCfg>,
    pub package: Option<ToolCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct VersionCfg {
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `qualibuild.toml|yaml`.
pub struct QualibuildConfig {
    pub name: Option<String>,
    pub src: Option<String>,
    pub report_dir: Option<String>,
    pub tmp_dir: Option<String>,
    pub badge_dir: Option<String>,
    pub output: Option<String>,
    pub version: Option<VersionCfg>,
    #[serde(default)]
    pub tools: Option<ToolsCfg>,
    /// Glob patterns deleted by `qualibuild remove`.
    pub remove: Option<Vec<String>>,
}

/// A tool with placeholders expanded and paths made absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSpec {
    pub command: Vec<String>,
    pub artifact: Option<PathBuf>,
    pub pre: Vec<Vec<String>>,
    /// Absolute glob patterns.
    pub targets: Vec<String>,
}

impl ToolSpec {
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    pub style: ToolSpec,
    pub types: ToolSpec,
    pub security: ToolSpec,
    pub dependencies: ToolSpec,
    pub dependency_files: ToolSpec,
    pub tests: ToolSpec,
    pub coverage: ToolSpec,
    pub docs: ToolSpec,
    pub doc_coverage: ToolSpec,
    pub package: ToolSpec,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub config_found: bool,
    pub name: String,
    pub src: PathBuf,
    pub report_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub badge_dir: PathBuf,
    pub output: String,
    pub version_file: PathBuf,
    pub tools: ToolSet,
    pub remove: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn tool(command: &[&str], artifact: Option<&str>, pre: &[&[&str]]) -> ToolCfg {
    ToolCfg {
        command: Some(argv(command)),
        artifact: artifact.map(str::to_string),
        pre: Some(pre.iter().map(|p| argv(p)).collect()),
        targets: None,
    }
}

fn default_tools() -> ToolsCfg {
    ToolsCfg {
        style: Some(tool(
            &[
                "flake8",
                "--format=json",
                "--max-line-length",
                "88",
                "--select",
                "C,E,F,W,B,B950",
                "--extend-ignore",
                "E203,E501",
                "--output-file",
                "{tmp}/style.json",
                "{src}",
            ],
            Some("{tmp}/style.json"),
            &[&["isort", "--quiet", "{src}"], &["black", "--quiet", "{src}"]],
        )),
        types: Some(tool(
            &[
                "mypy",
                "--show-error-codes",
                "--no-color-output",
                "--no-error-summary",
                "--follow-imports=silent",
                "--ignore-missing-imports",
                "--cache-dir",
                "{tmp}/mypy_cache",
                "{src}",
            ],
            None,
            &[],
        )),
        security: Some(tool(
            &["bandit", "--quiet", "-r", "{src}", "-f", "json", "-o", "{tmp}/bandit.json"],
            Some("{tmp}/bandit.json"),
            &[],
        )),
        dependencies: Some(tool(
            &["safety", "check", "--output", "json", "--save-json", "{tmp}/dependencies.json"],
            Some("{tmp}/dependencies.json"),
            &[],
        )),
        dependency_files: Some(ToolCfg {
            targets: Some(argv(&["setup.cfg", "requirements*.txt"])),
            ..tool(
                &[
                    "safety",
                    "check",
                    "--file",
                    "{file}",
                    "--output",
                    "json",
                    "--save-json",
                    "{tmp}/dependencies-{name}.json",
                ],
                Some("{tmp}/dependencies-{name}.json"),
                &[],
            )
        }),
        tests: Some(tool(
            &["coverage", "run", "--source={src}", "--omit=*/test*", "-m", "unittest", "-q"],
            None,
            &[],
        )),
        coverage: Some(tool(
            &["coverage", "json", "--pretty-print", "-o", "{tmp}/coverage.json"],
            Some("{tmp}/coverage.json"),
            &[],
        )),
        docs: Some(tool(
            &["sphinx-build", "-q", "-b", "html", "{root}/docs", "{root}/docs/html"],
            None,
            &[],
        )),
        doc_coverage: Some(ToolCfg {
            command: None,
            artifact: Some("{tmp}/doccoverage.json".to_string()),
            pre: None,
            targets: None,
        }),
        package: Some(tool(
            &["python", "-m", "build", "-s", "-w", "-o", "{root}/dist"],
            None,
            &[],
        )),
    }
}

fn default_remove() -> Vec<String> {
    argv(&[
        "report",
        "tmp",
        "dist",
        "build",
        "docs/html",
        ".coverage",
        "src/*.egg-info",
    ])
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `qualibuild.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `QualibuildConfig` from `qualibuild.toml` or `qualibuild.yaml|yml` if present.
pub fn load_config(root: &Path) -> Result<Option<QualibuildConfig>> {
    for name in CONFIG_NAMES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let s = fs::read_to_string(&path)
            .map_err(|e| Error::file_system("failed to read config", &path, e))?;
        let cfg = if name.ends_with(".toml") {
            toml::from_str::<QualibuildConfig>(&s).map_err(|e| Error::Configuration {
                path: path.clone(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str::<QualibuildConfig>(&s).map_err(|e| Error::Configuration {
                path: path.clone(),
                message: e.to_string(),
            })?
        };
        log::debug!("loaded config from {}", path.display());
        return Ok(Some(cfg));
    }
    Ok(None)
}

/// Config entries replace defaults per tool; unset fields keep the default.
fn merge_tool(default: Option<ToolCfg>, over: Option<ToolCfg>) -> ToolCfg {
    let default = default.unwrap_or_default();
    match over {
        None => default,
        Some(o) => ToolCfg {
            command: o.command.or(default.command),
            artifact: o.artifact.or(default.artifact),
            pre: o.pre.or(default.pre),
            targets: o.targets.or(default.targets),
        },
    }
}

fn resolve_tool(cfg: ToolCfg, root: &Path, src: &Path, tmp: &Path) -> ToolSpec {
    let command = expand(&cfg.command.unwrap_or_default(), root, src, tmp);
    let absolute = |value: String| {
        let p = PathBuf::from(expand(&[value], root, src, tmp).remove(0));
        if p.is_absolute() {
            p
        } else {
            root.join(p)
        }
    };
    let artifact = cfg.artifact.map(absolute);
    let pre = cfg
        .pre
        .unwrap_or_default()
        .iter()
        .map(|c| expand(c, root, src, tmp))
        .collect();
    let targets = cfg
        .targets
        .unwrap_or_default()
        .into_iter()
        .map(|t| absolute(t).to_string_lossy().to_string())
        .collect();
    ToolSpec {
        command,
        artifact,
        pre,
        targets,
    }
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli_repo_root: Option<&str>, cli_output: Option<&str>) -> Result<Effective> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let start = fs::canonicalize(&start).unwrap_or(start);
    let repo_root = detect_repo_root(&start);
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let name = cfg.name.clone().unwrap_or_else(|| {
        repo_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    });
    let dir = |value: Option<String>, default: &str| repo_root.join(value.unwrap_or_else(|| default.to_string()));
    let src = dir(cfg.src, "src");
    let report_dir = dir(cfg.report_dir, "report");
    let tmp_dir = dir(cfg.tmp_dir, "tmp");
    let badge_dir = dir(cfg.badge_dir, "data/badges");
    let version_file = dir(cfg.version.and_then(|v| v.file), "setup.cfg");

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let defaults = default_tools();
    let overrides = cfg.tools.unwrap_or_default();
    let resolve = |d: Option<ToolCfg>, o: Option<ToolCfg>| {
        resolve_tool(merge_tool(d, o), &repo_root, &src, &tmp_dir)
    };
    let tools = ToolSet {
        style: resolve(defaults.style, overrides.style),
        types: resolve(defaults.types, overrides.types),
        security: resolve(defaults.security, overrides.security),
        dependencies: resolve(defaults.dependencies, overrides.dependencies),
        dependency_files: resolve(defaults.dependency_files, overrides.dependency_files),
        tests: resolve(defaults.tests, overrides.tests),
        coverage: resolve(defaults.coverage, overrides.coverage),
        docs: resolve(defaults.docs, overrides.docs),
        doc_coverage: resolve(defaults.doc_coverage, overrides.doc_coverage),
        package: resolve(defaults.package, overrides.package),
    };

    Ok(Effective {
        repo_root,
        config_found,
        name,
        src,
        report_dir,
        tmp_dir,
        badge_dir,
        output,
        version_file,
        tools,
        remove: cfg.remove.unwrap_or_else(default_remove),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let mut f = fs::File::create(root.join("qualibuild.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
name = "acme"
output = "json"
report_dir = "out/report"
[version]
file = "pyproject.toml"
[tools.types]
command = ["pyright", "{src}"]
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(root.to_str(), None).unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.name, "acme");
        assert_eq!(eff.output, "json");
        assert_eq!(eff.report_dir, root.join("out/report"));
        assert_eq!(eff.version_file, root.join("pyproject.toml"));
        assert_eq!(
            eff.tools.types.command,
            vec!["pyright".to_string(), root.join("src").to_string_lossy().to_string()]
        );
        // untouched tools keep their defaults
        assert_eq!(eff.tools.style.command[0], "flake8");
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let mut f = fs::File::create(root.join("qualibuild.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
src: lib
tools:
  style:
    pre: []
            "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None).unwrap();
        assert_eq!(eff.src, root.join("lib"));
        assert_eq!(eff.output, "human");
        assert_eq!(eff.badge_dir, root.join("data/badges"));
        assert!(eff.tools.style.pre.is_empty());
        assert_eq!(
            eff.tools.style.artifact,
            Some(root.join("tmp").join("style.json"))
        );
        assert!(!eff.tools.doc_coverage.is_configured());
        assert!(eff.tools.doc_coverage.artifact.is_some());
        assert_eq!(
            eff.tools.dependency_files.targets,
            vec![
                root.join("setup.cfg").to_string_lossy().to_string(),
                root.join("requirements*.txt").to_string_lossy().to_string()
            ]
        );
        assert_eq!(
            eff.tools.dependency_files.artifact,
            Some(root.join("tmp").join("dependencies-{name}.json"))
        );
    }

    #[test]
    fn test_dependency_targets_override() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(
            root.join("qualibuild.toml"),
            "[tools.dependency_files]\ntargets = [\"req/*.txt\"]\n",
        )
        .unwrap();
        let eff = resolve_effective(root.to_str(), None).unwrap();
        let files = &eff.tools.dependency_files;
        assert_eq!(files.targets, vec![root.join("req/*.txt").to_string_lossy().to_string()]);
        // the command is still the default one
        assert!(files.command.contains(&"{file}".to_string()));
    }

    #[test]
    fn test_cli_output_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(root.join("qualibuild.toml"), "output = \"json\"\n").unwrap();
        let eff = resolve_effective(root.to_str(), Some("human")).unwrap();
        assert_eq!(eff.output, "human");
    }

    #[test]
    fn test_no_config_uses_dir_name_and_defaults() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        let eff = resolve_effective(root.to_str(), None).unwrap();
        assert!(!eff.config_found);
        assert_eq!(
            eff.name,
            root.file_name().unwrap().to_string_lossy().to_string()
        );
        assert!(eff.remove.contains(&"report".to_string()));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(root.join("qualibuild.toml"), "name = [").unwrap();
        assert!(matches!(
            resolve_effective(root.to_str(), None),
            Err(Error::Configuration { .. })
        ));
    }
}
