//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "qualibuild",
    version,
    about = "Quality-gated build orchestrator",
    long_about = "qualibuild runs style, type, security, test, and documentation analyzers over a source tree and folds their output into one HTML report, a badge set, and a calendar version.\n\nConfiguration precedence: CLI > qualibuild.toml > defaults.",
    after_help = "Examples:\n  qualibuild build\n  qualibuild report --output json --keep\n  qualibuild doc --repo-root ../project\n  qualibuild remove",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Debug, Clone, Default)]
/// Options shared by commands that run the pipeline.
pub struct RunArgs {
    #[arg(long, help = "Repository root (default: current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Suppress progress lines")]
    pub quiet: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Keep the temporary directory after the run")]
    pub keep: bool,
    #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Enable debug logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(
        about = "Show version",
        long_about = "Print the current qualibuild version."
    )]
    Version,
    /// Full build
    #[command(
        about = "Run all analyzers, bump the version, and package",
        long_about = "Run every stage, write the report and badges, persist the next calendar version, and run the packaging command. Exits 1 when the pipeline aborts.",
        after_help = "Examples:\n  qualibuild build\n  qualibuild build --quiet --output json"
    )]
    Build {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Report only
    #[command(
        about = "Run all analyzers and write the report",
        long_about = "Run every stage and write the report. Badges, the version and packaging are left untouched.",
        after_help = "Examples:\n  qualibuild report\n  qualibuild report --keep"
    )]
    Report {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Documentation only
    #[command(
        about = "Build documentation and doc coverage",
        long_about = "Run only the documentation and documentation coverage stages and write their report."
    )]
    Doc {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Remove build artifacts
    #[command(
        about = "Remove build artifacts",
        long_about = "Delete paths matched by the `remove` glob patterns, relative to the repository root.",
        after_help = "Examples:\n  qualibuild remove --dry-run"
    )]
    Remove {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "List matches without deleting")]
        dry_run: bool,
        #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Enable debug logging")]
        verbose: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::try_parse_from([
            "qualibuild",
            "build",
            "--repo-root",
            "/tmp/p",
            "--output",
            "json",
            "--keep",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Build { args } => {
                assert_eq!(args.repo_root.as_deref(), Some("/tmp/p"));
                assert_eq!(args.output.as_deref(), Some("json"));
                assert!(args.keep);
                assert!(!args.quiet);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_remove_dry_run() {
        let cli = Cli::try_parse_from(["qualibuild", "remove", "--dry-run"]).unwrap();
        assert!(matches!(cli.cmd, Commands::Remove { dry_run: true, .. }));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
