//! qualibuild CLI binary entry point.
//! Delegates to the library for the build/report/doc flows and prints results.

use clap::Parser;
use qualibuild::cli::{Cli, Commands, RunArgs};
use qualibuild::commands::{execute, Mode, RunOptions};
use qualibuild::config::{self, Effective};
use qualibuild::output::{self, RunSummary};
use qualibuild::tools::ProcessRunner;
use qualibuild::{clean, utils};

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn resolve_or_exit(repo_root: Option<&str>, output: Option<&str>) -> Effective {
    match config::resolve_effective(repo_root, output) {
        Ok(eff) => eff,
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            std::process::exit(2);
        }
    }
}

fn run_pipeline(mode: Mode, args: RunArgs) {
    init_logging(args.verbose);
    let eff = resolve_or_exit(args.repo_root.as_deref(), args.output.as_deref());
    let chatty = !args.quiet && eff.output != "json";
    // Friendly note if no qualibuild config was found
    if chatty && !eff.config_found {
        eprintln!(
            "{} {}",
            utils::note_prefix(),
            "No qualibuild.toml found; using defaults."
        );
    }
    if chatty {
        let names: Vec<&str> = mode.pipeline().stages().iter().map(|s| s.name()).collect();
        eprintln!(
            "{} {}",
            utils::info_prefix(),
            format!(
                "Running {} in {}",
                names.join(", "),
                eff.repo_root.to_string_lossy()
            )
        );
    }

    let now = chrono::Local::now();
    let opts = RunOptions {
        today: now.date_naive(),
        now: now.fixed_offset(),
        keep_tmp: args.keep,
    };
    match execute(mode, &eff, &ProcessRunner, &opts) {
        Ok(result) => {
            if !args.quiet || eff.output == "json" {
                let summary = RunSummary {
                    outcome: &result.outcome,
                    summaries: &result.summaries,
                    version: Some(result.version.as_str()),
                    report_path: Some(result.report_path.as_path()),
                };
                output::print_run(&summary, &eff.output);
            }
            if result.packaged == Some(false) {
                eprintln!("{} {}", utils::error_prefix(), "packaging failed");
            }
            std::process::exit(result.exit_code());
        }
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            std::process::exit(2);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Build { args } => run_pipeline(Mode::Build, args),
        Commands::Report { args } => run_pipeline(Mode::Report, args),
        Commands::Doc { args } => run_pipeline(Mode::Doc, args),
        Commands::Remove {
            repo_root,
            dry_run,
            verbose,
        } => {
            init_logging(verbose);
            let eff = resolve_or_exit(repo_root.as_deref(), None);
            match clean::remove_artifacts(&eff.repo_root, &eff.remove, dry_run) {
                Ok(paths) => {
                    let verb = if dry_run { "would remove" } else { "removed" };
                    for p in paths {
                        println!("{}: {}", verb, utils::rel_path(&p, &eff.repo_root));
                    }
                }
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(2);
                }
            }
        }
    }
}
