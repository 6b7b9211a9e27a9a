use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pipecraft_core::{GenerateOptions, GenerateReport, Generator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("pipecraft")
        .version(pipecraft_core::VERSION)
        .about("Idempotent CI/CD pipeline generation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("generate")
                .about("Regenerate the pipeline file, keeping user edits")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Ignore the rebuild cache and reset domain job needs/conditions"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the pipeline instead of writing it"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file, relative to the project root"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration file (default: discovered .pipecraftrc.*)"),
                )
                .arg(
                    Arg::new("root")
                        .long("root")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf))
                        .help("Project root"),
                )
                .arg(
                    Arg::new("skip-checks")
                        .long("skip-checks")
                        .action(ArgAction::SetTrue)
                        .help("Do not require a git checkout at the project root"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .short('v')
                        .action(ArgAction::SetTrue)
                        .help("Log per-job decisions"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Write logs as JSON lines"),
                ),
        )
}

/// Logs go to stderr so `--dry-run` output stays clean; `RUST_LOG` wins
fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn generate_options(args: &ArgMatches) -> GenerateOptions {
    let root = args
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut options = GenerateOptions::new(root)
        .with_force(args.get_flag("force"))
        .with_dry_run(args.get_flag("dry-run"))
        .with_skip_checks(args.get_flag("skip-checks"));
    if let Some(config) = args.get_one::<PathBuf>("config") {
        options = options.with_config_path(config);
    }
    if let Some(output) = args.get_one::<PathBuf>("output") {
        options = options.with_output(output);
    }
    options
}

async fn generate(args: &ArgMatches) -> anyhow::Result<GenerateReport> {
    let options = generate_options(args);
    let root = options.root.clone();
    Generator::new(options)
        .run()
        .await
        .with_context(|| format!("failed to generate pipeline in {}", root.display()))
}

fn print_report(report: &GenerateReport, dry_run: bool) {
    if dry_run {
        if let Some(rendered) = &report.rendered {
            print!("{rendered}");
        }
        return;
    }
    if report.skipped_by_cache {
        println!("{}: up to date (no tracked changes)", report.output_path.display());
    } else {
        println!("{}: {}", report.output_path.display(), report.status);
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("generate", args)) => {
            init_tracing(args.get_flag("verbose"), args.get_flag("log-json"));
            match generate(args).await {
                Ok(report) => print_report(&report, args.get_flag("dry-run")),
                Err(err) => {
                    eprintln!("error: {err:#}");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            let _ = cli().print_help();
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn generate_flags_map_to_options() {
        let matches = cli()
            .try_get_matches_from([
                "pipecraft",
                "generate",
                "--force",
                "--dry-run",
                "--skip-checks",
                "--root",
                "/work",
                "--config",
                "ci/pipecraft.yml",
                "-o",
                "ci.yml",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let options = generate_options(args);

        assert!(options.force);
        assert!(options.dry_run);
        assert!(options.skip_checks);
        assert_eq!(options.root, PathBuf::from("/work"));
        assert_eq!(options.config_path, Some(PathBuf::from("ci/pipecraft.yml")));
        assert_eq!(options.output, Some(PathBuf::from("ci.yml")));
    }

    #[test]
    fn defaults_are_conservative() {
        let matches = cli().try_get_matches_from(["pipecraft", "generate"]).unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let options = generate_options(args);

        assert_eq!(options, GenerateOptions::new("."));
        assert!(!args.get_flag("verbose"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(cli().try_get_matches_from(["pipecraft"]).is_err());
    }
}
