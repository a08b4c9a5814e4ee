use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod progress;
mod report;

use config::ProjectArgs;

/// Exit code for configuration, directory and cycle errors
const EXIT_FATAL: u8 = 2;

/// Dependency-ordered batch compiler for Solidity projects.
///
/// Scans a source tree, resolves imports through Foundry remappings,
/// and invokes the compiler once per file with dependencies first.
///
/// EXAMPLES:
///     solbatch build                         Compile every contract in order
///     solbatch build --fail-fast             Stop at the first failure
///     solbatch build --bundle deploy/out     Copy artifacts after compiling
///     solbatch build --jobs 4                Compile independent files in parallel
///     solbatch order --json                  Print the compilation order
///
/// ENVIRONMENT VARIABLES:
///     FOUNDRY_PROFILE   Active foundry.toml profile
///     SOLBATCH_*        Defaults for most flags (see --help of each command)
///     RUST_LOG          Log filter, overrides -v/-q
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "solbatch")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every source file in dependency order
    ///
    /// Runs `<compiler> build <file> --zksync --out <out>` once per file.
    /// Failed files are reported; the batch continues unless --fail-fast.
    ///
    /// EXAMPLES:
    ///     solbatch build
    ///     solbatch build --src src --out out-zk
    ///     solbatch build --no-zksync --compiler /opt/foundry/bin/forge
    ///     solbatch build -- --optimize
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Copy the output directory's entries here after compiling
        #[arg(long, env = "SOLBATCH_BUNDLE")]
        bundle: Option<std::path::PathBuf>,

        /// Compiler executable
        #[arg(long, env = "SOLBATCH_COMPILER", default_value = "forge")]
        compiler: String,

        /// Do not pass --zksync to the compiler
        #[arg(long, env = "SOLBATCH_NO_ZKSYNC")]
        no_zksync: bool,

        /// Stop at the first failed file
        #[arg(long, env = "SOLBATCH_FAIL_FAST")]
        fail_fast: bool,

        /// Compile up to N independent files at once
        #[arg(long, short = 'j', env = "SOLBATCH_JOBS", default_value_t = 1)]
        jobs: usize,

        /// Kill a compiler invocation after this many seconds
        #[arg(long, env = "SOLBATCH_TIMEOUT")]
        timeout: Option<f64>,

        /// Print the compilation order without compiling
        #[arg(long)]
        dry_run: bool,

        /// JSON output
        #[arg(long, env = "SOLBATCH_JSON")]
        json: bool,

        /// Extra arguments passed to every compiler invocation
        #[arg(last = true)]
        compiler_args: Vec<String>,
    },

    /// Print the compilation order without compiling
    ///
    /// EXAMPLES:
    ///     solbatch order
    ///     solbatch order --json | jq '.order'
    #[command(visible_alias = "o")]
    Order {
        #[command(flatten)]
        project: ProjectArgs,

        /// JSON output
        #[arg(long, env = "SOLBATCH_JSON")]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Build {
            project,
            bundle,
            compiler,
            no_zksync,
            fail_fast,
            jobs,
            timeout,
            dry_run,
            json,
            compiler_args,
        } => commands::build::run(commands::build::BuildArgs {
            project,
            bundle,
            compiler,
            zksync: !no_zksync,
            fail_fast,
            jobs,
            timeout,
            dry_run,
            json,
            quiet: cli.quiet,
            compiler_args,
        }),
        Commands::Order { project, json } => commands::order::run(&project, json),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins over -v/-q
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
