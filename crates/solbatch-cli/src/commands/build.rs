//! Build command - compile every source file in dependency order

use crate::config::ProjectArgs;
use crate::progress::BarProgress;
use crate::report::{self, JsonOrder, JsonReport};
use anyhow::{Context, Result};
use solbatch_build::{Builder, ForgeCompiler};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Project location and layout
    pub project: ProjectArgs,
    /// Bundle directory for staged artifacts
    pub bundle: Option<PathBuf>,
    /// Compiler executable
    pub compiler: String,
    /// Pass `--zksync`
    pub zksync: bool,
    /// Stop at the first failure
    pub fail_fast: bool,
    /// Concurrent compiler invocations
    pub jobs: usize,
    /// Per-invocation timeout in seconds
    pub timeout: Option<f64>,
    /// Only print the order
    pub dry_run: bool,
    /// JSON output
    pub json: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
    /// Extra compiler arguments
    pub compiler_args: Vec<String>,
}

/// Run the build command, returning the process exit code
pub fn run(args: BuildArgs) -> Result<u8> {
    let project = args.project.load()?;
    let timeout = parse_timeout(args.timeout)?;

    let mut builder = Builder::new(args.project.build_config(&project))
        .with_fail_fast(args.fail_fast)
        .with_jobs(args.jobs);
    if let Some(bundle) = &args.bundle {
        let bundle = if bundle.is_absolute() {
            bundle.clone()
        } else {
            project.root.join(bundle)
        };
        builder = builder.with_bundle_dir(bundle);
    }

    if args.dry_run {
        let plan = builder.plan().context("Failed to compute compilation order")?;
        if args.json {
            let doc = JsonOrder {
                root: &project.root,
                order: &plan.order,
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else if !args.quiet {
            print!("{}", report::render_order(&project.root, &plan.order));
        }
        return Ok(0);
    }

    let compiler = ForgeCompiler::new(&project.root, &project.output_dir)
        .with_program(&args.compiler)
        .with_zksync(args.zksync)
        .with_extra_args(args.compiler_args.clone())
        .with_timeout(timeout);

    let show_progress = !args.json && !args.quiet && std::io::stderr().is_terminal();
    let progress = show_progress.then(|| BarProgress::new(&project.root));

    let result = match &progress {
        Some(bar) => builder.with_observer(bar).build(&compiler),
        None => builder.build(&compiler),
    };
    if let Some(bar) = &progress {
        bar.finish();
    }
    let context = result.context("Build failed")?;

    if args.json {
        let doc = JsonReport {
            success: context.report.is_success(),
            root: &project.root,
            context: &context,
        };
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else if !args.quiet {
        print!("{}", report::render_order(&project.root, &context.order));
        println!();
        print!("{}", report::render_summary(&project.root, &context));
    } else {
        for failure in context.report.failures() {
            eprintln!("failed: {}", failure.path.display());
        }
    }

    Ok(if context.report.is_success() { 0 } else { 1 })
}

/// Seconds flag to a duration; zero, negative or out-of-range is rejected
fn parse_timeout(secs: Option<f64>) -> Result<Option<Duration>> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) if !timeout.is_zero() => Ok(Some(timeout)),
        _ => anyhow::bail!("Invalid --timeout {secs}: must be a positive number of seconds"),
    }
}
