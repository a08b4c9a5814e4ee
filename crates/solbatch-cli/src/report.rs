//! Human-readable and JSON rendering of build results

use colored::*;
use serde::Serialize;
use solbatch_build::{BuildContext, CompilationOutcome, Disposition, Status};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Path relative to the project root when possible
fn relative<'a>(root: &Path, path: &'a Path) -> std::borrow::Cow<'a, str> {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy()
}

/// Numbered compilation order, as printed before compiling
pub fn render_order(root: &Path, order: &[PathBuf]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Compilation order:".bold());
    for (i, file) in order.iter().enumerate() {
        let _ = writeln!(out, "{:>4}. {}", i + 1, relative(root, file));
    }
    out
}

/// Per-file result line
fn render_outcome(root: &Path, outcome: &CompilationOutcome) -> String {
    let label = match outcome.status {
        Status::Success => "ok".green().bold(),
        Status::Failure => "FAILED".red().bold(),
    };
    format!(
        "{:>8} {} ({:.2}s)",
        label,
        relative(root, &outcome.path),
        outcome.duration.as_secs_f64()
    )
}

/// Full build summary: one line per file, failure diagnostics, totals
pub fn render_summary(root: &Path, context: &BuildContext) -> String {
    let report = &context.report;
    let mut out = String::new();

    for outcome in &report.outcomes {
        let _ = writeln!(out, "{}", render_outcome(root, outcome));
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Failures:".red().bold());
        for outcome in failures {
            let _ = writeln!(out, "  {} {}", "●".red(), relative(root, &outcome.path).bold());
            for line in outcome.diagnostic.as_deref().unwrap_or_default().lines() {
                let _ = writeln!(out, "      {}", line.dimmed());
            }
        }
    }

    let _ = writeln!(out, "{}", "─".repeat(50));

    let status = match &report.disposition {
        Disposition::Completed { failures: 0 } => "SUCCEEDED".green().bold(),
        Disposition::Completed { .. } => "FAILED".red().bold(),
        Disposition::Aborted { .. } => "ABORTED".red().bold(),
    };
    let failed = report.failed();
    let _ = writeln!(
        out,
        "Build {} | {} compiled, {} failed, {} total",
        status,
        report.succeeded().to_string().green().bold(),
        if failed > 0 {
            failed.to_string().red().bold()
        } else {
            failed.to_string().normal()
        },
        context.order.len()
    );

    if let Disposition::Aborted { at } = &report.disposition {
        let skipped = context.order.len().saturating_sub(report.outcomes.len());
        let _ = writeln!(
            out,
            "Stopped at {}; {} file(s) not attempted",
            relative(root, at),
            skipped
        );
    }
    if let Some(staged) = context.staged {
        let _ = writeln!(out, "Staged {} artifact file(s)", staged);
    }
    if let Some(error) = &context.staging_error {
        let _ = writeln!(out, "{} {}", "Staging failed:".yellow().bold(), error);
    }
    let _ = writeln!(out, "Time: {:.2}s", context.stats.total_time.as_secs_f64());

    out
}

/// JSON document for `--json`
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub success: bool,
    pub root: &'a Path,
    #[serde(flatten)]
    pub context: &'a BuildContext,
}

/// JSON document for a dry run or `order --json`
#[derive(Serialize)]
pub struct JsonOrder<'a> {
    pub root: &'a Path,
    pub order: &'a [PathBuf],
}

#[cfg(test)]
mod tests {
    use super::*;
    use solbatch_build::{BatchReport, BuildStats};
    use std::time::Duration;

    fn context(outcomes: Vec<CompilationOutcome>, disposition: Disposition, order: &[&str]) -> BuildContext {
        BuildContext {
            order: order.iter().map(|p| PathBuf::from("/p").join(p)).collect(),
            report: BatchReport {
                outcomes,
                disposition,
            },
            staged: None,
            staging_error: None,
            stats: BuildStats {
                total_time: Duration::from_millis(1500),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_render_order() {
        colored::control::set_override(false);
        let order = vec![PathBuf::from("/p/contracts/Z.sol"), PathBuf::from("/p/contracts/A.sol")];
        insta::assert_snapshot!(render_order(Path::new("/p"), &order), @r"
        Compilation order:
           1. contracts/Z.sol
           2. contracts/A.sol
        ");
    }

    #[test]
    fn test_render_summary_with_failure() {
        colored::control::set_override(false);
        let ctx = context(
            vec![
                CompilationOutcome::success("/p/contracts/A.sol", Duration::from_millis(250)),
                CompilationOutcome::failure(
                    "/p/contracts/B.sol",
                    "Error: boom\n --> B.sol:3",
                    Duration::from_millis(500),
                ),
            ],
            Disposition::Completed { failures: 1 },
            &["contracts/A.sol", "contracts/B.sol"],
        );

        insta::assert_snapshot!(render_summary(Path::new("/p"), &ctx), @r"
              ok contracts/A.sol (0.25s)
          FAILED contracts/B.sol (0.50s)

        Failures:
          ● contracts/B.sol
              Error: boom
               --> B.sol:3
        ──────────────────────────────────────────────────
        Build FAILED | 1 compiled, 1 failed, 2 total
        Time: 1.50s
        ");
    }

    #[test]
    fn test_render_summary_aborted() {
        colored::control::set_override(false);
        let ctx = context(
            vec![CompilationOutcome::failure("/p/contracts/A.sol", "boom", Duration::ZERO)],
            Disposition::Aborted {
                at: PathBuf::from("/p/contracts/A.sol"),
            },
            &["contracts/A.sol", "contracts/B.sol", "contracts/C.sol"],
        );

        let summary = render_summary(Path::new("/p"), &ctx);
        assert!(summary.contains("Build ABORTED | 0 compiled, 1 failed, 3 total"));
        assert!(summary.contains("Stopped at contracts/A.sol; 2 file(s) not attempted"));
    }

    #[test]
    fn test_render_summary_staging_failure() {
        colored::control::set_override(false);
        let mut ctx = context(
            vec![CompilationOutcome::success("/p/contracts/A.sol", Duration::ZERO)],
            Disposition::Completed { failures: 0 },
            &["contracts/A.sol"],
        );
        ctx.staging_error = Some("I/O error at /p/bundle: File exists".to_string());

        let summary = render_summary(Path::new("/p"), &ctx);
        assert!(summary.contains("Build SUCCEEDED | 1 compiled, 0 failed, 1 total"));
        assert!(summary.contains("Staging failed: I/O error at /p/bundle: File exists"));
    }

    #[test]
    fn test_json_report_shape() {
        let ctx = context(
            vec![CompilationOutcome::success("/p/contracts/A.sol", Duration::ZERO)],
            Disposition::Completed { failures: 0 },
            &["contracts/A.sol"],
        );
        let json = serde_json::to_value(JsonReport {
            success: true,
            root: Path::new("/p"),
            context: &ctx,
        })
        .unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["order"][0], "/p/contracts/A.sol");
        assert_eq!(json["report"]["disposition"]["kind"], "completed");
        assert_eq!(json["stats"]["total_time"], 1.5);
        assert!(json.get("staged").is_none());
        assert!(json.get("staging_error").is_none());
    }
}
