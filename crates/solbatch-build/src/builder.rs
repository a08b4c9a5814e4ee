//! Build orchestration and pipeline management
use crate::build_order::{BuildOrder, CyclePolicy, TopologicalOrderer};
use crate::compiler::Compiler;
use crate::error::{BuildError, BuildResult};
use crate::executor::{serialize_secs, BatchExecutor, BatchReport, ExecutionPolicy, NoProgress, ProgressObserver};
use crate::graph::{DependencyGraph, GraphBuilder};
use crate::stager::ArtifactStager;

use serde::Serialize;
use solbatch_config::{ProjectConfig, RemappingTable};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory scanned for sources
    pub source_dir: PathBuf,
    /// Directory the compiler writes artifacts to
    pub output_dir: PathBuf,
    /// Where to copy artifacts after compiling, if anywhere
    pub bundle_dir: Option<PathBuf>,
    /// Import remappings
    pub remappings: RemappingTable,
    /// Fail-fast and concurrency settings
    pub policy: ExecutionPolicy,
    /// Cycle handling
    pub cycle_policy: CyclePolicy,
}

impl BuildConfig {
    /// Configuration with no remappings and default policies
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            bundle_dir: None,
            remappings: RemappingTable::new(),
            policy: ExecutionPolicy::default(),
            cycle_policy: CyclePolicy::default(),
        }
    }

    /// Take directories and remappings from a loaded project
    pub fn from_project(project: &ProjectConfig) -> Self {
        Self {
            remappings: project.remappings.clone(),
            ..Self::new(&project.source_dir, &project.output_dir)
        }
    }
}

/// Graph and order computed before anything is compiled
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Dependency graph of every discovered source
    pub graph: DependencyGraph,
    /// Compilation order
    pub order: BuildOrder,
}

/// Build context - result of a completed pipeline run
///
/// A run with compile failures still produces a context; check
/// [`BatchReport::is_success`].
#[derive(Debug, Clone, Serialize)]
pub struct BuildContext {
    /// Compilation order that was executed
    pub order: BuildOrder,
    /// Per-file outcomes
    pub report: BatchReport,
    /// Files copied into the bundle, if staging ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged: Option<usize>,
    /// Why staging could not run; compile results are kept regardless
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_error: Option<String>,
    /// Build statistics
    pub stats: BuildStats,
}

/// Build statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    /// Source files discovered
    pub files: usize,
    /// Resolved import edges
    pub edges: usize,
    /// Dependency levels in the order
    pub levels: usize,
    /// Time spent discovering, scanning and ordering
    #[serde(serialize_with = "serialize_secs")]
    pub planning_time: Duration,
    /// Time spent in the compiler
    #[serde(serialize_with = "serialize_secs")]
    pub compilation_time: Duration,
    /// Time spent staging artifacts
    #[serde(serialize_with = "serialize_secs")]
    pub staging_time: Duration,
    /// Total build time
    #[serde(serialize_with = "serialize_secs")]
    pub total_time: Duration,
}

/// Main builder for orchestrating builds
pub struct Builder<'o> {
    config: BuildConfig,
    observer: &'o dyn ProgressObserver,
}

impl Builder<'static> {
    /// Create a builder for the given configuration
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            observer: &NoProgress,
        }
    }
}

impl<'o> Builder<'o> {
    /// Stop at the first compile failure
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.policy.fail_fast = fail_fast;
        self
    }

    /// Compile up to `jobs` files of a dependency level at once
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.config.policy.jobs = jobs.max(1);
        self
    }

    /// Set cycle handling
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.config.cycle_policy = policy;
        self
    }

    /// Copy artifacts into `bundle_dir` after compiling
    pub fn with_bundle_dir(mut self, bundle_dir: impl Into<PathBuf>) -> Self {
        self.config.bundle_dir = Some(bundle_dir.into());
        self
    }

    /// Report per-file progress to `observer`
    pub fn with_observer<'n>(self, observer: &'n dyn ProgressObserver) -> Builder<'n> {
        Builder {
            config: self.config,
            observer,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Discover sources, build the graph and compute the order
    pub fn plan(&self) -> BuildResult<BuildPlan> {
        let graph = GraphBuilder::new(&self.config.remappings).build(&self.config.source_dir)?;
        let order = TopologicalOrderer::new(self.config.cycle_policy).order(&graph)?;

        tracing::info!(
            files = graph.len(),
            edges = graph.edge_count(),
            "computed compilation order"
        );
        Ok(BuildPlan { graph, order })
    }

    /// Execute the build
    ///
    /// Only fatal conditions before compiling return `Err`. Compile failures
    /// are recorded in the report, and staging runs even when some files
    /// failed. A staging failure is kept in [`BuildContext::staging_error`].
    pub fn build(&self, compiler: &dyn Compiler) -> BuildResult<BuildContext> {
        let build_start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::io(&self.config.output_dir, e))?;

        let BuildPlan { graph, order } = self.plan()?;
        let orderer = TopologicalOrderer::new(self.config.cycle_policy);
        let levels = orderer.levels(&graph, &order);
        let planning_time = build_start.elapsed();

        let compile_start = Instant::now();
        let executor = BatchExecutor::new(self.config.policy).with_observer(self.observer);
        let report = if self.config.policy.jobs > 1 {
            tracing::debug!(
                levels = levels.len(),
                jobs = self.config.policy.jobs,
                "compiling by dependency level"
            );
            let mut report = executor.run_levels(&levels, compiler);
            report.sort_by_order(&order);
            report
        } else {
            executor.run(&order, compiler)
        };
        let compilation_time = compile_start.elapsed();

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "compilation finished"
        );

        let stage_start = Instant::now();
        let (staged, staging_error) = match &self.config.bundle_dir {
            Some(bundle_dir) => match ArtifactStager::new(&self.config.output_dir, bundle_dir).stage() {
                Ok(copied) => (Some(copied), None),
                Err(e) => {
                    tracing::warn!(bundle = %bundle_dir.display(), error = %e, "staging failed");
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };
        let staging_time = stage_start.elapsed();

        let stats = BuildStats {
            files: graph.len(),
            edges: graph.edge_count(),
            levels: levels.len(),
            planning_time,
            compilation_time,
            staging_time,
            total_time: build_start.elapsed(),
        };

        Ok(BuildContext {
            order,
            report,
            staged,
            staging_error,
            stats,
        })
    }
}
