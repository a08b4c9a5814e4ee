//! solbatch build engine
//!
//! Compiles a tree of Solidity sources one file at a time, dependencies first:
//! - Source discovery and import scanning
//! - Import resolution through Foundry remappings
//! - Dependency graph and topological build order
//! - Sequential or bounded-parallel compiler invocation with fail-fast
//! - Artifact staging into a bundle directory
//!
//! # Example
//!
//! ```no_run
//! use solbatch_build::{BuildConfig, Builder, ForgeCompiler};
//!
//! let config = BuildConfig::new("contracts", "out");
//! let compiler = ForgeCompiler::new(".", "out");
//! let context = Builder::new(config).build(&compiler).unwrap();
//! println!("{} files compiled", context.report.succeeded());
//! ```

pub mod build_order;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod graph;
pub mod imports;
pub mod path_resolver;
pub mod stager;

// Re-export main types
pub use build_order::{BuildOrder, CyclePolicy, TopologicalOrderer};
pub use builder::{BuildConfig, BuildContext, BuildPlan, BuildStats, Builder};
pub use compiler::{Compiler, ForgeCompiler};
pub use error::{BuildError, BuildResult, CompileError};
pub use executor::{
    BatchExecutor, BatchReport, CompilationOutcome, Disposition, ExecutionPolicy, NoProgress,
    ProgressObserver, Status,
};
pub use graph::{DependencyGraph, GraphBuilder};
pub use imports::{ImportScan, ScanDiagnostic};
pub use path_resolver::PathResolver;
pub use stager::ArtifactStager;
