//! Project options shared by every command
//!
//! Flags override `foundry.toml`, which overrides the built-in defaults.

use anyhow::{Context, Result};
use clap::Args;
use solbatch_build::{BuildConfig, CyclePolicy};
use solbatch_config::{ConfigLoader, ProjectConfig};
use std::path::{Path, PathBuf};

/// Where the project is and how to read it
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root (defaults to the directory holding foundry.toml)
    #[arg(long, env = "SOLBATCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Source directory, relative to the root
    #[arg(long, env = "SOLBATCH_SRC")]
    pub src: Option<PathBuf>,

    /// Compiler output directory, relative to the root
    #[arg(long, env = "SOLBATCH_OUT")]
    pub out: Option<PathBuf>,

    /// foundry.toml profile (defaults to FOUNDRY_PROFILE, then "default")
    #[arg(long)]
    pub profile: Option<String>,

    /// Ignore foundry.toml and remappings.txt
    #[arg(long, env = "SOLBATCH_NO_CONFIG")]
    pub no_config: bool,

    /// Warn about import cycles instead of failing
    #[arg(long, env = "SOLBATCH_ALLOW_CYCLES")]
    pub allow_cycles: bool,
}

impl ProjectArgs {
    /// Load the project configuration and apply flag overrides
    pub fn load(&self) -> Result<ProjectConfig> {
        let mut project = if self.no_config {
            let root = match &self.root {
                Some(root) => root.clone(),
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            ProjectConfig::unconfigured(root)
        } else {
            let loader = match &self.profile {
                Some(profile) => ConfigLoader::new().with_profile(profile),
                None => ConfigLoader::new(),
            };
            let start = match &self.root {
                Some(root) => root.clone(),
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            loader
                .load_from_directory(&start)
                .with_context(|| format!("Failed to load project configuration from {}", start.display()))?
        };

        if let Some(src) = &self.src {
            project.source_dir = anchor(&project.root, src);
        }
        if let Some(out) = &self.out {
            project.output_dir = anchor(&project.root, out);
        }
        project.validate().context("Invalid project configuration")?;

        tracing::debug!(
            root = %project.root.display(),
            profile = %project.profile,
            src = %project.source_dir.display(),
            out = %project.output_dir.display(),
            remappings = project.remappings.len(),
            "loaded project"
        );
        Ok(project)
    }

    /// Cycle policy selected by `--allow-cycles`
    pub fn cycle_policy(&self) -> CyclePolicy {
        if self.allow_cycles {
            CyclePolicy::BestEffort
        } else {
            CyclePolicy::Reject
        }
    }

    /// Build configuration for a loaded project
    pub fn build_config(&self, project: &ProjectConfig) -> BuildConfig {
        BuildConfig {
            cycle_policy: self.cycle_policy(),
            ..BuildConfig::from_project(project)
        }
    }
}

/// Join a relative flag value onto the project root
fn anchor(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
