//! Configuration Loader
//!
//! Finds `foundry.toml` and resolves the active profile.
//!
//! Profile precedence:
//! 1. Explicit profile passed by the caller (CLI flag) - highest priority
//! 2. `FOUNDRY_PROFILE` environment variable
//! 3. `default`

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration file name searched for by the loader
pub const CONFIG_FILE_NAME: &str = "foundry.toml";

/// Environment variable selecting the active profile
pub const PROFILE_ENV_VAR: &str = "FOUNDRY_PROFILE";

/// Configuration loader
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Profile override (takes precedence over `FOUNDRY_PROFILE`)
    profile: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { profile: None }
    }

    /// Force a specific profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find `foundry.toml`. A missing file is
    /// an error: remappings are required to resolve aliased imports.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<ProjectConfig> {
        let config_path = self
            .find_config_file(start_dir)
            .ok_or_else(|| ConfigError::NotFound(start_dir.join(CONFIG_FILE_NAME)))?;
        self.load_from_file(&config_path)
    }

    /// Load configuration from a specific `foundry.toml`
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<ProjectConfig> {
        let profile = self.active_profile();
        tracing::debug!(
            path = %config_path.display(),
            profile = %profile,
            "loading project configuration"
        );
        ProjectConfig::load_from_file(config_path, &profile)
    }

    /// Find `foundry.toml` by walking up the directory tree
    pub fn find_config_file(&self, start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Name of the profile that will be used
    pub fn active_profile(&self) -> String {
        if let Some(profile) = &self.profile {
            return profile.clone();
        }
        match env::var(PROFILE_ENV_VAR) {
            Ok(profile) if !profile.trim().is_empty() => profile.trim().to_string(),
            _ => "default".to_string(),
        }
    }
}
