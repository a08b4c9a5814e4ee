//! solbatch configuration
//!
//! Locates and parses the Foundry project configuration that drives a batch
//! build:
//! - `foundry.toml` profiles (`src`, `out`, `remappings`)
//! - Top-level `remappings` arrays
//! - `remappings.txt` next to `foundry.toml`
//!
//! # Profile selection
//!
//! Remappings are looked up in this order (first hit wins):
//! 1. `[profile.<active>]`, where the active profile comes from `FOUNDRY_PROFILE`
//! 2. `[profile.default]`
//! 3. A top-level `remappings = [...]` array
//! 4. `remappings.txt`
//!
//! # Example
//!
//! ```no_run
//! use solbatch_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("{} remappings", config.remappings.len());
//! ```

pub mod loader;
pub mod project;
pub mod remapping;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid remapping '{entry}': {reason}")]
    InvalidRemapping { entry: String, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{ConfigLoader, CONFIG_FILE_NAME, PROFILE_ENV_VAR};
pub use project::{ProfileSection, ProjectConfig};
pub use remapping::{Remapping, RemappingTable};
