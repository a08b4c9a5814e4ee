//! Project Configuration (foundry.toml)
//!
//! Reads the parts of `foundry.toml` that a batch build needs. Every other key
//! in the file is ignored, since Foundry owns the format.

use crate::remapping::RemappingTable;
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default source directory when no profile sets `src`
pub const DEFAULT_SOURCE_DIR: &str = "contracts";

/// Default output directory when no profile sets `out`
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// Name of the optional remappings file next to `foundry.toml`
pub const REMAPPINGS_FILE_NAME: &str = "remappings.txt";

/// Raw `foundry.toml` document
#[derive(Debug, Clone, Deserialize, Default)]
struct FoundryToml {
    #[serde(default)]
    profile: HashMap<String, ProfileSection>,

    #[serde(default)]
    remappings: Option<Vec<String>>,
}

/// One `[profile.<name>]` section
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProfileSection {
    /// Source directory
    #[serde(default)]
    pub src: Option<PathBuf>,

    /// Artifact output directory
    #[serde(default)]
    pub out: Option<PathBuf>,

    /// `prefix=target` remapping entries
    #[serde(default)]
    pub remappings: Option<Vec<String>>,
}

/// Resolved project configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Directory containing `foundry.toml`
    pub root: PathBuf,
    /// Active profile name
    pub profile: String,
    /// Absolute source directory
    pub source_dir: PathBuf,
    /// Absolute output directory
    pub output_dir: PathBuf,
    /// Remappings with targets anchored at `root`
    pub remappings: RemappingTable,
}

impl ProjectConfig {
    /// Configuration for a project with no `foundry.toml`
    pub fn unconfigured(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            source_dir: root.join(DEFAULT_SOURCE_DIR),
            output_dir: root.join(DEFAULT_OUTPUT_DIR),
            profile: "default".to_string(),
            remappings: RemappingTable::new(),
            root,
        }
    }

    /// Load project configuration from a `foundry.toml` file
    pub fn load_from_file(path: &Path, profile: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::from_toml_str(&content, &root, profile).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from `foundry.toml` contents rooted at `root`
    pub fn from_toml_str(content: &str, root: &Path, profile: &str) -> ConfigResult<Self> {
        let document: FoundryToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
                file: root.join(crate::CONFIG_FILE_NAME),
                error: e,
            })?;

        let active = document.profile.get(profile);
        let default = document.profile.get("default");

        let source_dir = active
            .and_then(|p| p.src.clone())
            .or_else(|| default.and_then(|p| p.src.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));
        let output_dir = active
            .and_then(|p| p.out.clone())
            .or_else(|| default.and_then(|p| p.out.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let entries = active
            .and_then(|p| p.remappings.as_ref())
            .or_else(|| default.and_then(|p| p.remappings.as_ref()))
            .or(document.remappings.as_ref());

        let remappings = match entries {
            Some(entries) => RemappingTable::parse(entries)?,
            None => load_remappings_file(root)?,
        };

        let config = Self {
            root: root.to_path_buf(),
            profile: profile.to_string(),
            source_dir: root.join(source_dir),
            output_dir: root.join(output_dir),
            remappings: remappings.anchored_at(root),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.source_dir == self.output_dir {
            return Err(ConfigError::InvalidValue {
                field: "out".to_string(),
                reason: "output directory cannot be the source directory".to_string(),
            });
        }
        Ok(())
    }
}

/// Read `remappings.txt` next to `foundry.toml`, if it exists
fn load_remappings_file(root: &Path) -> ConfigResult<RemappingTable> {
    let path = root.join(REMAPPINGS_FILE_NAME);
    if !path.is_file() {
        return Ok(RemappingTable::new());
    }
    tracing::debug!(path = %path.display(), "reading remappings file");
    let content = std::fs::read_to_string(&path)?;
    RemappingTable::parse_lines(&content)
}
