//! Import remappings
//!
//! A remapping rewrites an aliased import such as `@openzeppelin/token/ERC20.sol`
//! into a real directory. Entries are written as `prefix=target`.

use crate::{ConfigError, ConfigResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single `prefix=target` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    /// Literal prefix matched against the start of an import string
    pub prefix: String,
    /// Directory the remainder of the import is joined onto
    pub target: PathBuf,
}

impl Remapping {
    /// Create a new remapping
    pub fn new(prefix: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
        }
    }

    /// Parse a `prefix=target` entry
    ///
    /// Both sides are trimmed. Only the first `=` splits the entry.
    pub fn parse(entry: &str) -> ConfigResult<Self> {
        let (prefix, target) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidRemapping {
                entry: entry.to_string(),
                reason: "expected 'prefix=target'".to_string(),
            })?;

        let prefix = prefix.trim();
        let target = target.trim();

        if prefix.is_empty() {
            return Err(ConfigError::InvalidRemapping {
                entry: entry.to_string(),
                reason: "prefix cannot be empty".to_string(),
            });
        }
        if target.is_empty() {
            return Err(ConfigError::InvalidRemapping {
                entry: entry.to_string(),
                reason: "target cannot be empty".to_string(),
            });
        }

        Ok(Self::new(prefix, target))
    }

    /// Strip this remapping's prefix from an import string
    pub fn strip<'a>(&self, import: &'a str) -> Option<&'a str> {
        import.strip_prefix(self.prefix.as_str())
    }
}

impl fmt::Display for Remapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.prefix, self.target.display())
    }
}

/// Ordered remapping table
///
/// Lookup is first-match in table order, never longest-match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemappingTable {
    entries: Vec<Remapping>,
}

impl RemappingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of `prefix=target` entries
    ///
    /// A prefix that appears twice keeps its first position but takes the
    /// later target.
    pub fn parse<I, S>(entries: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for entry in entries {
            table.insert(Remapping::parse(entry.as_ref())?);
        }
        Ok(table)
    }

    /// Parse the contents of a `remappings.txt` file
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn parse_lines(contents: &str) -> ConfigResult<Self> {
        Self::parse(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Insert a remapping, replacing the target of an existing equal prefix in place
    pub fn insert(&mut self, remapping: Remapping) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.prefix == remapping.prefix)
        {
            Some(existing) => existing.target = remapping.target,
            None => self.entries.push(remapping),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, prefix: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        self.insert(Remapping::new(prefix, target));
        self
    }

    /// First remapping whose prefix matches `import`
    pub fn find(&self, import: &str) -> Option<&Remapping> {
        self.entries.iter().find(|r| import.starts_with(&r.prefix))
    }

    /// Join every relative target onto `root`
    pub fn anchored_at(mut self, root: &Path) -> Self {
        for entry in &mut self.entries {
            if entry.target.is_relative() {
                entry.target = root.join(&entry.target);
            }
        }
        self
    }

    /// Iterate entries in table order
    pub fn iter(&self) -> impl Iterator<Item = &Remapping> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Remapping> for RemappingTable {
    fn from_iter<T: IntoIterator<Item = Remapping>>(iter: T) -> Self {
        let mut table = Self::new();
        for remapping in iter {
            table.insert(remapping);
        }
        table
    }
}

impl<'a> IntoIterator for &'a RemappingTable {
    type Item = &'a Remapping;
    type IntoIter = std::slice::Iter<'a, Remapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
