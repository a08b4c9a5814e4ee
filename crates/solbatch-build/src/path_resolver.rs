//! Import path resolution
//!
//! Turns a raw import string into a candidate filesystem path. Resolution
//! never fails; whether the candidate exists is the graph builder's concern.

use solbatch_config::RemappingTable;
use std::path::{Component, Path, PathBuf};

/// Resolves import strings against a remapping table
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    remappings: &'a RemappingTable,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver over the given table
    pub fn new(remappings: &'a RemappingTable) -> Self {
        Self { remappings }
    }

    /// Resolve `import` as written in `importing_file`
    ///
    /// 1. First remapping whose prefix matches: `target` joined with the rest.
    /// 2. Imports starting with `.`: relative to the importing file's directory.
    /// 3. Anything else is returned unchanged.
    pub fn resolve(&self, import: &str, importing_file: &Path) -> PathBuf {
        if let Some(remapping) = self.remappings.find(import) {
            // `@oz=lib/oz` maps `@oz/X.sol` like `@oz/=lib/oz/` does.
            let rest = remapping.strip(import).unwrap_or_default().trim_start_matches('/');
            let resolved = canonical(&remapping.target.join(rest));
            tracing::trace!(
                import,
                prefix = %remapping.prefix,
                resolved = %resolved.display(),
                "remapped import"
            );
            return resolved;
        }

        if import.starts_with('.') {
            let base = importing_file.parent().unwrap_or_else(|| Path::new(""));
            return canonical(&base.join(import));
        }

        PathBuf::from(import)
    }
}

/// Absolute, lexically normalized form of `path`
///
/// Symlinks are resolved when the path exists on disk.
pub fn canonical(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize(&absolute)
}

/// Collapse `.` and `..` components without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
