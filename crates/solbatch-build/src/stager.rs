//! Copying compiler output into a bundle directory
use crate::error::{BuildError, BuildResult};
use crate::path_resolver::canonical;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Mirrors the top-level entries of an output directory into a bundle
#[derive(Debug, Clone)]
pub struct ArtifactStager {
    output_dir: PathBuf,
    bundle_dir: PathBuf,
}

impl ArtifactStager {
    /// Create a stager copying `output_dir` into `bundle_dir`
    pub fn new(output_dir: impl Into<PathBuf>, bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            bundle_dir: bundle_dir.into(),
        }
    }

    /// Copy every entry, returning the number of files copied
    ///
    /// Existing files in the bundle are overwritten; files only present in
    /// the bundle are left alone. A single failed copy is logged and skipped.
    pub fn stage(&self) -> BuildResult<usize> {
        let entries = fs::read_dir(&self.output_dir)
            .map_err(|e| BuildError::directory_unreadable(&self.output_dir, e))?;

        let output = canonical(&self.output_dir);
        let bundle = resolve_through_existing(&self.bundle_dir);
        if bundle.starts_with(&output) {
            return Err(BuildError::BundleInsideOutput { bundle, output });
        }

        fs::create_dir_all(&self.bundle_dir).map_err(|e| BuildError::io(&self.bundle_dir, e))?;

        let mut names: Vec<_> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.file_name()),
                Err(e) => {
                    tracing::warn!(dir = %self.output_dir.display(), error = %e, "skipping unreadable entry");
                    None
                }
            })
            .collect();
        names.sort();

        let mut copied = 0;
        for name in names {
            let source = self.output_dir.join(&name);
            let target = self.bundle_dir.join(&name);
            copied += copy_entry(&source, &target);
        }

        tracing::info!(
            from = %self.output_dir.display(),
            to = %self.bundle_dir.display(),
            files = copied,
            "staged artifacts"
        );
        Ok(copied)
    }
}

/// Copy one top-level entry (file or directory tree); returns files copied
fn copy_entry(source: &Path, target: &Path) -> usize {
    let mut copied = 0;

    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %source.display(), error = %e, "failed to read artifact");
                continue;
            }
        };

        let relative = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
        let destination = target.join(relative);

        let result = if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
        } else {
            copy_file(entry.path(), &destination).map(|()| copied += 1)
        };

        if let Err(e) = result {
            tracing::warn!(
                from = %entry.path().display(),
                to = %destination.display(),
                error = %e,
                "failed to stage artifact"
            );
        }
    }

    copied
}

/// Canonical form of `path`, resolving symlinks in its deepest existing ancestor
fn resolve_through_existing(path: &Path) -> PathBuf {
    let absolute = canonical(path);
    for ancestor in absolute.ancestors() {
        if let Ok(resolved) = fs::canonicalize(ancestor) {
            let rest = absolute.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return resolved.join(rest);
        }
    }
    absolute
}

fn copy_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to).map(|_| ())
}
