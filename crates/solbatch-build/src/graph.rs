//! Source discovery and dependency graph construction
use crate::error::{BuildError, BuildResult};
use crate::imports;
use crate::path_resolver::{canonical, PathResolver};
use indexmap::{IndexMap, IndexSet};
use solbatch_config::RemappingTable;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recognized source file extension
pub const SOURCE_EXTENSION: &str = "sol";

/// File-to-file dependency graph
///
/// Keys and edge sets keep insertion order, so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: IndexMap<PathBuf, IndexSet<PathBuf>>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with its dependencies, replacing any previous edge set
    pub fn insert(&mut self, file: PathBuf, dependencies: IndexSet<PathBuf>) {
        self.edges.insert(file, dependencies);
    }

    /// Builder-style insert
    pub fn with_node<I, P>(mut self, file: impl Into<PathBuf>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.insert(
            file.into(),
            dependencies.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Dependencies of `file`, if it is a node
    pub fn dependencies(&self, file: &Path) -> Option<&IndexSet<PathBuf>> {
        self.edges.get(file)
    }

    /// Check if `file` is a node
    pub fn contains(&self, file: &Path) -> bool {
        self.edges.contains_key(file)
    }

    /// Nodes in insertion order
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.edges.keys()
    }

    /// Nodes with their edge sets, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &IndexSet<PathBuf>)> {
        self.edges.iter()
    }

    /// Get node count
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }
}

/// Discovers sources and resolves their imports into a [`DependencyGraph`]
pub struct GraphBuilder<'a> {
    resolver: PathResolver<'a>,
}

impl<'a> GraphBuilder<'a> {
    /// Create a graph builder using the given remappings
    pub fn new(remappings: &'a RemappingTable) -> Self {
        Self {
            resolver: PathResolver::new(remappings),
        }
    }

    /// Discover every source under `root` and build the graph
    pub fn build(&self, root: &Path) -> BuildResult<DependencyGraph> {
        let sources = discover_sources(root)?;
        tracing::info!(
            root = %root.display(),
            files = sources.len(),
            "discovered source files"
        );

        let mut graph = DependencyGraph::new();
        for source in sources {
            let dependencies = self.dependencies_of(&source);
            graph.insert(source, dependencies);
        }

        tracing::debug!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        Ok(graph)
    }

    /// Resolved, existing source dependencies of one file
    fn dependencies_of(&self, source: &Path) -> IndexSet<PathBuf> {
        let mut dependencies = IndexSet::new();

        for import in imports::scan_file(source) {
            let resolved = self.resolver.resolve(&import, source);

            if !is_source_file(&resolved) || !resolved.is_file() {
                tracing::debug!(
                    file = %source.display(),
                    import = %import,
                    resolved = %resolved.display(),
                    "dropping unresolved import"
                );
                continue;
            }

            let resolved = canonical(&resolved);
            if resolved != source {
                dependencies.insert(resolved);
            }
        }

        dependencies
    }
}

/// Every `.sol` file under `root`, canonicalized, in sorted walk order
///
/// Directory symlinks are not followed, so link cycles cannot loop the walk.
/// A symlink to a `.sol` file is included under its target's path, once.
pub fn discover_sources(root: &Path) -> BuildResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(BuildError::directory_unreadable(
            root,
            "source root does not exist or is not a directory",
        ));
    }

    let mut sources = Vec::new();
    let mut seen = HashSet::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            BuildError::directory_unreadable(path, e)
        })?;

        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
        if is_file && is_source_file(entry.path()) {
            let source = canonical(entry.path());
            if seen.insert(source.clone()) {
                sources.push(source);
            }
        }
    }

    Ok(sources)
}

/// Check the file name ends in `.sol`
pub fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
}
