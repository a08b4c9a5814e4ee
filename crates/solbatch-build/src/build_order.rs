//! Build order computation using depth-first postorder
use crate::error::{BuildError, BuildResult};
use crate::graph::DependencyGraph;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Files in the order they should be compiled
pub type BuildOrder = Vec<PathBuf>;

/// What to do when the graph contains a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Fail with [`BuildError::CycleDetected`]
    #[default]
    Reject,
    /// Warn, break the cycle at the back edge and keep going
    ///
    /// Every node still appears exactly once, but a node on the cycle may come
    /// before one of its dependencies.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Produces a build order from a dependency graph
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalOrderer {
    policy: CyclePolicy,
}

impl TopologicalOrderer {
    /// Create an orderer with the given cycle policy
    pub fn new(policy: CyclePolicy) -> Self {
        Self { policy }
    }

    /// Compute the build order
    ///
    /// Roots are visited in graph order and dependencies in edge-set order; a
    /// node is appended after all of its dependencies. Dependencies that are
    /// not graph keys (files outside the source root) are included too.
    pub fn order(&self, graph: &DependencyGraph) -> BuildResult<BuildOrder> {
        let empty = IndexSet::new();
        let mut marks: HashMap<&Path, Mark> = HashMap::with_capacity(graph.len());
        let mut order = Vec::with_capacity(graph.len());

        for root in graph.files() {
            if marks.contains_key(root.as_path()) {
                continue;
            }

            marks.insert(root.as_path(), Mark::InProgress);
            let mut stack: Vec<(&Path, usize)> = vec![(root.as_path(), 0)];

            while let Some((node, next)) = stack.last_mut() {
                let dependencies = graph.dependencies(*node).unwrap_or(&empty);

                let Some(dependency) = dependencies.get_index(*next) else {
                    let node = *node;
                    stack.pop();
                    marks.insert(node, Mark::Done);
                    order.push(node.to_path_buf());
                    continue;
                };
                *next += 1;

                match marks.get(dependency.as_path()) {
                    None => {
                        marks.insert(dependency.as_path(), Mark::InProgress);
                        stack.push((dependency.as_path(), 0));
                    }
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => {
                        let cycle = cycle_path(&stack, dependency);
                        match self.policy {
                            CyclePolicy::Reject => return Err(BuildError::cycle(&cycle)),
                            CyclePolicy::BestEffort => {
                                tracing::warn!(
                                    cycle = %BuildError::cycle(&cycle),
                                    "breaking dependency cycle; order across it is not guaranteed"
                                );
                            }
                        }
                    }
                }
            }
        }

        Ok(order)
    }

    /// Group a build order into dependency levels
    ///
    /// Level 0 holds files with no dependencies; every other file sits one
    /// level above its deepest dependency. Files in a level keep their
    /// relative build-order position and never depend on each other.
    pub fn levels(&self, graph: &DependencyGraph, order: &[PathBuf]) -> Vec<Vec<PathBuf>> {
        let mut level_of: HashMap<&Path, usize> = HashMap::with_capacity(order.len());
        let mut levels: Vec<Vec<PathBuf>> = Vec::new();

        for file in order {
            let level = graph
                .dependencies(file)
                .into_iter()
                .flatten()
                .filter_map(|dep| level_of.get(dep.as_path()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);

            level_of.insert(file.as_path(), level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(file.clone());
        }

        levels
    }
}

/// Stack suffix from `target` back around to `target`
fn cycle_path(stack: &[(&Path, usize)], target: &Path) -> Vec<PathBuf> {
    let start = stack
        .iter()
        .position(|(node, _)| *node == target)
        .unwrap_or(0);
    stack[start..]
        .iter()
        .map(|(node, _)| node.to_path_buf())
        .chain(std::iter::once(target.to_path_buf()))
        .collect()
}
