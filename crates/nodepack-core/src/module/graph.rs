//! Module graph and transitive closure resolution.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::error::{Error, Result};

use super::types::{Module, UnsupportedSubgraph};

/// On-disk form of a module graph.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GraphManifest {
    modules: Vec<Module>,
}

/// Immutable module dependency graph.
///
/// Edges point from a module to the modules it depends on. The upstream
/// module computation guarantees a DAG, so no cycle check is done here.
#[derive(Debug)]
pub struct ModuleGraph {
    /// Node weights are the module descriptors
    graph: DiGraph<Module, ()>,
    /// Module identity to node index
    node_indices: FxHashMap<AssetId, NodeIndex>,
    /// Any contributed source to its owning module
    by_source: FxHashMap<AssetId, NodeIndex>,
    /// Dependencies naming modules that are not in the graph
    dangling: FxHashMap<NodeIndex, Vec<AssetId>>,
}

/// Result of resolving an entry point's closure.
#[derive(Debug, Clone)]
pub enum ClosureOutcome {
    /// Every reachable module is supported on the target.
    Resolved(ModuleClosure),
    /// At least one reachable module is not; the entry point is skipped.
    Unsupported(UnsupportedSubgraph),
}

/// All modules reachable from an entry point, including its own module.
#[derive(Debug, Clone)]
pub struct ModuleClosure {
    entry: AssetId,
    /// Sorted by module identity
    modules: Vec<Module>,
}

impl ModuleGraph {
    /// Build a graph from module descriptors.
    ///
    /// # Errors
    ///
    /// Returns an error if two descriptors share an identity.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = FxHashMap::default();
        let mut by_source = FxHashMap::default();

        for module in modules {
            let id = module.id().clone();
            if node_indices.contains_key(&id) {
                return Err(Error::ModuleGraph(format!("duplicate module {}", id)));
            }
            let idx = graph.add_node(module);
            for source in graph[idx].all_sources() {
                by_source.entry(source.clone()).or_insert(idx);
            }
            node_indices.insert(id, idx);
        }

        // Second pass: edges, once every node exists
        let mut edges_to_add = Vec::new();
        let mut dangling: FxHashMap<NodeIndex, Vec<AssetId>> = FxHashMap::default();
        for idx in graph.node_indices() {
            for dep in &graph[idx].dependencies {
                match node_indices.get(dep) {
                    Some(&dep_idx) => edges_to_add.push((idx, dep_idx)),
                    None => dangling.entry(idx).or_default().push(dep.clone()),
                }
            }
        }
        for (from, to) in edges_to_add {
            graph.update_edge(from, to, ());
        }

        Ok(Self {
            graph,
            node_indices,
            by_source,
            dangling,
        })
    }

    /// Parse a JSON manifest of the form `{"modules": [...]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: GraphManifest = serde_json::from_str(json)?;
        Self::from_modules(manifest.modules)
    }

    /// Load a JSON manifest from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the graph back to its manifest form.
    pub fn to_json(&self) -> Result<String> {
        let manifest = GraphManifest {
            modules: self.graph.node_weights().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&manifest)?)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Module by identity.
    pub fn get(&self, id: &AssetId) -> Option<&Module> {
        self.node_indices.get(id).map(|&idx| &self.graph[idx])
    }

    /// Module that contributes the given source.
    pub fn module_for_source(&self, source: &AssetId) -> Option<&Module> {
        self.by_source.get(source).map(|&idx| &self.graph[idx])
    }

    /// Resolve the closure of the module owning `entry`.
    ///
    /// Traversal continues through unsupported modules so that every
    /// offending library is reported at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingModule`] if `entry` has no module or a
    /// reachable module depends on one that is absent from the graph.
    pub fn closure(&self, entry: &AssetId) -> Result<ClosureOutcome> {
        let &start = self.by_source.get(entry).ok_or_else(|| Error::MissingModule {
            module: entry.clone(),
            required_by: None,
        })?;

        let mut visited = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::from([start]);
        let mut reached = Vec::new();
        visited[start.index()] = true;

        while let Some(idx) = queue.pop_front() {
            if let Some(missing) = self.dangling.get(&idx).and_then(|deps| deps.first()) {
                return Err(Error::MissingModule {
                    module: missing.clone(),
                    required_by: Some(self.graph[idx].id().clone()),
                });
            }

            reached.push(idx);
            for next in self.graph.neighbors(idx) {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    queue.push_back(next);
                }
            }
        }

        let offending: Vec<AssetId> = reached
            .iter()
            .flat_map(|&idx| self.graph[idx].offending_libraries())
            .cloned()
            .collect();

        if !offending.is_empty() {
            return Ok(ClosureOutcome::Unsupported(UnsupportedSubgraph::new(
                entry.clone(),
                offending,
            )));
        }

        let mut modules: Vec<Module> = reached.iter().map(|&idx| self.graph[idx].clone()).collect();
        modules.sort_by(|a, b| a.id().cmp(b.id()));

        Ok(ClosureOutcome::Resolved(ModuleClosure {
            entry: entry.clone(),
            modules,
        }))
    }
}

impl ModuleClosure {
    pub fn entry(&self) -> &AssetId {
        &self.entry
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, module: &AssetId) -> bool {
        self.modules
            .binary_search_by(|m| m.id().cmp(module))
            .is_ok()
    }

    /// Module identities, sorted.
    pub fn module_ids(&self) -> impl Iterator<Item = &AssetId> {
        self.modules.iter().map(Module::id)
    }

    /// Every source contributed by the closure.
    pub fn sources(&self) -> BTreeSet<AssetId> {
        self.modules
            .iter()
            .flat_map(Module::all_sources)
            .cloned()
            .collect()
    }

    /// Packages contributing sources, plus the entry point's package.
    pub fn packages(&self) -> BTreeSet<String> {
        self.modules
            .iter()
            .flat_map(Module::all_sources)
            .map(|s| s.package().to_string())
            .chain(std::iter::once(self.entry.package().to_string()))
            .collect()
    }
}
