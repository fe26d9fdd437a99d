//! Types for module descriptors.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;

/// A compiled unit: its sources and the modules it depends on.
///
/// A module is identified by its primary source. Dependencies reference other
/// modules by their primary source as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Primary source, also the module identity
    pub primary_source: AssetId,

    /// Additional sources belonging to this module
    #[serde(default)]
    pub sources: Vec<AssetId>,

    /// Direct module dependencies (by primary source)
    #[serde(default)]
    pub dependencies: Vec<AssetId>,

    /// Whether every library in the module is available on the target
    #[serde(default = "default_supported", rename = "is_supported")]
    pub supported: bool,

    /// Libraries that import platform libraries the target lacks
    #[serde(default)]
    pub unsupported_libraries: Vec<AssetId>,
}

fn default_supported() -> bool {
    true
}

impl Module {
    /// Create a supported module with a single source and no dependencies.
    pub fn new(primary_source: AssetId) -> Self {
        Self {
            primary_source,
            sources: Vec::new(),
            dependencies: Vec::new(),
            supported: true,
            unsupported_libraries: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = AssetId>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = AssetId>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    /// Mark the module unsupported because of the given libraries.
    pub fn with_unsupported(mut self, libraries: impl IntoIterator<Item = AssetId>) -> Self {
        self.supported = false;
        self.unsupported_libraries.extend(libraries);
        self
    }

    pub fn id(&self) -> &AssetId {
        &self.primary_source
    }

    pub fn is_supported(&self) -> bool {
        self.supported && self.unsupported_libraries.is_empty()
    }

    /// Primary source followed by the remaining sources, without repeats.
    pub fn all_sources(&self) -> impl Iterator<Item = &AssetId> {
        std::iter::once(&self.primary_source)
            .chain(self.sources.iter().filter(|s| **s != self.primary_source))
    }

    /// Libraries to blame when this module is unsupported.
    ///
    /// Falls back to every source when the descriptor does not pin down the
    /// exact libraries.
    pub fn offending_libraries(&self) -> Vec<&AssetId> {
        if self.is_supported() {
            Vec::new()
        } else if !self.unsupported_libraries.is_empty() {
            self.unsupported_libraries.iter().collect()
        } else {
            self.all_sources().collect()
        }
    }
}

/// Libraries that keep an entry point from compiling on the target.
///
/// Not a failure: the entry point is skipped for this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedSubgraph {
    entry: AssetId,
    libraries: Vec<AssetId>,
}

impl UnsupportedSubgraph {
    /// Libraries are sorted and deduplicated.
    pub fn new(entry: AssetId, libraries: impl IntoIterator<Item = AssetId>) -> Self {
        let libraries: BTreeSet<_> = libraries.into_iter().collect();
        Self {
            entry,
            libraries: libraries.into_iter().collect(),
        }
    }

    pub fn entry(&self) -> &AssetId {
        &self.entry
    }

    pub fn libraries(&self) -> &[AssetId] {
        &self.libraries
    }
}

impl fmt::Display for UnsupportedSubgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.libraries.iter().map(ToString::to_string).collect();
        write!(f, "{}", names.join(", "))
    }
}
