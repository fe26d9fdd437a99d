//! Module graph consumption.
//!
//! This module provides:
//! - Module descriptors as produced by the upstream module computation
//! - An immutable, arena-indexed module graph loadable from JSON
//! - Transitive closure resolution with unsupported-subgraph detection

mod graph;
mod types;

pub use graph::{ClosureOutcome, ModuleClosure, ModuleGraph};
pub use types::{Module, UnsupportedSubgraph};
