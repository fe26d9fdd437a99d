//! Core engine for nodepack.
//!
//! Compiles one Dart entry point, with its transitive module graph, into a
//! standalone JavaScript bundle that runs under Node.js:
//! - Module closure resolution with unsupported-subgraph detection
//! - Staging of sources into a shared, collision-free working area
//! - dart2js invocation and result classification
//! - Node preamble injection and source map propagation

pub mod asset;
pub mod compile;
pub mod error;
pub mod module;
pub mod staging;

pub use asset::{AssetId, AssetReader, AssetWriter, FsAssets, MemoryAssets};
pub use compile::{
    BuiltArtifacts, CompileResult, CompilerConfig, CompilerInvocation, NodeBundleStep,
    StepOutcome, Toolchain,
};
pub use error::{Error, Result};
pub use module::{ClosureOutcome, Module, ModuleClosure, ModuleGraph, UnsupportedSubgraph};
pub use staging::StagingArea;
