//! Compilation pipeline for Node.js bundles.
//!
//! This module provides:
//! - Toolchain discovery (Dart SDK, dart2js snapshot)
//! - Compiler invocation building (entry URI, output path, flags)
//! - Process execution and result classification
//! - Post-processing (Node preamble, source map propagation)
//!
//! # Architecture
//!
//! ```text
//! Entry point (app|web/main.dart)
//!     │
//!     ├── ModuleGraph::closure ──► StagingArea::ensure_closure ──► package_config_<hash>.json
//!     │
//!     └── CompilerInvocation ──► dart dart2js.dart.snapshot ... ──► web/main.dart.js
//!                                                                      │
//!                                              inject_preamble ◄───────┘
//!                                                     │
//!                                                     └──► AssetWriter (+ .dart.js.map if present)
//! ```

mod invocation;
mod output;
mod preamble;
mod process;
mod step;
mod toolchain;
mod types;

pub use invocation::{CompilerInvocation, compiler_arguments, entry_uri, output_path};
pub use output::{BuiltArtifacts, publish_outputs};
pub use preamble::{NODE_PREAMBLE, inject_preamble};
pub use step::{NodeBundleStep, StepOutcome};
pub use toolchain::Toolchain;
pub use types::{CompileResult, CompilerConfig};
