//! The Node.js bundle build step.
//!
//! Runs one entry point through the whole pipeline: closure, staging,
//! compilation, preamble injection and output publication.

use crate::asset::{AssetId, AssetReader, AssetWriter};
use crate::error::{Error, Result};
use crate::module::{ClosureOutcome, ModuleGraph, UnsupportedSubgraph};
use crate::staging::StagingArea;

use super::invocation::CompilerInvocation;
use super::output::{BuiltArtifacts, publish_outputs};
use super::preamble::inject_preamble;
use super::toolchain::Toolchain;
use super::types::CompilerConfig;

/// Result of running the step for one entry point.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The bundle (and possibly its source map) was written.
    Built(BuiltArtifacts),

    /// The entry point depends on libraries the target lacks; nothing was
    /// written.
    Skipped(UnsupportedSubgraph),
}

impl StepOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built(_))
    }

    pub fn artifacts(&self) -> Option<&BuiltArtifacts> {
        match self {
            Self::Built(artifacts) => Some(artifacts),
            Self::Skipped(_) => None,
        }
    }
}

/// Compiles entry points to Node.js bundles with dart2js.
///
/// Holds no per-invocation state, so one step can serve many entry points
/// concurrently.
#[derive(Debug, Clone)]
pub struct NodeBundleStep {
    /// Compiler configuration
    config: CompilerConfig,

    /// Dart SDK
    toolchain: Toolchain,
}

impl NodeBundleStep {
    pub fn new(config: CompilerConfig, toolchain: Toolchain) -> Self {
        Self { config, toolchain }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Compile `entry` and write its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entry or a reachable dependency has no module
    /// - Sources cannot be staged
    /// - The compiler cannot be spawned, fails, or produces no output
    ///
    /// An unsupported subgraph is not an error: it is logged as a warning
    /// and returned as [`StepOutcome::Skipped`].
    pub fn run(
        &self,
        entry: &AssetId,
        graph: &ModuleGraph,
        staging: &StagingArea,
        reader: &dyn AssetReader,
        writer: &dyn AssetWriter,
    ) -> Result<StepOutcome> {
        let _span = tracing::info_span!("dart2js", entry = %entry).entered();

        let closure = match graph.closure(entry)? {
            ClosureOutcome::Resolved(closure) => closure,
            ClosureOutcome::Unsupported(subgraph) => {
                tracing::warn!(
                    libraries = %subgraph,
                    "Skipping compiling {} with dart2js because some of its transitive libraries \
                     have SDK dependencies that are not supported on this platform",
                    entry
                );
                return Ok(StepOutcome::Skipped(subgraph));
            }
        };

        staging.ensure_closure(&closure, reader)?;
        let package_config = staging.write_package_config(&closure)?;

        let invocation =
            CompilerInvocation::build(entry, &package_config, staging, &self.config, &self.toolchain);
        invocation.clear_stale_outputs()?;

        let result = invocation.run()?;
        if !result.succeeded() {
            tracing::error!(
                exit_code = ?result.exit_code,
                output_missing = !result.output_exists,
                "dart2js failed for {}:\n{}",
                entry,
                result.combined_output()
            );
            return Err(Error::CompilerProcess {
                entry: entry.clone(),
                exit_code: result.exit_code,
                output_missing: !result.output_exists,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        if !result.stdout.trim().is_empty() {
            tracing::info!("{}", result.stdout.trim_end());
        }

        inject_preamble(&invocation.output_file(), &self.config.preamble)?;
        let artifacts = publish_outputs(&invocation, staging, writer)?;

        tracing::info!(
            "Compiled {} to {} in {}ms",
            entry,
            artifacts.bundle,
            result.duration.as_millis()
        );
        Ok(StepOutcome::Built(artifacts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssets;
    use crate::module::Module;
    use tempfile::TempDir;

    #[test]
    fn test_unsupported_entry_is_skipped_before_staging() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let staging = StagingArea::new(temp.path().join("scratch")).unwrap();
        let main = AssetId::new("app", "web/main.dart");
        let io = AssetId::new("app", "lib/io.dart");
        let graph = ModuleGraph::from_modules([
            Module::new(main.clone()).with_dependencies([io.clone()]),
            Module::new(io.clone()).with_unsupported([io.clone()]),
        ])
        .unwrap();

        // The SDK does not exist; a skipped entry must never reach it
        let step = NodeBundleStep::new(CompilerConfig::default(), Toolchain::new("/missing-sdk"));
        let assets = MemoryAssets::new();
        let outcome = step.run(&main, &graph, &staging, &assets, &assets).unwrap();

        match outcome {
            StepOutcome::Skipped(subgraph) => assert_eq!(subgraph.libraries(), &[io]),
            StepOutcome::Built(_) => panic!("expected skip"),
        }
        assert!(assets.is_empty());
        assert!(!staging.root().join("web").exists());
    }

    #[test]
    fn test_staging_failure_propagates() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let staging = StagingArea::new(temp.path()).unwrap();
        let main = AssetId::new("app", "web/main.dart");
        let graph = ModuleGraph::from_modules([Module::new(main.clone())]).unwrap();

        let step = NodeBundleStep::new(CompilerConfig::default(), Toolchain::new("/missing-sdk"));
        let assets = MemoryAssets::new();
        let result = step.run(&main, &graph, &staging, &assets, &assets);

        assert!(matches!(result, Err(Error::Staging { .. })));
        assert!(assets.is_empty());
    }
}
