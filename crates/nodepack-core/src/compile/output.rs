//! Output resolution: handing finished artifacts to the build runtime.

use crate::asset::{AssetId, AssetWriter};
use crate::error::Result;
use crate::staging::StagingArea;

use super::invocation::CompilerInvocation;

/// Artifacts copied out of the staging area for one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifacts {
    /// The JavaScript bundle
    pub bundle: AssetId,

    /// The source map, when the compiler produced one
    pub source_map: Option<AssetId>,
}

/// Copy the finished bundle and, if present, its source map to `writer`.
///
/// Must only be called once the bundle is complete (compiled and
/// preamble-injected).
pub fn publish_outputs(
    invocation: &CompilerInvocation,
    staging: &StagingArea,
    writer: &dyn AssetWriter,
) -> Result<BuiltArtifacts> {
    staging.copy_output(&invocation.output_id, writer)?;

    let source_map = staging
        .copy_output_if_exists(&invocation.source_map_id, writer)?
        .then(|| invocation.source_map_id.clone());

    if source_map.is_none() {
        tracing::debug!("No source map produced for {}", invocation.output_id);
    }

    Ok(BuiltArtifacts {
        bundle: invocation.output_id.clone(),
        source_map,
    })
}
