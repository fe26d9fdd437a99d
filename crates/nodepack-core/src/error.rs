//! Error types for nodepack-core.

use thiserror::Error;

use crate::asset::AssetId;

/// Result type for nodepack-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nodepack-core.
///
/// An unsupported subgraph is not an error: it is reported through
/// [`crate::module::ClosureOutcome::Unsupported`] and leads to a skipped step.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed `package|path` asset identity.
    #[error("invalid asset id: {0}")]
    InvalidAssetId(String),

    /// A module referenced by the graph has no descriptor.
    #[error("missing module {module}{}", required_by.as_ref().map(|id| format!(" (required by {})", id)).unwrap_or_default())]
    MissingModule {
        module: AssetId,
        required_by: Option<AssetId>,
    },

    /// The module graph manifest is inconsistent.
    #[error("module graph error: {0}")]
    ModuleGraph(String),

    /// The asset reader cannot provide an asset.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// Materializing sources into the staging area failed.
    #[error("failed to stage {asset}: {source}")]
    Staging {
        asset: AssetId,
        #[source]
        source: Box<Error>,
    },

    /// The compiler exited non-zero or did not produce its declared output.
    #[error("compilation failed for {entry}: {}", describe_failure(*exit_code, *output_missing))]
    CompilerProcess {
        entry: AssetId,
        exit_code: Option<i32>,
        output_missing: bool,
        stdout: String,
        stderr: String,
    },

    /// Toolchain error (missing SDK, spawn failure).
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_failure(exit_code: Option<i32>, output_missing: bool) -> String {
    match exit_code {
        Some(0) if output_missing => "exited successfully but produced no output".to_string(),
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
