//! Closure command implementation for nodepack CLI.

use std::path::Path;

use anyhow::Context;
use nodepack_core::{AssetId, ClosureOutcome, ModuleGraph};

/// Print the modules an entry point needs, or the libraries blocking it.
pub fn execute(entry: &str, graph_path: &Path) -> anyhow::Result<()> {
    let entry = AssetId::parse(entry)?;
    let graph = ModuleGraph::load(graph_path)
        .with_context(|| format!("Failed to load module graph {}", graph_path.display()))?;

    match graph.closure(&entry)? {
        ClosureOutcome::Resolved(closure) => {
            for id in closure.module_ids() {
                println!("{}", id);
            }
        }
        ClosureOutcome::Unsupported(subgraph) => {
            println!("Unsupported libraries reachable from {}:", entry);
            for library in subgraph.libraries() {
                println!("  {}", library);
            }
        }
    }

    Ok(())
}
