//! Build command implementation for nodepack CLI.
//!
//! Compiles one entry point and writes its bundle to the output directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use nodepack_core::{
    AssetId, CompilerConfig, FsAssets, ModuleGraph, NodeBundleStep, StagingArea, StepOutcome,
    Toolchain,
};
use tempfile::TempDir;

/// Inputs of the build command.
pub struct BuildOptions<'a> {
    pub entry: &'a str,
    pub graph: &'a Path,
    pub packages: &'a [String],
    pub staging_dir: Option<&'a Path>,
    pub output_dir: &'a Path,
    pub config: CompilerConfig,
    pub toolchain: Toolchain,
}

/// Execute the build command.
pub fn execute(options: BuildOptions<'_>) -> anyhow::Result<()> {
    let start = Instant::now();

    let entry = AssetId::parse(options.entry)?;
    let graph = ModuleGraph::load(options.graph)
        .with_context(|| format!("Failed to load module graph {}", options.graph.display()))?;

    let mut assets = FsAssets::new(options.output_dir);
    for package in options.packages {
        let (name, root) = parse_package(package)?;
        assets = assets.with_package(name, root);
    }

    // Keep the temporary directory alive until the step finishes
    let (_scratch, staging) = match options.staging_dir {
        Some(dir) => (None, StagingArea::new(dir)?),
        None => {
            let scratch = TempDir::new().context("Failed to create staging directory")?;
            let staging = StagingArea::new(scratch.path())?;
            (Some(scratch), staging)
        }
    };

    let step = NodeBundleStep::new(options.config, options.toolchain);
    let outcome = step
        .run(&entry, &graph, &staging, &assets, &assets)
        .with_context(|| format!("Failed to compile {}", entry))?;

    match outcome {
        StepOutcome::Built(artifacts) => {
            println!(
                "Compiled {} in {:.2}s",
                entry,
                start.elapsed().as_secs_f64()
            );
            println!("  {}", assets.output_path(&artifacts.bundle).display());
            if let Some(map) = &artifacts.source_map {
                println!("  {}", assets.output_path(map).display());
            }
        }
        StepOutcome::Skipped(subgraph) => {
            println!("Skipped {} (unsupported libraries: {})", entry, subgraph);
        }
    }

    Ok(())
}

/// Split a `name=dir` package argument.
fn parse_package(spec: &str) -> anyhow::Result<(&str, PathBuf)> {
    match spec.split_once('=') {
        Some((name, dir)) if !name.is_empty() && !dir.is_empty() => Ok((name, PathBuf::from(dir))),
        _ => anyhow::bail!("Invalid package `{}`, expected NAME=DIR", spec),
    }
}
