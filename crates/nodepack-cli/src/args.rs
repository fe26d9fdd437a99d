//! Args command implementation for nodepack CLI.
//!
//! Prints the compiler command line an entry point would be built with.

use std::path::Path;

use nodepack_core::{AssetId, CompilerConfig, CompilerInvocation, StagingArea, Toolchain};

/// Execute the args command.
pub fn execute(
    entry: &str,
    staging_dir: &Path,
    config: &CompilerConfig,
    toolchain: &Toolchain,
) -> anyhow::Result<()> {
    let entry = AssetId::parse(entry)?;
    let staging = StagingArea::new(staging_dir)?;
    let package_config = StagingArea::package_config_path(&entry);

    let invocation =
        CompilerInvocation::build(&entry, &package_config, &staging, config, toolchain);

    println!("cd {}", invocation.working_dir.display());
    println!("{}", invocation.command_line());
    Ok(())
}
