//! nodepack CLI - Compile Dart entry points into standalone Node.js bundles.

mod args;
mod build;
mod closure;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nodepack_core::{CompilerConfig, Toolchain};

/// Environment variable holding extra Dart VM flags.
const VM_OPTIONS_ENV: &str = "DART_VM_OPTIONS";

#[derive(Parser)]
#[command(name = "nodepack")]
#[command(about = "Compile Dart entry points into standalone Node.js bundles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an entry point and write its bundle
    Build {
        /// Entry point asset id (`package|path`)
        entry: String,

        /// Module graph manifest (JSON)
        #[arg(long)]
        graph: PathBuf,

        /// Package root, as `name=dir` (repeatable)
        #[arg(short, long = "package", value_name = "NAME=DIR")]
        packages: Vec<String>,

        /// Staging directory (default: a temporary directory)
        #[arg(long)]
        staging_dir: Option<PathBuf>,

        /// Directory receiving the bundle and source map
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Dart SDK root (default: detected from `dart` on PATH)
        #[arg(long)]
        sdk: Option<PathBuf>,

        /// Extra compiler flag (repeatable)
        #[arg(long = "arg", value_name = "FLAG", allow_hyphen_values = true)]
        compiler_args: Vec<String>,
    },

    /// Print the module closure of an entry point
    Closure {
        /// Entry point asset id (`package|path`)
        entry: String,

        /// Module graph manifest (JSON)
        #[arg(long)]
        graph: PathBuf,
    },

    /// Print the compiler command line without running it
    Args {
        /// Entry point asset id (`package|path`)
        entry: String,

        /// Staging directory the compiler would run in
        #[arg(long)]
        staging_dir: PathBuf,

        /// Dart SDK root (default: detected from `dart` on PATH)
        #[arg(long)]
        sdk: Option<PathBuf>,

        /// Extra compiler flag (repeatable)
        #[arg(long = "arg", value_name = "FLAG", allow_hyphen_values = true)]
        compiler_args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let vm_options = std::env::var(VM_OPTIONS_ENV).unwrap_or_default();

    match cli.command {
        Commands::Build {
            entry,
            graph,
            packages,
            staging_dir,
            output_dir,
            sdk,
            compiler_args,
        } => {
            let config = compiler_config(compiler_args, &vm_options);
            let toolchain = match sdk {
                Some(root) => Toolchain::from_sdk_root(root).context("Invalid Dart SDK")?,
                None => Toolchain::detect().context("Could not locate the Dart SDK")?,
            };
            build::execute(build::BuildOptions {
                entry: &entry,
                graph: &graph,
                packages: &packages,
                staging_dir: staging_dir.as_deref(),
                output_dir: &output_dir,
                config,
                toolchain,
            })?;
        }

        Commands::Closure { entry, graph } => {
            closure::execute(&entry, &graph)?;
        }

        Commands::Args {
            entry,
            staging_dir,
            sdk,
            compiler_args,
        } => {
            let config = compiler_config(compiler_args, &vm_options);
            // A dry run only needs paths, so the SDK layout is not checked
            let toolchain = match sdk {
                Some(root) => Toolchain::new(root),
                None => Toolchain::detect().context("Could not locate the Dart SDK")?,
            };
            args::execute(&entry, &staging_dir, &config, &toolchain)?;
        }
    }

    Ok(())
}

fn compiler_config(compiler_args: Vec<String>, vm_options: &str) -> CompilerConfig {
    CompilerConfig::default()
        .with_compiler_args(compiler_args)
        .with_vm_options(vm_options)
}
