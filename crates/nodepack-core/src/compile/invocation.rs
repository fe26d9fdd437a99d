//! Compiler invocation building.
//!
//! Maps an entry point to the dart2js command line. Entry points under
//! `lib/` are addressed with `package:` URIs, everything else through the
//! multi-root scheme backed by the staging root:
//!
//! ```text
//! app|lib/server.dart  ──► package:app/server.dart         -opackages/app/server.dart.js
//! app|web/main.dart    ──► org-dartlang-app:///web/main.dart -oweb/main.dart.js
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::asset::{AssetId, LIBRARY_ROOT};
use crate::staging::StagingArea;

use super::toolchain::Toolchain;
use super::types::CompilerConfig;

/// A fully resolved compiler command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    /// Executable to spawn (the Dart VM)
    pub program: PathBuf,

    /// VM flags, compiler snapshot, then compiler arguments
    pub args: Vec<String>,

    /// Working directory (the staging root)
    pub working_dir: PathBuf,

    /// URI of the entry point as seen by the compiler
    pub entry_uri: String,

    /// Output path passed to `-o`, relative to the working directory
    pub output_path: String,

    /// Output asset for the bundle
    pub output_id: AssetId,

    /// Output asset for the source map
    pub source_map_id: AssetId,
}

impl CompilerInvocation {
    /// Build the invocation for `entry`.
    ///
    /// `package_config` is the package config path relative to the staging
    /// root. The result depends only on the arguments.
    pub fn build(
        entry: &AssetId,
        package_config: &str,
        staging: &StagingArea,
        config: &CompilerConfig,
        toolchain: &Toolchain,
    ) -> Self {
        let mut args = config.vm_args.clone();
        args.push(toolchain.compiler_snapshot().display().to_string());
        args.extend(compiler_arguments(
            entry,
            package_config,
            staging.root(),
            config,
            toolchain,
        ));

        Self {
            program: toolchain.dart(),
            args,
            working_dir: staging.root().to_path_buf(),
            entry_uri: entry_uri(entry, &config.multi_root_scheme),
            output_path: output_path(entry, &config.bundle_extension),
            output_id: entry.change_extension(&config.bundle_extension),
            source_map_id: entry.change_extension(&config.source_map_extension()),
        }
    }

    /// Absolute path of the bundle the compiler is told to write.
    pub fn output_file(&self) -> PathBuf {
        self.resolve(&self.output_path)
    }

    /// Absolute path where the compiler places the source map, if any.
    pub fn source_map_file(&self) -> PathBuf {
        self.resolve(&self.source_map_id.staging_path())
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.working_dir.clone(), |path, segment| path.join(segment))
    }

    /// A [`Command`] ready to spawn.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.working_dir);
        cmd
    }

    /// Human-readable command line, for logs and dry runs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// URI the compiler uses to load the entry point.
pub fn entry_uri(entry: &AssetId, multi_root_scheme: &str) -> String {
    match entry.path().strip_prefix(LIBRARY_ROOT) {
        Some(rest) => format!("package:{}/{}", entry.package(), rest),
        None => format!("{}:///{}", multi_root_scheme, entry.path()),
    }
}

/// Bundle path relative to the staging root.
///
/// The entry's extension is replaced by `bundle_extension`; library entries
/// land under `packages/<package>/`.
pub fn output_path(entry: &AssetId, bundle_extension: &str) -> String {
    entry.change_extension(bundle_extension).staging_path()
}

/// dart2js arguments, caller flags first and the entry URI last.
pub fn compiler_arguments(
    entry: &AssetId,
    package_config: &str,
    staging_root: &Path,
    config: &CompilerConfig,
    toolchain: &Toolchain,
) -> Vec<String> {
    let scheme = &config.multi_root_scheme;

    let mut args = config.compiler_args.clone();
    args.extend([
        format!("--libraries-spec={}", toolchain.libraries_spec().display()),
        format!("--packages={}:///{}", scheme, package_config),
        format!("--multi-root-scheme={}", scheme),
        format!("--multi-root={}", staging_root.display()),
        format!("-o{}", output_path(entry, &config.bundle_extension)),
        entry_uri(entry, scheme),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PACKAGE_CONFIG: &str = ".dart_tool/package_config_0123.json";

    #[test]
    fn test_entry_uri() {
        assert_eq!(
            entry_uri(&AssetId::new("app", "lib/server.dart"), "org-dartlang-app"),
            "package:app/server.dart"
        );
        assert_eq!(
            entry_uri(&AssetId::new("app", "web/main.dart"), "org-dartlang-app"),
            "org-dartlang-app:///web/main.dart"
        );
        assert_eq!(
            entry_uri(&AssetId::new("app", "bin/tool/run.dart"), "scratch"),
            "scratch:///bin/tool/run.dart"
        );
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(&AssetId::new("app", "lib/src/server.dart"), ".dart.js"),
            "packages/app/src/server.dart.js"
        );
        let path = output_path(&AssetId::new("app", "web/main.dart"), ".dart.js");
        assert_eq!(path, "web/main.dart.js");
        assert!(!path.starts_with('/'));
    }

    #[test]
    fn test_argument_order() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let staging = StagingArea::new(temp.path()).unwrap();
        let toolchain = Toolchain::new("/sdk");
        let config = CompilerConfig::default()
            .with_compiler_args(["--minify", "-O2"])
            .with_vm_options("--old_gen_heap_size=1024");
        let entry = AssetId::new("app", "web/main.dart");

        let invocation =
            CompilerInvocation::build(&entry, PACKAGE_CONFIG, &staging, &config, &toolchain);

        let root = staging.root().display().to_string();
        let expected = vec![
            "--old_gen_heap_size=1024".to_string(),
            toolchain.compiler_snapshot().display().to_string(),
            "--minify".to_string(),
            "-O2".to_string(),
            format!("--libraries-spec={}", toolchain.libraries_spec().display()),
            format!("--packages=org-dartlang-app:///{}", PACKAGE_CONFIG),
            "--multi-root-scheme=org-dartlang-app".to_string(),
            format!("--multi-root={}", root),
            "-oweb/main.dart.js".to_string(),
            "org-dartlang-app:///web/main.dart".to_string(),
        ];
        assert_eq!(invocation.args, expected);
        assert_eq!(invocation.program, toolchain.dart());
        assert_eq!(invocation.working_dir, staging.root());
        assert_eq!(invocation.output_id, AssetId::new("app", "web/main.dart.js"));
        assert_eq!(
            invocation.source_map_id,
            AssetId::new("app", "web/main.dart.js.map")
        );
        assert_eq!(
            invocation.output_file(),
            staging.root().join("web").join("main.dart.js")
        );
    }

    #[test]
    fn test_library_entry_invocation() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let staging = StagingArea::new(temp.path()).unwrap();
        let entry = AssetId::new("app", "lib/server.dart");

        let invocation = CompilerInvocation::build(
            &entry,
            PACKAGE_CONFIG,
            &staging,
            &CompilerConfig::default(),
            &Toolchain::new("/sdk"),
        );

        assert_eq!(invocation.entry_uri, "package:app/server.dart");
        assert_eq!(invocation.output_path, "packages/app/server.dart.js");
        assert_eq!(invocation.output_id, AssetId::new("app", "lib/server.dart.js"));
        assert_eq!(invocation.args.last().unwrap(), "package:app/server.dart");
        assert_eq!(
            invocation.output_file(),
            staging.path_for(&invocation.output_id)
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let staging = StagingArea::new(temp.path()).unwrap();
        let config = CompilerConfig::default().with_compiler_args(["--no-source-maps"]);
        let toolchain = Toolchain::new("/sdk");
        let entry = AssetId::new("app", "web/main.dart");

        let first = CompilerInvocation::build(&entry, PACKAGE_CONFIG, &staging, &config, &toolchain);
        let second = CompilerInvocation::build(&entry, PACKAGE_CONFIG, &staging, &config, &toolchain);
        assert_eq!(first, second);
        assert_eq!(first.command_line(), second.command_line());
    }
}
