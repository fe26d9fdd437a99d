//! Common types for the compilation pipeline.

use std::time::Duration;

use super::preamble::NODE_PREAMBLE;

/// Configuration for the compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Virtual URI scheme mapped onto the staging root
    pub multi_root_scheme: String,

    /// Extension of the generated bundle, replacing the entry's extension
    pub bundle_extension: String,

    /// Additional dart2js flags, passed before the generated ones
    pub compiler_args: Vec<String>,

    /// Dart VM flags, passed before the compiler snapshot
    pub vm_args: Vec<String>,

    /// Text prepended to every bundle
    pub preamble: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            multi_root_scheme: "org-dartlang-app".to_string(),
            bundle_extension: ".dart.js".to_string(),
            compiler_args: Vec::new(),
            vm_args: Vec::new(),
            preamble: NODE_PREAMBLE.to_string(),
        }
    }
}

impl CompilerConfig {
    /// Append dart2js flags.
    pub fn with_compiler_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.compiler_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set VM flags from a space-delimited string (such as the value of
    /// `DART_VM_OPTIONS`).
    pub fn with_vm_options(mut self, options: &str) -> Self {
        self.vm_args = options.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn with_bundle_extension(mut self, extension: impl Into<String>) -> Self {
        self.bundle_extension = extension.into();
        self
    }

    /// Extension of the source map, which dart2js always writes next to the
    /// bundle as `<bundle>.map`.
    pub fn source_map_extension(&self) -> String {
        format!("{}.map", self.bundle_extension)
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    pub fn with_multi_root_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.multi_root_scheme = scheme.into();
        self
    }
}

/// Outcome of running the compiler process.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Whether the declared output file exists after the process exited
    pub output_exists: bool,

    /// Wall time spent in the compiler
    pub duration: Duration,
}

impl CompileResult {
    /// A zero exit code alone is not trusted; the output must exist too.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && self.output_exists
    }

    /// Both streams, for diagnostics.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_code: Option<i32>, output_exists: bool) -> CompileResult {
        CompileResult {
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            output_exists,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.multi_root_scheme, "org-dartlang-app");
        assert_eq!(config.bundle_extension, ".dart.js");
        assert_eq!(config.source_map_extension(), ".dart.js.map");
        assert!(config.vm_args.is_empty());
        assert!(!config.preamble.is_empty());
    }

    #[test]
    fn test_source_map_follows_bundle_extension() {
        let config = CompilerConfig::default().with_bundle_extension(".js");
        assert_eq!(config.bundle_extension, ".js");
        assert_eq!(config.source_map_extension(), ".js.map");
    }

    #[test]
    fn test_vm_options_are_space_split() {
        let config = CompilerConfig::default().with_vm_options("  --old_gen_heap_size=2048   --verbose ");
        assert_eq!(config.vm_args, vec!["--old_gen_heap_size=2048", "--verbose"]);

        let empty = CompilerConfig::default().with_vm_options("");
        assert!(empty.vm_args.is_empty());
    }

    #[test]
    fn test_success_classification() {
        assert!(result(Some(0), true).succeeded());
        assert!(!result(Some(0), false).succeeded());
        assert!(!result(Some(1), true).succeeded());
        assert!(!result(None, true).succeeded());
    }

    #[test]
    fn test_combined_output() {
        let mut r = result(Some(1), false);
        assert_eq!(r.combined_output(), "");
        r.stderr = "boom\n".to_string();
        assert_eq!(r.combined_output(), "boom");
        r.stdout = "compiling\n".to_string();
        assert_eq!(r.combined_output(), "compiling\nboom");
    }
}
