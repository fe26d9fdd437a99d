//! Toolchain management for nodepack compilation.
//!
//! Locates the Dart SDK and the dart2js snapshot it ships with.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// A Dart SDK installation.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// SDK root (the directory containing `bin/` and `lib/`)
    sdk_root: PathBuf,
}

impl Toolchain {
    /// Use `sdk_root` without checking its layout.
    pub fn new(sdk_root: impl Into<PathBuf>) -> Self {
        Self {
            sdk_root: sdk_root.into(),
        }
    }

    /// Use `sdk_root`, checking that it looks like a Dart SDK.
    pub fn from_sdk_root(sdk_root: impl Into<PathBuf>) -> Result<Self> {
        let toolchain = Self::new(sdk_root);
        toolchain.validate()?;
        Ok(toolchain)
    }

    /// Detect the SDK from the `dart` executable in PATH.
    pub fn detect() -> Result<Self> {
        let dart = which::which("dart")
            .map_err(|_| Error::Toolchain("dart not found in PATH".to_string()))?;

        // PATH entries are often symlinks into the SDK's bin directory
        let dart = dart.canonicalize().unwrap_or(dart);
        let sdk_root = dart
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| {
                Error::Toolchain(format!("cannot derive SDK root from {}", dart.display()))
            })?;

        tracing::debug!("Detected Dart SDK at {}", sdk_root.display());
        Self::from_sdk_root(sdk_root)
    }

    /// Check that the VM and the compiler snapshot exist.
    pub fn validate(&self) -> Result<()> {
        for required in [self.dart(), self.compiler_snapshot()] {
            if !required.is_file() {
                return Err(Error::Toolchain(format!(
                    "{} not found in SDK at {}",
                    required.display(),
                    self.sdk_root.display()
                )));
            }
        }
        Ok(())
    }

    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// Path to the Dart VM.
    pub fn dart(&self) -> PathBuf {
        let name = if cfg!(windows) { "dart.exe" } else { "dart" };
        self.sdk_root.join("bin").join(name)
    }

    /// Path to the dart2js snapshot run by the VM.
    pub fn compiler_snapshot(&self) -> PathBuf {
        self.sdk_root
            .join("bin")
            .join("snapshots")
            .join("dart2js.dart.snapshot")
    }

    /// Path to the platform library manifest.
    pub fn libraries_spec(&self) -> PathBuf {
        self.sdk_root.join("lib").join("libraries.json")
    }

    /// Get the SDK version string.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(self.dart())
            .arg("--version")
            .output()
            .map_err(|e| Error::Toolchain(format!("Failed to run dart: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Toolchain("Failed to get Dart version".to_string()));
        }

        // Older SDKs print the version on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            stdout.into_owned()
        };
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sdk_layout() {
        let toolchain = Toolchain::new("/opt/dart-sdk");
        assert!(toolchain.compiler_snapshot().ends_with("bin/snapshots/dart2js.dart.snapshot"));
        assert!(toolchain.libraries_spec().ends_with("lib/libraries.json"));
        assert!(toolchain.dart().starts_with("/opt/dart-sdk/bin"));
    }

    #[test]
    fn test_validate_rejects_incomplete_sdk() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        assert!(matches!(
            Toolchain::from_sdk_root(temp.path()),
            Err(Error::Toolchain(_))
        ));

        let toolchain = Toolchain::new(temp.path());
        fs::create_dir_all(temp.path().join("bin/snapshots")).unwrap();
        fs::write(toolchain.dart(), "").unwrap();
        assert!(toolchain.validate().is_err());

        fs::write(toolchain.compiler_snapshot(), "").unwrap();
        assert!(toolchain.validate().is_ok());
    }
}
