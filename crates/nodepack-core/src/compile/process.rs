//! Compiler process execution.

use std::fs;
use std::time::Instant;

use crate::error::{Error, Result};

use super::invocation::CompilerInvocation;
use super::types::CompileResult;

impl CompilerInvocation {
    /// Remove outputs left in the staging area by an earlier compile of the
    /// same entry point, so the post-run existence check only sees fresh
    /// files.
    pub fn clear_stale_outputs(&self) -> Result<()> {
        for path in [self.output_file(), self.source_map_file()] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed stale output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    /// Spawn the compiler and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toolchain`] if the process cannot be spawned. A
    /// compiler that runs and fails is reported through
    /// [`CompileResult::succeeded`], not as an error.
    pub fn run(&self) -> Result<CompileResult> {
        tracing::debug!("Running {}", self.command_line());
        let start = Instant::now();

        let output = self.to_command().output().map_err(|e| {
            Error::Toolchain(format!(
                "Failed to run {} (working dir: {}): {}",
                self.program.display(),
                self.working_dir.display(),
                e
            ))
        })?;

        let result = CompileResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            output_exists: self.output_file().is_file(),
            duration: start.elapsed(),
        };

        tracing::debug!(
            "Compiler exited with {:?} after {}ms (output present: {})",
            result.exit_code,
            result.duration.as_millis(),
            result.output_exists
        );
        Ok(result)
    }
}
