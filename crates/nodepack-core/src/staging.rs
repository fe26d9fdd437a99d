//! Staging area management.
//!
//! The staging area is the working directory handed to the compiler. Sources
//! are mirrored into it using their staging layout:
//!
//! ```text
//! <root>/
//! ├── web/main.dart                    # root-package entry points
//! ├── packages/
//! │   ├── app/src/model.dart           # app|lib/src/model.dart
//! │   └── http/http.dart               # http|lib/http.dart
//! └── .dart_tool/
//!     └── package_config_<hash>.json   # one per entry point
//! ```
//!
//! A single staging area is shared by every entry point compiled in a build
//! session, possibly concurrently, and may outlive the session when the caller
//! supplies its own directory. Staging skips assets whose staged bytes already
//! match the source, and every write goes through a temp file renamed into
//! place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::asset::{AssetId, AssetReader, AssetWriter};
use crate::error::{Error, Result};
use crate::module::ModuleClosure;

/// Directory holding generated package configs, relative to the root.
pub const PACKAGE_CONFIG_DIR: &str = ".dart_tool";

/// An isolated working directory shared by compilations in one session.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

/// `package_config.json`, version 2.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PackageConfig {
    config_version: u32,
    packages: Vec<PackageEntry>,
    generator: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PackageEntry {
    name: String,
    root_uri: String,
}

impl StagingArea {
    /// Use `root` as the staging area, creating it if needed.
    ///
    /// The root is canonicalized so that it can be passed to the compiler as
    /// an absolute path.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an asset inside the staging area.
    pub fn path_for(&self, id: &AssetId) -> PathBuf {
        self.resolve(&id.staging_path())
    }

    /// Resolve a `/`-separated path relative to the root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Materialize every source contributed by `closure`.
    pub fn ensure_closure(&self, closure: &ModuleClosure, reader: &dyn AssetReader) -> Result<usize> {
        let sources = closure.sources();
        self.ensure_assets(sources.iter(), reader)
    }

    /// Materialize assets that are missing or out of date.
    ///
    /// Returns the number of assets written by this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Staging`] for the first asset that cannot be read or
    /// written.
    pub fn ensure_assets<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a AssetId>,
        reader: &dyn AssetReader,
    ) -> Result<usize> {
        let ids: Vec<&AssetId> = ids.into_iter().collect();

        let written = ids
            .par_iter()
            .map(|id| {
                self.ensure_asset(id, reader).map_err(|e| Error::Staging {
                    asset: (*id).clone(),
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<bool>>>()?;

        let count = written.into_iter().filter(|w| *w).count();
        tracing::debug!(
            "Staged {} of {} assets in {}",
            count,
            ids.len(),
            self.root.display()
        );
        Ok(count)
    }

    fn ensure_asset(&self, id: &AssetId, reader: &dyn AssetReader) -> Result<bool> {
        id.validate()?;
        let path = self.path_for(id);
        let bytes = reader.read_bytes(id)?;
        if is_staged(&path, &bytes) {
            return Ok(false);
        }

        write_atomic(&path, &bytes)?;
        Ok(true)
    }

    /// Package config path for `entry`, relative to the root.
    pub fn package_config_path(entry: &AssetId) -> String {
        format!(
            "{}/{}",
            PACKAGE_CONFIG_DIR,
            scratch_file_name(entry, "package_config", "json")
        )
    }

    /// Write the package config for `closure` and return its path relative
    /// to the root.
    ///
    /// Each entry point gets its own file, named after a hash of its
    /// identity, so concurrent compilations never overwrite each other's.
    pub fn write_package_config(&self, closure: &ModuleClosure) -> Result<String> {
        let relative = Self::package_config_path(closure.entry());

        let config = PackageConfig {
            config_version: 2,
            packages: closure
                .packages()
                .into_iter()
                .map(|name| PackageEntry {
                    root_uri: format!("../packages/{}/", name),
                    name,
                })
                .collect(),
            generator: "nodepack",
        };

        let json = serde_json::to_vec_pretty(&config)?;
        write_atomic(&self.resolve(&relative), &json).map_err(|e| Error::Staging {
            asset: closure.entry().clone(),
            source: Box::new(e),
        })?;
        Ok(relative)
    }

    /// Copy a staged asset to the output space.
    pub fn copy_output(&self, id: &AssetId, writer: &dyn AssetWriter) -> Result<()> {
        let bytes = fs::read(self.path_for(id))?;
        writer.write_bytes(id, &bytes)
    }

    /// Copy a staged asset only if the compiler produced it.
    ///
    /// Returns whether a copy happened.
    pub fn copy_output_if_exists(&self, id: &AssetId, writer: &dyn AssetWriter) -> Result<bool> {
        if !self.path_for(id).is_file() {
            return Ok(false);
        }
        self.copy_output(id, writer)?;
        Ok(true)
    }
}

/// Deterministic, per-entry file name for scratch files at a shared root.
pub fn scratch_file_name(entry: &AssetId, stem: &str, extension: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}.{}", stem, &digest[..32], extension)
}

/// Whether `path` already holds exactly `bytes`.
fn is_staged(path: &Path, bytes: &[u8]) -> bool {
    let same_len = fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() == bytes.len() as u64);
    same_len && fs::read(path).is_ok_and(|staged| staged == bytes)
}

/// Replace `path` with `bytes` without ever exposing a partial file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::Io(std::io::Error::other(format!(
            "no parent directory for {}",
            path.display()
        )))
    })?;
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
