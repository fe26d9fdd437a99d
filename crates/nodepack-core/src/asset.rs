//! Asset identities and the asset stores supplied by the build runtime.
//!
//! An asset is addressed by its package and a `/`-separated path relative to
//! the package root, rendered as `package|path`:
//!
//! ```text
//! app|web/main.dart        # entry point outside the library root
//! http|lib/src/client.dart # library source
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::staging::write_atomic;

/// Directory prefix of a package's public libraries.
pub const LIBRARY_ROOT: &str = "lib/";

/// Identity of a single asset within the build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId {
    package: String,
    path: String,
}

impl AssetId {
    /// Create an asset id without validation.
    pub fn new(package: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }

    /// Parse `package|path`, rejecting paths that escape the package root.
    pub fn parse(s: &str) -> Result<Self> {
        let (package, path) = s
            .split_once('|')
            .ok_or_else(|| Error::InvalidAssetId(format!("expected `package|path`, got `{}`", s)))?;

        let id = Self::new(package, path);
        id.validate()?;
        Ok(id)
    }

    /// Check that the id is non-empty and stays within its package.
    pub fn validate(&self) -> Result<()> {
        if self.package.is_empty() || self.path.is_empty() {
            return Err(Error::InvalidAssetId(self.to_string()));
        }
        if self.path.starts_with('/') || self.path.contains('\\') {
            return Err(Error::InvalidAssetId(format!(
                "{}: path must be relative and `/`-separated",
                self
            )));
        }
        if self.path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(Error::InvalidAssetId(format!(
                "{}: path must not contain empty or `..` segments",
                self
            )));
        }
        Ok(())
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the asset lives under the package's `lib/` directory.
    pub fn is_library(&self) -> bool {
        self.path.starts_with(LIBRARY_ROOT)
    }

    /// The path with the extension of its last segment removed.
    ///
    /// A leading dot in the file name is not treated as an extension.
    pub fn path_without_extension(&self) -> &str {
        strip_extension(&self.path)
    }

    /// A sibling id with the extension replaced by `extension` (which
    /// includes its leading dot, e.g. `.dart.js`).
    pub fn change_extension(&self, extension: &str) -> Self {
        Self::new(
            self.package.clone(),
            format!("{}{}", self.path_without_extension(), extension),
        )
    }

    /// Location of the asset relative to a staging root.
    ///
    /// Library sources are mirrored under `packages/<package>/` so they can be
    /// addressed as `package:` URIs; everything else keeps its own path.
    pub fn staging_path(&self) -> String {
        match self.path.strip_prefix(LIBRARY_ROOT) {
            Some(rest) => format!("packages/{}/{}", self.package, rest),
            None => self.path.clone(),
        }
    }
}

/// Strip the final extension from a `/`-separated path.
pub(crate) fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..name_start + dot],
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.package, self.path)
    }
}

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.to_string()
    }
}

/// Read access to the build's assets.
pub trait AssetReader: Sync {
    /// Whether the asset exists and is readable.
    fn can_read(&self, id: &AssetId) -> bool;

    /// Read the full contents of an asset.
    fn read_bytes(&self, id: &AssetId) -> Result<Vec<u8>>;

    /// Read an asset as UTF-8 text.
    fn read_string(&self, id: &AssetId) -> Result<String> {
        let bytes = self.read_bytes(id)?;
        String::from_utf8(bytes).map_err(|e| Error::Serialization(format!("{}: {}", id, e)))
    }
}

/// Write access to the build's output space.
pub trait AssetWriter {
    /// Write (or replace) an output asset.
    fn write_bytes(&self, id: &AssetId, bytes: &[u8]) -> Result<()>;
}

/// File system backed assets.
///
/// Reads resolve each package to its own root directory. Outputs are written
/// below a single output directory as `<package>/<path>`, so several packages
/// can share it.
#[derive(Debug, Clone)]
pub struct FsAssets {
    packages: FxHashMap<String, PathBuf>,
    output_dir: PathBuf,
}

impl FsAssets {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages: FxHashMap::default(),
            output_dir: output_dir.into(),
        }
    }

    /// Register the root directory of a package.
    pub fn with_package(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.packages.insert(name.into(), root.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path on disk backing an input asset, if its package is known.
    pub fn source_path(&self, id: &AssetId) -> Option<PathBuf> {
        self.packages
            .get(id.package())
            .map(|root| root.join(id.path()))
    }

    /// Path on disk an output asset is written to.
    pub fn output_path(&self, id: &AssetId) -> PathBuf {
        id.path()
            .split('/')
            .fold(self.output_dir.join(id.package()), |path, segment| {
                path.join(segment)
            })
    }
}

impl AssetReader for FsAssets {
    fn can_read(&self, id: &AssetId) -> bool {
        self.source_path(id).is_some_and(|p| p.is_file())
    }

    fn read_bytes(&self, id: &AssetId) -> Result<Vec<u8>> {
        let path = self
            .source_path(id)
            .ok_or_else(|| Error::AssetNotFound(id.clone()))?;

        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::AssetNotFound(id.clone()),
            _ => Error::Io(e),
        })
    }
}

impl AssetWriter for FsAssets {
    fn write_bytes(&self, id: &AssetId, bytes: &[u8]) -> Result<()> {
        id.validate()?;
        write_atomic(&self.output_path(id), bytes)
    }
}

/// In-memory assets, readable and writable.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    assets: Mutex<FxHashMap<AssetId, Vec<u8>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset, replacing any previous content.
    pub fn insert(&self, id: AssetId, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(id, bytes.into());
    }

    pub fn get(&self, id: &AssetId) -> Option<Vec<u8>> {
        self.lock().get(id).cloned()
    }

    /// All asset ids, sorted.
    pub fn ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<AssetId, Vec<u8>>> {
        self.assets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AssetReader for MemoryAssets {
    fn can_read(&self, id: &AssetId) -> bool {
        self.lock().contains_key(id)
    }

    fn read_bytes(&self, id: &AssetId) -> Result<Vec<u8>> {
        self.get(id).ok_or_else(|| Error::AssetNotFound(id.clone()))
    }
}

impl AssetWriter for MemoryAssets {
    fn write_bytes(&self, id: &AssetId, bytes: &[u8]) -> Result<()> {
        self.insert(id.clone(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_and_display() {
        let id: AssetId = "app|web/main.dart".parse().unwrap();
        assert_eq!(id.package(), "app");
        assert_eq!(id.path(), "web/main.dart");
        assert_eq!(id.to_string(), "app|web/main.dart");
    }

    #[test]
    fn test_parse_rejects_escaping_paths() {
        assert!(AssetId::parse("app").is_err());
        assert!(AssetId::parse("|lib/a.dart").is_err());
        assert!(AssetId::parse("app|/etc/passwd").is_err());
        assert!(AssetId::parse("app|lib/../../x.dart").is_err());
        assert!(AssetId::parse("app|lib//a.dart").is_err());
    }

    #[test]
    fn test_change_extension() {
        let id = AssetId::new("app", "web/main.dart");
        assert_eq!(id.change_extension(".dart.js").path(), "web/main.dart.js");
        assert_eq!(
            id.change_extension(".dart.js.map").path(),
            "web/main.dart.js.map"
        );

        let dotted = AssetId::new("app", "web.v2/main");
        assert_eq!(dotted.change_extension(".js").path(), "web.v2/main.js");

        let hidden = AssetId::new("app", "web/.hidden");
        assert_eq!(hidden.path_without_extension(), "web/.hidden");
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            AssetId::new("http", "lib/src/client.dart").staging_path(),
            "packages/http/src/client.dart"
        );
        assert_eq!(
            AssetId::new("app", "web/main.dart").staging_path(),
            "web/main.dart"
        );
        // `lib` without a trailing separator is not the library root
        assert_eq!(AssetId::new("app", "library.dart").staging_path(), "library.dart");
    }

    #[test]
    fn test_serde_as_string() {
        let id = AssetId::new("app", "lib/a.dart");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"app|lib/a.dart\"");
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<AssetId>("\"no-separator\"").is_err());
    }

    #[test]
    fn test_fs_assets_read_and_write() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let pkg_root = temp.path().join("app");
        fs::create_dir_all(pkg_root.join("lib")).unwrap();
        fs::write(pkg_root.join("lib/a.dart"), "void a() {}").unwrap();

        let assets = FsAssets::new(temp.path().join("out")).with_package("app", &pkg_root);

        let id = AssetId::new("app", "lib/a.dart");
        assert!(assets.can_read(&id));
        assert_eq!(assets.read_string(&id).unwrap(), "void a() {}");

        let missing = AssetId::new("app", "lib/b.dart");
        assert!(!assets.can_read(&missing));
        assert!(matches!(assets.read_bytes(&missing), Err(Error::AssetNotFound(_))));

        let unknown = AssetId::new("other", "lib/a.dart");
        assert!(matches!(assets.read_bytes(&unknown), Err(Error::AssetNotFound(_))));

        let out = AssetId::new("app", "web/main.dart.js");
        assets.write_bytes(&out, b"js").unwrap();
        assert_eq!(fs::read(temp.path().join("out/app/web/main.dart.js")).unwrap(), b"js");

        // Rewrites replace the whole file
        assets.write_bytes(&out, b"j").unwrap();
        assert_eq!(fs::read(assets.output_path(&out)).unwrap(), b"j");
    }

    #[test]
    fn test_fs_outputs_keep_packages_apart() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let assets = FsAssets::new(temp.path());

        let app = AssetId::new("app", "web/main.dart.js");
        let other = AssetId::new("other", "web/main.dart.js");
        assert_ne!(assets.output_path(&app), assets.output_path(&other));

        assets.write_bytes(&app, b"app").unwrap();
        assets.write_bytes(&other, b"other").unwrap();
        assert_eq!(fs::read(temp.path().join("app/web/main.dart.js")).unwrap(), b"app");
        assert_eq!(fs::read(temp.path().join("other/web/main.dart.js")).unwrap(), b"other");

        let library = AssetId::new("app", "lib/server.dart.js");
        assert_eq!(
            assets.output_path(&library),
            temp.path().join("app").join("lib").join("server.dart.js")
        );
    }

    #[test]
    fn test_memory_assets() {
        let assets = MemoryAssets::new();
        assert!(assets.is_empty());

        let id = AssetId::new("app", "lib/a.dart");
        assets.write_bytes(&id, b"x").unwrap();
        assert!(assets.can_read(&id));
        assert_eq!(assets.read_bytes(&id).unwrap(), b"x");
        assert_eq!(assets.ids(), vec![id]);
    }
}
