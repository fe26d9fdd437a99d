//! Node.js preamble injection.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::staging::write_atomic;

/// Default shim that lets dart2js output run under Node.js.
///
/// dart2js expects a browser-like `self`; the shim provides one backed by the
/// Node globals and re-exposes the CommonJS bindings on it.
pub const NODE_PREAMBLE: &str = r#"// Node.js preamble for dart2js output.
var dartNodeIsActuallyNode = typeof process !== "undefined" && !!(process.versions && process.versions.node);
var self = Object.create(dartNodeIsActuallyNode ? global : globalThis);
self.self = self;
self.require = typeof require !== "undefined" ? require : undefined;
self.module = typeof module !== "undefined" ? module : undefined;
self.exports = typeof exports !== "undefined" ? exports : undefined;
self.process = typeof process !== "undefined" ? process : undefined;
self.__dirname = typeof __dirname !== "undefined" ? __dirname : undefined;
self.__filename = typeof __filename !== "undefined" ? __filename : undefined;
if (dartNodeIsActuallyNode && !self.location) {
  self.location = {
    get href() {
      return "file://" + process.cwd().replace(/\\/g, "/") + "/";
    }
  };
}
self.scheduleImmediate = typeof setImmediate !== "undefined"
    ? function (callback) { setImmediate(callback); }
    : function (callback) { setTimeout(callback, 0); };
"#;

/// Prepend `preamble` to the file at `path`.
///
/// The file is replaced in one rename, so a crash mid-write leaves either the
/// original bundle or the complete new one.
pub fn inject_preamble(path: &Path, preamble: &str) -> Result<()> {
    let original = fs::read(path)?;

    let mut content = Vec::with_capacity(preamble.len() + original.len());
    content.extend_from_slice(preamble.as_bytes());
    content.extend_from_slice(&original);

    write_atomic(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_preamble_preserves_content() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let bundle = temp.path().join("main.dart.js");
        let original = "(function dartProgram(){ main(); })();\n";
        fs::write(&bundle, original).unwrap();

        inject_preamble(&bundle, NODE_PREAMBLE).unwrap();

        let output = fs::read_to_string(&bundle).unwrap();
        assert!(output.starts_with(NODE_PREAMBLE));
        assert_eq!(&output[NODE_PREAMBLE.len()..], original);
    }

    #[test]
    fn test_preamble_on_binary_and_empty_content() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let bundle = temp.path().join("empty.js");
        fs::write(&bundle, b"").unwrap();
        inject_preamble(&bundle, "// shim\n").unwrap();
        assert_eq!(fs::read(&bundle).unwrap(), b"// shim\n");

        let raw = temp.path().join("raw.js");
        let bytes = [0xffu8, 0x00, 0x7f];
        fs::write(&raw, bytes).unwrap();
        inject_preamble(&raw, "x").unwrap();
        assert_eq!(&fs::read(&raw).unwrap()[1..], &bytes);
    }

    #[test]
    fn test_missing_bundle_is_an_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        assert!(inject_preamble(&temp.path().join("nope.js"), NODE_PREAMBLE).is_err());
    }
}
