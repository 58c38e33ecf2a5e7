//! Persisted compiled-template artifacts (cache level 2).
//!
//! Each artifact is one file under the storage root, named by template
//! name and source fingerprint. Files carry a validated binary header
//! (magic bytes, format version, engine version, payload checksum) ahead
//! of the bincode-encoded IR.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tim_common::ContentHash;
use tim_ir::CompiledTemplate;

use crate::error::CacheError;

/// Magic bytes identifying a Tim artifact file.
const ARTIFACT_MAGIC: [u8; 4] = *b"TIMC";

/// Current artifact format version. Increment on breaking changes to the
/// header or payload encoding.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File extension for persisted compiled templates.
const ARTIFACT_EXT: &str = "tmc";

/// Header prepended to every artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactHeader {
    /// Magic bytes: must be `b"TIMC"`.
    magic: [u8; 4],
    /// Artifact format version.
    format_version: u32,
    /// Engine version that produced this artifact.
    engine_version: String,
    /// Fingerprint of the template source the payload was compiled from.
    fingerprint: ContentHash,
    /// Checksum of the payload bytes.
    checksum: ContentHash,
}

/// Fingerprint-keyed store of compiled templates under the storage root.
pub struct ArtifactStore {
    storage_root: PathBuf,
    engine_version: String,
}

impl ArtifactStore {
    /// Creates a store rooted at the given storage directory.
    pub fn new(storage_root: &Path, engine_version: &str) -> Self {
        Self {
            storage_root: storage_root.to_path_buf(),
            engine_version: engine_version.to_string(),
        }
    }

    /// Returns the file path for a template name + fingerprint pair.
    ///
    /// Path separators in the name are flattened so every artifact lives
    /// directly under the storage root. A changed source writes a new
    /// file name; stale artifacts are superseded, never deleted here.
    pub fn artifact_path(&self, name: &str, fingerprint: ContentHash) -> PathBuf {
        let flat = name.replace('/', "__");
        self.storage_root
            .join(format!("{flat}-{fingerprint}.{ARTIFACT_EXT}"))
    }

    /// Serializes a compiled template to its artifact file.
    pub fn write(
        &self,
        name: &str,
        template: &CompiledTemplate,
    ) -> Result<PathBuf, CacheError> {
        std::fs::create_dir_all(&self.storage_root).map_err(|e| CacheError::Io {
            path: self.storage_root.clone(),
            source: e,
        })?;

        let payload = bincode::serde::encode_to_vec(template, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            engine_version: self.engine_version.clone(),
            fingerprint: template.fingerprint,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // Layout: 4-byte header length (little-endian) + header + payload.
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let path = self.artifact_path(name, template.fingerprint);
        std::fs::write(&path, &output).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    /// Loads the artifact for a name + fingerprint pair, validating it.
    ///
    /// Returns `None` if the file is missing, the header is invalid, the
    /// format version differs, the fingerprint does not match, or the
    /// checksum fails. Fail-safe: corruption is a cache miss.
    pub fn read(&self, name: &str, fingerprint: ContentHash) -> Option<CompiledTemplate> {
        let path = self.artifact_path(name, fingerprint);
        let raw = std::fs::read(&path).ok()?;

        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }

        let header: ArtifactHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;

        if header.magic != ARTIFACT_MAGIC {
            return None;
        }
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return None;
        }
        if header.fingerprint != fingerprint {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return None;
        }

        let template: CompiledTemplate =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())
                .ok()?
                .0;

        // The encoded fingerprint must agree with the header.
        if template.fingerprint != fingerprint {
            return None;
        }

        Some(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tim_ir::Node;

    fn make_store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), "0.1.0");
        (dir, store)
    }

    fn make_template(text: &str) -> CompiledTemplate {
        CompiledTemplate::new(
            ContentHash::from_bytes(text.as_bytes()),
            vec![Node::Literal(text.to_string())],
        )
    }

    #[test]
    fn write_and_read_roundtrip() {
        let (_dir, store) = make_store();
        let template = make_template("hello world");
        store.write("index", &template).unwrap();

        let loaded = store.read("index", template.fingerprint).unwrap();
        assert_eq!(loaded, template);
    }

    #[test]
    fn read_missing_returns_none() {
        let (_dir, store) = make_store();
        assert!(store
            .read("nope", ContentHash::from_bytes(b"x"))
            .is_none());
    }

    #[test]
    fn nested_names_flatten() {
        let (_dir, store) = make_store();
        let template = make_template("<nav></nav>");
        let path = store.write("partials/nav", &template).unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("partials__nav-"));
        assert!(store.read("partials/nav", template.fingerprint).is_some());
    }

    #[test]
    fn corrupt_data_is_a_miss() {
        let (_dir, store) = make_store();
        let fp = ContentHash::from_bytes(b"source");
        std::fs::create_dir_all(store.artifact_path("x", fp).parent().unwrap()).unwrap();
        std::fs::write(store.artifact_path("x", fp), b"garbage").unwrap();
        assert!(store.read("x", fp).is_none());
    }

    #[test]
    fn truncated_file_is_a_miss() {
        let (_dir, store) = make_store();
        let fp = ContentHash::from_bytes(b"source");
        std::fs::create_dir_all(&store.storage_root).unwrap();
        std::fs::write(store.artifact_path("x", fp), b"AB").unwrap();
        assert!(store.read("x", fp).is_none());
    }

    #[test]
    fn tampered_payload_is_a_miss() {
        let (_dir, store) = make_store();
        let template = make_template("payload");
        let path = store.write("t", &template).unwrap();

        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        std::fs::write(&path, &raw).unwrap();

        assert!(store.read("t", template.fingerprint).is_none());
    }

    #[test]
    fn fingerprint_mismatch_is_a_miss() {
        let (_dir, store) = make_store();
        let template = make_template("version one");
        store.write("t", &template).unwrap();

        // A different fingerprint resolves to a different file name.
        let other = ContentHash::from_bytes(b"version two");
        assert!(store.read("t", other).is_none());
    }

    #[test]
    fn same_fingerprint_overwrites() {
        let (_dir, store) = make_store();
        let template = make_template("stable");
        let p1 = store.write("t", &template).unwrap();
        let p2 = store.write("t", &template).unwrap();
        assert_eq!(p1, p2);
        assert!(store.read("t", template.fingerprint).is_some());
    }
}
