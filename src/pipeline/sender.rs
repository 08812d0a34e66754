//! Originating address lookup
//!
//! The attachment collaborator knows who sent each file; the pipeline only
//! consumes that knowledge as an opaque string per document.

use std::collections::HashMap;
use std::path::Path;

/// Conventional manifest name inside the input directory
pub const SENDER_MANIFEST: &str = ".senders.json";

#[derive(Debug, thiserror::Error)]
pub enum SenderManifestError {
    #[error("failed to read sender manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sender manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies the originating address for an input file
pub trait SenderSource: Send + Sync {
    fn sender_for(&self, path: &Path) -> Option<String>;
}

/// Same address (or none) for every document in the batch
#[derive(Debug, Clone, Default)]
pub struct FixedSender(Option<String>);

impl FixedSender {
    pub fn new(address: Option<String>) -> Self {
        Self(address.filter(|a| !a.trim().is_empty()))
    }
}

impl SenderSource for FixedSender {
    fn sender_for(&self, _path: &Path) -> Option<String> {
        self.0.clone()
    }
}

/// Per-file addresses from a JSON manifest `{ "file name": "address" }`,
/// with an optional fallback for files the manifest does not list
#[derive(Debug, Clone, Default)]
pub struct ManifestSender {
    entries: HashMap<String, String>,
    fallback: Option<String>,
}

impl ManifestSender {
    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self {
            entries,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn load(path: &Path) -> Result<Self, SenderManifestError> {
        let json = std::fs::read_to_string(path).map_err(|source| SenderManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let entries: HashMap<String, String> =
            serde_json::from_str(&json).map_err(|source| SenderManifestError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::from_entries(entries))
    }

    /// Load `.senders.json` from the input directory; empty if it is absent
    pub fn from_input_dir(input_dir: &Path) -> Result<Self, SenderManifestError> {
        let path = input_dir.join(SENDER_MANIFEST);
        if !path.exists() {
            return Ok(Self::default());
        }
        let manifest = Self::load(&path)?;
        tracing::info!(
            path = %path.display(),
            entries = manifest.entries.len(),
            "[Pipeline] Loaded sender manifest"
        );
        Ok(manifest)
    }
}

impl SenderSource for ManifestSender {
    fn sender_for(&self, path: &Path) -> Option<String> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| self.entries.get(name))
            .cloned()
            .or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_fixed_sender() {
        let sender = FixedSender::new(Some("client1@example.com".to_string()));
        assert_eq!(
            sender.sender_for(Path::new("in/a.pdf")).as_deref(),
            Some("client1@example.com")
        );
        assert_eq!(FixedSender::new(Some("  ".to_string())).sender_for(Path::new("a")), None);
    }

    #[test]
    fn test_manifest_lookup_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SENDER_MANIFEST),
            r#"{"statement.pdf": "client2@example.com"}"#,
        )
        .unwrap();

        let manifest = ManifestSender::from_input_dir(dir.path())
            .unwrap()
            .with_fallback(Some("office@example.com".to_string()));

        assert_eq!(
            manifest.sender_for(&dir.path().join("statement.pdf")).as_deref(),
            Some("client2@example.com")
        );
        assert_eq!(
            manifest.sender_for(&dir.path().join("other.pdf")).as_deref(),
            Some("office@example.com")
        );
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ManifestSender::from_input_dir(dir.path()).unwrap();
        assert_eq!(manifest.sender_for(&dir.path().join("a.pdf")), None);
    }

    #[test]
    fn test_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SENDER_MANIFEST), "[1, 2, 3]").unwrap();
        assert!(matches!(
            ManifestSender::from_input_dir(dir.path()),
            Err(SenderManifestError::Parse { .. })
        ));
    }
}
