//! Image sources.
//!
//! An [`ImageSource`] resolves a caller-assigned document id to readable
//! image bytes. Absence (`NotFound`) is distinguishable from a read failure
//! (`Io`), so the pipeline can report "Document not found" rather than a
//! generic I/O message.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to resolve a document id to image bytes.
#[derive(Debug, Error)]
pub enum ImageSourceError {
    /// No document with this id exists in the source.
    #[error("Document not found: no document with id '{0}'")]
    NotFound(String),

    /// The document exists but could not be read.
    #[error("failed to read document '{document_id}': {message}")]
    Io {
        document_id: String,
        message: String,
    },
}

/// Resolved image bytes plus the file extension used for MIME detection.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    /// Lowercased extension without the leading dot (e.g. "jpg").
    pub extension: String,
}

/// Resolves document ids to image bytes.
pub trait ImageSource: Send + Sync {
    fn resolve(&self, document_id: &str) -> Result<ImageFile, ImageSourceError>;
}

/// Directory of uploaded documents stored as `{document_id}_{original_name}`.
///
/// The first directory entry whose name starts with `{document_id}_` wins,
/// matching the upload layout where each id maps to exactly one file.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn find(&self, document_id: &str) -> Result<PathBuf, ImageSourceError> {
        let prefix = format!("{document_id}_");
        let entries = fs::read_dir(&self.dir).map_err(|e| ImageSourceError::Io {
            document_id: document_id.to_string(),
            message: e.to_string(),
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                return Ok(entry.path());
            }
        }
        Err(ImageSourceError::NotFound(document_id.to_string()))
    }
}

impl ImageSource for DirectorySource {
    fn resolve(&self, document_id: &str) -> Result<ImageFile, ImageSourceError> {
        let path = self.find(document_id)?;
        let bytes = fs::read(&path).map_err(|e| ImageSourceError::Io {
            document_id: document_id.to_string(),
            message: e.to_string(),
        })?;
        Ok(ImageFile {
            bytes,
            extension: extension_of(&path),
        })
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        let err = source.resolve("doc-1").unwrap_err();
        assert!(matches!(err, ImageSourceError::NotFound(_)));
        assert!(err.to_string().contains("Document not found"));
    }

    #[test]
    fn resolves_by_id_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc-1_invoice.PNG"), b"fake-image").unwrap();
        let source = DirectorySource::new(dir.path());
        let file = source.resolve("doc-1").unwrap();
        assert_eq!(file.bytes, b"fake-image");
        assert_eq!(file.extension, "png");
    }

    #[test]
    fn prefix_must_match_exactly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc-10_invoice.png"), b"x").unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(source.resolve("doc-1").is_err());
    }
}
