use std::fs;
use std::path::{Path, PathBuf};

use rankdb_core::error::{Error, Result};
use rankdb_core::traits::DocumentSource;

use crate::extract::{extract_text, DocumentFormat};

/// Reads documents from the local filesystem.
///
/// Document identifiers are paths; relative ones are resolved against `root`
/// when one is set, otherwise against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FsDocumentSource {
    root: Option<PathBuf>,
}

impl FsDocumentSource {
    pub fn new() -> Self { Self::default() }

    pub fn with_root(root: impl Into<PathBuf>) -> Self { Self { root: Some(root.into()) } }

    pub fn resolve(&self, document: &str) -> PathBuf {
        let path = Path::new(document);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DocumentSource for FsDocumentSource {
    fn read_text(&self, document: &str) -> Result<String> {
        let path = self.resolve(document);
        let bytes = fs::read(&path).map_err(|e| Error::unavailable(document, e))?;
        let format = DocumentFormat::detect(&path, &bytes);
        let text = extract_text(format, &bytes).map_err(|e| Error::unavailable(document, e))?;
        tracing::debug!(document, format = format.label(), chars = text.len(), "extracted document text");
        Ok(text)
    }
}
