//! Finds indexable documents on disk.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DocumentDiscovery {
    extensions: Vec<String>,
}

impl Default for DocumentDiscovery {
    fn default() -> Self {
        Self::new(["pdf", "docx", "txt"])
    }
}

impl DocumentDiscovery {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { extensions }
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Every supported file under `root`, recursively, sorted by path.
    pub fn list_documents(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }
}
