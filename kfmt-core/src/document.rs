//! Source documents handed to the formatter

use std::io;
use std::path::{Path, PathBuf};

/// Extensions of the Kotlin languages ktlint handles (`kotlin`, `kotlinscript`)
pub const KOTLIN_EXTENSIONS: &[&str] = &["kt", "kts"];

/// A file path together with its full text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
    text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a document from disk, making its path absolute
    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let text = std::fs::read_to_string(&path)?;
        Ok(Self { path, text })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Directory containing the document, if it has one
    pub fn working_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    pub fn is_kotlin(&self) -> bool {
        is_kotlin_path(&self.path)
    }
}

/// Whether a path names a Kotlin source or script file
pub fn is_kotlin_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| KOTLIN_EXTENSIONS.contains(&ext))
}
