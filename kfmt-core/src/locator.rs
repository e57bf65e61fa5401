//! Config Locator - Find the configuration file governing a source file
//!
//! The search starts in the directory that contains the file. That directory is
//! searched through its whole subtree; every ancestor above it is searched by
//! its direct contents only, up to the filesystem root.
//!
//! Directories that cannot be read for lack of permission are skipped. Any other
//! I/O error aborts the search.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::DEFAULT_CONFIG_FILE_NAME;

/// Config discovery error
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Failed to read directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve {}: {source}", .path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Kind of a directory entry, with symlinks resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Filesystem operations needed by the locator
pub trait FileSystem {
    /// List a directory, sorted by entry name
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Whether the file can be opened for reading
    fn is_readable(&self, path: &Path) -> bool;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            // fs::metadata follows symlinks; dangling links end up as Other
            let kind = match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => EntryKind::File,
                Ok(meta) if meta.is_dir() => EntryKind::Directory,
                _ => EntryKind::Other,
            };
            entries.push(DirEntry { path, kind });
        }
        entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(entries)
    }

    fn is_readable(&self, path: &Path) -> bool {
        fs::File::open(path).is_ok()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

/// Finds the nearest configuration file by name
pub struct ConfigLocator<F = OsFileSystem> {
    fs: F,
    file_name: String,
}

impl ConfigLocator {
    /// Create a locator over the real filesystem
    pub fn new(file_name: impl Into<String>) -> Self {
        Self::with_file_system(OsFileSystem, file_name)
    }
}

impl Default for ConfigLocator {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE_NAME)
    }
}

impl<F: FileSystem> ConfigLocator<F> {
    pub fn with_file_system(fs: F, file_name: impl Into<String>) -> Self {
        Self {
            fs,
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Locate the configuration file that applies to `file_path`
    ///
    /// Returns the first readable regular file named [`Self::file_name`], or
    /// `None` when the root is reached without a match.
    pub fn locate(&self, file_path: &Path) -> Result<Option<PathBuf>, LocateError> {
        let file_path =
            std::path::absolute(file_path).map_err(|source| LocateError::InvalidPath {
                path: file_path.to_path_buf(),
                source,
            })?;

        let Some(start) = file_path.parent() else {
            return Ok(None);
        };

        // A root-level document would otherwise trigger a scan of the whole disk
        let found = if start.parent().is_none() {
            self.search_dir(start)?
        } else {
            self.search_subtree(start, &mut HashSet::new())?
        };
        if let Some(path) = found {
            info!("Found editorconfig file at: {}", path.display());
            return Ok(Some(path));
        }

        let mut dir = start;
        while let Some(parent) = dir.parent() {
            if let Some(path) = self.search_dir(parent)? {
                info!("Found editorconfig file at: {}", path.display());
                return Ok(Some(path));
            }
            dir = parent;
        }

        debug!("No {} found for {}", self.file_name, file_path.display());
        Ok(None)
    }

    /// Search a directory's direct contents
    fn search_dir(&self, dir: &Path) -> Result<Option<PathBuf>, LocateError> {
        Ok(self
            .list(dir)?
            .and_then(|entries| self.first_readable_match(&entries)))
    }

    /// Search a directory and everything below it, files before subdirectories
    fn search_subtree(
        &self,
        dir: &Path,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<Option<PathBuf>, LocateError> {
        if let Ok(canonical) = self.fs.canonicalize(dir)
            && !visited.insert(canonical)
        {
            debug!("Skipping already visited directory {}", dir.display());
            return Ok(None);
        }

        let Some(entries) = self.list(dir)? else {
            return Ok(None);
        };

        if let Some(found) = self.first_readable_match(&entries) {
            return Ok(Some(found));
        }

        for entry in entries.iter().filter(|e| e.kind == EntryKind::Directory) {
            if let Some(found) = self.search_subtree(&entry.path, visited)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    /// List a directory; `None` if permission was denied
    fn list(&self, dir: &Path) -> Result<Option<Vec<DirEntry>>, LocateError> {
        match self.fs.read_dir(dir) {
            Ok(entries) => Ok(Some(entries)),
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                debug!("Skipping unreadable directory {}: {}", dir.display(), err);
                Ok(None)
            }
            Err(source) => Err(LocateError::Io {
                path: dir.to_path_buf(),
                source,
            }),
        }
    }

    fn first_readable_match(&self, entries: &[DirEntry]) -> Option<PathBuf> {
        entries
            .iter()
            .filter(|e| e.kind == EntryKind::File && self.matches(&e.path))
            .find(|e| {
                let readable = self.fs.is_readable(&e.path);
                if !readable {
                    debug!("Skipping unreadable config file {}", e.path.display());
                }
                readable
            })
            .map(|e| e.path.clone())
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == self.file_name.as_str())
    }
}

/// Locate `config_file_name` for `file_path` on the real filesystem
pub fn locate(file_path: &Path, config_file_name: &str) -> Result<Option<PathBuf>, LocateError> {
    ConfigLocator::new(config_file_name).locate(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// In-memory tree with injectable failures
    #[derive(Default)]
    struct FakeFs {
        dirs: HashMap<PathBuf, Vec<DirEntry>>,
        failures: HashMap<PathBuf, io::ErrorKind>,
        unreadable: HashSet<PathBuf>,
    }

    impl FakeFs {
        fn add_entry(&mut self, path: &Path, kind: EntryKind) {
            let Some(parent) = path.parent() else {
                return;
            };
            self.add_dir(parent);
            let entries = self.dirs.entry(parent.to_path_buf()).or_default();
            if !entries.iter().any(|e| e.path == path) {
                entries.push(DirEntry::new(path, kind));
                entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
            }
        }

        fn add_dir(&mut self, path: impl AsRef<Path>) {
            let path = path.as_ref();
            if self.dirs.contains_key(path) {
                return;
            }
            self.dirs.insert(path.to_path_buf(), Vec::new());
            self.add_entry(path, EntryKind::Directory);
        }

        fn add_file(&mut self, path: impl AsRef<Path>) {
            self.add_entry(path.as_ref(), EntryKind::File);
        }

        fn fail(&mut self, path: impl AsRef<Path>, kind: io::ErrorKind) {
            self.add_dir(path.as_ref());
            self.failures.insert(path.as_ref().to_path_buf(), kind);
        }

        fn deny_read(&mut self, path: impl AsRef<Path>) {
            self.add_file(path.as_ref());
            self.unreadable.insert(path.as_ref().to_path_buf());
        }
    }

    impl FileSystem for FakeFs {
        fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
            if let Some(kind) = self.failures.get(dir) {
                return Err(io::Error::from(*kind));
            }
            Ok(self.dirs.get(dir).cloned().unwrap_or_default())
        }

        fn is_readable(&self, path: &Path) -> bool {
            !self.unreadable.contains(path)
        }

        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            Ok(path.to_path_buf())
        }
    }

    fn locator(fs: FakeFs) -> ConfigLocator<FakeFs> {
        ConfigLocator::with_file_system(fs, ".editorconfig")
    }

    const DOC: &str = "/work/project/src/App.kt";

    #[test]
    fn test_finds_config_in_start_directory() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/src/App.kt");
        fs.add_file("/work/project/src/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/project/src/.editorconfig")));
    }

    #[test]
    fn test_searches_subtree_of_start_directory() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/src/App.kt");
        fs.add_file("/work/project/src/main/style/.editorconfig");
        fs.add_file("/work/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(
            found,
            Some(PathBuf::from("/work/project/src/main/style/.editorconfig"))
        );
    }

    #[test]
    fn test_files_checked_before_subdirectories() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/src/a/.editorconfig");
        fs.add_file("/work/project/src/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/project/src/.editorconfig")));
    }

    #[test]
    fn test_ancestors_searched_non_recursively() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/src/App.kt");
        // Sibling subtree of an ancestor: never scanned
        fs.add_file("/work/project/docs/deep/.editorconfig");
        fs.add_file("/work/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/.editorconfig")));
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/.editorconfig");
        fs.add_file("/work/.editorconfig");
        fs.add_file("/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/project/.editorconfig")));
    }

    #[test]
    fn test_no_match_returns_none() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/src/App.kt");
        fs.add_file("/work/project/editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_exact_file_name_only() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/src/old.editorconfig");
        fs.add_file("/work/project/src/.editorconfig.bak");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_directories_never_returned() {
        let mut fs = FakeFs::default();
        fs.add_dir("/work/project/src/.editorconfig");
        fs.add_file("/work/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/.editorconfig")));
    }

    #[test]
    fn test_root_level_document() {
        let mut fs = FakeFs::default();
        fs.add_file("/nested/.editorconfig");

        let found = locator(fs).locate(Path::new("/App.kt")).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_root_path_has_no_parent() {
        let found = locator(FakeFs::default()).locate(Path::new("/")).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_permission_denied_start_directory_skipped() {
        let mut fs = FakeFs::default();
        fs.fail("/work/project/src", io::ErrorKind::PermissionDenied);
        fs.add_file("/work/project/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/project/.editorconfig")));
    }

    #[test]
    fn test_permission_denied_subdirectory_skipped() {
        let mut fs = FakeFs::default();
        fs.fail("/work/project/src/a_locked", io::ErrorKind::PermissionDenied);
        fs.add_file("/work/project/src/b_open/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(
            found,
            Some(PathBuf::from("/work/project/src/b_open/.editorconfig"))
        );
    }

    #[test]
    fn test_permission_denied_ancestor_skipped() {
        let mut fs = FakeFs::default();
        fs.add_dir("/work/project/src");
        fs.fail("/work/project", io::ErrorKind::PermissionDenied);
        fs.add_file("/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/.editorconfig")));
    }

    #[test]
    fn test_other_io_errors_propagate() {
        let mut fs = FakeFs::default();
        fs.add_dir("/work/project/src");
        fs.fail("/work", io::ErrorKind::TimedOut);
        fs.add_file("/.editorconfig");

        let err = locator(fs).locate(Path::new(DOC)).unwrap_err();
        match err {
            LocateError::Io { path, source } => {
                assert_eq!(path, PathBuf::from("/work"));
                assert_eq!(source.kind(), io::ErrorKind::TimedOut);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unreadable_candidate_skipped() {
        let mut fs = FakeFs::default();
        fs.deny_read("/work/project/src/.editorconfig");
        fs.add_file("/work/project/.editorconfig");

        let found = locator(fs).locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/project/.editorconfig")));
    }

    #[test]
    fn test_custom_file_name() {
        let mut fs = FakeFs::default();
        fs.add_file("/work/project/.editorconfig");
        fs.add_file("/work/ktlint.toml");

        let locator = ConfigLocator::with_file_system(fs, "ktlint.toml");
        assert_eq!(locator.file_name(), "ktlint.toml");
        let found = locator.locate(Path::new(DOC)).unwrap();
        assert_eq!(found, Some(PathBuf::from("/work/ktlint.toml")));
    }

    #[test]
    fn test_real_fs_finds_parent_config() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("module").join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(dir.path().join(".editorconfig"), "root = true\n").unwrap();
        let doc = src.join("Main.kt");
        fs::write(&doc, "fun main() {}\n").unwrap();

        let found = locate(&doc, ".editorconfig").unwrap().unwrap();
        assert_eq!(found, dir.path().join(".editorconfig"));
        assert!(found.is_file());
    }

    #[test]
    fn test_real_fs_searches_subtree() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("src").join("config");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(".editorconfig"), "[*.kt]\n").unwrap();

        let doc = dir.path().join("src").join("Main.kt");
        let found = locate(&doc, ".editorconfig").unwrap();
        assert_eq!(found, Some(nested.join(".editorconfig")));
    }

    #[test]
    fn test_real_fs_root_level_document_terminates() {
        let found = locate(
            Path::new("/kfmt-root-level-document.kt"),
            ".kfmt-config-that-does-not-exist",
        )
        .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_real_fs_non_directory_parent_propagates() {
        let dir = tempdir().unwrap();
        let not_a_dir = dir.path().join("plain.txt");
        fs::write(&not_a_dir, "").unwrap();

        let result = locate(&not_a_dir.join("Main.kt"), ".editorconfig");
        assert!(matches!(result, Err(LocateError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_locked_directory_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let locked = src.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(dir.path().join(".editorconfig"), "root = true\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = locate(&src.join("Main.kt"), ".editorconfig");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(result.unwrap(), Some(dir.path().join(".editorconfig")));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_symlink_cycle_terminates() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink(&src, src.join("loop")).unwrap();
        fs::write(dir.path().join(".editorconfig"), "").unwrap();

        let found = locate(&src.join("Main.kt"), ".editorconfig").unwrap();
        assert_eq!(found, Some(dir.path().join(".editorconfig")));
    }
}
