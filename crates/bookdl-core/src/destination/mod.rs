//! Collision-free destinations for finished downloads.
//!
//! `resolve` picks `name`, then `stem (1).ext`, `stem (2).ext`, ... in the
//! target directory; `move_file` lands the transport's temp file there.
//! Resolution and the move both run on the coordinator's single writer, so
//! two completions can never pick the same free name.

mod filename;
mod fs;

pub use filename::{
    destination_name, filename_from_url_path, parse_content_disposition_filename,
    sanitize_filename,
};
pub use fs::{FileSystem, LocalFileSystem};

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct DestinationResolver {
    fs: Arc<dyn FileSystem>,
}

impl DestinationResolver {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Returns the first unused path for `desired_name` inside `directory`,
    /// creating the directory if it is missing.
    pub fn resolve(&self, desired_name: &str, directory: &Path) -> io::Result<PathBuf> {
        self.fs.create_dir_all(directory)?;

        let first = directory.join(desired_name);
        if !self.fs.exists(&first) {
            return Ok(first);
        }

        let desired = Path::new(desired_name);
        let stem = desired
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| OsString::from(desired_name));
        let ext = desired.extension();

        for n in 1u64.. {
            let mut candidate = stem.clone();
            candidate.push(format!(" ({n})"));
            if let Some(ext) = ext {
                candidate.push(".");
                candidate.push(ext);
            }
            let path = directory.join(&candidate);
            if !self.fs.exists(&path) {
                return Ok(path);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name for {desired_name} in {}", directory.display()),
        ))
    }

    pub fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.fs.move_file(from, to)
    }

    /// Deletes a temp file nobody will move into place. Already gone is fine.
    pub fn discard(&self, path: &Path) -> io::Result<()> {
        match self.fs.remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DestinationResolver {
        DestinationResolver::new(Arc::new(LocalFileSystem))
    }

    #[test]
    fn unused_name_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let p = resolver().resolve("book.epub", dir.path()).unwrap();
        assert_eq!(p, dir.path().join("book.epub"));
    }

    #[test]
    fn collisions_get_numbered_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver();
        std::fs::write(dir.path().join("book.epub"), b"1").unwrap();

        let second = r.resolve("book.epub", dir.path()).unwrap();
        assert_eq!(second, dir.path().join("book (1).epub"));
        std::fs::write(&second, b"2").unwrap();

        let third = r.resolve("book.epub", dir.path()).unwrap();
        assert_eq!(third, dir.path().join("book (2).epub"));
    }

    #[test]
    fn name_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"x").unwrap();
        let p = resolver().resolve("README", dir.path()).unwrap();
        assert_eq!(p, dir.path().join("README (1)"));
    }

    #[test]
    fn only_last_extension_is_kept_apart() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("archive.tar.gz"), b"x").unwrap();
        let p = resolver().resolve("archive.tar.gz", dir.path()).unwrap();
        assert_eq!(p, dir.path().join("archive.tar (1).gz"));
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Downloads").join("books");
        let p = resolver().resolve("a.pdf", &nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(p, nested.join("a.pdf"));
    }

    #[test]
    fn move_lands_file_at_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("7.part");
        std::fs::write(&from, b"payload").unwrap();
        let r = resolver();
        let to = r.resolve("novel.epub", &dir.path().join("out")).unwrap();
        r.move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"payload");
    }

    #[test]
    fn discard_tolerates_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("9.part");
        std::fs::write(&temp, b"abandoned").unwrap();
        let r = resolver();
        r.discard(&temp).unwrap();
        assert!(!temp.exists());
        r.discard(&temp).unwrap();
    }
}
