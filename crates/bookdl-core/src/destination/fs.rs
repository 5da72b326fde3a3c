//! Filesystem seam used by the resolver.

use std::io;
use std::path::Path;

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// `std::fs`-backed filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling symlink still counts as taken.
        path.symlink_metadata().is_ok()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    /// Rename, or copy + remove when the rename fails (e.g. the staging
    /// area sits on another device). The rename error wins if the copy
    /// fails too, and a half-written copy we created is removed.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Err(rename_err) = std::fs::rename(from, to) {
            if rename_err.kind() == io::ErrorKind::NotFound {
                return Err(rename_err);
            }
            let fresh = !self.exists(to);
            if let Err(copy_err) = std::fs::copy(from, to) {
                tracing::debug!(to = %to.display(), "copy fallback failed: {}", copy_err);
                if fresh {
                    let _ = std::fs::remove_file(to);
                }
                return Err(rename_err);
            }
            std::fs::remove_file(from)?;
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}
