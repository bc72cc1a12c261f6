//! Recursive directory copy/delete behind a seam the orchestrators can fake.

use std::fs;
use std::path::Path;

use anyhow::Context;

/// Filesystem operations the deployment directory manager needs.
pub trait TreeOps {
    fn exists(&self, path: &Path) -> bool;

    /// True only for an existing directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// Delete a file or directory tree; a missing path is not an error.
    fn remove_tree(&self, path: &Path) -> anyhow::Result<()>;

    /// Copy the directory `src` to `dst`, creating `dst`.
    fn copy_tree(&self, src: &Path, dst: &Path) -> anyhow::Result<()>;
}

/// The real local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTree;

impl TreeOps for LocalTree {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_tree(&self, path: &Path) -> anyhow::Result<()> {
        remove_path_if_exists(path).map(|_| ())
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> anyhow::Result<()> {
        let meta = fs::metadata(src)
            .with_context(|| format!("Failed to stat source directory: {}", src.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", src.display());
        }
        fs::create_dir_all(dst)
            .with_context(|| format!("Failed to create directory: {}", dst.display()))?;
        copy_dir_contents(src, dst)
    }
}

/// Delete `path` if anything is there; `Ok(false)` when it was already gone.
pub fn remove_path_if_exists(path: &Path) -> anyhow::Result<bool> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(false);
    }
    remove_path(path).with_context(|| format!("Failed to remove: {}", path.display()))?;
    Ok(true)
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_dir_contents(src: &Path, dst: &Path) -> anyhow::Result<()> {
    let listing = fs::read_dir(src).with_context(|| format!("Failed to list: {}", src.display()))?;
    for entry in listing {
        let entry = entry.with_context(|| format!("Failed to list: {}", src.display()))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let kind = entry
            .file_type()
            .with_context(|| format!("Failed to stat: {}", from.display()))?;

        if kind.is_dir() {
            fs::create_dir_all(&to)
                .with_context(|| format!("Failed to create directory: {}", to.display()))?;
            copy_dir_contents(&from, &to)?;
        } else if kind.is_file() {
            fs::copy(&from, &to)
                .with_context(|| format!("Failed to copy {} -> {}", from.display(), to.display()))?;
        } else {
            anyhow::bail!("Cannot copy {}: not a file or directory", from.display());
        }
    }
    Ok(())
}

/// Whether an error looks like files held open by a running process.
///
/// These are worth one retry after a backoff; everything else is not.
pub fn is_locked_resource_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(is_locked_io_error)
    })
}

fn is_locked_io_error(err: &std::io::Error) -> bool {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        return true;
    }
    let Some(code) = err.raw_os_error() else {
        return false;
    };

    #[cfg(windows)]
    {
        const ERROR_SHARING_VIOLATION: i32 = 32;
        const ERROR_LOCK_VIOLATION: i32 = 33;
        code == ERROR_SHARING_VIOLATION || code == ERROR_LOCK_VIOLATION
    }

    #[cfg(unix)]
    {
        const EBUSY: i32 = 16;
        const ETXTBSY: i32 = 26;
        code == EBUSY || code == ETXTBSY
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        false
    }
}
