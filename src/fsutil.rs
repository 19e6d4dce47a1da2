//! File system utilities for package staging.
//!
//! Provides safe file operations with automatic directory creation,
//! symlink preservation, and the permission fixup passes the package
//! formats require.

use std::{io, path::Path};

use tokio::fs;

use crate::error::{Error, ErrorExt, Result};

/// Creates the given directory path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase && path.exists() {
        fs::remove_dir_all(path)
            .await
            .fs_context("erasing directory", path)?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)?;
    Ok(())
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await?;
    }

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        debug_assert!(entry.path().starts_with(from));
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path()).await?;
            if entry.path().is_dir() {
                symlink_dir(&target, &dest_path)?;
            } else {
                symlink_file(&target, &dest_path)?;
            }
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(dest_path).await?;
        } else {
            fs::copy(entry.path(), dest_path).await?;
        }
    }

    Ok(())
}

/// Sets unix permission bits on a path. No-op on platforms without them.
#[cfg(unix)]
pub async fn set_unix_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .fs_context("setting permissions on", path)?;
    Ok(())
}

/// Sets unix permission bits on a path. No-op on platforms without them.
#[cfg(not(unix))]
pub async fn set_unix_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Normalizes the permissions of every file below `root`: 644 for regular
/// files, 755 for shell scripts (`.sh`).
///
/// Directories are left alone; [`fix_directory_permissions`] handles them
/// after all control files exist.
pub async fn fix_file_permissions(root: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let executable = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sh"));
        let mode = if executable { 0o755 } else { 0o644 };
        set_unix_mode(entry.path(), mode).await?;
    }
    Ok(())
}

/// Sets every directory below `root`, and `root` itself, to 755.
pub async fn fix_directory_permissions(root: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            set_unix_mode(entry.path(), 0o755).await?;
        }
    }
    Ok(())
}
