//! The on-disk staging tree a package is assembled in.
//!
//! A [`StagingTree`] mirrors the target filesystem below one scratch
//! directory: the payload lands under the installation root, generated
//! files (init scripts, launchers, desktop entries) at their absolute
//! target locations, and Debian control files under `DEBIAN/`. The tree is
//! created fresh for every build and deliberately left on disk afterwards
//! so a failed or surprising build can be inspected.

use std::path::{Path, PathBuf};

use crate::error::{ErrorExt, Result};
use crate::fsutil;

/// Scratch directory a package build assembles its contents in.
#[derive(Clone, Debug)]
pub struct StagingTree {
    root: PathBuf,
}

impl StagingTree {
    /// Creates the staging directory, erasing leftovers of a previous build.
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fsutil::create_dir_all(&root, true).await?;
        Ok(StagingTree { root })
    }

    /// The staging root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The Debian control directory, `DEBIAN/` below the root.
    pub fn control_dir(&self) -> PathBuf {
        self.root.join("DEBIAN")
    }

    /// Resolves a path relative to the staging root.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel.as_ref())
    }

    /// Maps an absolute target-system path into the staging tree.
    ///
    /// `/usr/share/app` becomes `<root>/usr/share/app`.
    pub fn target_path(&self, absolute: &Path) -> PathBuf {
        let rel = absolute.strip_prefix("/").unwrap_or(absolute);
        self.root.join(rel)
    }

    /// Writes a file below the root, creating parent directories.
    ///
    /// Sets mode 755 when `executable`, 644 otherwise, and returns the
    /// absolute path of the written file.
    pub async fn write(
        &self,
        rel: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
        executable: bool,
    ) -> Result<PathBuf> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }
        tokio::fs::write(&path, contents)
            .await
            .fs_context("writing staged file", &path)?;
        fsutil::set_unix_mode(&path, if executable { 0o755 } else { 0o644 }).await?;
        Ok(path)
    }

    /// Copies the application payload below the installation root.
    ///
    /// Returns the staged payload directory.
    pub async fn stage_payload(&self, payload: &Path, install_root: &Path) -> Result<PathBuf> {
        let dest = self.target_path(install_root);
        log::info!(
            "staging payload {} -> {}",
            payload.display(),
            dest.display()
        );
        fsutil::copy_dir(payload, &dest).await?;
        Ok(dest)
    }
}
