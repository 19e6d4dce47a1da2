//! Build orchestration.
//!
//! [`Packager`] turns one descriptor into one artifact per requested
//! package type by delegating to the platform drivers and collecting
//! size and checksum metadata for each produced file.
//!
//! # Example
//!
//! ```no_run
//! use packsmith::packager::Packager;
//! use packsmith::platform::PackageType;
//!
//! # async fn example(app: packsmith::descriptor::AppDescriptor) -> packsmith::error::Result<()> {
//! let packager = Packager::new("dist", "build");
//! let built = packager.bundle(&app, &[PackageType::Deb]).await?;
//!
//! for package in built {
//!     println!("{} ({} bytes, sha256 {})", package.path.display(), package.size, package.checksum);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::descriptor::AppDescriptor;
use crate::error::{ErrorExt, Result};
use crate::platform::debian::DebDriver;
use crate::platform::macos::MacosDriver;
use crate::platform::msi::MsiDriver;
use crate::platform::rpm::RpmDriver;
use crate::platform::{PackageDriver, PackageType};

/// One produced installer artifact.
#[derive(Clone, Debug)]
pub struct BuiltPackage {
    /// Format the artifact was built for.
    pub package_type: PackageType,
    /// Path of the artifact below the destination directory.
    pub path: PathBuf,
    /// Artifact size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256 of the artifact.
    pub checksum: String,
}

/// Builds installer packages from a descriptor.
///
/// Artifacts land in `dest_dir`; each driver stages below its own
/// subdirectory of `work_dir`, which is left on disk for inspection.
pub struct Packager {
    dest_dir: PathBuf,
    work_dir: PathBuf,
}

impl Packager {
    /// Creates a packager writing artifacts into `dest_dir` and staging
    /// below `work_dir`.
    pub fn new(dest_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Packager {
            dest_dir: dest_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Builds one artifact per requested type, in the order given.
    ///
    /// The first failing build aborts the run; earlier artifacts stay on
    /// disk but are not reported.
    pub async fn bundle(
        &self,
        app: &AppDescriptor,
        types: &[PackageType],
    ) -> Result<Vec<BuiltPackage>> {
        app.validate()?;

        let mut built = Vec::new();
        for package_type in types {
            let path = match package_type {
                PackageType::Deb => {
                    DebDriver::new(&self.dest_dir, &self.work_dir)
                        .build(app)
                        .await?
                }
                PackageType::Msi => {
                    MsiDriver::new(&self.dest_dir, &self.work_dir)
                        .build(app)
                        .await?
                }
                PackageType::Rpm => RpmDriver::new().build(app).await?,
                PackageType::Dmg => {
                    MacosDriver::new(&self.dest_dir, &self.work_dir)
                        .build(app)
                        .await?
                }
            };

            let metadata = tokio::fs::metadata(&path)
                .await
                .fs_context("reading artifact metadata", &path)?;
            let checksum = calculate_sha256(&path).await?;

            built.push(BuiltPackage {
                package_type: *package_type,
                path,
                size: metadata.len(),
                checksum,
            });
        }
        Ok(built)
    }
}

/// Hex-encoded SHA-256 of a file, read in 8 KiB chunks.
async fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening artifact for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading artifact for hashing", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn checksum_matches_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact");
        std::fs::write(&path, b"abc").unwrap();

        let checksum = calculate_sha256(&path).await.unwrap();
        assert_eq!(
            checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn invalid_descriptor_fails_before_any_build() {
        let app = AppDescriptor {
            identifier: "Bad Name".into(),
            display_name: "App".into(),
            version: "1.0".into(),
            payload_dir: "payload".into(),
            ..Default::default()
        };

        let packager = Packager::new("dist", "build");
        let err = packager
            .bundle(&app, &[PackageType::Deb])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn rpm_refusal_propagates() {
        let app = AppDescriptor {
            identifier: "ontime".into(),
            display_name: "OnTime".into(),
            version: "1.0".into(),
            payload_dir: "payload".into(),
            ..Default::default()
        };

        let packager = Packager::new("dist", "build");
        let err = packager
            .bundle(&app, &[PackageType::Rpm])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unimplemented("rpm")));
    }
}
