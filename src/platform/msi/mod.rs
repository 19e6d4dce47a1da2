//! Windows Installer (.msi) generation.
//!
//! Drives the WiX v3 toolset. The pipeline:
//!
//! 1. stage the payload into the scratch directory
//! 2. generate the `.wxs` authoring next to the artifact ([`wxs`])
//! 3. compile it with `candle`
//! 4. link the resulting object with `light` into `<archive>.msi`
//! 5. verify the artifact exists
//!
//! `candle` and `light` are located through [`toolchain::WixToolset`].
//! Features with no Windows counterpart (init services, debconf license
//! prompts, lifecycle scripts) are skipped with a warning.

pub mod toolchain;
pub mod wxs;

use std::path::{Path, PathBuf};

use crate::descriptor::AppDescriptor;
use crate::error::{Context, Error, Result};
use crate::exec::Invocation;
use crate::platform::{PackageDriver, PackageType};
use crate::staging::StagingTree;

use toolchain::WixToolset;

/// Builds a Windows Installer package from a descriptor.
pub struct MsiDriver {
    dest_dir: PathBuf,
    work_dir: PathBuf,
    toolset: Option<WixToolset>,
}

impl MsiDriver {
    /// Creates a driver writing its artifact into `dest_dir` and staging
    /// below `work_dir`.
    pub fn new(dest_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        MsiDriver {
            dest_dir: dest_dir.into(),
            work_dir: work_dir.into(),
            toolset: None,
        }
    }

    /// Overrides toolset discovery, mainly for tests.
    pub fn with_toolset(mut self, toolset: WixToolset) -> Self {
        self.toolset = Some(toolset);
        self
    }

    /// Stages the payload and writes the `.wxs` authoring.
    ///
    /// Split from [`PackageDriver::build`] so the generated authoring can
    /// be inspected on hosts without the WiX toolset installed. Returns the
    /// path of the written `.wxs` file.
    pub async fn prepare(&self, app: &AppDescriptor) -> Result<PathBuf> {
        warn_skipped_features(app);

        let tree = StagingTree::create(self.work_dir.join("msi")).await?;
        let staged = tree
            .stage_payload(&app.payload_dir, Path::new("payload"))
            .await
            .context("staging application payload")?;

        let wxs_path = self.dest_dir.join(format!("{}.wxs", app.archive_name()));
        wxs::generate(app, &staged, &wxs_path)
            .await
            .context("generating wix authoring")
    }

    fn artifact_path(&self, app: &AppDescriptor) -> PathBuf {
        self.dest_dir.join(format!("{}.msi", app.archive_name()))
    }

    async fn run_candle(&self, toolset: &WixToolset, wxs_path: &Path) -> Result<()> {
        // the trailing separator makes candle treat -out as a directory
        let out_dir = format!("{}{}", self.dest_dir.display(), std::path::MAIN_SEPARATOR);
        Invocation::new(toolset.tool_path("candle.exe").display().to_string())
            .arg("-out")
            .arg(out_dir)
            .arg(wxs_path.display().to_string())
            .current_dir(&self.dest_dir)
            .run()
            .await?;
        Ok(())
    }

    async fn run_light(&self, toolset: &WixToolset, app: &AppDescriptor) -> Result<()> {
        let archive = app.archive_name();
        Invocation::new(toolset.tool_path("light.exe").display().to_string())
            .arg(format!("{archive}.wixobj"))
            .arg("-out")
            .arg(format!("{archive}.msi"))
            .current_dir(&self.dest_dir)
            .run()
            .await?;
        Ok(())
    }
}

/// Logs a warning for every descriptor feature the MSI package cannot carry.
fn warn_skipped_features(app: &AppDescriptor) {
    if !app.services.is_empty() {
        log::warn!("services are not supported in the msi package, skipping");
    }
    if app.license_file.is_some() {
        log::warn!("the license prompt is not supported in the msi package, skipping");
    }
    if app.run_after.is_some() {
        log::warn!("run_after is not supported in the msi package, skipping");
    }
    if !app.delete_files.is_empty() {
        log::warn!("delete_files is not supported in the msi package, skipping");
    }
    if !app.scripts.is_empty() {
        log::warn!("lifecycle scripts are not supported in the msi package, skipping");
    }
}

impl PackageDriver for MsiDriver {
    fn package_type(&self) -> PackageType {
        PackageType::Msi
    }

    async fn build(&self, app: &AppDescriptor) -> Result<PathBuf> {
        let wxs_path = self.prepare(app).await?;

        let toolset = match &self.toolset {
            Some(toolset) => toolset.clone(),
            None => WixToolset::from_env()?,
        };
        self.run_candle(&toolset, &wxs_path).await?;
        self.run_light(&toolset, app).await?;

        let artifact = self.artifact_path(app);
        if !artifact.is_file() {
            return Err(Error::Verification(format!(
                "wix did not produce {}",
                artifact.display()
            )));
        }
        log::info!("built {}", artifact.display());
        Ok(artifact)
    }
}
