//! Debian package (.deb) driver.
//!
//! Assembles the staging tree (payload, init scripts, launchers, control
//! files, lifecycle scripts), then hands it to `fakeroot dpkg-deb --build`
//! and checks the result with `lintian`. The `.deb` container format itself
//! is never touched here; `dpkg-deb` owns it.
//!
//! Pipeline states, in order:
//!
//! 1. stage payload below the installation root
//! 2. normalize file permissions (644, shell scripts 755)
//! 3. run the feature contributors
//! 4. write control metadata and lifecycle scripts
//! 5. write the doc files (`copyright`, `changelog.gz`)
//! 6. normalize directory permissions (755, recursive)
//! 7. `fakeroot dpkg-deb --build`
//! 8. `lintian` on the artifact, unless disabled
//!
//! States 1-6 are exposed as [`DebDriver::prepare`] so the assembled tree
//! can be inspected without the external tools installed.

pub mod control;
pub mod docs;
pub mod features;

use std::path::{Path, PathBuf};

use crate::descriptor::AppDescriptor;
use crate::error::{Context, Error, Result};
use crate::exec::{self, Invocation};
use crate::fsutil;
use crate::platform::{PackageDriver, PackageType};
use crate::script::ScriptComposer;
use crate::staging::StagingTree;

use control::ControlBuilder;

/// Driver producing a `.deb` package.
pub struct DebDriver {
    dest_dir: PathBuf,
    work_dir: PathBuf,
}

impl DebDriver {
    /// Creates a driver writing its artifact into `dest_dir` and staging
    /// below `work_dir`.
    pub fn new(dest_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        DebDriver {
            dest_dir: dest_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Runs every pipeline state up to, but not including, the external
    /// build: the returned staging tree holds the complete package content.
    pub async fn prepare(&self, app: &AppDescriptor) -> Result<StagingTree> {
        let tree = StagingTree::create(self.work_dir.join("deb")).await?;

        let staged_payload = tree
            .stage_payload(&app.payload_dir, &app.install_root())
            .await
            .context("staging application payload")?;
        fsutil::fix_file_permissions(&staged_payload).await?;

        let mut composer = ScriptComposer::new();
        let mut control = ControlBuilder::new();

        features::contribute_user_scripts(app, &mut composer);
        features::contribute_services(app, &tree, &mut composer, &mut control).await?;
        features::contribute_starters(app, &tree).await?;
        features::contribute_eula(app, &tree, &mut composer).await?;
        features::contribute_delete_files(app, &mut composer);
        features::contribute_run_after(app, &mut composer);

        control
            .build(app, &tree, &composer)
            .await
            .context("writing control files")?;
        docs::build(app, &tree).await.context("writing doc files")?;

        fsutil::fix_directory_permissions(tree.root()).await?;
        Ok(tree)
    }

    /// The artifact path this driver will produce.
    fn artifact_path(&self, app: &AppDescriptor) -> PathBuf {
        self.dest_dir.join(format!("{}.deb", app.archive_name()))
    }

    async fn run_dpkg_deb(&self, tree: &StagingTree, artifact: &Path) -> Result<()> {
        Invocation::new("fakeroot")
            .arg("dpkg-deb")
            .arg("--build")
            .arg(tree.root().display().to_string())
            .arg(artifact.display().to_string())
            .run()
            .await?;
        Ok(())
    }

    async fn check_package(&self, artifact: &Path) -> Result<()> {
        Invocation::new("lintian")
            .arg(artifact.display().to_string())
            .run()
            .await
            .map_err(|e| match e {
                Error::ToolExited { .. } => {
                    Error::Verification(format!("lintian rejected {}", artifact.display()))
                }
                other => other,
            })?;
        Ok(())
    }
}

impl PackageDriver for DebDriver {
    fn package_type(&self) -> PackageType {
        PackageType::Deb
    }

    async fn build(&self, app: &AppDescriptor) -> Result<PathBuf> {
        // preflight: report missing tools before staging any file
        exec::require_tool("fakeroot")?;
        exec::require_tool("dpkg-deb")?;
        if app.deb.check_package {
            exec::require_tool("lintian")?;
        }

        let tree = self.prepare(app).await?;

        tokio::fs::create_dir_all(&self.dest_dir)
            .await
            .map_err(Error::from)
            .context("creating destination directory")?;
        let artifact = self.artifact_path(app);
        self.run_dpkg_deb(&tree, &artifact).await?;

        if app.deb.check_package {
            self.check_package(&artifact).await?;
        } else {
            log::warn!("package check disabled, skipping lintian");
        }

        log::info!("built {}", artifact.display());
        Ok(artifact)
    }
}
