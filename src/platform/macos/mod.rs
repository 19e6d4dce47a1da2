//! macOS disk-image generation.
//!
//! Assembles a staging folder holding the payload next to installer
//! scripts, then wraps it into a compressed disk image:
//!
//! 1. stage the payload under `<identifier>/`
//! 2. write `scripts/preinstall.sh`, which stops and removes launchd
//!    services left by a previous installation
//! 3. write `scripts/postinstall.sh`, which registers each service from
//!    the property list staged next to it
//! 4. `hdiutil create` the `.dmg`
//!
//! The scripts are [`scripts::OsxScript`] trees: one parent per phase with
//! one install/uninstall child per service.

pub mod scripts;

use std::path::{Path, PathBuf};

use crate::descriptor::{AppDescriptor, Service};
use crate::error::{Context, Error, Result};
use crate::exec::{self, Invocation};
use crate::platform::{PackageDriver, PackageType};
use crate::staging::StagingTree;
use crate::template::Template;

use scripts::OsxScript;

/// Builds a macOS disk image from a descriptor.
pub struct MacosDriver {
    dest_dir: PathBuf,
    work_dir: PathBuf,
}

impl MacosDriver {
    /// Creates a driver writing its artifact into `dest_dir` and staging
    /// below `work_dir`.
    pub fn new(dest_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        MacosDriver {
            dest_dir: dest_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Stages payload, installer scripts and service property lists.
    ///
    /// Split from [`PackageDriver::build`] so the staged tree can be
    /// checked on hosts without `hdiutil`.
    pub async fn prepare(&self, app: &AppDescriptor) -> Result<StagingTree> {
        warn_skipped_features(app);

        let tree = StagingTree::create(self.work_dir.join("dmg")).await?;
        tree.stage_payload(&app.payload_dir, Path::new(&app.identifier))
            .await
            .context("staging application payload")?;

        let mut preinstall = OsxScript::new("osx/preinstall.sh")?;
        let mut postinstall = OsxScript::new("osx/postinstall.sh")?;
        for service in &app.services {
            let mut uninstall = OsxScript::new("osx/uninstall-service.sh")?;
            uninstall.set_placeholder("serviceName", Some(&service.id));
            preinstall.add_child(uninstall);

            let mut install = OsxScript::new("osx/install-service.sh")?;
            install.set_placeholder("serviceName", Some(&service.id));
            postinstall.add_child(install);

            write_service_plist(app, service, &tree).await?;
        }
        preinstall
            .write_to(&tree.path("scripts/preinstall.sh"))
            .await?;
        postinstall
            .write_to(&tree.path("scripts/postinstall.sh"))
            .await?;
        Ok(tree)
    }

    fn artifact_path(&self, app: &AppDescriptor) -> PathBuf {
        self.dest_dir.join(format!("{}.dmg", app.archive_name()))
    }

    async fn run_hdiutil(&self, app: &AppDescriptor, tree: &StagingTree, artifact: &Path) -> Result<()> {
        Invocation::new("hdiutil")
            .arg("create")
            .arg("-volname")
            .arg(&app.display_name)
            .arg("-srcfolder")
            .arg(tree.root().display().to_string())
            .arg("-ov")
            .arg("-format")
            .arg("UDZO")
            .arg(artifact.display().to_string())
            .run()
            .await?;
        Ok(())
    }
}

/// Writes the launchd property list for one service into `scripts/`,
/// next to the install script that copies it to `/Library/LaunchDaemons`.
async fn write_service_plist(
    app: &AppDescriptor,
    service: &Service,
    tree: &StagingTree,
) -> Result<()> {
    let root = app.install_root();
    let root = root.display();

    // services share the run-after working directory when one is configured
    let work_dir = app.run_after.as_ref().and_then(|r| r.work_dir.as_deref());
    let (working_dir, main_jar) = match work_dir {
        Some(wd) => (
            format!("{root}/{wd}"),
            format!("{root}/{wd}/{}", service.main_jar),
        ),
        None => (root.to_string(), format!("{root}/{}", service.main_jar)),
    };

    let mut arguments = String::new();
    for arg in service.start_arguments.split_whitespace() {
        arguments.push_str(&format!("        <string>{}</string>\n", xml_escape(arg)));
    }

    let mut plist = Template::load("osx/launchd-service.plist")?;
    plist.set_placeholder("serviceName", Some(&service.id));
    plist.set_placeholder("mainJar", Some(&xml_escape(&main_jar)));
    plist.set_placeholder("mainClass", Some(&xml_escape(&service.main_class)));
    plist.set_placeholder("startArguments", Some(&arguments));
    plist.set_placeholder("workingDir", Some(&xml_escape(&working_dir)));
    plist
        .write_to(&tree.path(format!("scripts/{}.plist", service.id)), false)
        .await
}

/// Logs a warning for every descriptor feature the disk image cannot carry.
fn warn_skipped_features(app: &AppDescriptor) {
    if !app.starters.is_empty() {
        log::warn!("desktop starters are not supported in the disk image, skipping");
    }
    if app.license_file.is_some() {
        log::warn!("the license prompt is not supported in the disk image, skipping");
    }
    if app.run_after.is_some() {
        log::warn!("the run_after command is not supported in the disk image, skipping");
    }
    if !app.delete_files.is_empty() {
        log::warn!("delete_files is not supported in the disk image, skipping");
    }
    if !app.scripts.is_empty() {
        log::warn!("lifecycle scripts are not supported in the disk image, skipping");
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl PackageDriver for MacosDriver {
    fn package_type(&self) -> PackageType {
        PackageType::Dmg
    }

    async fn build(&self, app: &AppDescriptor) -> Result<PathBuf> {
        // preflight: report the missing tool before staging any file
        exec::require_tool("hdiutil")?;

        let tree = self.prepare(app).await?;

        tokio::fs::create_dir_all(&self.dest_dir)
            .await
            .map_err(Error::from)
            .context("creating destination directory")?;
        let artifact = self.artifact_path(app);
        self.run_hdiutil(app, &tree, &artifact).await?;

        log::info!("built {}", artifact.display());
        Ok(artifact)
    }
}
