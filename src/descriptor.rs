//! Application descriptor structures for installer assembly.
//!
//! This module provides the declarative description of an application that
//! the platform drivers turn into native installer packages: identity and
//! metadata, background services, desktop starters, license, lifecycle hooks
//! and platform-specific settings.
//!
//! A descriptor is immutable for the duration of one build and is shared by
//! reference across all feature contributors.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Declarative description of the application being packaged.
///
/// This typically maps from a `packsmith.toml` file, see [`crate::config`].
///
/// # Examples
///
/// ```no_run
/// use packsmith::descriptor::AppDescriptor;
///
/// let mut app = AppDescriptor::default();
/// app.identifier = "ontime".into();
/// app.display_name = "OnTime Scheduler".into();
/// app.version = "2.4.1".into();
/// app.payload_dir = "build/dist".into();
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppDescriptor {
    /// Unix package identifier.
    ///
    /// Lowercase letters, digits, `-`, `.`, `+`; must start with an
    /// alphanumeric character. Used as the Debian package name and as the
    /// default installation directory name.
    pub identifier: String,

    /// Product name displayed to users.
    ///
    /// Shown in installers, system menus and the MSI product table.
    pub display_name: String,

    /// Version string.
    ///
    /// Example: "1.0.0", "2.4.1-beta".
    pub version: String,

    /// Brief description of the application.
    ///
    /// The first line is the short description; subsequent lines become the
    /// long description in the Debian control file.
    #[serde(default)]
    pub description: String,

    /// Vendor or publisher name.
    ///
    /// Default: empty
    #[serde(default)]
    pub vendor: String,

    /// Package maintainer.
    ///
    /// Format: "Name <email@example.com>". Required for Debian builds.
    #[serde(default)]
    pub maintainer: String,

    /// Homepage URL for the application.
    ///
    /// Default: None
    #[serde(default)]
    pub homepage: Option<String>,

    /// Directory containing the application payload to install.
    ///
    /// Every file below this directory is staged under the installation
    /// root. Resolved relative to the descriptor file by [`crate::config`].
    pub payload_dir: PathBuf,

    /// Installation root on the target system.
    ///
    /// Default: `/usr/share/<identifier>`
    #[serde(default)]
    pub install_root: Option<PathBuf>,

    /// Source icon images, in descending preference.
    ///
    /// Any format the image decoder understands; rasterized to the sizes
    /// each platform needs. Default: empty
    #[serde(default)]
    pub icons: Vec<PathBuf>,

    /// End-user license agreement text file.
    ///
    /// When present, the Debian build gates installation on an interactive
    /// debconf acceptance prompt. Default: None
    #[serde(default)]
    pub license_file: Option<PathBuf>,

    /// Background services installed with the application.
    ///
    /// Default: empty
    #[serde(default)]
    pub services: Vec<Service>,

    /// Desktop starters (launchers) installed with the application.
    ///
    /// Default: empty
    #[serde(default)]
    pub starters: Vec<DesktopStarter>,

    /// Command started in the background once installation completes.
    ///
    /// Default: None
    #[serde(default)]
    pub run_after: Option<RunAfter>,

    /// Files below the installation root to delete on install and removal.
    ///
    /// Paths are relative to the installation root. Useful for caches and
    /// generated files that would otherwise survive an upgrade. Default: empty
    #[serde(default)]
    pub delete_files: Vec<String>,

    /// User-supplied script text appended to the lifecycle scripts.
    #[serde(default)]
    pub scripts: UserScripts,

    /// Base name of the produced artifact, without extension.
    ///
    /// Default: `<identifier>-<version>`
    #[serde(default)]
    pub archive_name: Option<String>,

    /// Debian-specific settings.
    #[serde(default)]
    pub deb: DebianSettings,
}

impl AppDescriptor {
    /// Returns the installation root, applying the default when unset.
    pub fn install_root(&self) -> PathBuf {
        match &self.install_root {
            Some(root) => root.clone(),
            None => PathBuf::from(format!("/usr/share/{}", self.identifier)),
        }
    }

    /// Returns the artifact base name, applying the default when unset.
    pub fn archive_name(&self) -> String {
        match &self.archive_name {
            Some(name) => name.clone(),
            None => format!("{}-{}", self.identifier, self.version),
        }
    }

    /// Returns the short (first) line of the description.
    pub fn short_description(&self) -> &str {
        self.description.lines().next().unwrap_or_default().trim()
    }

    /// Checks the descriptor for the fields every build needs.
    ///
    /// Called once after loading, before any driver runs, so configuration
    /// problems surface before the filesystem is touched.
    pub fn validate(&self) -> Result<()> {
        if self.identifier.is_empty() {
            return Err(Error::Config("identifier must not be empty".into()));
        }
        if !valid_unix_name(&self.identifier) {
            return Err(Error::Config(format!(
                "identifier {:?} must be a lowercase unix name (a-z, 0-9, '-', '.', '+')",
                self.identifier
            )));
        }
        if self.display_name.is_empty() {
            return Err(Error::Config("display_name must not be empty".into()));
        }
        if self.version.is_empty() {
            return Err(Error::Config("version must not be empty".into()));
        }
        if self.payload_dir.as_os_str().is_empty() {
            return Err(Error::Config("payload_dir must not be empty".into()));
        }
        for service in &self.services {
            if !valid_unix_name(&service.id) {
                return Err(Error::Config(format!(
                    "service id {:?} must be a lowercase unix name",
                    service.id
                )));
            }
        }
        for starter in &self.starters {
            if starter.executable.is_empty() {
                return Err(Error::Config(
                    "starter executable must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

fn valid_unix_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '+'))
}

/// A background service installed with the application.
///
/// On Debian each service yields a SysV init script registered with
/// `update-rc.d` and started/stopped from the lifecycle scripts. On macOS
/// each service yields a launchd property list installed by the disk-image
/// scripts.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    /// Unix service name, also the init script name under `/etc/init.d`.
    pub id: String,

    /// One-line description shown in service listings.
    #[serde(default)]
    pub description: String,

    /// Jar containing the service entry point, relative to the
    /// installation root.
    pub main_jar: String,

    /// Fully qualified class started as the service.
    pub main_class: String,

    /// Extra arguments passed to the service on start.
    ///
    /// Default: empty
    #[serde(default)]
    pub start_arguments: String,
}

impl Service {
    /// Command line starting this service from the installation root.
    pub fn start_command(&self) -> String {
        let mut cmd = format!("-cp {} {}", self.main_jar, self.main_class);
        if !self.start_arguments.is_empty() {
            cmd.push(' ');
            cmd.push_str(&self.start_arguments);
        }
        cmd
    }
}

/// A desktop starter: menu entry, launcher script and icon set.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesktopStarter {
    /// Executable name installed under `/usr/bin`.
    pub executable: String,

    /// Name shown in the desktop menu.
    pub display_name: String,

    /// Longer comment shown in tooltips.
    ///
    /// Newlines are flattened to spaces in the desktop entry.
    #[serde(default)]
    pub description: String,

    /// Jar containing the starter entry point, relative to the
    /// installation root.
    pub main_jar: String,

    /// Fully qualified class the launcher starts.
    pub main_class: String,

    /// Extra arguments passed before any user-supplied ones.
    ///
    /// Default: empty
    #[serde(default)]
    pub start_arguments: String,

    /// MIME types this starter handles.
    ///
    /// Default: empty
    #[serde(default)]
    pub mime_types: Vec<String>,

    /// Freedesktop menu categories.
    ///
    /// Example: `["Office", "Scheduling"]`. Default: empty
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Command started in the background after installation completes.
///
/// The install must not block on it, so the generated fragment backgrounds
/// the command inside a subshell.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunAfter {
    /// Native executable to run, relative to the working directory.
    ///
    /// Exactly one of `executable` and `main_class` must be set.
    #[serde(default)]
    pub executable: Option<String>,

    /// Jar put on the class path when starting by class name.
    #[serde(default)]
    pub main_jar: Option<String>,

    /// Fully qualified class to run with `java -cp`.
    #[serde(default)]
    pub main_class: Option<String>,

    /// Working directory relative to the installation root.
    ///
    /// Default: the installation root itself
    #[serde(default)]
    pub work_dir: Option<String>,
}

/// User-supplied script text per lifecycle phase.
///
/// Each entry is appended verbatim as the first tail fragment of its phase,
/// ahead of every generated fragment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserScripts {
    /// Text appended to the pre-install script.
    #[serde(default)]
    pub preinst: Option<String>,

    /// Text appended to the post-install script.
    #[serde(default)]
    pub postinst: Option<String>,

    /// Text appended to the pre-remove script.
    #[serde(default)]
    pub prerm: Option<String>,

    /// Text appended to the post-remove script.
    #[serde(default)]
    pub postrm: Option<String>,
}

impl UserScripts {
    /// True when no phase has user-supplied text.
    pub fn is_empty(&self) -> bool {
        self.preinst.is_none()
            && self.postinst.is_none()
            && self.prerm.is_none()
            && self.postrm.is_none()
    }
}

/// Debian package (.deb) configuration.
///
/// # Configuration
///
/// ```toml
/// [deb]
/// section = "java"
/// priority = "optional"
/// depends = "default-jre-headless (>= 2:1.8)"
/// architecture = "all"
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebianSettings {
    /// Archive section the package belongs to.
    ///
    /// Default: "misc"
    #[serde(default = "default_section")]
    pub section: String,

    /// Package priority.
    ///
    /// Default: "optional"
    #[serde(default = "default_priority")]
    pub priority: String,

    /// Dependency line in Debian syntax.
    ///
    /// Example: `"default-jre (>= 2:1.8), libc6"`. Default: None
    #[serde(default)]
    pub depends: Option<String>,

    /// Target architecture for the control file.
    ///
    /// Default: "all"
    #[serde(default = "default_architecture")]
    pub architecture: String,

    /// Run `lintian` on the produced package.
    ///
    /// A failed check fails the build. Default: true
    #[serde(default = "default_true")]
    pub check_package: bool,
}

impl Default for DebianSettings {
    fn default() -> Self {
        DebianSettings {
            section: default_section(),
            priority: default_priority(),
            depends: None,
            architecture: default_architecture(),
            check_package: true,
        }
    }
}

fn default_section() -> String {
    "misc".into()
}

fn default_priority() -> String {
    "optional".into()
}

fn default_architecture() -> String {
    "all".into()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AppDescriptor {
        AppDescriptor {
            identifier: "ontime".into(),
            display_name: "OnTime".into(),
            version: "1.0".into(),
            payload_dir: "dist".into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_derive_from_identifier() {
        let app = minimal();
        assert_eq!(app.install_root(), PathBuf::from("/usr/share/ontime"));
        assert_eq!(app.archive_name(), "ontime-1.0");
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let mut app = minimal();
        app.install_root = Some("/opt/ontime".into());
        app.archive_name = Some("ontime-nightly".into());
        assert_eq!(app.install_root(), PathBuf::from("/opt/ontime"));
        assert_eq!(app.archive_name(), "ontime-nightly");
    }

    #[test]
    fn validate_rejects_bad_identifier() {
        let mut app = minimal();
        app.identifier = "OnTime".into();
        assert!(app.validate().is_err());

        app.identifier = "-leading".into();
        assert!(app.validate().is_err());

        app.identifier = "on-time.2+".into();
        assert!(app.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_required_fields() {
        let mut app = minimal();
        app.display_name.clear();
        assert!(app.validate().is_err());

        let mut app = minimal();
        app.version.clear();
        assert!(app.validate().is_err());

        let mut app = minimal();
        app.services.push(Service {
            id: "Bad Name".into(),
            ..Default::default()
        });
        assert!(app.validate().is_err());
    }

    #[test]
    fn short_description_takes_first_line() {
        let mut app = minimal();
        app.description = "Scheduler daemon\nLong text\nmore".into();
        assert_eq!(app.short_description(), "Scheduler daemon");
    }

    #[test]
    fn service_start_command_includes_arguments() {
        let svc = Service {
            id: "ontime-srv".into(),
            main_jar: "ontime.jar".into(),
            main_class: "com.example.Server".into(),
            start_arguments: "-port 8080".into(),
            ..Default::default()
        };
        assert_eq!(
            svc.start_command(),
            "-cp ontime.jar com.example.Server -port 8080"
        );
    }
}
