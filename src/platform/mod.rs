//! Platform package drivers.
//!
//! One driver per target package format. Every driver consumes the same
//! application descriptor and produces one artifact; everything
//! platform-specific (control files, lifecycle script dialects, external
//! build tools) stays inside the driver module:
//!
//! - [`debian`]: `.deb` via `fakeroot dpkg-deb`, checked with `lintian`
//! - [`msi`]: `.msi` via the WiX toolset (`candle` and `light`)
//! - [`rpm`]: not implemented, fails up front
//! - [`macos`]: `.dmg` via `hdiutil` with launchd service scripts

pub mod debian;
pub mod macos;
pub mod msi;
pub mod rpm;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::descriptor::AppDescriptor;
use crate::error::{Error, Result};

/// The package formats a build can request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum PackageType {
    /// Debian package (.deb) for Debian, Ubuntu and derivatives.
    Deb,

    /// Windows installer (.msi) built with the WiX toolset.
    Msi,

    /// RPM package (.rpm). Recognized but not implemented.
    Rpm,

    /// macOS disk image (.dmg) with install scripts.
    Dmg,
}

impl PackageType {
    /// Lowercase identifier used in CLI arguments and log output; also the
    /// artifact file extension.
    pub fn short_name(self) -> &'static str {
        match self {
            PackageType::Deb => "deb",
            PackageType::Msi => "msi",
            PackageType::Rpm => "rpm",
            PackageType::Dmg => "dmg",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for PackageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deb" => Ok(PackageType::Deb),
            "msi" => Ok(PackageType::Msi),
            "rpm" => Ok(PackageType::Rpm),
            "dmg" => Ok(PackageType::Dmg),
            other => Err(Error::Config(format!(
                "unknown package format {other:?} (expected deb, msi, rpm or dmg)"
            ))),
        }
    }
}

/// Uniform interface of the per-platform drivers.
///
/// A driver stages the payload, runs the feature contributors, fixes
/// permissions, invokes the platform's build tool and verifies the result.
/// `build` returns the path of the produced artifact.
#[allow(async_fn_in_trait)]
pub trait PackageDriver {
    /// The format this driver produces.
    fn package_type(&self) -> PackageType;

    /// Runs the full pipeline for one descriptor.
    async fn build(&self, app: &AppDescriptor) -> Result<PathBuf>;
}
