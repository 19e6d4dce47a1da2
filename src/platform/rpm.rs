//! RPM package generation. Not implemented.

use std::path::PathBuf;

use crate::descriptor::AppDescriptor;
use crate::error::{Error, Result};
use crate::platform::{PackageDriver, PackageType};

/// Placeholder driver for `.rpm` output.
///
/// Fails with [`Error::Unimplemented`] before touching the filesystem.
/// Kept so the format stays selectable and the refusal is uniform with
/// every other build error.
#[derive(Default)]
pub struct RpmDriver;

impl RpmDriver {
    /// Creates the placeholder driver.
    pub fn new() -> Self {
        RpmDriver
    }
}

impl PackageDriver for RpmDriver {
    fn package_type(&self) -> PackageType {
        PackageType::Rpm
    }

    async fn build(&self, _app: &AppDescriptor) -> Result<PathBuf> {
        Err(Error::Unimplemented("rpm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_always_refuses() {
        let app = AppDescriptor {
            identifier: "ontime".into(),
            display_name: "OnTime".into(),
            version: "1.0".into(),
            payload_dir: "payload".into(),
            ..Default::default()
        };

        let err = RpmDriver::new().build(&app).await.unwrap_err();
        assert_eq!(err.to_string(), "rpm package builds are not implemented");
    }
}
