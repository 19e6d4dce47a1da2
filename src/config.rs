//! Loads the application descriptor from a TOML file.
//!
//! The descriptor file is the single input of a build. Relative paths inside
//! it (payload directory, license file, icons) are resolved against the
//! directory containing the file, so a build can be started from anywhere.

use std::path::{Path, PathBuf};

use crate::descriptor::AppDescriptor;
use crate::error::{Context, Error, ErrorExt, Result};

/// Reads, parses and validates a descriptor file.
///
/// Validation runs here so configuration problems are reported before any
/// driver touches the filesystem.
pub async fn load(path: &Path) -> Result<AppDescriptor> {
    let text = tokio::fs::read_to_string(path)
        .await
        .fs_context("reading descriptor", path)?;
    let mut app: AppDescriptor = toml::from_str(&text)
        .map_err(Error::from)
        .with_context(|| format!("parsing descriptor {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    app.payload_dir = resolve(base, &app.payload_dir);
    app.license_file = app.license_file.map(|p| resolve(base, &p));
    app.icons = app.icons.iter().map(|p| resolve(base, p)).collect();

    app.validate()?;
    Ok(app)
}

/// Joins a relative path onto the descriptor directory; absolute paths pass
/// through unchanged.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
