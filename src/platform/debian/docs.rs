//! Package documentation: `usr/share/doc/<package>/copyright` and the
//! gzipped Debian changelog. lintian flags packages shipping without them.

use std::io::Write;

use flate2::{Compression, write::GzEncoder};

use crate::descriptor::AppDescriptor;
use crate::error::{Error, ErrorExt, Result};
use crate::fsutil;
use crate::staging::StagingTree;

/// Writes the documentation files into the staging tree.
pub async fn build(app: &AppDescriptor, tree: &StagingTree) -> Result<()> {
    let doc_dir = format!("usr/share/doc/{}", app.identifier);
    write_copyright(app, tree, &doc_dir).await?;
    write_changelog(app, tree, &doc_dir).await?;
    Ok(())
}

async fn write_copyright(app: &AppDescriptor, tree: &StagingTree, doc_dir: &str) -> Result<()> {
    let year = chrono::Utc::now().format("%Y");
    let holder = if app.vendor.is_empty() {
        &app.maintainer
    } else {
        &app.vendor
    };

    let mut text = format!(
        "{}\n\nCopyright (C) {year} {holder}\n",
        app.display_name
    );
    if let Some(license) = &app.license_file {
        let license_text = tokio::fs::read_to_string(license)
            .await
            .fs_context("reading license file", license)?;
        text.push('\n');
        text.push_str(&license_text);
        if !text.ends_with('\n') {
            text.push('\n');
        }
    }

    tree.write(format!("{doc_dir}/copyright"), text, false)
        .await?;
    Ok(())
}

async fn write_changelog(app: &AppDescriptor, tree: &StagingTree, doc_dir: &str) -> Result<()> {
    // two spaces between maintainer and date, per the changelog format
    let entry = format!(
        "{} ({}) unstable; urgency=low\n\n  * New upstream release.\n\n -- {}  {}\n",
        app.identifier,
        app.version,
        app.maintainer,
        chrono::Utc::now().to_rfc2822()
    );

    let changelog_path = tree.path(format!("{doc_dir}/changelog.gz"));
    if let Some(parent) = changelog_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating doc directory", parent)?;
    }

    let dest = tokio::fs::File::create(&changelog_path)
        .await
        .fs_context("creating changelog", &changelog_path)?;
    let std_file = dest.into_std().await;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut encoder = GzEncoder::new(std_file, Compression::new(9));
        encoder.write_all(entry.as_bytes())?;
        encoder.finish()?.flush()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("changelog task failed: {e}")))??;

    fsutil::set_unix_mode(&changelog_path, 0o644).await?;
    Ok(())
}
