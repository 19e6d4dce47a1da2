//! Debian control metadata: `DEBIAN/control`, `conffiles` and `md5sums`.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::descriptor::AppDescriptor;
use crate::error::{Error, ErrorExt, Result};
use crate::script::ScriptComposer;
use crate::staging::StagingTree;

/// Collects control metadata while the feature contributors run, then
/// writes the `DEBIAN/` files in one pass.
#[derive(Debug, Default)]
pub struct ControlBuilder {
    conffiles: Vec<String>,
}

impl ControlBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a configuration file by its absolute target path.
    ///
    /// Conffiles survive package upgrades and removals until a purge;
    /// Debian requires the absolute path here.
    pub fn add_conffile(&mut self, absolute_path: impl Into<String>) {
        self.conffiles.push(absolute_path.into());
    }

    /// Registered conffiles, in registration order.
    pub fn conffiles(&self) -> &[String] {
        &self.conffiles
    }

    /// Writes `DEBIAN/control`, `DEBIAN/conffiles`, the four lifecycle
    /// scripts and `DEBIAN/md5sums` into the staging tree.
    pub async fn build(
        &self,
        app: &AppDescriptor,
        tree: &StagingTree,
        composer: &ScriptComposer,
    ) -> Result<()> {
        let control_dir = tree.control_dir();
        tokio::fs::create_dir_all(&control_dir)
            .await
            .fs_context("creating control directory", &control_dir)?;

        write_control_file(app, tree).await?;

        if !self.conffiles.is_empty() {
            let mut text = String::new();
            for conffile in &self.conffiles {
                text.push_str(conffile);
                text.push('\n');
            }
            tree.write("DEBIAN/conffiles", text, false).await?;
        }

        composer.build(&control_dir).await?;

        write_md5sums(tree).await?;
        Ok(())
    }
}

/// Writes `DEBIAN/control` with the package metadata.
async fn write_control_file(app: &AppDescriptor, tree: &StagingTree) -> Result<()> {
    let control_path = tree.path("DEBIAN/control");
    let size_kb = payload_size(tree).await? / 1024;

    let package = app.identifier.clone();
    let version = app.version.clone();
    let section = app.deb.section.clone();
    let priority = app.deb.priority.clone();
    let architecture = app.deb.architecture.clone();
    let maintainer = app.maintainer.clone();
    let homepage = app.homepage.clone();
    let depends = app.deb.depends.clone();
    let description = app.description.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut file =
            File::create(&control_path).fs_context("creating control file", &control_path)?;

        writeln!(file, "Package: {package}")?;
        writeln!(file, "Version: {version}")?;
        writeln!(file, "Section: {section}")?;
        writeln!(file, "Priority: {priority}")?;
        writeln!(file, "Architecture: {architecture}")?;
        writeln!(file, "Installed-Size: {size_kb}")?;
        writeln!(file, "Maintainer: {maintainer}")?;
        if let Some(homepage) = homepage {
            writeln!(file, "Homepage: {homepage}")?;
        }
        if let Some(depends) = depends {
            writeln!(file, "Depends: {depends}")?;
        }

        let mut lines = description.lines();
        let short = lines.next().unwrap_or("").trim();
        if short.is_empty() {
            writeln!(file, "Description: (no description)")?;
        } else {
            writeln!(file, "Description: {short}")?;
        }
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                writeln!(file, " .")?;
            } else {
                writeln!(file, " {line}")?;
            }
        }

        file.flush()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("control file task failed: {e}")))??;

    Ok(())
}

/// Writes `DEBIAN/md5sums` covering every payload file, sorted by path.
///
/// Control files below `DEBIAN/` are excluded; they are not part of the
/// installed payload.
async fn write_md5sums(tree: &StagingTree) -> Result<()> {
    let md5sums_path = tree.path("DEBIAN/md5sums");
    let root = tree.root().to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut file =
            File::create(&md5sums_path).fs_context("creating md5sums file", &md5sums_path)?;

        for path in sorted_payload_files(&root)? {
            let mut src = File::open(&path).fs_context("opening file for MD5", &path)?;
            let mut context = md5::Context::new();
            io::copy(&mut src, &mut context)?;
            let digest = context.finalize();

            for byte in digest.iter() {
                write!(file, "{byte:02x}")?;
            }
            let rel_path = path.strip_prefix(&root)?;
            writeln!(file, "  {}", rel_path.display())?;
        }

        file.flush()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("md5sums task failed: {e}")))??;

    Ok(())
}

/// Every regular file below `root` except the `DEBIAN` control directory,
/// sorted for deterministic output.
fn sorted_payload_files(root: &Path) -> Result<Vec<PathBuf>> {
    let control_dir = root.join("DEBIAN");
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.path().starts_with(&control_dir) {
            continue;
        }
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Total size in bytes of the staged payload, excluding `DEBIAN/`.
async fn payload_size(tree: &StagingTree) -> Result<u64> {
    let root = tree.root().to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut total = 0u64;
        for path in sorted_payload_files(&root)? {
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    })
    .await
    .map_err(|e| Error::GenericError(format!("size calculation task failed: {e}")))?
}
