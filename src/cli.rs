//! Command line interface.
//!
//! A thin layer over [`crate::packager::Packager`]: parse arguments, load
//! the descriptor, build the requested formats, print one line per
//! artifact.

use clap::Parser;
use std::path::PathBuf;

use crate::config;
use crate::error::Result;
use crate::packager::Packager;
use crate::platform::PackageType;

/// Builds native installer packages from an application descriptor.
#[derive(Parser, Debug)]
#[command(
    name = "packsmith",
    version,
    about = "Builds native installer packages from an application descriptor",
    long_about = "Builds native installer packages from an application descriptor.

The descriptor is a TOML file naming the payload directory, services,
desktop starters and lifecycle hooks of the application. One artifact is
built per requested format.

Usage:
  packsmith --config app.toml
  packsmith --config app.toml --format deb --format dmg --dest dist"
)]
pub struct Args {
    /// Descriptor file describing the application to package
    #[arg(long, value_name = "FILE", default_value = "packsmith.toml")]
    pub config: PathBuf,

    /// Package format to build (deb, msi, rpm, dmg); repeat for several
    #[arg(long, value_name = "FORMAT", default_value = "deb")]
    pub format: Vec<PackageType>,

    /// Directory the artifacts are written to
    #[arg(long, value_name = "DIR", default_value = "dist")]
    pub dest: PathBuf,
}

/// Runs the CLI to completion and returns the process exit code.
pub async fn run() -> Result<i32> {
    let args = Args::parse();
    let app = config::load(&args.config).await?;

    let packager = Packager::new(&args.dest, args.dest.join("work"));
    let built = packager.bundle(&app, &args.format).await?;

    for package in &built {
        println!(
            "{} {} ({} bytes, sha256 {})",
            package.package_type,
            package.path.display(),
            package.size,
            package.checksum
        );
    }
    Ok(0)
}
