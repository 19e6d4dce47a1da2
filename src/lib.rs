//! # Packsmith
//!
//! Installer assembly pipeline: turns a declarative application descriptor
//! (payload directory, services, desktop starters, license, lifecycle
//! hooks) into native OS installer packages.
//!
//! ## Features
//!
//! - **Debian packages**: staged filesystem tree with generated control
//!   files and maintainer scripts, built with `fakeroot dpkg-deb` and
//!   checked with `lintian`
//! - **Windows installers**: deterministic WiX authoring compiled with
//!   `candle` and linked with `light`
//! - **macOS disk images**: payload plus launchd service scripts wrapped
//!   into a `.dmg` by `hdiutil`
//! - **Composable lifecycle scripts**: independent feature contributors
//!   (services, license prompt, deletion list, run-after hook) append
//!   fragments that render into deterministic maintainer scripts
//!
//! ## Usage
//!
//! ```bash
//! packsmith --config app.toml                        # .deb into dist/
//! packsmith --config app.toml --format deb --format dmg
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod exec;
pub mod fsutil;
pub mod icons;
pub mod packager;
pub mod platform;
pub mod script;
pub mod staging;
pub mod template;

// Re-export the types most callers need
pub use descriptor::{AppDescriptor, DesktopStarter, Service};
pub use error::{Error, Result};
pub use packager::{BuiltPackage, Packager};
pub use platform::{PackageDriver, PackageType};
