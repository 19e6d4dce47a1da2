//! Error types for the installer assembly pipeline.
//!
//! One crate-wide [`Error`] enum covers every failure class the pipeline can
//! hit: descriptor/configuration problems, template lookup, staging I/O,
//! external tool execution and artifact verification. Helpers:
//!
//! - **[`Context`] trait**: wrap any error with a context string
//! - **[`ErrorExt`] trait**: filesystem operations with automatic path context
//!
//! Failures are never retried and never downgraded to warnings; the single
//! exception is an invocation that explicitly opts into ignoring its exit
//! code (see [`crate::exec`]).

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
    process::ExitStatus,
};
use thiserror::Error as DeriveError;

/// Errors returned by the packaging pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Operation being performed (e.g. "writing control file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Missing or invalid application descriptor field.
    ///
    /// Reported before any external tool runs where detectable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A template identifier could not be resolved against the registry.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// An external program could not be spawned at all.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to start
        command: String,
        /// The underlying spawn error
        error: io::Error,
    },

    /// An external program ran but exited with a nonzero status.
    ///
    /// Fatal unless the invocation explicitly ignores exit codes.
    #[error("command {command} failed: {status}")]
    ToolExited {
        /// The program that failed
        command: String,
        /// Its exit status
        status: ExitStatus,
    },

    /// No installation of the required external toolchain could be located.
    #[error("toolchain not found: {0}")]
    ToolchainNotFound(String),

    /// The produced artifact was rejected by the policy checker, or is
    /// missing where the build tool should have left it.
    #[error("package verification failed: {0}")]
    Verification(String),

    /// The requested package format has no build implementation yet.
    #[error("{0} package builds are not implemented")]
    Unimplemented(&'static str),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Icon processing error (decode, resize, encode).
    #[error("{0}")]
    ImageError(#[from] image::ImageError),

    /// Error walking the staging tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Descriptor TOML parse error.
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// Generic error with a custom message.
    #[error("{0}")]
    GenericError(String),
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Works with both `Result<T>` and `Option<T>`; an empty `Option` turns
/// into a [`Error::GenericError`] carrying the context string.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// The `context` should be a present-tense verb phrase describing the
/// operation, e.g. "reading license file", "creating staging directory".
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_message() {
        let base: Result<()> = Err(Error::GenericError("inner".into()));
        let err = base.context("outer").unwrap_err();
        assert_eq!(err.to_string(), "outer: inner");
    }

    #[test]
    fn option_context_produces_error() {
        let missing: Option<u32> = None;
        let err = missing.context("value absent").unwrap_err();
        assert_eq!(err.to_string(), "value absent");
    }

    #[test]
    fn fs_context_carries_path() {
        let io: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        let err = io.fs_context("reading license file", "/tmp/license.txt").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("reading license file"));
        assert!(text.contains("/tmp/license.txt"));
    }
}
