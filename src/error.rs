//! Error types for packaging and publishing operations.
//!
//! Every failure that terminates a task is represented here, so the CLI can
//! print a single message naming the stage that failed.

use std::path::Path;
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// The commit hash query failed; no release version can be derived
    #[error("Version control query failed: {reason}")]
    VersionControl {
        /// Reason for the failure
        reason: String,
    },

    /// Project metadata could not be read or is invalid
    #[error("Invalid project metadata in {path}: {reason}")]
    Metadata {
        /// Manifest that was read
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// A required storage credential is absent or empty
    #[error("Please set the {variable} environment variable")]
    MissingCredential {
        /// Name of the missing environment variable
        variable: &'static str,
    },

    /// The target platform has no release artifact set
    #[error("Unsupported platform: '{platform}'")]
    UnsupportedPlatform {
        /// Platform name as given
        platform: String,
    },

    /// The native packaging tool reported an error
    #[error("Packager failed: {message}")]
    Packager {
        /// Message surfaced verbatim from the packaging tool
        message: String,
    },

    /// A packaging hook failed; the chain was halted
    #[error("Packaging hook '{hook}' failed: {source}")]
    Hook {
        /// Name of the failing hook
        hook: &'static str,
        /// Underlying failure
        source: Box<ReleaseError>,
    },

    /// A source file could not be compiled
    #[error("Failed to compile {path}: {reason}")]
    Compile {
        /// Source file
        path: String,
        /// Compiler output or failure reason
        reason: String,
    },

    /// An artifact upload failed
    #[error("Upload of {key} failed: {reason}")]
    Upload {
        /// Destination key of the failed upload
        key: String,
        /// Reason for the failure
        reason: String,
    },

    /// A webhook notification failed (never escalated past logging)
    #[error("Notification failed: {0}")]
    Notification(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO errors with the operation and path that produced them
    #[error("IO error while {context} ({path}): {source}")]
    Fs {
        /// Operation being performed
        context: String,
        /// Path involved
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid ignore pattern
    #[error("Invalid ignore pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Wraps an error as the failure of the named packaging hook.
    pub fn in_hook(self, hook: &'static str) -> Self {
        ReleaseError::Hook {
            hook,
            source: Box::new(self),
        }
    }

    /// Short name of the stage this error belongs to, used in the CLI summary line.
    pub fn stage(&self) -> &'static str {
        match self {
            ReleaseError::Cli(_) => "arguments",
            ReleaseError::VersionControl { .. } | ReleaseError::Metadata { .. } => "version",
            ReleaseError::MissingCredential { .. } => "credentials",
            ReleaseError::UnsupportedPlatform { .. } => "artifact selection",
            ReleaseError::Packager { .. } => "packaging",
            ReleaseError::Hook { .. } | ReleaseError::Compile { .. } => "packaging hooks",
            ReleaseError::Upload { .. } | ReleaseError::Http(_) => "upload",
            ReleaseError::Notification(_) => "notification",
            _ => "io",
        }
    }
}

/// Attaches operation and path context to IO results.
pub trait ErrorExt<T> {
    /// Converts an IO error into [`ReleaseError::Fs`] naming `context` and `path`.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| ReleaseError::Fs {
            context: context.to_string(),
            path: path.as_ref().display().to_string(),
            source,
        })
    }
}
