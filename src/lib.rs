//! Packaging and release publishing for the N1 desktop application.
//!
//! This library provides the build→package→publish pipeline:
//! - Release version derivation from the manifest and the current commit
//! - The ordered post-copy hook chain that prepares a build tree for packaging
//! - Platform-aware selection of the artifacts a release ships
//! - Concurrent, progress-tracked upload of those artifacts with best-effort
//!   webhook announcements
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod metadata;
pub mod notify;
pub mod packaging;
pub mod platform;
pub mod publish;
pub mod utils;
pub mod version;

// Re-export commonly used types
pub use error::{CliError, ReleaseError, Result};
pub use platform::{Arch, Platform};
pub use version::{ReleaseVersion, VersionResolver};
