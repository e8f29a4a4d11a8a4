//! Release version derivation.
//!
//! A release is identified by the package version plus, for non-prerelease
//! versions, the short hash of the commit being released. The version is
//! resolved once per [`VersionResolver`] and cached; later calls never query
//! version control again.

use crate::error::{ReleaseError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// The version a release is published under.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct ReleaseVersion {
    /// Version declared in the project manifest
    pub package_version: String,
    /// Short commit hash of the current checkout
    pub commit_hash: String,
    /// Version used in destination keys
    pub full_version: String,
}

impl ReleaseVersion {
    /// Derives the release version from its two inputs.
    pub fn new(package_version: impl Into<String>, commit_hash: impl Into<String>) -> Self {
        let package_version = package_version.into();
        let commit_hash = commit_hash.into();
        let full_version = full_version(&package_version, &commit_hash);
        Self {
            package_version,
            commit_hash,
            full_version,
        }
    }
}

/// Versions that already carry a pre-release tag are used verbatim; all
/// others get the commit hash appended.
pub fn full_version(package_version: &str, commit_hash: &str) -> String {
    if package_version.contains('-') {
        package_version.to_string()
    } else {
        format!("{package_version}-{commit_hash}")
    }
}

/// Source of the commit hash for the checkout being released.
pub trait VersionControl {
    /// Returns the short hash of the current commit.
    fn short_commit_hash(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Queries `git rev-parse --short HEAD` in a repository directory.
#[derive(Clone, Debug)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    /// Creates a query rooted at `repo_dir`.
    pub fn new(repo_dir: impl AsRef<Path>) -> Self {
        Self {
            repo_dir: repo_dir.as_ref().to_path_buf(),
        }
    }
}

impl VersionControl for GitCli {
    async fn short_commit_hash(&self) -> Result<String> {
        let git = which::which("git").map_err(|e| ReleaseError::VersionControl {
            reason: format!("git not found in PATH: {e}"),
        })?;

        let output = tokio::process::Command::new(git)
            .args(["rev-parse", "--short", "HEAD"])
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| ReleaseError::VersionControl {
                reason: format!("failed to run git: {e}"),
            })?;

        if !output.status.success() {
            return Err(ReleaseError::VersionControl {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if hash.is_empty() {
            return Err(ReleaseError::VersionControl {
                reason: "git rev-parse returned an empty commit hash".to_string(),
            });
        }
        Ok(hash)
    }
}

/// Resolves and caches the [`ReleaseVersion`] for one task.
pub struct VersionResolver<V> {
    package_version: String,
    vcs: V,
    resolved: OnceCell<ReleaseVersion>,
}

impl<V: VersionControl> VersionResolver<V> {
    /// Creates a resolver for `package_version` backed by `vcs`.
    pub fn new(package_version: impl Into<String>, vcs: V) -> Self {
        Self {
            package_version: package_version.into(),
            vcs,
            resolved: OnceCell::new(),
        }
    }

    /// Returns the release version, querying version control on first use.
    ///
    /// A failed query is not cached; the task is expected to abort on it.
    pub async fn resolve(&self) -> Result<&ReleaseVersion> {
        self.resolved
            .get_or_try_init(|| async {
                let commit_hash = self.vcs.short_commit_hash().await?;
                let version = ReleaseVersion::new(self.package_version.clone(), commit_hash);
                log::info!(">> Release version: {}", version.full_version);
                Ok(version)
            })
            .await
    }

    /// Returns the cached version without resolving.
    pub fn get(&self) -> Option<&ReleaseVersion> {
        self.resolved.get()
    }
}
