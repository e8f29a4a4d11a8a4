//! Project metadata from the application's package manifest

use crate::error::{ErrorExt, ReleaseError, Result};
use serde::Deserialize;
use std::path::Path;

/// Manifest file name inside the application directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Package metadata extracted from `package.json`
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    /// Package name (e.g., "nylas")
    pub name: String,

    /// Human-facing product name, when it differs from `name`
    #[serde(default)]
    pub product_name: Option<String>,

    /// Semantic version string (e.g., "2.1.0" or "2.1.0-beta.3")
    pub version: String,

    /// Version of the runtime the packaged app targets
    #[serde(default)]
    pub electron_version: Option<String>,
}

impl AppManifest {
    /// Load and validate the manifest at `path`.
    ///
    /// The version must parse as a semantic version; everything downstream
    /// builds destination keys from it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).fs_context("reading manifest", path)?;
        Self::parse(&raw, path)
    }

    /// Load the manifest from an application directory.
    pub fn load_from_dir(app_dir: &Path) -> Result<Self> {
        Self::load(&app_dir.join(MANIFEST_FILE))
    }

    fn parse(raw: &str, path: &Path) -> Result<Self> {
        let manifest: AppManifest =
            serde_json::from_str(raw).map_err(|e| ReleaseError::Metadata {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        semver::Version::parse(&manifest.version).map_err(|e| ReleaseError::Metadata {
            path: path.display().to_string(),
            reason: format!("version '{}' is not semantic: {}", manifest.version, e),
        })?;

        Ok(manifest)
    }

    /// Target runtime version handed to packaging hooks, empty when undeclared.
    pub fn runtime_version(&self) -> &str {
        self.electron_version.as_deref().unwrap_or_default()
    }
}
