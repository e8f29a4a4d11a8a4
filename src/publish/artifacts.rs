//! Release artifact selection.
//!
//! Maps a platform, output directory and release version to the files a
//! release ships and the destination keys they are stored under.

use crate::error::{ErrorExt, ReleaseError, Result};
use crate::platform::{Arch, Platform};
use crate::utils::fs::sorted_entries;
use crate::version::ReleaseVersion;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Content type for Debian packages.
pub const DEB_CONTENT_TYPE: &str = "application/x-deb";

/// Content type for RPM packages.
pub const RPM_CONTENT_TYPE: &str = "application/x-rpm";

/// One file to upload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ArtifactDescriptor {
    /// Local file
    pub source: PathBuf,
    /// Destination key in the object store
    pub key: String,
    /// Content type override, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ArtifactDescriptor {
    fn new(source: PathBuf, key: String) -> Self {
        Self {
            source,
            key,
            content_type: None,
        }
    }

    fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

/// Returns the artifacts a release on `platform` consists of, in upload order.
///
/// Only Linux reads `output_dir`; it lists every `.deb` and `.rpm` file there.
/// All packages of one kind share a single destination key, so when several
/// exist the last upload wins.
pub async fn select(
    platform: &Platform,
    arch: Arch,
    output_dir: &Path,
    version: &ReleaseVersion,
) -> Result<Vec<ArtifactDescriptor>> {
    let full = &version.full_version;

    let artifacts = match platform {
        Platform::Darwin => vec![ArtifactDescriptor::new(
            output_dir.join("N1.zip"),
            format!("{full}/darwin/{arch}/N1.zip"),
        )],
        Platform::Win32 => {
            let prefix = format!("{full}/win32/{arch}");
            let package = &version.package_version;
            vec![
                ArtifactDescriptor::new(output_dir.join("RELEASES"), format!("{prefix}/RELEASES")),
                ArtifactDescriptor::new(
                    output_dir.join("N1Setup.exe"),
                    format!("{prefix}/N1Setup.exe"),
                ),
                ArtifactDescriptor::new(
                    output_dir.join(format!("Nylas-{package}-full.nupkg")),
                    format!("{prefix}/nylas-{package}-full.nupkg"),
                ),
            ]
        }
        Platform::Linux => {
            let mut artifacts = Vec::new();
            for path in sorted_entries(output_dir).await? {
                // Dangling links are skipped like any other non-file entry.
                let is_file = match tokio::fs::metadata(&path).await {
                    Ok(metadata) => metadata.is_file(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                    Err(e) => return Err(e).fs_context("reading artifact metadata", &path),
                };
                if !is_file {
                    continue;
                }
                match path.extension().and_then(|e| e.to_str()) {
                    Some("deb") => artifacts.push(
                        ArtifactDescriptor::new(path, format!("{full}/linux-deb/{arch}/N1.deb"))
                            .with_content_type(DEB_CONTENT_TYPE),
                    ),
                    Some("rpm") => artifacts.push(
                        ArtifactDescriptor::new(path, format!("{full}/linux-rpm/{arch}/N1.rpm"))
                            .with_content_type(RPM_CONTENT_TYPE),
                    ),
                    _ => {}
                }
            }
            warn_on_collisions(&artifacts);
            artifacts
        }
        Platform::Unsupported(name) => {
            return Err(ReleaseError::UnsupportedPlatform {
                platform: name.clone(),
            });
        }
    };

    Ok(artifacts)
}

fn warn_on_collisions(artifacts: &[ArtifactDescriptor]) {
    let mut by_key: HashMap<&str, Vec<&Path>> = HashMap::new();
    for artifact in artifacts {
        by_key
            .entry(artifact.key.as_str())
            .or_default()
            .push(&artifact.source);
    }
    for (key, sources) in by_key {
        if sources.len() > 1 {
            log::warn!(
                "{} files share destination key {}; the last upload wins: {:?}",
                sources.len(),
                key,
                sources
            );
        }
    }
}
