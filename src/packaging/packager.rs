//! Native packaging collaborator.
//!
//! The packager owns staging: it copies the application into its build tree,
//! calls back into the hook chain, and then produces the platform bundle.

use super::compiler::SourceCompiler;
use super::config::BuildConfiguration;
use super::hooks::{HookContext, HookRunner};
use crate::error::{ErrorExt, ReleaseError, Result};
use crate::utils::fs::{Links, archive_path, copy_tree, remove_path};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Produces platform bundles from a build configuration.
pub trait NativePackager {
    /// Packages the application, running `hooks` on the staged tree before
    /// bundling. Returns the produced output paths.
    fn package<C: SourceCompiler + Sync>(
        &self,
        config: &BuildConfiguration,
        hooks: &HookRunner<'_, C>,
    ) -> impl Future<Output = Result<Vec<PathBuf>>> + Send;
}

/// Runs an external packaging command against a staged build tree.
///
/// The command receives `--config <file>` pointing at the JSON rendering of
/// the packager configuration and prints one produced path per line.
#[derive(Clone, Debug)]
pub struct ExternalPackager {
    program: String,
    args: Vec<String>,
}

impl Default for ExternalPackager {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec![
                ["build", "packager.js"]
                    .iter()
                    .collect::<PathBuf>()
                    .display()
                    .to_string(),
            ],
        }
    }
}

impl ExternalPackager {
    /// Creates a packager running `program` with `args` from the app directory.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Staging directory for a configuration.
    pub fn staging_dir(config: &BuildConfiguration) -> PathBuf {
        config
            .tmp_dir
            .join(format!("{}-{}-{}", config.name, config.platform, config.arch))
    }

    async fn stage(&self, config: &BuildConfiguration, app_path: &Path) -> Result<u64> {
        let rules = config.ignore_rules()?;
        let skip_output = config
            .output_dir
            .strip_prefix(&config.app_dir)
            .ok()
            .map(archive_path)
            .filter(|p| !p.is_empty());

        log::info!(
            " -- Staging {} into {}",
            config.app_dir.display(),
            app_path.display()
        );
        copy_tree(&config.app_dir, app_path, Links::Preserve, move |path| {
            !rules.is_ignored(path) && skip_output.as_deref() != Some(path)
        })
        .await
    }

    async fn invoke(&self, config_file: &Path, app_dir: &Path) -> Result<Vec<PathBuf>> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg("--config")
            .arg(config_file)
            .current_dir(app_dir)
            .output()
            .await
            .map_err(|e| ReleaseError::Packager {
                message: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(ReleaseError::Packager {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

impl NativePackager for ExternalPackager {
    async fn package<C: SourceCompiler + Sync>(
        &self,
        config: &BuildConfiguration,
        hooks: &HookRunner<'_, C>,
    ) -> Result<Vec<PathBuf>> {
        let staging = Self::staging_dir(config);
        remove_path(&staging).await?;

        let resources = staging.join("resources");
        let app_path = resources.join("app");
        let files = self.stage(config, &app_path).await?;
        log::debug!("Staged {} files", files);

        let ctx = HookContext {
            build_path: app_path,
            runtime_version: config.runtime_version.clone(),
            platform: config.platform.clone(),
            arch: config.arch,
        };
        hooks.run(&ctx).await?;

        let mut packager_config = config.packager_config();
        packager_config.prebuilt = Some(resources);
        let json = serde_json::to_string_pretty(&packager_config)?;
        log::info!("----- Running build with options:\n{}", json);

        let config_file = staging.join("packager-config.json");
        tokio::fs::write(&config_file, &json)
            .await
            .fs_context("writing packager configuration", &config_file)?;

        self.invoke(&config_file, &config.app_dir).await
    }
}
