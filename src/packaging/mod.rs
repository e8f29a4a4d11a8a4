//! Packaging pipeline.
//!
//! This module turns an application tree into platform bundles:
//!
//! 1. Builds a [`BuildConfiguration`] for the target platform
//! 2. Validates the ignore rules before any work starts
//! 3. Hands the configuration to a [`NativePackager`], which stages the tree
//!    and calls back into the [`HookRunner`]
//! 4. Returns the produced output paths
//!
//! # Module Organization
//!
//! - [`config`] - Build configuration and the declarative packager configuration
//! - [`hooks`] - The ordered post-copy hook chain
//! - [`compiler`] - Source compilation collaborator used by the transpilation hook
//! - [`packager`] - Native packaging collaborator

pub mod compiler;
pub mod config;
pub mod hooks;
pub mod packager;

pub use compiler::{CommandCompiler, CompiledSource, Dialect, SourceCompiler, TranspileTarget};
pub use config::{BuildConfiguration, IgnoreRules, PackagerConfig};
pub use hooks::{Hook, HookContext, HookRunner, ToolLayout};
pub use packager::{ExternalPackager, NativePackager};

use crate::error::Result;
use std::path::PathBuf;

/// Packages one application for one platform.
pub struct PackagingPipeline<C, P> {
    config: BuildConfiguration,
    compiler: C,
    packager: P,
    tool_layout: ToolLayout,
}

impl<C, P> PackagingPipeline<C, P>
where
    C: SourceCompiler + Sync,
    P: NativePackager,
{
    /// Creates a pipeline for `config`.
    pub fn new(config: BuildConfiguration, compiler: C, packager: P) -> Self {
        Self {
            config,
            compiler,
            packager,
            tool_layout: ToolLayout::default(),
        }
    }

    /// Overrides where the package-manager tool lives in the build tree.
    pub fn with_tool_layout(mut self, layout: ToolLayout) -> Self {
        self.tool_layout = layout;
        self
    }

    /// Returns the build configuration.
    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    /// Runs the packager and its hooks, returning produced output paths.
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        // Reject bad patterns before staging anything.
        self.config.ignore_rules()?;

        log::info!(
            "Packaging {} {} for {}/{}",
            self.config.name,
            self.config.app_version,
            self.config.platform,
            self.config.arch
        );

        let hooks =
            HookRunner::new(&self.config, &self.compiler).with_tool_layout(self.tool_layout.clone());
        let outputs = self.packager.package(&self.config, &hooks).await?;

        let listed: Vec<String> = outputs.iter().map(|p| p.display().to_string()).collect();
        log::info!("Done: {}", listed.join(","));
        Ok(outputs)
    }
}
