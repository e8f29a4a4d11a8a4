//! Post-copy transformations applied to the staged build tree.
//!
//! Hooks run one at a time in [`Hook::ORDER`]. Later hooks rely on the
//! filesystem state left by earlier ones, so the first failure halts the
//! chain; nothing already done is rolled back.

mod relocation;
mod resources;
mod symlinks;
mod transpile;

pub use relocation::ToolLayout;
pub use symlinks::normalize_shim_prefix;
pub use transpile::{map_comment, output_path};

use super::compiler::SourceCompiler;
use super::config::BuildConfiguration;
use crate::error::Result;
use crate::platform::{Arch, Platform};
use std::path::{Path, PathBuf};

/// Arguments every hook receives.
#[derive(Clone, Debug)]
pub struct HookContext {
    /// Staged application directory
    pub build_path: PathBuf,
    /// Target runtime version
    pub runtime_version: String,
    /// Platform being packaged
    pub platform: Platform,
    /// Architecture being packaged
    pub arch: Arch,
}

impl HookContext {
    /// Directory containing the build path; holds files shipped beside the archive.
    pub fn resources_dir(&self) -> &Path {
        self.build_path.parent().unwrap_or(&self.build_path)
    }
}

/// The packaging hooks, in the only order they may run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hook {
    /// Copies Windows-only resources beside the archive
    PlatformResources,
    /// Moves the package-manager tool out of the archive and flattens it
    DependencyRelocation,
    /// Replaces linked packages with physical copies
    SymlinkMaterialization,
    /// Compiles legacy and modern sources to plain scripts
    Transpilation,
}

impl Hook {
    /// Fixed execution order.
    pub const ORDER: [Hook; 4] = [
        Hook::PlatformResources,
        Hook::DependencyRelocation,
        Hook::SymlinkMaterialization,
        Hook::Transpilation,
    ];

    /// Name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Hook::PlatformResources => "platform-resources",
            Hook::DependencyRelocation => "dependency-relocation",
            Hook::SymlinkMaterialization => "symlink-materialization",
            Hook::Transpilation => "transpilation",
        }
    }
}

/// Runs the hook chain against a build tree.
pub struct HookRunner<'a, C> {
    config: &'a BuildConfiguration,
    compiler: &'a C,
    tool_layout: ToolLayout,
}

impl<'a, C: SourceCompiler> HookRunner<'a, C> {
    /// Creates a runner for `config` compiling sources with `compiler`.
    pub fn new(config: &'a BuildConfiguration, compiler: &'a C) -> Self {
        Self {
            config,
            compiler,
            tool_layout: ToolLayout::default(),
        }
    }

    /// Overrides where the package-manager tool lives in the build tree.
    pub fn with_tool_layout(mut self, layout: ToolLayout) -> Self {
        self.tool_layout = layout;
        self
    }

    /// Runs every hook in order, stopping at the first failure.
    pub async fn run(&self, ctx: &HookContext) -> Result<()> {
        for hook in Hook::ORDER {
            log::debug!("Running hook {} on {}", hook.name(), ctx.build_path.display());
            self.run_one(hook, ctx)
                .await
                .map_err(|e| e.in_hook(hook.name()))?;
        }
        Ok(())
    }

    /// Runs a single hook.
    pub async fn run_one(&self, hook: Hook, ctx: &HookContext) -> Result<()> {
        match hook {
            Hook::PlatformResources => {
                resources::copy_platform_resources(ctx, &self.config.windows_resources_dir()).await
            }
            Hook::DependencyRelocation => relocation::relocate_tool(ctx, &self.tool_layout).await,
            Hook::SymlinkMaterialization => symlinks::materialize_links(ctx).await,
            Hook::Transpilation => {
                transpile::transpile_sources(
                    ctx,
                    self.compiler,
                    &self.config.legacy_sources,
                    &self.config.modern_sources,
                )
                .await
            }
        }
    }
}
