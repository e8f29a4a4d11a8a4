use super::HookContext;
use crate::error::{ErrorExt, Result};
use crate::utils::fs::{move_path, remove_path, sorted_entries};
use std::path::PathBuf;

/// Where the embedded package-manager tool lives in the build tree.
#[derive(Clone, Debug)]
pub struct ToolLayout {
    /// Tool directory name, both inside the app and beside it
    pub dir_name: String,
    /// Module directory nested one level too deep, relative to the tool directory
    pub nested_module: PathBuf,
    /// Stale shortcut link, relative to the tool directory
    pub shortcut: PathBuf,
}

impl Default for ToolLayout {
    fn default() -> Self {
        Self {
            dir_name: "apm".to_string(),
            nested_module: ["node_modules", "atom-package-manager"].iter().collect(),
            shortcut: ["node_modules", ".bin", "apm"].iter().collect(),
        }
    }
}

/// Moves the tool out of the app directory (and so out of the archive), then
/// pulls its nested module up one level.
pub(super) async fn relocate_tool(ctx: &HookContext, layout: &ToolLayout) -> Result<()> {
    let source = ctx.build_path.join(&layout.dir_name);
    let target = ctx.resources_dir().join(&layout.dir_name);

    log::info!(" -- Moving {} to {}", source.display(), target.display());
    move_path(&source, &target).await?;

    let nested = target.join(&layout.nested_module);
    for entry in sorted_entries(&nested).await? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let dest = target.join(name);
        tokio::fs::rename(&entry, &dest)
            .await
            .fs_context("flattening nested module", &entry)?;
    }

    remove_path(&target.join(&layout.shortcut)).await?;

    tokio::fs::remove_dir(&nested)
        .await
        .fs_context("removing nested module directory", &nested)?;

    Ok(())
}
