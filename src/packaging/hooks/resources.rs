use super::HookContext;
use crate::error::Result;
use crate::platform::Platform;
use crate::utils::fs::{Links, copy_tree};
use std::path::Path;

/// Copies Windows resources (e.g. the mailto registration script) into the
/// directory beside the app, so they ship next to the archive instead of in it.
pub(super) async fn copy_platform_resources(ctx: &HookContext, source_dir: &Path) -> Result<()> {
    if ctx.platform != Platform::Win32 {
        return Ok(());
    }

    let target = ctx.resources_dir();
    log::info!(
        " -- Copying platform resources from {} to {}",
        source_dir.display(),
        target.display()
    );
    copy_tree(source_dir, target, Links::Preserve, |_| true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Arch;

    fn ctx(root: &Path, platform: Platform) -> HookContext {
        HookContext {
            build_path: root.join("resources").join("app"),
            runtime_version: "1.4.15".into(),
            platform,
            arch: Arch::Ia32,
        }
    }

    #[tokio::test]
    async fn copies_beside_app_on_windows() {
        let root = tempfile::tempdir().unwrap();
        let win = root.path().join("win");
        std::fs::create_dir_all(&win).unwrap();
        std::fs::write(win.join("nylas-mailto-default.reg"), "reg").unwrap();
        std::fs::create_dir_all(root.path().join("resources/app")).unwrap();

        copy_platform_resources(&ctx(root.path(), Platform::Win32), &win)
            .await
            .unwrap();

        assert!(root.path().join("resources/nylas-mailto-default.reg").is_file());
        assert!(!root.path().join("resources/app/nylas-mailto-default.reg").exists());
    }

    #[tokio::test]
    async fn no_op_elsewhere() {
        let root = tempfile::tempdir().unwrap();
        // Source does not even exist; other platforms never look at it.
        copy_platform_resources(&ctx(root.path(), Platform::Darwin), &root.path().join("win"))
            .await
            .unwrap();
        assert!(!root.path().join("resources").exists());
    }
}
