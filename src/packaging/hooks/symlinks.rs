use super::HookContext;
use crate::error::{ErrorExt, Result};
use crate::utils::fs::{Links, copy_tree, remove_path, sorted_entries};
use std::path::{Path, PathBuf};

/// Top-level directories whose entries may be linked in from elsewhere.
const LINKED_DIRS: [&str; 2] = ["internal_packages", "node_modules"];

/// Prefix macOS adds when resolving paths under `/var` and `/tmp`.
const SHIM_PREFIX: &str = "/private/";

/// Strips the first `/private/` shim from a resolved path.
pub fn normalize_shim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match raw.find(SHIM_PREFIX) {
        Some(idx) => {
            let mut out = String::with_capacity(raw.len());
            out.push_str(&raw[..idx]);
            out.push('/');
            out.push_str(&raw[idx + SHIM_PREFIX.len()..]);
            PathBuf::from(out)
        }
        None => path.to_path_buf(),
    }
}

async fn canonical(path: &Path) -> Result<PathBuf> {
    tokio::fs::canonicalize(path)
        .await
        .fs_context("resolving real path", path)
}

/// Replaces every linked package with a physical copy of its target, so the
/// packaged tree no longer depends on the tree it was staged from.
///
/// Only the build tree is modified. A linked top-level directory is replaced
/// as a whole; a linked entry is copied beside itself before the link is
/// swapped out.
pub(super) async fn materialize_links(ctx: &HookContext) -> Result<()> {
    log::info!(" -- Moving symlinked node modules / internal packages into build folder.");

    let base = normalize_shim_prefix(&canonical(&ctx.build_path).await?);

    for dir_name in LINKED_DIRS {
        let dir = ctx.build_path.join(dir_name);
        let metadata = match tokio::fs::symlink_metadata(&dir).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No {} directory in build tree", dir_name);
                continue;
            }
            Err(e) => return Err(e).fs_context("reading metadata", &dir),
        };

        if metadata.file_type().is_symlink() {
            let real = canonical(&dir).await?;
            log::info!("Copying {} to {}", real.display(), dir.display());
            remove_path(&dir).await?;
            copy_tree(&real, &dir, Links::Follow, |_| true).await?;
            continue;
        }

        for entry in sorted_entries(&dir).await? {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let nominal = base.join(dir_name).join(name);
            let is_link = tokio::fs::symlink_metadata(&entry)
                .await
                .fs_context("reading metadata", &entry)?
                .file_type()
                .is_symlink();
            let real = canonical(&entry).await?;

            if !is_link && normalize_shim_prefix(&real) == nominal {
                continue;
            }

            log::info!("Copying {} to {}", real.display(), entry.display());
            let scratch = dir.join(format!(".{}.materialize", name.to_string_lossy()));
            remove_path(&scratch).await?;
            if tokio::fs::metadata(&real)
                .await
                .fs_context("reading metadata", &real)?
                .is_dir()
            {
                copy_tree(&real, &scratch, Links::Follow, |_| true).await?;
            } else {
                tokio::fs::copy(&real, &scratch)
                    .await
                    .fs_context("copying linked file", &real)?;
            }
            remove_path(&entry).await?;
            tokio::fs::rename(&scratch, &entry)
                .await
                .fs_context("replacing linked package", &entry)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Platform};

    #[test]
    fn strips_private_prefix() {
        assert_eq!(
            normalize_shim_prefix(Path::new("/private/var/folders/x/app")),
            PathBuf::from("/var/folders/x/app")
        );
        assert_eq!(
            normalize_shim_prefix(Path::new("/home/me/app")),
            PathBuf::from("/home/me/app")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn replaces_links_with_copies() {
        let outside = tempfile::tempdir().unwrap();
        let pkg = outside.path().join("composer");
        std::fs::create_dir_all(pkg.join("lib")).unwrap();
        std::fs::write(pkg.join("lib/main.js"), "module.exports = 1").unwrap();

        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        std::fs::create_dir_all(app.join("internal_packages/plain")).unwrap();
        std::fs::create_dir_all(app.join("node_modules")).unwrap();
        std::os::unix::fs::symlink(&pkg, app.join("internal_packages/composer")).unwrap();

        let ctx = HookContext {
            build_path: app.clone(),
            runtime_version: "1.4.15".into(),
            platform: Platform::Linux,
            arch: Arch::X64,
        };
        materialize_links(&ctx).await.unwrap();

        let copied = app.join("internal_packages/composer");
        assert!(!std::fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert!(copied.join("lib/main.js").is_file());
        assert!(app.join("internal_packages/plain").is_dir());

        // Target is untouched.
        assert!(pkg.join("lib/main.js").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn linked_dependency_dir_is_copied_without_touching_source() {
        let source = tempfile::tempdir().unwrap();
        let modules = source.path().join("node_modules");
        std::fs::create_dir_all(modules.join("react/lib")).unwrap();
        std::fs::write(modules.join("react/lib/React.js"), "module.exports = {}").unwrap();

        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::os::unix::fs::symlink(&modules, app.join("node_modules")).unwrap();

        let ctx = HookContext {
            build_path: app.clone(),
            runtime_version: "1.4.15".into(),
            platform: Platform::Linux,
            arch: Arch::X64,
        };
        materialize_links(&ctx).await.unwrap();

        let copied = app.join("node_modules");
        assert!(!std::fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert!(copied.join("react/lib/React.js").is_file());
        assert!(modules.join("react/lib/React.js").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn linked_file_is_replaced_by_its_content() {
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("index.js");
        std::fs::write(&target, "exports.x = 1").unwrap();

        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        std::fs::create_dir_all(app.join("node_modules")).unwrap();
        std::os::unix::fs::symlink(&target, app.join("node_modules/index.js")).unwrap();

        let ctx = HookContext {
            build_path: app.clone(),
            runtime_version: "1.4.15".into(),
            platform: Platform::Linux,
            arch: Arch::X64,
        };
        materialize_links(&ctx).await.unwrap();

        let copied = app.join("node_modules/index.js");
        assert!(!std::fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&copied).unwrap(), "exports.x = 1");
        assert!(target.is_file());
        let leftovers: Vec<_> = std::fs::read_dir(app.join("node_modules"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }
}
