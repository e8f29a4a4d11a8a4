//! File system utilities for build tree transformations.
//!
//! Provides idempotent removal, moves, and the recursive copies used by the
//! packaging hooks. Recursive work runs on the blocking thread pool.

use crate::error::{ErrorExt, ReleaseError, Result};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Removes a file, symlink, or directory tree if it exists.
///
/// Symlinks are removed without touching their target.
pub async fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()), // Idempotent
        Err(e) => return Err(e).fs_context("reading metadata", path),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path)
    } else {
        remove_link_or_file(path).await
    }
}

#[cfg(windows)]
async fn remove_link_or_file(path: &Path) -> Result<()> {
    // Directory junctions and symlinks to directories need remove_dir on Windows.
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(_) => fs::remove_dir(path).await.fs_context("removing link", path),
    }
}

#[cfg(not(windows))]
async fn remove_link_or_file(path: &Path) -> Result<()> {
    fs::remove_file(path).await.fs_context("removing file", path)
}

/// Moves a file or directory, creating the destination's parent first.
pub async fn move_path(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating destination directory", parent)?;
    }
    fs::rename(from, to).await.fs_context("moving", from)
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// How [`copy_tree`] treats symbolic links found in the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Links {
    /// Recreate links as links pointing at the same target
    Preserve,
    /// Copy the content links point at
    Follow,
}

/// Recursively copies the contents of `from` into `to`.
///
/// `to` is created if missing; existing files are overwritten and existing
/// directories merged. `keep` receives each entry's path relative to `from`
/// (with a leading `/`, `/` separated) and decides whether it is copied;
/// a rejected directory is skipped with everything beneath it.
pub async fn copy_tree<F>(from: &Path, to: &Path, links: Links, keep: F) -> Result<u64>
where
    F: Fn(&str) -> bool + Send + 'static,
{
    let metadata = fs::metadata(from).await.fs_context("reading metadata", from)?;
    if !metadata.is_dir() {
        return Err(ReleaseError::Fs {
            context: "copying directory".to_string(),
            path: from.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || copy_tree_blocking(&from, &to, links, keep))
        .await
        .map_err(|e| ReleaseError::Anyhow(anyhow::anyhow!("Directory copy task panicked: {e}")))?
}

fn copy_tree_blocking<F>(from: &Path, to: &Path, links: Links, keep: F) -> Result<u64>
where
    F: Fn(&str) -> bool,
{
    std::fs::create_dir_all(to).fs_context("creating directory", to)?;

    let mut copied = 0u64;
    let mut walker = walkdir::WalkDir::new(from)
        .min_depth(1)
        .follow_links(links == Links::Follow)
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| from.to_path_buf());
            ReleaseError::Fs {
                context: "walking directory".to_string(),
                path: path.display().to_string(),
                source: e.into(),
            }
        })?;
        let rel_path = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| ReleaseError::Anyhow(e.into()))?;

        if !keep(&archive_path(rel_path)) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let dest_path = to.join(rel_path);
        if entry.path_is_symlink() && links == Links::Preserve {
            let target = std::fs::read_link(entry.path()).fs_context("reading link", entry.path())?;
            if dest_path.symlink_metadata().is_ok() {
                std::fs::remove_file(&dest_path).fs_context("replacing link", &dest_path)?;
            }
            if entry.path().is_dir() {
                symlink_dir(&target, &dest_path).fs_context("creating link", &dest_path)?;
            } else {
                symlink_file(&target, &dest_path).fs_context("creating link", &dest_path)?;
            }
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
        } else {
            std::fs::copy(entry.path(), &dest_path).fs_context("copying file", entry.path())?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Renders a relative path the way archive ignore rules see it: `/a/b/c`.
pub fn archive_path(rel_path: &Path) -> String {
    let mut out = String::new();
    for component in rel_path.components() {
        out.push('/');
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}

/// Lists the entries of a directory sorted by file name.
pub async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut reader = fs::read_dir(dir).await.fs_context("reading directory", dir)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .fs_context("reading directory entry", dir)?
    {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_tree_merges_and_filters() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("keep/nested")).unwrap();
        std::fs::create_dir_all(src.path().join("docs")).unwrap();
        std::fs::write(src.path().join("keep/nested/a.txt"), "a").unwrap();
        std::fs::write(src.path().join("docs/readme.md"), "r").unwrap();
        std::fs::write(dst.path().join("existing.txt"), "e").unwrap();

        let copied = copy_tree(src.path(), dst.path(), Links::Preserve, |p| p != "/docs")
            .await
            .unwrap();

        assert_eq!(copied, 1);
        assert!(dst.path().join("keep/nested/a.txt").is_file());
        assert!(dst.path().join("existing.txt").is_file());
        assert!(!dst.path().join("docs").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn copy_tree_follows_links_when_asked() {
        let target = tempfile::tempdir().unwrap();
        std::fs::write(target.path().join("index.js"), "x").unwrap();
        let src = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(target.path(), src.path().join("linked")).unwrap();
        let dst = tempfile::tempdir().unwrap();

        copy_tree(src.path(), dst.path(), Links::Follow, |_| true)
            .await
            .unwrap();

        let copied = dst.path().join("linked");
        assert!(!copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(copied.join("index.js").is_file());
    }

    #[tokio::test]
    async fn remove_path_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        remove_path(&missing).await.unwrap();

        std::fs::create_dir_all(dir.path().join("tree/inner")).unwrap();
        remove_path(&dir.path().join("tree")).await.unwrap();
        assert!(!dir.path().join("tree").exists());
    }

    #[test]
    fn archive_path_is_slash_prefixed() {
        assert_eq!(archive_path(Path::new("node_modules/less/dist")), "/node_modules/less/dist");
    }
}
