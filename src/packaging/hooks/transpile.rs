use super::HookContext;
use crate::error::{ErrorExt, ReleaseError, Result};
use crate::packaging::compiler::{Dialect, SourceCompiler, TranspileTarget};
use std::path::{Path, PathBuf};

/// Path the compiled script is written to: the source with a `.js` extension.
pub fn output_path(source: &Path) -> PathBuf {
    source.with_extension("js")
}

/// Trailing comment linking a compiled script to its map file.
pub fn map_comment(output: &Path) -> String {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("//# sourceMappingURL={name}.map")
}

async fn matching_files(build_path: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let build_path = build_path.to_path_buf();
    let pattern = pattern.to_string();
    tokio::task::spawn_blocking(move || matching_files_blocking(&build_path, &pattern))
        .await
        .map_err(|e| ReleaseError::Anyhow(anyhow::anyhow!("Source scan task panicked: {e}")))?
}

fn matching_files_blocking(build_path: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&build_path.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), pattern);

    let mut files = Vec::new();
    for entry in glob::glob(&full)? {
        let path = entry.map_err(|e| ReleaseError::Fs {
            context: "matching sources".to_string(),
            path: e.path().display().to_string(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Compiles every legacy source, then every modern source, replacing each
/// with a `.js` file, its `.js.map`, and a comment linking the two.
pub(super) async fn transpile_sources<C: SourceCompiler>(
    ctx: &HookContext,
    compiler: &C,
    legacy: &[String],
    modern: &[String],
) -> Result<()> {
    log::info!(" -- Running babel and coffeescript transpilers");

    let passes = [(Dialect::Legacy, legacy), (Dialect::Modern, modern)];
    let mut compiled = 0usize;

    for (dialect, patterns) in passes {
        for pattern in patterns {
            for source in matching_files(&ctx.build_path, pattern).await? {
                transpile_file(ctx, compiler, dialect, &source).await?;
                compiled += 1;
            }
        }
    }

    log::info!(" -- Compiled {} source files", compiled);
    Ok(())
}

async fn transpile_file<C: SourceCompiler>(
    ctx: &HookContext,
    compiler: &C,
    dialect: Dialect,
    source: &Path,
) -> Result<()> {
    let output = output_path(source);
    let relative = |p: &Path| {
        p.strip_prefix(&ctx.build_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| p.to_path_buf())
    };
    let target = TranspileTarget {
        source: source.to_path_buf(),
        dialect,
        relative_source: relative(source),
        relative_output: relative(&output),
    };

    log::debug!("Compiling {} ({:?})", target.relative_source.display(), dialect);
    let result = compiler.compile(&target).await?;

    let code = format!("{}\n{}\n", result.code, map_comment(&output));
    tokio::fs::write(&output, code)
        .await
        .fs_context("writing compiled output", &output)?;

    let map_path = PathBuf::from(format!("{}.map", output.display()));
    tokio::fs::write(&map_path, result.source_map)
        .await
        .fs_context("writing source map", &map_path)?;

    if output != source {
        tokio::fs::remove_file(source)
            .await
            .fs_context("removing compiled source", source)?;
    }
    Ok(())
}
