//! Source compilation collaborator used by the transpilation hook.
//!
//! The hook only knows which dialect a file is in; turning that source into
//! plain script plus a source map is delegated to a [`SourceCompiler`].

use crate::error::{ErrorExt, ReleaseError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Source dialect of a file found in the build tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dialect {
    /// CoffeeScript / CJSX
    Legacy,
    /// ES6 / JSX
    Modern,
}

/// A file to compile, with the paths the source map should reference.
#[derive(Clone, Debug)]
pub struct TranspileTarget {
    /// Absolute source path
    pub source: PathBuf,
    /// Dialect the source is written in
    pub dialect: Dialect,
    /// Source path relative to the build tree
    pub relative_source: PathBuf,
    /// Output path relative to the build tree
    pub relative_output: PathBuf,
}

/// Compiler output.
#[derive(Clone, Debug)]
pub struct CompiledSource {
    /// Generated script, without a trailing source map comment
    pub code: String,
    /// Source map (v3 JSON)
    pub source_map: String,
}

/// Compiles one source file.
pub trait SourceCompiler {
    /// Compiles `target`, returning code and source map.
    fn compile(&self, target: &TranspileTarget) -> impl Future<Output = Result<CompiledSource>> + Send;
}

/// External command invocation with placeholders.
///
/// `{input}`, `{output}`, `{map}` and `{source_file}` are replaced in each
/// argument before the command runs.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    /// Program to run
    pub program: String,
    /// Arguments, possibly containing placeholders
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command spec.
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn render(&self, input: &Path, output: &Path, map: &Path, source_file: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
                    .replace("{map}", &map.to_string_lossy())
                    .replace("{source_file}", &source_file.to_string_lossy())
            })
            .collect()
    }
}

/// Compiles sources by running one external command per dialect.
///
/// Each command writes the generated script to `{output}` and its source map
/// to `{map}`, both inside a scratch directory.
#[derive(Clone, Debug)]
pub struct CommandCompiler {
    legacy: CommandSpec,
    modern: CommandSpec,
}

impl Default for CommandCompiler {
    fn default() -> Self {
        Self {
            legacy: CommandSpec::new(
                "cjsx",
                &["--compile", "--map", "--output", "{output}", "{input}"],
            ),
            modern: CommandSpec::new(
                "babel",
                &[
                    "{input}",
                    "--out-file",
                    "{output}",
                    "--source-maps",
                    "--source-root",
                    "/",
                    "--source-file-name",
                    "{source_file}",
                ],
            ),
        }
    }
}

impl CommandCompiler {
    /// Creates a compiler from explicit commands.
    pub fn new(legacy: CommandSpec, modern: CommandSpec) -> Self {
        Self { legacy, modern }
    }

    fn spec(&self, dialect: Dialect) -> &CommandSpec {
        match dialect {
            Dialect::Legacy => &self.legacy,
            Dialect::Modern => &self.modern,
        }
    }
}

impl SourceCompiler for CommandCompiler {
    async fn compile(&self, target: &TranspileTarget) -> Result<CompiledSource> {
        let spec = self.spec(target.dialect);
        let scratch = tempfile::tempdir()?;
        let file_name = target
            .relative_output
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("out.js"));
        let output = scratch.path().join(&file_name);
        let map = scratch.path().join(format!("{}.map", file_name.display()));

        let args = spec.render(&target.source, &output, &map, &target.relative_source);
        let result = tokio::process::Command::new(&spec.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| ReleaseError::Compile {
                path: target.source.display().to_string(),
                reason: format!("failed to run {}: {}", spec.program, e),
            })?;

        if !result.status.success() {
            return Err(ReleaseError::Compile {
                path: target.source.display().to_string(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let code = tokio::fs::read_to_string(&output)
            .await
            .fs_context("reading compiled output", &output)?;
        let source_map = tokio::fs::read_to_string(&map)
            .await
            .fs_context("reading source map", &map)?;

        Ok(CompiledSource {
            code: strip_map_comment(&code).to_string(),
            source_map,
        })
    }
}

/// Removes trailing `sourceMappingURL` comments a compiler may already have appended.
pub fn strip_map_comment(code: &str) -> &str {
    let mut rest = code.trim_end();
    loop {
        let start = rest.rfind('\n').map_or(0, |i| i + 1);
        let last = &rest[start..];
        if last.starts_with("//# sourceMappingURL=") || last.starts_with("//@ sourceMappingURL=") {
            rest = rest[..start].trim_end();
        } else {
            return rest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_existing_map_comments() {
        let code = "var a = 1;\n//# sourceMappingURL=a.js.map\n";
        assert_eq!(strip_map_comment(code), "var a = 1;");
        assert_eq!(strip_map_comment("var b;\n"), "var b;");
        assert_eq!(strip_map_comment("//# sourceMappingURL=x.map"), "");
    }

    #[test]
    fn renders_placeholders() {
        let spec = CommandSpec::new("babel", &["{input}", "-o", "{output}", "--name={source_file}"]);
        let args = spec.render(
            Path::new("/b/src/a.es6"),
            Path::new("/t/a.js"),
            Path::new("/t/a.js.map"),
            Path::new("src/a.es6"),
        );
        assert_eq!(args, vec!["/b/src/a.es6", "-o", "/t/a.js", "--name=src/a.es6"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_compiler_reads_back_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.es6");
        std::fs::write(&source, "let a = 1\n").unwrap();

        let compiler = CommandCompiler::new(
            CommandSpec::new("false", &[]),
            CommandSpec::new(
                "sh",
                &[
                    "-c",
                    "cp \"$0\" \"$1\" && echo '//# sourceMappingURL=a.js.map' >> \"$1\" && echo '{}' > \"$2\"",
                    "{input}",
                    "{output}",
                    "{map}",
                ],
            ),
        );
        let compiled = compiler
            .compile(&TranspileTarget {
                source: source.clone(),
                dialect: Dialect::Modern,
                relative_source: PathBuf::from("a.es6"),
                relative_output: PathBuf::from("a.js"),
            })
            .await
            .unwrap();
        assert_eq!(compiled.code, "let a = 1");
        assert_eq!(compiled.source_map.trim(), "{}");

        let err = compiler
            .compile(&TranspileTarget {
                source,
                dialect: Dialect::Legacy,
                relative_source: PathBuf::from("a.coffee"),
                relative_output: PathBuf::from("a.js"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Compile { .. }));
    }
}
