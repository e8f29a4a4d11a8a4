//! Command line argument parsing and validation.
//!
//! The global options select the platform and locate the application and
//! output directories; the two tasks take no flags of their own.

use crate::platform::{Arch, Platform};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Packaging and release publishing for the N1 desktop application
#[derive(Parser, Debug)]
#[command(
    name = "n1_release",
    version,
    about = "Package and publish N1 releases",
    long_about = "Packages the application into platform bundles and publishes release artifacts.

Usage:
  n1_release --platform darwin package
  n1_release --output-dir dist publish

publish uploads only when SHOULD_PUBLISH is set on a non pull-request build,
and then requires AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY."
)]
pub struct Args {
    /// Target platform: darwin, win32, linux (default: host platform)
    #[arg(short, long, global = true, env = "N1_PLATFORM", value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Target architecture: x64, ia32, arm64, arm (default: host architecture)
    #[arg(long, global = true, env = "N1_ARCH", value_name = "ARCH")]
    pub arch: Option<String>,

    /// Application directory containing package.json
    #[arg(long, global = true, env = "N1_APP_DIR", default_value = ".", value_name = "PATH")]
    pub app_dir: PathBuf,

    /// Directory packaged artifacts are written to and published from
    #[arg(long, global = true, env = "N1_OUTPUT_DIR", default_value = "dist", value_name = "PATH")]
    pub output_dir: PathBuf,

    /// Task to run
    #[command(subcommand)]
    pub command: Command,
}

/// Release tasks.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stage, transform and package the application
    Package,
    /// Publish the packaged artifacts of this platform
    Publish,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Selected platform; unknown names are kept and rejected by the task.
    pub fn platform(&self) -> Platform {
        match &self.platform {
            Some(name) => name.parse().unwrap_or_else(|never| match never {}),
            None => Platform::current(),
        }
    }

    /// Selected architecture.
    pub fn arch(&self) -> Result<Arch, String> {
        match &self.arch {
            Some(name) => name.parse(),
            None => Ok(Arch::current()),
        }
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        self.arch()?;
        if self.app_dir.as_os_str().is_empty() {
            return Err("Application directory cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_platform_after_task() {
        let args = Args::try_parse_from(["n1_release", "publish", "--platform", "win32"]).unwrap();
        assert_eq!(args.command, Command::Publish);
        assert_eq!(args.platform(), Platform::Win32);
        assert_eq!(args.output_dir, PathBuf::from("dist"));
    }

    #[test]
    fn rejects_unknown_arch() {
        let args =
            Args::try_parse_from(["n1_release", "--arch", "sparc", "package"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn tasks_take_no_flags() {
        assert!(Args::try_parse_from(["n1_release", "package", "--dry-run"]).is_err());
    }
}
