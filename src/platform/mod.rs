//! Target platform and CPU architecture types.
//!
//! Names follow the runtime's conventions (`darwin`, `win32`, `x64`, `ia32`)
//! because they appear verbatim in artifact destination keys.

use std::fmt;
use std::str::FromStr;

/// Operating system a release is built for.
///
/// Anything outside the supported set parses to [`Platform::Unsupported`] so
/// the caller decides when that becomes an error.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    /// macOS
    Darwin,
    /// Windows
    Win32,
    /// Linux
    Linux,
    /// Any other platform name, kept as given
    Unsupported(String),
}

impl Platform {
    /// Returns the platform of the running host.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::Darwin,
            "windows" => Platform::Win32,
            "linux" => Platform::Linux,
            other => Platform::Unsupported(other.to_string()),
        }
    }

    /// Canonical name used in destination keys and packager configuration.
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Win32 => "win32",
            Platform::Linux => "linux",
            Platform::Unsupported(name) => name,
        }
    }

    /// Returns true for platforms that have a release artifact set.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unsupported(_))
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "mac" => Platform::Darwin,
            "win32" | "windows" | "win" => Platform::Win32,
            "linux" => Platform::Linux,
            _ => Platform::Unsupported(s.trim().to_string()),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture for target binaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Arch {
    /// x86_64 / AMD64
    X64,
    /// x86 (32-bit); Windows installers are always built for this
    Ia32,
    /// AArch64 / ARM64 - Apple Silicon, modern ARM devices
    Arm64,
    /// 32-bit ARM
    Arm,
}

impl Arch {
    /// Returns the architecture of the running host, falling back to x64.
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86" => Arch::Ia32,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Arm,
            _ => Arch::X64,
        }
    }

    /// Runtime-style name (`x64`, `ia32`, `arm64`, `arm`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Ia32 => "ia32",
            Arch::Arm64 => "arm64",
            Arch::Arm => "arm",
        }
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Arch::X64),
            "ia32" | "x86" | "i686" | "i386" => Ok(Arch::Ia32),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "arm" | "armv7l" | "armhf" => Ok(Arch::Arm),
            other => Err(format!(
                "Invalid architecture: {other}. Valid architectures: x64, ia32, arm64, arm"
            )),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
