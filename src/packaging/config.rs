//! Build configuration and the declarative packager configuration derived from it.

use crate::error::Result;
use crate::metadata::AppManifest;
use crate::platform::{Arch, Platform};
use chrono::Datelike;
use regex::RegexSet;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Regex fragments matched against `/`-prefixed paths inside the archive.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // top level dirs we never want
    r"^[\\/]+arclib",
    r"^[\\/]+build",
    r"^[\\/]+electron",
    r"^[\\/]+flow-typed",
    r"^[\\/]+src[\\/]+pro",
    r"^[\\/]+spec_integration",
    // general dirs we never want
    r"[\\/]+gh-pages$",
    r"[\\/]+docs$",
    r"[\\/]+obj[\\/]+gen",
    r"[\\/]+\.deps$",
    // specific files we never want
    r"\.DS_Store$",
    r"\.jshintrc$",
    r"\.npmignore$",
    r"\.pairs$",
    r"\.travis\.yml$",
    r"appveyor\.yml$",
    r"\.idea$",
    r"\.editorconfig$",
    r"\.lint$",
    r"\.lintignore$",
    r"\.arcconfig$",
    r"\.flowconfig$",
    r"\.jshintignore$",
    r"\.gitattributes$",
    r"\.gitkeep$",
    r"\.pdb$",
    r"\.cc$",
    r"\.h$",
    r"\.d\.ts$",
    r"\.js\.flow$",
    r"\.map$",
    r"binding\.gyp$",
    r"target\.mk$",
    r"\.node\.dYSM$",
    r"autoconf-\d*\.tar\.gz$",
    // specific (large) module bits we know we don't need
    r"node_modules[\\/]+less[\\/]+dist$",
    r"node_modules[\\/]+react[\\/]+dist$",
    r"node_modules[\\/].*[\\/]tests?$",
    r"node_modules[\\/].*[\\/]coverage$",
    r"node_modules[\\/].*[\\/]benchmark$",
    r"@paulbetts[\\/]+cld[\\/]+deps[\\/]+cld",
];

/// Globs kept outside the compressed archive.
pub const DEFAULT_UNPACK_GLOBS: &[&str] = &[
    "*.node",
    "**/vendor/**",
    "examples/**",
    "**/src/tasks/**",
    "**/node_modules/spellchecker/**",
    "**/node_modules/windows-shortcuts/**",
];

/// Legacy dialect sources compiled by the transpilation hook.
pub const DEFAULT_LEGACY_SOURCES: &[&str] = &[
    "src/**/*.coffee",
    "src/**/*.cjsx",
    "internal_packages/**/*.coffee",
    "internal_packages/**/*.cjsx",
];

/// Modern dialect sources compiled by the transpilation hook.
pub const DEFAULT_MODERN_SOURCES: &[&str] = &[
    "src/**/*.es6",
    "src/**/*.jsx",
    "src/**/*.es",
    "internal_packages/**/*.es6",
    "internal_packages/**/*.jsx",
    "internal_packages/**/*.es",
];

/// URL scheme the packaged application registers for.
#[derive(Clone, Debug, Serialize)]
pub struct ProtocolHandler {
    /// Display name of the protocol
    pub name: String,
    /// Schemes handled
    pub schemes: Vec<String>,
}

impl ProtocolHandler {
    fn new(name: &str, scheme: &str) -> Self {
        Self {
            name: name.to_string(),
            schemes: vec![scheme.to_string()],
        }
    }
}

/// Windows executable version-info strings.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Win32Metadata {
    /// Publisher
    pub company_name: String,
    /// Description shown in Explorer
    pub file_description: String,
    /// Copyright line
    pub legal_copyright: String,
    /// Product name
    pub product_name: String,
}

/// Compiled ignore patterns.
#[derive(Clone, Debug)]
pub struct IgnoreRules {
    set: RegexSet,
}

impl IgnoreRules {
    /// Compiles regex fragments; any invalid fragment is an error.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    /// Returns true if the archive path (e.g. `/node_modules/a/test`) is excluded.
    pub fn is_ignored(&self, archive_path: &str) -> bool {
        self.set.is_match(archive_path)
    }
}

/// Immutable per-invocation configuration of a packaging run.
#[derive(Clone, Debug)]
pub struct BuildConfiguration {
    /// Platform being packaged
    pub platform: Platform,
    /// Architecture being packaged
    pub arch: Arch,
    /// Application source tree
    pub app_dir: PathBuf,
    /// Directory the packager writes its output into
    pub output_dir: PathBuf,
    /// Scratch directory for staging
    pub tmp_dir: PathBuf,
    /// Package version from the manifest
    pub app_version: String,
    /// Target runtime version
    pub runtime_version: String,
    /// Application name for this platform
    pub name: String,
    /// Icon for this platform, if it has one
    pub icon: Option<PathBuf>,
    /// Archive ignore patterns (regex fragments)
    pub ignore: Vec<String>,
    /// Globs left uncompressed next to the archive
    pub unpack: Vec<String>,
    /// Protocol handler declarations
    pub protocols: Vec<ProtocolHandler>,
    /// Whether the output is code-signed
    pub code_sign: bool,
    /// Copyright line
    pub copyright: String,
    /// macOS bundle identifier
    pub bundle_id: String,
    /// macOS application category
    pub app_category_type: String,
    /// Plist merged into the bundle's Info.plist
    pub extend_info: PathBuf,
    /// Extra resources copied into the bundle
    pub extra_resources: Vec<PathBuf>,
    /// Windows version-info strings
    pub win32_metadata: Win32Metadata,
    /// Legacy dialect source globs, relative to the build tree
    pub legacy_sources: Vec<String>,
    /// Modern dialect source globs, relative to the build tree
    pub modern_sources: Vec<String>,
}

impl BuildConfiguration {
    /// Builds the configuration for packaging `app_dir` on `platform`.
    ///
    /// Windows packages are always 32-bit regardless of `arch`.
    pub fn new(
        manifest: &AppManifest,
        app_dir: &Path,
        output_dir: &Path,
        platform: Platform,
        arch: Arch,
    ) -> Self {
        let resources = app_dir.join("build").join("resources");
        let year = chrono::Local::now().year();
        let copyright = format!("Copyright (C) 2014-{year} Nylas, Inc. All rights reserved.");

        let (name, icon, arch) = match platform {
            Platform::Darwin => (
                "Nylas N1",
                Some(resources.join("mac").join("nylas.icns")),
                arch,
            ),
            Platform::Win32 => ("nylas", Some(resources.join("win").join("nylas.ico")), Arch::Ia32),
            _ => ("nylas", None, arch),
        };

        Self {
            platform,
            arch,
            app_dir: app_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            tmp_dir: std::env::temp_dir().join("nylas-build"),
            app_version: manifest.version.clone(),
            runtime_version: manifest.runtime_version().to_string(),
            name: name.to_string(),
            icon,
            ignore: DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            unpack: DEFAULT_UNPACK_GLOBS.iter().map(|s| s.to_string()).collect(),
            protocols: vec![
                ProtocolHandler::new("Nylas Protocol", "nylas"),
                ProtocolHandler::new("Mailto Protocol", "mailto"),
            ],
            code_sign: true,
            copyright: copyright.clone(),
            bundle_id: "com.nylas.nylas-mail".to_string(),
            app_category_type: "public.app-category.business".to_string(),
            extend_info: resources.join("mac").join("nylas-Info.plist"),
            extra_resources: vec![resources.join("mac").join("Nylas Calendar.app")],
            win32_metadata: Win32Metadata {
                company_name: "Nylas, Inc.".to_string(),
                file_description: "The best email app for people and teams at work".to_string(),
                legal_copyright: copyright,
                product_name: "Nylas N1".to_string(),
            },
            legacy_sources: DEFAULT_LEGACY_SOURCES.iter().map(|s| s.to_string()).collect(),
            modern_sources: DEFAULT_MODERN_SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Directory holding resources shipped next to the Windows installer.
    pub fn windows_resources_dir(&self) -> PathBuf {
        self.app_dir.join("build").join("resources").join("win")
    }

    /// Compiles the ignore patterns.
    pub fn ignore_rules(&self) -> Result<IgnoreRules> {
        IgnoreRules::new(&self.ignore)
    }

    /// Renders the declarative configuration handed to the native packager.
    pub fn packager_config(&self) -> PackagerConfig {
        PackagerConfig {
            app_version: self.app_version.clone(),
            electron_version: self.runtime_version.clone(),
            platform: self.platform.to_string(),
            arch: self.arch.to_string(),
            protocols: self.protocols.clone(),
            dir: self.app_dir.clone(),
            app_category_type: self.app_category_type.clone(),
            tmpdir: self.tmp_dir.clone(),
            icon: self.icon.clone(),
            name: self.name.clone(),
            app_copyright: self.copyright.clone(),
            deref_symlinks: false,
            asar: AsarOptions {
                unpack: format!("{{{}}}", self.unpack.join(",")),
            },
            ignore: self.ignore.clone(),
            out: self.output_dir.clone(),
            overwrite: true,
            prune: true,
            osx_sign: self.code_sign,
            win32metadata: self.win32_metadata.clone(),
            extend_info: self.extend_info.clone(),
            app_bundle_id: self.bundle_id.clone(),
            extra_resource: self.extra_resources.clone(),
            prebuilt: None,
        }
    }
}

/// Archive options.
#[derive(Clone, Debug, Serialize)]
pub struct AsarOptions {
    /// Brace-expanded glob of files left outside the archive
    pub unpack: String,
}

/// Declarative configuration submitted to the native packaging tool.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackagerConfig {
    /// Application version
    pub app_version: String,
    /// Runtime version to package against
    pub electron_version: String,
    /// Target platform
    pub platform: String,
    /// Target architecture
    pub arch: String,
    /// Protocol handlers
    pub protocols: Vec<ProtocolHandler>,
    /// Application source directory
    pub dir: PathBuf,
    /// macOS application category
    pub app_category_type: String,
    /// Scratch directory
    pub tmpdir: PathBuf,
    /// Platform icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    /// Application name
    pub name: String,
    /// Copyright line
    pub app_copyright: String,
    /// Symlinks are materialized by a hook, not by the packager
    #[serde(rename = "derefSymlinks")]
    pub deref_symlinks: bool,
    /// Archive options
    pub asar: AsarOptions,
    /// Ignore regex fragments
    pub ignore: Vec<String>,
    /// Output directory
    pub out: PathBuf,
    /// Replace existing output
    pub overwrite: bool,
    /// Prune dev dependencies
    pub prune: bool,
    /// Sign the macOS bundle
    pub osx_sign: bool,
    /// Windows version-info strings
    pub win32metadata: Win32Metadata,
    /// Plist merged into Info.plist
    pub extend_info: PathBuf,
    /// macOS bundle identifier
    pub app_bundle_id: String,
    /// Extra resources
    pub extra_resource: Vec<PathBuf>,
    /// Already-staged resources directory, set once hooks have run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prebuilt: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> AppManifest {
        serde_json::from_str(r#"{"name":"nylas","version":"2.1.0","electronVersion":"1.4.15"}"#)
            .unwrap()
    }

    #[test]
    fn default_ignore_rules_compile_and_match() {
        let rules = IgnoreRules::new(DEFAULT_IGNORE_PATTERNS).unwrap();
        assert!(rules.is_ignored("/build/tasks/package-task.js"));
        assert!(rules.is_ignored("/node_modules/foo/test"));
        assert!(rules.is_ignored("/src/app.js.map"));
        assert!(rules.is_ignored("/.DS_Store"));
        assert!(!rules.is_ignored("/src/app.js"));
        assert!(!rules.is_ignored("/node_modules/react/lib/React.js"));
    }

    #[test]
    fn invalid_ignore_fragment_is_rejected() {
        assert!(IgnoreRules::new(["(unclosed"]).is_err());
    }

    #[test]
    fn windows_forces_ia32_and_icon() {
        let config = BuildConfiguration::new(
            &manifest(),
            Path::new("/app"),
            Path::new("/out"),
            Platform::Win32,
            Arch::X64,
        );
        assert_eq!(config.arch, Arch::Ia32);
        assert_eq!(config.name, "nylas");
        assert!(config.icon.unwrap().ends_with("win/nylas.ico"));
    }

    #[test]
    fn packager_config_uses_packager_key_names() {
        let config = BuildConfiguration::new(
            &manifest(),
            Path::new("/app"),
            Path::new("/out"),
            Platform::Linux,
            Arch::X64,
        );
        let json = serde_json::to_value(config.packager_config()).unwrap();
        assert_eq!(json["app-version"], "2.1.0");
        assert_eq!(json["platform"], "linux");
        assert_eq!(json["derefSymlinks"], false);
        assert_eq!(json["osx-sign"], true);
        assert!(json.get("icon").is_none());
        assert!(json["asar"]["unpack"].as_str().unwrap().starts_with("{*.node,"));
        assert_eq!(json["win32metadata"]["CompanyName"], "Nylas, Inc.");
    }
}
