//! Toolchain Source Management
//!
//! Maps each toolchain component to the release it is built from: version,
//! tarball name, download URL and the published MD5 digest. The defaults pin
//! the releases this builder is tested with; a JSON manifest may override them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::Component;

/// GNU FTP tree served over HTTPS
pub const DEFAULT_MIRROR: &str = "https://ftp.gnu.org/gnu";

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("version regex is valid"));

static MD5_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("md5 regex is valid"));

fn default_mirror() -> String {
    DEFAULT_MIRROR.to_string()
}

/// One pinned upstream release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRelease {
    pub version: String,
    /// Lowercase hex MD5 of the tarball
    pub md5: String,
}

impl SourceRelease {
    fn new(version: &str, md5: &str) -> Self {
        SourceRelease {
            version: version.to_string(),
            md5: md5.to_string(),
        }
    }
}

/// Releases used for a toolchain build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainManifest {
    #[serde(default = "default_mirror")]
    pub mirror: String,
    pub binutils: SourceRelease,
    pub gcc: SourceRelease,
    pub gdb: SourceRelease,
}

impl Default for ToolchainManifest {
    fn default() -> Self {
        ToolchainManifest {
            mirror: default_mirror(),
            binutils: SourceRelease::new("2.42", "a075178a9646551379bfb64040487715"),
            gcc: SourceRelease::new("14.1.0", "24195dca80ded5e0551b533f46a4481d"),
            gdb: SourceRelease::new("14.2", "4452f575d09f94276cb0a1e95ecff856"),
        }
    }
}

/// Everything needed to fetch and unpack one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePackage {
    pub component: Component,
    pub version: String,
    pub md5: String,
    pub url: String,
}

impl SourcePackage {
    /// `<name>-<version>.tar.xz`
    pub fn tarball(&self) -> String {
        format!("{}.tar.xz", self.dir_name())
    }

    /// Top-level directory inside the tarball
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.component.name(), self.version)
    }
}

impl ToolchainManifest {
    pub fn release(&self, component: Component) -> &SourceRelease {
        match component {
            Component::Binutils => &self.binutils,
            Component::Gcc => &self.gcc,
            Component::Gdb => &self.gdb,
        }
    }

    /// Resolve the download descriptor for a component.
    ///
    /// GCC releases live in a per-version directory; the others sit directly
    /// under the tool's directory.
    pub fn package(&self, component: Component) -> SourcePackage {
        let release = self.release(component);
        let mirror = self.mirror.trim_end_matches('/');
        let name = component.name();
        let tarball = format!("{}-{}.tar.xz", name, release.version);
        let url = match component {
            Component::Gcc => format!("{}/gcc/gcc-{}/{}", mirror, release.version, tarball),
            Component::Binutils | Component::Gdb => format!("{}/{}/{}", mirror, name, tarball),
        };
        SourcePackage {
            component,
            version: release.version.clone(),
            md5: release.md5.clone(),
            url,
        }
    }

    /// All packages in build order
    pub fn packages(&self) -> Vec<SourcePackage> {
        Component::ORDER.iter().map(|c| self.package(*c)).collect()
    }

    /// Reject versions and digests that cannot name a real release.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mirror.starts_with("https://") || self.mirror.starts_with("http://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "Mirror must be an http(s) URL, got '{}'",
                self.mirror
            )));
        }

        for component in Component::ORDER {
            let release = self.release(component);
            if !VERSION_RE.is_match(&release.version) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid {} version '{}'",
                    component, release.version
                )));
            }
            if !MD5_RE.is_match(&release.md5) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid {} md5 '{}': expected 32 lowercase hex digits",
                    component, release.md5
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_is_valid() {
        assert!(ToolchainManifest::default().validate().is_ok());
    }

    #[test]
    fn test_gcc_url_uses_versioned_directory() {
        let manifest = ToolchainManifest::default();
        assert_eq!(
            manifest.package(Component::Gcc).url,
            "https://ftp.gnu.org/gnu/gcc/gcc-14.1.0/gcc-14.1.0.tar.xz"
        );
    }

    #[test]
    fn test_binutils_and_gdb_urls() {
        let manifest = ToolchainManifest::default();
        assert_eq!(
            manifest.package(Component::Binutils).url,
            "https://ftp.gnu.org/gnu/binutils/binutils-2.42.tar.xz"
        );
        assert_eq!(
            manifest.package(Component::Gdb).url,
            "https://ftp.gnu.org/gnu/gdb/gdb-14.2.tar.xz"
        );
    }

    #[test]
    fn test_trailing_slash_in_mirror_is_ignored() {
        let manifest = ToolchainManifest {
            mirror: "https://mirror.example.org/gnu/".to_string(),
            ..ToolchainManifest::default()
        };
        assert_eq!(
            manifest.package(Component::Gdb).url,
            "https://mirror.example.org/gnu/gdb/gdb-14.2.tar.xz"
        );
    }

    #[test]
    fn test_tarball_and_dir_names() {
        let pkg = ToolchainManifest::default().package(Component::Binutils);
        assert_eq!(pkg.tarball(), "binutils-2.42.tar.xz");
        assert_eq!(pkg.dir_name(), "binutils-2.42");
    }

    #[test]
    fn test_packages_follow_build_order() {
        let components: Vec<_> = ToolchainManifest::default()
            .packages()
            .into_iter()
            .map(|p| p.component)
            .collect();
        assert_eq!(components, Component::ORDER.to_vec());
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut manifest = ToolchainManifest::default();
        manifest.gdb.version = "14.2; rm -rf /".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_bad_md5_rejected() {
        let mut manifest = ToolchainManifest::default();
        manifest.gcc.md5 = "ABC".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_non_http_mirror_rejected() {
        let manifest = ToolchainManifest {
            mirror: "ftp://ftp.gnu.org/gnu".to_string(),
            ..ToolchainManifest::default()
        };
        assert!(manifest.validate().is_err());
    }
}
