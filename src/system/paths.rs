//! Build directory layout and the scoped work-directory guard.
//!
//! All paths are derived once from the [`BuildConfig`]:
//!
//! ```text
//! <base>/<tarballs>.tar.xz
//! <base>/<arch>/                  work directory (removed after the build)
//! <base>/<arch>/<tool>-<version>  unpacked sources
//! <base>/<arch>/gcc-obj           out-of-tree GCC build
//! <base>/PKG/<prefix>             staging tree for `--install no`
//! <cross_prefix>/<arch>           live install prefix
//! ```

use std::path::{Component as PathComponent, Path, PathBuf};

use crate::models::{BuildConfig, Component};

/// Name of the staging directory under the base directory
pub const STAGING_DIR_NAME: &str = "PKG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub base_dir: PathBuf,
    pub work_dir: PathBuf,
    pub obj_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub prefix: PathBuf,
}

impl BuildPaths {
    pub fn new(config: &BuildConfig) -> Self {
        let work_dir = config.base_dir.join(config.arch.id());
        BuildPaths {
            base_dir: config.base_dir.clone(),
            obj_dir: work_dir.join("gcc-obj"),
            work_dir,
            staging_dir: config.base_dir.join(STAGING_DIR_NAME),
            prefix: config.cross_prefix.join(config.arch.id()),
        }
    }

    /// Unpacked source tree of a component
    pub fn source_dir(&self, config: &BuildConfig, component: Component) -> PathBuf {
        self.work_dir
            .join(config.manifest.package(component).dir_name())
    }

    /// Where the prefix lands inside the staging tree (`DESTDIR` + prefix)
    pub fn staged_prefix(&self) -> PathBuf {
        let relative: PathBuf = self
            .prefix
            .components()
            .filter(|c| !matches!(c, PathComponent::RootDir | PathComponent::Prefix(_)))
            .collect();
        self.staging_dir.join(relative)
    }

    /// `PATH` for child processes: the inherited value followed by the staged
    /// and live `bin` directories, so GCC's build finds the new binutils.
    pub fn tool_path(&self, inherited: &str) -> String {
        let staged_bin = self.staged_prefix().join("bin");
        let live_bin = self.prefix.join("bin");
        let mut entries: Vec<String> = Vec::new();
        if !inherited.is_empty() {
            entries.push(inherited.to_string());
        }
        entries.push(staged_bin.display().to_string());
        entries.push(live_bin.display().to_string());
        entries.join(":")
    }
}

/// Removes a directory recursively if it exists.
pub fn cleanup_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        log::debug!("[Paths] Removing {}", path.display());
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Creates a directory and its parents if missing.
pub fn create_dir(path: &Path) -> std::io::Result<()> {
    if !path.is_dir() {
        log::info!(">>> Creating directory: {}", path.display());
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Owns the work directory for the duration of a build.
///
/// Dropping an armed guard removes the directory, so a failed build does not
/// leave half-configured trees behind. `keep` leaves it in place for
/// inspection; `disarm` is called once cleanup has happened normally.
#[derive(Debug)]
pub struct WorkDirGuard {
    path: PathBuf,
    keep: bool,
    armed: bool,
}

impl WorkDirGuard {
    pub fn new(path: PathBuf, keep: bool) -> Self {
        WorkDirGuard {
            path,
            keep,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.keep {
            log::warn!(
                "[Paths] Keeping work directory after failure: {}",
                self.path.display()
            );
            return;
        }
        log::warn!(
            "[Paths] Removing partial build artifacts: {}",
            self.path.display()
        );
        if let Err(e) = cleanup_dir(&self.path) {
            log::error!(
                "[Paths] Could not remove {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Architecture, InstallMode};
    use crate::toolchain::sources::ToolchainManifest;
    use tempfile::TempDir;

    fn config(base: &Path) -> BuildConfig {
        BuildConfig {
            arch: Architecture::Armhf,
            install_mode: InstallMode::Staging,
            cores: 4,
            enable_cxx: false,
            cross_prefix: PathBuf::from("/usr/local/cross"),
            base_dir: base.to_path_buf(),
            manifest: ToolchainManifest::default(),
            keep_work_dir: false,
            skip_preflight: true,
            dry_run: false,
        }
    }

    #[test]
    fn test_layout() {
        let cfg = config(Path::new("/build"));
        let paths = BuildPaths::new(&cfg);
        assert_eq!(paths.work_dir, PathBuf::from("/build/armhf"));
        assert_eq!(paths.obj_dir, PathBuf::from("/build/armhf/gcc-obj"));
        assert_eq!(paths.staging_dir, PathBuf::from("/build/PKG"));
        assert_eq!(paths.prefix, PathBuf::from("/usr/local/cross/armhf"));
        assert_eq!(
            paths.source_dir(&cfg, Component::Gcc),
            PathBuf::from("/build/armhf/gcc-14.1.0")
        );
    }

    #[test]
    fn test_prefix_joins_even_without_trailing_slash() {
        let mut cfg = config(Path::new("/build"));
        cfg.cross_prefix = PathBuf::from("/opt/cross");
        assert_eq!(BuildPaths::new(&cfg).prefix, PathBuf::from("/opt/cross/armhf"));
    }

    #[test]
    fn test_staged_prefix() {
        let paths = BuildPaths::new(&config(Path::new("/build")));
        assert_eq!(
            paths.staged_prefix(),
            PathBuf::from("/build/PKG/usr/local/cross/armhf")
        );
    }

    #[test]
    fn test_tool_path_appends_bin_dirs() {
        let paths = BuildPaths::new(&config(Path::new("/build")));
        assert_eq!(
            paths.tool_path("/usr/bin"),
            "/usr/bin:/build/PKG/usr/local/cross/armhf/bin:/usr/local/cross/armhf/bin"
        );
        assert!(paths.tool_path("").starts_with("/build/PKG"));
    }

    #[test]
    fn test_guard_removes_directory_when_dropped_armed() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("armhf");
        std::fs::create_dir_all(work.join("gcc-obj")).unwrap();
        {
            let _guard = WorkDirGuard::new(work.clone(), false);
        }
        assert!(!work.exists());
    }

    #[test]
    fn test_guard_keeps_directory_when_disarmed_or_kept() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("armhf");
        std::fs::create_dir_all(&work).unwrap();
        {
            let mut guard = WorkDirGuard::new(work.clone(), false);
            guard.disarm();
        }
        assert!(work.exists());
        {
            let _guard = WorkDirGuard::new(work.clone(), true);
        }
        assert!(work.exists());
    }
}
