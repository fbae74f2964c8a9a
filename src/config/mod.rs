//! Build configuration: turns raw CLI input and the environment into a
//! validated [`BuildConfig`].
//!
//! Resolution happens entirely before the pipeline starts, so an unknown
//! architecture or a bad manifest fails without touching the filesystem.

pub mod loader;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::hardware::detect_cpu_count;
use crate::models::{Architecture, BuildConfig, InstallMode};
use crate::toolchain::sources::ToolchainManifest;

pub use loader::{load_manifest_from_file, save_manifest_to_file, validate_manifest_path};

/// Environment variable naming the install root
pub const CROSS_PREFIX_ENV: &str = "CROSS_PREFIX";

/// Install root used when `CROSS_PREFIX` is unset or empty
pub const DEFAULT_CROSS_PREFIX: &str = "/usr/local/cross";

/// Unvalidated build request, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub arch: String,
    pub install: String,
    pub cores: Option<usize>,
    pub enable_cxx: bool,
    pub manifest: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub keep_work_dir: bool,
    pub skip_preflight: bool,
    pub dry_run: bool,
}

/// Pick the install root from the value of `CROSS_PREFIX`.
pub fn resolve_cross_prefix(env_value: Option<&str>) -> Result<PathBuf, ConfigError> {
    let raw = match env_value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => DEFAULT_CROSS_PREFIX,
    };
    let path = PathBuf::from(raw);
    if !path.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be an absolute path, got '{}'",
            CROSS_PREFIX_ENV, raw
        )));
    }
    Ok(path)
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Validate a request against an explicit environment.
///
/// `cross_prefix_env` is the value of `CROSS_PREFIX`; `cwd` anchors relative
/// paths and is the default base directory.
pub fn resolve_with_env(
    request: &BuildRequest,
    cross_prefix_env: Option<&str>,
    cwd: &Path,
) -> Result<BuildConfig, ConfigError> {
    let arch: Architecture = request.arch.parse()?;
    let install_mode: InstallMode = request.install.parse()?;

    let cores = match request.cores {
        Some(0) => {
            return Err(ConfigError::InvalidCores(
                "at least one core is required".to_string(),
            ))
        }
        Some(n) => n,
        None => {
            let detected = detect_cpu_count();
            log::debug!("[Config] --cores not given, using {} detected CPUs", detected);
            detected
        }
    };

    let cross_prefix = resolve_cross_prefix(cross_prefix_env)?;

    let base_dir = match &request.base_dir {
        Some(dir) => absolutize(dir, cwd),
        None => cwd.to_path_buf(),
    };

    let manifest = match &request.manifest {
        Some(path) => load_manifest_from_file(&absolutize(path, cwd))?,
        None => ToolchainManifest::default(),
    };

    Ok(BuildConfig {
        arch,
        install_mode,
        cores,
        enable_cxx: request.enable_cxx,
        cross_prefix,
        base_dir,
        manifest,
        keep_work_dir: request.keep_work_dir,
        skip_preflight: request.skip_preflight,
        dry_run: request.dry_run,
    })
}

/// Validate a request against the process environment.
pub fn resolve_build_config(request: &BuildRequest) -> Result<BuildConfig, ConfigError> {
    let cwd = std::env::current_dir()?;
    let env_value = std::env::var(CROSS_PREFIX_ENV).ok();
    resolve_with_env(request, env_value.as_deref(), &cwd)
}
