//! Toolchain manifest loader and serialization.

use crate::error::ConfigError;
use crate::toolchain::sources::ToolchainManifest;
use std::fs;
use std::path::Path;

/// Load and validate a manifest from a JSON file.
pub fn load_manifest_from_file(path: &Path) -> Result<ToolchainManifest, ConfigError> {
    validate_manifest_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let manifest: ToolchainManifest = serde_json::from_str(&content)?;
    manifest.validate()?;

    log::debug!("[Config] Loaded manifest from {}", path.display());
    Ok(manifest)
}

/// Save a manifest as pretty-printed JSON.
pub fn save_manifest_to_file(manifest: &ToolchainManifest, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json_content = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json_content)?;
    Ok(())
}

/// Validate manifest path (.json extension required).
pub fn validate_manifest_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Manifest path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Manifest file must have .json extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Manifest file must have .json extension".to_string(),
        )),
    }
}
