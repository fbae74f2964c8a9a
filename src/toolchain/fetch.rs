//! Source tarball download and integrity verification.
//!
//! Downloads go to `<tarball>.part` and are renamed only after the body has
//! been fully written, so an interrupted transfer never looks like a cached
//! tarball on the next run.

use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::toolchain::sources::SourcePackage;

/// Compute the lowercase hex MD5 digest of a file.
pub fn md5_file(path: &Path) -> Result<String, FetchError> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check the MD5 digest of a downloaded tarball.
pub fn check_integrity(path: &Path, expected: &str) -> Result<(), FetchError> {
    let actual = md5_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(FetchError::ChecksumMismatch {
            tarball: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Download `url` to `dest`.
pub async fn download(url: &str, dest: &Path) -> Result<(), FetchError> {
    log::info!("[Fetch] Downloading {}", url);

    let mut response = reqwest::get(url).await.map_err(|e| FetchError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let partial = partial_path(dest);
    match write_body(&mut response, url, &partial, dest).await {
        Ok(written) => {
            log::debug!("[Fetch] Wrote {} bytes to {}", written, dest.display());
            Ok(())
        }
        Err(e) => {
            discard_partial(&partial).await;
            Err(e)
        }
    }
}

/// Stream the response body into `partial`, then move it to `dest`.
async fn write_body(
    response: &mut reqwest::Response,
    url: &str,
    partial: &Path,
    dest: &Path,
) -> Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    })? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(partial, dest).await?;
    Ok(written)
}

/// Remove an unfinished download. A missing file is fine.
async fn discard_partial(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("[Fetch] Cannot remove {}: {}", partial.display(), e);
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Make sure the tarball for `package` is present in `dir`.
///
/// A tarball that already exists is reused as-is. A fresh download is
/// verified and deleted again when its digest does not match.
pub async fn ensure_tarball(package: &SourcePackage, dir: &Path) -> Result<PathBuf, FetchError> {
    let dest = dir.join(package.tarball());

    if dest.is_file() {
        log::info!("[Fetch] Reusing {}", dest.display());
        return Ok(dest);
    }

    download(&package.url, &dest).await?;

    if let Err(e) = check_integrity(&dest, &package.md5) {
        log::error!("[Fetch] {}", e);
        let _ = std::fs::remove_file(&dest);
        return Err(e);
    }

    log::info!(target: "parsed", "Fetched {} {}", package.component, package.version);
    Ok(dest)
}
