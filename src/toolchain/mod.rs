//! Toolchain sources: release pinning, download, integrity and extraction.

pub mod fetch;
pub mod sources;
pub mod unpack;

pub use fetch::{check_integrity, ensure_tarball, md5_file};
pub use sources::{SourcePackage, SourceRelease, ToolchainManifest, DEFAULT_MIRROR};
pub use unpack::{unpack_command, unpack_tarball};
