//! Cross-Toolchain Builder
//!
//! Downloads, configures and compiles a GCC-based cross-compiler toolchain
//! (binutils, GCC with optional C++, GDB) for one of a fixed set of target
//! architectures, installing it live or into a staging tree.
//!
//! The crate is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Architectures, install modes, components and the resolved build config
//! - **config**: CLI input and environment to `BuildConfig`, JSON manifest loading
//! - **hardware**: CPU detection for the default job count
//! - **system**: Build directory layout and the scoped work-directory guard
//! - **toolchain**: Source releases, download, integrity checks and extraction
//! - **orchestrator**: Staged build pipeline and the command runner seam
//! - **log_collector**: `log` backend writing run logs and the console

// Core foundational modules
pub mod error;
pub mod models;

pub mod config;
pub mod hardware;
pub mod system;

// Source tarballs: pinning, fetching, unpacking
pub mod toolchain;

pub mod log_collector;

// Build orchestration and state management
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, BuildError, ConfigError, FetchError, Result};

pub use models::{
    Architecture, BuildConfig, BuildStep, Component, InstallMode, PlatformDescriptor,
    PlatformQuirk,
};

pub use config::{resolve_build_config, BuildRequest};

pub use toolchain::{SourcePackage, ToolchainManifest};

pub use orchestrator::{
    CommandRunner, CommandSpec, DryRunRunner, Orchestrator, PipelineStage, PipelineState,
    ProcessRunner,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
