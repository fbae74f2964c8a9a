//! System module: build directory layout and filesystem helpers.

pub mod paths;

pub use paths::{cleanup_dir, create_dir, BuildPaths, WorkDirGuard, STAGING_DIR_NAME};
