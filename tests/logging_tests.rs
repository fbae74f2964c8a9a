//! Integration test for the global logger
//!
//! Installing a `log` backend is process-wide, so this file holds a single
//! test that drives the collector through the `log` macros.

use cross_toolchain::LogCollector;
use log::LevelFilter;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_installed_collector_routes_targets() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    let collector = LogCollector::install(&logs, LevelFilter::Off).unwrap();

    log::info!(target: "parsed", ">>> Starting binutils configuration");
    log::debug!(target: "build", "checking for gcc... gcc");
    log::info!(target: "cross_toolchain::orchestrator", "[Orchestrator] Stage: fetch (2%)");
    log::debug!(target: "hyper::client", "noise from a dependency");
    log::warn!(target: "reqwest::connect", "retrying");
    collector.wait_for_empty().unwrap();

    let full = fs::read_to_string(collector.log_path()).unwrap();
    assert!(full.contains("[INFO] >>> Starting binutils configuration"));
    assert!(full.contains("[DEBUG] checking for gcc... gcc"));
    assert!(full.contains("[INFO] [Orchestrator] Stage: fetch (2%)"));
    assert!(full.contains("[WARN] retrying"));
    assert!(!full.contains("noise from a dependency"));

    let parsed_path = fs::read_dir(&logs)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.to_string_lossy().ends_with("_parsed.log"))
        .unwrap();
    let parsed = fs::read_to_string(parsed_path).unwrap();
    assert_eq!(parsed.lines().count(), 1);
}
