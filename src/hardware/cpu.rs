//! CPU detection: logical core count for `make -j` and the model name for logs.

use std::fs;

/// First `model name` entry of /proc/cpuinfo content.
fn parse_model_name(content: &str) -> String {
    content
        .lines()
        .filter(|line| line.starts_with("model name"))
        .find_map(|line| line.split(": ").nth(1))
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Detect CPU model name from /proc/cpuinfo.
pub fn detect_cpu_model() -> String {
    match fs::read_to_string("/proc/cpuinfo") {
        Ok(content) => parse_model_name(&content),
        Err(_) => "Unknown".to_string(),
    }
}

/// Number of logical CPUs available to this process (at least 1).
pub fn detect_cpu_count() -> usize {
    num_cpus::get().max(1)
}
