//! Host hardware detection.

pub mod cpu;

pub use cpu::{detect_cpu_count, detect_cpu_model};
