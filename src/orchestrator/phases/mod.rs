//! Orchestrator phases: the pipeline stages that need more than a few lines.
//!
//! - **Preflight** (`prep`) - dependency notice and host header probes
//! - **Component build** (`build`) - configure / compile / install commands
//!
//! Each phase is independently testable and composed by the orchestrator.

pub mod build;
pub mod prep;

pub use build::component_steps;
pub use prep::{check_headers, show_dependencies, HeaderProbe, HEADER_PROBES};
