//! Pipeline State Management and Stage Tracking
//!
//! The orchestrator walks a fixed sequence of stages. This module holds the
//! stage enum, the legal transitions between stages and the progress snapshot
//! the orchestrator updates as it goes.

use std::time::SystemTime;

use crate::error::BuildError;
use crate::models::Component;

/// Discrete stages of a toolchain build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Dependency notice and host header probes
    Preflight,

    /// Download and verify source tarballs
    Fetch,

    /// Clear the previous work directory (and live prefix when installing)
    Prepare,

    /// Extract tarballs into the work directory
    Unpack,

    Binutils,

    /// Core GCC (`all-gcc`), C and optionally C++
    Gcc,

    Gdb,

    /// Remove the work directory
    Cleanup,

    Completed,

    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Preflight => "preflight",
            PipelineStage::Fetch => "fetch",
            PipelineStage::Prepare => "prepare",
            PipelineStage::Unpack => "unpack",
            PipelineStage::Binutils => "binutils",
            PipelineStage::Gcc => "gcc",
            PipelineStage::Gdb => "gdb",
            PipelineStage::Cleanup => "cleanup",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        }
    }

    /// The stage that builds `component`
    pub fn for_component(component: Component) -> Self {
        match component {
            Component::Binutils => PipelineStage::Binutils,
            Component::Gcc => PipelineStage::Gcc,
            Component::Gdb => PipelineStage::Gdb,
        }
    }

    /// The stage following this one on the success path.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Preflight => Some(PipelineStage::Fetch),
            PipelineStage::Fetch => Some(PipelineStage::Prepare),
            PipelineStage::Prepare => Some(PipelineStage::Unpack),
            PipelineStage::Unpack => Some(PipelineStage::Binutils),
            PipelineStage::Binutils => Some(PipelineStage::Gcc),
            PipelineStage::Gcc => Some(PipelineStage::Gdb),
            PipelineStage::Gdb => Some(PipelineStage::Cleanup),
            PipelineStage::Cleanup => Some(PipelineStage::Completed),
            PipelineStage::Completed | PipelineStage::Failed => None,
        }
    }

    /// Any running stage may fail; otherwise only the next stage is legal.
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        match (self, next) {
            (PipelineStage::Completed, _) | (PipelineStage::Failed, _) => false,
            (_, PipelineStage::Failed) => true,
            _ => self.next() == Some(next),
        }
    }

    /// Overall progress reached once this stage has started
    pub fn progress(&self) -> u32 {
        match self {
            PipelineStage::Preflight => 0,
            PipelineStage::Fetch => 2,
            PipelineStage::Prepare => 10,
            PipelineStage::Unpack => 12,
            PipelineStage::Binutils => 20,
            PipelineStage::Gcc => 35,
            PipelineStage::Gdb => 80,
            PipelineStage::Cleanup => 98,
            PipelineStage::Completed => 100,
            PipelineStage::Failed => 0,
        }
    }
}

/// Execution snapshot for progress reporting.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub stage: PipelineStage,

    /// Overall progress percentage (0-100)
    pub progress: u32,

    /// External commands executed so far
    pub commands_run: u32,

    pub start_time: SystemTime,

    pub last_update_time: SystemTime,

    /// Error message if the pipeline failed
    pub error: Option<String>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    pub fn new() -> Self {
        let now = SystemTime::now();
        PipelineState {
            stage: PipelineStage::Preflight,
            progress: 0,
            commands_run: 0,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Attempt to transition to the next stage.
    pub fn transition_to(&mut self, next: PipelineStage) -> Result<(), BuildError> {
        if !self.stage.can_transition_to(next) {
            return Err(BuildError::InvalidTransition(format!(
                "{} -> {}",
                self.stage.as_str(),
                next.as_str()
            )));
        }
        self.stage = next;
        if next != PipelineStage::Failed {
            self.progress = next.progress();
        }
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    pub fn record_command(&mut self) {
        self.commands_run += 1;
        self.last_update_time = SystemTime::now();
    }

    /// Record an error and mark the pipeline as failed.
    pub fn record_error(&mut self, error: String) {
        self.error = Some(error);
        self.stage = PipelineStage::Failed;
        self.last_update_time = SystemTime::now();
    }
}
