//! The discrete, ordered steps of the provisioning sequence.
//!
//! Each phase reports an explicit [`PhaseOutcome`] instead of silently
//! swallowing command exit codes: a phase either completed cleanly, or
//! completed while recording warnings in the [`crate::report::Reporter`].
//! Fatal conditions surface as errors and stop the pipeline.

pub mod base_deps;
pub mod privilege;
pub mod python_env;
pub mod secondary;
pub mod service;
pub mod system_deps;
pub mod verify;

/// How a phase finished. Warnings never change the process exit code; they
/// are carried into the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    CompletedWithWarnings,
}

impl PhaseOutcome {
    pub fn from_warning_count(before: usize, after: usize) -> Self {
        if after > before {
            Self::CompletedWithWarnings
        } else {
            Self::Completed
        }
    }
}
