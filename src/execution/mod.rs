//! Execution module.
//!
//! This module runs task batches: the orchestrator schedules readers and
//! workers, the chain runner applies one task's effects and the decomposer
//! splits each effect into parallel row slices.

pub mod chain;
pub mod decomposer;
pub mod orchestrator;
pub mod progress;

pub use chain::{ChainReport, EffectChainRunner};
pub use decomposer::SubImageDecomposer;
pub use orchestrator::{Orchestrator, RunSummary};
pub use progress::{CancellationToken, ProgressCallback, ProgressTracker, ProgressUpdate};
