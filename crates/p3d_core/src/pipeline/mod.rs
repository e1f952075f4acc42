//! Staged media-to-3D pipeline.
//!
//! A run moves through a fixed sequence of stages, each implementing
//! [`stage::PipelineStage`]. The [`orchestrator::Orchestrator`] drives
//! them in order against a shared [`context::Context`] and accumulates
//! results in a [`context::JobState`].

pub mod context;
pub mod errors;
pub mod orchestrator;
pub mod stage;
pub mod stages;
pub mod state;

pub use context::{Context, JobState};
pub use errors::{PipelineError, PipelineResult};
pub use orchestrator::Orchestrator;
pub use stage::PipelineStage;
pub use state::{PipelineState, StageTiming};
