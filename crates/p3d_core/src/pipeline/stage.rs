//! Pipeline stage trait definition.
//!
//! All pipeline stages implement this trait. The orchestrator calls
//! the methods in order:
//!
//! 1. `validate_input` - check preconditions before execution
//! 2. `execute` - perform the stage's work
//! 3. `validate_output` - verify the stage produced valid output

use super::context::{Context, JobState};
use super::errors::PipelineResult;
use super::state::PipelineState;

/// Trait for pipeline stages.
pub trait PipelineStage: Send + Sync {
    /// Stage name for logging and timing records.
    fn name(&self) -> &'static str;

    /// State-machine state this stage corresponds to.
    fn state(&self) -> PipelineState;

    /// Validate preconditions before execution.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> PipelineResult<()>;

    /// Perform the stage's work, recording results in `state`.
    fn execute(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<()>;

    /// Verify the stage produced valid output.
    fn validate_output(&self, _ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        Ok(())
    }
}
