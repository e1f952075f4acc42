//! Dependency-check stage.
//!
//! Verifies the downloader, transcoder, and reconstruction binary are
//! present before any work starts. With `auto_install_deps` set, the
//! installable tools are installed through the host package manager;
//! the reconstruction binary is only ever verified.

use crate::deps;
use crate::pipeline::context::{Context, JobState};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::state::PipelineState;

pub struct DependencyCheckStage;

impl PipelineStage for DependencyCheckStage {
    fn name(&self) -> &'static str {
        "DependencyCheck"
    }

    fn state(&self) -> PipelineState {
        PipelineState::DependencyCheck
    }

    fn validate_input(&self, _ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, _state: &mut JobState) -> PipelineResult<()> {
        let statuses = deps::check_all(&ctx.settings.tools);
        let missing: Vec<&str> = statuses
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(tool, _)| tool.as_str())
            .collect();

        if missing.is_empty() {
            tracing::debug!(job_id = %ctx.job_id, "all external tools present");
            return Ok(());
        }

        if ctx.settings.processing.auto_install_deps {
            tracing::info!(
                job_id = %ctx.job_id,
                missing = missing.join(", "),
                "attempting to install missing tools"
            );
            return deps::install_missing(&ctx.settings.tools, ctx.runner.as_ref());
        }

        Err(PipelineError::dependency(format!(
            "missing required tools: {}",
            missing.join(", ")
        )))
    }
}
