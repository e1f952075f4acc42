//! Reconstruction stage - invoke the external photogrammetry binary.

use crate::deps;
use crate::pipeline::context::{Context, JobState};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::state::PipelineState;

/// Hard policy floor: reconstruction is refused below this many frames.
pub const MIN_RECONSTRUCTION_FRAMES: usize = 10;

pub struct ReconstructStage;

impl PipelineStage for ReconstructStage {
    fn name(&self) -> &'static str {
        "Reconstruct"
    }

    fn state(&self) -> PipelineState {
        PipelineState::Reconstructing
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        let bin = &ctx.settings.tools.meshroom_bin;
        if deps::locate(bin).is_none() {
            return Err(PipelineError::meshroom(format!(
                "reconstruction binary not found: {bin}"
            )));
        }

        let frame_count = ctx.workspace.frame_count()?;
        if frame_count < MIN_RECONSTRUCTION_FRAMES {
            return Err(PipelineError::meshroom(format!(
                "not enough frames for reconstruction: {frame_count} found, {MIN_RECONSTRUCTION_FRAMES} required"
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, _state: &mut JobState) -> PipelineResult<()> {
        let ws = &ctx.workspace;
        tracing::info!(job_id = %ctx.job_id, "running reconstruction");

        // Drop output from any previous run before invoking the binary.
        ws.clear_output()?;

        let argv = vec![
            ctx.settings.tools.meshroom_bin.clone(),
            "--input".to_string(),
            ws.frames_dir.display().to_string(),
            "--output".to_string(),
            ws.output_dir.display().to_string(),
            "--cache".to_string(),
            ws.cache_dir.display().to_string(),
            "--save".to_string(),
            ws.project_file.display().to_string(),
        ];
        ctx.runner
            .run(&argv, None)
            .map_err(|e| PipelineError::meshroom(e.to_string()))?;

        tracing::info!(job_id = %ctx.job_id, "reconstruction completed");
        Ok(())
    }
}
