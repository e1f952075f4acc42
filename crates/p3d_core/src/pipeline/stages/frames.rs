//! Frame-extraction stage.
//!
//! Clears any frames left by a previous run, then extracts frames from
//! the video segment at the requested rate with a fixed quality
//! setting into `frames/frame_%04d.jpg`.

use crate::pipeline::context::{Context, JobState};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::state::PipelineState;

pub struct ExtractFramesStage;

impl PipelineStage for ExtractFramesStage {
    fn name(&self) -> &'static str {
        "ExtractFrames"
    }

    fn state(&self) -> PipelineState {
        PipelineState::ExtractingFrames
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        let segment = &ctx.workspace.video_segment;
        if !segment.is_file() {
            return Err(PipelineError::frame_extraction(format!(
                "video segment not found: {}",
                segment.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<()> {
        let ws = &ctx.workspace;
        let fps = ctx.fps();
        tracing::info!(job_id = %ctx.job_id, fps, "extracting frames");

        // Prevent mixing frames from a previous run.
        ws.clear_frames()?;

        let argv = vec![
            ctx.settings.tools.ffmpeg.clone(),
            "-i".to_string(),
            ws.video_segment.display().to_string(),
            "-vf".to_string(),
            format!("fps={fps}"),
            "-qscale:v".to_string(),
            "2".to_string(),
            ws.frames_dir.join("frame_%04d.jpg").display().to_string(),
        ];
        ctx.runner
            .run(&argv, None)
            .map_err(|e| PipelineError::frame_extraction(e.to_string()))?;

        let frame_count = ws.frame_count()?;
        if frame_count == 0 {
            return Err(PipelineError::frame_extraction("no frames were extracted"));
        }

        state.frame_count = Some(frame_count);
        tracing::info!(job_id = %ctx.job_id, frame_count, "frames extracted");
        Ok(())
    }
}
