//! Download stage - fetch the source video and trim the segment.
//!
//! URL sources are downloaded in full to a uniquely named temp file
//! with the primary downloader, falling back to the secondary
//! downloader, then trimmed to `[start, start+duration]` with a
//! stream-copy (no re-encode) into the job's segment path. Local file
//! sources are copied into place without trimming.

use std::fs;

use chrono::Local;

use crate::models::PipelineSource;
use crate::pipeline::context::{Context, JobState};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::state::PipelineState;

pub struct DownloadStage;

impl DownloadStage {
    fn download_url(&self, ctx: &Context, url: &str) -> PipelineResult<()> {
        let ws = &ctx.workspace;
        let tools = &ctx.settings.tools;
        let temp_file = ws.job_root.join(format!(
            "download_{}.tmp.mp4",
            Local::now().format("%Y%m%d%H%M%S%3f")
        ));
        let temp_str = temp_file.display().to_string();

        tracing::info!(
            job_id = %ctx.job_id,
            url,
            start = %ctx.request.start_time,
            duration_secs = ctx.request.duration_secs,
            "downloading video segment"
        );

        let primary = vec![
            tools.downloader.clone(),
            "-f".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            temp_str.clone(),
            url.to_string(),
        ];
        if let Err(primary_err) = ctx.runner.run(&primary, None) {
            tracing::warn!(
                "{} failed ({}), trying {} as fallback",
                tools.downloader,
                primary_err,
                tools.fallback_downloader
            );
            let fallback = vec![
                tools.fallback_downloader.clone(),
                "-f".to_string(),
                "mp4".to_string(),
                "-o".to_string(),
                temp_str.clone(),
                url.to_string(),
            ];
            ctx.runner.run(&fallback, None).map_err(|fallback_err| {
                PipelineError::download(format!(
                    "both {} and {} failed: {primary_err}; {fallback_err}",
                    tools.downloader, tools.fallback_downloader
                ))
            })?;
        }

        let trim = vec![
            tools.ffmpeg.clone(),
            "-y".to_string(),
            "-ss".to_string(),
            ctx.request.start_time.clone(),
            "-i".to_string(),
            temp_str,
            "-t".to_string(),
            ctx.request.duration_secs.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            ws.video_segment.display().to_string(),
        ];
        let trim_result = ctx
            .runner
            .run(&trim, None)
            .map_err(|e| PipelineError::download(format!("segment trim failed: {e}")));

        // Temp file cleanup is best-effort either way.
        if let Err(e) = fs::remove_file(&temp_file) {
            tracing::debug!("could not remove temp download {}: {e}", temp_file.display());
        }

        trim_result?;
        tracing::info!(job_id = %ctx.job_id, "video segment downloaded");
        Ok(())
    }

    fn copy_local(&self, ctx: &Context, source: &std::path::Path) -> PipelineResult<()> {
        let ws = &ctx.workspace;
        fs::copy(source, &ws.video_segment).map_err(|e| {
            PipelineError::download(format!(
                "failed to copy {} into workspace: {e}",
                source.display()
            ))
        })?;
        tracing::info!(
            job_id = %ctx.job_id,
            source = %source.display(),
            "copied local video into workspace"
        );
        Ok(())
    }
}

impl PipelineStage for DownloadStage {
    fn name(&self) -> &'static str {
        "Download"
    }

    fn state(&self) -> PipelineState {
        PipelineState::Downloading
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        ctx.request.validate(&ctx.settings.processing)
    }

    fn execute(&self, ctx: &Context, _state: &mut JobState) -> PipelineResult<()> {
        match &ctx.request.source {
            PipelineSource::Url(url) => self.download_url(ctx, url),
            PipelineSource::LocalFile(path) => self.copy_local(ctx, path),
        }
    }

    fn validate_output(&self, ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        let segment = &ctx.workspace.video_segment;
        let non_empty = fs::metadata(segment).map(|m| m.len() > 0).unwrap_or(false);
        if !non_empty {
            return Err(PipelineError::download(format!(
                "video segment missing or empty after download: {}",
                segment.display()
            )));
        }
        Ok(())
    }
}
