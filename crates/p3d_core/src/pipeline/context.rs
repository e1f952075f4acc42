//! Context and mutable state for a pipeline run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::Settings;
use crate::models::{ExportArtifact, PipelineRequest};
use crate::process::ProcessRunner;
use crate::workspace::Workspace;

use super::state::{PipelineState, StageTiming};

/// Read-only context passed to pipeline stages.
///
/// Mutable run state lives in [`JobState`].
pub struct Context {
    /// The request being processed.
    pub request: PipelineRequest,
    /// Application settings.
    pub settings: Settings,
    /// Unique job identifier.
    pub job_id: String,
    /// This job's directory tree.
    pub workspace: Workspace,
    /// Capability for running external commands.
    pub runner: Arc<dyn ProcessRunner>,
}

impl Context {
    pub fn new(
        request: PipelineRequest,
        settings: Settings,
        job_id: impl Into<String>,
        workspace: Workspace,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            request,
            settings,
            job_id: job_id.into(),
            workspace,
            runner,
        }
    }

    /// Effective frame extraction rate for this run.
    pub fn fps(&self) -> u32 {
        self.request
            .fps
            .unwrap_or(self.settings.processing.default_fps)
    }
}

/// Mutable state accumulated over one pipeline run.
#[derive(Debug)]
pub struct JobState {
    /// Current position in the state machine.
    pub state: PipelineState,
    /// Frame count recorded by the extraction stage.
    pub frame_count: Option<usize>,
    /// Artifacts collected by the export stage.
    pub exports: Vec<ExportArtifact>,
    /// Per-stage elapsed times.
    pub timings: Vec<StageTiming>,
    /// When the run started.
    pub started_at: DateTime<Local>,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Created,
            frame_count: None,
            exports: Vec::new(),
            timings: Vec::new(),
            started_at: Local::now(),
        }
    }

    /// Sum of recorded stage times.
    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_created() {
        let state = JobState::new();
        assert_eq!(state.state, PipelineState::Created);
        assert!(state.exports.is_empty());
        assert!(state.frame_count.is_none());
    }

    #[test]
    fn total_elapsed_sums_timings() {
        let mut state = JobState::new();
        state.timings.push(StageTiming {
            stage: "Download".to_string(),
            elapsed: Duration::from_secs(2),
        });
        state.timings.push(StageTiming {
            stage: "ExtractFrames".to_string(),
            elapsed: Duration::from_secs(3),
        });
        assert_eq!(state.total_elapsed(), Duration::from_secs(5));
    }
}
