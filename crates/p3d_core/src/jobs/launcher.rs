//! Fire-and-forget job launcher.
//!
//! `launch` validates the request synchronously, then hands the full
//! pipeline run to a named background thread and returns immediately
//! with a [`JobHandle`]. Every finished run, success or failure, is
//! reported on the outcome channel handed back from [`JobLauncher::new`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::config::Settings;
use crate::models::{ExportArtifact, JobHandle, PipelineRequest};
use crate::pipeline::{Orchestrator, PipelineError, PipelineResult};
use crate::process::ProcessRunner;
use crate::workspace::Workspace;

static JOB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Produce a job id unique within and across process lifetimes.
///
/// The wall-clock component separates runs of the binary; the process
/// counter separates jobs accepted within the same second.
pub fn next_job_id() -> String {
    let seq = JOB_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("job_{}_{seq:04}", Local::now().format("%Y%m%d%H%M%S"))
}

/// Terminal report for one background job.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: String,
    pub result: Result<Vec<ExportArtifact>, PipelineError>,
    pub elapsed: Duration,
}

/// Accepts pipeline requests and runs each on its own background
/// thread.
pub struct JobLauncher {
    settings: Settings,
    runner: Arc<dyn ProcessRunner>,
    outcomes: mpsc::Sender<JobOutcome>,
}

impl JobLauncher {
    /// Build a launcher plus the receiving end of its outcome channel.
    pub fn new(
        settings: Settings,
        runner: Arc<dyn ProcessRunner>,
    ) -> (Self, mpsc::Receiver<JobOutcome>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                settings,
                runner,
                outcomes: tx,
            },
            rx,
        )
    }

    /// Validate the request, then start the pipeline in the background.
    ///
    /// Returns as soon as the request is accepted. Invalid requests are
    /// rejected here and never reach the outcome channel.
    pub fn launch(&self, request: PipelineRequest) -> PipelineResult<JobHandle> {
        request.validate(&self.settings.processing)?;

        let job_id = next_job_id();
        let handle = JobHandle {
            job_id: job_id.clone(),
            started_at: Local::now(),
        };

        let ctx = self.build_context(request, &job_id);
        let outcomes = self.outcomes.clone();
        thread::Builder::new()
            .name(job_id.clone())
            .spawn(move || {
                let started = Instant::now();
                let result = Orchestrator::standard().run(&ctx).map(|state| state.exports);
                let outcome = JobOutcome {
                    job_id: ctx.job_id.clone(),
                    result,
                    elapsed: started.elapsed(),
                };
                // The caller may have dropped the receiver; the run
                // itself is already logged either way.
                if outcomes.send(outcome).is_err() {
                    tracing::debug!(job_id = %ctx.job_id, "outcome receiver dropped");
                }
            })
            .map_err(|e| PipelineError::other(format!("failed to spawn job thread: {e}")))?;

        tracing::info!(job_id = %handle.job_id, "job accepted");
        Ok(handle)
    }

    /// Run a pipeline to completion on the calling thread.
    pub fn run_blocking(&self, request: PipelineRequest) -> PipelineResult<Vec<ExportArtifact>> {
        request.validate(&self.settings.processing)?;
        let job_id = next_job_id();
        let ctx = self.build_context(request, &job_id);
        Orchestrator::standard().run(&ctx).map(|state| state.exports)
    }

    fn build_context(
        &self,
        request: PipelineRequest,
        job_id: &str,
    ) -> crate::pipeline::Context {
        let workspace = Workspace::for_job(&self.settings, job_id);
        crate::pipeline::Context::new(
            request,
            self.settings.clone(),
            job_id,
            workspace,
            Arc::clone(&self.runner),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PipelineSource;
    use crate::process::{ProcessError, ProcessOutput};
    use std::collections::HashSet;
    use std::path::Path;
    use tempfile::tempdir;

    struct UnusedRunner;

    impl ProcessRunner for UnusedRunner {
        fn run(
            &self,
            _argv: &[String],
            _cwd: Option<&Path>,
        ) -> Result<ProcessOutput, ProcessError> {
            panic!("runner should not be invoked");
        }
    }

    fn test_settings(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.paths.base_dir = root.join("base");
        settings.paths.export_dir = root.join("exports");
        settings.paths.logs_dir = root.join("logs");
        settings
    }

    fn url_request() -> PipelineRequest {
        PipelineRequest {
            source: PipelineSource::Url("https://example.com/video".to_string()),
            start_time: "00:00:05".to_string(),
            duration_secs: 10,
            fps: None,
        }
    }

    #[test]
    fn job_ids_are_unique() {
        let ids: HashSet<String> = (0..50).map(|_| next_job_id()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn invalid_request_rejected_before_spawn() {
        let dir = tempdir().unwrap();
        let (launcher, rx) = JobLauncher::new(test_settings(dir.path()), Arc::new(UnusedRunner));

        let mut request = url_request();
        request.start_time = "bad".to_string();
        let err = launcher.launch(request).unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        // Nothing was started, so nothing reports back.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn failed_background_job_reports_outcome() {
        let dir = tempdir().unwrap();
        let mut settings = test_settings(dir.path());
        // Dependency check fails immediately: no such tools exist.
        settings.tools.downloader = "p3d-missing-downloader".to_string();
        settings.tools.fallback_downloader = "p3d-missing-fallback".to_string();
        settings.tools.ffmpeg = "p3d-missing-ffmpeg".to_string();
        settings.tools.meshroom_bin = "/nonexistent/meshroom_batch".to_string();

        let (launcher, rx) = JobLauncher::new(settings, Arc::new(UnusedRunner));
        let handle = launcher.launch(url_request()).unwrap();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.job_id, handle.job_id);
        assert!(matches!(
            outcome.result,
            Err(PipelineError::Dependency(_))
        ));
    }
}
