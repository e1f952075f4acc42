//! Orchestrator that runs the pipeline stages in fixed order.
//!
//! Stages run strictly sequentially; any stage error aborts the run
//! and is returned to the caller unchanged. There is no partial
//! resumption - a fresh launch reruns every stage from scratch.

use std::time::Instant;

use super::context::{Context, JobState};
use super::errors::PipelineResult;
use super::stage::PipelineStage;
use super::stages::{
    CollectExportsStage, DependencyCheckStage, DownloadStage, ExtractFramesStage, ReconstructStage,
};
use super::state::{PipelineState, StageTiming};

/// Runs a sequence of pipeline stages against one job context.
pub struct Orchestrator {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Orchestrator {
    /// The standard five-stage pipeline: dependency check, download,
    /// frame extraction, reconstruction, export collection.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(DependencyCheckStage),
                Box::new(DownloadStage),
                Box::new(ExtractFramesStage),
                Box::new(ReconstructStage),
                Box::new(CollectExportsStage),
            ],
        }
    }

    /// Orchestrator over a custom stage list.
    pub fn with_stages(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        Self { stages }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run all stages to completion.
    ///
    /// Returns the final job state (`Completed`, with collected
    /// exports) or the originating stage error.
    pub fn run(&self, ctx: &Context) -> PipelineResult<JobState> {
        let mut state = JobState::new();
        let run_started = Instant::now();
        tracing::info!(job_id = %ctx.job_id, "starting pipeline");

        for stage in &self.stages {
            if let Err(e) = self.run_stage(stage.as_ref(), ctx, &mut state) {
                state.state = PipelineState::Failed;
                tracing::error!(
                    job_id = %ctx.job_id,
                    stage = stage.name(),
                    kind = e.kind(),
                    error = %e,
                    "pipeline failed"
                );
                return Err(e);
            }
        }

        state.state = PipelineState::Completed;
        tracing::info!(
            job_id = %ctx.job_id,
            elapsed_secs = run_started.elapsed().as_secs_f64(),
            exports = state.exports.len(),
            "pipeline completed"
        );
        Ok(state)
    }

    fn run_stage(
        &self,
        stage: &dyn PipelineStage,
        ctx: &Context,
        state: &mut JobState,
    ) -> PipelineResult<()> {
        // The workspace can be externally disturbed between stages, so
        // re-establish it before each one.
        ctx.workspace.ensure()?;

        state.state = stage.state();
        tracing::info!(job_id = %ctx.job_id, stage = stage.name(), "starting stage");

        stage.validate_input(ctx, state)?;

        let started = Instant::now();
        stage.execute(ctx, state)?;
        stage.validate_output(ctx, state)?;
        let elapsed = started.elapsed();

        state.timings.push(StageTiming {
            stage: stage.name().to_string(),
            elapsed,
        });
        tracing::info!(
            job_id = %ctx.job_id,
            stage = stage.name(),
            elapsed_secs = elapsed.as_secs_f64(),
            "stage completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::{PipelineRequest, PipelineSource};
    use crate::pipeline::errors::PipelineError;
    use crate::process::{ProcessError, ProcessOutput, ProcessRunner};
    use crate::workspace::Workspace;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
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

    struct CountingStage {
        name: &'static str,
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    impl PipelineStage for CountingStage {
        fn name(&self) -> &'static str {
            self.name
        }

        fn state(&self) -> PipelineState {
            PipelineState::Downloading
        }

        fn validate_input(&self, _ctx: &Context, _state: &JobState) -> PipelineResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut JobState) -> PipelineResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PipelineError::download("simulated failure"))
            } else {
                Ok(())
            }
        }
    }

    fn test_context(root: &Path) -> Context {
        let mut settings = Settings::default();
        settings.paths.base_dir = root.join("base");
        settings.paths.export_dir = root.join("exports");
        settings.paths.logs_dir = root.join("logs");
        let workspace = Workspace::for_job(&settings, "job_test");
        Context::new(
            PipelineRequest {
                source: PipelineSource::Url("https://example.com/v".to_string()),
                start_time: "00:00:10".to_string(),
                duration_secs: 5,
                fps: None,
            },
            settings,
            "job_test",
            workspace,
            Arc::new(UnusedRunner),
        )
    }

    #[test]
    fn standard_pipeline_has_fixed_stage_order() {
        let orchestrator = Orchestrator::standard();
        assert_eq!(
            orchestrator.stage_names(),
            vec![
                "DependencyCheck",
                "Download",
                "ExtractFrames",
                "Reconstruct",
                "CollectExports"
            ]
        );
    }

    #[test]
    fn stages_run_in_order_and_timings_recorded() {
        let dir = tempdir().unwrap();
        let ctx = test_context(dir.path());
        let count = Arc::new(AtomicUsize::new(0));
        let orchestrator = Orchestrator::with_stages(vec![
            Box::new(CountingStage {
                name: "First",
                count: Arc::clone(&count),
                fail: false,
            }),
            Box::new(CountingStage {
                name: "Second",
                count: Arc::clone(&count),
                fail: false,
            }),
        ]);

        let state = orchestrator.run(&ctx).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(state.state, PipelineState::Completed);
        assert_eq!(state.timings.len(), 2);
        assert_eq!(state.timings[0].stage, "First");
    }

    #[test]
    fn stage_error_aborts_run_unchanged() {
        let dir = tempdir().unwrap();
        let ctx = test_context(dir.path());
        let count = Arc::new(AtomicUsize::new(0));
        let orchestrator = Orchestrator::with_stages(vec![
            Box::new(CountingStage {
                name: "Failing",
                count: Arc::clone(&count),
                fail: true,
            }),
            Box::new(CountingStage {
                name: "Never",
                count: Arc::clone(&count),
                fail: false,
            }),
        ]);

        let err = orchestrator.run(&ctx).unwrap_err();

        // Only the failing stage ran, and its error kind is preserved.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(matches!(err, PipelineError::Download(_)));
    }
}
