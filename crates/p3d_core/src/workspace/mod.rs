//! Per-job workspace directory tree.
//!
//! Each job gets its own tree under `<base>/jobs/<job_id>/` so
//! concurrent jobs cannot overwrite each other's segment, frames, or
//! reconstruction output. The export directory is shared across jobs;
//! collection copies in with collision-proof names. `ensure()` is
//! cheap and idempotent and runs before every stage because the tree
//! is ordinary filesystem state that can be disturbed between stages.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::pipeline::errors::{PipelineError, PipelineResult};

const WRITE_PROBE: &str = ".write_probe";

/// Fixed directory layout for one pipeline run.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root of this job's tree.
    pub job_root: PathBuf,
    /// Extracted frame images.
    pub frames_dir: PathBuf,
    /// Trimmed video segment.
    pub video_segment: PathBuf,
    /// Reconstruction output tree.
    pub output_dir: PathBuf,
    /// Reconstruction cache (under the output tree).
    pub cache_dir: PathBuf,
    /// Reconstruction save-project file.
    pub project_file: PathBuf,
    /// Shared export directory for collected artifacts.
    pub export_dir: PathBuf,
}

impl Workspace {
    /// Build the workspace layout for a job id.
    pub fn for_job(settings: &Settings, job_id: &str) -> Self {
        let job_root = settings.paths.base_dir.join("jobs").join(job_id);
        let frames_dir = job_root.join("frames");
        let video_segment = job_root.join("video_segment.mp4");
        let output_dir = job_root.join("meshroom_output");
        let cache_dir = output_dir.join("cache");
        let project_file = output_dir.join("project.mg");
        Self {
            job_root,
            frames_dir,
            video_segment,
            output_dir,
            cache_dir,
            project_file,
            export_dir: settings.paths.export_dir.clone(),
        }
    }

    /// Create the full directory set if absent and verify each is
    /// writable with a create-and-delete probe file.
    ///
    /// Idempotent; also sweeps stale download temp files from the job
    /// root (best-effort).
    pub fn ensure(&self) -> PipelineResult<()> {
        for dir in [
            &self.job_root,
            &self.frames_dir,
            &self.output_dir,
            &self.cache_dir,
            &self.export_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                PipelineError::filesystem(format!(
                    "failed to create directory {}: {e}",
                    dir.display()
                ))
            })?;
            probe_writable(dir).map_err(|e| {
                PipelineError::filesystem(format!(
                    "directory {} is not writable: {e}",
                    dir.display()
                ))
            })?;
        }

        self.sweep_stale_downloads();
        Ok(())
    }

    /// Remove all previously extracted frames, keeping the directory.
    pub fn clear_frames(&self) -> PipelineResult<()> {
        clear_dir_contents(&self.frames_dir).map_err(|e| {
            PipelineError::filesystem(format!(
                "failed to clear frames directory {}: {e}",
                self.frames_dir.display()
            ))
        })
    }

    /// Remove all prior reconstruction output (files and
    /// subdirectories), recreating the empty tree.
    pub fn clear_output(&self) -> PipelineResult<()> {
        clear_dir_contents(&self.output_dir)
            .and_then(|_| fs::create_dir_all(&self.cache_dir))
            .map_err(|e| {
                PipelineError::filesystem(format!(
                    "failed to clear output directory {}: {e}",
                    self.output_dir.display()
                ))
            })
    }

    /// Count extracted frame images currently on disk.
    pub fn frame_count(&self) -> PipelineResult<usize> {
        if !self.frames_dir.exists() {
            return Ok(0);
        }
        let entries = fs::read_dir(&self.frames_dir).map_err(|e| {
            PipelineError::filesystem(format!(
                "failed to read frames directory {}: {e}",
                self.frames_dir.display()
            ))
        })?;
        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "jpg") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn sweep_stale_downloads(&self) {
        let entries = match fs::read_dir(&self.job_root) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(".tmp.mp4") {
                if fs::remove_file(entry.path()).is_ok() {
                    tracing::debug!("removed stale download {}", entry.path().display());
                }
            }
        }
    }
}

fn probe_writable(dir: &Path) -> io::Result<()> {
    let probe = dir.join(WRITE_PROBE);
    fs::write(&probe, b"")?;
    fs::remove_file(&probe)?;
    Ok(())
}

fn clear_dir_contents(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return fs::create_dir_all(dir);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
