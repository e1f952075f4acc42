//! Request and artifact types shared across the pipeline.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ProcessingSettings;
use crate::pipeline::errors::{PipelineError, PipelineResult};

/// Where the source video comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineSource {
    /// Remote video URL handed to the downloader tool.
    Url(String),
    /// Already-downloaded local file (upload path); copied into the
    /// workspace without trimming.
    LocalFile(PathBuf),
}

/// A request to process one video segment into 3D model artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Video source (URL or local file).
    pub source: PipelineSource,
    /// Segment start as `HH:MM:SS`.
    pub start_time: String,
    /// Segment duration in seconds.
    pub duration_secs: u32,
    /// Frame extraction rate; falls back to the configured default.
    #[serde(default)]
    pub fps: Option<u32>,
}

fn timecode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap())
}

impl PipelineRequest {
    /// Validate request fields against the configured limits.
    ///
    /// Called synchronously by the launcher before any background work
    /// starts, and again by the download stage as a precondition check.
    pub fn validate(&self, processing: &ProcessingSettings) -> PipelineResult<()> {
        if self.duration_secs < 1 {
            return Err(PipelineError::validation(
                "duration must be at least 1 second",
            ));
        }
        if self.duration_secs > processing.max_duration_secs {
            return Err(PipelineError::validation(format!(
                "duration exceeds maximum allowed time of {} seconds",
                processing.max_duration_secs
            )));
        }
        if !timecode_pattern().is_match(&self.start_time) {
            return Err(PipelineError::validation(format!(
                "start time must be in format HH:MM:SS, got: {}",
                self.start_time
            )));
        }
        match &self.source {
            PipelineSource::Url(url) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(PipelineError::validation(format!(
                        "invalid video URL: {url}"
                    )));
                }
            }
            PipelineSource::LocalFile(path) => {
                if !path.is_file() {
                    return Err(PipelineError::validation(format!(
                        "source file not found: {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One collected 3D model file in the export directory.
///
/// Created by the export-collection stage; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifact {
    /// Location of the copied file under the export directory.
    pub path: PathBuf,
    /// Model format without the leading dot (`obj`, `stl`, `glb`, `ply`).
    pub format: String,
    /// When the artifact was collected.
    pub created_at: DateTime<Local>,
}

/// Handle returned to the caller when a job is launched.
///
/// There is no persisted job-status store; beyond this handle, progress
/// is observable only through the audit log and the launcher's outcome
/// channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    /// Unique job identifier.
    pub job_id: String,
    /// When the job was accepted.
    pub started_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration: u32, start: &str, url: &str) -> PipelineRequest {
        PipelineRequest {
            source: PipelineSource::Url(url.to_string()),
            start_time: start.to_string(),
            duration_secs: duration,
            fps: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        let processing = ProcessingSettings::default();
        let req = request(5, "00:00:10", "https://example.com/v");
        assert!(req.validate(&processing).is_ok());
    }

    #[test]
    fn zero_duration_rejected() {
        let processing = ProcessingSettings::default();
        let err = request(0, "00:00:10", "https://example.com/v")
            .validate(&processing)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn excessive_duration_rejected() {
        let processing = ProcessingSettings::default();
        let err = request(processing.max_duration_secs + 1, "00:00:10", "https://e.com/v")
            .validate(&processing)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn malformed_timecode_rejected() {
        let processing = ProcessingSettings::default();
        for bad in ["0:00:10", "00:00", "00-00-10", "start", "000:00:10"] {
            let err = request(5, bad, "https://example.com/v")
                .validate(&processing)
                .unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)), "accepted {bad}");
        }
    }

    #[test]
    fn non_http_url_rejected() {
        let processing = ProcessingSettings::default();
        let err = request(5, "00:00:10", "ftp://example.com/v")
            .validate(&processing)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn missing_local_file_rejected() {
        let processing = ProcessingSettings::default();
        let req = PipelineRequest {
            source: PipelineSource::LocalFile(PathBuf::from("/nonexistent/video.mp4")),
            start_time: "00:00:00".to_string(),
            duration_secs: 5,
            fps: None,
        };
        assert!(matches!(
            req.validate(&processing).unwrap_err(),
            PipelineError::Validation(_)
        ));
    }
}
