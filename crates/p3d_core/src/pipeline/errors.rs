//! Error taxonomy for the pipeline - one kind per concern.
//!
//! Stage-local failures are logged with context and surfaced as the
//! stage's specific kind; the orchestrator never wraps them further, so
//! the originating kind reaches the caller unchanged.

use thiserror::Error;

/// Pipeline error, one variant per pipeline concern.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad request shape (duration, timecode, URL).
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Missing or uninstallable external tool.
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// Workspace directory unusable.
    #[error("Filesystem error: {0}")]
    FileSystem(String),

    /// Video download or segment trim failed.
    #[error("Video download failed: {0}")]
    Download(String),

    /// Frame extraction produced nothing or the transcoder failed.
    #[error("Frame extraction failed: {0}")]
    FrameExtraction(String),

    /// Reconstruction preconditions unmet or the binary failed.
    #[error("Reconstruction failed: {0}")]
    Meshroom(String),

    /// Export collection or orchestration-level failure.
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency(message.into())
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::FileSystem(message.into())
    }

    pub fn download(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    pub fn frame_extraction(message: impl Into<String>) -> Self {
        Self::FrameExtraction(message.into())
    }

    pub fn meshroom(message: impl Into<String>) -> Self {
        Self::Meshroom(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Short kind name for audit lines and outcome reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Dependency(_) => "dependency",
            Self::FileSystem(_) => "filesystem",
            Self::Download(_) => "download",
            Self::FrameExtraction(_) => "frame_extraction",
            Self::Meshroom(_) => "meshroom",
            Self::Other(_) => "pipeline",
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_concern_and_message() {
        let err = PipelineError::download("both yt-dlp and youtube-dl failed");
        let msg = err.to_string();
        assert!(msg.contains("Video download failed"));
        assert!(msg.contains("yt-dlp"));
    }

    #[test]
    fn kind_maps_variants() {
        assert_eq!(PipelineError::validation("x").kind(), "validation");
        assert_eq!(PipelineError::meshroom("x").kind(), "meshroom");
        assert_eq!(PipelineError::other("x").kind(), "pipeline");
    }
}
