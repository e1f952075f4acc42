//! Pipeline state machine and stage timing records.

use std::fmt;
use std::time::Duration;

/// States of one pipeline run.
///
/// Transitions are strictly sequential through the stage order;
/// `Failed` absorbs from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    DependencyCheck,
    Downloading,
    ExtractingFrames,
    Reconstructing,
    CollectingExports,
    Completed,
    Failed,
}

impl PipelineState {
    /// Whether this state ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::DependencyCheck => "DependencyCheck",
            Self::Downloading => "Downloading",
            Self::ExtractingFrames => "ExtractingFrames",
            Self::Reconstructing => "Reconstructing",
            Self::CollectingExports => "CollectingExports",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Elapsed time of one completed stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Created.is_terminal());
        assert!(!PipelineState::Reconstructing.is_terminal());
    }

    #[test]
    fn display_names() {
        assert_eq!(PipelineState::ExtractingFrames.to_string(), "ExtractingFrames");
        assert_eq!(PipelineState::CollectingExports.to_string(), "CollectingExports");
    }
}
