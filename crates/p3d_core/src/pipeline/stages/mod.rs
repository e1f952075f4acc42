//! Stage executors for the standard pipeline.

mod dependencies;
mod download;
mod exports;
mod frames;
mod reconstruct;

pub use dependencies::DependencyCheckStage;
pub use download::DownloadStage;
pub use exports::{collect_exports, CollectExportsStage};
pub use frames::ExtractFramesStage;
pub use reconstruct::{ReconstructStage, MIN_RECONSTRUCTION_FRAMES};
