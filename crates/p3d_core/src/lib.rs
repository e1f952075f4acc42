//! p3d core - video-to-3D photogrammetry pipeline orchestration
//!
//! This crate contains the pipeline core with no UI or HTTP dependencies:
//! configuration, audit logging, external process execution, workspace
//! management, dependency checks, the staged pipeline orchestrator, and
//! the fire-and-forget job launcher. An HTTP front end or CLI drives it
//! through [`jobs::JobLauncher`].

pub mod config;
pub mod deps;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod process;
pub mod workspace;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
