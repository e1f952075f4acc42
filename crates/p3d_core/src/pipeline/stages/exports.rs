//! Export-collection stage.
//!
//! Scans the reconstruction output for supported model formats in
//! priority order and copies each match into the shared export
//! directory under a timestamp-qualified name, so repeated runs never
//! overwrite earlier artifacts. An empty or absent output tree is a
//! warning, not an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::models::ExportArtifact;
use crate::pipeline::context::{Context, JobState};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::state::PipelineState;
use crate::workspace::Workspace;

pub struct CollectExportsStage;

impl PipelineStage for CollectExportsStage {
    fn name(&self) -> &'static str {
        "CollectExports"
    }

    fn state(&self) -> PipelineState {
        PipelineState::CollectingExports
    }

    fn validate_input(&self, _ctx: &Context, _state: &JobState) -> PipelineResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<()> {
        state.exports = collect_exports(&ctx.workspace, &ctx.settings.processing.export_formats)?;
        Ok(())
    }
}

/// Collect qualifying model files from the reconstruction output.
///
/// Returns the artifact handles for every copied file, in format
/// priority order.
pub fn collect_exports(
    workspace: &Workspace,
    formats: &[String],
) -> PipelineResult<Vec<ExportArtifact>> {
    let output_dir = &workspace.output_dir;
    if !output_dir.exists() || dir_is_empty(output_dir)? {
        tracing::warn!("no output files found from reconstruction");
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for ext in formats {
        let mut matches = Vec::new();
        find_files_with_extension(output_dir, ext, &mut matches)
            .map_err(|e| PipelineError::other(format!("export collection failed: {e}")))?;
        matches.sort();
        for file in matches {
            artifacts.push(copy_export(workspace, &file, ext)?);
        }
    }

    if artifacts.is_empty() {
        tracing::warn!("no exportable files found in reconstruction output");
    }
    Ok(artifacts)
}

fn copy_export(workspace: &Workspace, file: &Path, ext: &str) -> PipelineResult<ExportArtifact> {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "model".to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S%3f");

    let mut destination = workspace.export_dir.join(format!("{stem}_{stamp}{ext}"));
    let mut suffix = 1;
    while destination.exists() {
        destination = workspace
            .export_dir
            .join(format!("{stem}_{stamp}_{suffix}{ext}"));
        suffix += 1;
    }

    fs::copy(file, &destination).map_err(|e| {
        PipelineError::other(format!(
            "export collection failed copying {}: {e}",
            file.display()
        ))
    })?;

    tracing::info!(
        "exported {} to {}",
        file.display(),
        destination.display()
    );

    Ok(ExportArtifact {
        path: destination,
        format: ext.trim_start_matches('.').to_string(),
        created_at: Local::now(),
    })
}

fn dir_is_empty(dir: &Path) -> PipelineResult<bool> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| PipelineError::other(format!("export collection failed: {e}")))?;
    Ok(entries.next().is_none())
}

fn find_files_with_extension(dir: &Path, ext: &str, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            find_files_with_extension(&path, ext, out)?;
        } else if path.file_name().is_some_and(|n| n.to_string_lossy().ends_with(ext)) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::tempdir;

    fn test_workspace(root: &Path) -> Workspace {
        let mut settings = Settings::default();
        settings.paths.base_dir = root.join("base");
        settings.paths.export_dir = root.join("exports");
        settings.paths.logs_dir = root.join("logs");
        let ws = Workspace::for_job(&settings, "job_exports");
        ws.ensure().unwrap();
        ws
    }

    fn formats() -> Vec<String> {
        Settings::default().processing.export_formats
    }

    #[test]
    fn empty_output_yields_empty_list() {
        let dir = tempdir().unwrap();
        let ws = test_workspace(dir.path());
        // Output dir exists but only holds the empty cache dir tree
        fs::remove_dir_all(&ws.output_dir).unwrap();
        fs::create_dir_all(&ws.output_dir).unwrap();

        let artifacts = collect_exports(&ws, &formats()).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn absent_output_yields_empty_list() {
        let dir = tempdir().unwrap();
        let ws = test_workspace(dir.path());
        fs::remove_dir_all(&ws.output_dir).unwrap();

        let artifacts = collect_exports(&ws, &formats()).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn collects_nested_matches_in_priority_order() {
        let dir = tempdir().unwrap();
        let ws = test_workspace(dir.path());
        let nested = ws.output_dir.join("texturing");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("mesh.ply"), b"ply").unwrap();
        fs::write(ws.output_dir.join("mesh.obj"), b"obj").unwrap();
        fs::write(ws.output_dir.join("notes.txt"), b"skip").unwrap();

        let artifacts = collect_exports(&ws, &formats()).unwrap();

        assert_eq!(artifacts.len(), 2);
        // .obj has higher priority than .ply
        assert_eq!(artifacts[0].format, "obj");
        assert_eq!(artifacts[1].format, "ply");
        for artifact in &artifacts {
            assert!(artifact.path.exists());
            assert!(artifact.path.starts_with(&ws.export_dir));
        }
    }

    #[test]
    fn repeated_collection_never_collides() {
        let dir = tempdir().unwrap();
        let ws = test_workspace(dir.path());
        fs::write(ws.output_dir.join("mesh.obj"), b"obj").unwrap();

        let first = collect_exports(&ws, &formats()).unwrap();
        let second = collect_exports(&ws, &formats()).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].path, second[0].path);
        assert!(first[0].path.exists());
        assert!(second[0].path.exists());
    }
}
