//! External tool presence checks and optional installation.
//!
//! The downloader and transcoder can be installed through the host
//! package manager; the reconstruction binary is operator-provided and
//! only ever verified.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ToolSettings;
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::process::ProcessRunner;

/// Locate an executable.
///
/// A path containing a separator is checked directly; a bare name is
/// searched on `PATH`. Returns the resolved path when present and
/// executable.
pub fn locate(tool: &str) -> Option<PathBuf> {
    let as_path = Path::new(tool);
    if as_path.components().count() > 1 {
        return is_executable_file(as_path).then(|| as_path.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable_file(candidate))
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Check presence of every required external tool.
///
/// Keys are the configured tool names; values are whether the tool
/// resolved to an executable.
pub fn check_all(tools: &ToolSettings) -> BTreeMap<String, bool> {
    let mut statuses = BTreeMap::new();
    statuses.insert(tools.downloader.clone(), locate(&tools.downloader).is_some());
    statuses.insert(tools.ffmpeg.clone(), locate(&tools.ffmpeg).is_some());
    statuses.insert(
        tools.meshroom_bin.clone(),
        locate(&tools.meshroom_bin).is_some(),
    );
    statuses
}

/// Install missing downloader/transcoder tools through the runner.
///
/// The reconstruction binary is never auto-installed; its absence is a
/// `DependencyError`.
pub fn install_missing(tools: &ToolSettings, runner: &dyn ProcessRunner) -> PipelineResult<()> {
    let statuses = check_all(tools);
    if statuses.values().all(|present| *present) {
        tracing::info!("all dependencies are already installed");
        return Ok(());
    }

    if !statuses.get(&tools.ffmpeg).copied().unwrap_or(false) {
        tracing::info!("installing {}", tools.ffmpeg);
        run_install(runner, &["sudo", "apt-get", "update"])?;
        run_install(runner, &["sudo", "apt-get", "install", "-y", &tools.ffmpeg])?;
    }

    if !statuses.get(&tools.downloader).copied().unwrap_or(false) {
        tracing::info!("installing {}", tools.downloader);
        run_install(
            runner,
            &["python3", "-m", "pip", "install", "--upgrade", &tools.downloader],
        )?;
    }

    if locate(&tools.meshroom_bin).is_none() {
        tracing::error!(
            "reconstruction binary not found at {}",
            tools.meshroom_bin
        );
        return Err(PipelineError::dependency(format!(
            "reconstruction binary not found at {}; install it manually",
            tools.meshroom_bin
        )));
    }

    tracing::info!("dependencies installed successfully");
    Ok(())
}

fn run_install(runner: &dyn ProcessRunner, argv: &[&str]) -> PipelineResult<()> {
    let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
    runner
        .run(&argv, None)
        .map_err(|e| PipelineError::dependency(format!("dependency installation failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_sh_on_path() {
        assert!(locate("sh").is_some());
    }

    #[test]
    fn locates_absolute_path() {
        assert!(locate("/bin/sh").is_some());
    }

    #[test]
    fn missing_tool_not_located() {
        assert!(locate("p3d-definitely-missing-tool").is_none());
        assert!(locate("/nonexistent/meshroom_batch").is_none());
    }

    #[test]
    fn check_all_reports_each_tool() {
        let tools = ToolSettings {
            downloader: "sh".to_string(),
            fallback_downloader: "sh".to_string(),
            ffmpeg: "sh".to_string(),
            meshroom_bin: "/nonexistent/meshroom_batch".to_string(),
        };
        let statuses = check_all(&tools);
        assert_eq!(statuses.get("sh"), Some(&true));
        assert_eq!(statuses.get("/nonexistent/meshroom_batch"), Some(&false));
    }
}
