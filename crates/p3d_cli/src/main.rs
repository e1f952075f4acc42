//! Command-line front end for the p3d pipeline.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use p3d_core::config::ConfigManager;
use p3d_core::deps;
use p3d_core::jobs::JobLauncher;
use p3d_core::logging;
use p3d_core::models::{PipelineRequest, PipelineSource};
use p3d_core::process::SystemRunner;

#[derive(Parser)]
#[command(name = "p3d", version, about = "Video-to-3D photogrammetry pipeline")]
struct Cli {
    /// Config file path (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for one video segment.
    Run {
        /// Video URL to download.
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Local video file to use instead of a URL.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Segment start as HH:MM:SS.
        #[arg(long, default_value = "00:00:00")]
        start: String,

        /// Segment duration in seconds.
        #[arg(long, default_value_t = 10)]
        duration: u32,

        /// Frame extraction rate (frames per second).
        #[arg(long)]
        fps: Option<u32>,

        /// Print collected artifacts as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check external tool availability.
    Deps {
        /// Attempt to install missing installable tools.
        #[arg(long)]
        install: bool,
    },

    /// List collected export artifacts.
    Exports,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ConfigManager::default_path);
    let mut manager = ConfigManager::new(&config_path);
    manager
        .load_or_create()
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    manager.settings_mut().apply_env_overrides();
    let settings = manager.settings().clone();

    let _guard = logging::init(&settings).context("initializing logging")?;

    match cli.command {
        Command::Run {
            url,
            file,
            start,
            duration,
            fps,
            json,
        } => {
            let source = match (url, file) {
                (Some(url), None) => PipelineSource::Url(url),
                (None, Some(path)) => PipelineSource::LocalFile(path),
                _ => anyhow::bail!("provide either a URL or --file"),
            };
            let request = PipelineRequest {
                source,
                start_time: start,
                duration_secs: duration,
                fps,
            };

            let runner = std::sync::Arc::new(SystemRunner::new());
            let (launcher, _outcomes) = JobLauncher::new(settings, runner);
            tracing::info!(duration_secs = request.duration_secs, "running pipeline");
            let artifacts = launcher.run_blocking(request)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
            } else if artifacts.is_empty() {
                println!("pipeline completed but produced no export artifacts");
            } else {
                println!("exported {} artifact(s):", artifacts.len());
                for artifact in artifacts {
                    println!("  [{}] {}", artifact.format, artifact.path.display());
                }
            }
        }

        Command::Deps { install } => {
            let statuses = deps::check_all(&settings.tools);
            for (tool, present) in &statuses {
                println!("{}: {}", tool, if *present { "ok" } else { "missing" });
            }
            if install && statuses.values().any(|present| !present) {
                let runner = SystemRunner::new();
                deps::install_missing(&settings.tools, &runner)?;
                println!("installation finished");
            }
        }

        Command::Exports => {
            let export_dir = &settings.paths.export_dir;
            if !export_dir.exists() {
                println!("no exports yet ({} does not exist)", export_dir.display());
                return Ok(());
            }
            let mut entries: Vec<PathBuf> = std::fs::read_dir(export_dir)
                .with_context(|| format!("reading {}", export_dir.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file())
                .collect();
            entries.sort();
            if entries.is_empty() {
                println!("no exports yet");
            }
            for path in entries {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
