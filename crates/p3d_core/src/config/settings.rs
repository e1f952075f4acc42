//! Settings struct with TOML-based sections.
//!
//! Sections map to TOML tables; missing fields fall back to defaults so
//! a partial config file stays valid. The `[api]` and `[auth]` sections
//! exist for the external HTTP collaborator - the pipeline core itself
//! only reads paths, tools, processing, and logging.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory layout.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool names and paths.
    #[serde(default)]
    pub tools: ToolSettings,

    /// HTTP API binding (consumed by the external API collaborator).
    #[serde(default)]
    pub api: ApiSettings,

    /// Token issuance and admin credentials (external collaborator).
    #[serde(default)]
    pub auth: AuthSettings,

    /// Pipeline processing limits and defaults.
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// Audit log configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            tools: ToolSettings::default(),
            api: ApiSettings::default(),
            auth: AuthSettings::default(),
            processing: ProcessingSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn home_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Directory layout for working files, exports, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Base directory; per-job workspaces live under `<base>/jobs/`.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Directory collected 3D model artifacts are copied into.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Directory for the rotating audit log.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

fn default_base_dir() -> PathBuf {
    home_dir().join("parachute_3d_project")
}

fn default_export_dir() -> PathBuf {
    home_dir().join("3d_exports")
}

fn default_logs_dir() -> PathBuf {
    default_base_dir().join("logs")
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            export_dir: default_export_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// External executables the pipeline invokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Primary video downloader.
    #[serde(default = "default_downloader")]
    pub downloader: String,

    /// Secondary downloader tried when the primary fails.
    #[serde(default = "default_fallback_downloader")]
    pub fallback_downloader: String,

    /// Transcoder used for trimming and frame extraction.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Photogrammetry reconstruction binary. Never auto-installed; the
    /// operator must provide it.
    #[serde(default = "default_meshroom_bin")]
    pub meshroom_bin: String,
}

fn default_downloader() -> String {
    "yt-dlp".to_string()
}

fn default_fallback_downloader() -> String {
    "youtube-dl".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_meshroom_bin() -> String {
    "/usr/local/bin/meshroom_batch".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            downloader: default_downloader(),
            fallback_downloader: default_fallback_downloader(),
            ffmpeg: default_ffmpeg(),
            meshroom_bin: default_meshroom_bin(),
        }
    }
}

/// HTTP API binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    #[serde(default = "default_api_workers")]
    pub workers: u32,

    #[serde(default)]
    pub debug: bool,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_api_workers() -> u32 {
    4
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            workers: default_api_workers(),
            debug: false,
        }
    }
}

/// Bearer token issuance and admin credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Token signing secret. Change in production.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Token signing algorithm.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Token lifetime in minutes.
    #[serde(default = "default_token_expire_minutes")]
    pub access_token_expire_minutes: u32,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_secret_key() -> String {
    "change-me".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_expire_minutes() -> u32 {
    30
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            algorithm: default_algorithm(),
            access_token_expire_minutes: default_token_expire_minutes(),
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
        }
    }
}

/// Pipeline processing limits and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Default frame extraction rate.
    #[serde(default = "default_fps")]
    pub default_fps: u32,

    /// Maximum segment duration in seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u32,

    /// Supported export extensions in collection priority order.
    #[serde(default = "default_export_formats")]
    pub export_formats: Vec<String>,

    /// Attempt to install missing downloader/transcoder tools via the
    /// host package manager during the dependency-check stage.
    #[serde(default)]
    pub auto_install_deps: bool,
}

fn default_fps() -> u32 {
    10
}

fn default_max_duration() -> u32 {
    300
}

fn default_export_formats() -> Vec<String> {
    [".obj", ".stl", ".glb", ".ply"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            default_fps: default_fps(),
            max_duration_secs: default_max_duration(),
            export_formats: default_export_formats(),
            auto_install_deps: false,
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Days to keep rotated audit log files.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

fn default_retention_days() -> u32 {
    7
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            default_filter: default_filter(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Apply `P3D_*` environment variable overrides in place.
    ///
    /// Unset or unparseable values leave the existing setting untouched.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_string("P3D_BASE_DIR") {
            self.paths.base_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("P3D_EXPORT_DIR") {
            self.paths.export_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("P3D_LOGS_DIR") {
            self.paths.logs_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("P3D_DOWNLOADER") {
            self.tools.downloader = v;
        }
        if let Some(v) = env_string("P3D_FALLBACK_DOWNLOADER") {
            self.tools.fallback_downloader = v;
        }
        if let Some(v) = env_string("P3D_FFMPEG") {
            self.tools.ffmpeg = v;
        }
        if let Some(v) = env_string("P3D_MESHROOM_BIN") {
            self.tools.meshroom_bin = v;
        }
        if let Some(v) = env_string("P3D_API_HOST") {
            self.api.host = v;
        }
        if let Some(v) = env_string("P3D_API_PORT").and_then(|v| v.parse().ok()) {
            self.api.port = v;
        }
        if let Some(v) = env_string("P3D_API_WORKERS").and_then(|v| v.parse().ok()) {
            self.api.workers = v;
        }
        if let Some(v) = env_string("P3D_SECRET_KEY") {
            self.auth.secret_key = v;
        }
        if let Some(v) = env_string("P3D_TOKEN_ALGORITHM") {
            self.auth.algorithm = v;
        }
        if let Some(v) = env_string("P3D_TOKEN_EXPIRE_MINUTES").and_then(|v| v.parse().ok()) {
            self.auth.access_token_expire_minutes = v;
        }
        if let Some(v) = env_string("P3D_ADMIN_USERNAME") {
            self.auth.admin_username = v;
        }
        if let Some(v) = env_string("P3D_ADMIN_PASSWORD") {
            self.auth.admin_password = v;
        }
        if let Some(v) = env_string("P3D_DEFAULT_FPS").and_then(|v| v.parse().ok()) {
            self.processing.default_fps = v;
        }
        if let Some(v) = env_string("P3D_MAX_DURATION").and_then(|v| v.parse().ok()) {
            self.processing.max_duration_secs = v;
        }
        if let Some(v) = env_string("P3D_EXPORT_FORMATS") {
            self.processing.export_formats = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = env_string("P3D_AUTO_INSTALL_DEPS").and_then(|v| v.parse().ok()) {
            self.processing.auto_install_deps = v;
        }
        if let Some(v) = env_string("P3D_LOG_RETENTION_DAYS").and_then(|v| v.parse().ok()) {
            self.logging.retention_days = v;
        }
        if let Some(v) = env_string("P3D_LOG_FILTER") {
            self.logging.default_filter = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[tools]"));
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("meshroom_bin"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.tools.downloader, settings.tools.downloader);
        assert_eq!(
            parsed.processing.max_duration_secs,
            settings.processing.max_duration_secs
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[tools]\ndownloader = \"custom-dl\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.tools.downloader, "custom-dl");
        // Defaults applied for missing
        assert_eq!(parsed.tools.ffmpeg, "ffmpeg");
        assert_eq!(parsed.processing.default_fps, 10);
        assert_eq!(parsed.processing.max_duration_secs, 300);
        assert_eq!(
            parsed.processing.export_formats,
            vec![".obj", ".stl", ".glb", ".ply"]
        );
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = Settings::default();
        env::set_var("P3D_MAX_DURATION", "120");
        env::set_var("P3D_MESHROOM_BIN", "/opt/meshroom/meshroom_batch");
        env::set_var("P3D_API_PORT", "not-a-number");
        settings.apply_env_overrides();
        env::remove_var("P3D_MAX_DURATION");
        env::remove_var("P3D_MESHROOM_BIN");
        env::remove_var("P3D_API_PORT");

        assert_eq!(settings.processing.max_duration_secs, 120);
        assert_eq!(settings.tools.meshroom_bin, "/opt/meshroom/meshroom_batch");
        // Unparseable override is ignored
        assert_eq!(settings.api.port, 8000);
    }
}
