//! Configuration: settings structure and file management.
//!
//! Settings are stored in a TOML file organized into sections. Every
//! field can be overridden through `P3D_*` environment variables so a
//! deployment can run without touching the file.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ApiSettings, AuthSettings, LoggingSettings, PathSettings, ProcessingSettings, Settings,
    ToolSettings,
};
