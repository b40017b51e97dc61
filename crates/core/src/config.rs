//! Layered application configuration.
//!
//! Values come from built-in defaults, then `<config_dir>/campus/config.toml`,
//! then `CAMPUS_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Directory under the platform config dir holding all console state.
pub const APP_DIR: &str = "campus";

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

const DEFAULT_CONFIG: &str = r#"# Campus console configuration.
# Every key can also be set through a CAMPUS_<KEY> environment variable.

# Root of the school records REST API.
api_base_url = "http://localhost:8000/api"

# Rows shown per list page.
page_size = 10

# Seconds a notification stays on screen.
toast_seconds = 4

# Per-request timeout in seconds.
request_timeout_secs = 15

# Screen opened after login.
start_page = "/dashboard/students"
"#;

/// Runtime configuration for the console.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// File holding the persisted session token.
    pub session_file: PathBuf,
    /// Rows per list page.
    pub page_size: usize,
    /// Seconds a toast stays visible.
    pub toast_seconds: u64,
    /// Timeout applied to every HTTP request.
    pub request_timeout_secs: u64,
    /// Route shown after a successful login.
    pub start_page: String,
}

impl AppConfig {
    /// Load configuration from the default file location plus environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration using `path` as the optional TOML layer.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let session_file = app_dir().join("session.json");
        let settings = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("session_file", session_file.to_string_lossy().to_string())?
            .set_default("page_size", 10_i64)?
            .set_default("toast_seconds", 4_i64)?
            .set_default("request_timeout_secs", 15_i64)?
            .set_default("start_page", "/dashboard/students")?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("CAMPUS"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration values")?;
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Timeout applied to each request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// How long a notification is shown.
    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.api_base_url.is_empty() {
            bail!("api_base_url must not be empty");
        }
        Ok(())
    }
}

/// Directory holding config and session files.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the TOML configuration file.
pub fn config_path() -> PathBuf {
    app_dir().join("config.toml")
}

/// Write the commented default configuration if no file exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_loads_with_expected_values() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.toast_duration(), Duration::from_secs(4));
        assert_eq!(config.start_page, "/dashboard/students");
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"https://school.example.com/api/\"\npage_size = 25\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api_base_url, "https://school.example.com/api");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        Ok(())
    }

    #[test]
    fn rejects_zero_page_size() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = 0\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn existing_config_is_not_overwritten() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = 3\n")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "page_size = 3\n");
        Ok(())
    }
}
