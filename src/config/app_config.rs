//! Server configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main server configuration, persisted as TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listening address
    pub bind_address: String,
    /// Server listening port
    pub port: u16,
    /// Root for sketches/, templates/, uploads/ and static/
    pub data_dir: PathBuf,
    /// Toolchain executable used for compile and upload
    pub toolchain_program: String,
    /// Maximum number of toolchain processes running at once
    pub max_concurrent_builds: usize,
    /// Staging workspaces older than this are swept (seconds)
    pub staging_retention_secs: u64,
    /// How often the staging sweeper runs (seconds)
    pub staging_sweep_interval_secs: u64,
    /// Baud rate used when a monitor opens a port
    pub default_baud_rate: u32,
    /// Idle poll interval of the serial read loop (milliseconds)
    pub serial_poll_interval_ms: u64,
    /// Timeout of a single OS-level serial read (milliseconds)
    pub serial_read_timeout_ms: u64,
    /// Base URL of the local Ollama server
    pub ollama_url: String,
    /// Model name sent with every generate request
    pub ollama_model: String,
    /// Timeout of the availability probe (seconds)
    pub ai_probe_timeout_secs: u64,
    /// Timeout of a generate request (seconds)
    pub ai_request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8001,
            data_dir: PathBuf::from("."),
            toolchain_program: "arduino-cli".to_string(),
            max_concurrent_builds: 2,
            staging_retention_secs: 3600,
            staging_sweep_interval_secs: 300,
            default_baud_rate: 9600,
            serial_poll_interval_ms: 20,
            serial_read_timeout_ms: 10,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "codellama".to_string(),
            ai_probe_timeout_secs: 5,
            ai_request_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults when it is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Serialize to TOML and write to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config to TOML: {}", e))?;
        std::fs::write(path, toml_content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Per-user configuration file location (`~/.config/sketchbrew/sketchbrew-server.toml`)
    pub fn user_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sketchbrew")
            .join("sketchbrew-server.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_builds == 0 {
            anyhow::bail!("max_concurrent_builds must be at least 1");
        }
        if self.serial_poll_interval_ms == 0 {
            anyhow::bail!("serial_poll_interval_ms must be at least 1");
        }
        if self.default_baud_rate == 0 {
            anyhow::bail!("default_baud_rate must be positive");
        }
        Ok(())
    }

    pub fn sketches_dir(&self) -> PathBuf {
        self.data_dir.join("sketches")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.data_dir.join("static")
    }

    pub fn serial_poll_interval(&self) -> Duration {
        Duration::from_millis(self.serial_poll_interval_ms)
    }

    pub fn serial_read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_read_timeout_ms)
    }

    pub fn staging_retention(&self) -> Duration {
        Duration::from_secs(self.staging_retention_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ServerConfig = toml::from_str("port = 9000\ntoolchain_program = \"/opt/arduino-cli\"\n")
            .expect("partial config should parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.toolchain_program, "/opt/arduino-cli");
        assert_eq!(config.default_baud_rate, 9600);
        assert_eq!(config.max_concurrent_builds, 2);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("server.toml");

        let mut config = ServerConfig::default();
        config.ollama_model = "deepseek-coder".to_string();
        config.save(&path).unwrap();

        let loaded = ServerConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.ollama_model, "deepseek-coder");
        assert_eq!(loaded.port, config.port);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_validate_rejects_zero_build_slots() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());
        config.max_concurrent_builds = 0;
        assert!(config.validate().is_err());
    }
}
