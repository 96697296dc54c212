//! Configuration management for rollama.
//!
//! Configuration is loaded from `~/.config/rollama/config.toml`. Every key is
//! optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the inference daemon.
    #[serde(default = "default_host")]
    pub host: String,
    /// How the daemon process is started and stopped.
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            host: default_host(),
            daemon: DaemonConfig::default(),
        }
    }
}

/// Daemon supervision settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Daemon executable, resolved on `PATH`.
    #[serde(default = "default_program")]
    pub program: String,
    /// Executable used to force-stop the daemon by name.
    #[serde(default = "default_kill_program")]
    pub kill_program: String,
    /// Delay after spawning before the first request is sent.
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            kill_program: default_kill_program(),
            warmup_ms: default_warmup_ms(),
        }
    }
}

impl DaemonConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

fn default_model() -> String {
    "qwen3:8b".to_string()
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_program() -> String {
    "ollama".to_string()
}

fn default_kill_program() -> String {
    "killall".to_string()
}

fn default_warmup_ms() -> u64 {
    1000
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("rollama"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, using defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, using defaults if not found.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Full URL of the streaming generation endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.host.trim_end_matches('/'))
    }
}
