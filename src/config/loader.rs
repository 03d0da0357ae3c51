use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use super::types::GlobalConfig;

const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./cctvscan.toml",
    "./config/cctvscan.toml",
    "~/.config/cctvscan/cctvscan.toml",
    "/etc/cctvscan/cctvscan.toml",
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration, trying `custom_path` before the default locations
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<GlobalConfig> {
        if let Some(path) = custom_path {
            if path.exists() {
                return Self::load_from_file(path)
                    .with_context(|| format!("Failed to load config from custom path: {:?}", path));
            }
            tracing::warn!("Custom config path does not exist: {:?}, falling back to defaults", path);
        }

        for default_path in DEFAULT_CONFIG_PATHS {
            let path = Self::expand_path(default_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {:#}", path, e);
                        continue;
                    }
                }
            }
        }

        tracing::info!("No configuration file found, using default settings");
        Ok(GlobalConfig::default())
    }

    fn load_from_file(path: &Path) -> Result<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {:?}", path))?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    pub fn validate_config(config: &GlobalConfig) -> Result<()> {
        let c = &config.concurrency;
        for (name, value) in [
            ("max_hosts", c.max_hosts),
            ("login_probe", c.login_probe),
            ("mjpeg_ports", c.mjpeg_ports),
            ("mjpeg_paths", c.mjpeg_paths),
            ("credential_trials", c.credential_trials),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if config.discovery.rate == 0 {
            anyhow::bail!("discovery rate must be greater than 0");
        }

        if config.discovery.masscan_command.trim().is_empty() {
            anyhow::bail!("masscan command cannot be empty");
        }

        if config.probes.snippet_bytes == 0 {
            anyhow::bail!("snippet_bytes must be greater than 0");
        }

        Ok(())
    }

    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(path)
    }
}
