//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides
//! (spec §6.4).

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mediator_core::{AudioFormat, BootstrapConfig, SessionMode};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the combined WS + HTTP server.
    /// Override: `MEDIATOR_HOST`
    pub host: IpAddr,

    /// Bind port for the combined WS + HTTP server.
    /// Override: `MEDIATOR_PORT`
    pub port: u16,

    /// `local` (gate open) or `remote` (gate closed until webhook).
    /// Override: `MEDIATOR_MODE`
    pub mode: SessionMode,

    /// Selects which Provider Adapter to instantiate.
    /// Override: `MEDIATOR_PROVIDER_ID`
    pub provider_id: String,

    /// Credential for the selected provider, if it requires one.
    /// Override: `MEDIATOR_PROVIDER_API_KEY`
    pub provider_api_key: Option<String>,

    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bit_depth: u16,

    /// Enables the WAV recording writer; `recording_dir` is its destination.
    pub recording_enabled: bool,
    pub recording_dir: Option<PathBuf>,

    /// Enables the transcript journal; `transcript_dir` is its destination.
    pub transcript_logging_enabled: bool,
    pub transcript_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".parse().unwrap(),
            port: 4040,
            mode: SessionMode::Local,
            provider_id: "mock".into(),
            provider_api_key: None,
            sample_rate_hz: 16_000,
            channels: 1,
            bit_depth: 16,
            recording_enabled: false,
            recording_dir: None,
            transcript_logging_enabled: true,
            transcript_dir: PathBuf::from("./transcripts"),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEDIATOR_HOST") {
            if let Ok(host) = val.parse() {
                self.host = host;
            }
        }
        if let Ok(val) = std::env::var("MEDIATOR_PORT") {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }
        if let Ok(val) = std::env::var("MEDIATOR_MODE") {
            match val.to_lowercase().as_str() {
                "local" => self.mode = SessionMode::Local,
                "remote" => self.mode = SessionMode::Remote,
                other => log::warn!("Ignoring unrecognized MEDIATOR_MODE value: {other}"),
            }
        }
        if let Ok(val) = std::env::var("MEDIATOR_PROVIDER_ID") {
            self.provider_id = val;
        }
        if let Ok(val) = std::env::var("MEDIATOR_PROVIDER_API_KEY") {
            self.provider_api_key = Some(val);
        }

        // Note: MEDIATOR_DATA_DIR-style overrides for recording/transcript
        // directories are handled by clap via #[arg(env = ...)] in main.rs.
    }

    /// Converts to mediator-core's `BootstrapConfig`.
    pub fn to_bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            host: self.host.to_string(),
            port: self.port,
            mode: self.mode,
            provider_id: self.provider_id.clone(),
            provider_api_key: self.provider_api_key.clone(),
            audio_format: AudioFormat {
                sample_rate_hz: self.sample_rate_hz,
                channels: self.channels,
                bit_depth: self.bit_depth,
            },
            transcript_root: self.transcript_dir.clone(),
            transcript_logging_enabled: self.transcript_logging_enabled,
            recording_dir: if self.recording_enabled {
                Some(self.recording_dir.clone().unwrap_or_else(|| PathBuf::from("./recordings")))
            } else {
                None
            },
        }
    }
}
