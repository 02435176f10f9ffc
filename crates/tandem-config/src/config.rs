//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const FILE_NAME: &str = "config.ron";

/// Top-level session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Peer connection and role settings.
    pub network: NetworkConfig,
    /// Frame loop settings.
    pub game: GameConfig,
    /// Local display, reported to the peer in the handshake.
    pub display: DisplayConfig,
    /// Logging and diagnostics.
    pub debug: DebugConfig,
}

/// Peer connection and role settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Explicit role: `Some(true)` authority, `Some(false)` replica. `None`
    /// infers the role from `rendezvous_address`.
    pub authority: Option<bool>,
    /// Address of the authority. The peer that owns this address becomes the
    /// authority; the other one connects to it.
    pub rendezvous_address: Option<String>,
    /// This host's addresses for role inference. Empty means probe the host.
    pub local_addresses: Vec<String>,
    /// TCP port shared by both peers.
    pub port: u16,
    /// Address the authority listens on.
    pub bind_address: String,
    /// Pause between connection attempts, in milliseconds.
    pub connect_retry_ms: u64,
    /// Exchange display resolutions before the first frame. Both peers must
    /// use the same setting.
    pub exchange_display: bool,
}

/// Frame loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Minimum time between frames in milliseconds; 0 runs as fast as the
    /// peer exchange allows.
    pub frame_interval_ms: u64,
    /// Drive the local paddle toward the ball instead of waiting for input.
    pub autopilot: bool,
}

/// Local display resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

/// Logging and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. "info", "debug,tandem_net=trace").
    pub log_level: String,
    /// Log frame timing and ball speed once per second.
    pub show_stats: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            authority: None,
            rendezvous_address: None,
            local_addresses: Vec::new(),
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            connect_retry_ms: 1000,
            exchange_display: false,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            autopilot: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            show_stats: false,
        }
    }
}

impl Config {
    /// Path of the config file inside `config_dir`.
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(FILE_NAME)
    }

    /// Load config from the given directory, or write and return the defaults
    /// if there is no file yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_path(config_dir);
        if path.exists() {
            let config = Self::read(&path)?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let path = Self::file_path(config_dir);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, serialized).map_err(|source| ConfigError::Write { path, source })
    }

    /// Re-read the file: `Some(new_config)` if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&Self::file_path(config_dir))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
