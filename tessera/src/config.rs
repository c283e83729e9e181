//! Server configuration: dotted-key properties text.
//!
//! Missing keys fall back to their defaults; an absent file is created
//! with the default contents so operators have something to edit.

use std::fs;
use std::path::Path;

use thiserror::Error;

const DEFAULT_CONFIG_STR: &str = include_str!("default_server.properties");

/// An error encountered while loading or validating the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or created.
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    /// A line was not `key=value`.
    #[error("malformed line {0}: {1:?}")]
    MalformedLine(usize, String),
    /// A value failed to parse for its key.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// The unparsable value.
        value: String,
    },
    /// A value parsed but is outside its allowed range.
    #[error("{0}")]
    OutOfRange(String),
}

/// The server configuration record.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,
    /// Per-connection `GET_CHUNK` budget per wall-clock second.
    pub max_requests_per_second: u32,
    /// Names the `worlds/<name>/regions/` directory.
    pub world_name: String,
    /// Drives all terrain determinism.
    pub world_seed: i64,
    /// Absolute bound on accepted chunk coordinates.
    pub max_coordinate: i32,
    /// Advisory ceiling for the server chunk cache.
    pub server_max_chunks: usize,
    /// Used/total memory ratio that triggers emergency eviction.
    pub emergency_threshold: f64,
    /// Seconds between autosave passes.
    pub autosave_interval_seconds: u64,
    /// Chunk radius materialized around the origin at boot.
    pub spawn_warmup_radius: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7155,
            max_requests_per_second: 50,
            world_name: "world".to_string(),
            world_seed: 12345,
            max_coordinate: 1_000_000,
            server_max_chunks: 4096,
            emergency_threshold: 0.85,
            autosave_interval_seconds: 60,
            spawn_warmup_radius: 3,
        }
    }
}

impl Config {
    /// Loads the config at `path`, creating it with the defaults when
    /// absent.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let text = if path.exists() {
            fs::read_to_string(path)?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, DEFAULT_CONFIG_STR)?;
            log::info!("wrote default configuration to {}", path.display());
            DEFAULT_CONFIG_STR.to_string()
        };

        let config = Self::parse(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses properties text into a config, starting from defaults.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine(line_no + 1, raw.to_string()));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "server.port" => config.port = parse_value(key, value)?,
                "server.max_requests_per_second" => {
                    config.max_requests_per_second = parse_value(key, value)?;
                }
                "world.name" => config.world_name = value.to_string(),
                "world.seed" => config.world_seed = parse_value(key, value)?,
                "world.max_coordinate" => config.max_coordinate = parse_value(key, value)?,
                "world.spawn_warmup_radius" => {
                    config.spawn_warmup_radius = parse_value(key, value)?;
                }
                "memory.server_max_chunks" => {
                    config.server_max_chunks = parse_value(key, value)?;
                }
                "memory.emergency_threshold" => {
                    config.emergency_threshold = parse_value(key, value)?;
                }
                "persistence.autosave_interval_seconds" => {
                    config.autosave_interval_seconds = parse_value(key, value)?;
                }
                _ => log::warn!("ignoring unknown config key {key:?}"),
            }
        }

        Ok(config)
    }

    /// Checks every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests_per_second == 0 {
            return Err(ConfigError::OutOfRange(
                "server.max_requests_per_second must be greater than 0".to_string(),
            ));
        }
        if self.world_name.is_empty() || self.world_name.contains(['/', '\\']) {
            return Err(ConfigError::OutOfRange(
                "world.name must be a plain directory name".to_string(),
            ));
        }
        if self.max_coordinate <= 0 {
            return Err(ConfigError::OutOfRange(
                "world.max_coordinate must be greater than 0".to_string(),
            ));
        }
        if self.spawn_warmup_radius < 0 {
            return Err(ConfigError::OutOfRange(
                "world.spawn_warmup_radius must not be negative".to_string(),
            ));
        }
        if !(self.emergency_threshold > 0.0 && self.emergency_threshold < 1.0) {
            return Err(ConfigError::OutOfRange(
                "memory.emergency_threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.autosave_interval_seconds == 0 {
            return Err(ConfigError::OutOfRange(
                "persistence.autosave_interval_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
