//! Stream Configuration
//!
//! Handles parsing and management of loopstream.toml configuration files.
//! One [`StreamConfig`] is shared by every stream that should schedule onto
//! the same run loop mode.

use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::RunLoopMode;

/// File name searched for by [`StreamConfig::find_and_load`]
pub const CONFIG_FILE_NAME: &str = "loopstream.toml";

/// Default transfer buffer size in bytes
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Buffer capacity must be greater than zero, got {0}")]
    InvalidBufferCapacity(usize),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by readable and writable streams.
///
/// ```toml
/// mode = "commonModes"
/// buffer_capacity = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Run loop mode streams register under when scheduled
    pub mode: RunLoopMode,

    /// Upper bound, in bytes, of a single read or write transfer
    pub buffer_capacity: NonZeroUsize,
}

fn default_buffer_capacity() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_BUFFER_CAPACITY).unwrap_or(NonZeroUsize::MIN)
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: RunLoopMode::default(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different scheduling mode
    pub fn with_mode(mut self, mode: RunLoopMode) -> Self {
        self.mode = mode;
        self
    }

    /// Use a different transfer buffer size
    pub fn with_buffer_capacity(mut self, capacity: usize) -> ConfigResult<Self> {
        self.buffer_capacity =
            NonZeroUsize::new(capacity).ok_or(ConfigError::InvalidBufferCapacity(capacity))?;
        Ok(self)
    }

    pub fn mode(&self) -> &RunLoopMode {
        &self.mode
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity.get()
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// Falls back to defaults when no loopstream.toml exists on the way up.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
