//! Engine configuration.

use serde::{Deserialize, Serialize};
use weft_kernels::AssignErrorMode;
use weft_kernels::option::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

use crate::error::ConfigError;

/// Settings of one [`Engine`](crate::Engine).
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dispatch: DispatchConfig,
    pub option: OptionConfig,
    pub arena: ArenaConfig,
    /// Deepest nesting of composite resolutions before giving up.
    pub max_resolve_depth: usize,
    /// Mode used when a call does not name one; never `default` itself.
    pub default_error_mode: AssignErrorMode,
}

/// Dispatcher memo cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Cached argument tuples per dispatcher; zero disables caching.
    pub cache_capacity: usize,
}

/// Option composite settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionConfig {
    /// Elements tested for missing values per strided chunk.
    pub chunk_size: usize,
}

/// Kernel arena settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Bytes allocated by the first emplace.
    pub initial_capacity: usize,
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CHUNK_SIZE).contains(&self.option.chunk_size) {
            return Err(ConfigError::Invalid(format!(
                "option.chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {}",
                self.option.chunk_size
            )));
        }
        if self.arena.initial_capacity == 0 {
            return Err(ConfigError::Invalid(
                "arena.initial_capacity must be > 0".to_string(),
            ));
        }
        if self.max_resolve_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_resolve_depth must be > 0".to_string(),
            ));
        }
        if self.default_error_mode == AssignErrorMode::Default {
            return Err(ConfigError::Invalid(
                "default_error_mode must name a concrete mode".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            option: OptionConfig::default(),
            arena: ArenaConfig::default(),
            max_resolve_depth: 64,
            default_error_mode: AssignErrorMode::Fractional,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
        }
    }
}

impl Default for OptionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
        }
    }
}
