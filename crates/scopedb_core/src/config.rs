//! Backing store configuration.
//!
//! # Responsibility
//! - Parse the single store-location string into an ephemeral or file target.
//! - Carry connection tuning knobs shared by every session of an engine.
//!
//! # Invariants
//! - A location is never empty.
//! - `:memory:` (bare or behind the `sqlite://` scheme) always means ephemeral.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sentinel location for an ephemeral store discarded at process end.
pub const MEMORY_LOCATION: &str = ":memory:";

const SQLITE_SCHEME: &str = "sqlite://";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyLocation,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLocation => write!(f, "store location cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Where the backing store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Ephemeral in-memory store.
    Memory,
    /// Persistent file-backed store.
    File(PathBuf),
}

impl StoreLocation {
    /// Parses a location string.
    ///
    /// Accepts `:memory:`, `sqlite://`, `sqlite:///:memory:`,
    /// `sqlite:///<path>` and bare filesystem paths.
    ///
    /// # Errors
    /// - Returns `ConfigError::EmptyLocation` for blank input.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyLocation);
        }

        let target = match trimmed.strip_prefix(SQLITE_SCHEME) {
            // `sqlite:///rel.db` -> `rel.db`, `sqlite:////abs.db` -> `/abs.db`.
            Some(rest) => match rest.strip_prefix('/') {
                Some(path) => path,
                None if rest.is_empty() => MEMORY_LOCATION,
                None => rest,
            },
            None => trimmed,
        };

        if target.is_empty() || target == MEMORY_LOCATION {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(target)))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Returns the file path for file-backed stores.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory => None,
            Self::File(path) => Some(path.as_path()),
        }
    }

    /// Stable label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "{MEMORY_LOCATION}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Engine-wide store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// Logs every executed SQL statement at debug level.
    pub echo: bool,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            echo: false,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Parses `raw` and applies default tuning.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        Ok(Self::new(StoreLocation::parse(raw)?))
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(StoreLocation::Memory)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, StoreLocation};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn memory_sentinels_parse_as_memory() {
        for raw in [":memory:", " :memory: ", "sqlite://", "sqlite:///:memory:"] {
            assert_eq!(StoreLocation::parse(raw).unwrap(), StoreLocation::Memory, "{raw}");
        }
    }

    #[test]
    fn paths_parse_as_file_locations() {
        assert_eq!(
            StoreLocation::parse("data/app.db").unwrap(),
            StoreLocation::File(PathBuf::from("data/app.db"))
        );
        assert_eq!(
            StoreLocation::parse("sqlite:///app.db").unwrap(),
            StoreLocation::File(PathBuf::from("app.db"))
        );
        assert_eq!(
            StoreLocation::parse("sqlite:////var/lib/app.db").unwrap(),
            StoreLocation::File(PathBuf::from("/var/lib/app.db"))
        );
    }

    #[test]
    fn blank_location_is_rejected() {
        assert_eq!(StoreLocation::parse("   "), Err(ConfigError::EmptyLocation));
    }

    #[test]
    fn config_builder_overrides_defaults() {
        let config = StoreConfig::parse(":memory:")
            .unwrap()
            .echo(true)
            .busy_timeout(Duration::from_millis(250));
        assert!(config.echo);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(config.location.is_memory());
    }
}
