//! Store configuration.
//!
//! # Responsibility
//! - Hold the single connection string selecting the target store.
//! - Carry connection options (`echo`, `future`, `busy_timeout_ms`) into
//!   engine construction.
//!
//! # Invariants
//! - Only SQLite urls are accepted (`sqlite://...`, `sqlite+<driver>://...`).
//! - An empty database part always means an in-memory store.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MEMORY_URL: &str = "sqlite+pysqlite:///:memory:";

const MEMORY_MARKER: &str = ":memory:";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyUrl,
    MissingScheme(String),
    UnsupportedScheme(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "store url cannot be empty"),
            Self::MissingScheme(url) => {
                write!(f, "store url `{url}` has no scheme; expected sqlite://...")
            }
            Self::UnsupportedScheme(scheme) => {
                write!(f, "unsupported store scheme `{scheme}`; only sqlite is available")
            }
        }
    }
}

impl Error for ConfigError {}

/// Where the store lives once the url is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

/// Owned configuration passed to `Engine::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection string, e.g. `sqlite:///notes.db`.
    pub url: String,
    /// Log every executed statement under the `ormtour::sql` target.
    pub echo: bool,
    /// Raw connections require explicit `commit()`; uncommitted work is
    /// rolled back when the connection is released.
    pub future: bool,
    /// Longest wait for a locked store before failing with a connectivity
    /// error.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: MEMORY_URL.to_string(),
            echo: false,
            future: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(format!("sqlite:///{}", path.as_ref().display()))
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_future(mut self, future: bool) -> Self {
        self.future = future;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Resolves `url` into a concrete store location.
    ///
    /// `sqlite:////abs/path.db` keeps the leading slash of the path, while
    /// `sqlite:///rel/path.db` is relative to the working directory.
    pub fn parse_location(&self) -> ConfigResult<StoreLocation> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if url == MEMORY_MARKER {
            return Ok(StoreLocation::Memory);
        }

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| ConfigError::MissingScheme(url.to_string()))?;
        let backend = scheme.split('+').next().unwrap_or_default();
        if !backend.eq_ignore_ascii_case("sqlite") {
            return Err(ConfigError::UnsupportedScheme(scheme.to_string()));
        }

        let database = rest.strip_prefix('/').unwrap_or(rest);
        if database.is_empty() || database == MEMORY_MARKER {
            return Ok(StoreLocation::Memory);
        }

        Ok(StoreLocation::File(PathBuf::from(database)))
    }
}
