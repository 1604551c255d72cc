//! Store configuration parsed from SQLite connection strings.
//!
//! # Responsibility
//! - Turn `key=value;` connection strings into a typed [`StoreConfig`].
//! - Reject unknown keys and malformed values before any I/O happens.
//!
//! # Invariants
//! - Keys are matched case-insensitively with inner whitespace ignored.
//! - A data source is always required, even for in-memory stores.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const MEMORY_DATA_SOURCE: &str = ":memory:";
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;
/// SQLite takes the busy timeout as an `i32` of milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Connection string parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyConnectionString,
    MalformedPair(String),
    UnknownKey(String),
    InvalidValue { key: String, value: String },
    MissingDataSource,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyConnectionString => write!(f, "connection string must not be empty"),
            Self::MalformedPair(pair) => {
                write!(f, "connection string segment `{pair}` is not key=value")
            }
            Self::UnknownKey(key) => write!(f, "connection string key is unsupported: {key}"),
            Self::InvalidValue { key, value } => {
                write!(f, "connection string value `{value}` is invalid for `{key}`")
            }
            Self::MissingDataSource => write!(f, "connection string has no data source"),
        }
    }
}

impl Error for ConfigError {}

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Access mode requested for file stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    ReadWriteCreate,
    ReadWrite,
    ReadOnly,
}

/// Typed store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub mode: OpenMode,
    pub foreign_keys: bool,
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Config for a private in-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::with_location(StoreLocation::Memory)
    }

    /// Config for a file store with default settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_location(StoreLocation::File(path.into()))
    }

    fn with_location(location: StoreLocation) -> Self {
        Self {
            location,
            mode: OpenMode::default(),
            foreign_keys: true,
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }

    /// Parses a connection string such as `Data Source=school.db;Mode=ReadWrite`.
    ///
    /// # Errors
    /// - Empty input, segments without `=`, unknown keys and invalid values.
    /// - No `Data Source` (or alias) present.
    pub fn from_connection_string(value: &str) -> ConfigResult<Self> {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyConnectionString);
        }

        let mut data_source: Option<String> = None;
        let mut memory_mode = false;
        let mut mode = OpenMode::default();
        let mut foreign_keys = true;
        let mut busy_timeout = Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS);

        for segment in value.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = segment
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedPair(segment.to_string()))?;
            let key = normalize_key(raw_key);
            let raw_value = raw_value.trim();

            match key.as_str() {
                "datasource" | "filename" => {
                    if raw_value.is_empty() {
                        return Err(invalid(raw_key, raw_value));
                    }
                    data_source = Some(raw_value.to_string());
                }
                "mode" => match raw_value.to_ascii_lowercase().as_str() {
                    "readwritecreate" => mode = OpenMode::ReadWriteCreate,
                    "readwrite" => mode = OpenMode::ReadWrite,
                    "readonly" => mode = OpenMode::ReadOnly,
                    "memory" => memory_mode = true,
                    _ => return Err(invalid(raw_key, raw_value)),
                },
                "foreignkeys" => {
                    foreign_keys =
                        parse_bool(raw_value).ok_or_else(|| invalid(raw_key, raw_value))?;
                }
                "defaulttimeout" => {
                    let secs = raw_value
                        .parse::<u64>()
                        .ok()
                        .filter(|secs| {
                            secs.checked_mul(1000)
                                .is_some_and(|ms| ms <= MAX_BUSY_TIMEOUT_MS)
                        })
                        .ok_or_else(|| invalid(raw_key, raw_value))?;
                    busy_timeout = Duration::from_secs(secs);
                }
                _ => return Err(ConfigError::UnknownKey(raw_key.trim().to_string())),
            }
        }

        let data_source = data_source.ok_or(ConfigError::MissingDataSource)?;
        let location = if memory_mode || data_source == MEMORY_DATA_SOURCE {
            StoreLocation::Memory
        } else {
            StoreLocation::File(PathBuf::from(data_source))
        };

        Ok(Self {
            location,
            mode,
            foreign_keys,
            busy_timeout,
        })
    }

    /// Store location label used in log events.
    pub fn location_label(&self) -> &'static str {
        match self.location {
            StoreLocation::Memory => "memory",
            StoreLocation::File(_) => "file",
        }
    }
}

impl OpenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadWriteCreate => "read_write_create",
            Self::ReadWrite => "read_write",
            Self::ReadOnly => "read_only",
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.trim().to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, OpenMode, StoreConfig, StoreLocation};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn parses_file_data_source_with_defaults() {
        let config = StoreConfig::from_connection_string("Data Source=school.db")
            .expect("plain data source should parse");
        assert_eq!(config.location, StoreLocation::File(PathBuf::from("school.db")));
        assert_eq!(config.mode, OpenMode::ReadWriteCreate);
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn keys_are_case_and_space_insensitive() {
        let config = StoreConfig::from_connection_string(
            "datasource=a.db; MODE=ReadOnly ;foreign keys=False;Default Timeout=12;",
        )
        .expect("mixed-case keys should parse");
        assert_eq!(config.mode, OpenMode::ReadOnly);
        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout, Duration::from_secs(12));
    }

    #[test]
    fn memory_source_and_memory_mode_both_select_memory() {
        let by_source = StoreConfig::from_connection_string("Data Source=:memory:")
            .expect("memory source should parse");
        assert_eq!(by_source.location, StoreLocation::Memory);

        let by_mode = StoreConfig::from_connection_string("Filename=shared;Mode=Memory")
            .expect("memory mode should parse");
        assert_eq!(by_mode.location, StoreLocation::Memory);
        assert_eq!(by_mode.location_label(), "memory");
        assert_eq!(by_mode.mode.as_str(), "read_write_create");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            StoreConfig::from_connection_string("  "),
            Err(ConfigError::EmptyConnectionString)
        );
        assert_eq!(
            StoreConfig::from_connection_string("Mode=ReadWrite"),
            Err(ConfigError::MissingDataSource)
        );
        assert!(matches!(
            StoreConfig::from_connection_string("Data Source=a.db;Cache"),
            Err(ConfigError::MalformedPair(_))
        ));
        assert!(matches!(
            StoreConfig::from_connection_string("Data Source=a.db;Password=x"),
            Err(ConfigError::UnknownKey(key)) if key == "Password"
        ));
        assert!(matches!(
            StoreConfig::from_connection_string("Data Source=a.db;Default Timeout=soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn busy_timeout_is_bounded_by_sqlite_millisecond_range() {
        let max_secs = i32::MAX as u64 / 1000;
        let config = StoreConfig::from_connection_string(&format!(
            "Data Source=a.db;Default Timeout={max_secs}"
        ))
        .expect("largest representable timeout should parse");
        assert_eq!(config.busy_timeout, Duration::from_secs(max_secs));

        for too_big in ["3000000", "18446744073709551615"] {
            assert_eq!(
                StoreConfig::from_connection_string(&format!(
                    "Data Source=:memory:;Default Timeout={too_big}"
                )),
                Err(ConfigError::InvalidValue {
                    key: "Default Timeout".to_string(),
                    value: too_big.to_string(),
                })
            );
        }
    }
}
