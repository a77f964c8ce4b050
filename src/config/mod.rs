//! Runtime settings read from the process environment.
//!
//! | variable | default |
//! |---|---|
//! | `LIBRARY_BIND` | `0.0.0.0:3000` |
//! | `DATABASE_URL` | unset: in-memory store |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |
//! | `LIBRARY_SCHEMA` | `library` |
//! | `LIBRARY_API_TOKENS` | required, comma-separated |
//! | `LIBRARY_ERROR_LOG` | `library_api.log`, empty disables |
//! | `LIBRARY_PAGE_SIZE` / `LIBRARY_MAX_PAGE_SIZE` | `10` / `100` |
//! | `RUST_LOG` | `library_records=info,tower_http=info` |

use regex::Regex;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_SCHEMA: &str = "library";
pub const DEFAULT_ERROR_LOG: &str = "library_api.log";
pub const DEFAULT_LOG_FILTER: &str = "library_records=info,tower_http=info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("{0} must list at least one token")]
    MissingTokens(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub schema: String,
}

/// Page sizes for paginated listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        PagingConfig {
            default_size: 10,
            max_size: 100,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub api_tokens: Vec<String>,
    /// Side log of operation-level errors. `None` disables it.
    pub error_log: Option<PathBuf>,
    pub log_filter: String,
    pub paging: PagingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let bind_addr: SocketAddr = parse_or("LIBRARY_BIND", get("LIBRARY_BIND"), DEFAULT_BIND.parse().ok())?;

        let database = match get("DATABASE_URL").filter(|v| !v.is_empty()) {
            Some(url) => {
                let schema = get("LIBRARY_SCHEMA")
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
                if !is_identifier(&schema) {
                    return Err(ConfigError::Invalid {
                        key: "LIBRARY_SCHEMA",
                        message: format!("'{}' is not a plain SQL identifier", schema),
                    });
                }
                Some(DatabaseConfig {
                    url,
                    max_connections: parse_or("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), Some(5))?,
                    schema,
                })
            }
            None => None,
        };

        let api_tokens: Vec<String> = get("LIBRARY_API_TOKENS")
            .unwrap_or_default()
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if api_tokens.is_empty() {
            return Err(ConfigError::MissingTokens("LIBRARY_API_TOKENS"));
        }

        let error_log = match get("LIBRARY_ERROR_LOG") {
            Some(path) if path.is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_ERROR_LOG)),
        };

        let defaults = PagingConfig::default();
        let paging = PagingConfig {
            default_size: parse_or("LIBRARY_PAGE_SIZE", get("LIBRARY_PAGE_SIZE"), Some(defaults.default_size))?,
            max_size: parse_or("LIBRARY_MAX_PAGE_SIZE", get("LIBRARY_MAX_PAGE_SIZE"), Some(defaults.max_size))?,
        };
        if paging.default_size == 0 || paging.max_size < paging.default_size {
            return Err(ConfigError::Invalid {
                key: "LIBRARY_PAGE_SIZE",
                message: format!(
                    "page size {} must be positive and at most the maximum {}",
                    paging.default_size, paging.max_size
                ),
            });
        }

        Ok(AppConfig {
            bind_addr,
            database,
            api_tokens,
            error_log,
            log_filter: get("RUST_LOG")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            paging,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw.filter(|v| !v.is_empty()) {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("'{}': {}", v, e),
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            key,
            message: "missing".into(),
        }),
    }
}

fn is_identifier(s: &str) -> bool {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}
