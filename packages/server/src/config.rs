//! Startup configuration read from the environment.
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `SEOUL_API_KEY` | required | open-data API key |
//! | `VISITOR_MAP_DISTRICT` | `seongsu` | registered district id |
//! | `SEOUL_API_HOST` | district TOML | API host override |
//! | `VISITOR_MAP_HTTP_TIMEOUT_SECS` | `30` | per-request timeout |
//! | `BIND_ADDR` | `127.0.0.1` | |
//! | `PORT` | `8080` | |

use std::time::Duration;

use thiserror::Error;
use visitor_map_district::DEFAULT_DISTRICT_ID;
use visitor_map_district_models::DistrictConfig;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The open-data API key is not set.
    #[error("SEOUL_API_KEY is not set")]
    MissingCredential,

    /// The configured district is not registered.
    #[error("Unknown district '{id}'")]
    UnknownDistrict {
        /// The requested district id.
        id: String,
    },

    /// A variable holds a value that cannot be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Open-data API key.
    pub api_key: String,
    /// District to show, with any host override applied.
    pub district: DistrictConfig,
    /// Timeout for each open-data request.
    pub http_timeout: Duration,
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the API key is missing or a value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of a variable if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the API key is missing or a value is
    /// invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("SEOUL_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredential)?;

        let district_id =
            lookup("VISITOR_MAP_DISTRICT").unwrap_or_else(|| DEFAULT_DISTRICT_ID.to_string());
        let mut district = visitor_map_district::district(&district_id)
            .ok_or(ConfigError::UnknownDistrict { id: district_id })?;

        if let Some(host) = lookup("SEOUL_API_HOST") {
            district.api.host = host;
        }

        let http_timeout = Duration::from_secs(parse_or(
            &lookup,
            "VISITOR_MAP_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 8080)?;

        Ok(Self {
            api_key,
            district,
            http_timeout,
            bind_addr,
            port,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    lookup(name).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value })
    })
}
