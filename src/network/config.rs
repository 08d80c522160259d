//! Server Configuration
//!
//! Everything is environment-supplied; there is no config file and no
//! persisted state.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::presence::guard::GuardConfig;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default time a socket may take to complete the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Origin used in production when `CORS_ORIGIN` is unset.
pub const DEFAULT_PRODUCTION_ORIGIN: &str = "https://your-domain.com";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Which browser origins may open a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigin {
    /// Accept every origin.
    Any,
    /// Accept only this exact origin.
    Exact(String),
}

impl AllowedOrigin {
    /// Check a handshake's `Origin` header.
    ///
    /// Requests without an `Origin` header come from non-browser clients and
    /// are always accepted.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (AllowedOrigin::Any, _) | (_, None) => true,
            (AllowedOrigin::Exact(allowed), Some(origin)) => allowed == origin,
        }
    }
}

impl std::fmt::Display for AllowedOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllowedOrigin::Any => f.write_str("*"),
            AllowedOrigin::Exact(origin) => f.write_str(origin),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Origin policy for the WebSocket handshake.
    pub allowed_origin: AllowedOrigin,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Capacity of each connection's outbound queue.
    pub outbox_capacity: usize,
    /// Deadline for the WebSocket upgrade after TCP accept.
    pub handshake_timeout: Duration,
    /// Position throttle and bounds.
    pub guard: GuardConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            allowed_origin: AllowedOrigin::Any,
            max_connections: 1000,
            outbox_capacity: 256,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            guard: GuardConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from an arbitrary variable source.
    ///
    /// - `PORT`: listen port on 0.0.0.0 (default 5000)
    /// - `RELAY_ENV`: `production` restricts origins to `CORS_ORIGIN`
    /// - `CORS_ORIGIN`: allowed origin in production
    /// - `RELAY_MAX_CONNECTIONS`: concurrent connection ceiling
    /// - `RELAY_HANDSHAKE_TIMEOUT_SECS`: upgrade deadline (default 30)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let max_connections = parse_var(&lookup, "RELAY_MAX_CONNECTIONS")?
            .unwrap_or(defaults.max_connections);
        let handshake_timeout = parse_var(&lookup, "RELAY_HANDSHAKE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.handshake_timeout);

        let production = lookup("RELAY_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let allowed_origin = if production {
            AllowedOrigin::Exact(
                lookup("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_PRODUCTION_ORIGIN.to_string()),
            )
        } else {
            AllowedOrigin::Any
        };

        Ok(Self {
            bind_addr: SocketAddr::new(defaults.bind_addr.ip(), port),
            allowed_origin,
            max_connections,
            handshake_timeout,
            ..defaults
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            match parsed {
                Ok(v) => Ok(Some(v)),
                Err(_) => Err(ConfigError::InvalidNumber { var, value }),
            }
        }
    }
}
