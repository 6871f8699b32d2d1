//! Runtime configuration, loaded from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `REDIS_URL` | required | Broker the ingestor subscribes to |
//! | `DATABASE_URL` | unset | Enables the durable PostgreSQL store |
//! | `RELAY_HTTP_HOST` | `127.0.0.1` | Gateway bind address |
//! | `RELAY_HTTP_PORT` | `8080` | Gateway port |
//! | `RELAY_EVENTS_CHANNEL` | `cross_chain_events` | Transport channel |
//! | `RELAY_MAX_EVENTS` | `1000` | In-memory global cap |
//! | `RELAY_MAX_EVENTS_PER_ADDRESS` | `100` | In-memory per-address cap |
//! | `RELAY_DURABLE_TIMEOUT_MS` | `3000` | Bound on each durable call |
//! | `RELAY_SSE_KEEPALIVE_SECS` | `30` | Live stream keep-alive interval |
//! | `RELAY_SUBSCRIBER_BUFFER` | `64` | Messages buffered per live client |
//! | `RELAY_REQUEST_TIMEOUT_SECS` | `10` | Query route timeout |

use shared_bus::EVENTS_CHANNEL;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use xc_01_event_store::StoreConfig;
use xc_02_fanout_hub::HubConfig;
use xc_03_event_ingestion::ReconnectPolicy;
use xc_04_api_gateway::GatewayConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{component} configuration rejected: {reason}")]
    Component {
        component: &'static str,
        reason: String,
    },
}

/// Everything the consumer service needs to start.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub redis_url: String,
    pub database_url: Option<String>,
    pub channel: String,
    pub store: StoreConfig,
    pub hub: HubConfig,
    pub reconnect: ReconnectPolicy,
    pub gateway: GatewayConfig,
}

impl RelayConfig {
    /// Defaults for everything except the broker URL.
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            database_url: None,
            channel: EVENTS_CHANNEL.to_string(),
            store: StoreConfig::default(),
            hub: HubConfig::default(),
            reconnect: ReconnectPolicy::default(),
            gateway: GatewayConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and blank values mean "use default".
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let redis_url = get("REDIS_URL").ok_or(ConfigError::Missing("REDIS_URL"))?;
        let mut config = Self::new(redis_url);
        config.database_url = get("DATABASE_URL");

        if let Some(channel) = get("RELAY_EVENTS_CHANNEL") {
            config.channel = channel;
        }
        if let Some(host) = parsed::<IpAddr>(&get, "RELAY_HTTP_HOST")? {
            config.gateway.http.host = host;
        }
        if let Some(port) = parsed::<u16>(&get, "RELAY_HTTP_PORT")? {
            config.gateway.http.port = port;
        }
        if let Some(max) = parsed::<usize>(&get, "RELAY_MAX_EVENTS")? {
            config.store.max_events = max;
        }
        if let Some(max) = parsed::<usize>(&get, "RELAY_MAX_EVENTS_PER_ADDRESS")? {
            config.store.max_events_per_address = max;
        }
        if let Some(ms) = parsed::<u64>(&get, "RELAY_DURABLE_TIMEOUT_MS")? {
            config.store.durable_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parsed::<u64>(&get, "RELAY_SSE_KEEPALIVE_SECS")? {
            config.gateway.sse.keep_alive = Duration::from_secs(secs);
        }
        if let Some(buffer) = parsed::<usize>(&get, "RELAY_SUBSCRIBER_BUFFER")? {
            config.hub.subscriber_capacity = buffer;
        }
        if let Some(secs) = parsed::<u64>(&get, "RELAY_REQUEST_TIMEOUT_SECS")? {
            config.gateway.timeouts.request = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.trim().is_empty() {
            return Err(ConfigError::Component {
                component: "transport",
                reason: "channel name cannot be empty".into(),
            });
        }
        self.store.validate().map_err(|e| ConfigError::Component {
            component: "store",
            reason: e.to_string(),
        })?;
        self.hub.validate().map_err(|e| ConfigError::Component {
            component: "hub",
            reason: e.to_string(),
        })?;
        self.gateway
            .validate()
            .map_err(|e| ConfigError::Component {
                component: "gateway",
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Database URL with any password masked, for logs.
    pub fn redacted_database_url(&self) -> Option<String> {
        self.database_url.as_deref().map(redact)
    }
}

fn parsed<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var,
                value,
                reason: e.to_string(),
            }),
    }
}

fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
