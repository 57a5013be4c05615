use std::{
    net::{Ipv6Addr, SocketAddr},
    time::Duration,
};

use config::{Config, ConfigError};
use serde::Deserialize;

pub const DEFAULT_AUDIENCE: &str = "authenticated";

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub listen: ListenConfiguration,
    pub postgres: deadpool_postgres::Config,
    pub auth: AuthConfiguration,
    pub limits: LimitsConfiguration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfiguration {
    pub http: SocketAddr,
}

impl Default for ListenConfiguration {
    fn default() -> Self {
        Self {
            http: SocketAddr::new(std::net::IpAddr::V6(Ipv6Addr::UNSPECIFIED), 8080),
        }
    }
}

/// Tokens are issued by the external identity provider and signed with a
/// shared HS256 secret.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfiguration {
    pub jwt_secret: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfiguration {
    pub request_timeout_ms: u64,
    pub reconcile_timeout_ms: u64,
    pub contract_cache_size: u64,
    pub contract_cache_ttl_secs: u64,
}

impl Default for LimitsConfiguration {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            reconcile_timeout_ms: 5_000,
            contract_cache_size: 1_000,
            contract_cache_ttl_secs: 60,
        }
    }
}

impl LimitsConfiguration {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_millis(self.reconcile_timeout_ms)
    }

    pub fn contract_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.contract_cache_ttl_secs)
    }
}

impl Configuration {
    pub fn load() -> Result<Self, ConfigError> {
        let default_listen = ListenConfiguration::default();
        let default_limits = LimitsConfiguration::default();
        let loaded = Config::builder()
            .add_source(
                config::Environment::with_prefix("FORMBUILDER")
                    .ignore_empty(true)
                    .separator("__")
                    .prefix_separator("_"),
            )
            .set_default("listen.http", default_listen.http.to_string())?
            .set_default("postgres.port", 5432)?
            .set_default("auth.audience", DEFAULT_AUDIENCE)?
            .set_default("limits.request_timeout_ms", default_limits.request_timeout_ms)?
            .set_default(
                "limits.reconcile_timeout_ms",
                default_limits.reconcile_timeout_ms,
            )?
            .set_default(
                "limits.contract_cache_size",
                default_limits.contract_cache_size,
            )?
            .set_default(
                "limits.contract_cache_ttl_secs",
                default_limits.contract_cache_ttl_secs,
            )?
            .build()?;
        loaded.try_deserialize()
    }
}
