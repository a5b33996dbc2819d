//! The YAML bootstrap file: listen addresses, backend selection and sync
//! cadence for both controllers.

use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Bootstrap {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub discovery: Discovery,
    #[serde(default)]
    pub config_store: ConfigStore,
    #[serde(default)]
    pub service_registry: ServiceRegistry,
}

impl Bootstrap {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading bootstrap file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing bootstrap file {}", path.display()))
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api: Api::default(),
            discovery: Discovery::default(),
            config_store: ConfigStore::default(),
            service_registry: ServiceRegistry::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Api {
    #[serde(default = "default_api_bind")]
    pub bind: SocketAddr,
    /// Inactivity cap on reading a request; unset means no limit.
    #[serde(default, deserialize_with = "duration::opt")]
    pub read_timeout: Option<Duration>,
    /// Cap on reading a request's header section.
    #[serde(default, deserialize_with = "duration::opt")]
    pub read_header_timeout: Option<Duration>,
    /// Inactivity cap on writing a response.
    #[serde(default, deserialize_with = "duration::opt")]
    pub write_timeout: Option<Duration>,
    /// How long a keep-alive connection may sit idle between requests.
    #[serde(default, deserialize_with = "duration::opt")]
    pub idle_timeout: Option<Duration>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            bind: default_api_bind(),
            read_timeout: None,
            read_header_timeout: None,
            write_timeout: None,
            idle_timeout: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Discovery {
    #[serde(default = "default_discovery_bind")]
    pub bind: SocketAddr,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            bind: default_discovery_bind(),
        }
    }
}

/// Backend drivers plug in by kind; `memory` is the only in-tree driver and
/// holds no durable state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct ConfigStore {
    #[serde(rename = "type", default = "default_store_kind")]
    pub kind: StoreKind,
    /// Driver-specific connection settings, passed through untouched.
    #[serde(default)]
    pub spec: Option<serde_yaml::Value>,
    #[serde(default = "default_store_sync_freq", with = "duration")]
    pub sync_freq: Duration,
    #[serde(default = "default_store_base_path")]
    pub base_path: String,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            spec: None,
            sync_freq: default_store_sync_freq(),
            base_path: default_store_base_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceRegistry {
    #[serde(rename = "type", default = "default_store_kind")]
    pub kind: StoreKind,
    #[serde(default)]
    pub spec: Option<serde_yaml::Value>,
    #[serde(default = "default_registry_sync_freq", with = "duration")]
    pub sync_freq: Duration,
    #[serde(default = "default_sync_jitter")]
    pub sync_jitter: f64,
    #[serde(default = "default_registry_base_path")]
    pub base_path: String,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            spec: None,
            sync_freq: default_registry_sync_freq(),
            sync_jitter: default_sync_jitter(),
            base_path: default_registry_base_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_bind() -> SocketAddr {
    "0.0.0.0:8882".parse().expect("valid default bind")
}

fn default_discovery_bind() -> SocketAddr {
    "0.0.0.0:9090".parse().expect("valid default bind")
}

fn default_store_kind() -> StoreKind {
    StoreKind::Memory
}

fn default_store_sync_freq() -> Duration {
    Duration::from_secs(10)
}

fn default_registry_sync_freq() -> Duration {
    Duration::from_secs(5)
}

fn default_sync_jitter() -> f64 {
    0.2
}

fn default_store_base_path() -> String {
    "/lattice".to_string()
}

fn default_registry_base_path() -> String {
    "/services".to_string()
}

/// Serde helper for humantime-style durations: `500ms`, `10s`, `2m`, `1h`.
mod duration {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| parse(&value).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub(super) fn parse(raw: &str) -> Result<Duration, String> {
        let raw = raw.trim();
        let (value, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
            Some(split) => raw.split_at(split),
            None => return Err(format!("duration {raw:?} is missing a unit")),
        };
        let value: u64 = value
            .parse()
            .map_err(|_| format!("duration {raw:?} has no numeric value"))?;
        match unit.trim() {
            "ms" => Ok(Duration::from_millis(value)),
            "s" => Ok(Duration::from_secs(value)),
            "m" => Ok(Duration::from_secs(value * 60)),
            "h" => Ok(Duration::from_secs(value * 3600)),
            other => Err(format!("unknown duration unit {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_file() {
        let bootstrap: Bootstrap = serde_yaml::from_str(
            r#"
log_level: debug
api:
  bind: 127.0.0.1:8882
  read_timeout: 30s
  read_header_timeout: 5s
  write_timeout: 30s
  idle_timeout: 2m
discovery:
  bind: 127.0.0.1:9090
config_store:
  type: memory
  sync_freq: 2s
  base_path: /lattice
service_registry:
  type: memory
  sync_freq: 500ms
  sync_jitter: 0.1
  base_path: /services
"#,
        )
        .unwrap();
        assert_eq!(bootstrap.log_level, "debug");
        assert_eq!(bootstrap.api.bind.port(), 8882);
        assert_eq!(bootstrap.api.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(bootstrap.api.read_header_timeout, Some(Duration::from_secs(5)));
        assert_eq!(bootstrap.api.write_timeout, Some(Duration::from_secs(30)));
        assert_eq!(bootstrap.api.idle_timeout, Some(Duration::from_secs(120)));
        assert_eq!(bootstrap.config_store.kind, StoreKind::Memory);
        assert_eq!(bootstrap.config_store.sync_freq, Duration::from_secs(2));
        assert_eq!(
            bootstrap.service_registry.sync_freq,
            Duration::from_millis(500)
        );
        assert_eq!(bootstrap.service_registry.sync_jitter, 0.1);
    }

    #[test]
    fn an_empty_file_gets_defaults() {
        let bootstrap: Bootstrap = serde_yaml::from_str("{}").unwrap();
        assert_eq!(bootstrap.log_level, "info");
        assert_eq!(bootstrap.api.bind.port(), 8882);
        assert_eq!(bootstrap.api.read_timeout, None);
        assert_eq!(bootstrap.api.idle_timeout, None);
        assert_eq!(bootstrap.discovery.bind.port(), 9090);
        assert_eq!(bootstrap.config_store.sync_freq, Duration::from_secs(10));
        assert_eq!(bootstrap.service_registry.sync_freq, Duration::from_secs(5));
    }

    #[test]
    fn an_unknown_backend_kind_is_rejected() {
        let result: Result<Bootstrap, _> = serde_yaml::from_str(
            r#"
config_store:
  type: etcd
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn duration_units() {
        assert_eq!(duration::parse("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(duration::parse("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(duration::parse("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(duration::parse("1h").unwrap(), Duration::from_secs(3600));
        assert!(duration::parse("10").is_err());
        assert!(duration::parse("fast").is_err());
    }
}
