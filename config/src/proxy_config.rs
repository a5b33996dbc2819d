use crate::event::HandlerList;
use crate::{
    ConfigEventHandler, ConfigError, Controller, Event, EventKind, Metadata, NAMESPACE_SERVICE,
    TYPE_PROXY_CONFIG,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Where a sidecar accepts traffic for the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    /// `ip:port` the proxy listens on.
    pub address: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Http,
    Redis,
    Mysql,
    Grpc,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    RoundRobin,
    LeastConn,
    Random,
}

/// The proxy configuration payload for one service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfigSpec {
    pub listener: Listener,
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lb_policy: Option<LbPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u64>,
}

impl ProxyConfigSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listener.address.is_empty() {
            return Err(ConfigError::Validation("listener.address is empty".into()));
        }
        if self.listener.address.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "listener.address {:?} is not an ip:port",
                self.listener.address
            )));
        }
        Ok(())
    }
}

/// A service's proxy configuration. `config` is `None` for an explicit
/// "no config" entry, which is distinct from the entry being absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(flatten)]
    pub metadata: Option<Metadata>,
    pub service_name: String,
    pub config: Option<ProxyConfigSpec>,
}

impl ProxyConfig {
    pub fn new(service_name: impl Into<String>, config: Option<ProxyConfigSpec>) -> Self {
        Self {
            metadata: None,
            service_name: service_name.into(),
            config,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::Validation("service_name is empty".into()));
        }
        if let Some(config) = &self.config {
            config.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ProxyConfigEvent {
    pub kind: EventKind,
    pub proxy_config: ProxyConfig,
}

#[async_trait::async_trait]
pub trait ProxyConfigEventHandler: Send + Sync {
    async fn handle(&self, event: &ProxyConfigEvent);
}

fn decode(value: &[u8]) -> Result<Option<ProxyConfigSpec>, ConfigError> {
    if value.is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_slice(value)?)
}

fn encode(config: &Option<ProxyConfigSpec>) -> Result<Vec<u8>, ConfigError> {
    Ok(serde_json::to_vec(config)?)
}

/// Typed view over the `service/proxy-config` entries of a [`Controller`].
#[derive(Clone)]
pub struct ProxyConfigsController {
    ctl: Controller,
    handlers: Arc<HandlerList<dyn ProxyConfigEventHandler>>,
}

impl ProxyConfigsController {
    pub(crate) fn new(ctl: &Controller) -> Self {
        let handlers = Arc::new(HandlerList::default());
        ctl.register_event_handler(Arc::new(RawHandler {
            handlers: handlers.clone(),
        }));
        Self {
            ctl: ctl.clone(),
            handlers,
        }
    }

    pub fn register_event_handler(&self, handler: Arc<dyn ProxyConfigEventHandler>) {
        self.handlers.register(handler);
    }

    pub async fn get(&self, service: &str) -> Result<ProxyConfig, ConfigError> {
        let (value, metadata) = self.ctl.get(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, service).await?;
        Ok(ProxyConfig {
            metadata: Some(metadata),
            service_name: service.to_string(),
            config: decode(&value)?,
        })
    }

    pub fn get_cached(&self, service: &str) -> Result<ProxyConfig, ConfigError> {
        let raw = self.ctl.get_cache_raw(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, service)?;
        Ok(ProxyConfig {
            metadata: raw.metadata,
            service_name: service.to_string(),
            config: decode(&raw.value)?,
        })
    }

    pub async fn add(&self, proxy_config: &ProxyConfig) -> Result<(), ConfigError> {
        proxy_config.validate()?;
        let value = encode(&proxy_config.config)?;
        self.ctl
            .add(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, &proxy_config.service_name, value)
            .await
    }

    pub async fn update(&self, proxy_config: &ProxyConfig) -> Result<(), ConfigError> {
        proxy_config.validate()?;
        let value = encode(&proxy_config.config)?;
        self.ctl
            .update(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, &proxy_config.service_name, value)
            .await
    }

    pub async fn delete(&self, service: &str) -> Result<(), ConfigError> {
        self.ctl.delete(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, service).await
    }

    pub async fn exists(&self, service: &str) -> bool {
        self.ctl.exists(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, service).await
    }

    pub async fn get_all(&self) -> Result<Vec<ProxyConfig>, ConfigError> {
        let services = match self.ctl.keys(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG).await {
            Ok(services) => services,
            Err(ConfigError::NotExist) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        let mut all = Vec::with_capacity(services.len());
        for service in services {
            all.push(self.get(&service).await?);
        }
        Ok(all)
    }

    pub fn get_all_cached(&self) -> Result<Vec<ProxyConfig>, ConfigError> {
        let services = match self.ctl.keys_cached(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG) {
            Ok(services) => services,
            Err(ConfigError::NotExist) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        services.into_iter().map(|svc| self.get_cached(&svc)).collect()
    }
}

struct RawHandler {
    handlers: Arc<HandlerList<dyn ProxyConfigEventHandler>>,
}

#[async_trait::async_trait]
impl ConfigEventHandler for RawHandler {
    async fn handle(&self, event: &Event) {
        if event.config.namespace != NAMESPACE_SERVICE || event.config.ty != TYPE_PROXY_CONFIG {
            return;
        }
        let service = &event.config.key;
        let config = match decode(&event.config.value) {
            Ok(config) => config,
            Err(error) => {
                warn!(%service, %error, "undecodable proxy config, skipping");
                return;
            }
        };
        let typed = ProxyConfigEvent {
            kind: event.kind,
            proxy_config: ProxyConfig {
                metadata: event.config.metadata,
                service_name: service.clone(),
                config,
            },
        };
        for handler in self.handlers.load().iter() {
            handler.handle(&typed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, RawConfig};
    use tokio::sync::mpsc;

    fn spec(address: &str) -> ProxyConfigSpec {
        ProxyConfigSpec {
            listener: Listener {
                address: address.to_string(),
            },
            protocol: Protocol::Tcp,
            lb_policy: None,
            connect_timeout_ms: None,
            idle_timeout_ms: None,
        }
    }

    #[test]
    fn validation_requires_a_listener_address() {
        let config = ProxyConfig::new("svc", Some(spec("not-an-addr")));
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = ProxyConfig::new("svc", Some(spec("127.0.0.1:8080")));
        config.validate().unwrap();

        // A null payload is legal.
        ProxyConfig::new("svc", None).validate().unwrap();

        let config = ProxyConfig::new("", None);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn codec_round_trips_null() {
        let value = encode(&None).unwrap();
        assert_eq!(value, b"null");
        assert_eq!(decode(&value).unwrap(), None);
        assert_eq!(decode(b"").unwrap(), None);
    }

    struct Recorder(mpsc::UnboundedSender<ProxyConfigEvent>);

    #[async_trait::async_trait]
    impl ProxyConfigEventHandler for Recorder {
        async fn handle(&self, event: &ProxyConfigEvent) {
            let _ = self.0.send(event.clone());
        }
    }

    #[tokio::test]
    async fn raw_events_translate_to_typed_events() {
        let controller = Controller::new(Arc::new(MemoryStore::new()));
        let proxy_configs = controller.proxy_configs();
        let (tx, mut rx) = mpsc::unbounded_channel();
        proxy_configs.register_event_handler(Arc::new(Recorder(tx)));

        let handler = RawHandler {
            handlers: proxy_configs.handlers.clone(),
        };
        let value = serde_json::to_vec(&Some(spec("127.0.0.1:9000"))).unwrap();
        handler
            .handle(&Event::new(
                EventKind::Add,
                RawConfig::new(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, "svc", value),
            ))
            .await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Add);
        assert_eq!(event.proxy_config.service_name, "svc");
        assert_eq!(event.proxy_config.config, Some(spec("127.0.0.1:9000")));

        // Garbage never dispatches.
        handler
            .handle(&Event::new(
                EventKind::Update,
                RawConfig::new(NAMESPACE_SERVICE, TYPE_PROXY_CONFIG, "svc", b"{oops".to_vec()),
            ))
            .await;
        assert!(rx.try_recv().is_err());
    }
}
