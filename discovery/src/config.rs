use crate::proto;
use crate::session::{
    serve_subscriptions, BoxStream, SubscriberSet, SubscriptionRequest, SubscriptionServer,
};
use lattice_config::{
    ConfigError, EventKind, LbPolicy, Protocol, ProxyConfigEvent, ProxyConfigEventHandler,
    ProxyConfigSpec, ProxyConfigsController,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

impl SubscriptionRequest for proto::SvcConfigDiscoveryRequest {
    fn into_names(self) -> (Vec<String>, Vec<String>) {
        (self.svc_names_subscribe, self.svc_names_unsubscribe)
    }
}

/// Streams proxy-config changes to sessions subscribed by service name. A
/// snapshot whose `config` is unset means "explicitly no config"; a delete
/// is delivered the same way.
pub(crate) struct ConfigDiscovery {
    proxy_configs: ProxyConfigsController,
    subscribers: SubscriberSet<proto::SvcConfigDiscoveryResponse>,
    shutdown: CancellationToken,
}

impl ConfigDiscovery {
    pub(crate) fn new(
        proxy_configs: ProxyConfigsController,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let server = Arc::new(Self {
            proxy_configs: proxy_configs.clone(),
            subscribers: SubscriberSet::default(),
            shutdown,
        });
        proxy_configs.register_event_handler(Arc::new(Handler {
            server: server.clone(),
        }));
        server
    }

    pub(crate) fn stream(
        self: Arc<Self>,
        peer: String,
        requests: tonic::Streaming<proto::SvcConfigDiscoveryRequest>,
    ) -> BoxStream<proto::SvcConfigDiscoveryResponse> {
        serve_subscriptions(self, peer, requests)
    }
}

impl SubscriptionServer for ConfigDiscovery {
    type Event = proto::SvcConfigDiscoveryResponse;

    fn subscribers(&self) -> &SubscriberSet<Self::Event> {
        &self.subscribers
    }

    fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn snapshot(&self, key: &str) -> Option<Self::Event> {
        match self.proxy_configs.get_cached(key) {
            Ok(proxy_config) => Some(config_event(key, proxy_config.config.as_ref())),
            Err(ConfigError::NotExist) => None,
            Err(error) => {
                warn!(service = %key, %error, "unreadable cached proxy config");
                None
            }
        }
    }

    fn kind(&self) -> &'static str {
        "config"
    }
}

struct Handler {
    server: Arc<ConfigDiscovery>,
}

#[async_trait::async_trait]
impl ProxyConfigEventHandler for Handler {
    async fn handle(&self, event: &ProxyConfigEvent) {
        let service = &event.proxy_config.service_name;
        let config = match event.kind {
            EventKind::Add | EventKind::Update => event.proxy_config.config.as_ref(),
            EventKind::Delete => None,
        };
        self.server
            .subscribers
            .dispatch(service, config_event(service, config))
            .await;
    }
}

fn config_event(service: &str, config: Option<&ProxyConfigSpec>) -> proto::SvcConfigDiscoveryResponse {
    let snapshot = proto::ConfigSnapshot {
        config: config.map(to_proto_config),
    };
    proto::SvcConfigDiscoveryResponse {
        updated: [(service.to_string(), snapshot)].into_iter().collect(),
    }
}

fn to_proto_config(spec: &ProxyConfigSpec) -> proto::ProxyConfig {
    proto::ProxyConfig {
        listener: Some(proto::Listener {
            address: Some(to_address(&spec.listener.address)),
        }),
        protocol: match spec.protocol {
            Protocol::Tcp => proto::Protocol::Tcp,
            Protocol::Http => proto::Protocol::Http,
            Protocol::Redis => proto::Protocol::Redis,
            Protocol::Mysql => proto::Protocol::Mysql,
            Protocol::Grpc => proto::Protocol::Grpc,
        } as i32,
        lb_policy: match spec.lb_policy {
            Some(LbPolicy::LeastConn) => proto::LbPolicy::LeastConn,
            Some(LbPolicy::Random) => proto::LbPolicy::Random,
            Some(LbPolicy::RoundRobin) | None => proto::LbPolicy::RoundRobin,
        } as i32,
        connect_timeout_ms: spec.connect_timeout_ms,
        idle_timeout_ms: spec.idle_timeout_ms,
    }
}

fn to_address(address: &str) -> proto::Address {
    match address.parse::<std::net::SocketAddr>() {
        Ok(addr) => proto::Address {
            ip: addr.ip().to_string(),
            port: u32::from(addr.port()),
        },
        // Stored configs are validated on write; keep whatever is there.
        Err(_) => proto::Address {
            ip: address.to_string(),
            port: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_config::Listener;

    #[test]
    fn converts_a_spec_to_wire_form() {
        let spec = ProxyConfigSpec {
            listener: Listener {
                address: "10.1.2.3:9902".to_string(),
            },
            protocol: Protocol::Redis,
            lb_policy: Some(LbPolicy::LeastConn),
            connect_timeout_ms: Some(200),
            idle_timeout_ms: None,
        };
        let config = to_proto_config(&spec);
        let address = config.listener.as_ref().unwrap().address.as_ref().unwrap();
        assert_eq!(address.ip, "10.1.2.3");
        assert_eq!(address.port, 9902);
        assert_eq!(config.protocol(), proto::Protocol::Redis);
        assert_eq!(config.lb_policy(), proto::LbPolicy::LeastConn);
        assert_eq!(config.connect_timeout_ms, Some(200));
    }

    #[test]
    fn a_delete_event_carries_an_empty_snapshot() {
        let event = config_event("svc", None);
        assert!(event.updated["svc"].config.is_none());
    }
}
