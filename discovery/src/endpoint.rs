use crate::proto;
use crate::session::{
    serve_subscriptions, BoxStream, SubscriberSet, SubscriptionRequest, SubscriptionServer,
};
use lattice_core::{InstanceState, ServiceInstance};
use lattice_registry::{
    EventKind, InstanceEvent, InstanceEventHandler, RegistryCache, ServiceEvent,
    ServiceEventHandler,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl SubscriptionRequest for proto::SvcEndpointDiscoveryRequest {
    fn into_names(self) -> (Vec<String>, Vec<String>) {
        (self.svc_names_subscribe, self.svc_names_unsubscribe)
    }
}

/// Streams endpoint changes to sessions subscribed by service name, fed by
/// the registry cache's service and instance events.
pub(crate) struct EndpointDiscovery {
    registry: RegistryCache,
    subscribers: SubscriberSet<proto::SvcEndpointDiscoveryResponse>,
    shutdown: CancellationToken,
}

impl EndpointDiscovery {
    pub(crate) fn new(registry: RegistryCache, shutdown: CancellationToken) -> Arc<Self> {
        let server = Arc::new(Self {
            registry: registry.clone(),
            subscribers: SubscriberSet::default(),
            shutdown,
        });
        let handler = Arc::new(RegistryHandler {
            server: server.clone(),
        });
        registry.register_service_event_handler(handler.clone());
        registry.register_instance_event_handler(handler);
        server
    }

    pub(crate) fn stream(
        self: Arc<Self>,
        peer: String,
        requests: tonic::Streaming<proto::SvcEndpointDiscoveryRequest>,
    ) -> BoxStream<proto::SvcEndpointDiscoveryResponse> {
        serve_subscriptions(self, peer, requests)
    }
}

impl SubscriptionServer for EndpointDiscovery {
    type Event = proto::SvcEndpointDiscoveryResponse;

    fn subscribers(&self) -> &SubscriberSet<Self::Event> {
        &self.subscribers
    }

    fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn snapshot(&self, key: &str) -> Option<Self::Event> {
        let service = self.registry.get(key)?;
        let added = service.instances.values().map(to_endpoint).collect();
        Some(endpoint_event(key, added, Vec::new(), Vec::new()))
    }

    fn kind(&self) -> &'static str {
        "endpoint"
    }
}

struct RegistryHandler {
    server: Arc<EndpointDiscovery>,
}

#[async_trait::async_trait]
impl ServiceEventHandler for RegistryHandler {
    async fn handle(&self, event: &ServiceEvent) {
        let endpoints: Vec<proto::Endpoint> =
            event.service.instances.values().map(to_endpoint).collect();
        let (added, updated, removed) = match event.kind {
            EventKind::Add => (endpoints, Vec::new(), Vec::new()),
            EventKind::Update => (Vec::new(), endpoints, Vec::new()),
            EventKind::Delete => (Vec::new(), Vec::new(), endpoints),
        };
        let name = &event.service.name;
        self.server
            .subscribers
            .dispatch(name, endpoint_event(name, added, updated, removed))
            .await;
    }
}

#[async_trait::async_trait]
impl InstanceEventHandler for RegistryHandler {
    async fn handle(&self, event: &InstanceEvent) {
        let endpoints: Vec<proto::Endpoint> = event.instances.iter().map(to_endpoint).collect();
        let (added, updated, removed) = match event.kind {
            EventKind::Add => (endpoints, Vec::new(), Vec::new()),
            EventKind::Update => (Vec::new(), endpoints, Vec::new()),
            EventKind::Delete => (Vec::new(), Vec::new(), endpoints),
        };
        let name = &event.service_name;
        self.server
            .subscribers
            .dispatch(name, endpoint_event(name, added, updated, removed))
            .await;
    }
}

fn endpoint_event(
    svc_name: &str,
    added: Vec<proto::Endpoint>,
    updated: Vec<proto::Endpoint>,
    removed: Vec<proto::Endpoint>,
) -> proto::SvcEndpointDiscoveryResponse {
    proto::SvcEndpointDiscoveryResponse {
        svc_name: svc_name.to_string(),
        added,
        updated,
        removed,
    }
}

fn to_endpoint(instance: &ServiceInstance) -> proto::Endpoint {
    proto::Endpoint {
        address: Some(proto::Address {
            ip: instance.ip.clone(),
            port: u32::from(instance.port),
        }),
        state: match instance.state {
            InstanceState::Healthy => proto::EndpointState::Healthy,
            InstanceState::Unhealthy => proto::EndpointState::Unhealthy,
        } as i32,
        meta: instance
            .meta
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}
