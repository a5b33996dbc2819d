#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The streaming discovery service: endpoints, proxy configs and dependency
//! lists, multiplexed to many long-lived sidecar sessions with per-session
//! isolation and initial-snapshot semantics.

mod config;
mod dependency;
mod endpoint;
pub mod proto;
mod session;

pub use self::session::BoxStream;

use self::config::ConfigDiscovery;
use self::dependency::DependencyDiscovery;
use self::endpoint::EndpointDiscovery;
use self::proto::discovery_service_server::{DiscoveryService, DiscoveryServiceServer};
use futures::FutureExt;
use lattice_config::{DependenciesController, ProxyConfigsController};
use lattice_registry::RegistryCache;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// The discovery API implementation behind all three streaming methods.
#[derive(Clone)]
pub struct DiscoveryServer {
    endpoints: Arc<EndpointDiscovery>,
    configs: Arc<ConfigDiscovery>,
    dependencies: Arc<DependencyDiscovery>,
    shutdown: CancellationToken,
}

impl DiscoveryServer {
    /// Wires the three stream servers onto their upstream caches. Handlers
    /// are registered here, so this must run before the registry cache and
    /// configuration controller start moving.
    pub fn new(
        registry: RegistryCache,
        proxy_configs: ProxyConfigsController,
        dependencies: DependenciesController,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            endpoints: EndpointDiscovery::new(registry, shutdown.clone()),
            configs: ConfigDiscovery::new(proxy_configs, shutdown.clone()),
            dependencies: DependencyDiscovery::new(dependencies, shutdown.clone()),
            shutdown,
        }
    }

    pub fn svc(self) -> DiscoveryServiceServer<Self> {
        DiscoveryServiceServer::new(self)
    }

    /// Serves the API on `addr` until the drain watch fires, then stops
    /// accepting, cancels every live session and lets in-flight work finish.
    pub async fn serve(
        self,
        addr: SocketAddr,
        drain: drain::Watch,
    ) -> Result<(), tonic::transport::Error> {
        let shutdown = self.shutdown.clone();
        let svc = self.svc();

        let (close_tx, close_rx) = tokio::sync::oneshot::channel();
        tokio::pin! {
            let srv = tonic::transport::Server::builder()
                .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
                .http2_keepalive_timeout(Some(KEEPALIVE_TIMEOUT))
                .add_service(svc)
                .serve_with_shutdown(addr, close_rx.map(|_| {}));
        }

        info!(%addr, "discovery gRPC server listening");
        tokio::select! {
            res = (&mut srv) => {
                shutdown.cancel();
                res?
            }
            handle = drain.signaled() => {
                let _ = close_tx.send(());
                shutdown.cancel();
                handle.release_after(srv).await?
            }
        }
        Ok(())
    }
}

fn peer_of<T>(request: &tonic::Request<T>) -> String {
    request
        .remote_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[tonic::async_trait]
impl DiscoveryService for DiscoveryServer {
    type StreamSvcEndpointsStream = BoxStream<proto::SvcEndpointDiscoveryResponse>;

    async fn stream_svc_endpoints(
        &self,
        request: tonic::Request<tonic::Streaming<proto::SvcEndpointDiscoveryRequest>>,
    ) -> Result<tonic::Response<Self::StreamSvcEndpointsStream>, tonic::Status> {
        let peer = peer_of(&request);
        let stream = self.endpoints.clone().stream(peer, request.into_inner());
        Ok(tonic::Response::new(stream))
    }

    type StreamSvcConfigsStream = BoxStream<proto::SvcConfigDiscoveryResponse>;

    async fn stream_svc_configs(
        &self,
        request: tonic::Request<tonic::Streaming<proto::SvcConfigDiscoveryRequest>>,
    ) -> Result<tonic::Response<Self::StreamSvcConfigsStream>, tonic::Status> {
        let peer = peer_of(&request);
        let stream = self.configs.clone().stream(peer, request.into_inner());
        Ok(tonic::Response::new(stream))
    }

    type StreamDependenciesStream = BoxStream<proto::DependencyDiscoveryResponse>;

    async fn stream_dependencies(
        &self,
        request: tonic::Request<proto::DependencyDiscoveryRequest>,
    ) -> Result<tonic::Response<Self::StreamDependenciesStream>, tonic::Status> {
        let peer = peer_of(&request);
        let instance = request
            .into_inner()
            .instance
            .ok_or_else(|| tonic::Status::invalid_argument("instance is required"))?;
        if instance.id.is_empty() {
            return Err(tonic::Status::invalid_argument("instance.id is required"));
        }
        if instance.belong.is_empty() {
            return Err(tonic::Status::invalid_argument(format!(
                "instance {}: belong is required",
                instance.id
            )));
        }

        let stream = self.dependencies.clone().stream(peer, instance.belong);
        Ok(tonic::Response::new(stream))
    }
}
