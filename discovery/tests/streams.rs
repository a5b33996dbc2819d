//! Loopback tests driving the discovery service over a real gRPC channel.

use lattice_config::{
    Controller, ControllerOptions, DependenciesController, Dependency, Listener, MemoryStore,
    Protocol, ProxyConfig, ProxyConfigSpec, ProxyConfigsController,
};
use lattice_core::backoff::ExponentialBackoff;
use lattice_core::{Service, ServiceInstance};
use lattice_discovery::proto::discovery_service_client::DiscoveryServiceClient;
use lattice_discovery::proto::{
    DependencyDiscoveryRequest, Instance, SvcConfigDiscoveryRequest, SvcEndpointDiscoveryRequest,
};
use lattice_discovery::DiscoveryServer;
use lattice_registry::{CacheOptions, MemoryRegistry, RegistryCache};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;

const WAIT: Duration = Duration::from_secs(10);

struct Stack {
    addr: SocketAddr,
    controller: Controller,
    dependencies: DependenciesController,
    proxy_configs: ProxyConfigsController,
    registry: Arc<MemoryRegistry>,
    registry_cache: RegistryCache,
    shutdown: CancellationToken,
}

impl Stack {
    async fn start() -> Self {
        let fast_backoff = ExponentialBackoff::new()
            .initial_interval(Duration::from_millis(5))
            .max_interval(Duration::from_millis(20))
            .max_retries(3);

        let store = Arc::new(MemoryStore::new());
        let controller = Controller::with_options(
            store,
            ControllerOptions {
                sync_interval: Duration::from_millis(100),
                backoff: fast_backoff.clone(),
            },
        );
        let dependencies = controller.dependencies();
        let proxy_configs = controller.proxy_configs();

        let registry = Arc::new(MemoryRegistry::default());
        let registry_cache = RegistryCache::with_options(
            registry.clone(),
            CacheOptions {
                sync_freq: Duration::from_millis(50),
                sync_jitter: 0.0,
                backoff: fast_backoff,
            },
        );

        let shutdown = CancellationToken::new();
        let server = DiscoveryServer::new(
            registry_cache.clone(),
            proxy_configs.clone(),
            dependencies.clone(),
            shutdown.clone(),
        );

        controller.start().await.expect("controller start");
        {
            let cache = registry_cache.clone();
            let token = shutdown.clone();
            tokio::spawn(async move { cache.run(token).await });
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(
            tonic::transport::Server::builder()
                .add_service(server.svc())
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );

        Self {
            addr,
            controller,
            dependencies,
            proxy_configs,
            registry,
            registry_cache,
            shutdown,
        }
    }

    async fn client(&self) -> DiscoveryServiceClient<Channel> {
        let url = format!("http://{}", self.addr);
        for _ in 0..100 {
            if let Ok(client) = DiscoveryServiceClient::connect(url.clone()).await {
                return client;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("discovery server never came up on {url}");
    }

    /// Waits until the controller's cache holds the given entry.
    async fn wait_cached(&self, namespace: &str, ty: &str, key: &str) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if self.controller.get_cache(namespace, ty, key).is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{namespace}/{ty}/{key} never became cached");
    }

    async fn wait_service_cached(&self, name: &str) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if self.registry_cache.get(name).is_some() {
                // Give the in-flight add event a moment to drain so fresh
                // subscribers see exactly one snapshot.
                tokio::time::sleep(Duration::from_millis(150)).await;
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("service {name} never became cached");
    }
}

async fn next<T>(stream: &mut tonic::codec::Streaming<T>) -> T {
    tokio::time::timeout(WAIT, stream.message())
        .await
        .expect("timed out waiting for a stream message")
        .expect("stream errored")
        .expect("stream ended")
}

fn sorted(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort();
    names
}

#[tokio::test]
async fn dependency_stream_sends_snapshot_then_diffs() {
    let stack = Stack::start().await;
    stack
        .dependencies
        .add(&Dependency::new("svc", vec!["a".into(), "b".into()]))
        .await
        .unwrap();
    stack.wait_cached("service", "dependency", "svc").await;

    let mut client = stack.client().await;
    let request = DependencyDiscoveryRequest {
        instance: Some(Instance {
            id: "inst-1".to_string(),
            belong: "svc".to_string(),
            ..Default::default()
        }),
    };
    let mut stream = client
        .stream_dependencies(request)
        .await
        .unwrap()
        .into_inner();

    let first = next(&mut stream).await;
    assert_eq!(
        sorted(first.added.into_iter().map(|s| s.name)),
        vec!["a", "b"]
    );
    assert!(first.removed.is_empty());

    stack
        .dependencies
        .update(&Dependency::new("svc", vec!["b".into(), "c".into()]))
        .await
        .unwrap();

    let second = next(&mut stream).await;
    assert_eq!(sorted(second.added.into_iter().map(|s| s.name)), vec!["c"]);
    assert_eq!(
        sorted(second.removed.into_iter().map(|s| s.name)),
        vec!["a"]
    );

    stack.shutdown.cancel();
}

#[tokio::test]
async fn dependency_stream_requires_an_owning_service() {
    let stack = Stack::start().await;
    let mut client = stack.client().await;
    let request = DependencyDiscoveryRequest {
        instance: Some(Instance {
            id: "inst-1".to_string(),
            ..Default::default()
        }),
    };
    let status = client.stream_dependencies(request).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    stack.shutdown.cancel();
}

#[tokio::test]
async fn endpoint_stream_sends_snapshot_then_delta() {
    let stack = Stack::start().await;
    stack.registry.register(Service::new(
        "foo",
        vec![ServiceInstance::new("127.0.0.1", 8888)],
    ));
    stack.wait_service_cached("foo").await;

    let mut client = stack.client().await;
    let (tx, rx) = mpsc::channel(4);
    tx.send(SvcEndpointDiscoveryRequest {
        svc_names_subscribe: vec!["foo".to_string()],
        ..Default::default()
    })
    .await
    .unwrap();

    let mut stream = client
        .stream_svc_endpoints(tonic::Request::new(ReceiverStream::new(rx)))
        .await
        .unwrap()
        .into_inner();

    let first = next(&mut stream).await;
    assert_eq!(first.svc_name, "foo");
    assert_eq!(first.added.len(), 1);
    let address = first.added[0].address.as_ref().unwrap();
    assert_eq!((address.ip.as_str(), address.port), ("127.0.0.1", 8888));
    assert!(first.removed.is_empty());

    stack
        .registry
        .add_instances("foo", vec![ServiceInstance::new("127.0.0.1", 8889)]);

    let second = next(&mut stream).await;
    assert_eq!(second.svc_name, "foo");
    assert_eq!(second.added.len(), 1);
    let address = second.added[0].address.as_ref().unwrap();
    assert_eq!((address.ip.as_str(), address.port), ("127.0.0.1", 8889));
    assert!(second.removed.is_empty());

    drop(tx);
    stack.shutdown.cancel();
}

#[tokio::test]
async fn config_stream_sends_null_after_delete() {
    let stack = Stack::start().await;
    let spec = ProxyConfigSpec {
        listener: Listener {
            address: "127.0.0.1:7700".to_string(),
        },
        protocol: Protocol::Tcp,
        lb_policy: None,
        connect_timeout_ms: None,
        idle_timeout_ms: None,
    };
    stack
        .proxy_configs
        .add(&ProxyConfig::new("svc", Some(spec)))
        .await
        .unwrap();
    stack.wait_cached("service", "proxy-config", "svc").await;

    let mut client = stack.client().await;
    let (tx, rx) = mpsc::channel(4);
    tx.send(SvcConfigDiscoveryRequest {
        svc_names_subscribe: vec!["svc".to_string()],
        ..Default::default()
    })
    .await
    .unwrap();

    let mut stream = client
        .stream_svc_configs(tonic::Request::new(ReceiverStream::new(rx)))
        .await
        .unwrap()
        .into_inner();

    let first = next(&mut stream).await;
    let snapshot = &first.updated["svc"];
    let config = snapshot.config.as_ref().expect("initial config present");
    let address = config
        .listener
        .as_ref()
        .unwrap()
        .address
        .as_ref()
        .unwrap();
    assert_eq!((address.ip.as_str(), address.port), ("127.0.0.1", 7700));

    stack.proxy_configs.delete("svc").await.unwrap();

    let second = next(&mut stream).await;
    assert!(
        second.updated["svc"].config.is_none(),
        "a deleted config streams as an empty snapshot"
    );

    drop(tx);
    stack.shutdown.cancel();
}
