use crate::proto;
use crate::session::{BoxStream, SessionHandle, SessionStream, SubscriberSet, EVENT_BUFFER};
use lattice_config::{
    ConfigError, DependenciesController, DependencyEvent, DependencyEventHandler,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Streams dependency diffs to sessions keyed by their owning service. The
/// stream is server-side only: the single request names the instance and its
/// owning service, and the session follows exactly that one key.
pub(crate) struct DependencyDiscovery {
    dependencies: DependenciesController,
    subscribers: SubscriberSet<proto::DependencyDiscoveryResponse>,
    shutdown: CancellationToken,
}

impl DependencyDiscovery {
    pub(crate) fn new(
        dependencies: DependenciesController,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let server = Arc::new(Self {
            dependencies: dependencies.clone(),
            subscribers: SubscriberSet::default(),
            shutdown,
        });
        dependencies.register_event_handler(Arc::new(Handler {
            server: server.clone(),
        }));
        server
    }

    fn snapshot(&self, belong: &str) -> Option<proto::DependencyDiscoveryResponse> {
        match self.dependencies.get_cached(belong) {
            Ok(dependency) => Some(dependency_event(&dependency.dependencies, &[])),
            Err(ConfigError::NotExist) => None,
            Err(error) => {
                warn!(service = %belong, %error, "unreadable cached dependency list");
                None
            }
        }
    }

    pub(crate) fn stream(
        self: Arc<Self>,
        peer: String,
        belong: String,
    ) -> BoxStream<proto::DependencyDiscoveryResponse> {
        let quit = CancellationToken::new();
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
        let handle = SessionHandle::new(
            self.subscribers.next_session_id(),
            peer,
            event_tx,
            quit.clone(),
        );
        let (out_tx, out_rx) = mpsc::channel(4);

        let server = self.clone();
        let session_quit = quit.clone();
        tokio::spawn(async move {
            server
                .subscribers
                .subscribe(&belong, &handle, || server.snapshot(&belong))
                .await;

            loop {
                tokio::select! {
                    _ = session_quit.cancelled() => break,
                    _ = server.shutdown.cancelled() => break,
                    event = event_rx.recv() => {
                        let Some(event) = event else { break };
                        if out_tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                }
            }

            session_quit.cancel();
            server.subscribers.unsubscribe(&belong, handle.id).await;
            debug!(kind = "dependency", peer = %handle.peer, "discovery session closed");
        });

        Box::pin(SessionStream::new(ReceiverStream::new(out_rx), quit))
    }
}

struct Handler {
    server: Arc<DependencyDiscovery>,
}

#[async_trait::async_trait]
impl DependencyEventHandler for Handler {
    async fn handle(&self, event: &DependencyEvent) {
        self.server
            .subscribers
            .dispatch(
                &event.service_name,
                dependency_event(&event.added, &event.removed),
            )
            .await;
    }
}

fn dependency_event(added: &[String], removed: &[String]) -> proto::DependencyDiscoveryResponse {
    proto::DependencyDiscoveryResponse {
        added: to_services(added),
        removed: to_services(removed),
    }
}

fn to_services(names: &[String]) -> Vec<proto::Service> {
    names
        .iter()
        .map(|name| proto::Service { name: name.clone() })
        .collect()
}
