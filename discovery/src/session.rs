use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::ReceiverStream, Stream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Outbound queue depth per session; a full queue blocks the dispatcher.
pub(crate) const EVENT_BUFFER: usize = 64;

/// The boxed response stream every discovery method hands back to tonic.
pub type BoxStream<T> =
    Pin<Box<dyn Stream<Item = Result<T, tonic::Status>> + Send + 'static>>;

/// The dispatcher-facing side of one streaming session: a bounded event
/// queue plus the session's quit signal.
pub(crate) struct SessionHandle<E> {
    pub(crate) id: u64,
    pub(crate) peer: String,
    tx: mpsc::Sender<E>,
    quit: CancellationToken,
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            peer: self.peer.clone(),
            tx: self.tx.clone(),
            quit: self.quit.clone(),
        }
    }
}

impl<E> SessionHandle<E> {
    pub(crate) fn new(id: u64, peer: String, tx: mpsc::Sender<E>, quit: CancellationToken) -> Self {
        Self { id, peer, tx, quit }
    }

    /// Enqueues an event for the session. Blocks while the queue is full;
    /// a session that is shutting down drops the event instead of blocking
    /// its dispatcher.
    pub(crate) async fn send(&self, event: E) {
        tokio::select! {
            _ = self.quit.cancelled() => {}
            result = self.tx.send(event) => {
                let _ = result;
            }
        }
    }
}

/// Server-side subscription registry: subscription key to live sessions.
pub(crate) struct SubscriberSet<E> {
    subscribers: RwLock<HashMap<String, HashMap<u64, SessionHandle<E>>>>,
    next_session_id: AtomicU64,
}

impl<E> Default for SubscriberSet<E> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        }
    }
}

impl<E> SubscriberSet<E> {
    pub(crate) fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Inserts the session under `key`, idempotently, and sends it the
    /// snapshot (when there is one) as its first event. The write lock is
    /// held across the snapshot send so a concurrent dispatch can never
    /// slip in ahead of it.
    ///
    /// Returns false when the session was already subscribed; no snapshot
    /// is sent in that case.
    pub(crate) async fn subscribe(
        &self,
        key: &str,
        handle: &SessionHandle<E>,
        snapshot: impl FnOnce() -> Option<E>,
    ) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let sessions = subscribers.entry(key.to_string()).or_default();
        if sessions.contains_key(&handle.id) {
            return false;
        }
        sessions.insert(handle.id, handle.clone());
        if let Some(event) = snapshot() {
            handle.send(event).await;
        }
        true
    }

    /// Removes the session from `key`. The outer entry stays in place even
    /// when it empties; the set is bounded by the number of distinct keys.
    pub(crate) async fn unsubscribe(&self, key: &str, session_id: u64) {
        if let Some(sessions) = self.subscribers.write().await.get_mut(key) {
            sessions.remove(&session_id);
        }
    }

    /// Sends the event to every session subscribed to `key`, in turn. A slow
    /// subscriber blocks the dispatcher rather than losing the event.
    pub(crate) async fn dispatch(&self, key: &str, event: E)
    where
        E: Clone,
    {
        let subscribers = self.subscribers.read().await;
        if let Some(sessions) = subscribers.get(key) {
            for handle in sessions.values() {
                handle.send(event.clone()).await;
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn subscriber_count(&self, key: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(key)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Wraps a session's outbound stream so that dropping it (tonic ends the
/// RPC) cancels the session's quit token and the serving task winds down.
pub(crate) struct SessionStream<S> {
    inner: S,
    _guard: tokio_util::sync::DropGuard,
}

impl<S> SessionStream<S> {
    pub(crate) fn new(inner: S, quit: CancellationToken) -> Self {
        Self {
            inner,
            _guard: quit.drop_guard(),
        }
    }
}

impl<S: Stream + Unpin> Stream for SessionStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// A request message that carries subscribe/unsubscribe name lists.
pub(crate) trait SubscriptionRequest: Send + 'static {
    fn into_names(self) -> (Vec<String>, Vec<String>);
}

/// A discovery server whose sessions subscribe to string keys.
pub(crate) trait SubscriptionServer: Send + Sync + 'static {
    type Event: Clone + Send + 'static;

    fn subscribers(&self) -> &SubscriberSet<Self::Event>;
    fn shutdown(&self) -> &CancellationToken;
    /// The current state for `key`, sent as a session's first event on
    /// subscribe. `None` means no entry and no initial event.
    fn snapshot(&self, key: &str) -> Option<Self::Event>;
    fn kind(&self) -> &'static str;
}

/// Serves one bidirectional subscription session: a receive task applies
/// subscribe/unsubscribe messages while the session task forwards queued
/// events outbound. Teardown cancels the quit token, joins the receive task
/// and unsubscribes every key the session still holds.
pub(crate) fn serve_subscriptions<S, R>(
    server: Arc<S>,
    peer: String,
    requests: tonic::Streaming<R>,
) -> BoxStream<S::Event>
where
    S: SubscriptionServer,
    R: SubscriptionRequest,
{
    let quit = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let handle = SessionHandle::new(
        server.subscribers().next_session_id(),
        peer,
        event_tx,
        quit.clone(),
    );
    let (out_tx, out_rx) = mpsc::channel(4);

    let recv = tokio::spawn(recv_loop(server.clone(), handle.clone(), requests));
    tokio::spawn(session_loop(server, handle, recv, event_rx, out_tx));

    Box::pin(SessionStream::new(ReceiverStream::new(out_rx), quit))
}

async fn recv_loop<S, R>(
    server: Arc<S>,
    handle: SessionHandle<S::Event>,
    mut requests: tonic::Streaming<R>,
) -> HashSet<String>
where
    S: SubscriptionServer,
    R: SubscriptionRequest,
{
    let mut subscribed = HashSet::new();
    loop {
        let message = tokio::select! {
            _ = handle.quit.cancelled() => break,
            message = requests.message() => message,
        };
        match message {
            Ok(Some(request)) => {
                let (subscribe, unsubscribe) = request.into_names();
                for name in subscribe {
                    if subscribed.contains(&name) {
                        continue;
                    }
                    server
                        .subscribers()
                        .subscribe(&name, &handle, || server.snapshot(&name))
                        .await;
                    subscribed.insert(name);
                }
                for name in unsubscribe {
                    if subscribed.remove(&name) {
                        server.subscribers().unsubscribe(&name, handle.id).await;
                    }
                }
            }
            Ok(None) => break,
            Err(error) => {
                debug!(
                    kind = server.kind(),
                    peer = %handle.peer,
                    %error,
                    "failed to read from subscription stream"
                );
                break;
            }
        }
    }
    subscribed
}

async fn session_loop<S>(
    server: Arc<S>,
    handle: SessionHandle<S::Event>,
    mut recv: JoinHandle<HashSet<String>>,
    mut event_rx: mpsc::Receiver<S::Event>,
    out_tx: mpsc::Sender<Result<S::Event, tonic::Status>>,
) where
    S: SubscriptionServer,
{
    let quit = handle.quit.clone();
    let subscribed = loop {
        tokio::select! {
            joined = &mut recv => break joined.unwrap_or_default(),
            _ = quit.cancelled() => break recv.await.unwrap_or_default(),
            _ = server.shutdown().cancelled() => {
                quit.cancel();
                break recv.await.unwrap_or_default();
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break recv.await.unwrap_or_default();
                };
                if out_tx.send(Ok(event)).await.is_err() {
                    quit.cancel();
                    break recv.await.unwrap_or_default();
                }
            }
        }
    };

    quit.cancel();
    for name in subscribed {
        server.subscribers().unsubscribe(&name, handle.id).await;
    }
    debug!(kind = server.kind(), peer = %handle.peer, "discovery session closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(set: &SubscriberSet<u32>, buffer: usize) -> (SessionHandle<u32>, mpsc::Receiver<u32>) {
        let (tx, rx) = mpsc::channel(buffer);
        let handle = SessionHandle::new(
            set.next_session_id(),
            "test".to_string(),
            tx,
            CancellationToken::new(),
        );
        (handle, rx)
    }

    #[tokio::test]
    async fn subscribing_twice_sends_one_snapshot_and_one_membership() {
        let set = SubscriberSet::default();
        let (handle, mut rx) = handle(&set, 4);

        assert!(set.subscribe("foo", &handle, || Some(1)).await);
        assert!(!set.subscribe("foo", &handle, || Some(2)).await);

        assert_eq!(set.subscriber_count("foo").await, 1);
        assert_eq!(rx.recv().await, Some(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_drops_the_membership() {
        let set = SubscriberSet::default();
        let (handle, _rx) = handle(&set, 4);
        set.subscribe("foo", &handle, || None).await;
        set.unsubscribe("foo", handle.id).await;
        assert_eq!(set.subscriber_count("foo").await, 0);

        set.dispatch("foo", 9).await; // nobody left; must not block
    }

    #[tokio::test]
    async fn dispatch_preserves_order_per_session() {
        let set = SubscriberSet::default();
        let (handle, mut rx) = handle(&set, 4);
        set.subscribe("foo", &handle, || None).await;

        set.dispatch("foo", 1).await;
        set.dispatch("foo", 2).await;
        set.dispatch("foo", 3).await;
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn a_quitting_session_never_blocks_its_dispatcher() {
        let set = SubscriberSet::default();
        let (tx, _rx) = mpsc::channel(1);
        let quit = CancellationToken::new();
        let handle =
            SessionHandle::new(set.next_session_id(), "test".to_string(), tx, quit.clone());
        set.subscribe("foo", &handle, || None).await;

        set.dispatch("foo", 1).await; // fills the queue
        quit.cancel();
        // Queue is full and nobody is draining it, but the quit token lets
        // the dispatcher move on.
        tokio::time::timeout(std::time::Duration::from_secs(1), set.dispatch("foo", 2))
            .await
            .expect("dispatch must not block a dead session");
    }
}
