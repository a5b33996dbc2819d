use crate::event::HandlerList;
use crate::{
    Cache, ConfigEventHandler, ConfigError, DependenciesController, Event, EventKind,
    InstancesController, Metadata, ProxyConfigsController, RawConfig, Store, INTERESTED,
};
use ahash::AHashSet as HashSet;
use arc_swap::ArcSwap;
use lattice_core::backoff::ExponentialBackoff;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ControllerOptions {
    /// How often to reconcile when the store stays quiet.
    pub sync_interval: Duration,
    /// Retry schedule applied to every store call during a reconcile.
    pub backoff: ExponentialBackoff,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            backoff: ExponentialBackoff::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Keeps an in-memory [`Cache`] in sync with the store for the interested
/// `(namespace, type)` pairs and dispatches raw events on every change.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn Store>,
    options: ControllerOptions,

    cache: ArcSwap<Cache>,
    handlers: HandlerList<dyn ConfigEventHandler>,

    update: Notify,
    shutdown: CancellationToken,
    state: Mutex<ControllerState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_options(store, ControllerOptions::default())
    }

    pub fn with_options(store: Arc<dyn Store>, options: ControllerOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                options,
                cache: ArcSwap::from_pointee(Cache::new()),
                handlers: HandlerList::default(),
                update: Notify::new(),
                shutdown: CancellationToken::new(),
                state: Mutex::new(ControllerState::Idle),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> ControllerState {
        *self.inner.state.lock()
    }

    /// Starts the store, subscribes the interested namespaces, and launches
    /// the trigger and reconcile tasks. One reconcile is enqueued right away.
    pub async fn start(&self) -> Result<(), ConfigError> {
        *self.inner.state.lock() = ControllerState::Starting;
        self.inner.store.start().await?;

        let namespaces: HashSet<&str> = INTERESTED.iter().map(|(ns, _)| *ns).collect();
        for namespace in namespaces {
            self.inner.store.subscribe(namespace)?;
        }
        let store_events = self.inner.store.events();

        let trigger = tokio::spawn(trigger_loop(self.inner.clone(), store_events));
        let reconcile = tokio::spawn(reconcile_loop(self.inner.clone()));
        {
            let mut tasks = self.inner.tasks.lock();
            tasks.push(trigger);
            tasks.push(reconcile);
        }

        self.trigger_update();
        *self.inner.state.lock() = ControllerState::Running;
        Ok(())
    }

    /// Stops both tasks and the store. Safe to call once.
    pub async fn stop(&self) {
        *self.inner.state.lock() = ControllerState::Stopping;
        self.inner.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        self.inner.store.stop().await;
        *self.inner.state.lock() = ControllerState::Stopped;
    }

    /// Enqueues a reconcile; repeated calls coalesce into one.
    pub fn trigger_update(&self) {
        self.inner.update.notify_one();
    }

    pub fn register_event_handler(&self, handler: Arc<dyn ConfigEventHandler>) {
        self.inner.handlers.register(handler);
    }

    // Pass-through mutations; the next reconcile picks the result up.

    pub async fn add(&self, namespace: &str, ty: &str, key: &str, value: Vec<u8>)
        -> Result<(), ConfigError>
    {
        self.inner.store.add(namespace, ty, key, value).await
    }

    pub async fn update(&self, namespace: &str, ty: &str, key: &str, value: Vec<u8>)
        -> Result<(), ConfigError>
    {
        self.inner.store.update(namespace, ty, key, value).await
    }

    pub async fn delete(&self, namespace: &str, ty: &str, key: &str) -> Result<(), ConfigError> {
        self.inner.store.delete(namespace, ty, key).await
    }

    pub async fn exists(&self, namespace: &str, ty: &str, key: &str) -> bool {
        self.inner.store.exists(namespace, ty, key).await
    }

    /// Reads straight from the store.
    pub async fn get(&self, namespace: &str, ty: &str, key: &str)
        -> Result<(Vec<u8>, Metadata), ConfigError>
    {
        self.inner.store.get(namespace, ty, key).await
    }

    pub async fn keys(&self, namespace: &str, ty: &str) -> Result<Vec<String>, ConfigError> {
        self.inner.store.get_keys(namespace, ty).await
    }

    /// Reads from the last reconciled snapshot.
    pub fn get_cache(&self, namespace: &str, ty: &str, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.inner.cache.load().get(namespace, ty, key).map(<[u8]>::to_vec)
    }

    pub fn get_cache_raw(&self, namespace: &str, ty: &str, key: &str)
        -> Result<RawConfig, ConfigError>
    {
        self.inner
            .cache
            .load()
            .get_raw(namespace, ty, key)
            .cloned()
            .ok_or(ConfigError::NotExist)
    }

    pub fn keys_cached(&self, namespace: &str, ty: &str) -> Result<Vec<String>, ConfigError> {
        self.inner.cache.load().keys(namespace, ty)
    }

    pub fn dependencies(&self) -> DependenciesController {
        DependenciesController::new(self)
    }

    pub fn proxy_configs(&self) -> ProxyConfigsController {
        ProxyConfigsController::new(self)
    }

    pub fn instances(&self) -> InstancesController {
        InstancesController::new(self)
    }
}

/// Fires the update signal on every sync tick and on every store change.
async fn trigger_loop(inner: Arc<Inner>, mut store_events: Option<mpsc::Receiver<()>>) {
    let period = inner.options.sync_interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            _ = ticker.tick() => {}
            _ = store_changed(&mut store_events) => {}
        }
        inner.update.notify_one();
    }
}

async fn store_changed(events: &mut Option<mpsc::Receiver<()>>) {
    match events {
        Some(rx) => {
            if rx.recv().await.is_none() {
                // Sender dropped; fall back to the periodic tick alone.
                *events = None;
            }
        }
        None => std::future::pending().await,
    }
}

async fn reconcile_loop(inner: Arc<Inner>) {
    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            _ = inner.update.notified() => {}
        }

        match inner.fetch_all().await {
            Ok(fresh) => inner.apply(fresh).await,
            Err(ConfigError::Cancelled) => return,
            Err(error) => warn!(%error, "failed to load configuration from the store"),
        }
    }
}

impl Inner {
    /// Builds a fresh snapshot of every interested entry, retrying each
    /// store call under the configured backoff. `NotExist` means absent and
    /// is not retried.
    async fn fetch_all(&self) -> Result<Cache, ConfigError> {
        let mut cache = Cache::new();
        for (namespace, ty) in INTERESTED {
            let Some(keys) = self.get_keys_with_retry(namespace, ty).await? else {
                continue;
            };
            for key in keys {
                let Some((value, metadata)) = self.get_with_retry(namespace, ty, &key).await?
                else {
                    continue;
                };
                cache.insert(RawConfig::new(*namespace, *ty, key, value).with_metadata(metadata));
            }
        }
        Ok(cache)
    }

    async fn get_keys_with_retry(&self, namespace: &str, ty: &str)
        -> Result<Option<Vec<String>>, ConfigError>
    {
        let mut backoff = self.options.backoff.clone();
        backoff.reset();
        loop {
            match self.store.get_keys(namespace, ty).await {
                Ok(keys) => return Ok(Some(keys)),
                Err(ConfigError::NotExist) => return Ok(None),
                Err(error) => self.wait_or_give_up(&mut backoff, error).await?,
            }
        }
    }

    async fn get_with_retry(&self, namespace: &str, ty: &str, key: &str)
        -> Result<Option<(Vec<u8>, Metadata)>, ConfigError>
    {
        let mut backoff = self.options.backoff.clone();
        backoff.reset();
        loop {
            match self.store.get(namespace, ty, key).await {
                Ok(entry) => return Ok(Some(entry)),
                Err(ConfigError::NotExist) => return Ok(None),
                Err(error) => self.wait_or_give_up(&mut backoff, error).await?,
            }
        }
    }

    async fn wait_or_give_up(
        &self,
        backoff: &mut ExponentialBackoff,
        error: ConfigError,
    ) -> Result<(), ConfigError> {
        let Some(delay) = backoff.next_backoff() else {
            return Err(error);
        };
        debug!(%error, ?delay, "store call failed, retrying");
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(ConfigError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Diffs the fresh snapshot against the current one (including the empty
    /// initial cache, so startup emits adds), dispatches the events, then
    /// swaps the snapshot in.
    async fn apply(&self, fresh: Cache) {
        let current = self.cache.load_full();
        let (added, updated, deleted) = current.diff(&fresh);

        for config in added {
            self.dispatch(Event::new(EventKind::Add, config)).await;
        }
        for config in updated {
            self.dispatch(Event::new(EventKind::Update, config)).await;
        }
        for config in deleted {
            self.dispatch(Event::new(EventKind::Delete, config)).await;
        }

        self.cache.store(Arc::new(fresh));
    }

    async fn dispatch(&self, event: Event) {
        for handler in self.handlers.load().iter() {
            handler.handle(&event).await;
        }
    }
}
