use crate::{
    EventKind, InstanceEvent, InstanceEventHandler, ServiceEvent, ServiceEventHandler,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use lattice_core::backoff::ExponentialBackoff;
use lattice_core::{RegistryError, Service, ServiceInstance, ServiceRegistry};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct CacheOptions {
    /// Interval between two sync passes when the last one succeeded.
    pub sync_freq: Duration,
    /// Fractional jitter applied to `sync_freq`.
    pub sync_jitter: f64,
    /// Retry schedule for fetching a single service during a sync.
    pub backoff: ExponentialBackoff,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            sync_freq: Duration::from_secs(5),
            sync_jitter: 0.2,
            backoff: ExponentialBackoff::new(),
        }
    }
}

/// Caches every registered service and emits change events between syncs.
///
/// Handlers must be registered before [`run`] is called; dispatch preserves
/// registration order and, within one sync, emits instance adds before
/// updates before deletes.
///
/// [`run`]: RegistryCache::run
#[derive(Clone)]
pub struct RegistryCache {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<dyn ServiceRegistry>,
    options: CacheOptions,
    services: RwLock<HashMap<String, Service>>,
    service_handlers: Mutex<Vec<Arc<dyn ServiceEventHandler>>>,
    instance_handlers: Mutex<Vec<Arc<dyn InstanceEventHandler>>>,
}

impl RegistryCache {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self::with_options(registry, CacheOptions::default())
    }

    pub fn with_options(registry: Arc<dyn ServiceRegistry>, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                options,
                services: RwLock::new(HashMap::new()),
                service_handlers: Mutex::new(Vec::new()),
                instance_handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn register_service_event_handler(&self, handler: Arc<dyn ServiceEventHandler>) {
        self.inner.service_handlers.lock().push(handler);
    }

    pub fn register_instance_event_handler(&self, handler: Arc<dyn InstanceEventHandler>) {
        self.inner.instance_handlers.lock().push(handler);
    }

    /// All cached service names.
    pub fn list(&self) -> Vec<String> {
        self.inner.services.read().keys().cloned().collect()
    }

    /// A deep copy of the cached service, if present.
    pub fn get(&self, name: &str) -> Option<Service> {
        self.inner.services.read().get(name).cloned()
    }

    /// Runs the underlying registry driver and the sync loop until the token
    /// is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let driver = {
            let registry = self.inner.registry.clone();
            let token = shutdown.clone();
            tokio::spawn(async move { registry.run(token).await })
        };

        let max_sync_interval =
            self.inner.options.sync_freq.mul_f64(1.0 + self.inner.options.sync_jitter);
        let mut backoff = self
            .inner
            .options
            .backoff
            .clone()
            .max_interval(max_sync_interval)
            .max_retries(u32::MAX);
        backoff.reset();

        loop {
            let started = Instant::now();
            let result = self.sync(&shutdown).await;
            if shutdown.is_cancelled() {
                break;
            }

            let interval = match result {
                Ok(()) => {
                    backoff.reset();
                    let jitter = self.inner.options.sync_jitter
                        * rand::thread_rng().gen_range(-1.0..=1.0);
                    let interval = self.inner.options.sync_freq.mul_f64(1.0 + jitter);
                    debug!(elapsed = ?started.elapsed(), next = ?interval, "synced services");
                    interval
                }
                Err(error) => {
                    let interval = backoff.next_backoff().unwrap_or(max_sync_interval);
                    warn!(%error, retry_in = ?interval, "failed to sync services");
                    interval
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        let _ = driver.await;
    }

    /// One full pass: list, prune, fetch each service with retry, diff.
    pub async fn sync(&self, shutdown: &CancellationToken) -> Result<(), RegistryError> {
        let names = self.inner.registry.list().await?;
        self.delete_outdated(&names).await;

        for name in &names {
            match self.get_with_retry(name, shutdown).await? {
                Some(service) => self.add_or_update(service).await,
                // Listed but gone by the time we fetched it: treat as absent.
                None => self.remove(name).await,
            }
        }
        Ok(())
    }

    async fn get_with_retry(
        &self,
        name: &str,
        shutdown: &CancellationToken,
    ) -> Result<Option<Service>, RegistryError> {
        let mut backoff = self.inner.options.backoff.clone();
        backoff.reset();
        loop {
            let error = match self.inner.registry.get(name).await {
                Ok(service) => return Ok(service),
                Err(error) => error,
            };
            let Some(delay) = backoff.next_backoff() else {
                return Err(error);
            };
            debug!(%name, %error, ?delay, "fetching service failed, retrying");
            tokio::select! {
                _ = shutdown.cancelled() => return Err(error),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn delete_outdated(&self, names: &[String]) {
        let keep: HashSet<&str> = names.iter().map(String::as_str).collect();
        let outdated: Vec<String> = self
            .inner
            .services
            .read()
            .keys()
            .filter(|name| !keep.contains(name.as_str()))
            .cloned()
            .collect();
        for name in outdated {
            self.remove(&name).await;
        }
    }

    async fn remove(&self, name: &str) {
        let removed = self.inner.services.write().remove(name);
        if let Some(service) = removed {
            self.dispatch_service_event(ServiceEvent {
                kind: EventKind::Delete,
                service,
            })
            .await;
        }
    }

    async fn add_or_update(&self, service: Service) {
        let previous = self.inner.services.read().get(&service.name).cloned();
        match previous {
            None => {
                self.inner
                    .services
                    .write()
                    .insert(service.name.clone(), service.clone());
                self.dispatch_service_event(ServiceEvent {
                    kind: EventKind::Add,
                    service,
                })
                .await;
            }
            Some(previous) => self.update(previous, service).await,
        }
    }

    async fn update(&self, previous: Service, next: Service) {
        let mut added = Vec::new();
        let mut updated = Vec::new();
        let mut removed = Vec::new();

        for (addr, instance) in &next.instances {
            match previous.instances.get(addr) {
                None => added.push(instance.clone()),
                Some(old) if old != instance => updated.push(instance.clone()),
                Some(_) => {}
            }
        }
        for (addr, instance) in &previous.instances {
            if !next.instances.contains_key(addr) {
                removed.push(instance.clone());
            }
        }

        let name = next.name.clone();
        self.inner.services.write().insert(name.clone(), next);

        // Adds go out first so a subscriber never sees a removal for an
        // instance it has not been told about.
        self.dispatch_instances(EventKind::Add, &name, added).await;
        self.dispatch_instances(EventKind::Update, &name, updated).await;
        self.dispatch_instances(EventKind::Delete, &name, removed).await;
    }

    async fn dispatch_instances(
        &self,
        kind: EventKind,
        service_name: &str,
        instances: Vec<ServiceInstance>,
    ) {
        if instances.is_empty() {
            return;
        }
        let event = InstanceEvent {
            kind,
            service_name: service_name.to_string(),
            instances,
        };
        let handlers = self.inner.instance_handlers.lock().clone();
        for handler in handlers {
            handler.handle(&event).await;
        }
    }

    async fn dispatch_service_event(&self, event: ServiceEvent) {
        let handlers = self.inner.service_handlers.lock().clone();
        for handler in handlers {
            handler.handle(&event).await;
        }
    }
}
