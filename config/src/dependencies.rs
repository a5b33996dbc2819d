use crate::event::HandlerList;
use crate::{
    ConfigEventHandler, ConfigError, Controller, Event, EventKind, Metadata, NAMESPACE_SERVICE,
    TYPE_DEPENDENCY,
};
use ahash::AHashMap as HashMap;
use lattice_core::diff::symmetric_diff;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// The dependency list of one service: the services it calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(flatten)]
    pub metadata: Option<Metadata>,
    pub service_name: String,
    pub dependencies: Vec<String>,
}

impl Dependency {
    pub fn new(service_name: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            metadata: None,
            service_name: service_name.into(),
            dependencies,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::Validation("service_name is empty".into()));
        }
        Ok(())
    }
}

/// A dependency change reported as a set difference against the previous
/// list: an add carries the full list as `added`, a delete the full list as
/// `removed`, and an update the two-sided diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyEvent {
    pub service_name: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[async_trait::async_trait]
pub trait DependencyEventHandler: Send + Sync {
    async fn handle(&self, event: &DependencyEvent);
}

/// Typed view over the `service/dependency` entries of a [`Controller`].
#[derive(Clone)]
pub struct DependenciesController {
    ctl: Controller,
    shared: Arc<Shared>,
}

struct Shared {
    // Guards the last-known list per service across the whole
    // read-diff-dispatch-write sequence, so the snapshot path never observes
    // a half-applied update.
    last: tokio::sync::Mutex<HashMap<String, Vec<String>>>,
    handlers: HandlerList<dyn DependencyEventHandler>,
}

fn decode(value: &[u8]) -> Result<Vec<String>, ConfigError> {
    Ok(serde_json::from_slice(value)?)
}

fn encode(dependencies: &[String]) -> Result<Vec<u8>, ConfigError> {
    Ok(serde_json::to_vec(dependencies)?)
}

impl DependenciesController {
    pub(crate) fn new(ctl: &Controller) -> Self {
        let shared = Arc::new(Shared {
            last: tokio::sync::Mutex::new(HashMap::new()),
            handlers: HandlerList::default(),
        });
        ctl.register_event_handler(Arc::new(RawHandler {
            shared: shared.clone(),
        }));
        Self {
            ctl: ctl.clone(),
            shared,
        }
    }

    pub fn register_event_handler(&self, handler: Arc<dyn DependencyEventHandler>) {
        self.shared.handlers.register(handler);
    }

    pub async fn get(&self, service: &str) -> Result<Dependency, ConfigError> {
        let (value, metadata) = self.ctl.get(NAMESPACE_SERVICE, TYPE_DEPENDENCY, service).await?;
        Ok(Dependency {
            metadata: Some(metadata),
            service_name: service.to_string(),
            dependencies: decode(&value)?,
        })
    }

    pub fn get_cached(&self, service: &str) -> Result<Dependency, ConfigError> {
        let raw = self.ctl.get_cache_raw(NAMESPACE_SERVICE, TYPE_DEPENDENCY, service)?;
        Ok(Dependency {
            metadata: raw.metadata,
            service_name: service.to_string(),
            dependencies: decode(&raw.value)?,
        })
    }

    pub async fn add(&self, dependency: &Dependency) -> Result<(), ConfigError> {
        dependency.validate()?;
        let value = encode(&dependency.dependencies)?;
        self.ctl
            .add(NAMESPACE_SERVICE, TYPE_DEPENDENCY, &dependency.service_name, value)
            .await
    }

    pub async fn update(&self, dependency: &Dependency) -> Result<(), ConfigError> {
        dependency.validate()?;
        let value = encode(&dependency.dependencies)?;
        self.ctl
            .update(NAMESPACE_SERVICE, TYPE_DEPENDENCY, &dependency.service_name, value)
            .await
    }

    pub async fn delete(&self, service: &str) -> Result<(), ConfigError> {
        self.ctl.delete(NAMESPACE_SERVICE, TYPE_DEPENDENCY, service).await
    }

    pub async fn exists(&self, service: &str) -> bool {
        self.ctl.exists(NAMESPACE_SERVICE, TYPE_DEPENDENCY, service).await
    }

    pub async fn get_all(&self) -> Result<Vec<Dependency>, ConfigError> {
        let services = match self.ctl.keys(NAMESPACE_SERVICE, TYPE_DEPENDENCY).await {
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

    pub fn get_all_cached(&self) -> Result<Vec<Dependency>, ConfigError> {
        let services = match self.ctl.keys_cached(NAMESPACE_SERVICE, TYPE_DEPENDENCY) {
            Ok(services) => services,
            Err(ConfigError::NotExist) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        services.into_iter().map(|svc| self.get_cached(&svc)).collect()
    }
}

struct RawHandler {
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl ConfigEventHandler for RawHandler {
    async fn handle(&self, event: &Event) {
        if event.config.namespace != NAMESPACE_SERVICE || event.config.ty != TYPE_DEPENDENCY {
            return;
        }

        let service = &event.config.key;
        let dependencies = match decode(&event.config.value) {
            Ok(dependencies) => dependencies,
            Err(error) => {
                warn!(%service, %error, "undecodable dependency list, skipping");
                return;
            }
        };

        let mut last = self.shared.last.lock().await;
        let (added, removed) = match event.kind {
            EventKind::Add => (dependencies.clone(), Vec::new()),
            EventKind::Update => {
                let previous = last.get(service).map(Vec::as_slice).unwrap_or(&[]);
                symmetric_diff(previous, &dependencies)
            }
            EventKind::Delete => (Vec::new(), dependencies.clone()),
        };

        let typed = DependencyEvent {
            service_name: service.clone(),
            added,
            removed,
        };
        for handler in self.shared.handlers.load().iter() {
            handler.handle(&typed).await;
        }

        // Only after dispatch does the new list become the baseline.
        match event.kind {
            EventKind::Delete => {
                last.remove(service);
            }
            _ => {
                last.insert(service.clone(), dependencies);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, RawConfig};
    use tokio::sync::mpsc;

    struct Recorder(mpsc::UnboundedSender<DependencyEvent>);

    #[async_trait::async_trait]
    impl DependencyEventHandler for Recorder {
        async fn handle(&self, event: &DependencyEvent) {
            let _ = self.0.send(event.clone());
        }
    }

    fn raw_event(kind: EventKind, service: &str, value: &str) -> Event {
        Event::new(
            kind,
            RawConfig::new(NAMESPACE_SERVICE, TYPE_DEPENDENCY, service, value.as_bytes().to_vec()),
        )
    }

    async fn harness() -> (Controller, DependenciesController, mpsc::UnboundedReceiver<DependencyEvent>)
    {
        let controller = Controller::new(Arc::new(MemoryStore::new()));
        let deps = controller.dependencies();
        let (tx, rx) = mpsc::unbounded_channel();
        deps.register_event_handler(Arc::new(Recorder(tx)));
        (controller, deps, rx)
    }

    #[tokio::test]
    async fn update_is_reported_as_a_set_difference() {
        let (_controller, deps, mut rx) = harness().await;
        let handler = RawHandler {
            shared: deps.shared.clone(),
        };

        handler.handle(&raw_event(EventKind::Add, "svc", r#"["a","b"]"#)).await;
        let event = rx.try_recv().unwrap();
        assert_eq!(event.added, vec!["a", "b"]);
        assert!(event.removed.is_empty());

        handler.handle(&raw_event(EventKind::Update, "svc", r#"["b","c"]"#)).await;
        let event = rx.try_recv().unwrap();
        assert_eq!(event.added, vec!["c"]);
        assert_eq!(event.removed, vec!["a"]);

        handler.handle(&raw_event(EventKind::Delete, "svc", r#"["b","c"]"#)).await;
        let event = rx.try_recv().unwrap();
        assert!(event.added.is_empty());
        assert_eq!(event.removed, vec!["b", "c"]);

        // The baseline was dropped with the delete: a fresh add reports the
        // whole list again.
        handler.handle(&raw_event(EventKind::Add, "svc", r#"["x"]"#)).await;
        let event = rx.try_recv().unwrap();
        assert_eq!(event.added, vec!["x"]);
    }

    #[tokio::test]
    async fn undecodable_values_never_become_events() {
        let (_controller, deps, mut rx) = harness().await;
        let handler = RawHandler {
            shared: deps.shared.clone(),
        };
        handler.handle(&raw_event(EventKind::Add, "svc", "not-json")).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_types_are_ignored() {
        let (_controller, deps, mut rx) = harness().await;
        let handler = RawHandler {
            shared: deps.shared.clone(),
        };
        let event = Event::new(
            EventKind::Add,
            RawConfig::new(NAMESPACE_SERVICE, "proxy-config", "svc", b"{}".to_vec()),
        );
        handler.handle(&event).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn validation_rejects_an_empty_service_name() {
        let (_controller, deps, _rx) = harness().await;
        let dependency = Dependency::new("", vec!["a".into()]);
        assert!(matches!(deps.add(&dependency).await, Err(ConfigError::Validation(_))));
    }
}
