use crate::event::HandlerList;
use crate::{
    ConfigEventHandler, ConfigError, Controller, Event, EventKind, Metadata, NAMESPACE_LATTICE,
    TYPE_INSTANCE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// A registered data-plane instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(flatten)]
    pub metadata: Option<Metadata>,
    pub id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub belong_service: String,
}

impl Instance {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::Validation("id is empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct InstanceEvent {
    pub kind: EventKind,
    pub instance: Instance,
}

#[async_trait::async_trait]
pub trait InstanceEventHandler: Send + Sync {
    async fn handle(&self, event: &InstanceEvent);
}

fn decode(value: &[u8]) -> Result<Instance, ConfigError> {
    Ok(serde_json::from_slice(value)?)
}

fn encode(instance: &Instance) -> Result<Vec<u8>, ConfigError> {
    Ok(serde_json::to_vec(instance)?)
}

/// Typed view over the `lattice/instance` entries of a [`Controller`].
#[derive(Clone)]
pub struct InstancesController {
    ctl: Controller,
    handlers: Arc<HandlerList<dyn InstanceEventHandler>>,
}

impl InstancesController {
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

    pub fn register_event_handler(&self, handler: Arc<dyn InstanceEventHandler>) {
        self.handlers.register(handler);
    }

    pub async fn get(&self, id: &str) -> Result<Instance, ConfigError> {
        let (value, metadata) = self.ctl.get(NAMESPACE_LATTICE, TYPE_INSTANCE, id).await?;
        let mut instance = decode(&value)?;
        instance.metadata = Some(metadata);
        Ok(instance)
    }

    pub fn get_cached(&self, id: &str) -> Result<Instance, ConfigError> {
        let raw = self.ctl.get_cache_raw(NAMESPACE_LATTICE, TYPE_INSTANCE, id)?;
        let mut instance = decode(&raw.value)?;
        instance.metadata = raw.metadata;
        Ok(instance)
    }

    pub async fn add(&self, instance: &Instance) -> Result<(), ConfigError> {
        instance.validate()?;
        self.ctl
            .add(NAMESPACE_LATTICE, TYPE_INSTANCE, &instance.id, encode(instance)?)
            .await
    }

    pub async fn update(&self, instance: &Instance) -> Result<(), ConfigError> {
        instance.validate()?;
        self.ctl
            .update(NAMESPACE_LATTICE, TYPE_INSTANCE, &instance.id, encode(instance)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ConfigError> {
        self.ctl.delete(NAMESPACE_LATTICE, TYPE_INSTANCE, id).await
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.ctl.exists(NAMESPACE_LATTICE, TYPE_INSTANCE, id).await
    }

    pub async fn get_all(&self) -> Result<Vec<Instance>, ConfigError> {
        let ids = match self.ctl.keys(NAMESPACE_LATTICE, TYPE_INSTANCE).await {
            Ok(ids) => ids,
            Err(ConfigError::NotExist) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        let mut all = Vec::with_capacity(ids.len());
        for id in ids {
            all.push(self.get(&id).await?);
        }
        Ok(all)
    }

    pub fn get_all_cached(&self) -> Result<Vec<Instance>, ConfigError> {
        let ids = match self.ctl.keys_cached(NAMESPACE_LATTICE, TYPE_INSTANCE) {
            Ok(ids) => ids,
            Err(ConfigError::NotExist) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        ids.into_iter().map(|id| self.get_cached(&id)).collect()
    }
}

struct RawHandler {
    handlers: Arc<HandlerList<dyn InstanceEventHandler>>,
}

#[async_trait::async_trait]
impl ConfigEventHandler for RawHandler {
    async fn handle(&self, event: &Event) {
        if event.config.namespace != NAMESPACE_LATTICE || event.config.ty != TYPE_INSTANCE {
            return;
        }
        let mut instance = match decode(&event.config.value) {
            Ok(instance) => instance,
            Err(error) => {
                warn!(id = %event.config.key, %error, "undecodable instance, skipping");
                return;
            }
        };
        instance.metadata = event.config.metadata;
        let typed = InstanceEvent {
            kind: event.kind,
            instance,
        };
        for handler in self.handlers.load().iter() {
            handler.handle(&typed).await;
        }
    }
}
