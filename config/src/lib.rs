#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Configuration plumbing for the lattice control plane: a pluggable
//! key/value store, an in-memory diffing cache, and a reconciling controller
//! that turns store state into typed events.

mod cache;
mod controller;
mod dependencies;
mod event;
mod instances;
mod memory;
mod proxy_config;
mod raw;
mod store;

pub use self::cache::Cache;
pub use self::controller::{Controller, ControllerOptions, ControllerState};
pub use self::dependencies::{
    DependenciesController, Dependency, DependencyEvent, DependencyEventHandler,
};
pub use self::event::{ConfigEventHandler, Event, EventKind};
pub use self::instances::{Instance, InstanceEvent, InstanceEventHandler, InstancesController};
pub use self::memory::MemoryStore;
pub use self::proxy_config::{
    LbPolicy, Listener, Protocol, ProxyConfig, ProxyConfigEvent, ProxyConfigEventHandler,
    ProxyConfigSpec, ProxyConfigsController,
};
pub use self::raw::{ConfigKey, Metadata, RawConfig};
pub use self::store::Store;

/// Namespace holding per-service configuration.
pub const NAMESPACE_SERVICE: &str = "service";
/// Proxy configuration type under the service namespace.
pub const TYPE_PROXY_CONFIG: &str = "proxy-config";
/// Dependency-list type under the service namespace.
pub const TYPE_DEPENDENCY: &str = "dependency";

/// Namespace holding control-plane bookkeeping.
pub const NAMESPACE_LATTICE: &str = "lattice";
/// Registered data-plane instances.
pub const TYPE_INSTANCE: &str = "instance";

/// The `(namespace, type)` pairs the controller keeps in sync with the store.
pub const INTERESTED: &[(&str, &str)] = &[
    (NAMESPACE_SERVICE, TYPE_PROXY_CONFIG),
    (NAMESPACE_SERVICE, TYPE_DEPENDENCY),
    (NAMESPACE_LATTICE, TYPE_INSTANCE),
];

/// Errors surfaced by stores, caches and controllers.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The identity is absent. An expected outcome, never retried.
    #[error("not exist")]
    NotExist,

    /// An add conflicted with an existing identity.
    #[error("already exists")]
    Exist,

    /// A required field is missing or malformed.
    #[error("validation: {0}")]
    Validation(String),

    /// A stored payload failed to decode.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transient store trouble; retried with backoff by the controller.
    #[error("store: {0}")]
    Store(String),

    /// The surrounding task was told to shut down mid-operation.
    #[error("cancelled")]
    Cancelled,
}

impl ConfigError {
    /// True for the expected absent-identity outcome.
    pub fn is_not_exist(&self) -> bool {
        matches!(self, ConfigError::NotExist)
    }
}
