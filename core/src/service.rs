use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Health of a single service instance as reported by the registry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    #[default]
    Healthy,
    Unhealthy,
}

/// One live instance of a service registered in the service registry.
///
/// Equality is field-wise, including `meta`; the registry cache relies on it
/// to decide whether an instance changed between two sync passes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub state: InstanceState,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl ServiceInstance {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            state: InstanceState::Healthy,
            meta: HashMap::new(),
        }
    }

    /// The `ip:port` address that identifies this instance within its service.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// A named service together with its live instances, keyed by address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub instances: HashMap<String, ServiceInstance>,
}

impl Service {
    pub fn new(name: impl Into<String>, instances: impl IntoIterator<Item = ServiceInstance>) -> Self {
        Self {
            name: name.into(),
            instances: instances.into_iter().map(|i| (i.addr(), i)).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Anything the backend reports that is worth retrying.
    #[error("registry backend: {0}")]
    Backend(String),
}

/// A pluggable service registry.
///
/// `get` returning `None` means "no such service"; errors are transient and
/// the registry cache retries them with backoff.
#[async_trait::async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Runs the registry driver until the token is cancelled. Drivers without
    /// background work keep the default no-op.
    async fn run(&self, _shutdown: CancellationToken) {}

    /// All registered service names.
    async fn list(&self) -> Result<Vec<String>, RegistryError>;

    /// The service with the given name, or `None` if it is not registered.
    async fn get(&self, name: &str) -> Result<Option<Service>, RegistryError>;
}
