use ahash::AHashMap as HashMap;
use lattice_core::{RegistryError, Service, ServiceInstance, ServiceRegistry};
use parking_lot::Mutex;

/// An in-memory [`ServiceRegistry`] used by tests and the `memory` registry
/// type. Mutators are plain methods; the cache observes them on its next
/// sync pass.
#[derive(Default)]
pub struct MemoryRegistry {
    services: Mutex<HashMap<String, Service>>,
}

impl MemoryRegistry {
    pub fn new(services: impl IntoIterator<Item = Service>) -> Self {
        Self {
            services: Mutex::new(services.into_iter().map(|s| (s.name.clone(), s)).collect()),
        }
    }

    /// Registers a service, replacing any previous registration.
    pub fn register(&self, service: Service) {
        self.services.lock().insert(service.name.clone(), service);
    }

    pub fn deregister(&self, name: &str) -> bool {
        self.services.lock().remove(name).is_some()
    }

    pub fn add_instances(&self, name: &str, instances: impl IntoIterator<Item = ServiceInstance>) {
        let mut services = self.services.lock();
        if let Some(service) = services.get_mut(name) {
            for instance in instances {
                service.instances.insert(instance.addr(), instance);
            }
        }
    }

    pub fn remove_instance(&self, name: &str, addr: &str) {
        let mut services = self.services.lock();
        if let Some(service) = services.get_mut(name) {
            service.instances.remove(addr);
        }
    }
}

#[async_trait::async_trait]
impl ServiceRegistry for MemoryRegistry {
    async fn list(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.services.lock().keys().cloned().collect())
    }

    async fn get(&self, name: &str) -> Result<Option<Service>, RegistryError> {
        Ok(self.services.lock().get(name).cloned())
    }
}
