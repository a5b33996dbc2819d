use lattice_core::{Service, ServiceInstance};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Add,
    Update,
    Delete,
}

/// A whole service appearing in or vanishing from the registry.
#[derive(Clone, Debug)]
pub struct ServiceEvent {
    pub kind: EventKind,
    pub service: Service,
}

/// A change to some instances of one service.
#[derive(Clone, Debug)]
pub struct InstanceEvent {
    pub kind: EventKind,
    pub service_name: String,
    pub instances: Vec<ServiceInstance>,
}

#[async_trait::async_trait]
pub trait ServiceEventHandler: Send + Sync {
    async fn handle(&self, event: &ServiceEvent);
}

#[async_trait::async_trait]
pub trait InstanceEventHandler: Send + Sync {
    async fn handle(&self, event: &InstanceEvent);
}
