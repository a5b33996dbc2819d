use crate::RawConfig;
use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Add,
    Update,
    Delete,
}

/// A change to one raw configuration entry, as observed by a reconcile.
#[derive(Clone, Debug)]
pub struct Event {
    pub kind: EventKind,
    pub config: RawConfig,
}

impl Event {
    pub fn new(kind: EventKind, config: RawConfig) -> Self {
        Self { kind, config }
    }
}

/// Receives raw configuration events in dispatch order.
#[async_trait::async_trait]
pub trait ConfigEventHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// A copy-on-write handler list: registration swaps a fresh vector in,
/// dispatchers load the current one without locking.
pub(crate) struct HandlerList<H: ?Sized> {
    handlers: ArcSwap<Vec<Arc<H>>>,
    register: parking_lot::Mutex<()>,
}

impl<H: ?Sized> Default for HandlerList<H> {
    fn default() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(Vec::new()),
            register: parking_lot::Mutex::new(()),
        }
    }
}

impl<H: ?Sized> HandlerList<H> {
    pub(crate) fn register(&self, handler: Arc<H>) {
        let _guard = self.register.lock();
        let mut handlers = Vec::clone(&self.handlers.load());
        handlers.push(handler);
        self.handlers.store(Arc::new(handlers));
    }

    pub(crate) fn load(&self) -> Arc<Vec<Arc<H>>> {
        self.handlers.load_full()
    }
}
