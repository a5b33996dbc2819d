#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! A caching layer over a pluggable service registry. The cache keeps every
//! registered service in memory, reconciles periodically, and dispatches
//! service and instance change events to registered handlers.

mod cache;
mod event;
mod memory;

pub use self::cache::{CacheOptions, RegistryCache};
pub use self::event::{
    EventKind, InstanceEvent, InstanceEventHandler, ServiceEvent, ServiceEventHandler,
};
pub use self::memory::MemoryRegistry;
