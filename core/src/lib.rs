#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backoff;
pub mod diff;
mod service;

pub use self::service::{
    InstanceState, RegistryError, Service, ServiceInstance, ServiceRegistry,
};
