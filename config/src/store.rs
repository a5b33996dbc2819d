use crate::{ConfigError, Metadata};
use tokio::sync::mpsc;

/// A pluggable hierarchical key/value store.
///
/// Entries live under `(namespace, type, key)`. `add` is conflict-sensitive,
/// `update` and `delete` require prior existence; anything else the backend
/// reports is transient and retried by the controller.
///
/// Change notification is an optional capability: stores that can watch
/// their backend implement `subscribe`/`unsubscribe` and hand out a
/// coalesced per-store signal through `events`; the defaults make a plain
/// store a valid implementation.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Connects the store to its backend. Called once before any other use.
    async fn start(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Releases backend resources. The store is not used afterwards.
    async fn stop(&self) {}

    async fn get(&self, namespace: &str, ty: &str, key: &str)
        -> Result<(Vec<u8>, Metadata), ConfigError>;

    /// Creates an entry; fails with [`ConfigError::Exist`] on conflict.
    async fn add(&self, namespace: &str, ty: &str, key: &str, value: Vec<u8>)
        -> Result<(), ConfigError>;

    /// Overwrites an entry; fails with [`ConfigError::NotExist`] when absent.
    async fn update(&self, namespace: &str, ty: &str, key: &str, value: Vec<u8>)
        -> Result<(), ConfigError>;

    /// Removes an entry; fails with [`ConfigError::NotExist`] when absent.
    async fn delete(&self, namespace: &str, ty: &str, key: &str) -> Result<(), ConfigError>;

    async fn exists(&self, namespace: &str, ty: &str, key: &str) -> bool;

    async fn get_keys(&self, namespace: &str, ty: &str) -> Result<Vec<String>, ConfigError>;

    /// Starts watching a namespace for changes.
    fn subscribe(&self, _namespace: &str) -> Result<(), ConfigError> {
        Ok(())
    }

    fn unsubscribe(&self, _namespace: &str) -> Result<(), ConfigError> {
        Ok(())
    }

    /// The change-signal receiver, handed out at most once. A unit arrives
    /// whenever any key under a subscribed namespace changes; signals are
    /// coalesced, not counted.
    fn events(&self) -> Option<mpsc::Receiver<()>> {
        None
    }
}
