use crate::{Cache, ConfigError, ConfigKey, Metadata, Store};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 64;

/// An in-memory [`Store`] with change notification.
///
/// Backs the `memory` store type and every controller test. All state lives
/// behind one mutex; operations never block on IO.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    event_tx: mpsc::Sender<()>,
    event_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

struct Inner {
    configs: Cache,
    metadata: HashMap<ConfigKey, Metadata>,
    subscribed: HashSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            inner: Mutex::new(Inner {
                configs: Cache::new(),
                metadata: HashMap::new(),
                subscribed: HashSet::new(),
            }),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }
}

impl Inner {
    fn notify(&self, namespace: &str, tx: &mpsc::Sender<()>) {
        if self.subscribed.contains(namespace) {
            // Best effort: a full buffer already carries a pending signal.
            let _ = tx.try_send(());
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(
        &self,
        namespace: &str,
        ty: &str,
        key: &str,
    ) -> Result<(Vec<u8>, Metadata), ConfigError> {
        let inner = self.inner.lock();
        let value = inner.configs.get(namespace, ty, key)?.to_vec();
        let metadata = inner
            .metadata
            .get(&ConfigKey::new(namespace, ty, key))
            .copied()
            .unwrap_or_else(Metadata::now);
        Ok((value, metadata))
    }

    async fn add(
        &self,
        namespace: &str,
        ty: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), ConfigError> {
        let mut inner = self.inner.lock();
        if inner.configs.exists(namespace, ty, key) {
            return Err(ConfigError::Exist);
        }
        inner.configs.set(namespace, ty, key, value);
        inner
            .metadata
            .insert(ConfigKey::new(namespace, ty, key), Metadata::now());
        inner.notify(namespace, &self.event_tx);
        Ok(())
    }

    async fn update(
        &self,
        namespace: &str,
        ty: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), ConfigError> {
        let mut inner = self.inner.lock();
        let changed = inner.configs.get(namespace, ty, key)? != value.as_slice();
        inner.configs.set(namespace, ty, key, value);
        if let Some(metadata) = inner.metadata.get_mut(&ConfigKey::new(namespace, ty, key)) {
            metadata.update_time = Utc::now();
        }
        if changed {
            inner.notify(namespace, &self.event_tx);
        }
        Ok(())
    }

    async fn delete(&self, namespace: &str, ty: &str, key: &str) -> Result<(), ConfigError> {
        let mut inner = self.inner.lock();
        inner.configs.delete(namespace, ty, key)?;
        inner.metadata.remove(&ConfigKey::new(namespace, ty, key));
        inner.notify(namespace, &self.event_tx);
        Ok(())
    }

    async fn exists(&self, namespace: &str, ty: &str, key: &str) -> bool {
        self.inner.lock().configs.exists(namespace, ty, key)
    }

    async fn get_keys(&self, namespace: &str, ty: &str) -> Result<Vec<String>, ConfigError> {
        self.inner.lock().configs.keys(namespace, ty)
    }

    fn subscribe(&self, namespace: &str) -> Result<(), ConfigError> {
        self.inner.lock().subscribed.insert(namespace.to_string());
        Ok(())
    }

    fn unsubscribe(&self, namespace: &str) -> Result<(), ConfigError> {
        self.inner.lock().subscribed.remove(namespace);
        Ok(())
    }

    fn events(&self) -> Option<mpsc::Receiver<()>> {
        self.event_rx.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_conflicts_and_update_requires_existence() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update("service", "dependency", "a", b"v".to_vec()).await,
            Err(ConfigError::NotExist)
        ));

        store.add("service", "dependency", "a", b"v".to_vec()).await.unwrap();
        assert!(matches!(
            store.add("service", "dependency", "a", b"v".to_vec()).await,
            Err(ConfigError::Exist)
        ));

        store.update("service", "dependency", "a", b"v2".to_vec()).await.unwrap();
        let (value, metadata) = store.get("service", "dependency", "a").await.unwrap();
        assert_eq!(value, b"v2");
        assert!(metadata.update_time >= metadata.create_time);
    }

    #[tokio::test]
    async fn delete_removes_the_entry() {
        let store = MemoryStore::new();
        store.add("service", "dependency", "a", b"v".to_vec()).await.unwrap();
        store.delete("service", "dependency", "a").await.unwrap();
        assert!(!store.exists("service", "dependency", "a").await);
        assert!(matches!(
            store.delete("service", "dependency", "a").await,
            Err(ConfigError::NotExist)
        ));
    }

    #[tokio::test]
    async fn signals_changes_under_subscribed_namespaces_only() {
        let store = MemoryStore::new();
        let mut events = store.events().expect("first take yields the receiver");
        assert!(store.events().is_none());

        store.subscribe("service").unwrap();
        store.add("lattice", "instance", "i-1", b"{}".to_vec()).await.unwrap();
        assert!(events.try_recv().is_err(), "unsubscribed namespace must not signal");

        store.add("service", "dependency", "a", b"[]".to_vec()).await.unwrap();
        events.recv().await.expect("subscribed namespace signals");

        // An update that does not change the value stays quiet.
        store.update("service", "dependency", "a", b"[]".to_vec()).await.unwrap();
        assert!(events.try_recv().is_err());
    }
}
