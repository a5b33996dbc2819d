use crate::{ConfigError, ConfigKey, RawConfig};
use ahash::AHashMap as HashMap;

/// An in-memory snapshot of every interested configuration entry.
///
/// Entries are reachable two ways: through the `namespace -> type -> key`
/// hierarchy (listing) and through a flat identity index (diffing). Empty
/// inner maps are pruned on delete so `keys` never reports stale groups.
#[derive(Clone, Debug, Default)]
pub struct Cache {
    namespaces: HashMap<String, HashMap<String, HashMap<String, Vec<u8>>>>,
    index: HashMap<ConfigKey, RawConfig>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts an entry; creating and overwriting are not distinguished.
    pub fn set(&mut self, namespace: &str, ty: &str, key: &str, value: Vec<u8>) {
        self.insert(RawConfig::new(namespace, ty, key, value));
    }

    /// Upserts a full entry, keeping its metadata in the identity index.
    pub fn insert(&mut self, config: RawConfig) {
        self.namespaces
            .entry(config.namespace.clone())
            .or_default()
            .entry(config.ty.clone())
            .or_default()
            .insert(config.key.clone(), config.value.clone());
        self.index.insert(config.config_key(), config);
    }

    pub fn delete(&mut self, namespace: &str, ty: &str, key: &str) -> Result<(), ConfigError> {
        let types = self.namespaces.get_mut(namespace).ok_or(ConfigError::NotExist)?;
        let keys = types.get_mut(ty).ok_or(ConfigError::NotExist)?;
        keys.remove(key).ok_or(ConfigError::NotExist)?;

        if keys.is_empty() {
            types.remove(ty);
        }
        if types.is_empty() {
            self.namespaces.remove(namespace);
        }
        self.index
            .remove(&ConfigKey::new(namespace, ty, key));
        Ok(())
    }

    pub fn get(&self, namespace: &str, ty: &str, key: &str) -> Result<&[u8], ConfigError> {
        self.namespaces
            .get(namespace)
            .and_then(|types| types.get(ty))
            .and_then(|keys| keys.get(key))
            .map(Vec::as_slice)
            .ok_or(ConfigError::NotExist)
    }

    /// The full entry including metadata, if cached.
    pub fn get_raw(&self, namespace: &str, ty: &str, key: &str) -> Option<&RawConfig> {
        self.index.get(&ConfigKey::new(namespace, ty, key))
    }

    pub fn exists(&self, namespace: &str, ty: &str, key: &str) -> bool {
        self.get(namespace, ty, key).is_ok()
    }

    pub fn keys(&self, namespace: &str, ty: &str) -> Result<Vec<String>, ConfigError> {
        self.namespaces
            .get(namespace)
            .and_then(|types| types.get(ty))
            .map(|keys| keys.keys().cloned().collect())
            .ok_or(ConfigError::NotExist)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Diffs this snapshot against `next`, over the union of identities.
    ///
    /// Returns `(added, updated, deleted)`: identities only in `next`, in
    /// both with unequal values, and only in `self`. The three lists are
    /// disjoint.
    pub fn diff(&self, next: &Cache) -> (Vec<RawConfig>, Vec<RawConfig>, Vec<RawConfig>) {
        let mut added = Vec::new();
        let mut updated = Vec::new();
        let mut deleted = Vec::new();

        for (identity, new_config) in &next.index {
            match self.index.get(identity) {
                None => added.push(new_config.clone()),
                Some(old_config) if old_config != new_config => updated.push(new_config.clone()),
                Some(_) => {}
            }
        }
        for (identity, old_config) in &self.index {
            if !next.index.contains_key(identity) {
                deleted.push(old_config.clone());
            }
        }

        (added, updated, deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(entries: &[(&str, &str, &str, &[u8])]) -> Cache {
        let mut cache = Cache::new();
        for (ns, ty, key, value) in entries {
            cache.set(ns, ty, key, value.to_vec());
        }
        cache
    }

    #[test]
    fn set_get_delete() {
        let mut cache = Cache::new();
        assert!(matches!(cache.get("service", "dependency", "a"), Err(ConfigError::NotExist)));

        cache.set("service", "dependency", "a", b"v1".to_vec());
        assert_eq!(cache.get("service", "dependency", "a").unwrap(), b"v1");

        cache.set("service", "dependency", "a", b"v2".to_vec());
        assert_eq!(cache.get("service", "dependency", "a").unwrap(), b"v2");

        cache.delete("service", "dependency", "a").unwrap();
        assert!(matches!(cache.get("service", "dependency", "a"), Err(ConfigError::NotExist)));
        assert!(matches!(cache.delete("service", "dependency", "a"), Err(ConfigError::NotExist)));
    }

    #[test]
    fn delete_prunes_empty_parents() {
        let mut cache = cache_with(&[("service", "dependency", "a", b"v")]);
        cache.delete("service", "dependency", "a").unwrap();
        // The whole namespace is gone, so listing its keys reports absence.
        assert!(matches!(cache.keys("service", "dependency"), Err(ConfigError::NotExist)));
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_lists_one_group() {
        let cache = cache_with(&[
            ("service", "dependency", "a", b"v"),
            ("service", "dependency", "b", b"v"),
            ("service", "proxy-config", "a", b"v"),
        ]);
        let mut keys = cache.keys("service", "dependency").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn diff_classifies_over_the_union() {
        let old = cache_with(&[
            ("service", "dependency", "kept", b"same"),
            ("service", "dependency", "changed", b"v1"),
            ("service", "dependency", "dropped", b"v"),
        ]);
        let new = cache_with(&[
            ("service", "dependency", "kept", b"same"),
            ("service", "dependency", "changed", b"v2"),
            ("service", "proxy-config", "fresh", b"v"),
        ]);

        let (added, updated, deleted) = old.diff(&new);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].key, "fresh");
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].key, "changed");
        assert_eq!(updated[0].value, b"v2");
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].key, "dropped");
    }

    #[test]
    fn diff_against_self_is_empty() {
        let cache = cache_with(&[("service", "dependency", "a", b"v")]);
        let (added, updated, deleted) = cache.diff(&cache.clone());
        assert!(added.is_empty() && updated.is_empty() && deleted.is_empty());
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut original = cache_with(&[("service", "dependency", "a", b"v1")]);
        let copy = original.clone();
        original.set("service", "dependency", "a", b"v2".to_vec());
        assert_eq!(copy.get("service", "dependency", "a").unwrap(), b"v1");
    }
}
