use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned timestamps for a configuration entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Metadata {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            create_time: now,
            update_time: now,
        }
    }
}

/// The identity of a configuration entry: `(namespace, type, key)`.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConfigKey {
    pub namespace: String,
    pub ty: String,
    pub key: String,
}

impl ConfigKey {
    pub fn new(namespace: impl Into<String>, ty: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ty: ty.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.ty, self.key)
    }
}

/// A raw configuration entry as stored in the backend.
///
/// Identity is `(namespace, ty, key)`; the value and metadata are mutable.
#[derive(Clone, Debug)]
pub struct RawConfig {
    pub namespace: String,
    pub ty: String,
    pub key: String,
    pub value: Vec<u8>,
    pub metadata: Option<Metadata>,
}

impl RawConfig {
    pub fn new(
        namespace: impl Into<String>,
        ty: impl Into<String>,
        key: impl Into<String>,
        value: Vec<u8>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            ty: ty.into(),
            key: key.into(),
            value,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn config_key(&self) -> ConfigKey {
        ConfigKey::new(&*self.namespace, &*self.ty, &*self.key)
    }
}

// Metadata is bookkeeping, not content: two entries with the same identity
// and value are equal regardless of their timestamps.
impl PartialEq for RawConfig {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.ty == other.ty
            && self.key == other.key
            && self.value == other.value
    }
}

impl Eq for RawConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_metadata() {
        let a = RawConfig::new("service", "dependency", "foo", b"[]".to_vec());
        let b = a.clone().with_metadata(Metadata::now());
        assert_eq!(a, b);

        let c = RawConfig::new("service", "dependency", "foo", b"[1]".to_vec());
        assert_ne!(a, c);

        let d = RawConfig::new("service", "proxy-config", "foo", b"[]".to_vec());
        assert_ne!(a, d);
    }
}
