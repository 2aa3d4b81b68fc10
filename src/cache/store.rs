use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Uid-keyed map of object documents shared between the reflector's single
/// worker (the only mutator) and any number of snapshot readers.
///
/// A full list builds a brand-new map off-lock and swaps it in under the
/// write lock, so readers see either the previous generation or the new one,
/// never a half-built map.
#[derive(Debug, Default)]
pub struct Store {
    objects: RwLock<HashMap<String, Value>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole map, the fill step of a list/watch cycle.
    pub async fn replace(&self, objects: HashMap<String, Value>) {
        *self.objects.write().await = objects;
    }

    pub async fn upsert(&self, uid: String, object: Value) {
        self.objects.write().await.insert(uid, object);
    }

    pub async fn delete(&self, uid: &str) {
        self.objects.write().await.remove(uid);
    }

    pub async fn get(&self, uid: &str) -> Option<Value> {
        self.objects.read().await.get(uid).cloned()
    }

    /// Self-consistent snapshot of every cached object.
    pub async fn snapshot(&self) -> Vec<Value> {
        self.objects.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}
