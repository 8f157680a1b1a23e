//! Process-local document store.
//!
//! Backs local development when no MongoDB is configured, and the test
//! suites. State is lost on restart.
use crate::{merge_fields, Document, DocumentStore, Fields, Snapshot, StoreError, Subscription, WriteMode};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

type WatchKey = (String, String);

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    // collection name -> key -> fields
    collections: Mutex<Collections>,
    // (collection, key) -> subscriber id -> channel; always locked after
    // `collections` when both are held
    watchers: Mutex<HashMap<WatchKey, HashMap<Uuid, UnboundedSender<Snapshot>>>>,
}

type Collections = HashMap<String, BTreeMap<String, Fields>>;

fn snapshot_of(collections: &Collections, collection: &str, key: &str) -> Snapshot {
    collections
        .get(collection)
        .and_then(|docs| docs.get(key))
        .map(|fields| Document::new(key, fields.clone()))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on one document.
    pub fn subscriber_count(&self, collection: &str, key: &str) -> usize {
        lock(&self.inner.watchers)
            .get(&(collection.to_string(), key.to_string()))
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    fn publish(&self, collection: &str, key: &str, snapshot: Snapshot) {
        let mut watchers = lock(&self.inner.watchers);
        let watch_key = (collection.to_string(), key.to_string());
        if let Some(subscribers) = watchers.get_mut(&watch_key) {
            // drop subscribers whose receiving half is gone
            subscribers.retain(|_, sender| sender.send(snapshot.clone()).is_ok());
            if subscribers.is_empty() {
                watchers.remove(&watch_key);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let collections = lock(&self.inner.collections);
        Ok(snapshot_of(&collections, collection, key))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = lock(&self.inner.collections);
        let docs = match collections.get(collection) {
            Some(docs) => docs
                .iter()
                .map(|(key, fields)| Document::new(key.clone(), fields.clone()))
                .collect(),
            None => Vec::new(),
        };
        Ok(docs)
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<Document, StoreError> {
        // publishing under the collections lock keeps snapshots in write order
        let mut collections = lock(&self.inner.collections);
        let entry = collections
            .entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        match mode {
            WriteMode::Replace => *entry = fields,
            WriteMode::Merge => merge_fields(entry, fields),
        }
        let doc = Document::new(key, entry.clone());
        self.publish(collection, key, Some(doc.clone()));
        Ok(doc)
    }

    async fn subscribe(&self, collection: &str, key: &str) -> Result<Subscription, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let watch_key = (collection.to_string(), key.to_string());
        {
            // no write can land between the initial snapshot and registration
            let collections = lock(&self.inner.collections);
            // receiver is alive, the initial send cannot fail
            let _ = sender.send(snapshot_of(&collections, collection, key));
            lock(&self.inner.watchers)
                .entry(watch_key.clone())
                .or_default()
                .insert(id, sender);
        }

        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(receiver, move || {
            let mut watchers = lock(&inner.watchers);
            if let Some(subscribers) = watchers.get_mut(&watch_key) {
                subscribers.remove(&id);
                if subscribers.is_empty() {
                    watchers.remove(&watch_key);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_replace_drops_old_fields() {
        let store = MemoryStore::new();
        store
            .set("tenants", "T1", fields(json!({"name": "Rao", "room": "101"})), WriteMode::Replace)
            .await
            .unwrap();
        let doc = store
            .set("tenants", "T1", fields(json!({"name": "Rao"})), WriteMode::Replace)
            .await
            .unwrap();
        assert_eq!(Value::Object(doc.fields), json!({"name": "Rao"}));
    }

    #[tokio::test]
    async fn test_merge_returns_confirmed_document() {
        let store = MemoryStore::new();
        store
            .set("rent", "T1", fields(json!({"2024-01": {"pendingDue": 500}})), WriteMode::Merge)
            .await
            .unwrap();
        let doc = store
            .set("rent", "T1", fields(json!({"2024-02": {"pendingDue": 500}})), WriteMode::Merge)
            .await
            .unwrap();
        assert_eq!(doc.key, "T1");
        assert_eq!(
            Value::Object(doc.fields),
            json!({"2024-01": {"pendingDue": 500}, "2024-02": {"pendingDue": 500}})
        );
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_key() {
        let store = MemoryStore::new();
        for key in ["T3", "T1", "T2"] {
            store
                .set("tenants", key, fields(json!({"name": key})), WriteMode::Replace)
                .await
                .unwrap();
        }
        let keys: Vec<String> = store
            .list("tenants")
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.key)
            .collect();
        assert_eq!(keys, vec!["T1", "T2", "T3"]);
        assert!(store.list("event").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_sees_current_state_then_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("maintenance", "101").await.unwrap();
        assert_eq!(sub.recv().await, Some(None));

        store
            .set("maintenance", "101", fields(json!({"desc": "fan"})), WriteMode::Replace)
            .await
            .unwrap();
        let snapshot = sub.recv().await.unwrap().unwrap();
        assert_eq!(snapshot.fields["desc"], json!("fan"));
    }

    #[tokio::test]
    async fn test_dropping_subscription_releases_it() {
        let store = MemoryStore::new();
        let first = store.subscribe("maintenance", "101").await.unwrap();
        let second = store.subscribe("maintenance", "101").await.unwrap();
        assert_eq!(store.subscriber_count("maintenance", "101"), 2);

        drop(first);
        assert_eq!(store.subscriber_count("maintenance", "101"), 1);
        second.unsubscribe();
        assert_eq!(store.subscriber_count("maintenance", "101"), 0);
    }

    #[tokio::test]
    async fn test_other_keys_are_not_published() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("maintenance", "101").await.unwrap();
        assert_eq!(sub.recv().await, Some(None));
        store
            .set("maintenance", "102", fields(json!({"desc": "tap"})), WriteMode::Replace)
            .await
            .unwrap();
        assert!(sub.recv().now_or_never().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscriber_ends_on_latest_write() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("maintenance", "101").await.unwrap();

        let writers: Vec<_> = (0..8)
            .map(|writer| {
                let store = store.clone();
                tokio::spawn(async move {
                    for n in 0..50 {
                        store
                            .set(
                                "maintenance",
                                "101",
                                fields(json!({"desc": format!("{}-{}", writer, n)})),
                                WriteMode::Replace,
                            )
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let mut last = None;
        while let Some(Some(snapshot)) = sub.recv().now_or_never() {
            last = snapshot;
        }
        let stored = store.get("maintenance", "101").await.unwrap();
        assert!(stored.is_some());
        assert_eq!(last, stored);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscribe_races_no_write() {
        let store = MemoryStore::new();
        for round in 0..20 {
            let key = format!("room-{}", round);
            let writer = {
                let store = store.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    store
                        .set("maintenance", &key, fields(json!({"desc": "leak"})), WriteMode::Replace)
                        .await
                        .unwrap();
                })
            };
            let mut sub = store.subscribe("maintenance", &key).await.unwrap();
            writer.await.unwrap();

            // whichever came first, the written document is observed
            let mut seen = None;
            while let Some(Some(snapshot)) = sub.recv().now_or_never() {
                seen = snapshot;
            }
            assert_eq!(seen.map(|doc| doc.fields["desc"].clone()), Some(json!("leak")));
        }
    }
}
