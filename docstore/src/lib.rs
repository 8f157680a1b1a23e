extern crate self as docstore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

mod memory;
mod mongo;
mod subscription;

pub use docstore_derive::DocumentModel;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use subscription::{Snapshot, Subscription};

/// Field map of a stored document, without its key.
pub type Fields = Map<String, Value>;

/// Binds a record type to the collection it is stored in.
pub trait DocumentModel: Serialize + DeserializeOwned + Send + Sync {
    fn collection() -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(key: impl Into<String>, fields: Fields) -> Self {
        Document {
            key: key.into(),
            fields,
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(StoreError::Decode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The written fields become the whole document.
    Replace,
    /// Nested objects are merged leaf by leaf; untouched fields survive.
    Merge,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("could not decode document: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("could not encode document: {0}")]
    Encode(String),
    #[error("store call did not complete within {0:?}")]
    Timeout(Duration),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Keyed document collections with push notification of changes.
///
/// A missing document is `Ok(None)`, never an error. `set` returns the
/// document as the store holds it after the write, so callers can mirror
/// confirmed state instead of what they submitted.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<Document, StoreError>;

    /// The first snapshot describes the document as it is now; every later
    /// one follows a change. Dropping the subscription releases it.
    async fn subscribe(&self, collection: &str, key: &str) -> Result<Subscription, StoreError>;
}

/// Typed access for anything implementing [`DocumentModel`].
#[async_trait]
pub trait ModelStore {
    async fn fetch<T: DocumentModel>(&self, key: &str) -> Result<Option<T>, StoreError>;

    async fn fetch_all<T: DocumentModel>(&self) -> Result<Vec<(String, T)>, StoreError>;

    async fn save<T: DocumentModel>(
        &self,
        key: &str,
        model: &T,
        mode: WriteMode,
    ) -> Result<T, StoreError>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> ModelStore for S {
    async fn fetch<T: DocumentModel>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(T::collection(), key).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    async fn fetch_all<T: DocumentModel>(&self) -> Result<Vec<(String, T)>, StoreError> {
        let docs = self.list(T::collection()).await?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            let item = doc.decode::<T>()?;
            items.push((doc.key, item));
        }
        Ok(items)
    }

    async fn save<T: DocumentModel>(
        &self,
        key: &str,
        model: &T,
        mode: WriteMode,
    ) -> Result<T, StoreError> {
        let fields = to_fields(model)?;
        let confirmed = self.set(T::collection(), key, fields, mode).await?;
        confirmed.decode()
    }
}

pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::Encode(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(StoreError::Encode(e.to_string())),
    }
}

/// Deep merge of `patch` into `target`: objects merge recursively, any other
/// value overwrites.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (name, value) in patch {
        if let Value::Object(nested) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&name) {
                merge_fields(existing, nested);
                continue;
            }
            target.insert(name, Value::Object(nested));
        } else {
            target.insert(name, value);
        }
    }
}
