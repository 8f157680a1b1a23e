use crate::{Document, DocumentStore, Fields, StoreError, Subscription, WriteMode};
use async_trait::async_trait;
use bson::{doc, Bson, Document as BsonDocument};
use futures::stream::TryStreamExt;
use mongodb::{
    change_stream::event::OperationType,
    options::{
        ChangeStreamOptions, FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions,
        FullDocumentType, ReturnDocument,
    },
    Client, Collection, Database,
};
use serde_json::Value;
use tokio::sync::mpsc;

/// MongoDB backed store: one Mongo collection per document collection, the
/// document key stored as `_id`.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        Ok(MongoStore { client, db })
    }

    /// Round trip to the server, used to fail fast at startup.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! {"ping": 1}, None)
            .await?;
        Ok(())
    }

    fn get_collection(&self, name: &str) -> Collection<BsonDocument> {
        self.db.collection::<BsonDocument>(name)
    }
}

fn to_bson_document(fields: &Fields) -> Result<BsonDocument, StoreError> {
    bson::to_document(fields).map_err(|e| StoreError::Encode(e.to_string()))
}

fn into_document(mut raw: BsonDocument) -> Result<Document, StoreError> {
    let key = match raw.remove("_id") {
        Some(Bson::String(key)) => key,
        Some(other) => other.to_string(),
        None => return Err(StoreError::Backend(String::from("document without _id"))),
    };
    match Bson::Document(raw).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Document::new(key, fields)),
        other => Err(StoreError::Backend(format!(
            "expected a document body, got {}",
            other
        ))),
    }
}

/// Flattens a patch into dotted leaf paths for `$set`, so a merge only
/// touches the leaves it names.
fn leaf_paths(prefix: Option<&str>, fields: Fields, out: &mut Vec<(String, Value)>) {
    for (name, value) in fields {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name,
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => leaf_paths(Some(&path), nested, out),
            other => out.push((path, other)),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let col = self.get_collection(collection);
        match col.find_one(doc! {"_id": key}, None).await? {
            Some(raw) => Ok(Some(into_document(raw)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let col = self.get_collection(collection);
        let options = FindOptions::builder().sort(Some(doc! {"_id": 1})).build();
        let mut cursor = col.find(None, options).await?;

        let mut items = Vec::new();
        while let Some(raw) = cursor.try_next().await? {
            items.push(into_document(raw)?);
        }
        Ok(items)
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<Document, StoreError> {
        let col = self.get_collection(collection);
        let filter = doc! {"_id": key};
        let written = match mode {
            WriteMode::Replace => {
                let replacement = to_bson_document(&fields)?;
                let options = FindOneAndReplaceOptions::builder()
                    .upsert(Some(true))
                    .return_document(Some(ReturnDocument::After))
                    .build();
                col.find_one_and_replace(filter, replacement, options).await?
            }
            WriteMode::Merge => {
                let mut paths = Vec::new();
                leaf_paths(None, fields, &mut paths);
                if paths.is_empty() {
                    // an empty patch only has to make sure the document exists
                    if let Some(existing) = self.get(collection, key).await? {
                        return Ok(existing);
                    }
                    let options = FindOneAndReplaceOptions::builder()
                        .upsert(Some(true))
                        .return_document(Some(ReturnDocument::After))
                        .build();
                    col.find_one_and_replace(filter, BsonDocument::new(), options)
                        .await?
                } else {
                    let mut set = BsonDocument::new();
                    for (path, value) in paths {
                        let value = bson::to_bson(&value)
                            .map_err(|e| StoreError::Encode(e.to_string()))?;
                        set.insert(path, value);
                    }
                    let options = FindOneAndUpdateOptions::builder()
                        .upsert(Some(true))
                        .return_document(Some(ReturnDocument::After))
                        .build();
                    col.find_one_and_update(filter, doc! {"$set": set}, options)
                        .await?
                }
            }
        };
        match written {
            Some(raw) => into_document(raw),
            None => Err(StoreError::Backend(format!(
                "write to {}/{} returned no document",
                collection, key
            ))),
        }
    }

    async fn subscribe(&self, collection: &str, key: &str) -> Result<Subscription, StoreError> {
        let col = self.get_collection(collection);
        let pipeline = vec![doc! {"$match": {"documentKey._id": key}}];
        let options = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .build();
        // open the stream before reading, so no change between the two is lost
        let mut changes = col.watch(pipeline, options).await?;
        let initial = self.get(collection, key).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(initial);

        let watched = format!("{}/{}", collection, key);
        let task = tokio::spawn(async move {
            loop {
                let event = match changes.try_next().await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(e) => {
                        log::warn!("change stream on {} failed: {}", watched, e);
                        break;
                    }
                };
                let snapshot = match (event.operation_type, event.full_document) {
                    (OperationType::Delete, _) | (_, None) => None,
                    (_, Some(raw)) => match into_document(raw) {
                        Ok(doc) => Some(doc),
                        Err(e) => {
                            log::warn!("skipping unreadable change on {}: {}", watched, e);
                            continue;
                        }
                    },
                };
                if sender.send(snapshot).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(receiver, move || task.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_paths_flatten_nested_patch() {
        let patch = match json!({"2024-03": {"pendingDue": 0}, "name": "Rao", "meta": {}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let mut paths = Vec::new();
        leaf_paths(None, patch, &mut paths);
        paths.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            paths,
            vec![
                (String::from("2024-03.pendingDue"), json!(0)),
                (String::from("meta"), json!({})),
                (String::from("name"), json!("Rao")),
            ]
        );
    }

    #[test]
    fn test_into_document_splits_key() {
        let raw = doc! {"_id": "T1", "name": "Rao", "contact": 98765_i64};
        let doc = into_document(raw).unwrap();
        assert_eq!(doc.key, "T1");
        assert_eq!(Value::Object(doc.fields), json!({"name": "Rao", "contact": 98765}));
    }
}
