use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};

use super::{redact, Collection, DocumentStore};

/// Database used when neither the config nor the URI names one.
const DEFAULT_DATABASE: &str = "test";

/// IndexOptionsConflict and IndexKeySpecsConflict.
const INDEX_CONFLICT_CODES: [i32; 2] = [85, 86];

fn unique_index(key: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(key, 1i32);
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn is_index_conflict(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Command(command) if INDEX_CONFLICT_CODES.contains(&command.code)
    )
}

pub struct MongoStore {
    database: Database,
    target: String,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: Option<&str>) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .with_context(|| format!("Invalid MongoDB connection string {}", redact(uri)))?;

        let database = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };

        // The driver connects lazily; make an unreachable server fail here.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("MongoDB at {} did not answer ping", redact(uri)))?;

        let target = format!("{} (database {})", redact(uri), database.name());
        log::info!("Connected to {}", target);

        Ok(Self { database, target })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.database.collection::<Document>(collection.name())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn describe(&self) -> String {
        self.target.clone()
    }

    async fn ensure_indexes(&self) -> Result<()> {
        for collection in Collection::CLEAR_ORDER {
            let Some(key) = collection.unique_key() else {
                continue;
            };
            let target = self.collection(collection);
            let created = match target.create_index(unique_index(key)).await {
                Ok(created) => created,
                Err(e) if is_index_conflict(&e) => {
                    // An older index on the same key with other options; replace it.
                    let name = format!("{}_1", key);
                    log::warn!("Rebuilding index {} on {}: {}", name, collection, e);
                    target
                        .drop_index(name.as_str())
                        .await
                        .with_context(|| format!("Failed to drop index {} on {}", name, collection))?;
                    target.create_index(unique_index(key)).await.with_context(|| {
                        format!("Failed to create unique index on {}.{}", collection, key)
                    })?
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create unique index on {}.{}", collection, key));
                }
            };
            log::debug!("Index {} ready on {}", created.index_name, collection);
        }
        Ok(())
    }

    async fn delete_all(&self, collection: Collection) -> Result<u64> {
        let result = self
            .collection(collection)
            .delete_many(doc! {})
            .await
            .with_context(|| format!("Failed to clear {}", collection))?;
        Ok(result.deleted_count)
    }

    async fn insert_many(&self, collection: Collection, documents: Vec<Document>) -> Result<Vec<ObjectId>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let expected = documents.len();

        let mut result = self
            .collection(collection)
            .insert_many(documents)
            .await
            .with_context(|| format!("Failed to insert into {}", collection))?;

        (0..expected)
            .map(|index| match result.inserted_ids.remove(&index) {
                Some(Bson::ObjectId(id)) => Ok(id),
                Some(other) => Err(anyhow!(
                    "Document {} in {} got a non-ObjectId _id: {}",
                    index,
                    collection,
                    other
                )),
                None => Err(anyhow!("Document {} in {} reported no _id", index, collection)),
            })
            .collect()
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .with_context(|| format!("Failed to read {}", collection))?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        let count = self
            .collection(collection)
            .count_documents(doc! {})
            .await
            .with_context(|| format!("Failed to count {}", collection))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_index_on_key() {
        let index = unique_index("email");
        assert_eq!(index.keys, doc! { "email": 1 });
        assert_eq!(index.options.and_then(|o| o.unique), Some(true));
    }
}
