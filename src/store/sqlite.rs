use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Document};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Collection, DocumentStore};

/// Embedded document store: one table per collection, each row holding the
/// document's raw BSON bytes keyed by its ObjectId.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite store at {}", path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path),
        };
        store.init()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.with_conn(|conn| {
            for collection in Collection::CLEAR_ORDER {
                conn.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id TEXT PRIMARY KEY,
                        unique_key TEXT UNIQUE,
                        body BLOB NOT NULL
                    );",
                    collection.name()
                ))?;
            }
            Ok(())
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("SQLite store lock poisoned"))?;
        f(&conn)
    }
}

fn encode(doc: &Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.to_writer(&mut bytes)?;
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<Document> {
    let mut reader = bytes;
    Ok(Document::from_reader(&mut reader)?)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite://{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }

    async fn ensure_indexes(&self) -> Result<()> {
        // Uniqueness lives in the table definition.
        Ok(())
    }

    async fn delete_all(&self, collection: Collection) -> Result<u64> {
        self.with_conn(|conn| {
            let deleted = conn.execute(&format!("DELETE FROM {}", collection.name()), [])?;
            Ok(deleted as u64)
        })
    }

    async fn insert_many(&self, collection: Collection, documents: Vec<Document>) -> Result<Vec<ObjectId>> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO {} (id, unique_key, body) VALUES (?1, ?2, ?3)",
                collection.name()
            );
            let mut ids = Vec::with_capacity(documents.len());

            for (index, mut doc) in documents.into_iter().enumerate() {
                let id = match doc.get_object_id("_id") {
                    Ok(id) => id,
                    Err(_) => {
                        let id = ObjectId::new();
                        doc.insert("_id", id);
                        id
                    }
                };
                let unique_key = collection
                    .unique_key()
                    .and_then(|key| doc.get_str(key).ok())
                    .map(str::to_string);

                conn.execute(&sql, params![id.to_hex(), unique_key, encode(&doc)?])
                    .with_context(|| {
                        format!("Insert into {} failed at document {}", collection, index)
                    })?;
                ids.push(id);
            }

            Ok(ids)
        })
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT body FROM {} ORDER BY rowid",
                collection.name()
            ))?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

            let mut docs = Vec::new();
            for body in rows {
                docs.push(decode(&body?)?);
            }
            Ok(docs)
        })
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", collection.name()),
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn test_insert_returns_ids_in_input_order() {
        let store = SqliteStore::in_memory().unwrap();
        let ids = store
            .insert_many(
                Collection::Companies,
                vec![doc! { "name": "Tech Corp" }, doc! { "name": "Startup Hub" }],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let docs = store.find_all(Collection::Companies).await.unwrap();
        assert_eq!(docs[0].get_object_id("_id").unwrap(), ids[0]);
        assert_eq!(docs[0].get_str("name").unwrap(), "Tech Corp");
        assert_eq!(docs[1].get_object_id("_id").unwrap(), ids[1]);
    }

    #[tokio::test]
    async fn test_insert_keeps_caller_supplied_id() {
        let store = SqliteStore::in_memory().unwrap();
        let id = ObjectId::new();
        let ids = store
            .insert_many(Collection::Jobs, vec![doc! { "_id": id, "title": "QA" }])
            .await
            .unwrap();
        assert_eq!(ids, vec![id]);
    }

    #[tokio::test]
    async fn test_duplicate_email_fails_without_rolling_back() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store
            .insert_many(
                Collection::Users,
                vec![
                    doc! { "email": "alice@student.com" },
                    doc! { "email": "bob@student.com" },
                    doc! { "email": "alice@student.com" },
                ],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.count(Collection::Users).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_all_only_touches_one_collection() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_many(Collection::Jobs, vec![doc! { "title": "A" }, doc! { "title": "B" }])
            .await
            .unwrap();
        store
            .insert_many(Collection::Applications, vec![doc! { "status": "pending" }])
            .await
            .unwrap();

        assert_eq!(store.delete_all(Collection::Jobs).await.unwrap(), 2);
        assert_eq!(store.count(Collection::Jobs).await.unwrap(), 0);
        assert_eq!(store.count(Collection::Applications).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_persists_between_handles() {
        let dir = std::env::temp_dir().join(format!("jobboard-seed-{}", ObjectId::new()));
        let path = dir.join("store.db");

        let store = SqliteStore::open(&path).unwrap();
        store
            .insert_many(Collection::Users, vec![doc! { "email": "eve@student.com" }])
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count(Collection::Users).await.unwrap(), 1);
        assert!(reopened.describe().starts_with("sqlite://"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
