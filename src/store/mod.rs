mod mongo;
mod sqlite;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Document};
use std::fmt;

pub use mongo::MongoStore;
pub use sqlite::SqliteStore;

// --- Collections ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Companies,
    Jobs,
    Applications,
}

impl Collection {
    /// Deletion order used by the loader: dependents first.
    pub const CLEAR_ORDER: [Collection; 4] = [
        Collection::Applications,
        Collection::Jobs,
        Collection::Companies,
        Collection::Users,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Companies => "companies",
            Collection::Jobs => "jobs",
            Collection::Applications => "applications",
        }
    }

    /// Field whose value must be unique across the collection, if any.
    pub fn unique_key(&self) -> Option<&'static str> {
        match self {
            Collection::Users => Some("email"),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// --- Store trait ---

/// A document database holding the four job-board collections.
///
/// Inserts are ordered and not transactional: when one document in a batch
/// fails, the documents before it stay committed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human-readable target, with credentials stripped.
    fn describe(&self) -> String;

    async fn ensure_indexes(&self) -> Result<()>;

    /// Deletes every document in the collection and returns how many were removed.
    async fn delete_all(&self, collection: Collection) -> Result<u64>;

    /// Inserts the documents and returns their generated ids in input order.
    async fn insert_many(&self, collection: Collection, documents: Vec<Document>) -> Result<Vec<ObjectId>>;

    /// Every document in insertion order, `_id` included.
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>>;

    async fn count(&self, collection: Collection) -> Result<u64>;
}

/// Opens the store named by `uri` and checks that it answers.
pub async fn connect(uri: &str, database: Option<&str>) -> Result<Box<dyn DocumentStore>> {
    if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
        let store = MongoStore::connect(uri, database).await?;
        Ok(Box::new(store))
    } else if let Some(path) = uri.strip_prefix("sqlite:") {
        let store = if path == ":memory:" {
            SqliteStore::in_memory()?
        } else {
            SqliteStore::open(path.trim_start_matches("//"))?
        };
        Ok(Box::new(store))
    } else {
        Err(anyhow!(
            "Unsupported store URI '{}'. Expected mongodb://, mongodb+srv:// or sqlite://",
            redact(uri)
        ))
    }
}

/// Drops the `user:password@` part of a connection string.
pub fn redact(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &uri[..scheme_end], &uri[at + 1..])
        }
        _ => uri.to_string(),
    }
}
