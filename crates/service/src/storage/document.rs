use std::{collections::HashMap, future::IntoFuture, time::Duration};

use async_trait::async_trait;
use configs::MongoConfig;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::ErrorKind,
    options::ReturnDocument,
    Client, Collection, Database,
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{error, info, instrument};

use super::Storage;
use crate::domain::{Author, AuthorId, NewAuthor, NewPost, Post, PostId};
use crate::errors::StorageError;

const POSTS: &str = "posts";
const AUTHORS: &str = "authors";
const COUNTERS: &str = "counters";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PostDoc {
    #[serde(rename = "_id")]
    id: PostId,
    title: String,
    content: String,
    author_id: AuthorId,
    created_at: i64,
}

impl From<PostDoc> for models::post::Model {
    fn from(d: PostDoc) -> Self {
        Self { id: d.id, title: d.title, content: d.content, author_id: d.author_id, created_at: d.created_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorDoc {
    #[serde(rename = "_id")]
    id: AuthorId,
    name: String,
    avatar_url: Option<String>,
}

impl From<AuthorDoc> for Author {
    fn from(d: AuthorDoc) -> Self {
        Self { id: d.id, name: d.name, avatar_url: d.avatar_url }
    }
}

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i32,
}

/// MongoDB-backed storage. Integer ids come from a `counters` collection so both
/// backends expose the same identifiers; every round trip is bounded by
/// `op_timeout`.
pub struct DocumentStore {
    client: Client,
    db: Database,
    op_timeout: Duration,
}

fn map_mongo_err(e: mongodb::error::Error) -> StorageError {
    match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => StorageError::Connection(e.to_string()),
        _ => StorageError::Query(e.to_string()),
    }
}

impl DocumentStore {
    /// Connect, ping and select the configured database.
    pub async fn connect(cfg: &MongoConfig) -> Result<Self, StorageError> {
        cfg.validate().map_err(|e| StorageError::Configuration(e.to_string()))?;
        let op_timeout = Duration::from_secs(cfg.op_timeout_secs);

        let client = match timeout(op_timeout, Client::with_uri_str(&cfg.uri)).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                error!(error = %e, "mongodb client setup failed");
                return Err(StorageError::Connection(e.to_string()));
            }
            Err(_) => {
                return Err(StorageError::Connection(format!("mongodb client setup exceeded {op_timeout:?}")))
            }
        };
        let db = client.database(&cfg.database);
        let store = Self { client, db, op_timeout };

        store
            .bounded(store.db.run_command(doc! { "ping": 1 }))
            .await
            .map_err(|e| {
                error!(error = %e, "mongodb ping failed");
                match e {
                    StorageError::Query(msg) => StorageError::Connection(msg),
                    StorageError::Timeout(after) => {
                        StorageError::Connection(format!("mongodb did not answer ping within {after:?}"))
                    }
                    other => other,
                }
            })?;
        info!(database = %cfg.database, "connected to mongodb");
        Ok(store)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match timeout(self.op_timeout, op.into_future()).await {
            Ok(res) => res.map_err(map_mongo_err),
            Err(_) => Err(StorageError::Timeout(self.op_timeout)),
        }
    }

    fn posts_coll(&self) -> Collection<PostDoc> {
        self.db.collection(POSTS)
    }

    fn authors_coll(&self) -> Collection<AuthorDoc> {
        self.db.collection(AUTHORS)
    }

    /// Atomically bump and return the sequence named `name`.
    async fn next_id(&self, name: &str) -> Result<i32, StorageError> {
        let counters: Collection<Counter> = self.db.collection(COUNTERS);
        let counter = self
            .bounded(
                counters
                    .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1 } })
                    .upsert(true)
                    .return_document(ReturnDocument::After),
            )
            .await?;
        counter
            .map(|c| c.seq)
            .ok_or_else(|| StorageError::Query(format!("counter `{name}` was not returned")))
    }

    async fn existing_author(&self, id: AuthorId) -> Result<Author, StorageError> {
        match self.author_by_id(id).await {
            Err(StorageError::NotFound { .. }) => Err(StorageError::UnknownAuthor(id)),
            other => other,
        }
    }

    async fn collect<T>(&self, coll: &Collection<T>) -> Result<Vec<T>, StorageError>
    where
        T: serde::de::DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self.bounded(coll.find(Document::new()).sort(doc! { "_id": 1 })).await?;
        self.bounded(cursor.try_collect::<Vec<T>>()).await
    }
}

#[async_trait]
impl Storage for DocumentStore {
    async fn posts(&self) -> Result<Vec<Post>, StorageError> {
        let authors: HashMap<AuthorId, Author> =
            self.authors().await?.into_iter().map(|a| (a.id, a)).collect();
        let docs = self.collect(&self.posts_coll()).await?;
        Ok(docs
            .into_iter()
            .filter_map(|d| {
                let author = authors.get(&d.author_id)?.clone();
                Some(Post::from_parts(d.into(), author))
            })
            .collect())
    }

    #[instrument(skip(self, input), fields(author_id = input.author_id))]
    async fn add_post(&self, input: NewPost) -> Result<Post, StorageError> {
        let author = self.existing_author(input.author_id).await?;
        let record = PostDoc {
            id: self.next_id(POSTS).await?,
            title: input.title,
            content: input.content,
            author_id: input.author_id,
            created_at: input.created_at,
        };
        self.bounded(self.posts_coll().insert_one(&record)).await?;
        info!(post_id = record.id, "post created");
        Ok(Post::from_parts(record.into(), author))
    }

    #[instrument(skip(self, input), fields(author_id = input.author_id))]
    async fn update_post(&self, id: PostId, input: NewPost) -> Result<Post, StorageError> {
        let exists = self.bounded(self.posts_coll().find_one(doc! { "_id": id })).await?;
        if exists.is_none() {
            return Err(StorageError::post_not_found(id));
        }
        let author = self.existing_author(input.author_id).await?;
        let res = self
            .bounded(self.posts_coll().update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "title": input.title.as_str(),
                    "content": input.content.as_str(),
                    "author_id": input.author_id,
                    "created_at": input.created_at,
                } },
            ))
            .await?;
        if res.matched_count == 0 {
            return Err(StorageError::post_not_found(id));
        }
        let row = models::post::Model {
            id,
            title: input.title,
            content: input.content,
            author_id: input.author_id,
            created_at: input.created_at,
        };
        Ok(Post::from_parts(row, author))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), StorageError> {
        let res = self.bounded(self.posts_coll().delete_one(doc! { "_id": id })).await?;
        if res.deleted_count == 0 {
            return Err(StorageError::post_not_found(id));
        }
        Ok(())
    }

    async fn add_author(&self, input: NewAuthor) -> Result<Author, StorageError> {
        input.validate()?;
        let record = AuthorDoc { id: self.next_id(AUTHORS).await?, name: input.name, avatar_url: input.avatar_url };
        self.bounded(self.authors_coll().insert_one(&record)).await?;
        info!(author_id = record.id, "author created");
        Ok(record.into())
    }

    async fn author_by_id(&self, id: AuthorId) -> Result<Author, StorageError> {
        self.bounded(self.authors_coll().find_one(doc! { "_id": id }))
            .await?
            .map(Author::from)
            .ok_or(StorageError::author_not_found(id))
    }

    async fn authors(&self) -> Result<Vec<Author>, StorageError> {
        let docs = self.collect(&self.authors_coll()).await?;
        Ok(docs.into_iter().map(Author::from).collect())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("mongodb client shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    fn test_config() -> Option<MongoConfig> {
        let uri = std::env::var("MONGO_URI").ok()?;
        Some(MongoConfig {
            uri,
            database: format!("newsdesk_test_{}", uuid::Uuid::new_v4().simple()),
            op_timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn document_store_honours_contract() -> anyhow::Result<()> {
        let Some(cfg) = test_config() else {
            eprintln!("MONGO_URI missing; skip document store tests");
            return Ok(());
        };
        let store = DocumentStore::connect(&cfg).await?;
        let outcome = contract::exercise(&store).await;
        store.db.drop().await?;
        store.close().await;
        outcome
    }

    #[tokio::test]
    async fn missing_uri_is_a_configuration_error() {
        let cfg = MongoConfig::default();
        let err = DocumentStore::connect(&cfg).await.err().expect("must fail");
        assert!(matches!(err, StorageError::Configuration(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return;
        }
        // Nothing listens on port 1; the op deadline fires long before server selection gives up.
        let cfg = MongoConfig {
            uri: "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=30000".into(),
            database: "newsdesk_unreachable".into(),
            op_timeout_secs: 1,
        };
        let err = DocumentStore::connect(&cfg).await.err().expect("must fail");
        assert!(matches!(err, StorageError::Connection(_)), "got {err:?}");
    }

    #[test]
    fn post_doc_uses_mongo_id_field() {
        let d = PostDoc { id: 7, title: "t".into(), content: "c".into(), author_id: 1, created_at: 0 };
        let bson = mongodb::bson::to_document(&d).unwrap();
        assert_eq!(bson.get_i32("_id").unwrap(), 7);
        assert!(bson.get("id").is_none());
    }
}
