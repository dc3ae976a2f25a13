use async_trait::async_trait;
use configs::PostgresConfig;
use migration::MigratorTrait;
use models::{author, post};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, QuerySelect, Set, SqlErr,
};
use tracing::{info, instrument, warn};

use super::Storage;
use crate::domain::{Author, AuthorId, NewAuthor, NewPost, Post, PostId};
use crate::errors::StorageError;

/// SeaORM-backed storage over a relational database.
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    /// Validate the settings, open the pool and ping the server.
    pub async fn connect(cfg: &PostgresConfig) -> Result<Self, StorageError> {
        let db = models::db::connect(cfg).await?;
        Ok(Self { db })
    }

    /// Wrap an already opened connection (tests use in-memory SQLite this way).
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        migration::Migrator::up(&self.db, None)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }
}

/// Translate a driver error; `author_id` is the reference a write tried to set.
fn map_db_err(e: DbErr, author_id: Option<AuthorId>) -> StorageError {
    if let (Some(SqlErr::ForeignKeyConstraintViolation(_)), Some(id)) = (e.sql_err(), author_id) {
        return StorageError::UnknownAuthor(id);
    }
    match &e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StorageError::Connection(e.to_string()),
        _ => StorageError::Query(e.to_string()),
    }
}

#[async_trait]
impl Storage for SqlStore {
    async fn posts(&self) -> Result<Vec<Post>, StorageError> {
        let rows = post::Entity::find()
            .inner_join(author::Entity)
            .select_also(author::Entity)
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;
        Ok(rows
            .into_iter()
            .filter_map(|(row, author)| author.map(|a| Post::from_parts(row, a.into())))
            .collect())
    }

    #[instrument(skip(self, input), fields(author_id = input.author_id))]
    async fn add_post(&self, input: NewPost) -> Result<Post, StorageError> {
        let author_id = input.author_id;
        let am = post::ActiveModel {
            title: Set(input.title),
            content: Set(input.content),
            author_id: Set(input.author_id),
            created_at: Set(input.created_at),
            ..Default::default()
        };
        let row = am.insert(&self.db).await.map_err(|e| map_db_err(e, Some(author_id)))?;
        let author = self.author_by_id(row.author_id).await?;
        info!(post_id = row.id, "post created");
        Ok(Post::from_parts(row, author))
    }

    #[instrument(skip(self, input), fields(author_id = input.author_id))]
    async fn update_post(&self, id: PostId, input: NewPost) -> Result<Post, StorageError> {
        let author_id = input.author_id;
        let am = post::ActiveModel {
            id: Set(id),
            title: Set(input.title),
            content: Set(input.content),
            author_id: Set(input.author_id),
            created_at: Set(input.created_at),
        };
        let row = match am.update(&self.db).await {
            Ok(row) => row,
            Err(DbErr::RecordNotUpdated) => return Err(StorageError::post_not_found(id)),
            Err(e) => return Err(map_db_err(e, Some(author_id))),
        };
        let author = self.author_by_id(row.author_id).await?;
        Ok(Post::from_parts(row, author))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), StorageError> {
        let res = post::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;
        if res.rows_affected == 0 {
            return Err(StorageError::post_not_found(id));
        }
        Ok(())
    }

    async fn add_author(&self, input: NewAuthor) -> Result<Author, StorageError> {
        input.validate()?;
        let am = author::ActiveModel {
            name: Set(input.name),
            avatar_url: Set(input.avatar_url),
            ..Default::default()
        };
        let created = am.insert(&self.db).await.map_err(|e| map_db_err(e, None))?;
        info!(author_id = created.id, "author created");
        Ok(created.into())
    }

    async fn author_by_id(&self, id: AuthorId) -> Result<Author, StorageError> {
        author::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?
            .map(Author::from)
            .ok_or(StorageError::author_not_found(id))
    }

    async fn authors(&self) -> Result<Vec<Author>, StorageError> {
        let rows = author::Entity::find()
            .order_by_asc(author::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;
        Ok(rows.into_iter().map(Author::from).collect())
    }

    async fn close(&self) {
        match self.db.clone().close().await {
            Ok(()) => info!("database pool closed"),
            Err(e) => warn!(error = %e, "closing database pool failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use crate::test_support::sqlite_store;

    #[tokio::test]
    async fn sql_store_honours_contract() -> anyhow::Result<()> {
        let store = sqlite_store().await?;
        contract::exercise(&store).await
    }

    #[tokio::test]
    async fn migrate_is_idempotent() -> anyhow::Result<()> {
        let store = sqlite_store().await?;
        store.migrate().await?;
        assert!(store.authors().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn connect_without_settings_is_a_configuration_error() {
        let cfg = PostgresConfig::default();
        let err = SqlStore::connect(&cfg).await.err().expect("must fail");
        assert!(matches!(err, StorageError::Configuration(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return;
        }
        // Nothing listens on port 1; connect must fail fast instead of hanging.
        let cfg = PostgresConfig {
            host: "127.0.0.1".into(),
            port: Some(1),
            user: "u".into(),
            password: "p".into(),
            name: "db".into(),
            connect_timeout_secs: 2,
            acquire_timeout_secs: 2,
            ..PostgresConfig::default()
        };
        let err = SqlStore::connect(&cfg).await.err().expect("must fail");
        assert!(matches!(err, StorageError::Connection(_)), "got {err:?}");
    }
}
