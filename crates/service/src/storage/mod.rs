//! Storage contract for posts and authors.
//!
//! Three interchangeable backends implement [`Storage`]: [`sql::SqlStore`]
//! (sea-orm over Postgres), [`document::DocumentStore`] (MongoDB) and
//! [`memory::MemoryStore`]. The composition root picks one at startup and hands it
//! to the HTTP layer as `Arc<dyn Storage>`.

use async_trait::async_trait;

use crate::domain::{Author, AuthorId, NewAuthor, NewPost, Post, PostId};
use crate::errors::StorageError;

pub mod document;
pub mod memory;
pub mod sql;

pub use document::DocumentStore;
pub use memory::MemoryStore;
pub use sql::SqlStore;

/// Persistence operations used by the request handlers. No method retries.
#[async_trait]
pub trait Storage: Send + Sync {
    /// All posts joined with their author, by ascending id. Posts whose author row is
    /// gone are left out.
    async fn posts(&self) -> Result<Vec<Post>, StorageError>;

    /// Insert a post; the backend assigns the id.
    async fn add_post(&self, post: NewPost) -> Result<Post, StorageError>;

    /// Replace title, content, author reference and timestamp of an existing post.
    async fn update_post(&self, id: PostId, post: NewPost) -> Result<Post, StorageError>;

    async fn delete_post(&self, id: PostId) -> Result<(), StorageError>;

    async fn add_author(&self, author: NewAuthor) -> Result<Author, StorageError>;

    async fn author_by_id(&self, id: AuthorId) -> Result<Author, StorageError>;

    async fn authors(&self) -> Result<Vec<Author>, StorageError>;

    /// Release connections. Called once on shutdown.
    async fn close(&self) {}
}

/// Behaviour every backend must share; each backend's tests run it.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;

    fn new_post(title: &str, author_id: AuthorId) -> NewPost {
        NewPost { title: title.into(), content: format!("{title} body"), author_id, created_at: 1_700_000_000 }
    }

    pub(crate) async fn exercise(store: &dyn Storage) -> anyhow::Result<()> {
        assert!(store.posts().await?.is_empty());

        let alice = store
            .add_author(NewAuthor { name: "Alice".into(), avatar_url: Some("/static/avatars/av_Alice.png".into()) })
            .await?;
        let bob = store.add_author(NewAuthor { name: "Bob".into(), avatar_url: None }).await?;
        assert_ne!(alice.id, bob.id);
        assert_eq!(store.author_by_id(bob.id).await?, bob);
        assert_eq!(store.authors().await?, vec![alice.clone(), bob.clone()]);

        let blank = store.add_author(NewAuthor { name: " ".into(), avatar_url: None }).await;
        assert!(matches!(blank, Err(StorageError::Validation(_))));

        // create: fresh unique ids, joined author
        let first = store.add_post(new_post("first", alice.id)).await?;
        let second = store.add_post(new_post("second", bob.id)).await?;
        let third = store.add_post(new_post("third", alice.id)).await?;
        assert!(first.id != second.id && second.id != third.id && first.id != third.id);
        assert_eq!(first.author, alice);

        let listed = store.posts().await?;
        assert_eq!(listed.len(), 3);
        let found = listed.iter().find(|p| p.id == second.id).expect("second listed");
        assert_eq!(found.title, "second");
        assert_eq!(found.content, "second body");
        assert_eq!(found.author, bob);

        let orphan = store.add_post(new_post("orphan", 9_999)).await;
        assert!(matches!(orphan, Err(StorageError::UnknownAuthor(9_999))));

        // update replaces exactly one post
        let replacement = NewPost { title: "second v2".into(), content: "new".into(), author_id: alice.id, created_at: 42 };
        let updated = store.update_post(second.id, replacement).await?;
        assert_eq!(updated.id, second.id);
        assert_eq!(updated.author, alice);
        let listed = store.posts().await?;
        let by_id = |id| listed.iter().find(|p| p.id == id).cloned().expect("listed");
        assert_eq!(by_id(second.id).title, "second v2");
        assert_eq!(by_id(second.id).created_at, 42);
        assert_eq!(by_id(first.id), first);
        assert_eq!(by_id(third.id), third);

        let missing = store.update_post(9_999, new_post("x", alice.id)).await;
        assert!(matches!(missing, Err(StorageError::NotFound { entity: "post", id: 9_999 })));
        let bad_author = store.update_post(first.id, new_post("x", 9_999)).await;
        assert!(matches!(bad_author, Err(StorageError::UnknownAuthor(9_999))));

        // delete removes exactly one; a repeat reports not found
        store.delete_post(first.id).await?;
        let remaining: Vec<_> = store.posts().await?.into_iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec![second.id, third.id]);
        let again = store.delete_post(first.id).await;
        assert!(matches!(again, Err(StorageError::NotFound { entity: "post", .. })));

        let no_author = store.author_by_id(9_999).await;
        assert!(matches!(no_author, Err(StorageError::NotFound { entity: "author", id: 9_999 })));
        Ok(())
    }
}
