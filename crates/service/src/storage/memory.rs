use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Storage;
use crate::domain::{Author, AuthorId, NewAuthor, NewPost, Post, PostId};
use crate::errors::StorageError;

/// Process-local backend for tests and the `memory` backend setting.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    posts: BTreeMap<PostId, models::post::Model>,
    authors: BTreeMap<AuthorId, Author>,
    last_post_id: PostId,
    last_author_id: AuthorId,
}

impl Tables {
    fn author(&self, id: AuthorId) -> Result<&Author, StorageError> {
        self.authors.get(&id).ok_or(StorageError::UnknownAuthor(id))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn posts(&self) -> Result<Vec<Post>, StorageError> {
        let tables = self.inner.read().await;
        Ok(tables
            .posts
            .values()
            .filter_map(|row| {
                let author = tables.authors.get(&row.author_id)?;
                Some(Post::from_parts(row.clone(), author.clone()))
            })
            .collect())
    }

    async fn add_post(&self, post: NewPost) -> Result<Post, StorageError> {
        let mut tables = self.inner.write().await;
        let author = tables.author(post.author_id)?.clone();
        tables.last_post_id += 1;
        let row = models::post::Model {
            id: tables.last_post_id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: post.created_at,
        };
        tables.posts.insert(row.id, row.clone());
        Ok(Post::from_parts(row, author))
    }

    async fn update_post(&self, id: PostId, post: NewPost) -> Result<Post, StorageError> {
        let mut tables = self.inner.write().await;
        if !tables.posts.contains_key(&id) {
            return Err(StorageError::post_not_found(id));
        }
        let author = tables.author(post.author_id)?.clone();
        let row = models::post::Model {
            id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: post.created_at,
        };
        tables.posts.insert(id, row.clone());
        Ok(Post::from_parts(row, author))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), StorageError> {
        let mut tables = self.inner.write().await;
        tables.posts.remove(&id).map(|_| ()).ok_or(StorageError::post_not_found(id))
    }

    async fn add_author(&self, author: NewAuthor) -> Result<Author, StorageError> {
        author.validate()?;
        let mut tables = self.inner.write().await;
        tables.last_author_id += 1;
        let created = Author { id: tables.last_author_id, name: author.name, avatar_url: author.avatar_url };
        tables.authors.insert(created.id, created.clone());
        Ok(created)
    }

    async fn author_by_id(&self, id: AuthorId) -> Result<Author, StorageError> {
        let tables = self.inner.read().await;
        tables.authors.get(&id).cloned().ok_or(StorageError::author_not_found(id))
    }

    async fn authors(&self) -> Result<Vec<Author>, StorageError> {
        let tables = self.inner.read().await;
        Ok(tables.authors.values().cloned().collect())
    }
}
