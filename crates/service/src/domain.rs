//! Read and write models shared by all storage backends.
//!
//! `Post` is the read model: it carries the joined `Author`. Writes go through
//! `NewPost`, which only references the author by id.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

pub type PostId = i32;
pub type AuthorId = i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: AuthorId,
    /// Epoch seconds.
    pub created_at: i64,
    pub author: Author,
}

impl Post {
    pub fn from_parts(row: models::post::Model, author: Author) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            created_at: row.created_at,
            author,
        }
    }

    /// `dd.mm.yyyy hh:mm` in the server's local time zone, for views only.
    pub fn display_date(&self) -> String {
        self.display_date_in(&Local)
    }

    pub fn display_date_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        DateTime::from_timestamp(self.created_at, 0)
            .map(|dt| dt.with_timezone(tz).format("%d.%m.%Y %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Fields a caller supplies to create or fully replace a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: AuthorId,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthor {
    pub name: String,
    pub avatar_url: Option<String>,
}

impl NewAuthor {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.name.trim().is_empty() {
            return Err(StorageError::Validation("author name must not be empty".into()));
        }
        Ok(())
    }
}

impl From<models::author::Model> for Author {
    fn from(m: models::author::Model) -> Self {
        Self { id: m.id, name: m.name, avatar_url: m.avatar_url }
    }
}

/// View model for the add-post form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageData {
    pub authors: Vec<Author>,
}
