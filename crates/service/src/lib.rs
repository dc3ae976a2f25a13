//! Service layer for the news site.
//! - `storage`: the backend-agnostic [`storage::Storage`] contract and its implementations.
//! - `avatar`: thumbnailing and storing uploaded author avatars.
//! - `domain`: read/write models shared by handlers and backends.

pub mod avatar;
pub mod domain;
pub mod errors;
pub mod runtime;
pub mod storage;
#[cfg(test)]
mod test_support;

pub use avatar::{AvatarError, AvatarPipeline, StagedAvatar};
pub use domain::{Author, AuthorId, NewAuthor, NewPost, PageData, Post, PostId};
pub use errors::StorageError;
pub use storage::Storage;
