//! JSON API for posts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use service::{AuthorId, NewPost, Post, PostId};

use crate::errors::AppError;
use crate::state::AppState;

/// Body of `POST /posts` and `PUT /posts/:id`. A missing `created_at` means now.
#[derive(Debug, Deserialize)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub author_id: AuthorId,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl From<PostInput> for NewPost {
    fn from(p: PostInput) -> Self {
        NewPost {
            title: p.title,
            content: p.content,
            author_id: p.author_id,
            created_at: p.created_at.unwrap_or_else(|| chrono::Utc::now().timestamp()),
        }
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<PostId, AppError> {
    raw.trim()
        .parse::<PostId>()
        .map_err(|_| AppError::BadRequest(format!("invalid post id: {raw:?}")))
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.storage.posts().await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let created = state.storage.add_post(input.into()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>, AppError> {
    let id = parse_id(&raw)?;
    Ok(Json(state.storage.update_post(id, input.into()).await?))
}

pub async fn delete_post(State(state): State<AppState>, Path(raw): Path<String>) -> Result<StatusCode, AppError> {
    let id = parse_id(&raw)?;
    state.storage.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
