//! HTML pages and the form endpoints behind them.

use axum::{
    extract::{Multipart, State},
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;
use service::{NewAuthor, NewPost, PageData};
use tracing::{error, info};

use crate::errors::AppError;
use crate::state::AppState;
use crate::views::{render, AddPostPage, AddUserPage, IndexPage};

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let posts = state.storage.posts().await?;
    render(&IndexPage { posts })
}

pub async fn add_post_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let authors = state.storage.authors().await?;
    render(&AddPostPage { data: PageData { authors } })
}

pub async fn add_user_form() -> Result<Html<String>, AppError> {
    render(&AddUserPage)
}

#[derive(Debug, Deserialize)]
pub struct AddPostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: String,
}

pub async fn add_post(State(state): State<AppState>, Form(form): Form<AddPostForm>) -> Result<Redirect, AppError> {
    let raw = form.author_id.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("author_id is required".into()));
    }
    let author_id = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid author id: {raw:?}")))?;
    let post = NewPost {
        title: form.title,
        content: form.content,
        author_id,
        created_at: chrono::Utc::now().timestamp(),
    };
    state.storage.add_post(post).await?;
    Ok(Redirect::to("/"))
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// `multipart/form-data` with a `name` text field and an optional `avatar` file.
pub async fn add_user(State(state): State<AppState>, mut multipart: Multipart) -> Result<Redirect, AppError> {
    let mut name = String::new();
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("name") => {
                name = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable name field: {e}")))?;
            }
            Some("avatar") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable avatar field: {e}")))?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    upload = Some(Upload { file_name, bytes: bytes.to_vec() });
                }
            }
            _ => {}
        }
    }

    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    // the thumbnail only reaches disk once the author row exists
    let staged = match upload {
        Some(Upload { file_name, bytes }) => Some(state.avatars.stage(&name, &file_name, bytes).await?),
        None => None,
    };
    let avatar_url = staged.as_ref().map(|s| s.url().to_string());
    let author = state.storage.add_author(NewAuthor { name, avatar_url }).await?;
    if let Some(staged) = staged {
        if let Err(e) = state.avatars.commit(staged).await {
            error!(author_id = author.id, error = %e, "author added but avatar write failed");
            return Err(e.into());
        }
    }
    info!(author_id = author.id, "author added");
    Ok(Redirect::to("/"))
}
