//! HTML views rendered with askama. Templates live in `templates/`.

use askama::Template;
use axum::response::Html;
use service::{PageData, Post};

use crate::errors::AppError;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub posts: Vec<Post>,
}

#[derive(Template)]
#[template(path = "add_post.html")]
pub struct AddPostPage {
    pub data: PageData,
}

#[derive(Template)]
#[template(path = "add_user.html")]
pub struct AddUserPage;

pub fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}
