#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
    Router,
};
use configs::PathsConfig;
use image::{DynamicImage, ImageFormat, RgbImage};
use server::{build_router, AppState};
use service::{storage::MemoryStore, NewAuthor, Storage};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub paths: PathsConfig,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> anyhow::Result<Self> {
        let (dir, paths) = scratch_paths()?;
        let store = Arc::new(MemoryStore::new());
        let storage: Arc<dyn Storage> = store.clone();
        let router = build_router(AppState::new(storage, &paths));
        Ok(Self { router, store, paths, _dir: dir })
    }

    pub async fn send(&self, req: Request<Body>) -> anyhow::Result<Response<Body>> {
        Ok(self.router.clone().oneshot(req).await?)
    }

    pub async fn author(&self, name: &str) -> anyhow::Result<i32> {
        let a = self.store.add_author(NewAuthor { name: name.into(), avatar_url: None }).await?;
        Ok(a.id)
    }
}

/// Temporary static tree with one stylesheet and an `avatars` subdir setting.
pub fn scratch_paths() -> anyhow::Result<(TempDir, PathsConfig)> {
    let dir = tempfile::tempdir()?;
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(static_dir.join("css"))?;
    std::fs::write(static_dir.join("css/style.css"), "body {}")?;
    let paths = PathsConfig {
        static_dir: static_dir.to_string_lossy().into_owned(),
        avatar_subdir: "avatars".into(),
    };
    Ok((dir, paths))
}

/// Percent-encode every non-ASCII byte, as a browser does for a request path.
pub fn encode_path(path: &str) -> String {
    path.bytes()
        .map(|b| if b.is_ascii() { (b as char).to_string() } else { format!("%{b:02X}") })
        .collect()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(resp: Response<Body>) -> anyhow::Result<String> {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn png_64() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 64, |x, y| image::Rgb([x as u8 * 3, y as u8 * 3, 128]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub const BOUNDARY: &str = "newsdesk-test-boundary";

/// Build a `multipart/form-data` request for `/add-user`.
pub fn add_user_request(name: &str, avatar: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n").as_bytes(),
    );
    if let Some((file_name, bytes)) = avatar {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/add-user")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}
