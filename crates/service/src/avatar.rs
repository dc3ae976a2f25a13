//! Avatar upload pipeline: decode the uploaded image, shrink it to a fixed
//! thumbnail and store it under the static tree so `ServeDir` can serve it.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use configs::PathsConfig;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::{info, warn};

/// Edge length of stored avatars, in pixels.
pub const THUMBNAIL_SIZE: u32 = 32;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("unsupported avatar format: {0:?}")]
    UnsupportedFormat(String),
    #[error("invalid avatar name: {0:?}")]
    InvalidName(String),
    #[error("cannot decode avatar image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("cannot encode avatar thumbnail: {0}")]
    Encode(#[source] image::ImageError),
    #[error("avatar io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("avatar worker failed: {0}")]
    Task(String),
}

impl AvatarError {
    /// True when the upload itself is at fault rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::InvalidName(_) | Self::Decode(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarFormat {
    Jpeg,
    Png,
}

impl AvatarFormat {
    /// Detect from the uploaded file name's extension.
    pub fn from_file_name(file_name: &str) -> Result<Self, AvatarError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            _ => Err(AvatarError::UnsupportedFormat(file_name.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}

/// Map a display name onto something safe to embed in a file name.
///
/// Letters and digits of any script, `-` and `_` are kept; everything else
/// (separators, dots, whitespace, control characters) becomes `_`.
pub fn sanitize_name(name: &str) -> Result<String, AvatarError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        return Err(AvatarError::InvalidName(name.to_string()));
    }
    Ok(cleaned)
}

/// Decode `bytes`, resize to `THUMBNAIL_SIZE` square and re-encode in the same format.
pub fn make_thumbnail(bytes: &[u8], format: AvatarFormat) -> Result<Vec<u8>, AvatarError> {
    let img = image::load_from_memory_with_format(bytes, format.image_format()).map_err(AvatarError::Decode)?;
    let thumb = img.resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);
    let thumb = match format {
        // JPEG has no alpha channel
        AvatarFormat::Jpeg => DynamicImage::ImageRgb8(thumb.to_rgb8()),
        AvatarFormat::Png => thumb,
    };
    let mut out = Cursor::new(Vec::new());
    thumb.write_to(&mut out, format.image_format()).map_err(AvatarError::Encode)?;
    Ok(out.into_inner())
}

#[derive(Debug, Clone)]
pub struct AvatarPipeline {
    root: PathBuf,
    url_prefix: String,
}

impl AvatarPipeline {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self { root: root.into(), url_prefix }
    }

    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::new(paths.avatar_dir(), format!("/static/{}", paths.avatar_subdir.trim_matches('/')))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and thumbnail an upload without touching the disk.
    ///
    /// The returned [`StagedAvatar`] already knows its public URL; nothing is
    /// written until [`AvatarPipeline::commit`].
    pub async fn stage(&self, name: &str, file_name: &str, bytes: Vec<u8>) -> Result<StagedAvatar, AvatarError> {
        let safe_name = sanitize_name(name)?;
        let format = AvatarFormat::from_file_name(file_name)?;

        let thumbnail = tokio::task::spawn_blocking(move || make_thumbnail(&bytes, format))
            .await
            .map_err(|e| AvatarError::Task(e.to_string()))??;

        let stored = format!("av_{safe_name}.{}", format.extension());
        Ok(StagedAvatar {
            url: format!("{}/{stored}", self.url_prefix),
            path: self.root.join(&stored),
            thumbnail,
        })
    }

    /// Write a staged thumbnail. An existing avatar at the same path is overwritten.
    pub async fn commit(&self, staged: StagedAvatar) -> Result<String, AvatarError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| AvatarError::Io { path: self.root.clone(), source })?;

        let path = &staged.path;
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            warn!(path = %path.display(), "overwriting existing avatar");
        }
        tokio::fs::write(path, &staged.thumbnail)
            .await
            .map_err(|source| AvatarError::Io { path: path.clone(), source })?;

        info!(path = %path.display(), bytes = staged.thumbnail.len(), "avatar stored");
        Ok(staged.url)
    }

    /// Stage and commit in one step; returns the public URL.
    pub async fn store(&self, name: &str, file_name: &str, bytes: Vec<u8>) -> Result<String, AvatarError> {
        let staged = self.stage(name, file_name, bytes).await?;
        self.commit(staged).await
    }
}

/// A validated thumbnail waiting to be written.
#[derive(Debug)]
pub struct StagedAvatar {
    url: String,
    path: PathBuf,
    thumbnail: Vec<u8>,
}

impl StagedAvatar {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn sample(format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(AvatarFormat::from_file_name("me.PNG").unwrap(), AvatarFormat::Png);
        assert_eq!(AvatarFormat::from_file_name("me.jpeg").unwrap(), AvatarFormat::Jpeg);
        assert_eq!(AvatarFormat::from_file_name("a.b.JPG").unwrap(), AvatarFormat::Jpeg);
        assert!(matches!(AvatarFormat::from_file_name("me.gif"), Err(AvatarError::UnsupportedFormat(_))));
        assert!(matches!(AvatarFormat::from_file_name("noext"), Err(AvatarError::UnsupportedFormat(_))));
    }

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_name("Alice").unwrap(), "Alice");
        assert_eq!(sanitize_name("../etc/passwd").unwrap(), "___etc_passwd");
        assert_eq!(sanitize_name("Jo Ann-2_x").unwrap(), "Jo_Ann-2_x");
        assert_eq!(sanitize_name("Иван").unwrap(), "Иван");
        assert_eq!(sanitize_name("Ли.Мин").unwrap(), "Ли_Мин");
        assert!(matches!(sanitize_name("   "), Err(AvatarError::InvalidName(_))));
    }

    #[test]
    fn thumbnails_are_32_square() {
        for (fmt, img_fmt) in [(AvatarFormat::Png, ImageFormat::Png), (AvatarFormat::Jpeg, ImageFormat::Jpeg)] {
            let thumb = make_thumbnail(&sample(img_fmt), fmt).unwrap();
            let decoded = image::load_from_memory_with_format(&thumb, img_fmt).unwrap();
            assert_eq!(decoded.dimensions(), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
        }
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        let err = make_thumbnail(b"definitely not a png", AvatarFormat::Png).unwrap_err();
        assert!(matches!(err, AvatarError::Decode(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_url() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let pipeline = AvatarPipeline::new(tmp.path().join("avatars"), "/static/avatars/");
        let url = pipeline.store("Alice", "me.png", sample(ImageFormat::Png)).await?;
        assert_eq!(url, "/static/avatars/av_Alice.png");

        let written = tokio::fs::read(tmp.path().join("avatars/av_Alice.png")).await?;
        let decoded = image::load_from_memory(&written)?;
        assert_eq!(decoded.dimensions(), (32, 32));
        Ok(())
    }

    #[tokio::test]
    async fn store_overwrites_same_name() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let pipeline = AvatarPipeline::new(tmp.path(), "/static/avatars");
        pipeline.store("Bob", "a.jpg", sample(ImageFormat::Jpeg)).await?;
        let url = pipeline.store("Bob", "b.JPEG", sample(ImageFormat::Jpeg)).await?;
        assert_eq!(url, "/static/avatars/av_Bob.jpg");
        let entries = std::fs::read_dir(tmp.path())?.count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[tokio::test]
    async fn distinct_cyrillic_names_keep_distinct_files() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let pipeline = AvatarPipeline::new(tmp.path(), "/static/avatars");
        let ivan = pipeline.store("Иван", "a.png", sample(ImageFormat::Png)).await?;
        let oleg = pipeline.store("Олег", "b.png", sample(ImageFormat::Png)).await?;
        assert_eq!(ivan, "/static/avatars/av_Иван.png");
        assert_eq!(oleg, "/static/avatars/av_Олег.png");
        assert_eq!(std::fs::read_dir(tmp.path())?.count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn stage_writes_nothing_until_commit() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("avatars");
        let pipeline = AvatarPipeline::new(&root, "/static/avatars");
        let staged = pipeline.stage("Alice", "me.png", sample(ImageFormat::Png)).await?;
        assert_eq!(staged.url(), "/static/avatars/av_Alice.png");
        assert!(!root.exists());

        let url = pipeline.commit(staged).await?;
        assert_eq!(url, "/static/avatars/av_Alice.png");
        assert!(root.join("av_Alice.png").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn store_rejects_before_touching_disk() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("never");
        let pipeline = AvatarPipeline::new(&root, "/static/avatars");
        let err = pipeline.store("Eve", "x.bmp", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, AvatarError::UnsupportedFormat(_)));
        let err = pipeline.store("Eve", "x.png", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, AvatarError::Decode(_)));
        assert!(!root.exists());
        Ok(())
    }

    #[test]
    fn url_prefix_follows_avatar_subdir() {
        let paths = PathsConfig { static_dir: "public".into(), avatar_subdir: "faces".into() };
        let pipeline = AvatarPipeline::from_paths(&paths);
        assert_eq!(pipeline.root(), Path::new("public/faces"));
        assert_eq!(pipeline.url_prefix, "/static/faces");
    }
}
