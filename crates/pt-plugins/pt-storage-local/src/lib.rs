//! # pt-storage-local
//! pagetree/crates/pt-plugins/pt-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore` for image assets.
//! Features: Content-addressable storage, directory sharding, and thumbnailing.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use pt_core::error::{AppError, Result};
use pt_core::traits::{MediaStore, StoredFile};
use sha2::{Digest, Sha256};
use tokio::fs;

/// Longest edge of the thumbnail rendition, in pixels.
const THUMB_SIZE: u32 = 250;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/images")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media/images")
    url_prefix: String,
}

fn io_err(err: std::io::Error) -> AppError {
    AppError::Internal(format!("media store: {err}"))
}

/// "ab/cd/<hash>" relative location of a stored file.
fn sharded(hash: &str, name: &str) -> Option<String> {
    if hash.len() < 4 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("{}/{}/{}", &hash[0..2], &hash[2..4], name))
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Generates a sharded path: "ab/cd/ef...hash"
    fn get_sharded_path(&self, hash: &str) -> Result<PathBuf> {
        let rel = sharded(hash, hash)
            .ok_or_else(|| AppError::ValidationError(format!("invalid media key '{hash}'")))?;
        Ok(self.root_path.join(rel))
    }

    fn thumbnail_path(original: &Path, hash: &str) -> PathBuf {
        original.with_file_name(format!("thumb_{hash}.webp"))
    }

    fn url_for(&self, hash: &str, name: &str) -> String {
        match sharded(hash, name) {
            Some(rel) => format!("{}/{}", self.url_prefix, rel),
            None => format!("{}/{}", self.url_prefix, name),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> Result<StoredFile> {
        if !content_type.starts_with("image/") {
            return Err(AppError::ValidationError(format!(
                "unsupported content type '{content_type}'"
            )));
        }

        // Decoding doubles as validation: anything that is not an image is refused.
        let img = ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|e| AppError::ValidationError(format!("not a readable image: {e}")))?;

        let hash = format!("{:x}", Sha256::digest(&data));
        let target_path = self.get_sharded_path(&hash)?;
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        if fs::try_exists(&target_path).await.map_err(io_err)? {
            log::debug!("media {hash} already stored");
        } else {
            fs::write(&target_path, &data).await.map_err(io_err)?;
            self.generate_thumbnail(&img, &target_path, &hash).await?;
            log::info!("stored media {hash} ({} bytes)", data.len());
        }

        Ok(StoredFile {
            file: hash,
            width: img.width(),
            height: img.height(),
        })
    }

    async fn get_url(&self, file: &str) -> String {
        self.url_for(file, file)
    }

    async fn get_thumbnail_url(&self, file: &str) -> String {
        self.url_for(file, &format!("thumb_{file}.webp"))
    }

    async fn remove(&self, file: &str) -> Result<()> {
        let original = self.get_sharded_path(file)?;
        for path in [Self::thumbnail_path(&original, file), original] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(e)),
            }
        }
        log::info!("removed media {file}");
        Ok(())
    }
}

impl LocalMediaStore {
    /// Internal helper to generate a 250px WebP thumbnail.
    async fn generate_thumbnail(&self, img: &DynamicImage, source_path: &Path, hash: &str) -> Result<()> {
        let thumb = DynamicImage::ImageRgba8(img.thumbnail(THUMB_SIZE, THUMB_SIZE).to_rgba8());
        let mut buf = Cursor::new(Vec::new());
        thumb
            .write_to(&mut buf, ImageFormat::WebP)
            .map_err(|e| AppError::Internal(format!("thumbnail encoding failed: {e}")))?;
        fs::write(Self::thumbnail_path(source_path, hash), buf.into_inner())
            .await
            .map_err(io_err)
    }
}
