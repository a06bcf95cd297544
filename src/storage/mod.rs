//! Content-addressed image storage.
//!
//! Images are keyed by the SHA-256 of their bytes and laid out as
//! `{root}/{bucket}/{hash[0..2]}/{hash}.{ext}`, which is also the shape of
//! the public `/storage/...` URL.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::AppError;
use crate::models::{UploadBucket, UploadedImage};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/gif" => Some(ImageKind::Gif),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    /// Identify the format from the file signature.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
    public_url: String,
}

impl ImageStore {
    pub fn new(root: PathBuf, public_url: &str) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the bucket directories.
    pub async fn initialize(&self) -> Result<(), AppError> {
        for bucket in [UploadBucket::CategoryImages, UploadBucket::StaffAvatars] {
            fs::create_dir_all(self.root.join(bucket.as_str())).await?;
        }
        tracing::info!("Image store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Validate and store an image. Identical bytes map to the same file.
    pub async fn store(
        &self,
        bucket: UploadBucket,
        content_type: &str,
        data: &[u8],
    ) -> Result<UploadedImage, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("Image body is empty".to_string()));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "Image exceeds the {} MiB limit",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }
        let declared = ImageKind::from_content_type(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {}", content_type))
        })?;
        if ImageKind::sniff(data) != Some(declared) {
            return Err(AppError::Validation(
                "Image content does not match its content type".to_string(),
            ));
        }

        let hash = format!("{:x}", Sha256::digest(data));
        let relative = format!("{}/{}.{}", &hash[0..2], hash, declared.extension());
        let path = self.root.join(bucket.as_str()).join(&relative);

        if fs::try_exists(&path).await? {
            tracing::debug!("Image already stored: {}", relative);
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            let temp_path = path.with_extension("tmp");
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await?;

            tracing::info!(bucket = bucket.as_str(), path = %relative, bytes = data.len(), "Stored image");
        }

        Ok(UploadedImage {
            bucket,
            url: format!("{}/storage/{}/{}", self.public_url, bucket.as_str(), relative),
            path: relative,
        })
    }
}
