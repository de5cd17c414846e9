use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{validate_key, ObjectStore, StorageError};

const PROFILE_PHOTO_PREFIX: &str = "profile-photos";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Asset storage failed: {0}")]
    Io(#[source] std::io::Error),

    #[error("Image resize failed: {0}")]
    Resize(String),

    #[error("Upload body is empty")]
    EmptyUpload,
}

impl From<StorageError> for AssetError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(path) => AssetError::InvalidPath(path),
            StorageError::NotFound(path) => AssetError::NotFound(path),
            StorageError::Io(err) => AssetError::Io(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfilePhotoSize {
    Default,
    Medium,
    Small,
}

impl ProfilePhotoSize {
    pub const ALL: [ProfilePhotoSize; 3] = [ProfilePhotoSize::Default, ProfilePhotoSize::Medium, ProfilePhotoSize::Small];

    /// Longest edge in pixels
    pub fn max_dimension(&self) -> u32 {
        match self {
            ProfilePhotoSize::Default => 1080,
            ProfilePhotoSize::Medium => 256,
            ProfilePhotoSize::Small => 120,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProfilePhotoSize::Default => "default",
            ProfilePhotoSize::Medium => "medium",
            ProfilePhotoSize::Small => "small",
        }
    }
}

impl fmt::Display for ProfilePhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfilePhotoSize {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.name() == s)
            .ok_or_else(|| AssetError::InvalidPath(format!("unknown profile photo size {}", s)))
    }
}

/// Produces an image no larger than `max_dimension` on its longest edge
pub trait ImageResizer: Send + Sync {
    fn resize(&self, bytes: &[u8], max_dimension: u32) -> Result<Vec<u8>, AssetError>;

    /// Media type of bytes this resizer produced
    fn content_type(&self, _stored: &[u8]) -> &'static str {
        "image/webp"
    }
}

/// Development stand-in for a real encoder: stores the upload unchanged at
/// every size. The objects keep their `.webp` names but hold the original
/// format, so the served content type is sniffed from the bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResizer;

impl ImageResizer for PassthroughResizer {
    fn resize(&self, bytes: &[u8], _max_dimension: u32) -> Result<Vec<u8>, AssetError> {
        Ok(bytes.to_vec())
    }

    fn content_type(&self, stored: &[u8]) -> &'static str {
        sniff_image_type(stored)
    }
}

fn sniff_image_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Profile photos and free-form files on top of an object store
#[derive(Clone)]
pub struct AssetService {
    objects: Arc<dyn ObjectStore>,
    resizer: Arc<dyn ImageResizer>,
}

fn photo_dir(user_id: &str) -> Result<String, AssetError> {
    if user_id.is_empty() || user_id.contains('/') {
        return Err(AssetError::InvalidPath(user_id.to_string()));
    }
    let dir = format!("{}/{}", PROFILE_PHOTO_PREFIX, user_id);
    validate_key(&dir)?;
    Ok(dir)
}

fn photo_name(size: ProfilePhotoSize) -> String {
    format!("{}.webp", size.name())
}

impl AssetService {
    pub fn new(objects: Arc<dyn ObjectStore>, resizer: Arc<dyn ImageResizer>) -> Self {
        Self { objects, resizer }
    }

    /// Resize and store every size; returns the URL of each
    pub async fn upload_profile_photo(&self, user_id: &str, bytes: &[u8]) -> Result<BTreeMap<ProfilePhotoSize, String>, AssetError> {
        if bytes.is_empty() {
            return Err(AssetError::EmptyUpload);
        }
        let dir = photo_dir(user_id)?;

        let mut urls = BTreeMap::new();
        for size in ProfilePhotoSize::ALL {
            let resized = self.resizer.resize(bytes, size.max_dimension())?;
            let url = self.objects.upload(resized, &dir, Some(&photo_name(size))).await?;
            urls.insert(size, url);
        }
        info!("Stored profile photo for {}", user_id);
        Ok(urls)
    }

    pub async fn get_profile_photo(&self, user_id: &str, size: ProfilePhotoSize) -> Result<Vec<u8>, AssetError> {
        let key = format!("{}/{}", photo_dir(user_id)?, photo_name(size));
        Ok(self.objects.download(&key).await?)
    }

    pub fn photo_content_type(&self, stored: &[u8]) -> &'static str {
        self.resizer.content_type(stored)
    }

    /// Remove every size. Sizes that were never stored are skipped.
    pub async fn delete_profile_photo(&self, user_id: &str) -> Result<(), AssetError> {
        let dir = photo_dir(user_id)?;
        for size in ProfilePhotoSize::ALL {
            let key = format!("{}/{}", dir, photo_name(size));
            match self.objects.delete(&key).await {
                Ok(()) => {}
                Err(StorageError::NotFound(_)) => debug!("Profile photo {} already absent", key),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    pub async fn upload_file(&self, bytes: Vec<u8>, path: &str, name: Option<&str>) -> Result<String, AssetError> {
        if bytes.is_empty() {
            return Err(AssetError::EmptyUpload);
        }
        validate_key(path)?;
        Ok(self.objects.upload(bytes, path, name).await?)
    }

    pub async fn download_file(&self, key: &str) -> Result<Vec<u8>, AssetError> {
        validate_key(key)?;
        Ok(self.objects.download(key).await?)
    }

    pub async fn delete_file(&self, key: &str) -> Result<(), AssetError> {
        validate_key(key)?;
        Ok(self.objects.delete(key).await?)
    }
}
