//! Recipe image files: path derivation, payload validation and the on-disk store.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{info, warn};
use tokio::fs;
use uuid::Uuid;

use crate::{
    constants::{IMAGE_FIELD, RECIPE_IMAGE_DIR},
    error::ValidationError,
};

pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// `uploads/recipe/<fresh uuid>.<original extension>`
pub fn recipe_image_file_path(filename: &str) -> String {
    recipe_image_file_path_with(&Uuid::new_v4().to_string(), filename)
}

pub fn recipe_image_file_path_with(id: &str, filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{RECIPE_IMAGE_DIR}/{id}.{ext}"),
        None => format!("{RECIPE_IMAGE_DIR}/{id}"),
    }
}

/// Accepts the payload only if it decodes as an image.
pub fn validate_image(data: &[u8]) -> Result<(), ValidationError> {
    image::load_from_memory(data).map(|_| ()).map_err(|e| {
        warn!("Rejected image upload ({} bytes): {e}", data.len());
        ValidationError::new(IMAGE_FIELD, INVALID_IMAGE)
    })
}

/// Files addressed by paths relative to a media root.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub async fn save(&self, relative: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        info!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    /// Removing a file that is already gone is not an error.
    pub async fn delete(&self, relative: &str) -> std::io::Result<()> {
        let path = self.path(relative);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self, relative: &str) -> bool {
        fs::try_exists(self.path(relative)).await.unwrap_or(false)
    }
}
