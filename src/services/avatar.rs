use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageOutputFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::AvatarConfig;

static ALLOWED_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png)$").expect("extension pattern is valid"));

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("File type must be JPG or JPEG or PNG (got '{0}')")]
    UnsupportedType(String),

    #[error("File is too large ({size} bytes, limit {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Please upload a valid image: {0}")]
    Decode(String),

    #[error("Failed to encode avatar: {0}")]
    Encode(String),
}

/// Turns an uploaded file into the stored avatar blob.
pub trait AvatarProcessor: Send + Sync {
    fn max_upload_bytes(&self) -> usize;

    fn process(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<u8>, AvatarError>;
}

/// Square PNG avatars produced with the `image` crate.
pub struct ImageAvatarProcessor {
    max_upload_bytes: usize,
    dimension: u32,
}

impl ImageAvatarProcessor {
    pub fn new(config: &AvatarConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            dimension: config.dimension,
        }
    }
}

impl AvatarProcessor for ImageAvatarProcessor {
    fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    fn process(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<u8>, AvatarError> {
        if bytes.len() > self.max_upload_bytes {
            return Err(AvatarError::TooLarge {
                size: bytes.len(),
                max: self.max_upload_bytes,
            });
        }
        if !ALLOWED_EXTENSION.is_match(file_name) {
            return Err(AvatarError::UnsupportedType(file_name.to_string()));
        }

        let decoded = image::load_from_memory(bytes).map_err(|e| AvatarError::Decode(e.to_string()))?;
        let resized = decoded.resize_exact(self.dimension, self.dimension, FilterType::Triangle);

        let mut out = Cursor::new(Vec::new());
        resized
            .write_to(&mut out, ImageOutputFormat::Png)
            .map_err(|e| AvatarError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}
