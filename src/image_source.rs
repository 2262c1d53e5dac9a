use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageReader};

use crate::error::{InputError, Result};

/// A decoded parent image plus the identifier detections are reported against.
#[derive(Debug, Clone)]
pub struct SourceImage {
    id: String,
    image: Arc<DynamicImage>,
}

impl SourceImage {
    /// Load an image from disk.
    ///
    /// Decoder allocation limits are lifted: scanned map sheets routinely
    /// exceed the `image` crate's default cap.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InputError::NotFound(path.to_path_buf()).into());
        }

        let mut reader = ImageReader::open(path)
            .map_err(|source| InputError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .with_guessed_format()
            .map_err(|source| InputError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        reader.no_limits();

        let image = reader.decode().map_err(|source| InputError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::from_image(id, image))
    }

    pub fn from_image(id: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            id: id.into(),
            image: Arc::new(image),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &Arc<DynamicImage> {
        &self.image
    }
}
