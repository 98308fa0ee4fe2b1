//! Where frame bytes come from.
//!
//! The core never knows whether an [`ImageRef`] is a file, a URL or something
//! else; it asks an [`ImageSource`] for the raw bytes and decodes them itself.
//! Sources must be `Sync` because the compositor fetches all cells at once.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::decode::{decode_image, DecodeError, DecodedImage};
use crate::ImageRef;

/// Failure to turn an image reference into pixels.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image not found: {0}")]
    NotFound(ImageRef),

    #[error("failed to read {image}: {message}")]
    Io { image: ImageRef, message: String },

    #[error("fetching {image} returned HTTP {status}")]
    Http { image: ImageRef, status: u16 },

    #[error("unsupported image reference: {0}")]
    Unsupported(ImageRef),

    #[error("failed to decode {image}: {source}")]
    Decode {
        image: ImageRef,
        #[source]
        source: DecodeError,
    },
}

/// Resolves image references to raw encoded bytes.
pub trait ImageSource: Sync {
    fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, LoadError>;
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, LoadError> {
        (**self).fetch(image)
    }
}

/// Fetch and decode an image.
pub fn load_image<S: ImageSource + ?Sized>(
    source: &S,
    image: &ImageRef,
) -> Result<DecodedImage, LoadError> {
    let bytes = source.fetch(image)?;
    decode_image(&bytes).map_err(|source| LoadError::Decode {
        image: image.clone(),
        source,
    })
}

/// Reads references as filesystem paths.
///
/// A leading `file://` is stripped; relative paths are joined onto `root`
/// when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Filesystem path for a reference.
    pub fn resolve(&self, image: &ImageRef) -> PathBuf {
        let raw = image.as_str();
        let path = Path::new(raw.strip_prefix("file://").unwrap_or(raw));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageSource for FileSource {
    fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(image);
        std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(image.clone()),
            _ => LoadError::Io {
                image: image.clone(),
                message: err.to_string(),
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory sources shared by session and compositor tests.

    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{ImageFormat, RgbImage};

    use super::*;

    /// Encode a flat-colored PNG.
    pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Serves canned bytes by reference and counts fetches.
    #[derive(Default)]
    pub struct MemorySource {
        images: HashMap<ImageRef, Vec<u8>>,
        pub fetches: AtomicUsize,
    }

    impl MemorySource {
        pub fn with(mut self, image: &str, bytes: Vec<u8>) -> Self {
            self.images.insert(ImageRef::from(image), bytes);
            self
        }
    }

    impl ImageSource for MemorySource {
        fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.images
                .get(image)
                .cloned()
                .ok_or_else(|| LoadError::NotFound(image.clone()))
        }
    }
}
