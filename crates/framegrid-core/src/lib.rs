//! Framegrid Core - crop/rotation state and grid compositing for highlight frames
//!
//! This crate holds the part of the highlight workflow that has to agree with
//! itself pixel for pixel: the per-image crop and rotation a user saves in the
//! editor, and the 3x3 grid image rendered from those saved edits.
//!
//! - [`geometry`] - pixel/normalized crop conversion and preview transforms
//! - [`store`] - durable crop and rotation state, keyed by image reference
//! - [`session`] - the interactive crop editing lifecycle
//! - [`grid`] - loads, crops, rotates and tiles frames into one JPEG

pub mod decode;
pub mod encode;
pub mod geometry;
pub mod grid;
pub mod session;
pub mod source;
pub mod store;
pub mod transform;

pub use geometry::{
    default_square_crop, normalized_rect_to_pixel, pixel_rect_to_normalized, preview_transform,
    AffineTransform2D, NormalizedRect, PixelRect, PreviewTransform, Size,
};
pub use grid::{
    compose_grid, CompositeError, CompositeReport, CompositeWarning, GridImage, GridSpec, GridStyle,
};
pub use session::{CropSession, SessionError, SessionState};
pub use source::{FileSource, ImageSource, LoadError};
pub use store::{
    DirectoryMedium, KeyValueMedium, MemoryMedium, MemoryStore, PersistedStore, SavedTransform,
    StoreError, TransformStore,
};
pub use transform::Rotation;

use serde::{Deserialize, Serialize};

/// Identifier of a frame image: the URL or path it was published under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_serializes_as_string() {
        let image = ImageRef::from("/media/highlight_images/v1/frame_3.jpg");
        let json = serde_json::to_string(&image).unwrap();
        assert_eq!(json, r#""/media/highlight_images/v1/frame_3.jpg""#);
        assert_eq!(image.to_string(), image.as_str());
    }
}
