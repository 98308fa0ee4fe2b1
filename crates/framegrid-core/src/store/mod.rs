//! Durable crop and rotation state.
//!
//! Two independent mappings, both keyed by [`ImageRef`]:
//!
//! - `cropHistory`: image -> [`SavedTransform`] (normalized crop + zoom)
//! - `imageRotations`: image -> rotation in degrees
//!
//! Either can exist without the other. Entries are only written by an
//! explicit save in a crop session and are never deleted by this crate.
//! The compositor only reads them.

mod medium;
mod persisted;

pub use medium::{DirectoryMedium, KeyValueMedium, MemoryMedium};
pub use persisted::{MemoryStore, PersistedStore};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::NormalizedRect;
use crate::transform::Rotation;
use crate::ImageRef;

/// Medium key holding the crop mapping.
pub const CROP_HISTORY_KEY: &str = "cropHistory";
/// Medium key holding the rotation mapping.
pub const IMAGE_ROTATIONS_KEY: &str = "imageRotations";

/// Smallest zoom the editor allows.
pub const MIN_ZOOM: f64 = 1.0;
/// Largest zoom the editor allows.
pub const MAX_ZOOM: f64 = 3.0;

/// Clamp a zoom factor into `[MIN_ZOOM, MAX_ZOOM]`. NaN becomes `MIN_ZOOM`.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        MIN_ZOOM
    } else {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

/// A saved crop for one image.
///
/// `zoom` only lets an editing session resume where it left off; rendering
/// uses `crop_area` alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTransform {
    pub crop_area: NormalizedRect,
    pub zoom: f64,
}

impl SavedTransform {
    pub fn new(crop_area: NormalizedRect, zoom: f64) -> Self {
        Self {
            crop_area,
            zoom: clamp_zoom(zoom),
        }
    }
}

/// Errors from reading or writing the store's medium.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store key {key}: {message}")]
    Io { key: String, message: String },

    #[error("failed to serialize store key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Get/put access to saved crops and rotations.
///
/// Every `put_*` must be durable before it returns.
pub trait TransformStore {
    fn transform(&self, image: &ImageRef) -> Result<Option<SavedTransform>, StoreError>;

    fn put_transform(
        &mut self,
        image: &ImageRef,
        transform: SavedTransform,
    ) -> Result<(), StoreError>;

    fn rotation(&self, image: &ImageRef) -> Result<Option<Rotation>, StoreError>;

    fn put_rotation(&mut self, image: &ImageRef, rotation: Rotation) -> Result<(), StoreError>;
}

impl<T: TransformStore + ?Sized> TransformStore for &mut T {
    fn transform(&self, image: &ImageRef) -> Result<Option<SavedTransform>, StoreError> {
        (**self).transform(image)
    }

    fn put_transform(
        &mut self,
        image: &ImageRef,
        transform: SavedTransform,
    ) -> Result<(), StoreError> {
        (**self).put_transform(image, transform)
    }

    fn rotation(&self, image: &ImageRef) -> Result<Option<Rotation>, StoreError> {
        (**self).rotation(image)
    }

    fn put_rotation(&mut self, image: &ImageRef, rotation: Rotation) -> Result<(), StoreError> {
        (**self).put_rotation(image, rotation)
    }
}
