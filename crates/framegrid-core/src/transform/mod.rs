//! Per-image transforms applied before an image is placed in a grid cell.
//!
//! # Transform Order
//!
//! When compositing, transforms are applied in this order:
//! 1. Crop (saved normalized region, resolved against the natural size)
//! 2. Rotation (quarter turns, about the cropped image's center)
//! 3. Scale to the cell
//!
//! # Coordinate System
//!
//! - Rotation is clockwise on screen, in quarter turns
//! - Crop coordinates are normalized (0.0 to 1.0) relative to image dimensions
//! - Origin is top-left corner

mod crop;
mod rotation;

pub use crop::apply_crop;
pub use rotation::{apply_rotation, compute_rotated_bounds, Rotation};
