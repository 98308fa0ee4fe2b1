//! Image decoding for highlight frames.
//!
//! This module provides functionality for:
//! - Probing the natural (oriented) size of a frame from its header
//! - Decoding JPEG/PNG frames to RGB with EXIF orientation applied
//! - Resizing decoded frames to grid cell dimensions
//!
//! All operations are synchronous; callers decide which thread runs them.
//!
//! # Examples
//!
//! ```ignore
//! use framegrid_core::decode::decode_image;
//!
//! let bytes = std::fs::read("frame_3.jpg").unwrap();
//! let image = decode_image(&bytes).unwrap();
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod frame;
mod resize;
mod types;

pub use frame::{decode_image, get_orientation, probe_dimensions};
pub use resize::resize;
pub use types::{DecodeError, DecodedImage, FilterType, Orientation};
