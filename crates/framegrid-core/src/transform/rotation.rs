//! Right-angle image rotation.
//!
//! Grid cells only ever hold images turned in quarter steps, so rotation is an
//! exact pixel permutation: no interpolation and no lost corners.
//!
//! # Algorithm
//!
//! The rotation uses inverse mapping: for each pixel in the output image we
//! find the single source pixel that lands there. For a clockwise turn by θ
//! around the image center:
//! ```text
//! 90°:  src = (dst_y,           h - 1 - dst_x)
//! 180°: src = (w - 1 - dst_x,   h - 1 - dst_y)
//! 270°: src = (w - 1 - dst_y,   dst_x)
//! ```
//! where `w`, `h` are the source dimensions.

use serde::{Deserialize, Serialize};

use crate::decode::DecodedImage;

/// A clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize `degrees` into `[0, 360)` and return the matching rotation.
    ///
    /// Returns `None` for anything that is not a multiple of 90.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The next quarter turn clockwise: 0 -> 90 -> 180 -> 270 -> 0.
    pub fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn is_identity(self) -> bool {
        self == Rotation::Deg0
    }

    /// Returns true if this rotation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = String;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
            .ok_or_else(|| format!("rotation must be a multiple of 90 degrees, got {degrees}"))
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Compute the dimensions of the bounding box for a rotated image.
///
/// The bounding box of a `w x h` rectangle turned by θ is
/// `w' = h*|sin θ| + w*|cos θ|` and `h' = h*|cos θ| + w*|sin θ|`, so nothing is
/// clipped. Right angles take a fast path and are exact.
///
/// # Example
///
/// ```
/// use framegrid_core::transform::compute_rotated_bounds;
///
/// // 90-degree rotation swaps dimensions
/// assert_eq!(compute_rotated_bounds(100, 50, 90.0), (50, 100));
/// ```
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    let angle_normalized = angle_degrees.rem_euclid(360.0);

    if angle_normalized < 0.001 || (360.0 - angle_normalized) < 0.001 {
        return (width, height);
    }
    if (angle_normalized - 90.0).abs() < 0.001 || (angle_normalized - 270.0).abs() < 0.001 {
        return (height, width);
    }
    if (angle_normalized - 180.0).abs() < 0.001 {
        return (width, height);
    }

    let angle_rad = angle_degrees.to_radians();
    let sin = angle_rad.sin().abs();
    let cos = angle_rad.cos().abs();

    let w = f64::from(width);
    let h = f64::from(height);

    let new_w = (h * sin + w * cos).round() as u32;
    let new_h = (h * cos + w * sin).round() as u32;

    (new_w.max(1), new_h.max(1))
}

/// Rotate an image clockwise about its center.
///
/// The output canvas is the rotated bounding box, so a 90° or 270° turn swaps
/// the dimensions and every source pixel appears exactly once.
pub fn apply_rotation(image: &DecodedImage, rotation: Rotation) -> DecodedImage {
    if rotation.is_identity() {
        return image.clone();
    }

    let (src_w, src_h) = (image.width, image.height);
    let (dst_w, dst_h) = compute_rotated_bounds(src_w, src_h, f64::from(rotation.degrees()));

    let mut output = vec![0u8; (dst_w as usize) * (dst_h as usize) * 3];

    for dst_y in 0..dst_h {
        for dst_x in 0..dst_w {
            let (src_x, src_y) = match rotation {
                Rotation::Deg0 => (dst_x, dst_y),
                Rotation::Deg90 => (dst_y, src_h - 1 - dst_x),
                Rotation::Deg180 => (src_w - 1 - dst_x, src_h - 1 - dst_y),
                Rotation::Deg270 => (src_w - 1 - dst_y, dst_x),
            };

            let src_idx = ((src_y as usize) * (src_w as usize) + src_x as usize) * 3;
            let dst_idx = ((dst_y as usize) * (dst_w as usize) + dst_x as usize) * 3;
            output[dst_idx..dst_idx + 3].copy_from_slice(&image.pixels[src_idx..src_idx + 3]);
        }
    }

    DecodedImage {
        width: dst_w,
        height: dst_h,
        pixels: output,
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
