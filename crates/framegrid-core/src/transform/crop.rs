//! Image cropping with normalized crop regions.
//!
//! Crops are stored as [`NormalizedRect`] values so they survive any change of
//! display resolution. At render time the region is resolved against the
//! loaded image's natural size and copied out at full resolution: whole source
//! pixels, no resampling.
//!
//! # Example
//!
//! ```ignore
//! // Crop the center 50% of the image
//! let area = NormalizedRect::new(0.25, 0.25, 0.5, 0.5).unwrap();
//! let cropped = apply_crop(&image, &area);
//! ```

use crate::decode::DecodedImage;
use crate::geometry::{normalized_rect_to_pixel, NormalizedRect, Size};

/// Extract the region described by `area` from an image.
///
/// # Behavior
///
/// - Pixel edges are rounded to the nearest whole pixel
/// - The region is clamped to the image bounds
/// - Minimum output dimension is 1x1 pixels
/// - A full crop returns a copy of the original image
pub fn apply_crop(image: &DecodedImage, area: &NormalizedRect) -> DecodedImage {
    // Fast path: full crop returns a clone
    if area.is_full() {
        return image.clone();
    }

    let rect = normalized_rect_to_pixel(area, Size::new(image.width, image.height));

    let px_left = (rect.x.round() as u32).min(image.width.saturating_sub(1));
    let px_top = (rect.y.round() as u32).min(image.height.saturating_sub(1));
    let px_right = (px_left + rect.width.round() as u32).min(image.width);
    let px_bottom = (px_top + rect.height.round() as u32).min(image.height);

    let out_width = px_right.saturating_sub(px_left).max(1);
    let out_height = px_bottom.saturating_sub(px_top).max(1);

    let mut output = vec![0u8; (out_width as usize) * (out_height as usize) * 3];

    // Rows are contiguous in both buffers, copy them whole
    let row_bytes = (out_width as usize) * 3;
    for y in 0..out_height {
        let src_start = (((px_top + y) as usize) * (image.width as usize) + px_left as usize) * 3;
        let dst_start = (y as usize) * row_bytes;
        output[dst_start..dst_start + row_bytes]
            .copy_from_slice(&image.pixels[src_start..src_start + row_bytes]);
    }

    DecodedImage {
        width: out_width,
        height: out_height,
        pixels: output,
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn create_test_image(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(width, height, vec![9u8; (width * height * 3) as usize])
    }

    fn area_strategy() -> impl Strategy<Value = NormalizedRect> {
        (0.0f64..0.9, 0.0f64..0.9, 0.05f64..=1.0, 0.05f64..=1.0).prop_map(|(x, y, fw, fh)| {
            NormalizedRect::new(x, y, (1.0 - x) * fw, (1.0 - y) * fh)
                .unwrap_or(NormalizedRect::FULL)
        })
    }

    proptest! {
        /// Property: output is never empty and never larger than the input.
        #[test]
        fn prop_output_bounded(
            (width, height) in (4u32..=100, 4u32..=100),
            area in area_strategy(),
        ) {
            let img = create_test_image(width, height);
            let result = apply_crop(&img, &area);

            prop_assert!(result.width >= 1 && result.width <= width);
            prop_assert!(result.height >= 1 && result.height <= height);
            prop_assert_eq!(result.pixels.len(), (result.width * result.height * 3) as usize);
        }

        /// Property: output size tracks the requested region within rounding.
        #[test]
        fn prop_output_matches_region(
            (width, height) in (20u32..=100, 20u32..=100),
            area in area_strategy(),
        ) {
            let img = create_test_image(width, height);
            let result = apply_crop(&img, &area);

            let expected_w = area.width() * f64::from(width);
            let expected_h = area.height() * f64::from(height);
            prop_assert!((f64::from(result.width) - expected_w).abs() <= 1.5);
            prop_assert!((f64::from(result.height) - expected_h).abs() <= 1.5);
        }
    }
}
