//! Software raster the grid is painted on.
//!
//! Everything is RGB with coverage blended in at draw time; there is no alpha
//! channel because the result is exported as JPEG.

use super::spec::GridStyle;
use crate::decode::DecodedImage;

/// Smootherstep: `6t⁵ - 15t⁴ + 10t³`, zero first and second derivative at
/// both ends.
fn smootherstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Signed distance from `(px, py)` to a rounded square with top-left `(x, y)`.
///
/// Negative inside, positive outside.
fn rounded_square_distance(px: f32, py: f32, x: f32, y: f32, side: f32, radius: f32) -> f32 {
    let half = side / 2.0;
    let radius = radius.clamp(0.0, half);
    let qx = (px - (x + half)).abs() - (half - radius);
    let qy = (py - (y + half)).abs() - (half - radius);
    let outside = qx.max(0.0).hypot(qy.max(0.0));
    let inside = qx.max(qy).min(0.0);
    outside + inside - radius
}

fn mix(bg: [u8; 3], fg: [u8; 3], alpha: f32) -> [u8; 3] {
    let inv = 1.0 - alpha;
    [
        (f32::from(fg[0]) * alpha + f32::from(bg[0]) * inv).round() as u8,
        (f32::from(fg[1]) * alpha + f32::from(bg[1]) * inv).round() as u8,
        (f32::from(fg[2]) * alpha + f32::from(bg[2]) * inv).round() as u8,
    ]
}

/// Square RGB drawing surface.
#[derive(Debug, Clone)]
pub(crate) struct Canvas {
    image: DecodedImage,
}

impl Canvas {
    pub fn new(side: u32, base: [u8; 3]) -> Self {
        Self {
            image: DecodedImage::filled(side, side, base),
        }
    }

    pub fn side(&self) -> u32 {
        self.image.width
    }

    pub fn into_image(self) -> DecodedImage {
        self.image
    }

    fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let idx = ((y as usize) * (self.image.width as usize) + x as usize) * 3;
        self.image.pixels[idx..idx + 3].copy_from_slice(&rgb);
    }

    fn blend(&mut self, x: u32, y: u32, rgb: [u8; 3], alpha: f32) {
        if alpha >= 0.999 {
            self.put(x, y, rgb);
        } else if alpha > 0.001 {
            let blended = mix(self.image.pixel(x, y), rgb, alpha);
            self.put(x, y, blended);
        }
    }

    /// Paint a solid frame `width` pixels wide along the canvas edge.
    pub fn draw_border(&mut self, color: [u8; 3], width: u32) {
        let side = self.side();
        let width = width.min(side);
        for y in 0..side {
            for x in 0..side {
                let edge = x.min(y).min(side - 1 - x).min(side - 1 - y);
                if edge < width {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Fill the square inset by `inset` pixels on every side with a gradient
    /// running from the canvas's top-left corner to its bottom-right corner.
    pub fn fill_diagonal_gradient(&mut self, inset: u32, start: [u8; 3], end: [u8; 3]) {
        let side = self.side();
        if inset.saturating_mul(2) >= side {
            return;
        }
        // Projection onto (W, H) over |(W, H)|²; W == H for a square canvas
        let span = 2.0 * f64::from(side);
        for y in inset..side - inset {
            for x in inset..side - inset {
                let t = ((f64::from(x) + 0.5 + f64::from(y) + 0.5) / span).clamp(0.0, 1.0);
                self.put(x, y, mix(start, end, t as f32));
            }
        }
    }

    /// Soft drop shadow under a rounded cell whose top-left is `(x, y)`.
    pub fn draw_shadow(&mut self, x: u64, y: u64, cell: u32, style: &GridStyle) {
        let blur = style.shadow_blur.max(0.0);
        let sx = x as f32 + style.shadow_offset.0 as f32;
        let sy = y as f32 + style.shadow_offset.1 as f32;
        let side = cell as f32;
        let reach = blur.ceil() as i64 + 1;

        let canvas = i64::from(self.side());
        let x0 = (sx as i64 - reach).clamp(0, canvas);
        let y0 = (sy as i64 - reach).clamp(0, canvas);
        let x1 = (sx as i64 + i64::from(cell) + reach).clamp(0, canvas);
        let y1 = (sy as i64 + i64::from(cell) + reach).clamp(0, canvas);

        for py in y0..y1 {
            for px in x0..x1 {
                let d = rounded_square_distance(
                    px as f32 + 0.5,
                    py as f32 + 0.5,
                    sx,
                    sy,
                    side,
                    style.corner_radius,
                );
                let falloff = if blur > 0.0 {
                    1.0 - smootherstep((d + blur / 2.0) / blur)
                } else if d <= 0.0 {
                    1.0
                } else {
                    0.0
                };
                let alpha = style.shadow_opacity * falloff;
                self.blend(px as u32, py as u32, style.shadow_color, alpha);
            }
        }
    }

    /// Draw a square `cell` image at `(x, y)` clipped to rounded corners.
    ///
    /// Corner edges are anti-aliased by pixel coverage. Pixels falling off the
    /// canvas are dropped.
    pub fn draw_rounded(&mut self, cell: &DecodedImage, x: u64, y: u64, radius: f32) {
        let side = self.side();
        let size = cell.width.min(cell.height);
        for dy in 0..size {
            let Some(cy) = u32::try_from(y + u64::from(dy)).ok().filter(|&v| v < side) else {
                break;
            };
            for dx in 0..size {
                let Some(cx) = u32::try_from(x + u64::from(dx)).ok().filter(|&v| v < side) else {
                    break;
                };
                let d = rounded_square_distance(
                    dx as f32 + 0.5,
                    dy as f32 + 0.5,
                    0.0,
                    0.0,
                    size as f32,
                    radius,
                );
                let coverage = (0.5 - d).clamp(0.0, 1.0);
                self.blend(cx, cy, cell.pixel(dx, dy), coverage);
            }
        }
    }
}
