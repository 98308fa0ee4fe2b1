//! Crop geometry: pixel rectangles, normalized rectangles and preview transforms.
//!
//! All functions here are pure. They are shared by the interactive crop session
//! (seeding and committing a crop) and by preview rendering, so an edit shows the
//! same region in the editor, in thumbnails and in the exported grid.
//!
//! # Coordinate System
//!
//! - Pixel rectangles are in the image's natural (oriented) pixel space
//! - Normalized rectangles are fractions (0.0 to 1.0) of the natural dimensions
//! - Origin is the top-left corner, y grows downwards
//! - Rotation angles are in degrees, positive = clockwise on screen

use serde::{Deserialize, Serialize};

/// Natural pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Length of the shorter side.
    pub fn min_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// A rectangle in pixel coordinates.
///
/// Values are floating point because the interactive editor reports
/// sub-pixel positions while the user drags and zooms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_square(&self) -> bool {
        (self.width - self.height).abs() < 1e-9
    }
}

/// A crop region expressed as fractions of the image's natural dimensions.
///
/// Always satisfies `x >= 0`, `y >= 0`, `width > 0`, `height > 0`,
/// `x + width <= 1` and `y + height <= 1`. Deserialization rejects values
/// that break these bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRect", into = "RawRect")]
pub struct NormalizedRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Unchecked wire form of [`NormalizedRect`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl NormalizedRect {
    /// The whole image.
    pub const FULL: NormalizedRect = NormalizedRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Create a normalized rectangle, returning `None` if it leaves the unit square
    /// or has an empty side.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        let finite = [x, y, width, height].iter().all(|v| v.is_finite());
        if !finite || x < 0.0 || y < 0.0 || width <= 0.0 || height <= 0.0 {
            return None;
        }
        if x + width > 1.0 || y + height > 1.0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Center point in normalized coordinates.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check whether this rectangle covers the whole image.
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

impl TryFrom<RawRect> for NormalizedRect {
    type Error = String;

    fn try_from(raw: RawRect) -> Result<Self, Self::Error> {
        NormalizedRect::new(raw.x, raw.y, raw.width, raw.height).ok_or_else(|| {
            format!(
                "crop area out of bounds: x={}, y={}, width={}, height={}",
                raw.x, raw.y, raw.width, raw.height
            )
        })
    }
}

impl From<NormalizedRect> for RawRect {
    fn from(rect: NormalizedRect) -> Self {
        RawRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// Convert a pixel crop into a normalized crop, clamping it inside the image.
///
/// Width and height are clamped to `[1px, natural size]`, then the origin is
/// clamped so the rectangle ends inside the image
/// (`x = clamp(rect.x, 0, natural.width - width)`). The result therefore always
/// satisfies the [`NormalizedRect`] bounds, even when the editor reported a
/// rectangle that drifted past an edge.
pub fn pixel_rect_to_normalized(rect: &PixelRect, natural: Size) -> NormalizedRect {
    let nat_w = f64::from(natural.width.max(1));
    let nat_h = f64::from(natural.height.max(1));

    let width = clamp_extent(rect.width, nat_w);
    let height = clamp_extent(rect.height, nat_h);
    let x = rect.x.min(nat_w - width).max(0.0);
    let y = rect.y.min(nat_h - height).max(0.0);

    let norm_w = width / nat_w;
    let norm_h = height / nat_h;

    // Division can round the origin up by an ulp; pin it so the far edge stays <= 1
    NormalizedRect {
        x: (x / nat_w).min(1.0 - norm_w).max(0.0),
        y: (y / nat_h).min(1.0 - norm_h).max(0.0),
        width: norm_w,
        height: norm_h,
    }
}

fn clamp_extent(value: f64, limit: f64) -> f64 {
    if value.is_finite() {
        value.clamp(1.0_f64.min(limit), limit)
    } else {
        limit
    }
}

/// Convert a normalized crop back into pixels of an image with the given size.
pub fn normalized_rect_to_pixel(rect: &NormalizedRect, natural: Size) -> PixelRect {
    let nat_w = f64::from(natural.width);
    let nat_h = f64::from(natural.height);
    PixelRect {
        x: rect.x * nat_w,
        y: rect.y * nat_h,
        width: rect.width * nat_w,
        height: rect.height * nat_h,
    }
}

/// The largest square that fits the image, centered.
pub fn default_square_crop(natural: Size) -> PixelRect {
    let side = f64::from(natural.min_side());
    PixelRect {
        x: (f64::from(natural.width) - side) / 2.0,
        y: (f64::from(natural.height) - side) / 2.0,
        width: side,
        height: side,
    }
}

/// A 2D affine transform.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`, the same layout as a
/// CSS/canvas `matrix(a, b, c, d, e, f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform2D {
    pub const IDENTITY: AffineTransform2D = AffineTransform2D {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn scale(s: f64) -> Self {
        Self {
            a: s,
            d: s,
            ..Self::IDENTITY
        }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// Rotation by `degrees` (clockwise on a y-down surface).
    ///
    /// Right angles produce exact 0/±1 coefficients.
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = if degrees.rem_euclid(90.0) == 0.0 {
            match degrees.rem_euclid(360.0) as u32 {
                90 => (1.0, 0.0),
                180 => (0.0, -1.0),
                270 => (-1.0, 0.0),
                _ => (0.0, 1.0),
            }
        } else {
            degrees.to_radians().sin_cos()
        };
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Compose so that `self` is applied first, then `next`.
    pub fn then(&self, next: &AffineTransform2D) -> AffineTransform2D {
        AffineTransform2D {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn approx_eq(&self, other: &AffineTransform2D, epsilon: f64) -> bool {
        [
            self.a - other.a,
            self.b - other.b,
            self.c - other.c,
            self.d - other.d,
            self.e - other.e,
            self.f - other.f,
        ]
        .iter()
        .all(|delta| delta.abs() <= epsilon)
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::IDENTITY, 1e-12)
    }
}

/// The transform that shows a saved crop inside a square preview viewport.
///
/// Applied to the whole, unrotated image laid out to fill the viewport, the
/// transform translates the crop center onto the viewport center, scales so
/// the crop's shorter side fills the viewport, and rotates last. The crop
/// therefore turns in place around the viewport center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewTransform {
    pub scale: f64,
    /// Horizontal translation as a percentage of the viewport width.
    pub translate_x_percent: f64,
    /// Vertical translation as a percentage of the viewport height.
    pub translate_y_percent: f64,
    pub rotation_deg: f64,
}

impl PreviewTransform {
    /// Matrix form in viewport units: the viewport is 1.0 wide and tall and
    /// the origin is its center.
    pub fn matrix(&self) -> AffineTransform2D {
        let translate = AffineTransform2D::translate(
            self.translate_x_percent / 100.0,
            self.translate_y_percent / 100.0,
        );
        translate
            .then(&AffineTransform2D::scale(self.scale))
            .then(&AffineTransform2D::rotate(self.rotation_deg))
    }

    /// CSS `transform` value, e.g. `rotate(90deg) scale(2) translate(25.00%, 25.00%)`.
    ///
    /// CSS applies the rightmost function first, matching [`Self::matrix`].
    pub fn to_css(&self) -> String {
        let mut parts = Vec::new();
        if self.rotation_deg != 0.0 {
            parts.push(format!("rotate({}deg)", self.rotation_deg));
        }
        let moved = self.translate_x_percent != 0.0 || self.translate_y_percent != 0.0;
        if self.scale != 1.0 || moved {
            parts.push(format!(
                "scale({}) translate({:.2}%, {:.2}%)",
                self.scale, self.translate_x_percent, self.translate_y_percent
            ));
        }
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Compute the preview transform for a crop and rotation.
///
/// `scale = 1 / min(width, height)` so the shorter crop side fills the viewport
/// (fill policy: a non-square crop overflows along its longer side). The
/// translation moves the crop center `(cx, cy)` to the viewport center:
/// `((0.5 - cx) * 100%, (0.5 - cy) * 100%)`. Without a crop only the rotation
/// remains.
pub fn preview_transform(crop: Option<&NormalizedRect>, rotation_deg: f64) -> PreviewTransform {
    match crop {
        Some(area) => {
            let (cx, cy) = area.center();
            PreviewTransform {
                scale: 1.0 / area.width.min(area.height),
                translate_x_percent: (0.5 - cx) * 100.0,
                translate_y_percent: (0.5 - cy) * 100.0,
                rotation_deg,
            }
        }
        None => PreviewTransform {
            scale: 1.0,
            translate_x_percent: 0.0,
            translate_y_percent: 0.0,
            rotation_deg,
        },
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
