//! Grid compositing.
//!
//! [`compose_grid`] turns up to nine frames into one decorated JPEG:
//!
//! 1. Read every frame's saved crop and rotation once, up front
//! 2. Fetch and decode all frames in parallel, then wait for every load
//! 3. Paint border and background, then each cell in row-major order:
//!    crop, rotate, stretch to the cell, shadow, rounded clip
//! 4. Encode at quality 95
//!
//! A frame that fails to load leaves its cell empty and is reported in the
//! [`CompositeReport`]; the grid is still produced.

mod canvas;
mod spec;

pub use spec::{GridSpec, GridStyle, DEFAULT_CELL_SIZE, GRID_SIZE, MAX_CANVAS_DIMENSION};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decode::{resize, DecodedImage, FilterType};
use crate::encode::{encode_export, export_file_name, EncodeError};
use crate::source::{load_image, ImageSource, LoadError};
use crate::store::{SavedTransform, StoreError, TransformStore};
use crate::transform::{apply_crop, apply_rotation, Rotation};
use crate::ImageRef;
use canvas::Canvas;

/// Failures that stop a composite.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("cannot allocate a {width}x{height} canvas")]
    CanvasUnavailable { width: u64, height: u64 },

    #[error("failed to encode grid: {0}")]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Conditions that degrade a composite without stopping it.
#[derive(Debug, Error)]
pub enum CompositeWarning {
    #[error("only {supplied} of {capacity} cells have an image")]
    InsufficientImages { supplied: usize, capacity: usize },

    #[error("cell {index} left empty: {error}")]
    LoadFailure {
        index: usize,
        image: ImageRef,
        #[source]
        error: LoadError,
    },
}

/// What was drawn, and what went wrong along the way.
#[derive(Debug, Default)]
pub struct CompositeReport {
    /// Indices of the cells that received an image.
    pub drawn: Vec<usize>,
    pub warnings: Vec<CompositeWarning>,
}

impl CompositeReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// An encoded grid ready to be written out.
#[derive(Debug)]
pub struct GridImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Suggested file name, `grid_<unix-millis>.jpg`.
    pub file_name: String,
    pub report: CompositeReport,
}

/// Saved edits for one cell, read before loading starts.
#[derive(Debug, Clone, Copy)]
struct CellEdits {
    transform: Option<SavedTransform>,
    rotation: Rotation,
}

/// Composite `images` into a grid laid out by `spec`.
///
/// Images fill cells in order; extras beyond the grid's capacity are ignored
/// and missing ones leave background. The store is only read.
///
/// # Errors
///
/// `CanvasUnavailable` if the layout has no area or exceeds
/// [`MAX_CANVAS_DIMENSION`], `Store` if saved edits cannot be read, `Encode`
/// if the JPEG cannot be produced. Individual load failures are warnings.
pub fn compose_grid<S, L>(
    images: &[ImageRef],
    store: &S,
    source: &L,
    spec: &GridSpec,
) -> Result<GridImage, CompositeError>
where
    S: TransformStore,
    L: ImageSource,
{
    let (canvas, report) = render_grid(images, store, source, spec)?;
    let bytes = encode_export(&canvas)?;
    let file_name = export_file_name(Utc::now());

    info!(
        file = %file_name,
        side = canvas.width,
        drawn = report.drawn.len(),
        warnings = report.warnings.len(),
        bytes = bytes.len(),
        "grid composed"
    );

    Ok(GridImage {
        bytes,
        width: canvas.width,
        height: canvas.height,
        file_name,
        report,
    })
}

fn render_grid<S, L>(
    images: &[ImageRef],
    store: &S,
    source: &L,
    spec: &GridSpec,
) -> Result<(DecodedImage, CompositeReport), CompositeError>
where
    S: TransformStore,
    L: ImageSource,
{
    let side = spec.canvas_size();
    if side == 0 || spec.cell_size == 0 || side > u64::from(MAX_CANVAS_DIMENSION) {
        return Err(CompositeError::CanvasUnavailable {
            width: side,
            height: side,
        });
    }
    let side = side as u32;

    let capacity = spec.capacity();
    if images.len() > capacity {
        debug!(
            supplied = images.len(),
            capacity,
            "ignoring images beyond grid capacity"
        );
    }
    let images = &images[..images.len().min(capacity)];

    let mut report = CompositeReport::default();
    if images.len() < capacity {
        warn!(supplied = images.len(), capacity, "grid is not full");
        report.warnings.push(CompositeWarning::InsufficientImages {
            supplied: images.len(),
            capacity,
        });
    }

    let edits = images
        .iter()
        .map(|image| {
            Ok(CellEdits {
                transform: store.transform(image)?,
                rotation: store.rotation(image)?.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    let loaded = load_all(images, source);

    let style = GridStyle::DEFAULT;
    let mut canvas = Canvas::new(side, style.base);
    canvas.draw_border(style.border_color, style.border_width);
    canvas.fill_diagonal_gradient(spec.padding / 2, style.gradient_start, style.gradient_end);

    for (index, ((image, edits), result)) in images.iter().zip(&edits).zip(loaded).enumerate() {
        let cell = result.and_then(|decoded| {
            prepare_cell(&decoded, edits, spec.cell_size).map_err(|source| LoadError::Decode {
                image: image.clone(),
                source,
            })
        });
        match cell {
            Ok(cell) => {
                let (x, y) = spec.cell_origin(index);
                canvas.draw_shadow(x, y, spec.cell_size, &style);
                canvas.draw_rounded(&cell, x, y, style.corner_radius);
                report.drawn.push(index);
                debug!(index, %image, "cell drawn");
            }
            Err(error) => {
                warn!(index, %image, %error, "leaving cell empty");
                report.warnings.push(CompositeWarning::LoadFailure {
                    index,
                    image: image.clone(),
                    error,
                });
            }
        }
    }

    Ok((canvas.into_image(), report))
}

/// Fetch and decode every image on its own thread; results keep input order.
fn load_all<L: ImageSource>(
    images: &[ImageRef],
    source: &L,
) -> Vec<Result<DecodedImage, LoadError>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = images
            .iter()
            .map(|image| scope.spawn(move || load_image(source, image)))
            .collect();

        images
            .iter()
            .zip(handles)
            .map(|(image, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(LoadError::Io {
                        image: image.clone(),
                        message: "image loader panicked".to_string(),
                    })
                })
            })
            .collect()
    })
}

/// Crop, rotate and stretch one frame to a `cell_size` square.
fn prepare_cell(
    image: &DecodedImage,
    edits: &CellEdits,
    cell_size: u32,
) -> Result<DecodedImage, crate::decode::DecodeError> {
    let cropped;
    let mut current = image;
    if let Some(saved) = &edits.transform {
        cropped = apply_crop(current, &saved.crop_area);
        current = &cropped;
    }

    let rotated;
    if !edits.rotation.is_identity() {
        rotated = apply_rotation(current, edits.rotation);
        current = &rotated;
    }

    resize(current, cell_size, cell_size, FilterType::Bilinear)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    use image::{ImageFormat, RgbImage};

    use super::*;
    use crate::geometry::NormalizedRect;
    use crate::source::testing::{png, MemorySource};
    use crate::store::MemoryStore;

    const RED: [u8; 3] = [255, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 255];

    fn png_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb(f(x, y)));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn frames(count: usize) -> (MemorySource, Vec<ImageRef>) {
        let mut source = MemorySource::default();
        let mut refs = Vec::new();
        for i in 0..count {
            let name = format!("frame_{i}.jpg");
            source = source.with(&name, png(40, 30, RED));
            refs.push(ImageRef::from(name));
        }
        (source, refs)
    }

    fn cell_center(spec: &GridSpec, index: usize) -> (u32, u32) {
        let (x, y) = spec.cell_origin(index);
        let half = u64::from(spec.cell_size / 2);
        ((x + half) as u32, (y + half) as u32)
    }

    fn near(actual: [u8; 3], expected: [u8; 3]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(a, e)| (i16::from(*a) - i16::from(e)).abs() <= 8)
    }

    #[test]
    fn test_full_grid_canvas_size() {
        let (source, refs) = frames(9);
        let store = MemoryStore::in_memory();
        let spec = GridSpec::with_cell_size(50);

        let grid = compose_grid(&refs, &store, &source, &spec).unwrap();

        let expected = 3 * 50 + 2 * spec.gap + 2 * spec.padding;
        assert_eq!(grid.width, expected);
        assert_eq!(grid.height, expected);
        assert!(grid.report.is_clean());
        assert_eq!(grid.report.drawn, (0..9).collect::<Vec<_>>());

        let decoded = crate::decode::decode_image(&grid.bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (expected, expected));
        assert!(grid.file_name.starts_with("grid_"));
        assert!(grid.file_name.ends_with(".jpg"));
    }

    #[test]
    fn test_five_images_leave_background() {
        let (source, refs) = frames(5);
        let store = MemoryStore::in_memory();
        let spec = GridSpec::with_cell_size(50);

        let (canvas, report) = render_grid(&refs, &store, &source, &spec).unwrap();

        assert_eq!(report.drawn, vec![0, 1, 2, 3, 4]);
        assert!(matches!(
            report.warnings.as_slice(),
            [CompositeWarning::InsufficientImages {
                supplied: 5,
                capacity: 9
            }]
        ));
        for index in 0..5 {
            let (x, y) = cell_center(&spec, index);
            assert_eq!(canvas.pixel(x, y), RED, "cell {index}");
        }

        let mut blank = Canvas::new(canvas.width, GridStyle::DEFAULT.base);
        blank.fill_diagonal_gradient(
            spec.padding / 2,
            GridStyle::DEFAULT.gradient_start,
            GridStyle::DEFAULT.gradient_end,
        );
        let blank = blank.into_image();
        for index in 5..9 {
            let (x, y) = cell_center(&spec, index);
            assert_eq!(canvas.pixel(x, y), blank.pixel(x, y), "cell {index}");
        }
    }

    #[test]
    fn test_failed_load_skips_cell() {
        let (source, mut refs) = frames(9);
        refs[4] = ImageRef::from("missing.jpg");
        let source = source.with("corrupt.jpg", vec![0xFF, 0xD8, 0x00]);
        refs[7] = ImageRef::from("corrupt.jpg");
        let store = MemoryStore::in_memory();
        let spec = GridSpec::with_cell_size(50);

        let (canvas, report) = render_grid(&refs, &store, &source, &spec).unwrap();

        assert_eq!(report.drawn, vec![0, 1, 2, 3, 5, 6, 8]);
        assert!(matches!(
            report.warnings.as_slice(),
            [
                CompositeWarning::LoadFailure {
                    index: 4,
                    error: LoadError::NotFound(_),
                    ..
                },
                CompositeWarning::LoadFailure {
                    index: 7,
                    error: LoadError::Decode { .. },
                    ..
                },
            ]
        ));
        let (x, y) = cell_center(&spec, 4);
        assert_ne!(canvas.pixel(x, y), RED);
    }

    #[test]
    fn test_extra_images_are_not_loaded() {
        let (source, refs) = frames(12);
        let store = MemoryStore::in_memory();
        let spec = GridSpec::with_cell_size(30);

        let (_, report) = render_grid(&refs, &store, &source, &spec).unwrap();

        assert_eq!(report.drawn.len(), 9);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_saved_crop_applied() {
        // Left half red, right half blue
        let bytes = png_from_fn(40, 20, |x, _| if x < 20 { RED } else { BLUE });
        let source = MemorySource::default().with("a.jpg", bytes);
        let image = ImageRef::from("a.jpg");
        let mut store = MemoryStore::in_memory();
        store
            .put_transform(
                &image,
                SavedTransform::new(NormalizedRect::new(0.5, 0.0, 0.5, 1.0).unwrap(), 2.0),
            )
            .unwrap();
        let spec = GridSpec::with_cell_size(50);

        let (canvas, _) = render_grid(&[image], &store, &source, &spec).unwrap();

        let (x, y) = spec.cell_origin(0);
        let (x, y) = (x as u32, y as u32);
        assert!(near(canvas.pixel(x + 10, y + 25), BLUE));
        assert!(near(canvas.pixel(x + 40, y + 25), BLUE));
    }

    #[test]
    fn test_saved_rotation_applied_clockwise() {
        // Top half red, bottom half blue
        let bytes = png_from_fn(20, 20, |_, y| if y < 10 { RED } else { BLUE });
        let source = MemorySource::default().with("b.jpg", bytes);
        let image = ImageRef::from("b.jpg");
        let mut store = MemoryStore::in_memory();
        store.put_rotation(&image, Rotation::Deg90).unwrap();
        let spec = GridSpec::with_cell_size(50);

        let (canvas, _) = render_grid(&[image], &store, &source, &spec).unwrap();

        // Clockwise quarter turn moves the top edge to the right
        let (x, y) = spec.cell_origin(0);
        let (x, y) = (x as u32, y as u32);
        assert!(near(canvas.pixel(x + 10, y + 25), BLUE));
        assert!(near(canvas.pixel(x + 40, y + 25), RED));
    }

    #[test]
    fn test_rounded_corners_show_background() {
        let (source, refs) = frames(1);
        let store = MemoryStore::in_memory();
        let spec = GridSpec::with_cell_size(50);

        let (canvas, _) = render_grid(&refs, &store, &source, &spec).unwrap();

        let (x, y) = spec.cell_origin(0);
        assert_ne!(canvas.pixel(x as u32, y as u32), RED);
    }

    #[test]
    fn test_empty_list_still_renders() {
        let source = MemorySource::default();
        let store = MemoryStore::in_memory();
        let grid = compose_grid(&[], &store, &source, &GridSpec::with_cell_size(20)).unwrap();
        assert!(grid.report.drawn.is_empty());
        assert!(!grid.bytes.is_empty());
    }

    #[test]
    fn test_canvas_unavailable() {
        let source = MemorySource::default();
        let store = MemoryStore::in_memory();

        let zero = compose_grid(&[], &store, &source, &GridSpec::with_cell_size(0));
        assert!(matches!(
            zero,
            Err(CompositeError::CanvasUnavailable { width: 0, .. })
        ));

        let huge = compose_grid(&[], &store, &source, &GridSpec::with_cell_size(10_000));
        assert!(matches!(huge, Err(CompositeError::CanvasUnavailable { .. })));
    }
}
