//! Interactive crop editing for one image at a time.
//!
//! A [`CropSession`] is the controller behind a crop dialog. It seeds the
//! editor from the store, tracks the user's crop, zoom and rotation in memory,
//! and writes them back only on [`CropSession::save`]. Closing any other way
//! discards the edits.
//!
//! ```text
//! Closed -> Opening -> Editing -> Saving     -> Closed
//!                              \-> Cancelling -> Closed
//! ```
//!
//! Crops are always square because grid cells are square.

use thiserror::Error;
use tracing::{debug, info};

use crate::decode::probe_dimensions;
use crate::geometry::{
    default_square_crop, normalized_rect_to_pixel, pixel_rect_to_normalized, preview_transform,
    PixelRect, PreviewTransform, Size,
};
use crate::source::{ImageSource, LoadError};
use crate::store::{clamp_zoom, SavedTransform, StoreError, TransformStore, MIN_ZOOM};
use crate::transform::Rotation;
use crate::ImageRef;

/// Lifecycle state of a crop session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Editing,
    Saving,
    Cancelling,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {operation} while the session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("failed to load image: {0}")]
    LoadFailure(#[from] LoadError),

    #[error("cannot create an editing surface for {image} ({width}x{height})")]
    CanvasUnavailable {
        image: ImageRef,
        width: u32,
        height: u32,
    },

    /// `save` was called before the editor reported any crop rectangle.
    #[error("no crop rectangle has been resolved since the session opened")]
    InvalidCropState,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
struct EditState {
    image: ImageRef,
    natural: Size,
    crop: PixelRect,
    zoom: f64,
    rotation: Rotation,
    crop_resolved: bool,
}

/// Controller for one crop/rotate editing lifecycle at a time.
///
/// The session can be reopened after it closes.
pub struct CropSession<'a, S, L> {
    store: &'a mut S,
    source: &'a L,
    state: SessionState,
    edit: Option<EditState>,
}

impl<'a, S, L> CropSession<'a, S, L>
where
    S: TransformStore,
    L: ImageSource,
{
    pub fn new(store: &'a mut S, source: &'a L) -> Self {
        Self {
            store,
            source,
            state: SessionState::Closed,
            edit: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.edit.as_ref().map(|edit| &edit.image)
    }

    pub fn natural_size(&self) -> Option<Size> {
        self.edit.as_ref().map(|edit| edit.natural)
    }

    /// Current crop in natural pixel coordinates.
    pub fn crop(&self) -> Option<PixelRect> {
        self.edit.as_ref().map(|edit| edit.crop)
    }

    pub fn zoom(&self) -> Option<f64> {
        self.edit.as_ref().map(|edit| edit.zoom)
    }

    pub fn rotation(&self) -> Option<Rotation> {
        self.edit.as_ref().map(|edit| edit.rotation)
    }

    /// Open `image` for editing.
    ///
    /// Loads the image's natural size, then seeds crop and zoom from the saved
    /// transform (or the largest centered square at zoom 1) and rotation from
    /// the saved rotation (or 0). Nothing is written.
    ///
    /// # Errors
    ///
    /// `LoadFailure` if the image cannot be fetched or read,
    /// `CanvasUnavailable` if it has no pixels, `Store` if saved state cannot
    /// be read. The session stays `Closed` on any error.
    pub fn open(&mut self, image: ImageRef) -> Result<(), SessionError> {
        self.expect_state("open", SessionState::Closed)?;
        self.state = SessionState::Opening;
        debug!(%image, "opening crop session");

        match self.seed(&image) {
            Ok(edit) => {
                debug!(
                    %image,
                    width = edit.natural.width,
                    height = edit.natural.height,
                    zoom = edit.zoom,
                    rotation = edit.rotation.degrees(),
                    "crop session editing"
                );
                self.edit = Some(edit);
                self.state = SessionState::Editing;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Closed;
                Err(err)
            }
        }
    }

    fn seed(&self, image: &ImageRef) -> Result<EditState, SessionError> {
        let bytes = self.source.fetch(image)?;
        let natural = probe_dimensions(&bytes).map_err(|source| LoadError::Decode {
            image: image.clone(),
            source,
        })?;
        if natural.is_empty() {
            return Err(SessionError::CanvasUnavailable {
                image: image.clone(),
                width: natural.width,
                height: natural.height,
            });
        }

        let (crop, zoom) = match self.store.transform(image)? {
            Some(saved) => (
                normalized_rect_to_pixel(&saved.crop_area, natural),
                clamp_zoom(saved.zoom),
            ),
            None => (default_square_crop(natural), MIN_ZOOM),
        };
        let rotation = self.store.rotation(image)?.unwrap_or_default();

        Ok(EditState {
            image: image.clone(),
            natural,
            crop,
            zoom,
            rotation,
            crop_resolved: false,
        })
    }

    /// The editor resolved a crop rectangle.
    ///
    /// The rectangle is made square (shorter side, same center) and moved
    /// inside the image; zoom is clamped to `[1, 3]`. Non-finite values keep
    /// the current crop. Returns the crop as stored in the session.
    pub fn update_crop(&mut self, rect: PixelRect, zoom: f64) -> Result<PixelRect, SessionError> {
        let edit = self.editing_mut("update the crop")?;
        edit.crop = square_within(&rect, edit.natural).unwrap_or(edit.crop);
        edit.zoom = clamp_zoom(zoom);
        edit.crop_resolved = true;
        Ok(edit.crop)
    }

    /// Change the zoom without resolving a crop.
    pub fn update_zoom(&mut self, zoom: f64) -> Result<f64, SessionError> {
        let edit = self.editing_mut("update the zoom")?;
        edit.zoom = clamp_zoom(zoom);
        Ok(edit.zoom)
    }

    /// Turn the image a further 90° clockwise.
    pub fn update_rotation(&mut self) -> Result<Rotation, SessionError> {
        let edit = self.editing_mut("rotate")?;
        edit.rotation = edit.rotation.next();
        Ok(edit.rotation)
    }

    /// Preview of the in-session crop and rotation, for a square viewport.
    pub fn preview_transform(&self) -> Option<PreviewTransform> {
        let edit = self.edit.as_ref()?;
        let area = pixel_rect_to_normalized(&edit.crop, edit.natural);
        Some(preview_transform(
            Some(&area),
            f64::from(edit.rotation.degrees()),
        ))
    }

    /// Persist the crop, zoom and rotation, then close.
    ///
    /// # Errors
    ///
    /// `InvalidCropState` if no crop was resolved since `open`; `Store` if the
    /// store rejects a write. In both cases the session stays `Editing`.
    pub fn save(&mut self) -> Result<SavedTransform, SessionError> {
        let edit = match self.edit.as_ref() {
            Some(edit) if self.state == SessionState::Editing => edit,
            _ => {
                return Err(SessionError::InvalidState {
                    operation: "save",
                    state: self.state,
                })
            }
        };
        if !edit.crop_resolved {
            return Err(SessionError::InvalidCropState);
        }

        self.state = SessionState::Saving;
        let saved = SavedTransform::new(
            pixel_rect_to_normalized(&edit.crop, edit.natural),
            edit.zoom,
        );
        let image = edit.image.clone();
        let rotation = edit.rotation;

        let written = self
            .store
            .put_transform(&image, saved)
            .and_then(|()| self.store.put_rotation(&image, rotation));
        if let Err(err) = written {
            self.state = SessionState::Editing;
            return Err(err.into());
        }

        info!(
            %image,
            x = saved.crop_area.x(),
            y = saved.crop_area.y(),
            size = saved.crop_area.width(),
            zoom = saved.zoom,
            rotation = rotation.degrees(),
            "saved crop"
        );
        self.edit = None;
        self.state = SessionState::Closed;
        Ok(saved)
    }

    /// Discard in-session edits and close. A closed session stays closed.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Closed => Ok(()),
            SessionState::Editing => {
                self.state = SessionState::Cancelling;
                if let Some(edit) = self.edit.take() {
                    debug!(image = %edit.image, "crop session cancelled");
                }
                self.state = SessionState::Closed;
                Ok(())
            }
            state => Err(SessionError::InvalidState {
                operation: "cancel",
                state,
            }),
        }
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: SessionState,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn editing_mut(&mut self, operation: &'static str) -> Result<&mut EditState, SessionError> {
        self.expect_state(operation, SessionState::Editing)?;
        self.edit.as_mut().ok_or(SessionError::InvalidState {
            operation,
            state: SessionState::Closed,
        })
    }
}

/// Square `rect` around its center and fit it inside `natural`.
///
/// Returns `None` when the rectangle has non-finite components.
fn square_within(rect: &PixelRect, natural: Size) -> Option<PixelRect> {
    let finite = [rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return None;
    }

    let limit = f64::from(natural.min_side());
    let side = rect.width.min(rect.height).clamp(1.0_f64.min(limit), limit);
    let (cx, cy) = rect.center();

    let max_x = f64::from(natural.width) - side;
    let max_y = f64::from(natural.height) - side;
    Some(PixelRect {
        x: (cx - side / 2.0).clamp(0.0, max_x),
        y: (cy - side / 2.0).clamp(0.0, max_y),
        width: side,
        height: side,
    })
}
