//! Grid layout and decoration constants.

use serde::{Deserialize, Serialize};

/// Rows and columns in a grid.
pub const GRID_SIZE: u32 = 3;

/// Cell side used by the export button.
pub const DEFAULT_CELL_SIZE: u32 = 300;

/// Largest canvas side the compositor will allocate.
pub const MAX_CANVAS_DIMENSION: u32 = 16384;

/// Layout of an N×N grid of square cells.
///
/// ```text
/// | padding | cell | gap | cell | gap | cell | padding |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub grid_size: u32,
    pub cell_size: u32,
    pub gap: u32,
    pub padding: u32,
}

impl GridSpec {
    /// A 3×3 grid whose gap and padding are 2% and 4% of the cell side,
    /// rounded down.
    pub fn with_cell_size(cell_size: u32) -> Self {
        Self {
            grid_size: GRID_SIZE,
            cell_size,
            gap: (u64::from(cell_size) * 2 / 100) as u32,
            padding: (u64::from(cell_size) * 4 / 100) as u32,
        }
    }

    /// Number of cells.
    pub fn capacity(&self) -> usize {
        (self.grid_size as usize) * (self.grid_size as usize)
    }

    /// Side of the square canvas in pixels.
    ///
    /// Computed in 64 bits so absurd specs report their true size instead of
    /// wrapping.
    pub fn canvas_size(&self) -> u64 {
        let n = u64::from(self.grid_size);
        n * u64::from(self.cell_size)
            + n.saturating_sub(1) * u64::from(self.gap)
            + 2 * u64::from(self.padding)
    }

    /// Top-left corner of cell `index`, counted row-major.
    pub fn cell_origin(&self, index: usize) -> (u64, u64) {
        let n = u64::from(self.grid_size.max(1));
        let index = index as u64;
        let (row, col) = (index / n, index % n);
        let stride = u64::from(self.cell_size) + u64::from(self.gap);
        let pad = u64::from(self.padding);
        (pad + col * stride, pad + row * stride)
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }
}

/// Fixed canvas and cell decoration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStyle {
    /// Canvas color before any decoration.
    pub base: [u8; 3],
    pub border_color: [u8; 3],
    pub border_width: u32,
    /// Diagonal background gradient, top-left to bottom-right.
    pub gradient_start: [u8; 3],
    pub gradient_end: [u8; 3],
    pub corner_radius: f32,
    pub shadow_color: [u8; 3],
    pub shadow_opacity: f32,
    pub shadow_blur: f32,
    pub shadow_offset: (i64, i64),
}

impl GridStyle {
    pub const DEFAULT: GridStyle = GridStyle {
        base: [255, 255, 255],
        border_color: [0xe5, 0xe7, 0xeb],
        border_width: 1,
        gradient_start: [0xff, 0xf7, 0xed],
        gradient_end: [0xf9, 0xfa, 0xfb],
        corner_radius: 8.0,
        shadow_color: [0, 0, 0],
        shadow_opacity: 0.1,
        shadow_blur: 4.0,
        shadow_offset: (0, 2),
    };
}

impl Default for GridStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}
