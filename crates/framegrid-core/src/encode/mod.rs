//! Image encoding for grid export.
//!
//! # Examples
//!
//! ```ignore
//! use framegrid_core::encode::encode_export;
//!
//! let jpeg_bytes = encode_export(&canvas).unwrap();
//! println!("Encoded {} bytes", jpeg_bytes.len());
//! ```

mod jpeg;

pub use jpeg::{encode_export, encode_jpeg, export_file_name, EncodeError, EXPORT_QUALITY};
