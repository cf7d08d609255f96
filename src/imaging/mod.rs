//! Image processing — pure Rust, zero external dependencies.
//!
//! The module is split into:
//! - **Calculations**: pure functions for width-spec math (unit testable)
//! - **Parameters**: data structures describing encode operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//!
//! The backend works on byte buffers, never paths: decoding, resizing and
//! encoding are in-process transformations and the caller owns all I/O.

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{default_postfix, is_identity_spec, resolve_width, scaled_height};
pub use params::{
    EncodeParams, JpegOptions, PngCompression, PngOptions, ProcessingOptions, ProcessingOverride,
    Quality, WebpOptions,
};
pub use rust_backend::RustBackend;
