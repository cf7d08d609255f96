//! Image processing backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the two pixel-level operations the
//! generator needs: probe (dimensions from encoded bytes) and resize+encode.
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust, statically
//! linked, built on the `image` crate.
//!
//! Everything above this trait is backend-agnostic, so tests exercise the
//! full rule/generation logic against a recording mock.

use super::params::EncodeParams;
use crate::asset::Metadata;
use crate::format::Format;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Trait for image processing backends.
///
/// Operations are buffer-in/buffer-out — the backend never touches the
/// filesystem, which keeps asset processing a pure in-process transformation.
pub trait ImageBackend: Sync {
    /// Decode just enough of `contents` to report pixel dimensions.
    fn probe(&self, contents: &[u8], format: Format) -> Result<Metadata, BackendError>;

    /// Decode `contents`, optionally resize to `params.target_width`, and
    /// encode into `params.format`.
    fn resize_encode(
        &self,
        contents: &[u8],
        source_format: Format,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
