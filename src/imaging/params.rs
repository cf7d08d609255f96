//! Parameter types for encode operations.
//!
//! These structs describe *what* to encode, not *how*. They are the interface
//! between [`generate`](crate::generate) (which decides what derivatives to
//! create) and the [`backend`](super::backend) (which does the pixel work),
//! so a mock backend can stand in during tests without touching codecs.

use crate::format::Format;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        // Derivative generation re-encodes at full quality by default; size
        // reduction is the optimizer pass's job.
        Self(100)
    }
}

/// PNG compression effort. `Best` trades encode time for output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Per-format encode options: the `processing` bundle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessingOptions {
    pub webp: WebpOptions,
    pub jpg: JpegOptions,
    pub png: PngOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WebpOptions {
    pub quality: Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JpegOptions {
    pub quality: Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PngOptions {
    pub compression: PngCompression,
}

/// Sparse override merged field-by-field over [`ProcessingOptions`].
///
/// Deterministic by construction: each present field replaces the default,
/// absent fields keep it. No generic deep-merge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessingOverride {
    pub webp_quality: Option<Quality>,
    pub jpg_quality: Option<Quality>,
    pub png_compression: Option<PngCompression>,
}

impl ProcessingOptions {
    /// Apply a sparse override, field by field.
    pub fn merged(&self, overrides: &ProcessingOverride) -> Self {
        Self {
            webp: WebpOptions {
                quality: overrides.webp_quality.unwrap_or(self.webp.quality),
            },
            jpg: JpegOptions {
                quality: overrides.jpg_quality.unwrap_or(self.jpg.quality),
            },
            png: PngOptions {
                compression: overrides.png_compression.unwrap_or(self.png.compression),
            },
        }
    }
}

/// Full specification of one encode: target format, optional resize width,
/// and the merged per-format options.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub format: Format,
    /// `Some(w)` resizes the decoded buffer to `w` pixels wide (preserving
    /// aspect ratio) before encoding; `None` keeps the native dimensions.
    pub target_width: Option<u32>,
    pub options: ProcessingOptions,
}
