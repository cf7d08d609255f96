//! Supported image formats and their classification.
//!
//! The supported set is fixed: webp, jpeg/jpg, png, gif, svg. Everything
//! else is unknown — matching treats unknown formats as a non-match,
//! generation treats them as an error (see [`generate`](crate::generate)).

use std::fmt;

/// An output/input image format from the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Webp,
    Jpeg,
    Png,
    Gif,
    Svg,
}

/// Extensions recognized per format. `jpg` and `jpeg` map to the same format.
const EXTENSION_CANDIDATES: &[(&str, Format)] = &[
    ("webp", Format::Webp),
    ("jpg", Format::Jpeg),
    ("jpeg", Format::Jpeg),
    ("png", Format::Png),
    ("gif", Format::Gif),
    ("svg", Format::Svg),
];

impl Format {
    /// Parse a file extension (without the dot) into a format.
    ///
    /// Case-insensitive. Returns `None` for anything outside the supported set.
    pub fn from_extension(ext: &str) -> Option<Self> {
        EXTENSION_CANDIDATES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
            .map(|(_, format)| *format)
    }

    /// Canonical extension used when naming derivative files.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Webp => "webp",
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Svg => "svg",
        }
    }

    /// Passthrough formats skip width iteration entirely: they are only
    /// optimized, never resized or converted (SVG is a vector format, GIF
    /// may be animated and resizing would flatten it).
    pub fn is_passthrough(self) -> bool {
        matches!(self, Format::Svg | Format::Gif)
    }

    /// Formats encoded with a quality-targeted lossy encoder.
    pub fn is_lossy(self) -> bool {
        matches!(self, Format::Webp | Format::Jpeg)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
