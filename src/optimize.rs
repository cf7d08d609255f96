//! Post-encode optimization pass.
//!
//! Mirrors the role an imagemin-style plugin chain plays in asset pipelines:
//! each format gets a pre-built optimizer handle, callers can swap any of
//! them at construction time or per rule. The built-ins are deliberately
//! conservative:
//!
//! - **JPEG**: re-encode at the optimizer's quality (mozjpeg's role).
//! - **PNG**: re-encode at maximum compression effort (zopfli's role).
//! - **WebP**: re-encode lossless (the pure-Rust encoder's only mode).
//! - **GIF**: passthrough — re-encoding through a single-frame codec would
//!   flatten animations.
//! - **SVG**: strip XML comments and collapse inter-tag whitespace.
//!
//! A `skip_optimization` rule bypasses this pass entirely.

use crate::format::Format;
use crate::imaging::{BackendError, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{self, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use regex::Regex;
use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, LazyLock};

/// A per-format compression pass over an already-encoded buffer.
pub trait Optimizer: Send + Sync {
    fn optimize(&self, contents: &[u8], format: Format) -> Result<Vec<u8>, BackendError>;
}

fn decode_as(contents: &[u8], format: ImageFormat) -> Result<DynamicImage, BackendError> {
    ImageReader::with_format(Cursor::new(contents), format)
        .decode()
        .map_err(|e| BackendError::Decode(format!("optimizer decode failed: {e}")))
}

/// Quality-targeted JPEG re-encode.
#[derive(Debug, Clone, Copy)]
pub struct JpegOptimizer {
    pub quality: Quality,
}

impl Default for JpegOptimizer {
    fn default() -> Self {
        Self {
            quality: Quality::new(85),
        }
    }
}

impl Optimizer for JpegOptimizer {
    fn optimize(&self, contents: &[u8], _format: Format) -> Result<Vec<u8>, BackendError> {
        let img = decode_as(contents, ImageFormat::Jpeg)?;
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut out = Cursor::new(Vec::new());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(
            &mut out,
            self.quality.value() as u8,
        ))
        .map_err(|e| BackendError::Encode(format!("jpeg optimize failed: {e}")))?;
        Ok(out.into_inner())
    }
}

/// Structural (lossless) PNG re-encode at maximum compression effort.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngOptimizer;

impl Optimizer for PngOptimizer {
    fn optimize(&self, contents: &[u8], _format: Format) -> Result<Vec<u8>, BackendError> {
        let img = decode_as(contents, ImageFormat::Png)?;
        let mut out = Cursor::new(Vec::new());
        img.write_with_encoder(PngEncoder::new_with_quality(
            &mut out,
            png::CompressionType::Best,
            png::FilterType::Adaptive,
        ))
        .map_err(|e| BackendError::Encode(format!("png optimize failed: {e}")))?;
        Ok(out.into_inner())
    }
}

/// Lossless WebP re-encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpOptimizer;

impl Optimizer for WebpOptimizer {
    fn optimize(&self, contents: &[u8], _format: Format) -> Result<Vec<u8>, BackendError> {
        let img = decode_as(contents, ImageFormat::WebP)?;
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        let mut out = Cursor::new(Vec::new());
        rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))
            .map_err(|e| BackendError::Encode(format!("webp optimize failed: {e}")))?;
        Ok(out.into_inner())
    }
}

/// Passthrough: returns the buffer unchanged. The default for GIF (where a
/// re-encode would flatten animations) and the way to disable optimization
/// for a single format slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOptimizer;

impl Optimizer for NoopOptimizer {
    fn optimize(&self, contents: &[u8], _format: Format) -> Result<Vec<u8>, BackendError> {
        Ok(contents.to_vec())
    }
}

static XML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static INTER_TAG_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// Minimal SVG minifier: strips comments and collapses whitespace between
/// tags. Text content inside elements is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgOptimizer;

impl Optimizer for SvgOptimizer {
    fn optimize(&self, contents: &[u8], _format: Format) -> Result<Vec<u8>, BackendError> {
        let text = std::str::from_utf8(contents)
            .map_err(|e| BackendError::Decode(format!("SVG is not valid UTF-8: {e}")))?;
        let without_comments = XML_COMMENT.replace_all(text, "");
        let collapsed = INTER_TAG_WS.replace_all(&without_comments, "><");
        Ok(collapsed.trim().as_bytes().to_vec())
    }
}

/// One optimizer handle per supported format, swappable individually.
#[derive(Clone)]
pub struct OptimizerSet {
    pub webp: Arc<dyn Optimizer>,
    pub jpg: Arc<dyn Optimizer>,
    pub png: Arc<dyn Optimizer>,
    pub gif: Arc<dyn Optimizer>,
    pub svg: Arc<dyn Optimizer>,
}

impl Default for OptimizerSet {
    fn default() -> Self {
        Self {
            webp: Arc::new(WebpOptimizer),
            jpg: Arc::new(JpegOptimizer::default()),
            png: Arc::new(PngOptimizer),
            gif: Arc::new(NoopOptimizer),
            svg: Arc::new(SvgOptimizer),
        }
    }
}

impl OptimizerSet {
    /// A set where every slot is a passthrough.
    pub fn noop() -> Self {
        let noop: Arc<dyn Optimizer> = Arc::new(NoopOptimizer);
        Self {
            webp: noop.clone(),
            jpg: noop.clone(),
            png: noop.clone(),
            gif: noop.clone(),
            svg: noop,
        }
    }
}

impl fmt::Debug for OptimizerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OptimizerSet { .. }")
    }
}

/// Sparse per-format replacement merged over an [`OptimizerSet`].
#[derive(Clone, Default)]
pub struct OptimizerOverride {
    pub webp: Option<Arc<dyn Optimizer>>,
    pub jpg: Option<Arc<dyn Optimizer>>,
    pub png: Option<Arc<dyn Optimizer>>,
    pub gif: Option<Arc<dyn Optimizer>>,
    pub svg: Option<Arc<dyn Optimizer>>,
}

impl fmt::Debug for OptimizerOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OptimizerOverride { .. }")
    }
}

impl OptimizerSet {
    pub fn for_format(&self, format: Format) -> &Arc<dyn Optimizer> {
        match format {
            Format::Webp => &self.webp,
            Format::Jpeg => &self.jpg,
            Format::Png => &self.png,
            Format::Gif => &self.gif,
            Format::Svg => &self.svg,
        }
    }

    /// Apply a sparse override, slot by slot.
    pub fn merged(&self, overrides: &OptimizerOverride) -> Self {
        let pick = |ovr: &Option<Arc<dyn Optimizer>>, base: &Arc<dyn Optimizer>| {
            ovr.as_ref().unwrap_or(base).clone()
        };
        Self {
            webp: pick(&overrides.webp, &self.webp),
            jpg: pick(&overrides.jpg, &self.jpg),
            png: pick(&overrides.png, &self.png),
            gif: pick(&overrides.gif, &self.gif),
            svg: pick(&overrides.svg, &self.svg),
        }
    }
}
