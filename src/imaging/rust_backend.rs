//! Pure Rust image backend — zero external dependencies.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Probe raster dimensions | `image::ImageReader::into_dimensions` |
//! | Probe SVG dimensions | attribute scan (`width`/`height`/`viewBox`) |
//! | Resize | `image::imageops` via `resize_exact` with `Lanczos3` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` (quality-targeted) |
//! | Encode PNG | `image::codecs::png::PngEncoder` (configurable effort) |
//! | Encode WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode GIF | `image::ImageFormat::Gif` via `write_to` |
//!
//! The `image` crate's WebP encoder is lossless-only; the webp quality
//! setting therefore has no effect on webp *output* (it would apply if a
//! lossy encoder were slotted in behind this backend).

use super::backend::{BackendError, ImageBackend};
use super::calculations::scaled_height;
use super::params::{EncodeParams, PngCompression};
use crate::asset::Metadata;
use crate::format::Format;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{self, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use regex::Regex;
use std::io::Cursor;
use std::sync::LazyLock;

/// Pure Rust backend using the `image` crate ecosystem.
#[derive(Debug, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn image_format(format: Format) -> Option<ImageFormat> {
    match format {
        Format::Webp => Some(ImageFormat::WebP),
        Format::Jpeg => Some(ImageFormat::Jpeg),
        Format::Png => Some(ImageFormat::Png),
        Format::Gif => Some(ImageFormat::Gif),
        Format::Svg => None,
    }
}

fn decode(contents: &[u8], format: Format) -> Result<DynamicImage, BackendError> {
    let fmt = image_format(format)
        .ok_or_else(|| BackendError::Decode("SVG has no raster decoder".to_string()))?;
    ImageReader::with_format(Cursor::new(contents), fmt)
        .decode()
        .map_err(|e| BackendError::Decode(format!("failed to decode {format}: {e}")))
}

static SVG_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bwidth\s*=\s*"\s*([0-9]+(?:\.[0-9]+)?)\s*(?:px)?\s*""#).unwrap()
});
static SVG_HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bheight\s*=\s*"\s*([0-9]+(?:\.[0-9]+)?)\s*(?:px)?\s*""#).unwrap()
});
static SVG_VIEWBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bviewBox\s*=\s*"\s*[-0-9.]+[\s,]+[-0-9.]+[\s,]+([0-9.]+)[\s,]+([0-9.]+)\s*""#,
    )
    .unwrap()
});

/// Dimension probe for SVG sources.
///
/// Reads the root element's `width`/`height` attributes (unitless or `px`),
/// falling back to the `viewBox` extent. This is an attribute scan, not an
/// XML parser — enough for media-query matching, nothing more.
fn probe_svg(contents: &[u8]) -> Result<Metadata, BackendError> {
    // Dimensions live on the root <svg> element; 4 KiB is plenty.
    let head = &contents[..contents.len().min(4096)];
    let text = String::from_utf8_lossy(head);

    let attr = |re: &Regex| {
        re.captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(|v| v.round() as u32)
    };

    if let (Some(width), Some(height)) = (attr(&SVG_WIDTH), attr(&SVG_HEIGHT)) {
        return Ok(Metadata { width, height });
    }

    if let Some(caps) = SVG_VIEWBOX.captures(&text) {
        let parse = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(|v| v.round() as u32)
        };
        if let (Some(width), Some(height)) = (parse(1), parse(2)) {
            return Ok(Metadata { width, height });
        }
    }

    Err(BackendError::Decode(
        "could not determine SVG dimensions".to_string(),
    ))
}

fn png_compression(level: PngCompression) -> png::CompressionType {
    match level {
        PngCompression::Fast => png::CompressionType::Fast,
        PngCompression::Default => png::CompressionType::Default,
        PngCompression::Best => png::CompressionType::Best,
    }
}

/// Encode a decoded buffer into `params.format`.
fn encode(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let mut out = Cursor::new(Vec::new());
    let encode_err =
        |e: image::ImageError| BackendError::Encode(format!("{} encode failed: {e}", params.format));

    match params.format {
        Format::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let quality = params.options.jpg.quality.value() as u8;
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
                .map_err(encode_err)?;
        }
        Format::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut out,
                png_compression(params.options.png.compression),
                png::FilterType::Adaptive,
            );
            img.write_with_encoder(encoder).map_err(encode_err)?;
        }
        Format::Webp => {
            // Lossless is the only mode the pure-Rust encoder offers.
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))
                .map_err(encode_err)?;
        }
        Format::Gif => {
            img.write_to(&mut out, ImageFormat::Gif).map_err(encode_err)?;
        }
        Format::Svg => {
            return Err(BackendError::Encode(
                "SVG output requires an SVG source".to_string(),
            ));
        }
    }

    Ok(out.into_inner())
}

impl ImageBackend for RustBackend {
    fn probe(&self, contents: &[u8], format: Format) -> Result<Metadata, BackendError> {
        if format == Format::Svg {
            return probe_svg(contents);
        }
        let fmt = image_format(format)
            .ok_or_else(|| BackendError::Decode("no raster decoder".to_string()))?;
        let (width, height) = ImageReader::with_format(Cursor::new(contents), fmt)
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("failed to read dimensions: {e}")))?;
        Ok(Metadata { width, height })
    }

    fn resize_encode(
        &self,
        contents: &[u8],
        source_format: Format,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let img = decode(contents, source_format)?;

        let img = match params.target_width {
            Some(target) if target != img.width() => {
                let height = scaled_height((img.width(), img.height()), target);
                img.resize_exact(target, height, FilterType::Lanczos3)
            }
            _ => img,
        };

        encode(&img, params)
    }
}
