//! End-to-end pipeline tests with the real image backend.
//!
//! Small synthetic images keep encode times negligible while exercising the
//! full path: config → rules → match → generate → optimize → disk.

use image::{ImageFormat, RgbImage};
use srcset_gen::config::SrcsetConfig;
use srcset_gen::pipeline;
use srcset_gen::{RustBackend, SrcsetGenerator};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 4) as u8, (y * 4) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

const SVG: &str = "<!-- generator note -->\n<svg xmlns=\"http://www.w3.org/2000/svg\" \
                   width=\"10\" height=\"10\">\n  <rect width=\"10\" height=\"10\"/>\n</svg>";

fn build(source: &Path, output: &Path, config_toml: &str) -> pipeline::BuildSummary {
    let cfg: SrcsetConfig = toml::from_str(config_toml).unwrap();
    cfg.validate().unwrap();
    let generator = SrcsetGenerator::with_options(RustBackend::new(), cfg.to_generator_options());
    pipeline::run(
        &generator,
        &cfg.to_rules().unwrap(),
        source,
        output,
        None,
    )
    .unwrap()
}

fn decoded_width(path: &Path) -> u32 {
    image::load_from_memory(&fs::read(path).unwrap())
        .unwrap()
        .width()
}

#[test]
fn full_build_produces_derivatives_passthroughs_and_manifest() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("assets");
    let output = tmp.path().join("dist");
    fs::create_dir_all(source.join("pics")).unwrap();

    let original = jpeg_bytes(64, 48);
    fs::write(source.join("pics/photo.jpg"), &original).unwrap();
    fs::write(source.join("logo.svg"), SVG).unwrap();
    fs::write(source.join("notes.txt"), b"not an image").unwrap();

    let summary = build(
        &source,
        &output,
        r#"
        [[rules]]
        match = "**/*.jpg"
        format = ["jpg", "webp"]
        width = [1, 32]

        [[rules]]
        match = "*.svg"
        "#,
    );

    assert!(summary.failures.is_empty());
    assert_eq!(summary.files, 3);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.passthrough, 1);
    // 2 formats x 2 widths for the jpeg, one optimized svg, one passthrough.
    assert_eq!(summary.outputs, 6);

    // Identity derivative: same format at native size is a byte-for-byte copy.
    assert_eq!(fs::read(output.join("pics/photo.jpg")).unwrap(), original);

    assert_eq!(decoded_width(&output.join("pics/photo@32w.jpg")), 32);
    assert_eq!(decoded_width(&output.join("pics/photo.webp")), 64);
    assert_eq!(decoded_width(&output.join("pics/photo@32w.webp")), 32);

    // SVG is optimized, never resized: comment gone, geometry intact.
    let svg = fs::read_to_string(output.join("logo.svg")).unwrap();
    assert!(!svg.contains("generator note"));
    assert!(svg.contains("width=\"10\""));

    // Unmatched files copy through untouched.
    assert_eq!(
        fs::read(output.join("notes.txt")).unwrap(),
        b"not an image"
    );

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["files"].as_array().unwrap().len(), 3);
}

#[test]
fn media_query_rules_match_against_pixel_dimensions() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("assets");
    let output = tmp.path().join("dist");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("small.jpg"), jpeg_bytes(64, 48)).unwrap();

    // 64px wide: fails the min-width rule, passes the max-width rule.
    let summary = build(
        &source,
        &output,
        r#"
        [[rules]]
        match = "(min-width: 1000px)"
        width = 0.5

        [[rules]]
        match = "(max-width: 100px)"
        width = 32
        "#,
    );

    assert!(summary.failures.is_empty());
    assert_eq!(summary.matched, 1);
    assert_eq!(decoded_width(&output.join("small@32w.jpg")), 32);
    // The consumed original does not reappear in the output.
    assert!(!output.join("small.jpg").exists());
}

#[test]
fn upscaling_honors_the_scaling_up_switch() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("assets");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("tiny.jpg"), jpeg_bytes(16, 16)).unwrap();

    let rule = r#"
        [[rules]]
        match = "*.jpg"
        width = 32
        "#;

    let up = tmp.path().join("up");
    build(&source, &up, rule);
    assert_eq!(decoded_width(&up.join("tiny@32w.jpg")), 32);

    let capped = tmp.path().join("capped");
    build(
        &source,
        &capped,
        &format!("[options]\nscaling_up = false\n{rule}"),
    );
    assert!(!capped.join("tiny@32w.jpg").exists());
}
