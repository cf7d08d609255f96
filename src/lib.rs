//! # srcset-gen
//!
//! A responsive-image derivative generator for build pipelines. Images are
//! matched against configurable rules; each matching rule fans out into a
//! (formats × widths) cross product of resized, re-encoded, and optimized
//! derivatives, named for `<img srcset>` and `<picture>` markup.
//!
//! # Architecture: Match → Generate → Optimize
//!
//! Every file flows through the same three-step dispatch:
//!
//! ```text
//! 1. Match     matchers (globs, media queries, predicates) decide applicability
//! 2. Generate  formats × widths → resized, re-encoded variants
//! 3. Optimize  per-format post-pass shrinks the encoded bytes
//! ```
//!
//! A file no rule matches passes through unchanged; a matched file is
//! consumed and only its derivatives continue downstream. Derivative names
//! follow `stem@{width}w.ext`, with the native-size derivative keeping the
//! plain stem so `photo.jpg` stays addressable.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Per-file rule dispatch, the parallel build loop, manifest writing |
//! | [`generate`] | The variant generator — formats × widths fan-out, postfix naming, emit streaming |
//! | [`matcher`] | Rule applicability: path globs, media queries, custom predicates |
//! | [`mediaquery`] | CSS media query parsing and evaluation against pixel dimensions |
//! | [`rules`] | Rule and width-spec types plus per-rule option overrides |
//! | [`imaging`] | Pixel work behind the [`ImageBackend`] trait: probe, resize, encode |
//! | [`optimize`] | Post-encode optimizer pass, swappable per format and per rule |
//! | [`asset`] | In-memory image asset with lazily probed, memoized dimensions |
//! | [`format`] | Supported output formats and extension mapping |
//! | [`config`] | `srcset.toml` loading and validation |
//! | [`output`] | CLI output formatting for build progress and summaries |
//!
//! # Design Decisions
//!
//! ## Lazy Dimension Probing
//!
//! Glob matchers never decode pixels. An asset's dimensions are probed only
//! when a media query or predicate matcher actually needs them, and the
//! result is memoized on the asset, so a file matched by three
//! dimension-aware rules decodes its header exactly once.
//!
//! ## Backend Trait Over Direct Codec Calls
//!
//! All pixel work goes through [`ImageBackend`], a buffers-in/buffers-out
//! trait with no filesystem access. The production [`RustBackend`] uses the
//! pure-Rust `image` crate (Lanczos3 resampling); tests substitute a
//! recording mock, so matching and generation logic is exercised without
//! encoding a single real pixel.
//!
//! ## Passthrough Formats
//!
//! SVG and GIF are never resized or converted — resampling would destroy
//! vector scalability and flatten animations. Matching rules still apply:
//! each one yields an optimized (or verbatim) copy in the source format.
//!
//! ## Atomic Per-File Output
//!
//! The build loop buffers a file's entire derivative set and writes it only
//! after every variant succeeded. A failure leaves nothing half-written for
//! that file and does not abort its siblings.
//!
//! [`ImageBackend`]: imaging::ImageBackend
//! [`RustBackend`]: imaging::RustBackend

pub mod asset;
pub mod config;
pub mod format;
pub mod generate;
pub mod imaging;
pub mod matcher;
pub mod mediaquery;
pub mod optimize;
pub mod output;
pub mod pipeline;
pub mod rules;

pub use asset::{ImageAsset, Metadata};
pub use format::Format;
pub use generate::{GenerateError, GeneratorOptions, SrcsetGenerator};
pub use imaging::{ImageBackend, RustBackend};
pub use matcher::Matcher;
pub use rules::{Rule, WidthSpec};
