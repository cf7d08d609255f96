//! Variant generation: expand one source asset into its derivative set.
//!
//! For a matched rule the generator walks the cross product of requested
//! formats × width specs, resolving each width against the source's native
//! width, and produces one derivative per admitted combination: resized
//! (when needed), re-encoded (when needed), and optimized (unless skipped).
//! Passthrough formats (SVG, GIF) bypass width iteration and get exactly one
//! optimized copy.
//!
//! Combinations are independent and run in parallel; each works on its own
//! clone of the source. Derivatives are handed to the optional `emit`
//! callback the moment they complete — completion order is unspecified — and
//! are also returned as a batch. The first failing combination fails the
//! whole call; derivatives already emitted are not retracted.

use crate::asset::ImageAsset;
use crate::format::Format;
use crate::imaging::{
    BackendError, EncodeParams, ImageBackend, ProcessingOptions, default_postfix,
};
use crate::matcher::{Matcher, match_image};
use crate::optimize::OptimizerSet;
use crate::rules::{PostfixFn, PostfixOverride, Rule, WidthSpec};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    /// The asset has no realized content.
    #[error("invalid source: asset has no content")]
    InvalidSource,
    /// Source or requested output format outside the supported set.
    #[error("\"{0}\" is not a supported image format")]
    UnsupportedFormat(String),
    /// A width entry is not a finite positive number.
    #[error("invalid width parameter: {0}")]
    InvalidWidthSpec(f64),
    /// Collaborator failure (decode, resize, encode, optimize), surfaced as-is.
    #[error(transparent)]
    Imaging(#[from] BackendError),
}

/// Incremental emission callback: receives each derivative on completion.
pub type EmitFn<'a> = dyn Fn(ImageAsset) + Sync + 'a;

/// Construction-time defaults, overridable per rule.
#[derive(Clone)]
pub struct GeneratorOptions {
    /// Default per-format encode options.
    pub processing: ProcessingOptions,
    /// Default per-format optimizer handles.
    pub optimization: OptimizerSet,
    /// Default postfix naming function.
    pub postfix: Arc<PostfixFn>,
    /// Skip the optimization pass for every rule that doesn't override it.
    pub skip_optimization: bool,
    /// Permit target widths above the source's native width.
    pub scaling_up: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            processing: ProcessingOptions::default(),
            optimization: OptimizerSet::default(),
            postfix: Arc::new(default_postfix),
            skip_optimization: false,
            scaling_up: true,
        }
    }
}

impl fmt::Debug for GeneratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("processing", &self.processing)
            .field("skip_optimization", &self.skip_optimization)
            .field("scaling_up", &self.scaling_up)
            .finish_non_exhaustive()
    }
}

/// The variant generator: a backend plus construction-time defaults.
///
/// Stateless across invocations — configuration is read-only after
/// construction and safely shared by every concurrent combination.
#[derive(Debug)]
pub struct SrcsetGenerator<B> {
    backend: B,
    options: GeneratorOptions,
}

/// One admitted format × width combination.
struct Combination {
    format: Format,
    spec: WidthSpec,
    resolved_width: u32,
}

impl<B: ImageBackend> SrcsetGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, GeneratorOptions::default())
    }

    pub fn with_options(backend: B, options: GeneratorOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Evaluate a matcher list against an asset. See [`match_image`].
    pub fn match_image(
        &self,
        asset: &ImageAsset,
        matchers: &[Matcher],
    ) -> Result<bool, BackendError> {
        match_image(&self.backend, asset, matchers)
    }

    /// Produce all derivatives for `source` under `rule`.
    ///
    /// Preconditions (checked synchronously, before any pixel work): the
    /// asset has content, its format is supported, every width spec is a
    /// finite positive number. For passthrough sources every requested
    /// output format must equal the source format.
    pub fn generate(
        &self,
        source: &ImageAsset,
        rule: &Rule,
        emit: Option<&EmitFn>,
    ) -> Result<Vec<ImageAsset>, GenerateError> {
        if source.is_empty() {
            return Err(GenerateError::InvalidSource);
        }
        let source_format = source
            .format()
            .ok_or_else(|| GenerateError::UnsupportedFormat(source.extension().to_string()))?;

        let formats: Vec<Format> = if rule.formats.is_empty() {
            vec![source_format]
        } else {
            rule.formats.clone()
        };
        let widths: Vec<WidthSpec> = if rule.widths.is_empty() {
            vec![WidthSpec::IDENTITY]
        } else {
            rule.widths.clone()
        };
        if let Some(invalid) = widths.iter().find(|w| !w.is_valid()) {
            return Err(GenerateError::InvalidWidthSpec(invalid.value()));
        }

        // Per-rule overrides merged over construction-time defaults.
        let overrides = &rule.overrides;
        let skip_optimization = overrides
            .skip_optimization
            .unwrap_or(self.options.skip_optimization);
        let scaling_up = overrides.scaling_up.unwrap_or(self.options.scaling_up);
        let processing = match &overrides.processing {
            Some(o) => self.options.processing.merged(o),
            None => self.options.processing.clone(),
        };
        let optimizers = match &overrides.optimization {
            Some(o) => self.options.optimization.merged(o),
            None => self.options.optimization.clone(),
        };

        if source_format.is_passthrough() {
            return self.generate_passthrough(
                source,
                source_format,
                &formats,
                skip_optimization,
                &optimizers,
                emit,
            );
        }

        let native = source.metadata(&self.backend)?;

        let combinations: Vec<Combination> = formats
            .iter()
            .flat_map(|&format| {
                widths.iter().map(move |&spec| Combination {
                    format,
                    spec,
                    resolved_width: spec.resolve(native.width),
                })
            })
            .filter(|combo| scaling_up || combo.resolved_width <= native.width)
            .collect();

        combinations
            .par_iter()
            .map(|combo| {
                let postfix = self.postfix_for(rule, combo);

                let derivative = if combo.spec.is_identity() && combo.format == source_format {
                    // Pure byte-copy: no re-encode, no optimize pass, so the
                    // round trip is exact byte identity.
                    source.with_variant(combo.format, &postfix, source.contents_arc())
                } else {
                    let target_width =
                        (combo.resolved_width != native.width).then_some(combo.resolved_width);
                    let encoded = self.backend.resize_encode(
                        source.contents(),
                        source_format,
                        &EncodeParams {
                            format: combo.format,
                            target_width,
                            options: processing.clone(),
                        },
                    )?;
                    let bytes = if skip_optimization {
                        encoded
                    } else {
                        optimizers
                            .for_format(combo.format)
                            .optimize(&encoded, combo.format)?
                    };
                    source.with_variant(combo.format, &postfix, Arc::new(bytes))
                };

                if let Some(emit) = emit {
                    emit(derivative.clone());
                }
                Ok(derivative)
            })
            .collect()
    }

    /// SVG and GIF sources: no resize semantics, one optimized (or verbatim)
    /// copy per requested format. Vector types only accept their own format.
    fn generate_passthrough(
        &self,
        source: &ImageAsset,
        source_format: Format,
        formats: &[Format],
        skip_optimization: bool,
        optimizers: &OptimizerSet,
        emit: Option<&EmitFn>,
    ) -> Result<Vec<ImageAsset>, GenerateError> {
        if let Some(other) = formats.iter().find(|&&f| f != source_format) {
            return Err(GenerateError::UnsupportedFormat(other.to_string()));
        }

        formats
            .par_iter()
            .map(|_| {
                let derivative = if skip_optimization {
                    source.with_variant(source_format, "", source.contents_arc())
                } else {
                    let optimized = optimizers
                        .for_format(source_format)
                        .optimize(source.contents(), source_format)?;
                    source.with_variant(source_format, "", Arc::new(optimized))
                };
                if let Some(emit) = emit {
                    emit(derivative.clone());
                }
                Ok(derivative)
            })
            .collect()
    }

    /// Postfix priority: per-rule literal, else per-rule function, else the
    /// generator default.
    fn postfix_for(&self, rule: &Rule, combo: &Combination) -> String {
        match &rule.overrides.postfix {
            Some(PostfixOverride::Literal(s)) => s.clone(),
            Some(PostfixOverride::Func(f)) => f(combo.resolved_width, combo.spec.value()),
            None => (self.options.postfix)(combo.resolved_width, combo.spec.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Metadata;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use std::sync::Mutex;

    /// Mock-backed generator with passthrough optimizers, so the mock's
    /// marker bytes survive the optimize pass.
    fn generator(width: u32, height: u32) -> SrcsetGenerator<MockBackend> {
        SrcsetGenerator::with_options(
            MockBackend::with_dimensions(vec![Metadata { width, height }]),
            GeneratorOptions {
                optimization: OptimizerSet::noop(),
                ..Default::default()
            },
        )
    }

    fn names(mut assets: Vec<ImageAsset>) -> Vec<String> {
        let mut names: Vec<String> = assets.drain(..).map(|a| a.file_name()).collect();
        names.sort();
        names
    }

    #[test]
    fn empty_rule_yields_one_identity_copy() {
        let generator = generator(3200, 2000);
        let source = ImageAsset::new("photo.jpg", vec![1, 2, 3]);

        let produced = generator.generate(&source, &Rule::new(), None).unwrap();

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].file_name(), "photo.jpg");
        assert_eq!(produced[0].contents(), source.contents());
        // Byte-copy path: no encode happened.
        assert_eq!(generator.backend().encode_count(), 0);
    }

    #[test]
    fn cross_product_of_formats_and_widths() {
        let generator = generator(3200, 2000);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new()
            .formats([Format::Jpeg, Format::Webp])
            .widths([1.0, 1920.0, 1280.0, 720.0, 560.0, 320.0]);

        let produced = generator.generate(&source, &rule, None).unwrap();

        assert_eq!(produced.len(), 12);
        assert_eq!(
            names(produced),
            vec![
                "photo.jpg",
                "photo.webp",
                "photo@1280w.jpg",
                "photo@1280w.webp",
                "photo@1920w.jpg",
                "photo@1920w.webp",
                "photo@320w.jpg",
                "photo@320w.webp",
                "photo@560w.jpg",
                "photo@560w.webp",
                "photo@720w.jpg",
                "photo@720w.webp",
            ]
        );
        // 12 combinations, one identity byte-copy among them.
        assert_eq!(generator.backend().encode_count(), 11);
    }

    #[test]
    fn ratio_spec_resolves_against_native_width() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.png", vec![0]);
        let rule = Rule::new().widths([0.5]);

        let produced = generator.generate(&source, &rule, None).unwrap();

        assert_eq!(produced[0].file_name(), "photo@500w.png");
        assert!(generator.backend().get_operations().contains(
            &RecordedOp::Encode {
                source_format: Format::Png,
                format: Format::Png,
                target_width: Some(500),
                jpg_quality: 100,
            }
        ));
    }

    #[test]
    fn scaling_up_disabled_skips_above_native_combinations() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new().widths([1.0, 2000.0]).scaling_up(false);

        let emitted = Mutex::new(Vec::new());
        let produced = generator
            .generate(&source, &rule, Some(&|a| emitted.lock().unwrap().push(a)))
            .unwrap();

        // The 2000px combination is absent from both the returned batch and
        // the emitted stream.
        assert_eq!(names(produced), vec!["photo.jpg"]);
        assert_eq!(names(emitted.into_inner().unwrap()), vec!["photo.jpg"]);
    }

    #[test]
    fn scaling_up_enabled_genuinely_upscales() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new().widths([2000.0]);

        let produced = generator.generate(&source, &rule, None).unwrap();

        // Output name and resize target agree: the buffer is upscaled.
        assert_eq!(produced[0].file_name(), "photo@2000w.jpg");
        assert!(matches!(
            generator.backend().get_operations().last(),
            Some(RecordedOp::Encode {
                target_width: Some(2000),
                ..
            })
        ));
    }

    #[test]
    fn format_conversion_at_native_width_reencodes_without_resize() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new().formats([Format::Webp]);

        let produced = generator.generate(&source, &rule, None).unwrap();

        assert_eq!(produced[0].file_name(), "photo.webp");
        assert!(generator.backend().get_operations().contains(
            &RecordedOp::Encode {
                source_format: Format::Jpeg,
                format: Format::Webp,
                target_width: None,
                jpg_quality: 100,
            }
        ));
    }

    #[test]
    fn postfix_literal_override_wins() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new().widths([500.0]).postfix_literal("-small");

        let produced = generator.generate(&source, &rule, None).unwrap();
        assert_eq!(produced[0].file_name(), "photo-small.jpg");
    }

    #[test]
    fn postfix_function_override_receives_resolved_width_and_spec() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let mut rule = Rule::new().widths([0.5]);
        rule.overrides.postfix = Some(PostfixOverride::Func(Arc::new(|resolved, spec| {
            format!("_{resolved}px_x{spec}")
        })));

        let produced = generator.generate(&source, &rule, None).unwrap();
        assert_eq!(produced[0].file_name(), "photo_500px_x0.5.jpg");
    }

    #[test]
    fn invalid_width_spec_fails_before_any_work() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new().widths([320.0, f64::NAN]);

        let result = generator.generate(&source, &rule, None);
        assert!(matches!(result, Err(GenerateError::InvalidWidthSpec(_))));
        assert_eq!(generator.backend().encode_count(), 0);
    }

    #[test]
    fn empty_contents_is_invalid_source() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("photo.jpg", vec![]);
        assert!(matches!(
            generator.generate(&source, &Rule::new(), None),
            Err(GenerateError::InvalidSource)
        ));
    }

    #[test]
    fn unsupported_source_format_errors_loudly() {
        let generator = generator(1000, 800);
        let source = ImageAsset::new("notes.txt", vec![0]);
        assert!(matches!(
            generator.generate(&source, &Rule::new(), None),
            Err(GenerateError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn svg_source_is_optimized_not_resized() {
        let generator = SrcsetGenerator::new(MockBackend::new());
        let svg = b"<svg>\n  <!-- c -->\n  <rect/>\n</svg>".to_vec();
        let source = ImageAsset::new("logo.svg", svg);
        let rule = Rule::new().widths([1.0, 320.0]);

        let produced = generator.generate(&source, &rule, None).unwrap();

        // Width list ignored for passthrough formats: exactly one copy.
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].file_name(), "logo.svg");
        assert_eq!(produced[0].contents(), b"<svg><rect/></svg>");
        // No decode either.
        assert_eq!(generator.backend().probe_count(), 0);
    }

    #[test]
    fn svg_skip_optimization_copies_verbatim() {
        let generator = SrcsetGenerator::new(MockBackend::new());
        let svg = b"<svg>  <rect/>  </svg>".to_vec();
        let source = ImageAsset::new("logo.svg", svg.clone());
        let rule = Rule::new().skip_optimization(true);

        let produced = generator.generate(&source, &rule, None).unwrap();
        assert_eq!(produced[0].contents(), &svg[..]);
    }

    #[test]
    fn gif_source_rejects_other_output_formats() {
        let generator = SrcsetGenerator::new(MockBackend::new());
        let source = ImageAsset::new("anim.gif", vec![0]);
        let rule = Rule::new().formats([Format::Jpeg]);

        assert!(matches!(
            generator.generate(&source, &rule, None),
            Err(GenerateError::UnsupportedFormat(f)) if f == "jpg"
        ));
    }

    #[test]
    fn emit_receives_every_derivative() {
        let generator = generator(3200, 2000);
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new()
            .formats([Format::Jpeg, Format::Webp])
            .widths([320.0, 720.0]);

        let emitted = Mutex::new(Vec::new());
        let produced = generator
            .generate(&source, &rule, Some(&|a| emitted.lock().unwrap().push(a)))
            .unwrap();

        assert_eq!(produced.len(), 4);
        assert_eq!(names(emitted.into_inner().unwrap()), names(produced));
    }

    #[test]
    fn skip_optimization_bypasses_the_optimizer_pass() {
        // Default (real) optimizers here: had the pass run, it would have
        // choked on the mock encoder's marker bytes.
        let generator = SrcsetGenerator::new(MockBackend::with_dimensions(vec![Metadata {
            width: 1000,
            height: 800,
        }]));
        let source = ImageAsset::new("photo.jpg", vec![0]);
        let rule = Rule::new().widths([500.0]).skip_optimization(true);

        let produced = generator.generate(&source, &rule, None).unwrap();
        assert_eq!(produced[0].contents(), b"enc:jpg:Some(500)");
    }
}
