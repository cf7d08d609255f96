//! Build configuration module.
//!
//! Handles loading and validating `srcset.toml`. The file is sparse:
//! stock defaults apply to everything the user leaves out, and unknown
//! keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [options]
//! skip_optimization = false  # Skip the post-encode optimizer pass
//! scaling_up = true          # Allow widths larger than the source
//! # max_workers = 4          # Max parallel workers (omit for auto = CPU cores)
//!
//! [options.processing.jpg]
//! quality = 100              # JPEG encode quality (1-100)
//!
//! [options.processing.webp]
//! quality = 100              # WebP encode quality (1-100)
//!
//! [options.processing.png]
//! compression = "default"    # "fast" | "default" | "best"
//!
//! # Any number of [[rules]] tables. `match`, `format`, and `width` each
//! # accept a single value or a list.
//! [[rules]]
//! match = "photos/**/*.jpg"  # Path glob or CSS media query
//! format = ["jpg", "webp"]
//! width = [1, 0.5, 480]      # <=1.0 is a ratio of the source width
//! postfix = "@2x"            # Override the default "@{width}w" postfix
//! skip_optimization = false  # Per-rule override
//! scaling_up = true          # Per-rule override
//!
//! [rules.processing.jpg]     # Per-rule encode overrides (sparse)
//! quality = 90
//!
//! [rules.optimization.jpg]   # Per-rule optimizer overrides
//! quality = 70
//! ```
//!
//! A rule with an empty `match` list matches every supported image. A
//! `match` string that parses as a media query (e.g. `(max-width: 1024px)`)
//! is evaluated against the image's pixel dimensions; anything else is
//! treated as a path glob.

use crate::format::Format;
use crate::generate::GeneratorOptions;
use crate::imaging::{PngCompression, ProcessingOptions, ProcessingOverride, Quality};
use crate::matcher::Matcher;
use crate::optimize::{JpegOptimizer, OptimizerOverride};
use crate::rules::{PostfixOverride, Rule, RuleOverrides, WidthSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid match pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// A scalar or a list, interchangeably. `match = "*.jpg"` and
/// `match = ["*.jpg"]` parse to the same thing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value.clone()],
            Self::Many(values) => values.clone(),
        }
    }
}

/// Build configuration loaded from `srcset.toml`.
///
/// All fields have defaults. User config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SrcsetConfig {
    /// Global generation options.
    pub options: OptionsConfig,
    /// Rule list; every rule is evaluated against every file.
    pub rules: Vec<RuleConfig>,
}

/// Global options: optimizer pass, upscaling, worker count, encode quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    /// Skip the post-encode optimizer pass entirely.
    pub skip_optimization: bool,
    /// Generate widths larger than the source (upscaling).
    pub scaling_up: bool,
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
    /// Per-format encode settings.
    pub processing: ProcessingConfig,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            skip_optimization: false,
            scaling_up: true,
            max_workers: None,
            processing: ProcessingConfig::default(),
        }
    }
}

/// Per-format encode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub jpg: QualityConfig,
    pub webp: QualityConfig,
    pub png: PngConfig,
}

/// Encode quality for a lossy format (1-100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub quality: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { quality: 100 }
    }
}

/// PNG encode settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PngConfig {
    pub compression: PngCompressionConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompressionConfig {
    Fast,
    #[default]
    Default,
    Best,
}

impl From<PngCompressionConfig> for PngCompression {
    fn from(value: PngCompressionConfig) -> Self {
        match value {
            PngCompressionConfig::Fast => PngCompression::Fast,
            PngCompressionConfig::Default => PngCompression::Default,
            PngCompressionConfig::Best => PngCompression::Best,
        }
    }
}

/// One `[[rules]]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    /// Matchers, ANDed together. Empty matches everything supported.
    #[serde(rename = "match")]
    pub matchers: OneOrMany<String>,
    /// Output formats. Empty keeps the source format.
    pub format: OneOrMany<String>,
    /// Width specs. Empty generates one copy at native size.
    pub width: OneOrMany<f64>,
    /// Literal postfix replacing the default `@{width}w`.
    pub postfix: Option<String>,
    /// Per-rule optimizer-pass override.
    pub skip_optimization: Option<bool>,
    /// Per-rule upscaling override.
    pub scaling_up: Option<bool>,
    /// Sparse per-rule encode overrides.
    pub processing: Option<ProcessingOverrideConfig>,
    /// Per-rule optimizer overrides.
    pub optimization: Option<OptimizationOverrideConfig>,
}

/// Sparse encode override: present formats replace the global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingOverrideConfig {
    pub jpg: Option<QualityConfig>,
    pub webp: Option<QualityConfig>,
    pub png: Option<PngConfig>,
}

/// Optimizer overrides expressible in TOML. Custom [`Optimizer`]
/// implementations are an API-level concern; the config file exposes the
/// built-in JPEG optimizer's quality knob.
///
/// [`Optimizer`]: crate::optimize::Optimizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizationOverrideConfig {
    pub jpg: Option<QualityConfig>,
}

fn validate_quality(value: u32, key: &str) -> Result<(), ConfigError> {
    if value == 0 || value > 100 {
        return Err(ConfigError::Validation(format!(
            "{key}.quality must be 1-100"
        )));
    }
    Ok(())
}

impl SrcsetConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_quality(self.options.processing.jpg.quality, "options.processing.jpg")?;
        validate_quality(
            self.options.processing.webp.quality,
            "options.processing.webp",
        )?;

        for (index, rule) in self.rules.iter().enumerate() {
            for name in rule.format.to_vec() {
                if Format::from_extension(&name).is_none() {
                    return Err(ConfigError::Validation(format!(
                        "rules[{index}].format: unsupported format \"{name}\""
                    )));
                }
            }
            for width in rule.width.to_vec() {
                if !WidthSpec(width).is_valid() {
                    return Err(ConfigError::Validation(format!(
                        "rules[{index}].width: {width} is not a finite positive number"
                    )));
                }
            }
            if let Some(processing) = &rule.processing {
                if let Some(jpg) = processing.jpg {
                    validate_quality(jpg.quality, &format!("rules[{index}].processing.jpg"))?;
                }
                if let Some(webp) = processing.webp {
                    validate_quality(webp.quality, &format!("rules[{index}].processing.webp"))?;
                }
            }
            if let Some(optimization) = &rule.optimization {
                if let Some(jpg) = optimization.jpg {
                    validate_quality(jpg.quality, &format!("rules[{index}].optimization.jpg"))?;
                }
            }
        }
        Ok(())
    }

    /// Build the runtime rule list from the config.
    pub fn to_rules(&self) -> Result<Vec<Rule>, ConfigError> {
        self.rules.iter().map(RuleConfig::to_rule).collect()
    }

    /// Build the generator's global options from the config.
    pub fn to_generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            processing: self.options.processing.to_options(),
            skip_optimization: self.options.skip_optimization,
            scaling_up: self.options.scaling_up,
            ..Default::default()
        }
    }
}

impl ProcessingConfig {
    fn to_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            jpg: crate::imaging::JpegOptions {
                quality: Quality::new(self.jpg.quality),
            },
            webp: crate::imaging::WebpOptions {
                quality: Quality::new(self.webp.quality),
            },
            png: crate::imaging::PngOptions {
                compression: self.png.compression.into(),
            },
        }
    }
}

impl RuleConfig {
    fn to_rule(&self) -> Result<Rule, ConfigError> {
        let matchers = self
            .matchers
            .to_vec()
            .iter()
            .map(|input| Matcher::parse(input))
            .collect::<Result<Vec<_>, _>>()?;

        // validate() vetted format names already; re-check to stay safe when
        // called without it.
        let formats = self
            .format
            .to_vec()
            .iter()
            .map(|name| {
                Format::from_extension(name).ok_or_else(|| {
                    ConfigError::Validation(format!("unsupported format \"{name}\""))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let processing = self.processing.as_ref().map(|p| ProcessingOverride {
            jpg_quality: p.jpg.map(|q| Quality::new(q.quality)),
            webp_quality: p.webp.map(|q| Quality::new(q.quality)),
            png_compression: p.png.map(|png| png.compression.into()),
        });

        let optimization = self.optimization.as_ref().map(|o| OptimizerOverride {
            jpg: o.jpg.map(|q| {
                Arc::new(JpegOptimizer {
                    quality: Quality::new(q.quality),
                }) as Arc<dyn crate::optimize::Optimizer>
            }),
            ..Default::default()
        });

        Ok(Rule {
            matchers,
            formats,
            widths: self.width.to_vec().into_iter().map(WidthSpec).collect(),
            overrides: RuleOverrides {
                postfix: self.postfix.clone().map(PostfixOverride::Literal),
                processing,
                optimization,
                skip_optimization: self.skip_optimization,
                scaling_up: self.scaling_up,
            },
        })
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(options: &OptionsConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    options.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load config from a `srcset.toml` file.
///
/// Returns stock defaults when the file does not exist. Rejects unknown
/// keys and validates the result.
pub fn load_config(path: &Path) -> Result<SrcsetConfig, ConfigError> {
    if !path.exists() {
        return Ok(SrcsetConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: SrcsetConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `srcset.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# srcset-gen Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

[options]
# Skip the post-encode optimizer pass entirely.
skip_optimization = false

# Generate widths larger than the source image (upscaling).
scaling_up = true

# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4

# ---------------------------------------------------------------------------
# Encode settings per output format
# ---------------------------------------------------------------------------
[options.processing.jpg]
# JPEG encode quality (1-100). Size reduction normally happens in the
# optimizer pass, so encoding defaults to full quality.
quality = 100

[options.processing.webp]
quality = 100

[options.processing.png]
# PNG compression effort: "fast" | "default" | "best".
compression = "default"

# ---------------------------------------------------------------------------
# Rules
# ---------------------------------------------------------------------------
# Any number of [[rules]] tables. Every rule is evaluated against every
# file; each match contributes derivatives, and files no rule matches pass
# through unchanged. `match`, `format`, and `width` accept a single value
# or a list.

# [[rules]]
# # Path glob or CSS media query. A media query like "(max-width: 1024px)"
# # is tested against the image's pixel dimensions. Multiple entries must
# # all hold.
# match = "photos/**/*.jpg"
#
# # Output formats: "jpg", "png", "webp", "gif", "svg".
# # Empty keeps the source format.
# format = ["jpg", "webp"]
#
# # Widths: values <= 1.0 are ratios of the source width, larger values
# # are absolute pixels. 1 reproduces the source at native size.
# width = [1, 0.5, 480]
#
# # Literal postfix appended to the file stem, replacing "@{width}w".
# # The native-size derivative always gets an empty postfix.
# postfix = "@2x"
#
# # Per-rule overrides of the global options.
# skip_optimization = false
# scaling_up = true
#
# [rules.processing.jpg]
# quality = 90
#
# # Built-in JPEG optimizer quality for this rule's outputs.
# [rules.optimization.jpg]
# quality = 70
"##
}
