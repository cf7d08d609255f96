//! Rule values: what to generate for a matched asset.
//!
//! A [`Rule`] pairs a matcher list with target formats, width specs, and
//! sparse per-rule overrides of the generator's defaults. Rules are immutable
//! once the pipeline is constructed; the same rule set is applied to every
//! file.

use crate::format::Format;
use crate::imaging::{ProcessingOverride, is_identity_spec, resolve_width};
use crate::matcher::Matcher;
use crate::optimize::OptimizerOverride;
use std::fmt;
use std::sync::Arc;

/// A target-width spec: a ratio of the native width when `<= 1`, an absolute
/// pixel width when `> 1`. Exactly `1` is the identity case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthSpec(pub f64);

impl WidthSpec {
    /// The identity spec: no resize, no rename postfix.
    pub const IDENTITY: WidthSpec = WidthSpec(1.0);

    /// Width specs must be finite and positive.
    pub fn is_valid(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    pub fn is_identity(self) -> bool {
        is_identity_spec(self.0)
    }

    /// Absolute pixel width against a source's native width.
    pub fn resolve(self, native_width: u32) -> u32 {
        resolve_width(self.0, native_width)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for WidthSpec {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Postfix naming function: `(resolved width, width spec) -> postfix`.
pub type PostfixFn = dyn Fn(u32, f64) -> String + Send + Sync;

/// Per-rule postfix override. A literal wins over a function; both win over
/// the generator's default.
#[derive(Clone)]
pub enum PostfixOverride {
    Literal(String),
    Func(Arc<PostfixFn>),
}

impl fmt::Debug for PostfixOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixOverride::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            PostfixOverride::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Sparse per-rule overrides of the generator defaults, each merged
/// field-by-field at generation time.
#[derive(Debug, Clone, Default)]
pub struct RuleOverrides {
    pub postfix: Option<PostfixOverride>,
    pub processing: Option<ProcessingOverride>,
    pub optimization: Option<OptimizerOverride>,
    pub skip_optimization: Option<bool>,
    pub scaling_up: Option<bool>,
}

/// One configured generation rule.
///
/// Empty `formats` defaults to the source's own format; empty `widths`
/// defaults to `[1]` (no resize).
#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub matchers: Vec<Matcher>,
    pub formats: Vec<Format>,
    pub widths: Vec<WidthSpec>,
    pub overrides: RuleOverrides,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn formats(mut self, formats: impl IntoIterator<Item = Format>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    pub fn widths(mut self, widths: impl IntoIterator<Item = f64>) -> Self {
        self.widths = widths.into_iter().map(WidthSpec).collect();
        self
    }

    pub fn postfix_literal(mut self, postfix: impl Into<String>) -> Self {
        self.overrides.postfix = Some(PostfixOverride::Literal(postfix.into()));
        self
    }

    pub fn skip_optimization(mut self, skip: bool) -> Self {
        self.overrides.skip_optimization = Some(skip);
        self
    }

    pub fn scaling_up(mut self, allow: bool) -> Self {
        self.overrides.scaling_up = Some(allow);
        self
    }
}
