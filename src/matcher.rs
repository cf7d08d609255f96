//! Rule matchers: decide whether a rule applies to an asset.
//!
//! A matcher is one of three explicit variants — a media query evaluated
//! against decoded dimensions, a glob pattern evaluated against the logical
//! path, or an arbitrary predicate function. Configuration strings are
//! classified once at rule construction (media query grammar wins, anything
//! else is a glob); there is no runtime type sniffing.
//!
//! Matching is permissive where generation is strict: an asset whose format
//! is outside the supported set simply doesn't match, it never errors.

use crate::asset::{ImageAsset, Metadata};
use crate::imaging::{BackendError, ImageBackend};
use crate::mediaquery::MediaQuery;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Custom matcher logic: `(logical path, decoded size, asset) -> bool`.
pub type PredicateFn = dyn Fn(&Path, Metadata, &ImageAsset) -> bool + Send + Sync;

/// One gate on rule application.
#[derive(Clone)]
pub enum Matcher {
    /// Evaluated against the asset's decoded pixel dimensions.
    MediaQuery(MediaQuery),
    /// Evaluated against the asset's logical path.
    PathGlob(glob::Pattern),
    /// Arbitrary caller-supplied logic.
    Predicate(Arc<PredicateFn>),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::MediaQuery(q) => f.debug_tuple("MediaQuery").field(q).finish(),
            Matcher::PathGlob(p) => f.debug_tuple("PathGlob").field(&p.as_str()).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl Matcher {
    /// Classify a configuration string: media query grammar first, glob
    /// pattern otherwise.
    pub fn parse(input: &str) -> Result<Self, glob::PatternError> {
        if let Some(query) = MediaQuery::parse(input) {
            return Ok(Matcher::MediaQuery(query));
        }
        Ok(Matcher::PathGlob(glob::Pattern::new(input)?))
    }

    pub fn predicate(
        f: impl Fn(&Path, Metadata, &ImageAsset) -> bool + Send + Sync + 'static,
    ) -> Self {
        Matcher::Predicate(Arc::new(f))
    }

    /// Whether evaluating this matcher requires decoded dimensions.
    fn needs_dimensions(&self) -> bool {
        matches!(self, Matcher::MediaQuery(_) | Matcher::Predicate(_))
    }
}

/// Evaluate a matcher list against an asset: logical AND across entries.
///
/// - Unsupported source format → `Ok(false)`, never an error.
/// - Empty list → `Ok(true)`.
/// - Dimensions are decoded lazily (through the asset's memoized probe) and
///   only when a media-query or predicate matcher is present in the call.
pub fn match_image(
    backend: &impl ImageBackend,
    asset: &ImageAsset,
    matchers: &[Matcher],
) -> Result<bool, BackendError> {
    if asset.format().is_none() {
        return Ok(false);
    }

    let size = if matchers.iter().any(Matcher::needs_dimensions) {
        Some(asset.metadata(backend)?)
    } else {
        None
    };

    let path = asset.path();
    Ok(matchers.iter().all(|matcher| match matcher {
        Matcher::MediaQuery(query) => size
            .map(|s| query.matches(s.width, s.height))
            .unwrap_or(false),
        Matcher::PathGlob(pattern) => pattern.matches_path(&path),
        Matcher::Predicate(f) => size.map(|s| f(&path, s, asset)).unwrap_or(false),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;

    fn asset(path: &str) -> ImageAsset {
        ImageAsset::new(path, vec![0])
    }

    fn with_size(width: u32, height: u32) -> MockBackend {
        MockBackend::with_dimensions(vec![Metadata { width, height }])
    }

    #[test]
    fn classification_prefers_media_queries() {
        assert!(matches!(
            Matcher::parse("(min-width: 100px)").unwrap(),
            Matcher::MediaQuery(_)
        ));
        assert!(matches!(
            Matcher::parse("images/**/*.jpg").unwrap(),
            Matcher::PathGlob(_)
        ));
    }

    #[test]
    fn empty_matcher_list_trivially_matches() {
        let backend = MockBackend::new();
        assert!(match_image(&backend, &asset("a.jpg"), &[]).unwrap());
        // No probe happened.
        assert_eq!(backend.probe_count(), 0);
    }

    #[test]
    fn unsupported_format_never_matches_and_never_errors() {
        let backend = MockBackend::new();
        let matchers = vec![Matcher::parse("(min-width: 1px)").unwrap()];
        assert!(!match_image(&backend, &asset("notes.txt"), &matchers).unwrap());
        assert_eq!(backend.probe_count(), 0);
    }

    #[test]
    fn media_query_matches_decoded_size() {
        let matchers = vec![Matcher::parse("(min-width: 3000px)").unwrap()];

        let wide = with_size(3200, 2000);
        assert!(match_image(&wide, &asset("a.jpg"), &matchers).unwrap());

        let narrow = with_size(1024, 768);
        assert!(!match_image(&narrow, &asset("a.jpg"), &matchers).unwrap());
    }

    #[test]
    fn glob_matches_logical_path_without_decoding() {
        let backend = MockBackend::new();
        let matchers = vec![Matcher::parse("photos/**/*.jpg").unwrap()];
        assert!(match_image(&backend, &asset("photos/trip/a.jpg"), &matchers).unwrap());
        assert!(!match_image(&backend, &asset("icons/a.jpg"), &matchers).unwrap());
        // Pure path matchers must not trigger a decode.
        assert_eq!(backend.probe_count(), 0);
    }

    #[test]
    fn matcher_list_is_logical_and() {
        let matchers = vec![
            Matcher::parse("*.jpg").unwrap(),
            Matcher::parse("(min-width: 1000px)").unwrap(),
        ];

        let backend = with_size(1920, 1080);
        assert!(match_image(&backend, &asset("a.jpg"), &matchers).unwrap());

        // Path passes, dimensions fail.
        let backend = with_size(640, 480);
        assert!(!match_image(&backend, &asset("a.jpg"), &matchers).unwrap());

        // Dimensions pass, path fails.
        let backend = with_size(1920, 1080);
        assert!(!match_image(&backend, &asset("a.png"), &matchers).unwrap());
    }

    #[test]
    fn predicate_receives_path_size_and_asset() {
        let matchers = vec![Matcher::predicate(|path, size, asset| {
            path.ends_with("hero.jpg") && size.width > 100 && !asset.is_empty()
        })];

        let backend = with_size(200, 100);
        assert!(match_image(&backend, &asset("pages/hero.jpg"), &matchers).unwrap());

        let backend = with_size(50, 50);
        assert!(!match_image(&backend, &asset("pages/hero.jpg"), &matchers).unwrap());
    }

    #[test]
    fn decode_happens_at_most_once_per_asset() {
        let backend = with_size(800, 600);
        let matchers = vec![
            Matcher::parse("(min-width: 1px)").unwrap(),
            Matcher::parse("(max-width: 9000px)").unwrap(),
            Matcher::predicate(|_, _, _| true),
        ];
        let a = asset("a.png");
        assert!(match_image(&backend, &a, &matchers).unwrap());
        assert!(match_image(&backend, &a, &matchers).unwrap());
        assert_eq!(backend.probe_count(), 1);
    }

    #[test]
    fn decode_error_on_supported_format_propagates() {
        // Supported extension, but no mock dimensions queued: probe fails.
        let backend = MockBackend::new();
        let matchers = vec![Matcher::parse("(min-width: 1px)").unwrap()];
        assert!(match_image(&backend, &asset("a.jpg"), &matchers).is_err());
    }
}
