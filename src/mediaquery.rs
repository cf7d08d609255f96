//! Fixed-grammar media query recognition and evaluation.
//!
//! This is not a CSS parser. The accepted grammar is exactly the shape rule
//! matchers use to gate on source dimensions: one or more parenthesized
//! `(min-|max-)?(width|height): N<unit>` clauses joined by `and` (all must
//! hold) or `,` (alternative queries, any may hold).
//!
//! ```text
//! (min-width: 3000px)
//! (min-width: 1000px) and (max-height: 800px)
//! (max-width: 320px), (min-width: 1920px)
//! ```
//!
//! Units: bare numbers and `px` are pixels; `em`/`rem` multiply by 16.
//! Anything not matching the grammar is *not* an error here — rule
//! configuration treats such strings as glob path patterns instead.

use regex::Regex;
use std::sync::LazyLock;

const CLAUSE: &str = r"\(\s*(?:(?:max|min)-)?(?:width|height)\s*:\s*\d+\w*\s*\)";

static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*(?:{CLAUSE}\s*(?:,|and)\s*)*{CLAUSE}\s*$")).unwrap()
});

static FEATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(?:(max|min)-)?(width|height)\s*:\s*(\d+)(\w*)\s*\)").unwrap()
});

/// Whether a string matches the media query grammar.
pub fn is_media_query(input: &str) -> bool {
    GRAMMAR.is_match(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Width,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Feature {
    dimension: Dimension,
    bound: Bound,
    pixels: f64,
}

impl Feature {
    fn holds(&self, width: u32, height: u32) -> bool {
        let actual = match self.dimension {
            Dimension::Width => width as f64,
            Dimension::Height => height as f64,
        };
        match self.bound {
            Bound::Min => actual >= self.pixels,
            Bound::Max => actual <= self.pixels,
            Bound::Exact => actual == self.pixels,
        }
    }
}

/// A parsed media query: an OR over comma-separated queries, each an AND
/// over its `and`-joined features.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaQuery {
    queries: Vec<Vec<Feature>>,
}

impl MediaQuery {
    /// Parse a query string. Returns `None` when the input does not match
    /// the grammar.
    pub fn parse(input: &str) -> Option<Self> {
        if !is_media_query(input) {
            return None;
        }

        let queries = input
            .split(',')
            .map(|query| {
                FEATURE
                    .captures_iter(query)
                    .map(|caps| {
                        let bound = match caps.get(1).map(|m| m.as_str()) {
                            Some("min") => Bound::Min,
                            Some("max") => Bound::Max,
                            _ => Bound::Exact,
                        };
                        let dimension = match &caps[2] {
                            "width" => Dimension::Width,
                            _ => Dimension::Height,
                        };
                        let value: f64 = caps[3].parse().ok()?;
                        // Unrecognized units fall back to pixels.
                        let scale = match &caps[4] {
                            "em" | "rem" => 16.0,
                            _ => 1.0,
                        };
                        Some(Feature {
                            dimension,
                            bound,
                            pixels: value * scale,
                        })
                    })
                    .collect::<Option<Vec<_>>>()
            })
            .collect::<Option<Vec<_>>>()?;

        if queries.iter().any(|q| q.is_empty()) {
            return None;
        }
        Some(Self { queries })
    }

    /// Evaluate against decoded pixel dimensions.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.queries
            .iter()
            .any(|features| features.iter().all(|f| f.holds(width, height)))
    }
}
