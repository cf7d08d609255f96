//! Pure calculation functions for width specs and derivative naming.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve a width spec against the source's native width.
///
/// A spec `<= 1.0` is a ratio: the target is `round(spec × native)`. A spec
/// `> 1.0` is an absolute pixel width.
///
/// # Examples
/// ```
/// # use srcset_gen::imaging::resolve_width;
/// assert_eq!(resolve_width(0.5, 3200), 1600);
/// assert_eq!(resolve_width(1.0, 3200), 3200);
/// assert_eq!(resolve_width(1920.0, 3200), 1920);
/// ```
pub fn resolve_width(spec: f64, native: u32) -> u32 {
    if spec <= 1.0 {
        (spec * native as f64).round() as u32
    } else {
        spec.round() as u32
    }
}

/// Whether a spec is the identity case: exactly `1` by contract means
/// "no resize, no rename postfix".
pub fn is_identity_spec(spec: f64) -> bool {
    spec == 1.0
}

/// Default derivative-name postfix: empty for the identity spec, `@<w>w`
/// otherwise.
pub fn default_postfix(resolved_width: u32, spec: f64) -> String {
    if is_identity_spec(spec) {
        String::new()
    } else {
        format!("@{resolved_width}w")
    }
}

/// Output height for a resize to `target_width`, preserving aspect ratio.
pub fn scaled_height(native: (u32, u32), target_width: u32) -> u32 {
    let (w, h) = native;
    if w == 0 {
        return 0;
    }
    ((h as f64 * target_width as f64 / w as f64).round() as u32).max(1)
}
