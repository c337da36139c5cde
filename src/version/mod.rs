//! Version normalization and ordinal comparison.
//!
//! Package backends report versions in wildly different shapes: `v1.2.3`,
//! `1.2.3-1ubuntu2`, `go1.22.1`, `2024.05`. Rather than force semantic
//! versioning onto tools that never promised it, this module reduces every
//! string to its leading dotted-numeric core and compares component-wise.
//!
//! Under this scheme `v1.2.3` equals `1.2.3`, `1.2` equals `1.2.0`, and
//! `1.2.3-beta` equals `1.2.3`. Strings with no digits at all normalize to
//! empty and are only compared for raw equality.

use std::cmp::Ordering;

/// Reduce a version string to its dotted-numeric core.
///
/// Trims whitespace, strips any leading run of non-digit characters (the
/// `v` in `v2.0.12`, the `go` in `go1.22.1`), then truncates at the first
/// character that is neither a digit nor `.` (dropping suffixes like
/// `-beta` or `+build5`). Returns an empty string when the input contains
/// no digits.
///
/// # Examples
///
/// ```
/// use unipak::version::normalize;
///
/// assert_eq!(normalize("v2.0.12"), "2.0.12");
/// assert_eq!(normalize("  1.2.3-beta "), "1.2.3");
/// assert_eq!(normalize("nightly"), "");
/// ```
pub fn normalize(version: &str) -> String {
    let trimmed = version.trim();
    let start = trimmed
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = &trimmed[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(digits.len());
    digits[..end].to_string()
}

/// Compare two version strings component-wise after [`normalize`].
///
/// Components are split on `.` and parsed as integers; non-numeric or
/// missing components count as zero, and the shorter sequence is padded
/// with zeros, so `1.2` and `1.2.0` compare equal. The first differing
/// component decides the ordering.
///
/// When normalization empties either input the versions are not numerically
/// comparable; equal raw strings compare [`Ordering::Equal`] and anything
/// else reports a difference (the direction carries no meaning).
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use unipak::version::compare;
///
/// assert_eq!(compare("1.10.0", "1.2.9"), Ordering::Greater);
/// assert_eq!(compare("v1.2.3", "1.2.3"), Ordering::Equal);
/// assert_eq!(compare("2", "10"), Ordering::Less);
/// ```
pub fn compare(a: &str, b: &str) -> Ordering {
    let (na, nb) = (normalize(a), normalize(b));
    if na.is_empty() || nb.is_empty() {
        return if a.trim() == b.trim() {
            Ordering::Equal
        } else {
            Ordering::Greater
        };
    }
    let va = split_numeric(&na);
    let vb = split_numeric(&nb);
    let len = va.len().max(vb.len());
    for i in 0..len {
        let ai = va.get(i).copied().unwrap_or(0);
        let bi = vb.get(i).copied().unwrap_or(0);
        match ai.cmp(&bi) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// True when `latest` is strictly newer than `installed`.
pub fn is_newer(latest: &str, installed: &str) -> bool {
    compare(latest, installed) == Ordering::Greater
}

fn split_numeric(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}
