//! Glob matching for release asset names.
//!
//! GitHub releases carry assets like `tool-1.2.3-x86_64-unknown-linux-gnu.tar.gz`;
//! a catalog entry selects the right one with a small glob pattern such as
//! `*x86_64*linux*.tar.gz`. Matching is case-insensitive and anchored at both
//! ends: the pattern must cover the whole name, it is not a substring search.
//!
//! Supported metacharacters are `*` (zero or more of any character) and `?`
//! (exactly one character); everything else matches literally.

/// Match `name` against a glob `pattern`, case-insensitively.
///
/// # Examples
///
/// ```
/// use unipak::pattern::matches_asset;
///
/// assert!(matches_asset("*.tar.gz", "file.tar.gz"));
/// assert!(!matches_asset("*.tar.gz", "file.zip"));
/// assert!(matches_asset("?est.txt", "test.txt"));
/// assert!(!matches_asset("?est.txt", "est.txt"));
/// ```
pub fn matches_asset(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let name: Vec<char> = name.to_lowercase().chars().collect();
    glob_match(&pattern, &name)
}

fn glob_match(pattern: &[char], name: &[char]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some(('*', rest)) => {
            // Try every split point, including consuming nothing.
            (0..=name.len()).any(|i| glob_match(rest, &name[i..]))
        }
        Some(('?', rest)) => !name.is_empty() && glob_match(rest, &name[1..]),
        Some((literal, rest)) => name
            .split_first()
            .is_some_and(|(c, tail)| c == literal && glob_match(rest, tail)),
    }
}
