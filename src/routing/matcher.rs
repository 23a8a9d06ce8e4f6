//! Path prefix matching.
//!
//! # Responsibilities
//! - Normalise route prefixes at registration
//! - Normalise request paths at dispatch
//! - Enumerate the segment prefixes of a path, longest first
//!
//! # Design Decisions
//! - Matching is per path segment: `/billing` matches `/billing/x`, never `/billingx`
//! - Path matching is case-sensitive
//! - The root prefix `/` matches every path
//! - No regex; a lookup costs one map probe per path segment

use crate::routing::error::RouteError;

/// Normalise a prefix supplied by a plugin.
///
/// Adds the leading `/`, strips trailing `/` (except for the root) and
/// rejects empty prefixes or prefixes with empty segments.
pub fn normalize_prefix(prefix: &str) -> Result<String, RouteError> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return Err(RouteError::InvalidPrefix(prefix.to_string()));
    }

    let body = trimmed.trim_start_matches('/').trim_end_matches('/');
    if body.is_empty() {
        return Ok("/".to_string());
    }
    if body.split('/').any(str::is_empty) || body.contains(['?', '#']) {
        return Err(RouteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(format!("/{body}"))
}

/// Normalise a request path: drop query/fragment, collapse repeated `/`,
/// strip the trailing `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Segment prefixes of a normalised path, longest first, ending with `/`.
pub fn segment_prefixes(path: &str) -> SegmentPrefixes<'_> {
    SegmentPrefixes {
        remaining: Some(path),
    }
}

/// Iterator returned by [`segment_prefixes`].
#[derive(Debug, Clone)]
pub struct SegmentPrefixes<'a> {
    remaining: Option<&'a str>,
}

impl<'a> Iterator for SegmentPrefixes<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.remaining?;
        self.remaining = match current.rfind('/') {
            _ if current == "/" => None,
            Some(0) => Some("/"),
            Some(at) => Some(&current[..at]),
            None => None,
        };
        Some(current)
    }
}

/// The part of `path` below `prefix`, as handed to the handler.
///
/// Both arguments must be normalised and `prefix` must match `path`.
pub fn path_info<'a>(prefix: &str, path: &'a str) -> &'a str {
    if prefix == "/" {
        return path;
    }
    let rest = &path[prefix.len()..];
    if rest.is_empty() {
        "/"
    } else {
        rest
    }
}
