//! npm-style version range matching.
//!
//! The store and the workspace manifests use npm range syntax, which is a
//! superset of what the `semver` crate parses directly. Ranges are normalized
//! before parsing:
//! - hyphen ranges: `1.0.0 - 2.0.0`
//! - x-ranges: `1.x`, `1.2.x`, `*`
//! - space-separated comparators: `>= 2.1.2 < 3.0.0` (AND)
//! - OR alternatives: `^1.0.0 || ^2.0.0`

use semver::{Version, VersionReq};

/// Check whether `version` satisfies an npm range.
///
/// Unparseable ranges never match; the linker treats them the same as an
/// incompatible version and falls back to the store.
#[must_use]
pub fn satisfies(version: &Version, range: &str) -> bool {
    let range = range.trim();

    // OR alternatives: satisfied if any alternative matches
    if range.contains("||") {
        return range
            .split("||")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .filter_map(parse_range)
            .any(|req| req.matches(version));
    }

    parse_range(range).is_some_and(|req| req.matches(version))
}

/// Parse a single range alternative, handling npm-specific syntax.
///
/// Returns `None` for ranges the normalizer cannot make sense of.
#[must_use]
pub fn parse_range(range: &str) -> Option<VersionReq> {
    let range = range.trim();

    if range.is_empty() {
        // npm treats an empty range as "any version"
        return Some(VersionReq::STAR);
    }

    // Hyphen ranges: "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = split_hyphen_range(range) {
        return VersionReq::parse(&format!(">={start}, <={end}")).ok();
    }

    // X-ranges: "1.x" -> ">=1.0.0, <2.0.0"
    if range.contains(['x', 'X']) || range == "*" {
        return VersionReq::parse(&convert_x_range(range)).ok();
    }

    // Space-separated comparators: ">= 2.1.2 < 3.0.0" -> ">=2.1.2, <3.0.0"
    VersionReq::parse(&join_comparators(range)).ok()
}

/// Split a hyphen range like "1.0.0 - 2.0.0" into its endpoints.
fn split_hyphen_range(range: &str) -> Option<(&str, &str)> {
    // The separator is space-hyphen-space; a bare hyphen belongs to prerelease tags
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

/// Convert an x-range to a range the `semver` crate accepts.
fn convert_x_range(range: &str) -> String {
    let range = range.trim();

    if range == "*" || range.eq_ignore_ascii_case("x") {
        return ">=0.0.0".to_string();
    }

    let parts: Vec<&str> = range.split('.').collect();
    match parts.as_slice() {
        [major, "x" | "X" | "*"] => {
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, "x" | "X" | "*"] => {
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    // Fallback: treat x as a literal zero
    range.replace(['x', 'X'], "0")
}

/// Join space-separated comparators with commas.
///
/// npm allows ">= 2.1.2 < 3.0.0" to mean AND; the `semver` crate wants
/// ">=2.1.2, <3.0.0". Operators may be separated from their versions by
/// whitespace, so tokens are accumulated until they contain a digit.
fn join_comparators(range: &str) -> String {
    let mut result = String::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        if token.chars().any(|c| c.is_ascii_digit()) {
            if !result.is_empty() && pending_op.is_empty() {
                result.push_str(", ");
            }
            result.push_str(&pending_op);
            result.push_str(token);
            pending_op.clear();
        } else {
            // An operator with its version in the next token
            if !result.is_empty() {
                result.push_str(", ");
            }
            pending_op.push_str(token);
        }
    }
    result.push_str(&pending_op);

    if result.is_empty() {
        range.to_string()
    } else {
        result
    }
}
