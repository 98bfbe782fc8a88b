//! JWT-shape heuristics.
//!
//! Two checks live here and nowhere else:
//! - [`is_jwt_candidate`]: prefix + length test applied to whole values
//!   (storage entries, cookie values, probe results)
//! - [`find_jwt_in_text`]: pattern search over free text (markup, scripts)

use regex::Regex;
use std::sync::OnceLock;

/// `{"` base64-encoded; every JSON-object JWT header starts with it.
pub const JWT_PREFIX: &str = "eyJ";

/// Candidates must be strictly longer than this many characters.
pub const MIN_TOKEN_LEN: usize = 100;

/// Characters of a candidate shown in logs and reports.
pub const PREVIEW_LEN: usize = 50;

fn jwt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_\-+/=]*)?").unwrap()
    })
}

/// Cheap syntactic filter: starts with `eyJ` and is longer than 100 characters.
///
/// Not a structural check. Strings that are not JWTs pass if they have the
/// right prefix and length; the inspector decides what they really are.
pub fn is_jwt_candidate(value: &str) -> bool {
    value.starts_with(JWT_PREFIX) && value.chars().count() > MIN_TOKEN_LEN
}

/// First JWT-shaped substring of `text` that is longer than 100 characters.
pub fn find_jwt_in_text(text: &str) -> Option<&str> {
    jwt_pattern()
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|m| m.chars().count() > MIN_TOKEN_LEN)
}

/// First 50 characters of a token, for diagnostics.
pub fn preview(token: &str) -> String {
    let head: String = token.chars().take(PREVIEW_LEN).collect();
    if token.chars().count() > PREVIEW_LEN {
        format!("{}...", head)
    } else {
        head
    }
}
