//! Shared utilities for provider adapters: static regexes, URL joining and entity unescaping.

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Resolves a possibly relative link against a base URL string.
///
/// Absolute `http(s)://` links are returned unchanged; `//host/...` is given an
/// `https:` scheme; everything else is joined onto `base`.
#[must_use]
pub fn absolutize_url(value: &str, base: &str) -> Option<String> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    Url::parse(base)
        .ok()?
        .join(value)
        .ok()
        .map(|url| url.to_string())
}

/// Returns the first capture group of `regex` in `text`, trimmed.
#[must_use]
pub fn first_capture(text: &str, regex: &Regex) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
}

/// Decodes the handful of entities provider markup actually uses.
#[must_use]
pub fn html_unescape_basic(value: &str) -> String {
    value
        .replace("&nbsp;", "\u{00a0}")
        .replace("&#160;", "\u{00a0}")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
