//! Lenient regex-based element scanning for provider HTML.
//!
//! Provider pages are schema-less and often malformed, so this does not build
//! a DOM. Comments and `<script>`/`<style>` bodies are blanked out first, then
//! a single pass over the tags pairs every start tag with its close tag through
//! a per-name stack. An unclosed element extends to the end of the document.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::utils::{compile_static_regex, html_unescape_basic};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>=`]+)))?"#,
    )
});

static HIDDEN_START_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)<!--|<(script|style)\b[^>]*>"));
static SCRIPT_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)</script\s*>"));
static STYLE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)</style\s*>"));

const COMMENT_END: &str = "-->";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A start tag plus the markup between it and its close tag.
#[derive(Debug, Clone)]
pub(crate) struct Element<'a> {
    name: String,
    attrs: Vec<(String, String)>,
    inner: &'a str,
}

impl<'a> Element<'a> {
    /// Lowercased tag name.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by (case-insensitive) name, entity-decoded.
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True if every whitespace-separated class in `classes` is on this element.
    pub(crate) fn has_classes(&self, classes: &str) -> bool {
        let Some(own) = self.attr("class") else {
            return false;
        };
        classes
            .split_whitespace()
            .all(|wanted| own.split_whitespace().any(|have| have == wanted))
    }

    /// Raw markup between the start and close tags.
    pub(crate) fn inner_html(&self) -> &'a str {
        self.inner
    }

    /// Text content with tags stripped and basic entities decoded.
    pub(crate) fn text(&self) -> String {
        html_unescape_basic(&TAG_RE.replace_all(&blank_hidden(self.inner_html()), ""))
    }

    /// All elements nested inside this one, in document order.
    pub(crate) fn descendants(&self) -> Vec<Element<'a>> {
        elements(self.inner)
    }

    /// First nested element matching `predicate`.
    pub(crate) fn find(&self, predicate: impl Fn(&Element<'a>) -> bool) -> Option<Element<'a>> {
        self.descendants().into_iter().find(|el| predicate(el))
    }
}

/// Scans `html` and returns every element in document order.
///
/// Runs in one pass over the tags; nothing inside a comment or a
/// `<script>`/`<style>` body is reported.
pub(crate) fn elements(html: &str) -> Vec<Element<'_>> {
    // Blanking keeps byte offsets, so positions found in `visible` index `html`.
    let visible = blank_hidden(html);
    let mut tags: Vec<(String, Vec<(String, String)>)> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut open: HashMap<String, Vec<usize>> = HashMap::new();

    for caps in TAG_RE.captures_iter(&visible) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = caps[2].to_ascii_lowercase();
        if !caps[1].is_empty() {
            if let Some(index) = open.get_mut(&name).and_then(Vec::pop) {
                spans[index].1 = whole.start();
            }
            continue;
        }

        let raw_attrs = caps.get(3).map_or("", |m| &html[m.range()]);
        let self_closing = raw_attrs.trim_end().ends_with('/');
        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            spans.push((whole.end(), whole.end()));
        } else {
            open.entry(name.clone()).or_default().push(spans.len());
            spans.push((whole.end(), html.len()));
        }
        tags.push((name, parse_attrs(raw_attrs)));
    }

    tags.into_iter()
        .zip(spans)
        .map(|((name, attrs), (start, end))| Element {
            name,
            attrs,
            inner: &html[start..end],
        })
        .collect()
}

/// Replaces comments and `<script>`/`<style>` bodies with spaces of the same
/// byte length. The script and style tags themselves are kept.
fn blank_hidden(html: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut pos = 0;

    while let Some(caps) = HIDDEN_START_RE.captures_at(html, pos) {
        let Some(opening) = caps.get(0) else {
            break;
        };
        let (blank_from, blank_to, resume) = match caps.get(1) {
            None => {
                let end = html[opening.end()..]
                    .find(COMMENT_END)
                    .map_or(html.len(), |offset| opening.end() + offset + COMMENT_END.len());
                (opening.start(), end, end)
            }
            Some(raw_text) => {
                let close_re = if raw_text.as_str().eq_ignore_ascii_case("script") {
                    &SCRIPT_CLOSE_RE
                } else {
                    &STYLE_CLOSE_RE
                };
                match close_re.find_at(html, opening.end()) {
                    Some(close) => (opening.end(), close.start(), close.end()),
                    None => (opening.end(), html.len(), html.len()),
                }
            }
        };

        out.push_str(&html[copied..blank_from]);
        out.extend(std::iter::repeat_n(' ', blank_to - blank_from));
        copied = blank_to;
        pos = resume;
    }

    if pos == 0 {
        return Cow::Borrowed(html);
    }
    out.push_str(&html[copied..]);
    Cow::Owned(out)
}

/// First element in `html` matching `predicate`.
pub(crate) fn find_first<'a>(
    html: &'a str,
    predicate: impl Fn(&Element<'a>) -> bool,
) -> Option<Element<'a>> {
    elements(html).into_iter().find(|el| predicate(el))
}

/// Every element in `html` matching `predicate`.
pub(crate) fn find_all<'a>(
    html: &'a str,
    predicate: impl Fn(&Element<'a>) -> bool,
) -> Vec<Element<'a>> {
    elements(html).into_iter().filter(|el| predicate(el)).collect()
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Some((key, html_unescape_basic(value)))
        })
        .collect()
}
