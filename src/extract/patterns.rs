//! Site-specific markup patterns: ordered CSS selector lists per field.
//!
//! A selector that fails to parse is logged and skipped; it never aborts the
//! chain.

use super::normalize::{char_len, clean_text};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Parse `selector`, logging instead of failing.
pub(crate) fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(%selector, error = %e, "Ignoring invalid selector");
            None
        }
    }
}

/// Whitespace-normalized text of an element.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// First non-empty text matched by any selector, in selector order.
pub fn first_text(document: &Html, selectors: &[String]) -> Option<String> {
    selectors.iter().filter_map(|s| parse_selector(s)).find_map(|sel| {
        document
            .select(&sel)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty())
    })
}

/// First non-empty value of any of `attrs` on elements matched by the
/// selectors. Falls back to element text when `text_fallback` is set.
pub fn first_attr(document: &Html, selectors: &[String], attrs: &[&str], text_fallback: bool) -> Option<String> {
    selectors.iter().filter_map(|s| parse_selector(s)).find_map(|sel| {
        document.select(&sel).find_map(|el| {
            attrs
                .iter()
                .find_map(|a| el.value().attr(a))
                .map(|v| srcset_first(v.trim()))
                .filter(|v| !v.is_empty())
                .or_else(|| {
                    text_fallback
                        .then(|| element_text(&el))
                        .filter(|t| !t.is_empty())
                })
        })
    })
}

/// `srcset`-style values list candidates; keep the first URL.
fn srcset_first(value: &str) -> String {
    if value.contains(", ") && value.contains(' ') {
        value
            .split(',')
            .next()
            .and_then(|c| c.split_whitespace().next())
            .unwrap_or(value)
            .to_string()
    } else {
        value.to_string()
    }
}

/// Body text from the first selector whose matches add up to at least
/// `min_chars` characters.
///
/// For each matched container the text of its paragraph-like descendants is
/// used when it has any, the container's own text otherwise. All matches of
/// one selector are concatenated in document order, paragraphs separated by
/// blank lines. Paragraphs for which `reject` returns `true` are dropped
/// before the length check.
pub fn body_text(
    document: &Html,
    selectors: &[String],
    min_chars: usize,
    reject: impl Fn(&str) -> bool,
) -> Option<String> {
    let paragraph = Selector::parse("p, h2, h3, blockquote, li").ok()?;
    let keep = |t: &String| !t.is_empty() && !reject(t);
    selectors.iter().filter_map(|s| parse_selector(s)).find_map(|sel| {
        let mut paragraphs: Vec<String> = Vec::new();
        for container in document.select(&sel) {
            let inner: Vec<String> = container.select(&paragraph).map(|p| element_text(&p)).collect();
            if inner.is_empty() {
                paragraphs.extend(Some(element_text(&container)).filter(keep));
            } else {
                paragraphs.extend(inner.into_iter().filter(keep));
            }
        }
        paragraphs.dedup();
        let body = paragraphs.join("\n\n");
        (char_len(&body) >= min_chars).then_some(body)
    })
}

/// `href` values of every element matched by the selectors, in selector then
/// document order.
pub fn hrefs(document: &Html, selectors: &[String]) -> Vec<String> {
    selectors
        .iter()
        .filter_map(|s| parse_selector(s))
        .flat_map(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("href").map(str::to_string))
                .collect::<Vec<_>>()
        })
        .collect()
}
