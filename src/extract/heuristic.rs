//! Generic heuristics for pages no selector list describes.
//!
//! Body text comes from block-level elements outside page chrome, filtered
//! by length and a negative keyword list. The other fields use the markup
//! conventions most news templates share.

use super::normalize::char_len;
use super::patterns::{element_text, first_attr, first_text};
use scraper::{ElementRef, Html, Selector};

const BLOCK_SELECTOR: &str = "p, blockquote";

/// Containers whose text is never article body.
const CHROME_TAGS: &[&str] = &["nav", "header", "footer", "aside", "form", "script", "style", "noscript", "figcaption"];

/// Words of a `class`/`id` token (split on `-`, `_` and the like) marking
/// non-body containers.
const CHROME_HINTS: &[&str] = &[
    "related",
    "newsletter",
    "promo",
    "share",
    "sharing",
    "social",
    "comment",
    "comments",
    "ad",
    "ads",
    "advert",
    "advertisement",
    "cookie",
    "cookies",
    "subscribe",
    "subscription",
    "sidebar",
];

/// Ancestors at which the chrome walk stops; their markers describe the page
/// template rather than the block.
const CONTENT_ROOTS: &[&str] = &["article", "main", "body", "html"];

/// Phrases marking a fragment as advertising, navigation or legal copy.
const NEGATIVE_KEYWORDS: &[&str] = &[
    "subscribe",
    "sign up",
    "newsletter",
    "advertisement",
    "cookie",
    "all rights reserved",
    "click here",
    "follow us",
    "read more",
    "share this",
    "log in",
    "privacy policy",
    "terms of use",
    "terms of service",
];

/// Concatenate the first `max_fragments` surviving block fragments.
///
/// `boilerplate` adds source-specific phrases to the negative list. Returns
/// `None` when fewer than `min_chars` characters survive.
pub fn body_text(
    document: &Html,
    boilerplate: &[String],
    min_fragment_chars: usize,
    max_fragments: usize,
    min_chars: usize,
) -> Option<String> {
    let selector = Selector::parse(BLOCK_SELECTOR).ok()?;
    let mut kept: Vec<String> = Vec::new();
    for el in document.select(&selector) {
        if kept.len() >= max_fragments {
            break;
        }
        if in_chrome(&el) {
            continue;
        }
        let text = element_text(&el);
        if char_len(&text) < min_fragment_chars || is_boilerplate(&text, boilerplate) || kept.contains(&text) {
            continue;
        }
        kept.push(text);
    }
    let body = kept.join("\n\n");
    (char_len(&body) >= min_chars).then_some(body)
}

fn in_chrome(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| !CONTENT_ROOTS.contains(&ancestor.value().name()))
        .any(|ancestor| {
            let value = ancestor.value();
            CHROME_TAGS.contains(&value.name()) || value.classes().chain(value.id()).any(is_chrome_marker)
        })
}

fn is_chrome_marker(token: &str) -> bool {
    token
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| CHROME_HINTS.iter().any(|hint| word.eq_ignore_ascii_case(hint)))
}

/// Whether `text` reads as advertising, navigation or legal copy, using the
/// shared negative keywords plus the source's own `extra` phrases.
pub(crate) fn is_boilerplate(text: &str, extra: &[String]) -> bool {
    let lower = text.to_lowercase();
    NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k))
        || extra
            .iter()
            .filter(|p| !p.trim().is_empty())
            .any(|p| lower.contains(&p.to_lowercase()))
}

pub fn title(document: &Html, document_title: Option<&str>) -> Option<String> {
    first_text(document, &owned(&["article h1", "main h1", "h1"]))
        .or_else(|| document_title.map(str::to_string))
}

/// Byline text from the usual author containers.
pub fn author(document: &Html) -> Option<String> {
    first_text(
        document,
        &owned(&[
            "[rel='author']",
            "[itemprop='author'] [itemprop='name']",
            "[itemprop='author']",
            ".byline",
            "[class*='byline']",
            "[class*='author-name']",
            "[class*='author']",
        ]),
    )
}

pub fn date(document: &Html) -> Option<String> {
    first_attr(
        document,
        &owned(&["article time[datetime]", "time[datetime]", "[itemprop='datePublished']"]),
        &["datetime", "content"],
        true,
    )
}

/// First content image that is not a logo or icon.
pub fn image(document: &Html) -> Option<String> {
    let selector = Selector::parse("article img, main img, figure img").ok()?;
    document.select(&selector).find_map(|img| {
        let value = img.value();
        let src = value
            .attr("src")
            .or_else(|| value.attr("data-src"))
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.starts_with("data:"))?;
        let marker = format!("{} {} {}", src, value.attr("class").unwrap_or_default(), value.attr("alt").unwrap_or_default())
            .to_ascii_lowercase();
        (!["logo", "icon", "sprite", "avatar"].iter().any(|w| marker.contains(w))).then(|| src.to_string())
    })
}

/// Text of `rel="tag"` links and keyword lists.
pub fn tags(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[rel~='tag'], .tags a, [class*='keyword'] a") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "The committee met on Tuesday to review the proposal in detail.";
    const LONG_B: &str = "Members raised concerns about funding and the proposed timeline.";

    #[test]
    fn test_body_skips_chrome_and_boilerplate() {
        let html = format!(
            r#"<html><body>
                <nav><p>Home World Business Politics Technology Science Health</p></nav>
                <article>
                  <p>{LONG_A}</p>
                  <p>Subscribe to our newsletter for the latest headlines every day.</p>
                  <p>short</p>
                  <div class="related-stories"><p>Another story you might like to read today and tomorrow.</p></div>
                  <blockquote>{LONG_B}</blockquote>
                </article>
                <footer><p>Copyright notice and all rights reserved for this site.</p></footer>
            </body></html>"#
        );
        let body = body_text(&Html::parse_document(&html), &[], 40, 12, 10).unwrap();
        assert_eq!(body, format!("{LONG_A}\n\n{LONG_B}"));
    }

    #[test]
    fn test_body_source_boilerplate_and_fragment_cap() {
        let html = format!(
            r#"<article><p>{LONG_A}</p><p>Sponsor message: this program is supported by listeners.</p><p>{LONG_B}</p></article>"#
        );
        let doc = Html::parse_document(&html);
        let extra = vec!["Sponsor Message".to_string()];
        assert_eq!(body_text(&doc, &extra, 40, 12, 10).unwrap(), format!("{LONG_A}\n\n{LONG_B}"));
        assert_eq!(body_text(&doc, &extra, 40, 1, 10).unwrap(), LONG_A);
    }

    #[test]
    fn test_page_template_classes_do_not_hide_body() {
        let html = format!(
            r#"<html><body class="single-post has-social-share" id="comments-enabled">
                <div class="story"><p>{LONG_A}</p><p>{LONG_B}</p></div>
                <div class="article-share-bar"><p>Share this story with friends and family on every network.</p></div>
            </body></html>"#
        );
        let body = body_text(&Html::parse_document(&html), &[], 40, 12, 10).unwrap();
        assert_eq!(body, format!("{LONG_A}\n\n{LONG_B}"));
    }

    #[test]
    fn test_chrome_markers_match_whole_words() {
        assert!(is_chrome_marker("related-stories"));
        assert!(is_chrome_marker("Social_Links"));
        assert!(is_chrome_marker("ad-slot"));
        assert!(!is_chrome_marker("commentary"));
        assert!(!is_chrome_marker("headline"));
    }

    #[test]
    fn test_body_below_threshold_is_none() {
        let doc = Html::parse_document(&format!("<p>{LONG_A}</p>"));
        assert_eq!(body_text(&doc, &[], 40, 12, 500), None);
    }

    #[test]
    fn test_field_heuristics() {
        let html = r#"<html><head><title>Doc title</title></head><body>
            <article>
              <h1> Storm hits coast </h1>
              <span class="byline">By Ana Ruiz</span>
              <time datetime="2024-02-01T08:00:00Z">Feb 1</time>
              <img src="/static/logo.png" alt="Site logo">
              <img src="/img/storm.jpg" alt="Waves">
              <a rel="tag" href="/t/weather">Weather</a><a rel="tag" href="/t/coast">Coast</a>
            </article></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(title(&doc, Some("Doc title")).as_deref(), Some("Storm hits coast"));
        assert_eq!(author(&doc).as_deref(), Some("By Ana Ruiz"));
        assert_eq!(date(&doc).as_deref(), Some("2024-02-01T08:00:00Z"));
        assert_eq!(image(&doc).as_deref(), Some("/img/storm.jpg"));
        assert_eq!(tags(&doc), vec!["Weather", "Coast"]);
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let doc = Html::parse_document("<p>no heading</p>");
        assert_eq!(title(&doc, Some("Doc title")).as_deref(), Some("Doc title"));
        assert_eq!(title(&doc, None), None);
    }
}
