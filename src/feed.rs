//! Article link discovery for a source.
//!
//! The source's RSS/Atom feed is tried first. When it is missing, fails to
//! fetch, fails to parse or lists nothing usable, the homepage is scraped
//! with the source's link selectors instead. Either way links are resolved,
//! restricted to the source's own hosts, de-duplicated in discovery order
//! and capped.

use crate::error::FetchError;
use crate::extract::normalize::resolve_url;
use crate::extract::patterns;
use crate::fetch::FetchPlan;
use crate::models::SourceConfig;
use crate::sources;
use itertools::Itertools;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Item links of an RSS 2.0 or Atom document, in document order.
///
/// RSS items contribute the text of their `<link>`; Atom entries contribute
/// the `href` of their first `alternate` (or untyped) `<link>`.
pub fn feed_links(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut links = Vec::new();
    let mut in_entry = false;
    let mut in_link = false;
    let mut text = String::new();
    let mut entry_link: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    in_entry = true;
                    entry_link = None;
                }
                b"link" if in_entry => match atom_href(&e) {
                    Some(href) => {
                        entry_link.get_or_insert(href);
                    }
                    None => {
                        in_link = true;
                        text.clear();
                    }
                },
                _ => {}
            },
            Event::Empty(e) if in_entry && e.local_name().as_ref() == b"link" => {
                if let Some(href) = atom_href(&e) {
                    entry_link.get_or_insert(href);
                }
            }
            Event::Text(e) if in_link => {
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                match unescape(&raw) {
                    Ok(unescaped) => text.push_str(&unescaped),
                    Err(_) => text.push_str(&raw),
                }
            }
            Event::CData(e) if in_link => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::GeneralRef(r) if in_link => {
                let name = String::from_utf8_lossy(&r).into_owned();
                if let Some(c) = char_ref(&name) {
                    text.push(c);
                } else if let Some(resolved) = resolve_predefined_entity(&name) {
                    text.push_str(resolved);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"link" if in_link => {
                    in_link = false;
                    let link = text.trim();
                    if !link.is_empty() && entry_link.is_none() {
                        entry_link = Some(link.to_string());
                    }
                }
                b"item" | b"entry" => {
                    in_entry = false;
                    links.extend(entry_link.take());
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(links)
}

/// `href` of an Atom `<link>` unless its `rel` says it is not the article.
fn atom_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&value).map(|v| v.into_owned()).unwrap_or(value);
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    match rel.as_deref() {
        None | Some("alternate") => href.filter(|h| !h.trim().is_empty()),
        _ => None,
    }
}

fn char_ref(name: &str) -> Option<char> {
    let num = name.strip_prefix('#')?;
    let code = match num.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => num.parse().ok()?,
    };
    char::from_u32(code)
}

/// Raw `href`s on the homepage matched by the source's link selectors, or by
/// the generic ones when the source lists none.
pub fn homepage_links(markup: &str, source: &SourceConfig) -> Vec<String> {
    let selectors = if source.selectors.links.is_empty() {
        &sources::generic().selectors.links
    } else {
        &source.selectors.links
    };
    let document = Html::parse_document(markup);
    patterns::hrefs(&document, selectors)
}

/// Resolve, keep only the source's own article pages, de-duplicate and cap.
pub fn filter_links(source: &SourceConfig, base: &str, raw: Vec<String>, cap: usize) -> Vec<String> {
    let homepage = Url::parse(base).ok();
    raw.into_iter()
        .filter_map(|href| resolve_url(base, &href))
        .filter_map(|link| Url::parse(&link).ok())
        .filter(|url| url.host_str().is_some_and(|host| source.matches_host(host)))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| url.path() != "/" && Some(url) != homepage.as_ref())
        .map(String::from)
        .unique()
        .take(cap)
        .collect()
}

/// Discover up to `cap` article links for `source`.
///
/// Only a failed homepage fetch is an error; a failed feed just falls
/// through to the homepage.
#[instrument(level = "info", skip(plan, source), fields(source = %source.id))]
pub async fn discover_links(plan: &FetchPlan, source: &SourceConfig, cap: usize) -> Result<Vec<String>, FetchError> {
    if let Some(feed_url) = &source.feed_url {
        match plan.fetch_markup(feed_url).await {
            Ok(xml) => match feed_links(&xml) {
                Ok(raw) => {
                    let links = filter_links(source, feed_url, raw, cap);
                    if !links.is_empty() {
                        info!(count = links.len(), via = "feed", "Discovered article links");
                        return Ok(links);
                    }
                    debug!(%feed_url, "Feed listed no usable links; trying homepage");
                }
                Err(e) => warn!(%feed_url, error = %e, "Feed did not parse; trying homepage"),
            },
            Err(e) => warn!(%feed_url, error = %e, "Feed fetch failed; trying homepage"),
        }
    }

    let markup = plan.fetch_markup(&source.base_url).await?;
    let raw = homepage_links(&markup, source);
    let links = filter_links(source, &source.base_url, raw, cap);
    info!(count = links.len(), via = "homepage", "Discovered article links");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{Canned, FakeTransport};
    use crate::fetch::FetchGateway;
    use std::sync::Arc;
    use std::time::Duration;

    fn bbc() -> SourceConfig {
        sources::builtin().iter().find(|s| s.id == "bbc").unwrap().clone()
    }

    fn plan(t: FakeTransport) -> FetchPlan {
        FetchPlan::new(FetchGateway::new(Arc::new(t)), Duration::from_secs(1))
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"><channel>
          <title>BBC News</title>
          <link>https://www.bbc.co.uk/news</link>
          <atom:link href="https://feeds.bbci.co.uk/news/rss.xml" rel="self"/>
          <item><title>One</title><link>https://www.bbc.co.uk/news/articles/one?at_medium=RSS&amp;at_campaign=rss</link></item>
          <item><title>Two</title><link><![CDATA[https://www.bbc.co.uk/news/articles/two]]></link></item>
          <item><title>No link</title></item>
        </channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
          <link href="https://example.org/" rel="alternate"/>
          <entry><title>A</title>
            <link rel="enclosure" href="https://example.org/a.mp3"/>
            <link rel="alternate" href="https://example.org/a"/>
          </entry>
          <entry><title>B</title><link href="https://example.org/b"/></entry>
        </feed>"#;

    #[test]
    fn test_rss_item_links() {
        assert_eq!(
            feed_links(RSS).unwrap(),
            vec![
                "https://www.bbc.co.uk/news/articles/one?at_medium=RSS&at_campaign=rss",
                "https://www.bbc.co.uk/news/articles/two",
            ]
        );
    }

    #[test]
    fn test_atom_entry_links() {
        assert_eq!(feed_links(ATOM).unwrap(), vec!["https://example.org/a", "https://example.org/b"]);
    }

    #[test]
    fn test_malformed_feed_is_error() {
        assert!(feed_links("<rss><channel><item><link>x</item></rss>").is_err());
    }

    #[test]
    fn test_filter_links_resolves_restricts_dedupes_and_caps() {
        let raw = vec![
            "/news/articles/a".to_string(),
            "https://www.bbc.co.uk/news/articles/a#comments".to_string(),
            "https://evil.example/news/articles/x".to_string(),
            "javascript:void(0)".to_string(),
            "/".to_string(),
            "https://m.bbc.co.uk/news/articles/b".to_string(),
            "/news/articles/c".to_string(),
        ];
        let links = filter_links(&bbc(), "https://www.bbc.co.uk/news", raw, 2);
        assert_eq!(
            links,
            vec!["https://www.bbc.co.uk/news/articles/a", "https://m.bbc.co.uk/news/articles/b"]
        );
    }

    #[test]
    fn test_homepage_links_use_source_selectors() {
        let html = r#"<a href="/news/articles/x">X</a><a href="/sport/1">S</a>"#;
        assert_eq!(homepage_links(html, &bbc()), vec!["/news/articles/x"]);
    }

    #[tokio::test]
    async fn test_discovery_prefers_feed() {
        let source = bbc();
        let t = FakeTransport::new("fake").body("https://feeds.bbci.co.uk/news/rss.xml", RSS);
        let links = discover_links(&plan(t), &source, 5).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links[1].ends_with("/news/articles/two"));
    }

    #[tokio::test]
    async fn test_discovery_falls_back_to_homepage() {
        let source = bbc();
        let t = FakeTransport::new("fake")
            .route(
                "https://feeds.bbci.co.uk/news/rss.xml",
                Canned::Fail(FetchError::Unreachable("HTTP 503".into())),
            )
            .body("https://www.bbc.com/news", r#"<a href="/news/articles/z">Z</a>"#);
        let links = discover_links(&plan(t), &source, 5).await.unwrap();
        assert_eq!(links, vec!["https://www.bbc.com/news/articles/z"]);
    }

    #[tokio::test]
    async fn test_discovery_fails_when_homepage_fails() {
        let mut source = bbc();
        source.feed_url = None;
        let err = discover_links(&plan(FakeTransport::new("fake")), &source, 5).await.unwrap_err();
        assert!(matches!(err, FetchError::Unreachable(_)));
    }
}
