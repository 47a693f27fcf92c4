//! Built-in table of known news sources.
//!
//! Each entry describes where a site publishes (base URL, feed, extra hosts)
//! and the markup patterns its article templates have used over time. The
//! selector lists are ordered: current templates first, historical ones after.
//!
//! # Supported Sources
//!
//! | Id | Site | Discovery |
//! |----|------|-----------|
//! | `bbc` | BBC News | RSS feed |
//! | `cnn` | CNN | RSS feed |
//! | `nytimes` | The New York Times | RSS feed |
//! | `guardian` | The Guardian | RSS feed |
//! | `reuters` | Reuters | homepage links |
//! | `aljazeera` | Al Jazeera | RSS feed |
//! | `npr` | NPR | RSS feed |
//! | `apnews` | AP News | homepage links (disabled by default) |

use crate::models::{SelectorSet, SourceConfig};
use once_cell::sync::Lazy;

/// Identifier of the adapter used for URLs no known source claims.
pub const GENERIC_SOURCE_ID: &str = "generic";

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

static BUILTIN: Lazy<Vec<SourceConfig>> = Lazy::new(|| {
    vec![
        SourceConfig {
            id: "bbc".into(),
            name: "BBC News".into(),
            base_url: "https://www.bbc.com/news".into(),
            feed_url: Some("https://feeds.bbci.co.uk/news/rss.xml".into()),
            hosts: list(&["bbc.co.uk"]),
            selectors: SelectorSet {
                title: list(&["h1#main-heading", "h1.story-body__h1", "article h1"]),
                content: list(&[
                    "article [data-component='text-block']",
                    "div.story-body__inner",
                    "div[property='articleBody']",
                ]),
                author: list(&["[data-testid='byline-new-contributors'] span", "div.byline__name"]),
                date: list(&["article time[datetime]", "div.date[data-datetime]"]),
                image: list(&["article figure img", "div.story-body__inner figure img"]),
                links: list(&["a[href*='/news/articles/']", "a.gs-c-promo-heading"]),
            },
            title_suffixes: list(&[" - BBC News", " - BBC Sport"]),
            boilerplate: list(&["bbc is not responsible for the content of external sites"]),
            category: "world".into(),
            enabled: true,
        },
        SourceConfig {
            id: "cnn".into(),
            name: "CNN".into(),
            base_url: "https://edition.cnn.com".into(),
            feed_url: Some("http://rss.cnn.com/rss/edition.rss".into()),
            hosts: list(&["cnn.com"]),
            selectors: SelectorSet {
                title: list(&["h1.headline__text", "h1.pg-headline", ".headline--lite"]),
                content: list(&[
                    "div.article__content",
                    "section#body-text div.l-container",
                    "div.zn-body__paragraph",
                    ".article--lite",
                ]),
                author: list(&["span.byline__name", "div.byline__names", "span.metadata__byline__author"]),
                date: list(&["div.timestamp", "p.update-time"]),
                image: list(&["div.image__container img", "img.media__image"]),
                links: list(&["a.container__link", ".card--lite a[href]"]),
            },
            title_suffixes: list(&[" | CNN", " | CNN Politics", " | CNN Business"]),
            boilerplate: list(&["get our free", "sign up for cnn"]),
            category: "us".into(),
            enabled: true,
        },
        SourceConfig {
            id: "nytimes".into(),
            name: "The New York Times".into(),
            base_url: "https://www.nytimes.com".into(),
            feed_url: Some("https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml".into()),
            hosts: vec![],
            selectors: SelectorSet {
                title: list(&["h1[data-testid='headline']", "h1[itemprop='headline']"]),
                content: list(&[
                    "section[name='articleBody']",
                    "div.StoryBodyCompanionColumn",
                    "p.story-body-text",
                ]),
                author: list(&["span[itemprop='name']", "p.css-4anu6l span.last-byline"]),
                date: list(&["time[datetime]"]),
                image: list(&["figure[aria-label='media'] img", "picture img"]),
                links: list(&["section.story-wrapper a", "a[href*='/20']"]),
            },
            title_suffixes: list(&[" - The New York Times"]),
            boilerplate: list(&["thank you for your patience", "advertisement", "supported by"]),
            category: "us".into(),
            enabled: true,
        },
        SourceConfig {
            id: "guardian".into(),
            name: "The Guardian".into(),
            base_url: "https://www.theguardian.com/international".into(),
            feed_url: Some("https://www.theguardian.com/world/rss".into()),
            hosts: list(&["theguardian.com", "guardian.co.uk"]),
            selectors: SelectorSet {
                title: list(&["h1[itemprop='headline']", "div[data-gu-name='headline'] h1"]),
                content: list(&["div#maincontent div.article-body-commercial-selector", "div[itemprop='articleBody']", "div.content__article-body"]),
                author: list(&["a[rel='author']", "address[data-component='meta-byline'] a"]),
                date: list(&["details[data-gu-name='dateline'] summary", "time[itemprop='datePublished']"]),
                image: list(&["div[data-gu-name='media'] img", "figure.element-image img"]),
                links: list(&["a[data-link-name='article']"]),
            },
            title_suffixes: list(&[" | The Guardian", " | World news | The Guardian"]),
            boilerplate: list(&["support the guardian", "sign up to", "privacy notice"]),
            category: "world".into(),
            enabled: true,
        },
        SourceConfig {
            id: "reuters".into(),
            name: "Reuters".into(),
            base_url: "https://www.reuters.com".into(),
            feed_url: None,
            hosts: vec![],
            selectors: SelectorSet {
                title: list(&["h1[data-testid='Heading']", "h1.article-header__title"]),
                content: list(&[
                    "div[data-testid='ArticleBody']",
                    "div.article-body__content",
                    "div.StandardArticleBody_body",
                ]),
                author: list(&["a[rel='author']", "div.article-header__author"]),
                date: list(&["time[datetime]", "span.date-line__date"]),
                image: list(&["div[data-testid='primary-image'] img"]),
                links: list(&["a[data-testid='Heading']", "a[href*='/world/']", "a[href*='/business/']"]),
            },
            title_suffixes: list(&[" | Reuters"]),
            boilerplate: list(&["reporting by", "editing by", "our standards:", "thomson reuters trust principles"]),
            category: "business".into(),
            enabled: true,
        },
        SourceConfig {
            id: "aljazeera".into(),
            name: "Al Jazeera".into(),
            base_url: "https://www.aljazeera.com".into(),
            feed_url: Some("https://www.aljazeera.com/xml/rss/all.xml".into()),
            hosts: vec![],
            selectors: SelectorSet {
                title: list(&["header.article-header h1", "div.article-header h1"]),
                content: list(&["div.wysiwyg--all-content", "div.article-p-wrapper"]),
                author: list(&["div.article-author-name a", "a.author-link"]),
                date: list(&["div.article-dates span[aria-hidden='true']", "div.date-simple span"]),
                image: list(&["figure.article-featured-image img"]),
                links: list(&["a.u-clickable-card__link"]),
            },
            title_suffixes: list(&[" | Al Jazeera", " | News | Al Jazeera"]),
            boilerplate: list(&["follow al jazeera"]),
            category: "world".into(),
            enabled: true,
        },
        SourceConfig {
            id: "npr".into(),
            name: "NPR".into(),
            base_url: "https://www.npr.org".into(),
            feed_url: Some("https://feeds.npr.org/1001/rss.xml".into()),
            hosts: vec![],
            selectors: SelectorSet {
                title: list(&["div.storytitle h1", "article.story-text h1"]),
                content: list(&["div#storytext", "div.paragraphs-container"]),
                author: list(&["p.byline__name a", "div.byline-container--inline p"]),
                date: list(&["time[datetime]", "span.date"]),
                image: list(&["div.bucketwrap.image img"]),
                links: list(&["h2.title a", "div.story-text a"]),
            },
            title_suffixes: list(&[" : NPR", " : Shots - Health News : NPR"]),
            boilerplate: list(&["sponsor message", "transcript provided by npr"]),
            category: "us".into(),
            enabled: true,
        },
        SourceConfig {
            id: "apnews".into(),
            name: "AP News".into(),
            base_url: "https://apnews.com".into(),
            feed_url: None,
            hosts: vec![],
            selectors: SelectorSet {
                title: list(&["h1.Page-headline", "div.CardHeadline h1"]),
                content: list(&["div.RichTextStoryBody", "div.Article"]),
                author: list(&["div.Page-authors a", "span.Component-bylines"]),
                date: list(&["bsp-timestamp[data-timestamp]", "span[data-key='timestamp']"]),
                image: list(&["div.Page-lead img"]),
                links: list(&["a[href*='/article/']"]),
            },
            title_suffixes: list(&[" | AP News"]),
            boilerplate: list(&["copyright 20", "this material may not be published"]),
            category: "us".into(),
            // The homepage answers bots with a consent wall more often than not.
            enabled: false,
        },
    ]
});

/// The built-in source table.
pub fn builtin() -> &'static [SourceConfig] {
    &BUILTIN
}

/// Configuration of the generic adapter: no site patterns beyond common
/// article-body markup, no suffixes, no feed.
pub fn generic() -> &'static SourceConfig {
    static GENERIC: Lazy<SourceConfig> = Lazy::new(|| SourceConfig {
        id: GENERIC_SOURCE_ID.into(),
        name: "Web".into(),
        base_url: "https://example.invalid".into(),
        feed_url: None,
        hosts: vec![],
        selectors: SelectorSet {
            title: list(&["article h1", "h1[itemprop='headline']"]),
            content: list(&[
                "[itemprop='articleBody']",
                "article .article-body",
                "div.article-content",
                "div.entry-content",
                "div.post-content",
            ]),
            author: list(&["[itemprop='author'] [itemprop='name']", "[rel='author']", ".byline", ".author"]),
            date: list(&["time[datetime]", "[itemprop='datePublished']"]),
            image: list(&["article img"]),
            links: list(&["article a[href]", "h2 a[href]", "h3 a[href]"]),
        },
        title_suffixes: vec![],
        boilerplate: vec![],
        category: "general".into(),
        enabled: true,
    });
    &GENERIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique() {
        let ids: HashSet<&str> = builtin().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), builtin().len());
        assert!(!ids.contains(GENERIC_SOURCE_ID));
    }

    #[test]
    fn test_every_builtin_selector_parses() {
        for source in builtin().iter().chain(std::iter::once(generic())) {
            let s = &source.selectors;
            for sel in s.title.iter().chain(&s.content).chain(&s.author).chain(&s.date).chain(&s.image).chain(&s.links) {
                assert!(Selector::parse(sel).is_ok(), "{}: bad selector {sel}", source.id);
            }
        }
    }

    #[test]
    fn test_builtin_urls_are_absolute() {
        for source in builtin() {
            assert!(url::Url::parse(&source.base_url).is_ok(), "{}", source.id);
            if let Some(feed) = &source.feed_url {
                assert!(url::Url::parse(feed).is_ok(), "{}", source.id);
            }
        }
    }
}
