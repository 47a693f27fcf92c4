//! Structured page metadata: `<meta>` tags (Open Graph, Twitter cards,
//! article:*, Parse.ly, Dublin Core) and `<title>`.

use scraper::{Html, Selector};

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title", "parsely-title", "sailthru.title", "title"];
const AUTHOR_KEYS: &[&str] = &["author", "article:author", "byl", "parsely-author", "sailthru.author", "dc.creator"];
const PUBLISHED_KEYS: &[&str] = &[
    "article:published_time",
    "datepublished",
    "parsely-pub-date",
    "sailthru.date",
    "pubdate",
    "publishdate",
    "dc.date",
    "date",
];
/// Last-change timestamps; never a publication date, only a better estimate
/// than the extraction time.
const MODIFIED_KEYS: &[&str] = &["article:modified_time", "og:updated_time", "datemodified", "last-modified"];
const IMAGE_KEYS: &[&str] = &["og:image", "og:image:url", "og:image:secure_url", "twitter:image", "twitter:image:src"];
const SECTION_KEYS: &[&str] = &["article:section", "parsely-section", "section"];
const TAG_KEYS: &[&str] = &["article:tag", "news_keywords", "keywords", "parsely-tags"];

/// Everything the page declares about itself in `<meta>` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub modified: Option<String>,
    pub image: Option<String>,
    pub section: Option<String>,
    pub site_name: Option<String>,
    /// Raw tag values in document order; may contain comma-joined lists.
    pub tags: Vec<String>,
    /// Text of the `<title>` element, kept separately: it is a heuristic
    /// source, not declared metadata.
    pub document_title: Option<String>,
}

impl PageMeta {
    pub fn from_document(document: &Html) -> Self {
        let pairs = meta_pairs(document);
        let first = |keys: &[&str]| -> Option<String> {
            keys.iter().find_map(|key| {
                pairs
                    .iter()
                    .find(|(k, v)| k == key && !v.trim().is_empty())
                    .map(|(_, v)| v.trim().to_string())
            })
        };

        let tags = pairs
            .iter()
            .filter(|(k, _)| TAG_KEYS.contains(&k.as_str()))
            .map(|(_, v)| v.clone())
            .collect();

        let document_title = Selector::parse("head title").ok().and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
        });

        PageMeta {
            title: first(TITLE_KEYS),
            author: first(AUTHOR_KEYS),
            published: first(PUBLISHED_KEYS),
            modified: first(MODIFIED_KEYS),
            image: first(IMAGE_KEYS),
            section: first(SECTION_KEYS),
            site_name: first(&["og:site_name", "application-name"]),
            tags,
            document_title,
        }
    }
}

/// `(key, content)` for every `<meta>` carrying `property`, `name` or
/// `itemprop` plus `content`. Keys are lower-cased.
fn meta_pairs(document: &Html) -> Vec<(String, String)> {
    let Ok(selector) = Selector::parse("meta[content]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| {
            let attrs = el.value();
            let key = attrs
                .attr("property")
                .or_else(|| attrs.attr("name"))
                .or_else(|| attrs.attr("itemprop"))?;
            let content = attrs.attr("content")?;
            Some((key.trim().to_ascii_lowercase(), content.to_string()))
        })
        .collect()
}
