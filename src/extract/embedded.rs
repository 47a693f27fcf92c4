//! Machine-readable article data embedded in the page as JSON-LD.
//!
//! Pages often carry several `<script type="application/ld+json">` blocks
//! (breadcrumbs, organization, the article itself), sometimes nested in a
//! `@graph` or wrapped in an array. A block that fails to parse is skipped;
//! it only disqualifies itself, never the extraction.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

const ARTICLE_TYPES: &[&str] = &[
    "NewsArticle",
    "Article",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "OpinionNewsArticle",
    "BackgroundNewsArticle",
    "BlogPosting",
    "LiveBlogPosting",
    "Report",
];

/// The article object found in the page's JSON-LD, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedArticle {
    pub headline: Option<String>,
    pub body: Option<String>,
    pub authors: Vec<String>,
    pub published: Option<String>,
    pub image: Option<String>,
    pub keywords: Vec<String>,
    pub section: Option<String>,
}

impl EmbeddedArticle {
    /// Find the first article-typed JSON-LD object in the document.
    pub fn from_document(document: &Html) -> Option<Self> {
        let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
        document.select(&selector).find_map(|script| {
            let raw = script.text().collect::<String>();
            match parse_block(&raw) {
                Ok(value) => find_article(&value).map(Self::from_value),
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable JSON-LD block");
                    None
                }
            }
        })
    }

    fn from_value(obj: &Value) -> Self {
        EmbeddedArticle {
            headline: string_field(obj, "headline").or_else(|| string_field(obj, "name")),
            body: string_field(obj, "articleBody").or_else(|| string_field(obj, "text")),
            authors: names(obj.get("author")),
            published: string_field(obj, "datePublished").or_else(|| string_field(obj, "dateCreated")),
            image: image_url(obj.get("image")),
            keywords: strings(obj.get("keywords")),
            section: strings(obj.get("articleSection")).into_iter().next(),
        }
    }
}

fn parse_block(raw: &str) -> Result<Value, serde_json::Error> {
    let trimmed = raw
        .trim()
        .trim_start_matches("//<![CDATA[")
        .trim_end_matches("//]]>")
        .trim()
        .trim_end_matches(';');
    serde_json::from_str(trimmed)
}

fn is_article(obj: &Value) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

fn find_article(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_article),
        Value::Object(map) => {
            if is_article(value) {
                return Some(value);
            }
            map.get("@graph")
                .or_else(|| map.get("mainEntity"))
                .and_then(find_article)
        }
        _ => None,
    }
}

fn string_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Author may be a string, an object with `name`, or an array of either.
fn names(value: Option<&Value>) -> Vec<String> {
    let found: Vec<String> = match value {
        Some(Value::String(s)) => vec![s.trim().to_string()],
        Some(Value::Object(_)) => value
            .and_then(|v| string_field(v, "name"))
            .into_iter()
            .collect(),
        Some(Value::Array(items)) => items.iter().flat_map(|item| names(Some(item))).collect(),
        _ => Vec::new(),
    };
    found.into_iter().filter(|n| !n.is_empty()).collect()
}

/// Image may be a URL string, an `ImageObject` with `url`, or an array.
fn image_url(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        obj @ Value::Object(_) => string_field(obj, "url").or_else(|| string_field(obj, "contentUrl")),
        Value::Array(items) => items.iter().find_map(|item| image_url(Some(item))),
        _ => None,
    }
}

fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
