//! Extraction adapters: raw markup in, normalized [`Article`] out.
//!
//! Every field is resolved independently by walking a fixed chain of
//! strategies, first success wins:
//!
//! 1. [`Strategy::Metadata`]: `<meta>` tags ([`metadata`]).
//! 2. [`Strategy::SitePattern`]: the source's selector lists ([`patterns`]).
//! 3. [`Strategy::EmbeddedData`]: JSON-LD article objects ([`embedded`]).
//! 4. [`Strategy::Heuristic`]: generic markup conventions ([`heuristic`]).
//! 5. [`Strategy::Placeholder`]: a synthetic value, or for the body a
//!    failure-flagged record.
//!
//! Nothing here raises. Unparseable selectors and JSON-LD blocks disqualify
//! their strategy and the chain moves on.

pub mod embedded;
pub mod heuristic;
pub mod metadata;
pub mod normalize;
pub mod patterns;

use crate::config::ExtractSettings;
use crate::error::FailureReason;
use crate::models::{Article, SourceConfig};
use crate::sources;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use embedded::EmbeddedArticle;
use metadata::PageMeta;
use normalize::{
    char_len, clean_text, join_authors, normalize_author, normalize_tags, normalize_title, parse_date,
    resolve_url, section_from_url, truncate_body, truncate_chars,
};
use scraper::Html;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const MAX_SECTION_CHARS: usize = 100;

/// Article field resolved by its own strategy chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Content,
    Author,
    Date,
    Image,
    Tags,
    Section,
}

/// Where a field value came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Metadata,
    SitePattern,
    EmbeddedData,
    Heuristic,
    Placeholder,
}

impl Strategy {
    /// How far a value produced by this strategy can be trusted, 0 to 1.
    pub fn confidence(self) -> f32 {
        match self {
            Strategy::Metadata => 0.9,
            Strategy::SitePattern => 0.8,
            Strategy::EmbeddedData => 0.7,
            Strategy::Heuristic => 0.4,
            Strategy::Placeholder => 0.0,
        }
    }
}

/// Result of running one strategy for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Found(T),
    NotFound,
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Outcome::Found(v),
            None => Outcome::NotFound,
        }
    }
}

/// One step of a field's chain, recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub field: Field,
    pub strategy: Strategy,
    pub confidence: f32,
    pub found: bool,
}

/// Ordered attempts for a single field. Strategies after the first hit are
/// never run.
struct Chain<'t, T> {
    field: Field,
    trace: &'t mut Vec<TraceEntry>,
    found: Option<T>,
}

impl<'t, T> Chain<'t, T> {
    fn new(field: Field, trace: &'t mut Vec<TraceEntry>) -> Self {
        Self {
            field,
            trace,
            found: None,
        }
    }

    fn then(mut self, strategy: Strategy, attempt: impl FnOnce() -> Outcome<T>) -> Self {
        if self.found.is_some() {
            return self;
        }
        let outcome = attempt();
        self.record(strategy, matches!(outcome, Outcome::Found(_)));
        if let Outcome::Found(value) = outcome {
            self.found = Some(value);
        }
        self
    }

    /// Terminal placeholder; returns the value and whether it was a real hit.
    fn or_placeholder(mut self, placeholder: impl FnOnce() -> T) -> (T, bool) {
        match self.found.take() {
            Some(value) => (value, true),
            None => {
                self.record(Strategy::Placeholder, true);
                (placeholder(), false)
            }
        }
    }

    fn finish(self) -> Option<T> {
        self.found
    }

    fn record(&mut self, strategy: Strategy, found: bool) {
        self.trace.push(TraceEntry {
            field: self.field,
            strategy,
            confidence: strategy.confidence(),
            found,
        });
    }
}

/// Diagnostics for one extraction: the markup, every strategy tried and the
/// resulting record. Scoped to a single URL and never persisted.
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    pub url: String,
    pub source_id: String,
    pub markup: String,
    pub trace: Vec<TraceEntry>,
    pub article: Article,
}

impl ExtractionAttempt {
    /// The strategy that produced `field`, if any ran successfully.
    pub fn winner(&self, field: Field) -> Option<Strategy> {
        self.trace
            .iter()
            .find(|entry| entry.field == field && entry.found)
            .map(|entry| entry.strategy)
    }

    pub fn markup_len(&self) -> usize {
        self.markup.len()
    }
}

/// Turns raw markup into an [`Article`] for one source configuration.
#[derive(Debug, Clone, Copy)]
pub struct Adapter<'a> {
    config: &'a SourceConfig,
    settings: ExtractSettings,
}

impl<'a> Adapter<'a> {
    pub fn new(config: &'a SourceConfig, settings: ExtractSettings) -> Self {
        Self { config, settings }
    }

    /// Adapter for URLs no known source claims.
    pub fn generic(settings: ExtractSettings) -> Adapter<'static> {
        Adapter::new(sources::generic(), settings)
    }

    pub fn source_id(&self) -> &str {
        &self.config.id
    }

    /// Extract an article, estimating the date as "now" when none parses.
    pub fn extract(&self, markup: &str, url: &str) -> Article {
        self.extract_at(markup, url, Utc::now())
    }

    /// As [`extract`](Self::extract) with an explicit clock, which makes the
    /// result reproducible apart from its `id`.
    pub fn extract_at(&self, markup: &str, url: &str, now: DateTime<Utc>) -> Article {
        self.attempt(markup, url, now).article
    }

    /// Parse `markup` and run every field chain, keeping the full trace.
    pub fn attempt(&self, markup: &str, url: &str, now: DateTime<Utc>) -> ExtractionAttempt {
        let document = Html::parse_document(markup);
        self.attempt_parsed(&document, markup, url, now)
    }

    /// As [`attempt`](Self::attempt) for markup the caller already parsed.
    #[instrument(level = "debug", skip(self, document, markup, now), fields(source = %self.config.id, bytes = markup.len()))]
    pub fn attempt_parsed(&self, document: &Html, markup: &str, url: &str, now: DateTime<Utc>) -> ExtractionAttempt {
        let meta = PageMeta::from_document(document);
        let embedded = EmbeddedArticle::from_document(document).unwrap_or_default();
        let selectors = &self.config.selectors;
        let settings = self.settings;
        let site_name = meta.site_name.as_deref().unwrap_or(&self.config.name);
        let mut trace = Vec::new();

        let title_of = |raw: &str| normalize_title(raw, &self.config.title_suffixes, site_name);
        let (title, _) = Chain::<String>::new(Field::Title, &mut trace)
            .then(Strategy::Metadata, || meta.title.as_deref().and_then(title_of).into())
            .then(Strategy::SitePattern, || {
                patterns::first_text(document, &selectors.title)
                    .and_then(|t| title_of(&t))
                    .into()
            })
            .then(Strategy::EmbeddedData, || embedded.headline.as_deref().and_then(title_of).into())
            .then(Strategy::Heuristic, || {
                heuristic::title(document, meta.document_title.as_deref())
                    .and_then(|t| title_of(&t))
                    .into()
            })
            .or_placeholder(|| format!("Untitled {} article", self.config.name));

        let content = Chain::<String>::new(Field::Content, &mut trace)
            .then(Strategy::SitePattern, || {
                patterns::body_text(document, &selectors.content, settings.min_content_chars, |p| {
                    heuristic::is_boilerplate(p, &self.config.boilerplate)
                })
                .into()
            })
            .then(Strategy::EmbeddedData, || {
                embedded
                    .body
                    .as_deref()
                    .map(clean_paragraphs)
                    .filter(|b| char_len(b) >= settings.min_content_chars)
                    .into()
            })
            .then(Strategy::Heuristic, || {
                heuristic::body_text(
                    document,
                    &self.config.boilerplate,
                    settings.min_fragment_chars,
                    settings.max_heuristic_fragments,
                    settings.min_content_chars,
                )
                .into()
            })
            .finish();

        let author_of = |raw: &str| normalize_author(raw, &self.config.name);
        let author = Chain::<String>::new(Field::Author, &mut trace)
            .then(Strategy::Metadata, || meta.author.as_deref().and_then(author_of).into())
            .then(Strategy::SitePattern, || {
                patterns::first_text(document, &selectors.author)
                    .and_then(|a| author_of(&a))
                    .into()
            })
            .then(Strategy::EmbeddedData, || {
                join_authors(&embedded.authors).and_then(|a| author_of(&a)).into()
            })
            .then(Strategy::Heuristic, || heuristic::author(document).and_then(|a| author_of(&a)).into())
            .finish();

        let (publish_date, date_parsed) = Chain::<DateTime<Utc>>::new(Field::Date, &mut trace)
            .then(Strategy::Metadata, || meta.published.as_deref().and_then(parse_date).into())
            .then(Strategy::SitePattern, || {
                patterns::first_attr(
                    document,
                    &selectors.date,
                    &["datetime", "data-datetime", "data-timestamp", "content"],
                    true,
                )
                .and_then(|d| parse_date(&d))
                .into()
            })
            .then(Strategy::EmbeddedData, || embedded.published.as_deref().and_then(parse_date).into())
            .then(Strategy::Heuristic, || heuristic::date(document).and_then(|d| parse_date(&d)).into())
            .or_placeholder(|| meta.modified.as_deref().and_then(parse_date).unwrap_or(now));

        let image_of = |raw: &str| resolve_url(url, raw);
        let image_url = Chain::<String>::new(Field::Image, &mut trace)
            .then(Strategy::Metadata, || meta.image.as_deref().and_then(image_of).into())
            .then(Strategy::SitePattern, || {
                patterns::first_attr(document, &selectors.image, &["src", "data-src", "srcset", "content"], false)
                    .and_then(|i| image_of(&i))
                    .into()
            })
            .then(Strategy::EmbeddedData, || embedded.image.as_deref().and_then(image_of).into())
            .then(Strategy::Heuristic, || heuristic::image(document).and_then(|i| image_of(&i)).into())
            .finish();

        let tags_of = |raw: Vec<String>| Some(normalize_tags(raw, settings.max_tags)).filter(|t| !t.is_empty());
        let tags = Chain::<Vec<String>>::new(Field::Tags, &mut trace)
            .then(Strategy::Metadata, || tags_of(meta.tags.clone()).into())
            .then(Strategy::EmbeddedData, || tags_of(embedded.keywords.clone()).into())
            .then(Strategy::Heuristic, || tags_of(heuristic::tags(document)).into())
            .finish()
            .unwrap_or_default();

        let section_of = |raw: &str| Some(truncate_chars(&clean_text(raw), MAX_SECTION_CHARS)).filter(|s| !s.is_empty());
        let section = Chain::<String>::new(Field::Section, &mut trace)
            .then(Strategy::Metadata, || meta.section.as_deref().and_then(section_of).into())
            .then(Strategy::EmbeddedData, || embedded.section.as_deref().and_then(section_of).into())
            .then(Strategy::Heuristic, || section_from_url(url).into())
            .or_placeholder(|| self.config.category.clone())
            .0;
        let section = Some(section).filter(|s| !s.is_empty());

        let mut article = Article {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title,
            content: String::new(),
            author,
            publish_date,
            date_estimated: !date_parsed,
            image_url,
            section,
            tags,
            source_id: self.config.id.clone(),
            failure: None,
        };

        match content {
            Some(body) => {
                article.content = truncate_body(&body, settings.max_content_chars, settings.min_content_chars);
                debug!(%url, title = %article.title, chars = char_len(&article.content), "Extracted article");
            }
            None => {
                let found = heuristic::body_text(
                    document,
                    &self.config.boilerplate,
                    settings.min_fragment_chars,
                    settings.max_heuristic_fragments,
                    0,
                )
                .map(|b| char_len(&b))
                .unwrap_or(0);
                let reason = FailureReason::InsufficientContent {
                    found,
                    required: settings.min_content_chars,
                };
                warn!(%url, %reason, markup = %truncate_for_log(markup, 200), "No strategy produced enough body text");
                article.content = failure_content(url, &reason);
                article.failure = Some(reason);
            }
        }

        ExtractionAttempt {
            url: url.to_string(),
            source_id: self.config.id.clone(),
            markup: markup.to_string(),
            trace,
            article,
        }
    }

    /// Failure-flagged record for a URL whose markup never arrived.
    pub fn failed(&self, url: &str, reason: FailureReason, now: DateTime<Utc>) -> Article {
        Article {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: format!("Untitled {} article", self.config.name),
            content: failure_content(url, &reason),
            author: None,
            publish_date: now,
            date_estimated: true,
            image_url: None,
            section: Some(self.config.category.clone()).filter(|c| !c.is_empty()),
            tags: Vec::new(),
            source_id: self.config.id.clone(),
            failure: Some(reason),
        }
    }
}

fn failure_content(url: &str, reason: &FailureReason) -> String {
    format!("Extraction failed for {url}: {reason}")
}

/// Normalize whitespace inside each line-delimited paragraph.
fn clean_paragraphs(raw: &str) -> String {
    raw.lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
