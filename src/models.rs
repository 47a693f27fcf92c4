//! Data models shared across the pipeline.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`Article`]: the normalized record produced by every extraction
//! - [`SourceConfig`]: immutable description of a known news site
//! - [`SelectorSet`]: ordered selector strategies per article field
//! - [`CrawlProgress`]: per-source progress snapshot published during a batch
//! - [`Edition`]: one run's output, as written to disk
//!
//! Field names serialize as camelCase to match what downstream consumers of
//! the JSON output expect.

use crate::error::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A normalized article as produced by an extraction adapter.
///
/// Successful records always carry a non-empty `title` and a `content` of at
/// least the configured minimum length. Records produced by the terminal
/// fallback carry `failure` and must be filtered out by callers that only
/// want real articles (see [`Article::is_failed`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Opaque identifier, unique per extraction attempt.
    pub id: String,
    pub url: String,
    pub title: String,
    /// Plain text body, capped to the configured maximum length.
    pub content: String,
    pub author: Option<String>,
    /// Best-effort publication time; the page's last-modified time or the
    /// extraction time when no publication date parsed.
    pub publish_date: DateTime<Utc>,
    /// `true` when `publish_date` is not a declared publication date.
    #[serde(default)]
    pub date_estimated: bool,
    pub image_url: Option<String>,
    pub section: Option<String>,
    /// Ordered, case-insensitively de-duplicated.
    pub tags: Vec<String>,
    /// Identifier of the source configuration (or `generic`) that produced it.
    pub source_id: String,
    /// Present only on failure-flagged records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl Article {
    /// Whether this record is a failure placeholder rather than a real article.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Ordered selector strategies for each article field.
///
/// Every list is tried front to back; the first selector yielding a usable
/// value wins. Selectors are CSS selectors understood by the `scraper` crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    pub title: Vec<String>,
    pub content: Vec<String>,
    pub author: Vec<String>,
    pub date: Vec<String>,
    pub image: Vec<String>,
    /// Selectors for `<a href>` elements pointing at candidate articles.
    pub links: Vec<String>,
}

/// Static description of a known news site.
///
/// Built once at startup (either from the built-in table in
/// [`crate::sources`] or from the settings file) and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Extra hostnames served by this source, besides the host of `base_url`.
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub selectors: SelectorSet,
    /// Suffixes the site appends to page titles, e.g. `" - BBC News"`.
    #[serde(default)]
    pub title_suffixes: Vec<String>,
    /// Site-specific boilerplate phrases rejected by the generic heuristic.
    #[serde(default)]
    pub boilerplate: Vec<String>,
    pub category: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SourceConfig {
    /// All hostnames this source answers for, lower-cased, without `www.`.
    pub fn host_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(strip_www))
            .into_iter()
            .collect();
        for host in &self.hosts {
            let host = strip_www(host);
            if !patterns.contains(&host) {
                patterns.push(host);
            }
        }
        patterns
    }

    /// Whether `host` belongs to this source, allowing subdomains.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.host_patterns()
            .iter()
            .any(|p| host == *p || host.ends_with(&format!(".{p}")))
    }
}

fn strip_www(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Lifecycle of one source inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Pending,
    Crawling,
    Completed,
    Error,
}

impl CrawlStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CrawlStatus::Completed | CrawlStatus::Error)
    }
}

/// Progress snapshot for one source in a batch.
///
/// Only the worker running `source_id` ever writes this entry; subscribers
/// receive full clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub source_id: String,
    pub status: CrawlStatus,
    /// 0 to 100.
    pub progress: u8,
    pub articles_found: usize,
    pub articles_processed: usize,
    pub error: Option<String>,
}

impl CrawlProgress {
    pub fn pending(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: CrawlStatus::Pending,
            progress: 0,
            articles_found: 0,
            articles_processed: 0,
            error: None,
        }
    }
}

/// Output of one run: the articles plus how each source fared.
///
/// `local_date`, `local_time` and `time_of_day` locate the edition in the
/// output tree (`{dir}/{local_date}/{time_of_day}.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edition {
    pub local_date: String,
    pub local_time: String,
    pub time_of_day: String,
    pub articles: Vec<Article>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<CrawlProgress>,
}
