//! # Newsreel
//!
//! Fetch articles from news sites that do not want to be fetched, and reduce
//! each page to a normalized [`Article`] record.
//!
//! ## Architecture
//!
//! 1. **Fetch** ([`fetch`]): validated GETs with a hard deadline through a
//!    pluggable transport, direct or via an indirection service, with one
//!    fallback retry on transient failures.
//! 2. **Classify** ([`classify`]): map a URL to its [`SourceConfig`] by host,
//!    or to the generic configuration.
//! 3. **Extract** ([`extract`]): per-field fallback chains of site selectors,
//!    page metadata, embedded JSON-LD and content heuristics. Never fails; an
//!    unusable page yields a failure-flagged record.
//! 4. **Crawl** ([`crawler`]): discover links per source ([`feed`]), then
//!    extract them in bounded-concurrency groups, publishing progress on the
//!    [`ProgressBus`](progress::ProgressBus).
//! 5. **Output** ([`outputs`]): dated JSON editions.

pub mod classify;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod progress;
pub mod sources;
pub mod utils;

pub use classify::{Classification, SourceRegistry};
pub use config::Settings;
pub use crawler::{CrawlOrchestrator, StopHandle};
pub use error::{CrawlError, FailureReason, FetchError};
pub use extract::Adapter;
pub use models::{Article, CrawlProgress, CrawlStatus, Edition, SourceConfig};
pub use pipeline::ArticlePipeline;
pub use progress::{ProgressBus, ProgressEvent};
