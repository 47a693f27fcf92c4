//! Single-URL pipeline: classify, fetch, parse, extract.
//!
//! Used directly for one-off extraction and by the crawler for every
//! discovered link. Never fails: problems end up as failure-flagged
//! records, with the reason attached.

use crate::classify::SourceRegistry;
use crate::config::ExtractSettings;
use crate::error::FailureReason;
use crate::extract::Adapter;
use crate::fetch::FetchPlan;
use crate::models::{Article, SourceConfig};
use crate::progress::{ExtractionStage, ProgressBus, ProgressEvent};
use chrono::Utc;
use scraper::Html;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ArticlePipeline {
    plan: FetchPlan,
    registry: SourceRegistry,
    settings: ExtractSettings,
    bus: ProgressBus,
}

impl ArticlePipeline {
    pub fn new(plan: FetchPlan, registry: SourceRegistry, settings: ExtractSettings, bus: ProgressBus) -> Self {
        Self {
            plan,
            registry,
            settings,
            bus,
        }
    }

    pub fn plan(&self) -> &FetchPlan {
        &self.plan
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    /// Extract an ad-hoc URL, publishing a stage event at each transition.
    #[instrument(level = "info", skip(self))]
    pub async fn extract_url(&self, url: &str) -> Article {
        self.stage(url, ExtractionStage::Validating, None);
        let config = match self.registry.classify(url) {
            Ok(classification) => classification.config(),
            Err(error) => {
                warn!(%error, "Rejected URL");
                self.stage(url, ExtractionStage::Error, Some(error.to_string()));
                return Adapter::generic(self.settings).failed(url, FailureReason::Fetch { error }, Utc::now());
            }
        };
        let adapter = Adapter::new(config, self.settings);
        info!(source = %adapter.source_id(), "Classified URL");

        self.stage(url, ExtractionStage::Fetching, None);
        let markup = match self.plan.fetch_markup(url).await {
            Ok(markup) => markup,
            Err(error) => {
                warn!(%error, "Fetch failed");
                self.stage(url, ExtractionStage::Error, Some(error.to_string()));
                return adapter.failed(url, FailureReason::Fetch { error }, Utc::now());
            }
        };

        let article = self.parse_and_extract(&adapter, &markup, url);
        match &article.failure {
            Some(reason) => self.stage(url, ExtractionStage::Error, Some(reason.to_string())),
            None => self.stage(url, ExtractionStage::Complete, None),
        }
        article
    }

    /// Fetch and extract a link already attributed to `source`. Publishes
    /// nothing; the crawler reports per-source progress instead.
    #[instrument(level = "debug", skip(self, source), fields(source = %source.id))]
    pub async fn fetch_and_extract(&self, url: &str, source: &SourceConfig) -> Article {
        let adapter = Adapter::new(source, self.settings);
        match self.plan.fetch_markup(url).await {
            Ok(markup) => adapter.extract(&markup, url),
            Err(error) => adapter.failed(url, FailureReason::Fetch { error }, Utc::now()),
        }
    }

    // Kept synchronous: the parsed document must not live across an await.
    fn parse_and_extract(&self, adapter: &Adapter<'_>, markup: &str, url: &str) -> Article {
        self.stage(url, ExtractionStage::Parsing, None);
        let document = Html::parse_document(markup);
        self.stage(url, ExtractionStage::Extracting, None);
        adapter.attempt_parsed(&document, markup, url, Utc::now()).article
    }

    fn stage(&self, url: &str, stage: ExtractionStage, message: Option<String>) {
        self.bus.publish(ProgressEvent::Extraction {
            url: url.to_string(),
            stage,
            progress: stage.percent(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::testing::{Canned, FakeTransport};
    use crate::fetch::FetchGateway;
    use crate::sources;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const ARTICLE: &str = r#"<html><head><meta property="og:title" content="Harbour reopens"></head><body>
        <article><p>The harbour reopened to shipping on Monday after weeks of repairs to the sea wall.</p>
        <p>Officials said traffic would return to normal levels by the end of the month.</p></article>
        </body></html>"#;

    fn pipeline(t: FakeTransport) -> (ArticlePipeline, Arc<Mutex<Vec<ExtractionStage>>>) {
        let plan = FetchPlan::new(FetchGateway::new(Arc::new(t)), Duration::from_secs(1));
        let bus = ProgressBus::new();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        bus.subscribe(move |e| {
            if let ProgressEvent::Extraction { stage, .. } = e {
                sink.lock().unwrap().push(*stage);
            }
        });
        let p = ArticlePipeline::new(plan, SourceRegistry::default(), ExtractSettings::default(), bus);
        (p, stages)
    }

    #[tokio::test]
    async fn test_extract_url_reports_every_stage() {
        let (p, stages) = pipeline(FakeTransport::new("fake").body("https://blog.example.org/harbour", ARTICLE));
        let article = p.extract_url("https://blog.example.org/harbour").await;
        assert!(!article.is_failed());
        assert_eq!(article.title, "Harbour reopens");
        assert_eq!(article.source_id, sources::GENERIC_SOURCE_ID);
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                ExtractionStage::Validating,
                ExtractionStage::Fetching,
                ExtractionStage::Parsing,
                ExtractionStage::Extracting,
                ExtractionStage::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_failure_record() {
        let (p, stages) = pipeline(FakeTransport::new("fake"));
        let article = p.extract_url("ftp://files.example/x").await;
        assert!(matches!(
            article.failure,
            Some(FailureReason::Fetch { error: FetchError::InvalidUrl(_) })
        ));
        assert_eq!(article.url, "ftp://files.example/x");
        assert_eq!(*stages.lock().unwrap(), vec![ExtractionStage::Validating, ExtractionStage::Error]);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_source_attribution() {
        let t = FakeTransport::new("fake").route(
            "https://www.bbc.co.uk/news/articles/c1",
            Canned::Fail(FetchError::Timeout(Duration::from_millis(10))),
        );
        let (p, stages) = pipeline(t);
        let article = p.extract_url("https://www.bbc.co.uk/news/articles/c1").await;
        assert!(article.is_failed());
        assert_eq!(article.source_id, "bbc");
        assert_eq!(stages.lock().unwrap().last(), Some(&ExtractionStage::Error));
    }

    #[tokio::test]
    async fn test_thin_page_ends_in_error_stage() {
        let (p, stages) = pipeline(FakeTransport::new("fake").body("https://blog.example.org/x", "<p>hi</p>"));
        let article = p.extract_url("https://blog.example.org/x").await;
        assert!(matches!(article.failure, Some(FailureReason::InsufficientContent { .. })));
        assert_eq!(stages.lock().unwrap().last(), Some(&ExtractionStage::Error));
    }
}
