//! Source classification: which adapter handles a URL.
//!
//! Classification is a pure function of the URL's hostname against an
//! immutable [`SourceRegistry`]. Matching is case-insensitive and accepts
//! subdomains (`feeds.bbci.co.uk` does not match `bbc.co.uk`, but
//! `www.bbc.co.uk` and `m.bbc.co.uk` do). Disabled sources never match.

use crate::error::FetchError;
use crate::fetch::validate_url;
use crate::models::SourceConfig;
use crate::sources;
use std::sync::Arc;

/// Result of classifying a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Known(&'a SourceConfig),
    Generic,
}

impl<'a> Classification<'a> {
    /// The configuration driving the adapter for this classification.
    pub fn config(&self) -> &'a SourceConfig {
        match self {
            Classification::Known(config) => config,
            Classification::Generic => sources::generic(),
        }
    }

    pub fn source_id(&self) -> &'a str {
        &self.config().id
    }
}

/// Immutable, cheaply clonable table of known sources.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Arc<[SourceConfig]>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(sources::builtin().to_vec())
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    /// Built-in table plus `extra` entries. An extra entry replaces a
    /// built-in one with the same id.
    pub fn with_extra(extra: Vec<SourceConfig>) -> Self {
        let mut all: Vec<SourceConfig> = sources::builtin()
            .iter()
            .filter(|b| !extra.iter().any(|e| e.id == b.id))
            .cloned()
            .collect();
        all.extend(extra);
        Self::new(all)
    }

    pub fn all(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn get(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Map `url` to the source that serves it, or to the generic adapter.
    ///
    /// Malformed or non-HTTP URLs are reported as [`FetchError::InvalidUrl`]
    /// and should be treated as ineligible by the caller.
    pub fn classify(&self, url: &str) -> Result<Classification<'_>, FetchError> {
        let parsed = validate_url(url)?;
        let host = parsed.host_str().unwrap_or_default();
        Ok(self
            .enabled()
            .find(|s| s.matches_host(host))
            .map(Classification::Known)
            .unwrap_or(Classification::Generic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_sources() {
        let registry = SourceRegistry::default();
        assert_eq!(registry.classify("https://www.bbc.co.uk/news/articles/c1").unwrap().source_id(), "bbc");
        assert_eq!(registry.classify("https://edition.cnn.com/2024/03/01/x").unwrap().source_id(), "cnn");
        assert_eq!(registry.classify("HTTPS://WWW.NYTIMES.COM/2024/a.html").unwrap().source_id(), "nytimes");
        assert_eq!(registry.classify("https://amp.theguardian.com/world/x").unwrap().source_id(), "guardian");
    }

    #[test]
    fn test_unknown_host_is_generic() {
        let registry = SourceRegistry::default();
        let c = registry.classify("https://blog.example.org/post/1").unwrap();
        assert_eq!(c, Classification::Generic);
        assert_eq!(c.source_id(), sources::GENERIC_SOURCE_ID);
    }

    #[test]
    fn test_lookalike_host_is_generic() {
        let registry = SourceRegistry::default();
        assert_eq!(registry.classify("https://notcnn.com/story").unwrap(), Classification::Generic);
        assert_eq!(registry.classify("https://cnn.com.attacker.net/story").unwrap(), Classification::Generic);
    }

    #[test]
    fn test_malformed_url_is_invalid_not_panic() {
        let registry = SourceRegistry::default();
        for bad in ["", "::::", "javascript:alert(1)", "ftp://bbc.co.uk/x", "www.bbc.co.uk/news"] {
            assert!(matches!(registry.classify(bad), Err(FetchError::InvalidUrl(_))), "{bad}");
        }
    }

    #[test]
    fn test_disabled_source_falls_back_to_generic() {
        let registry = SourceRegistry::default();
        assert!(!registry.get("apnews").unwrap().enabled);
        assert_eq!(registry.classify("https://apnews.com/article/x").unwrap(), Classification::Generic);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let registry = SourceRegistry::default();
        let url = "https://www.reuters.com/world/some-story-2024-03-01/";
        let first = registry.classify(url).unwrap().source_id();
        for _ in 0..10 {
            assert_eq!(registry.classify(url).unwrap().source_id(), first);
        }
    }

    #[test]
    fn test_extra_source_overrides_builtin() {
        let mut bbc = sources::builtin()[0].clone();
        bbc.name = "Beeb".into();
        let registry = SourceRegistry::with_extra(vec![bbc]);
        assert_eq!(registry.all().len(), sources::builtin().len());
        assert_eq!(registry.get("bbc").unwrap().name, "Beeb");
    }
}
