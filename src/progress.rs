//! In-process progress bus.
//!
//! Handlers run synchronously on the publishing task, in subscription
//! order. The handler list is copied before each publish, so a handler may
//! subscribe or unsubscribe (itself or others) without affecting delivery
//! of the event in flight. Subscribers only see events published after they
//! joined.

use crate::models::CrawlProgress;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Stage of a single-URL extraction, with its nominal completion percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Validating,
    Fetching,
    Parsing,
    Extracting,
    Complete,
    Error,
}

impl ExtractionStage {
    pub fn percent(self) -> u8 {
        match self {
            ExtractionStage::Validating => 5,
            ExtractionStage::Fetching => 25,
            ExtractionStage::Parsing => 55,
            ExtractionStage::Extracting => 80,
            ExtractionStage::Complete | ExtractionStage::Error => 100,
        }
    }
}

/// Everything published on the bus. Source events always carry the full
/// current snapshot for that source, never a diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Initial snapshot of every source in the batch, all `pending`.
    BatchStarted { sources: Vec<CrawlProgress> },
    Source(CrawlProgress),
    Extraction {
        url: String,
        stage: ExtractionStage,
        progress: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    BatchCompleted { articles: usize },
    BatchCancelled,
}

type Handler = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// Cloneable handle to one bus; clones share subscribers.
#[derive(Clone, Default)]
pub struct ProgressBus {
    inner: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ProgressBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Returned by [`ProgressBus::subscribe`]. Dropping it keeps the handler
/// registered; call [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the handler. Safe to call from inside a handler, and a no-op
    /// once the bus is gone.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.bus.upgrade() {
            let mut registry = inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry.handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.push((id, Arc::new(handler)));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every handler registered at the time of the call.
    pub fn publish(&self, event: ProgressEvent) {
        let handlers: Vec<Handler> = self.lock().handlers.iter().map(|(_, h)| Arc::clone(h)).collect();
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&ProgressEvent) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = Arc::clone(&log);
        let make = move |name: &str| -> Box<dyn Fn(&ProgressEvent) + Send + Sync> {
            let log = Arc::clone(&log2);
            let name = name.to_string();
            Box::new(move |_e: &ProgressEvent| log.lock().unwrap().push(name.clone()))
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = ProgressBus::new();
        let (log, make) = recorder();
        bus.subscribe(make("a"));
        bus.subscribe(make("b"));
        bus.subscribe(make("c"));
        bus.publish(ProgressEvent::BatchCancelled);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_late_subscriber_sees_only_future_events() {
        let bus = ProgressBus::new();
        bus.publish(ProgressEvent::BatchCompleted { articles: 1 });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        bus.publish(ProgressEvent::BatchCompleted { articles: 2 });
        assert_eq!(*seen.lock().unwrap(), vec![ProgressEvent::BatchCompleted { articles: 2 }]);
    }

    #[test]
    fn test_unsubscribe_during_publish_does_not_skip_others() {
        let bus = ProgressBus::new();
        let (log, make) = recorder();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot2 = Arc::clone(&slot);
        let first = make("first");
        let sub = bus.subscribe(move |e| {
            first(e);
            if let Some(s) = slot2.lock().unwrap().as_ref() {
                s.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);
        bus.subscribe(make("second"));

        bus.publish(ProgressEvent::BatchCancelled);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(ProgressEvent::BatchCancelled);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "second"]);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = ProgressBus::new();
        let (log, make) = recorder();
        bus.subscribe(make("x"));
        bus.clone().publish(ProgressEvent::BatchCancelled);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ProgressEvent::Source(CrawlProgress::pending("bbc"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "source");
        assert_eq!(json["sourceId"], "bbc");
        assert_eq!(json["status"], "pending");

        let stage = ProgressEvent::Extraction {
            url: "https://x.example/".into(),
            stage: ExtractionStage::Parsing,
            progress: ExtractionStage::Parsing.percent(),
            message: None,
        };
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["stage"], "parsing");
        assert_eq!(json["progress"], 55);
        assert!(json.get("message").is_none());
    }
}
