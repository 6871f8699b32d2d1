//! Producer pipeline: normalizer output in, broker messages out.

use crate::publisher::{EventPublisher, PublishError, PublishReceipt};
use crate::recent_events::RecentEventCache;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use shared_types::{NormalizedEvent, ValidationError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one submitted event.
#[derive(Debug)]
pub enum SubmitOutcome {
    Published(PublishReceipt),
    /// Already published within the dedup window.
    Skipped,
    /// Violates the event contract; never sent.
    Rejected(ValidationError),
    Failed(PublishError),
}

/// Totals for one [`ProducerPipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub published: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Feeds normalized events to an [`EventPublisher`], skipping ids it
/// published recently.
///
/// An id is only remembered after a successful publish, so an event whose
/// retries were exhausted is published again if the chain source re-emits it.
pub struct ProducerPipeline {
    publisher: Arc<EventPublisher>,
    recent: Mutex<RecentEventCache>,
}

impl ProducerPipeline {
    pub fn new(publisher: Arc<EventPublisher>) -> Self {
        Self::with_cache(publisher, RecentEventCache::new())
    }

    pub fn with_cache(publisher: Arc<EventPublisher>, cache: RecentEventCache) -> Self {
        Self {
            publisher,
            recent: Mutex::new(cache),
        }
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Publish one event unless it was published recently.
    pub async fn submit(&self, event: NormalizedEvent) -> SubmitOutcome {
        if let Err(e) = event.validate() {
            warn!(event_id = %event.event_id, error = %e, "Rejecting invalid event");
            return SubmitOutcome::Rejected(e);
        }
        if self.recent.lock().contains(&event.event_id) {
            debug!(event_id = %event.event_id, "Duplicate event skipped");
            return SubmitOutcome::Skipped;
        }

        match self.publisher.publish(&event).await {
            Ok(receipt) => {
                self.recent.lock().record(&event.event_id);
                SubmitOutcome::Published(receipt)
            }
            Err(e) => SubmitOutcome::Failed(e),
        }
    }

    /// Drain `events` in order; a failed event never stops the stream.
    pub async fn run<S>(&self, events: S) -> ProducerStats
    where
        S: Stream<Item = NormalizedEvent> + Send,
    {
        let mut stats = ProducerStats::default();
        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            match self.submit(event).await {
                SubmitOutcome::Published(_) => stats.published += 1,
                SubmitOutcome::Skipped => stats.skipped += 1,
                SubmitOutcome::Rejected(_) => stats.rejected += 1,
                SubmitOutcome::Failed(_) => stats.failed += 1,
            }
        }

        info!(
            published = stats.published,
            skipped = stats.skipped,
            rejected = stats.rejected,
            failed = stats.failed,
            "Producer stream finished"
        );
        stats
    }
}
