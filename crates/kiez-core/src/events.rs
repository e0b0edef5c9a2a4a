//! Job progress events and the in-process feed that distributes them.
//!
//! Replaces per-item realtime channels with a single broadcast feed: the
//! worker publishes every job status change, and each subscriber filters
//! down to the item it cares about. Subscriptions are explicit handles
//! with an idempotent `close()`, so a consumer can never leak a listener.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::JobStatus;

/// A single processing-job status change.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    pub job_id: Uuid,
    pub item_id: Uuid,
    pub status: JobStatus,
    /// Present only when `status` is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(job_id: Uuid, item_id: Uuid, status: JobStatus) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            job_id,
            item_id,
            status,
            error_message: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn failed(job_id: Uuid, item_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::new(job_id, item_id, JobStatus::Failed)
        }
    }
}

/// Broadcast feed of job status changes. Cheap to clone; all clones share
/// one channel.
#[derive(Debug, Clone)]
pub struct JobFeed {
    tx: broadcast::Sender<JobEvent>,
}

impl Default for JobFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

impl JobFeed {
    /// Create a feed with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a status change to all subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: JobEvent) {
        tracing::debug!(
            job_id = %event.job_id,
            item_id = %event.item_id,
            status = %event.status,
            subscriber_count = self.tx.receiver_count(),
            "job feed publish"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to status changes for one item. Events for other items
    /// are filtered out before delivery.
    pub fn subscribe_item(&self, item_id: Uuid) -> JobSubscription {
        JobSubscription {
            item_id,
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription to one item's job events.
///
/// Delivery is at-least-once per published event while the subscription is
/// open; a slow consumer that overflows the buffer observes a gap and
/// should re-read the job row. `close()` may be called any number of
/// times.
#[derive(Debug)]
pub struct JobSubscription {
    item_id: Uuid,
    rx: Option<broadcast::Receiver<JobEvent>>,
}

impl JobSubscription {
    pub fn item_id(&self) -> Uuid {
        self.item_id
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    /// Wait for the next event for this item. Returns `None` once the
    /// subscription is closed or the feed is gone. Buffer overflow is
    /// logged and skipped; the next matching event is still delivered.
    pub async fn next(&mut self) -> Option<JobEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) if event.item_id == self.item_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        item_id = %self.item_id,
                        skipped,
                        "job subscription lagged, events skipped"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Stop receiving events. Safe to call more than once.
    pub fn close(&mut self) {
        self.rx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let feed = JobFeed::new(32);
        let item_id = Uuid::new_v4();
        let mut sub = feed.subscribe_item(item_id);

        feed.publish(JobEvent::new(Uuid::new_v4(), item_id, JobStatus::Processing));
        let event = sub.next().await.unwrap();
        assert_eq!(event.item_id, item_id);
        assert_eq!(event.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_filters_other_items() {
        let feed = JobFeed::new(32);
        let item_id = Uuid::new_v4();
        let mut sub = feed.subscribe_item(item_id);

        feed.publish(JobEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            JobStatus::Completed,
        ));
        feed.publish(JobEvent::new(Uuid::new_v4(), item_id, JobStatus::Completed));

        let event = sub.next().await.unwrap();
        assert_eq!(event.item_id, item_id);
    }

    #[tokio::test]
    async fn test_independent_subscribers() {
        let feed = JobFeed::new(32);
        let item_id = Uuid::new_v4();
        let mut a = feed.subscribe_item(item_id);
        let mut b = feed.subscribe_item(item_id);

        feed.publish(JobEvent::new(Uuid::new_v4(), item_id, JobStatus::Pending));
        assert!(a.next().await.is_some());
        assert!(b.next().await.is_some());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let feed = JobFeed::new(32);
        let mut sub = feed.subscribe_item(Uuid::new_v4());
        assert!(!sub.is_closed());
        sub.close();
        sub.close();
        assert!(sub.is_closed());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let item_id = Uuid::new_v4();
        let mut sub = {
            let feed = JobFeed::new(32);
            feed.subscribe_item(item_id)
        };
        assert!(sub.next().await.is_none());
        assert!(sub.is_closed());
    }

    #[test]
    fn test_failed_event_carries_message() {
        let event = JobEvent::failed(Uuid::new_v4(), Uuid::new_v4(), "analysis failed");
        assert_eq!(event.status, JobStatus::Failed);
        assert_eq!(event.error_message.as_deref(), Some("analysis failed"));
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let feed = JobFeed::new(32);
        feed.publish(JobEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            JobStatus::Pending,
        ));
        assert_eq!(feed.subscriber_count(), 0);
    }
}
