//! In-process event broadcast.
//!
//! One broadcast channel per job plus a wildcard channel that carries every
//! event. Delivery is fire-and-forget: an event published with no
//! subscribers is lost, and a subscriber that lags behind the channel
//! capacity loses the oldest events rather than blocking the publisher.
//! Nothing is replayed to late subscribers.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use tgrab_models::{DownloadEvent, DownloadId};

/// Buffered events per subscriber before lag kicks in.
pub const CHANNEL_CAPACITY: usize = 256;

/// Broadcast fan-out keyed by job ID.
pub struct EventBus {
    channels: RwLock<HashMap<DownloadId, broadcast::Sender<DownloadEvent>>>,
    wildcard: broadcast::Sender<DownloadEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (wildcard, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            channels: RwLock::new(HashMap::new()),
            wildcard,
        }
    }

    /// Subscribe to one job's events from this moment on.
    ///
    /// The channel is created on demand so a client may attach before the
    /// job itself is registered.
    pub async fn subscribe(&self, id: &DownloadId) -> broadcast::Receiver<DownloadEvent> {
        if let Some(sender) = self.channels.read().await.get(id) {
            return sender.subscribe();
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Subscribe to every job's events.
    pub async fn subscribe_all(&self) -> broadcast::Receiver<DownloadEvent> {
        self.wildcard.subscribe()
    }

    /// Deliver an event to the job's subscribers and the wildcard set.
    pub async fn publish(&self, event: DownloadEvent) {
        let id = event.download_id().clone();

        let delivered = {
            let channels = self.channels.read().await;
            match channels.get(&id) {
                // send only fails when nobody is listening
                Some(sender) => sender.send(event.clone()).is_ok(),
                None => false,
            }
        };

        if !delivered {
            debug!(job_id = %id, kind = event.event_type().as_str(), "Event published with no subscribers");
        }

        let _ = self.wildcard.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgrab_models::ProgressUpdate;

    fn progress(id: &DownloadId, percent: f64) -> DownloadEvent {
        DownloadEvent::progress(id.clone(), ProgressUpdate::new(percent))
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let id = DownloadId::from_string("job-1");

        let mut rx = bus.subscribe(&id).await;
        bus.publish(progress(&id, 10.0)).await;
        bus.publish(progress(&id, 20.0)).await;

        match rx.recv().await.unwrap() {
            DownloadEvent::Progress { progress, .. } => assert_eq!(progress, 10.0),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            DownloadEvent::Progress { progress, .. } => assert_eq!(progress, 20.0),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscribers() {
        let bus = EventBus::new();
        let id = DownloadId::from_string("job-1");

        bus.publish(progress(&id, 50.0)).await;

        let mut rx = bus.subscribe(&id).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_before_any_publish_is_allowed() {
        let bus = EventBus::new();
        let id = DownloadId::from_string("job-early");

        // channel exists before the job does
        let mut rx = bus.subscribe(&id).await;
        bus.publish(DownloadEvent::log(id.clone(), "hello")).await;

        match rx.recv().await.unwrap() {
            DownloadEvent::Log { message, .. } => assert_eq!(message, "hello"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wildcard_sees_all_jobs() {
        let bus = EventBus::new();
        let a = DownloadId::from_string("job-a");
        let b = DownloadId::from_string("job-b");

        let mut all = bus.subscribe_all().await;
        bus.publish(DownloadEvent::log(a.clone(), "from a")).await;
        bus.publish(DownloadEvent::log(b.clone(), "from b")).await;

        assert_eq!(all.recv().await.unwrap().download_id(), &a);
        assert_eq!(all.recv().await.unwrap().download_id(), &b);
    }

    #[tokio::test]
    async fn test_streams_of_distinct_jobs_do_not_cross() {
        let bus = EventBus::new();
        let a = DownloadId::from_string("job-a");
        let b = DownloadId::from_string("job-b");

        let mut rx_a = bus.subscribe(&a).await;
        bus.publish(DownloadEvent::log(b.clone(), "for b only")).await;

        assert!(matches!(
            rx_a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
