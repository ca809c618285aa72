//! Job registry.
//!
//! Tracks one record per download job and owns the event bus. All event
//! publishing goes through the registry so the terminal invariant can be
//! enforced in one place: once a job has completed or failed, further
//! publishes for that ID are dropped with a warning.
//!
//! Publishes happen while the job map lock is held, so a terminal event can
//! never overtake an in-flight progress event for the same job.

use std::collections::HashMap;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, warn};

use tgrab_models::{
    ArtifactFile, DownloadEvent, DownloadId, DownloadJob, ProgressUpdate,
};

use crate::bus::EventBus;
use crate::error::{EventError, EventResult};

struct Entry {
    job: DownloadJob,
    cancel: watch::Sender<bool>,
}

/// Registry of in-flight and finished jobs. Cheap to share behind an `Arc`.
pub struct JobRegistry {
    entries: RwLock<HashMap<DownloadId, Entry>>,
    bus: EventBus,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            bus: EventBus::new(),
        }
    }

    /// Track a new job. The job keeps whatever state it was built with.
    pub async fn register(&self, job: DownloadJob) -> DownloadId {
        let id = job.id.clone();
        let (cancel, _) = watch::channel(false);

        let mut entries = self.entries.write().await;
        entries.insert(id.clone(), Entry { job, cancel });
        debug!(job_id = %id, "Job registered");
        id
    }

    /// Clone of the current job record.
    pub async fn snapshot(&self, id: &DownloadId) -> Option<DownloadJob> {
        self.entries.read().await.get(id).map(|e| e.job.clone())
    }

    /// Transition the job into its first extraction attempt.
    pub async fn mark_started(&self, id: &DownloadId) -> EventResult<()> {
        self.update(id, |job| job.start()).await
    }

    /// Record which strategy index is being attempted.
    pub async fn set_strategy(&self, id: &DownloadId, index: usize) -> EventResult<()> {
        self.update(id, |job| job.with_strategy(index)).await
    }

    async fn update(
        &self,
        id: &DownloadId,
        f: impl FnOnce(DownloadJob) -> DownloadJob,
    ) -> EventResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| EventError::job_not_found(id.as_str()))?;
        entry.job = f(entry.job.clone());
        Ok(())
    }

    /// Watch handle that flips to `true` when the job is cancelled.
    pub async fn cancel_token(&self, id: &DownloadId) -> Option<watch::Receiver<bool>> {
        self.entries.read().await.get(id).map(|e| e.cancel.subscribe())
    }

    /// Request cancellation. Returns `false` when the job is unknown or
    /// already terminal.
    pub async fn cancel(&self, id: &DownloadId) -> bool {
        let entries = self.entries.read().await;
        match entries.get(id) {
            Some(entry) if !entry.job.state.is_terminal() => {
                entry.cancel.send_replace(true);
                true
            }
            _ => false,
        }
    }

    /// Broadcast a raw log line for a job.
    pub async fn publish_log(&self, id: &DownloadId, message: impl Into<String>) {
        self.publish_live(id, DownloadEvent::log(id.clone(), message))
            .await;
    }

    /// Broadcast a parsed progress update for a job.
    pub async fn publish_progress(&self, id: &DownloadId, update: ProgressUpdate) {
        self.publish_live(id, DownloadEvent::progress(id.clone(), update))
            .await;
    }

    /// Publish a non-terminal event, dropping it when the job is unknown or
    /// already terminal.
    async fn publish_live(&self, id: &DownloadId, event: DownloadEvent) {
        let entries = self.entries.read().await;
        match entries.get(id) {
            Some(entry) if !entry.job.state.is_terminal() => {
                self.bus.publish(event).await;
            }
            Some(_) => {
                warn!(job_id = %id, kind = event.event_type().as_str(), "Dropping event published after terminal");
            }
            None => {
                warn!(job_id = %id, kind = event.event_type().as_str(), "Dropping event for unknown job");
            }
        }
    }

    /// Mark the job completed and broadcast its terminal `complete` event.
    pub async fn complete(&self, id: &DownloadId, files: Vec<ArtifactFile>) -> EventResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| EventError::job_not_found(id.as_str()))?;

        if entry.job.state.is_terminal() {
            warn!(job_id = %id, "Dropping duplicate terminal complete");
            return Ok(());
        }

        entry.job = entry.job.clone().complete(files.clone());
        self.bus
            .publish(DownloadEvent::complete(id.clone(), files))
            .await;
        Ok(())
    }

    /// Mark the job failed and broadcast its terminal `error` event.
    pub async fn fail(&self, id: &DownloadId, error: impl Into<String>) -> EventResult<()> {
        let error = error.into();

        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| EventError::job_not_found(id.as_str()))?;

        if entry.job.state.is_terminal() {
            warn!(job_id = %id, "Dropping duplicate terminal error");
            return Ok(());
        }

        entry.job = entry.job.clone().fail(error.clone());
        self.bus
            .publish(DownloadEvent::error(id.clone(), error))
            .await;
        Ok(())
    }

    /// Subscribe to one job's events from this moment on.
    pub async fn subscribe(&self, id: &DownloadId) -> broadcast::Receiver<DownloadEvent> {
        self.bus.subscribe(id).await
    }

    /// Subscribe to every job's events.
    pub async fn subscribe_all(&self) -> broadcast::Receiver<DownloadEvent> {
        self.bus.subscribe_all().await
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgrab_models::{JobState, MediaFormat};
    use tokio::sync::broadcast::error::TryRecvError;

    fn test_job() -> DownloadJob {
        DownloadJob::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            MediaFormat::Mp4,
        )
    }

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let registry = JobRegistry::new();
        let id = registry.register(test_job()).await;

        let snap = registry.snapshot(&id).await.unwrap();
        assert_eq!(snap.state, JobState::Pending);
        assert_eq!(snap.video_id, "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_state_updates() {
        let registry = JobRegistry::new();
        let id = registry.register(test_job()).await;

        registry.mark_started(&id).await.unwrap();
        registry.set_strategy(&id, 2).await.unwrap();

        let snap = registry.snapshot(&id).await.unwrap();
        assert_eq!(snap.state, JobState::Downloading);
        assert_eq!(snap.strategy, 2);
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error() {
        let registry = JobRegistry::new();
        let id = DownloadId::from_string("nope");

        assert!(matches!(
            registry.mark_started(&id).await,
            Err(EventError::JobNotFound(_))
        ));
        assert!(matches!(
            registry.complete(&id, Vec::new()).await,
            Err(EventError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_event() {
        let registry = JobRegistry::new();
        let id = registry.register(test_job()).await;
        let mut rx = registry.subscribe(&id).await;

        registry.publish_progress(&id, ProgressUpdate::new(10.0)).await;
        registry.complete(&id, Vec::new()).await.unwrap();
        // both of these must be dropped
        registry.fail(&id, "too late").await.unwrap();
        registry.publish_log(&id, "straggler line").await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            DownloadEvent::Progress { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            DownloadEvent::Complete { .. }
        ));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        let snap = registry.snapshot(&id).await.unwrap();
        assert_eq!(snap.state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_failure_event_carries_reason() {
        let registry = JobRegistry::new();
        let id = registry.register(test_job()).await;
        let mut rx = registry.subscribe(&id).await;

        registry.fail(&id, "all strategies exhausted").await.unwrap();

        match rx.recv().await.unwrap() {
            DownloadEvent::Error { error, .. } => {
                assert_eq!(error, "all strategies exhausted")
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_flips_token() {
        let registry = JobRegistry::new();
        let id = registry.register(test_job()).await;
        let mut token = registry.cancel_token(&id).await.unwrap();

        assert!(!*token.borrow());
        assert!(registry.cancel(&id).await);
        token.changed().await.unwrap();
        assert!(*token.borrow());
    }

    #[tokio::test]
    async fn test_cancel_after_terminal_is_refused() {
        let registry = JobRegistry::new();
        let id = registry.register(test_job()).await;

        registry.fail(&id, "boom").await.unwrap();
        assert!(!registry.cancel(&id).await);
        assert!(!registry.cancel(&DownloadId::from_string("nope")).await);
    }
}
