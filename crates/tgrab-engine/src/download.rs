//! Download orchestration.
//!
//! One `execute` call drives one job from first attempt to terminal event.
//! The strategy index lives on this call's stack; nothing about chain
//! traversal is shared between jobs. Every accepted job ends in exactly one
//! terminal event, whatever happens in between.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use tgrab_events::JobRegistry;
use tgrab_models::{ArtifactFile, DownloadId, ProgressUpdate};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::progress::parse_progress_line;
use crate::runner::{ExtractionRunner, OutputLine, RunOutcome, StreamKind, YtDlpRunner};
use crate::strategy::{build_args, strategy_chain};

/// Terminal reason when every strategy has been tried.
pub const EXHAUSTED_MESSAGE: &str =
    "All download methods failed. This video may be restricted.";

/// Drives the strategy chain for registered jobs.
pub struct DownloadEngine<R = YtDlpRunner> {
    config: EngineConfig,
    runner: R,
    registry: Arc<JobRegistry>,
}

impl DownloadEngine<YtDlpRunner> {
    pub fn new(config: EngineConfig, registry: Arc<JobRegistry>) -> Self {
        let runner = YtDlpRunner::new(config.binary.clone());
        Self {
            config,
            runner,
            registry,
        }
    }
}

impl<R: ExtractionRunner> DownloadEngine<R> {
    /// Engine with a custom runner, for tests.
    pub fn with_runner(config: EngineConfig, registry: Arc<JobRegistry>, runner: R) -> Self {
        Self {
            config,
            runner,
            registry,
        }
    }

    /// Run a registered job to its terminal event.
    ///
    /// Never returns an error: every failure mode ends in the job's
    /// terminal `error` event instead, so no accepted job is left
    /// unresolved.
    pub async fn execute(&self, id: DownloadId) {
        let job = match self.registry.snapshot(&id).await {
            Some(job) => job,
            None => {
                warn!(job_id = %id, "Job vanished before execution");
                return;
            }
        };
        let mut cancel = match self.registry.cancel_token(&id).await {
            Some(token) => token,
            None => return,
        };

        if let Err(e) = self.registry.mark_started(&id).await {
            warn!(job_id = %id, error = %e, "Could not start job");
            return;
        }

        // initial tick so the client renders a progress bar immediately
        self.registry
            .publish_progress(&id, ProgressUpdate::new(0.0))
            .await;

        let job_dir = self.config.downloads_dir.join(id.as_str());
        if let Err(e) = tokio::fs::create_dir_all(&job_dir).await {
            error!(job_id = %id, error = %e, "Could not create output directory");
            let _ = self
                .registry
                .fail(&id, format!("Could not create output directory: {}", e))
                .await;
            return;
        }

        let started = Instant::now();
        let chain = strategy_chain();
        // only a launch error on the final attempt overrides the generic
        // exhaustion reason
        let mut last_launch_error: Option<String> = None;

        for (index, strategy) in chain.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.strategy_delay).await;
            }

            if *cancel.borrow() {
                info!(job_id = %id, "Job cancelled before attempt");
                let _ = self.registry.fail(&id, "cancelled").await;
                return;
            }

            let _ = self.registry.set_strategy(&id, index).await;
            info!(job_id = %id, strategy = strategy.name, attempt = index + 1, "Trying strategy");
            self.registry
                .publish_log(&id, format!("Trying strategy {}...", index + 1))
                .await;

            let args = build_args(strategy, job.format, &job_dir, &job.url);

            let (tx, rx) = mpsc::unbounded_channel();
            let forwarder = tokio::spawn(forward_lines(
                Arc::clone(&self.registry),
                id.clone(),
                rx,
            ));

            // dropping the run future on cancel reaps the child via
            // kill_on_drop
            let outcome = tokio::select! {
                outcome = self.runner.run(&args, self.config.attempt_timeout, tx) => Some(outcome),
                _ = cancel.changed() => None,
            };

            // the sender is gone either way; drain everything before any
            // terminal event can be published
            let _ = forwarder.await;

            match outcome {
                None => {
                    info!(job_id = %id, strategy = strategy.name, "Job cancelled");
                    let _ = self.registry.fail(&id, "cancelled").await;
                    return;
                }
                Some(RunOutcome::Success) => {
                    record_attempt(strategy.name, "success");
                    match self.list_artifacts(&id, &job_dir).await {
                        Ok(files) => {
                            let elapsed = started.elapsed();
                            info!(
                                job_id = %id,
                                strategy = strategy.name,
                                files = files.len(),
                                duration_secs = elapsed.as_secs_f64(),
                                "Download completed"
                            );
                            metrics::histogram!("tgrab_download_duration_seconds")
                                .record(elapsed.as_secs_f64());
                            metrics::counter!("tgrab_downloads_completed_total").increment(1);
                            let _ = self.registry.complete(&id, files).await;
                        }
                        Err(e) => {
                            error!(job_id = %id, error = %e, "Could not list artifacts");
                            metrics::counter!("tgrab_downloads_failed_total").increment(1);
                            let _ = self
                                .registry
                                .fail(&id, format!("Could not list downloaded files: {}", e))
                                .await;
                        }
                    }
                    return;
                }
                Some(RunOutcome::Failed {
                    exit_code,
                    stderr_tail,
                }) => {
                    warn!(
                        job_id = %id,
                        strategy = strategy.name,
                        ?exit_code,
                        stderr_tail = %stderr_tail.lines().last().unwrap_or(""),
                        "Strategy attempt failed"
                    );
                    record_attempt(strategy.name, "failed");
                    last_launch_error = None;
                }
                Some(RunOutcome::TimedOut) => {
                    warn!(job_id = %id, strategy = strategy.name, "Strategy attempt timed out");
                    record_attempt(strategy.name, "timeout");
                    last_launch_error = None;
                }
                Some(RunOutcome::LaunchError(message)) => {
                    error!(job_id = %id, error = %message, "Could not launch extraction tool");
                    record_attempt(strategy.name, "launch_error");
                    last_launch_error = Some(message);
                }
            }
        }

        let reason = last_launch_error.unwrap_or_else(|| EXHAUSTED_MESSAGE.to_string());
        warn!(job_id = %id, "All strategies exhausted");
        metrics::counter!("tgrab_downloads_failed_total").increment(1);
        let _ = self.registry.fail(&id, reason).await;
    }

    async fn list_artifacts(
        &self,
        id: &DownloadId,
        dir: &Path,
    ) -> EngineResult<Vec<ArtifactFile>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let path = format!("/downloads/{}/{}", id, name);
            files.push(ArtifactFile::new(name, path));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

fn record_attempt(strategy: &'static str, outcome: &'static str) {
    metrics::counter!(
        "tgrab_extraction_attempts_total",
        "strategy" => strategy,
        "outcome" => outcome
    )
    .increment(1);
}

/// Relay raw lines to subscribers, with parsed progress first the way the
/// original service ordered its emits. Only stdout carries the progress
/// template.
async fn forward_lines(
    registry: Arc<JobRegistry>,
    id: DownloadId,
    mut rx: mpsc::UnboundedReceiver<OutputLine>,
) {
    while let Some(line) = rx.recv().await {
        if line.stream == StreamKind::Stdout {
            if let Some(update) = parse_progress_line(&line.text) {
                registry.publish_progress(&id, update).await;
            }
        }
        registry.publish_log(&id, line.text).await;
    }
}
