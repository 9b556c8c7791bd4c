//! Ingest job tracking: SSE events plus status polling, converging on one
//! progress model with an ETA estimate.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::types::{EnqueueResponse, IngestEventDto, IngestStatusDto};
use crate::api::{ApiClient, ApiError, SseRead};

/// Poll cadence while the job is live.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Samples kept for the moving average.
const ETA_WINDOW: usize = 10;

/// Samples required before an estimate is shown.
const ETA_MIN_SAMPLES: usize = 5;

/// What the ETA line should read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaDisplay {
    /// `done == total > 0`.
    Complete,
    /// Fewer than five samples collected.
    Calculating,
    /// Estimated time remaining.
    Remaining(Duration),
}

impl EtaDisplay {
    /// Text for the progress pane.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Complete => "Complete".to_owned(),
            Self::Calculating => "Calculating…".to_owned(),
            Self::Remaining(eta) => {
                let secs = eta.as_secs();
                if secs >= 60 {
                    format!("~{}m {}s remaining", secs / 60, secs % 60)
                } else {
                    format!("~{secs}s remaining")
                }
            }
        }
    }
}

/// Moving-average ETA over the last ten inter-progress deltas.
#[derive(Debug, Default)]
pub struct EtaEstimator {
    samples: VecDeque<Duration>,
    last_progress: Option<(u64, Instant)>,
}

impl EtaEstimator {
    /// Create an empty estimator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a progress observation now.
    pub fn record(&mut self, done: u64) {
        self.record_at(done, Instant::now());
    }

    fn record_at(&mut self, done: u64, now: Instant) {
        if let Some((last_done, last_at)) = self.last_progress {
            if done > last_done {
                // Normalize to a per-artifact delta when the counter jumps
                let advanced = done - last_done;
                let delta = now.duration_since(last_at) / u32::try_from(advanced).unwrap_or(1);
                self.samples.push_back(delta);
                while self.samples.len() > ETA_WINDOW {
                    self.samples.pop_front();
                }
                self.last_progress = Some((done, now));
            }
        } else {
            self.last_progress = Some((done, now));
        }
    }

    /// The display state for the current counters.
    #[must_use]
    pub fn display(&self, done: u64, total: u64) -> EtaDisplay {
        if total > 0 && done == total {
            return EtaDisplay::Complete;
        }
        if self.samples.len() < ETA_MIN_SAMPLES {
            return EtaDisplay::Calculating;
        }
        let sum: Duration = self.samples.iter().sum();
        let avg = sum / u32::try_from(self.samples.len()).unwrap_or(1);
        let remaining = total.saturating_sub(done);
        EtaDisplay::Remaining(avg * u32::try_from(remaining).unwrap_or(u32::MAX))
    }

    /// Drop all samples.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_progress = None;
    }
}

/// Update from the SSE pump or the polling loop.
#[derive(Debug)]
pub struct IngestUpdate {
    /// Tracking generation this update belongs to.
    pub generation: u64,
    /// What happened.
    pub kind: IngestUpdateKind,
}

/// The kinds of ingest updates.
#[derive(Debug)]
pub enum IngestUpdateKind {
    /// A polled status snapshot.
    Snapshot(IngestStatusDto),
    /// A raw SSE event.
    Event(IngestEventDto),
    /// The SSE handle died; polling carries the job alone from here.
    SseClosed {
        /// `Some` when the close was an error rather than end-of-stream.
        error: Option<String>,
    },
}

/// Ingest job controller.
#[derive(Debug, Default)]
pub struct IngestController {
    /// The tracked job, if one was started this session.
    pub job_id: Option<String>,
    /// Converged status snapshot.
    pub status: IngestStatusDto,
    /// Monotone error counter.
    pub errors: u64,
    /// Lines from SSE `log` and `error` events.
    pub log_lines: Vec<String>,
    /// Summary card totals, populated on `complete` or terminal status.
    pub summary: Option<IngestStatusDto>,
    /// Whether the job reached a terminal state.
    pub finished: bool,
    /// Whether the SSE track is still attached.
    pub sse_attached: bool,
    eta: EtaEstimator,
    generation: u64,
    sse_task: Option<JoinHandle<()>>,
    poll_task: Option<JoinHandle<()>>,
}

impl IngestController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a job is being tracked and is not finished.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.job_id.is_some() && !self.finished
    }

    /// Progress ratio in percent, when a total is known.
    #[must_use]
    pub fn percent(&self) -> Option<u16> {
        if self.status.total_artifacts == 0 {
            return None;
        }
        let pct = self.status.done_artifacts * 100 / self.status.total_artifacts;
        Some(u16::try_from(pct.min(100)).unwrap_or(100))
    }

    /// The ETA line for the progress pane.
    #[must_use]
    pub fn eta_display(&self) -> EtaDisplay {
        self.eta
            .display(self.status.done_artifacts, self.status.total_artifacts)
    }

    /// Start an ingest job and begin dual tracking.
    ///
    /// # Errors
    ///
    /// Propagates the API error from the start call.
    pub async fn start(
        &mut self,
        client: &ApiClient,
        tx: &mpsc::UnboundedSender<IngestUpdate>,
    ) -> Result<String, ApiError> {
        let resp: EnqueueResponse = client
            .post_json("/api/ingest", &serde_json::json!({}))
            .await?;
        self.track(client, tx, &resp.job_id);
        Ok(resp.job_id)
    }

    /// Track an existing ingest job: SSE events plus ~2 s polling.
    pub fn track(
        &mut self,
        client: &ApiClient,
        tx: &mpsc::UnboundedSender<IngestUpdate>,
        job_id: &str,
    ) {
        self.stop();
        self.generation += 1;
        let generation = self.generation;

        self.job_id = Some(job_id.to_owned());
        self.status = IngestStatusDto::default();
        self.errors = 0;
        self.log_lines.clear();
        self.summary = None;
        self.finished = false;
        self.sse_attached = true;
        self.eta.reset();

        self.sse_task = Some(spawn_event_pump(
            client.clone(),
            job_id.to_owned(),
            generation,
            tx.clone(),
        ));
        self.poll_task = Some(spawn_status_poll(
            client.clone(),
            job_id.to_owned(),
            generation,
            tx.clone(),
        ));
    }

    /// Stop tracking: aborts both tracks and invalidates their events.
    pub fn stop(&mut self) {
        self.generation += 1;
        if let Some(task) = self.sse_task.take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    /// Full reset for an admin-session reset.
    pub fn reset(&mut self) {
        self.stop();
        self.job_id = None;
        self.status = IngestStatusDto::default();
        self.errors = 0;
        self.log_lines.clear();
        self.summary = None;
        self.finished = false;
        self.sse_attached = false;
        self.eta.reset();
    }

    /// Apply one update; stale generations are dropped.
    pub fn handle_update(&mut self, update: IngestUpdate) {
        if update.generation != self.generation {
            return;
        }
        match update.kind {
            IngestUpdateKind::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            IngestUpdateKind::Event(event) => self.apply_event(event),
            IngestUpdateKind::SseClosed { error } => {
                self.sse_attached = false;
                if let Some(error) = error {
                    tracing::debug!(error = %error, "ingest event stream detached; polling continues");
                }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: IngestStatusDto) {
        if snapshot.done_artifacts > self.status.done_artifacts {
            self.eta.record(snapshot.done_artifacts);
        }
        self.errors = self.errors.max(snapshot.errors);
        let last_label = self.status.current_artifact.take();
        self.status = snapshot;
        if self.status.current_artifact.is_none() {
            self.status.current_artifact = last_label;
        }
        if self.status.is_terminal() {
            self.finish();
        }
    }

    fn apply_event(&mut self, event: IngestEventDto) {
        match event {
            IngestEventDto::Start { total_artifacts } => {
                if let Some(total) = total_artifacts {
                    self.status.total_artifacts = total;
                }
                if self.status.status.is_empty() {
                    self.status.status = "running".to_owned();
                }
            }
            IngestEventDto::ArtifactProgress { done, total, current_artifact, errors } => {
                if done > self.status.done_artifacts {
                    self.eta.record(done);
                }
                self.status.done_artifacts = done;
                self.status.total_artifacts = total;
                if current_artifact.is_some() {
                    self.status.current_artifact = current_artifact;
                }
                if let Some(server_errors) = errors {
                    // Server-authoritative, but the counter never regresses
                    self.errors = self.errors.max(server_errors);
                }
            }
            IngestEventDto::Log { message } => self.log_lines.push(message),
            IngestEventDto::Complete { summary } => {
                if let Some(summary) = &summary {
                    self.status.done_artifacts = summary.done_artifacts;
                    if summary.total_artifacts > 0 {
                        self.status.total_artifacts = summary.total_artifacts;
                    }
                }
                self.summary = summary.or_else(|| Some(self.status.clone()));
                self.status.status = "done".to_owned();
                self.finish();
            }
            IngestEventDto::Error { message } => {
                self.errors += 1;
                if let Some(message) = message {
                    self.log_lines.push(message);
                }
            }
            IngestEventDto::Connected | IngestEventDto::Unknown => {}
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.summary.is_none() {
            self.summary = Some(self.status.clone());
        }
        // Both tracks are done serving this job
        if let Some(task) = self.sse_task.take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    /// The headline for the ingest pane.
    #[must_use]
    pub fn headline(&self) -> String {
        if self.finished {
            match self.status.status.as_str() {
                "error" => "Ingest failed".to_owned(),
                "cancelled" => "Ingest cancelled".to_owned(),
                _ => "Ingest complete".to_owned(),
            }
        } else if self.job_id.is_some() {
            format!(
                "Ingesting {} / {}",
                self.status.done_artifacts, self.status.total_artifacts
            )
        } else {
            "No ingest running".to_owned()
        }
    }
}

/// Pump `/api/ingest/{id}/events`. On connection error the handle closes
/// and polling carries the job to completion alone.
fn spawn_event_pump(
    client: ApiClient,
    job_id: String,
    generation: u64,
    tx: mpsc::UnboundedSender<IngestUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = match client
            .sse_get(&format!("/api/ingest/{job_id}/events"))
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                let _ = tx.send(IngestUpdate {
                    generation,
                    kind: IngestUpdateKind::SseClosed { error: Some(e.panel_text()) },
                });
                return;
            }
        };

        loop {
            match stream.next().await {
                SseRead::Event(event) => {
                    if let Some(parsed) = stream.json_or_skip::<IngestEventDto>(&event) {
                        let _ = tx.send(IngestUpdate {
                            generation,
                            kind: IngestUpdateKind::Event(parsed),
                        });
                    }
                }
                SseRead::Closed => {
                    let _ = tx.send(IngestUpdate {
                        generation,
                        kind: IngestUpdateKind::SseClosed { error: None },
                    });
                    return;
                }
                SseRead::Failed(message) => {
                    let _ = tx.send(IngestUpdate {
                        generation,
                        kind: IngestUpdateKind::SseClosed { error: Some(message) },
                    });
                    return;
                }
            }
        }
    })
}

/// Poll `/api/ingest/{id}` every ~2 s until the status is terminal.
fn spawn_status_poll(
    client: ApiClient,
    job_id: String,
    generation: u64,
    tx: mpsc::UnboundedSender<IngestUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match client
                .get_json::<IngestStatusDto>(&format!("/api/ingest/{job_id}"))
                .await
            {
                Ok(snapshot) => {
                    let terminal = snapshot.is_terminal();
                    let _ = tx.send(IngestUpdate {
                        generation,
                        kind: IngestUpdateKind::Snapshot(snapshot),
                    });
                    if terminal {
                        return;
                    }
                }
                Err(e) => {
                    // Transient poll failures are retried on the next tick
                    tracing::debug!(error = %e, job_id = %job_id, "ingest status poll failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: &str, done: u64, total: u64, errors: u64) -> IngestStatusDto {
        IngestStatusDto {
            job_id: Some("I1".to_owned()),
            status: status.to_owned(),
            done_artifacts: done,
            total_artifacts: total,
            current_artifact: None,
            errors,
        }
    }

    fn update(generation: u64, kind: IngestUpdateKind) -> IngestUpdate {
        IngestUpdate { generation, kind }
    }

    #[test]
    fn eta_states_follow_the_sample_count() {
        let mut eta = EtaEstimator::new();
        let t0 = Instant::now();
        eta.record_at(0, t0);
        for i in 1..=4u64 {
            eta.record_at(i, t0 + Duration::from_secs(i));
        }
        assert_eq!(eta.display(4, 10), EtaDisplay::Calculating, "4 samples is not enough");

        eta.record_at(5, t0 + Duration::from_secs(5));
        match eta.display(5, 10) {
            EtaDisplay::Remaining(d) => assert_eq!(d, Duration::from_secs(5)),
            other => panic!("expected an estimate, got {other:?}"),
        }
    }

    #[test]
    fn eta_complete_requires_nonzero_total() {
        let eta = EtaEstimator::new();
        assert_eq!(eta.display(5, 5), EtaDisplay::Complete);
        assert_eq!(eta.display(0, 0), EtaDisplay::Calculating, "0/0 is not complete");
    }

    #[test]
    fn eta_normalizes_counter_jumps() {
        let mut eta = EtaEstimator::new();
        let t0 = Instant::now();
        eta.record_at(0, t0);
        // 6 artifacts over 6 seconds, reported in two jumps of 3
        eta.record_at(3, t0 + Duration::from_secs(3));
        eta.record_at(6, t0 + Duration::from_secs(6));
        // Two jumps → two samples; pad to the threshold at the same pace
        eta.record_at(7, t0 + Duration::from_secs(7));
        eta.record_at(8, t0 + Duration::from_secs(8));
        eta.record_at(9, t0 + Duration::from_secs(9));
        match eta.display(9, 11) {
            EtaDisplay::Remaining(d) => assert_eq!(d, Duration::from_secs(2)),
            other => panic!("expected an estimate, got {other:?}"),
        }
    }

    #[test]
    fn errors_never_regress() {
        let mut ingest = IngestController::new();
        ingest.generation = 1;
        ingest.job_id = Some("I1".to_owned());

        ingest.handle_update(update(1, IngestUpdateKind::Event(IngestEventDto::Error {
            message: Some("artifact failed".to_owned()),
        })));
        ingest.handle_update(update(1, IngestUpdateKind::Event(IngestEventDto::Error {
            message: None,
        })));
        assert_eq!(ingest.errors, 2);

        // Server-authoritative value below the local counter does not lower it
        ingest.handle_update(update(
            1,
            IngestUpdateKind::Event(IngestEventDto::ArtifactProgress {
                done: 3,
                total: 10,
                current_artifact: None,
                errors: Some(1),
            }),
        ));
        assert_eq!(ingest.errors, 2);

        // A higher server value replaces it
        ingest.handle_update(update(
            1,
            IngestUpdateKind::Event(IngestEventDto::ArtifactProgress {
                done: 4,
                total: 10,
                current_artifact: None,
                errors: Some(5),
            }),
        ));
        assert_eq!(ingest.errors, 5);
    }

    #[test]
    fn polling_alone_reaches_completion() {
        let mut ingest = IngestController::new();
        ingest.generation = 1;
        ingest.job_id = Some("I1".to_owned());

        // SSE died immediately
        ingest.handle_update(update(1, IngestUpdateKind::SseClosed {
            error: Some("refused".to_owned()),
        }));
        assert!(!ingest.sse_attached || !ingest.finished);

        ingest.handle_update(update(1, IngestUpdateKind::Snapshot(snapshot("running", 4, 10, 0))));
        assert_eq!(ingest.status.done_artifacts, 4);
        assert!(!ingest.finished);

        ingest.handle_update(update(1, IngestUpdateKind::Snapshot(snapshot("done", 10, 10, 0))));
        assert!(ingest.finished);
        assert_eq!(ingest.headline(), "Ingest complete");
        assert!(ingest.summary.is_some(), "summary card fills from the last snapshot");
    }

    #[test]
    fn stale_generation_updates_are_dropped() {
        let mut ingest = IngestController::new();
        ingest.generation = 2;
        ingest.handle_update(update(1, IngestUpdateKind::Snapshot(snapshot("done", 5, 5, 0))));
        assert!(!ingest.finished);
        assert_eq!(ingest.status.done_artifacts, 0);
    }

    #[test]
    fn current_artifact_label_keeps_last_known_value() {
        let mut ingest = IngestController::new();
        ingest.generation = 1;

        let mut with_label = snapshot("running", 1, 5, 0);
        with_label.current_artifact = Some("doc-17.pdf".to_owned());
        ingest.handle_update(update(1, IngestUpdateKind::Snapshot(with_label)));
        assert_eq!(ingest.status.current_artifact.as_deref(), Some("doc-17.pdf"));

        // A later snapshot without the label keeps the last-known one
        ingest.handle_update(update(1, IngestUpdateKind::Snapshot(snapshot("running", 2, 5, 0))));
        assert_eq!(ingest.status.current_artifact.as_deref(), Some("doc-17.pdf"));
    }

    #[test]
    fn complete_event_populates_summary_card() {
        let mut ingest = IngestController::new();
        ingest.generation = 1;
        ingest.handle_update(update(
            1,
            IngestUpdateKind::Event(IngestEventDto::Complete {
                summary: Some(snapshot("done", 8, 8, 1)),
            }),
        ));
        assert!(ingest.finished);
        let card = ingest.summary.as_ref().unwrap();
        assert_eq!(card.done_artifacts, 8);
        assert_eq!(ingest.eta_display(), EtaDisplay::Complete);
    }
}
