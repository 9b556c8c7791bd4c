//! Job table and log pane coordination.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::types::{CrawlSummaryDto, EnqueueResponse, JobDto, JobListResponse, JobType};
use crate::api::{ApiClient, ApiError};
use crate::core::summary::CrawlSummary;

use super::logs::{LogChannel, LogEvent, LogStreamManager};

/// Delay before fetching the summary when viewing a finished crawl log.
const VIEW_LOG_SUMMARY_DELAY: Duration = Duration::from_millis(500);

/// One channel's log pane.
#[derive(Debug, Default)]
pub struct LogPane {
    /// Lines in arrival order.
    pub lines: Vec<String>,
    /// Lines scrolled above the bottom; zero means pinned to the tail.
    pub scroll_from_bottom: usize,
}

impl LogPane {
    /// Append one line. The pane stays pinned to the bottom unless the
    /// user scrolled up.
    pub fn append(&mut self, text: String) {
        self.lines.push(text);
    }

    /// Clear the pane.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll_from_bottom = 0;
    }
}

/// Follow-up work an event demands from the async caller.
#[derive(Debug, PartialEq, Eq)]
pub enum JobAction {
    /// Fetch `/api/admin/jobs/{id}/summary` now.
    FetchSummary(String),
    /// Surface one banner line (unexpected stream close).
    Banner(String),
}

/// Job table, log streams, and the crawl summary panel.
#[derive(Debug)]
pub struct JobManager {
    /// Jobs as last fetched.
    pub jobs: Vec<JobDto>,
    /// The crawl job this session started or is watching.
    pub current_crawl_job: Option<String>,
    /// The admin-enqueued ingest job this session started.
    pub current_ingest_job: Option<String>,
    /// Resolved summary for the summary panel and pill bar.
    pub summary: Option<CrawlSummary>,
    /// Log stream slots.
    pub logs: LogStreamManager,
    panes: HashMap<LogChannel, LogPane>,
}

impl JobManager {
    /// Create a manager reporting log events on the given channel.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<LogEvent>) -> Self {
        Self {
            jobs: Vec::new(),
            current_crawl_job: None,
            current_ingest_job: None,
            summary: None,
            logs: LogStreamManager::new(tx),
            panes: HashMap::new(),
        }
    }

    /// The pane for a channel (empty if never written).
    #[must_use]
    pub fn pane(&self, channel: LogChannel) -> Option<&LogPane> {
        self.panes.get(&channel)
    }

    /// Mutable pane access for scroll handling.
    pub fn pane_mut(&mut self, channel: LogChannel) -> &mut LogPane {
        self.panes.entry(channel).or_default()
    }

    // ------------------------------------------------------------------
    // Table operations

    /// Re-fetch the job table. Latest fetch wins; no request sequencing.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn refresh_jobs(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let resp: JobListResponse = client.get_json("/api/admin/jobs").await?;
        self.jobs = resp.jobs;
        Ok(())
    }

    /// Enqueue a crawl, open its log channel, refresh the table.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn start_crawl(&mut self, client: &ApiClient) -> Result<String, ApiError> {
        let resp: EnqueueResponse = client
            .post_json("/api/admin/crawl", &serde_json::json!({}))
            .await?;
        self.current_crawl_job = Some(resp.job_id.clone());
        self.summary = None;
        self.pane_mut(LogChannel::Crawl).clear();
        self.logs.open(client, LogChannel::Crawl, &resp.job_id);
        self.refresh_jobs(client).await.ok();
        Ok(resp.job_id)
    }

    /// Enqueue an admin ingest job and open its log channel.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn start_ingest(&mut self, client: &ApiClient) -> Result<String, ApiError> {
        let resp: EnqueueResponse = client
            .post_json("/api/admin/ingest", &serde_json::json!({}))
            .await?;
        self.current_ingest_job = Some(resp.job_id.clone());
        self.pane_mut(LogChannel::Ingest).clear();
        self.logs.open(client, LogChannel::Ingest, &resp.job_id);
        self.refresh_jobs(client).await.ok();
        Ok(resp.job_id)
    }

    /// Open the `jobs` channel on a table row. Crawl jobs also fetch the
    /// summary shortly after the stream opens.
    pub fn view_log(&mut self, client: &ApiClient, job: &JobDto) {
        self.pane_mut(LogChannel::Jobs).clear();
        self.logs.open(client, LogChannel::Jobs, &job.job_id);
        if job.job_type == JobType::Crawl {
            self.logs
                .request_deferred_summary(LogChannel::Jobs, &job.job_id, VIEW_LOG_SUMMARY_DELAY);
        }
    }

    /// Export a job log to the downloads directory.
    ///
    /// # Errors
    ///
    /// Propagates request and filesystem errors.
    pub async fn export_log(
        &self,
        client: &ApiClient,
        job_id: &str,
    ) -> anyhow::Result<PathBuf> {
        let response = client
            .get_response(&format!("/api/admin/jobs/{job_id}/log/export"))
            .await?;
        crate::api::save_attachment(response, &format!("job-{job_id}.log")).await
    }

    /// Delete a job and its logs; clears any active reference to it.
    ///
    /// # Errors
    ///
    /// Propagates the API error; local state is untouched on failure.
    pub async fn delete_job(&mut self, client: &ApiClient, job_id: &str) -> Result<(), ApiError> {
        client.delete(&format!("/api/admin/jobs/{job_id}")).await?;

        self.logs.close_job(job_id);
        if self.current_crawl_job.as_deref() == Some(job_id) {
            self.current_crawl_job = None;
            self.summary = None;
        }
        if self.current_ingest_job.as_deref() == Some(job_id) {
            self.current_ingest_job = None;
        }
        self.refresh_jobs(client).await.ok();
        Ok(())
    }

    /// Fetch and resolve a crawl summary.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn fetch_summary(
        &mut self,
        client: &ApiClient,
        job_id: &str,
    ) -> Result<(), ApiError> {
        let dto: CrawlSummaryDto = client
            .get_json(&format!("/api/admin/jobs/{job_id}/summary"))
            .await?;
        self.summary = Some(CrawlSummary::from_wire(dto));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event application

    /// Apply one log event, returning any follow-up the caller must run.
    ///
    /// Events whose generation lost its slot are dropped: the pump behind
    /// a closed handle is a no-op.
    pub fn handle_event(&mut self, event: LogEvent) -> Option<JobAction> {
        match event {
            LogEvent::Line { channel, generation, text } => {
                if !self.logs.owns(channel, generation) {
                    return None;
                }
                self.pane_mut(channel).append(text);
                None
            }
            LogEvent::Closed { channel, generation, reason } => {
                if !self.logs.owns(channel, generation) {
                    return None;
                }
                self.logs.release_after_close(channel, generation);
                reason.map(|r| {
                    JobAction::Banner(format!("{} log stream closed: {r}", channel.name()))
                })
            }
            LogEvent::SummaryDue { channel, generation, job_id } => {
                // The slot may have closed normally after end-of-stream;
                // the summary is still wanted when the job is still ours.
                if !self.logs.owns(channel, generation)
                    && self.current_crawl_job.as_deref() != Some(job_id.as_str())
                {
                    return None;
                }
                Some(JobAction::FetchSummary(job_id))
            }
        }
    }

    /// Close all channels, zero job references, empty panes, and drop the
    /// summary. Status regions are the caller's to clear.
    pub fn reset_admin_session(&mut self) {
        self.logs.close_all();
        self.current_crawl_job = None;
        self.current_ingest_job = None;
        self.summary = None;
        for pane in self.panes.values_mut() {
            pane.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (JobManager, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (JobManager::new(tx), rx)
    }

    #[tokio::test]
    async fn lines_append_only_while_the_generation_owns_the_slot() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut jobs, _rx) = manager();

        jobs.logs.open(&client, LogChannel::Crawl, "J1");
        let generation = jobs.logs.generation_for(LogChannel::Crawl).unwrap();

        jobs.handle_event(LogEvent::Line {
            channel: LogChannel::Crawl,
            generation,
            text: "fetching https://x.com/".to_owned(),
        });
        assert_eq!(jobs.pane(LogChannel::Crawl).unwrap().lines.len(), 1);

        jobs.logs.close(LogChannel::Crawl);
        jobs.handle_event(LogEvent::Line {
            channel: LogChannel::Crawl,
            generation,
            text: "zombie line".to_owned(),
        });
        assert_eq!(
            jobs.pane(LogChannel::Crawl).unwrap().lines.len(),
            1,
            "a closed stream cannot touch the pane"
        );
    }

    #[tokio::test]
    async fn unexpected_close_surfaces_one_banner() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut jobs, _rx) = manager();

        jobs.logs.open(&client, LogChannel::Jobs, "J2");
        let action = jobs.handle_event(LogEvent::Closed {
            channel: LogChannel::Jobs,
            generation: 1,
            reason: Some("connection reset".to_owned()),
        });
        assert_eq!(
            action,
            Some(JobAction::Banner("jobs log stream closed: connection reset".to_owned()))
        );
        assert!(!jobs.logs.is_open(LogChannel::Jobs), "slot is freed after close");

        // A duplicate close event from the dead pump is a no-op
        let action = jobs.handle_event(LogEvent::Closed {
            channel: LogChannel::Jobs,
            generation: 1,
            reason: Some("connection reset".to_owned()),
        });
        assert_eq!(action, None);
    }

    #[tokio::test]
    async fn summary_due_fires_for_the_current_crawl_job_even_after_stream_end() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut jobs, _rx) = manager();

        jobs.current_crawl_job = Some("J1".to_owned());
        jobs.logs.open(&client, LogChannel::Crawl, "J1");
        jobs.logs.close(LogChannel::Crawl);

        let action = jobs.handle_event(LogEvent::SummaryDue {
            channel: LogChannel::Crawl,
            generation: 1,
            job_id: "J1".to_owned(),
        });
        assert_eq!(action, Some(JobAction::FetchSummary("J1".to_owned())));

        // A stale job neither owns a slot nor matches the current job
        let action = jobs.handle_event(LogEvent::SummaryDue {
            channel: LogChannel::Crawl,
            generation: 1,
            job_id: "OLD".to_owned(),
        });
        assert_eq!(action, None);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut jobs, _rx) = manager();

        jobs.current_crawl_job = Some("J1".to_owned());
        jobs.summary = Some(CrawlSummary::default());
        jobs.logs.open(&client, LogChannel::Crawl, "J1");
        jobs.pane_mut(LogChannel::Crawl).append("line".to_owned());

        jobs.reset_admin_session();
        assert!(jobs.current_crawl_job.is_none());
        assert!(jobs.summary.is_none());
        assert!(!jobs.logs.is_open(LogChannel::Crawl));
        assert!(jobs.pane(LogChannel::Crawl).unwrap().lines.is_empty());
    }
}
