//! Named SSE log channels.
//!
//! Three channels exist (`crawl`, `ingest`, `jobs`) with at most one live
//! stream per channel. Opening a channel that is already occupied closes
//! the prior stream first. Every event carries the slot generation at
//! open time; events whose generation no longer owns the slot are dropped,
//! so a closed stream can never mutate a pane.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, SseRead};

/// The literal completion line the crawler writes as its last log entry.
const CRAWL_COMPLETE_MARKER: &str = "Crawl job complete";

/// Delay between spotting the completion line and fetching the summary.
const SUMMARY_FETCH_DELAY: Duration = Duration::from_secs(1);

/// A named log channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    /// The active crawl job's log.
    Crawl,
    /// The active ingest job's log.
    Ingest,
    /// Ad-hoc log viewing from the job table.
    Jobs,
}

impl LogChannel {
    /// All channels, for close-all sweeps.
    pub const ALL: [Self; 3] = [Self::Crawl, Self::Ingest, Self::Jobs];

    /// Channel name for display and logging.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Ingest => "ingest",
            Self::Jobs => "jobs",
        }
    }
}

/// Event from a log pump to the UI loop.
#[derive(Debug)]
pub enum LogEvent {
    /// One log line arrived.
    Line {
        /// Channel the line belongs to.
        channel: LogChannel,
        /// Slot generation at open time.
        generation: u64,
        /// The line, verbatim.
        text: String,
    },
    /// The stream ended.
    Closed {
        /// Channel that closed.
        channel: LogChannel,
        /// Slot generation at open time.
        generation: u64,
        /// `Some` when the close was unexpected (banner-worthy).
        reason: Option<String>,
    },
    /// A deferred crawl-summary fetch is due.
    SummaryDue {
        /// Channel that observed completion.
        channel: LogChannel,
        /// Slot generation at open time.
        generation: u64,
        /// Job to fetch the summary for.
        job_id: String,
    },
}

#[derive(Debug)]
struct StreamSlot {
    generation: u64,
    job_id: String,
    task: JoinHandle<()>,
}

/// Owner of the three log channel slots.
#[derive(Debug)]
pub struct LogStreamManager {
    slots: HashMap<LogChannel, StreamSlot>,
    next_generation: u64,
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl LogStreamManager {
    /// Create a manager reporting on the given channel.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<LogEvent>) -> Self {
        Self {
            slots: HashMap::new(),
            next_generation: 0,
            tx,
        }
    }

    /// Open a channel for a job, closing any prior stream on it.
    pub fn open(&mut self, client: &ApiClient, channel: LogChannel, job_id: &str) {
        self.close(channel);
        self.next_generation += 1;
        let generation = self.next_generation;

        let task = spawn_log_pump(
            client.clone(),
            channel,
            job_id.to_owned(),
            generation,
            self.tx.clone(),
        );
        self.slots.insert(
            channel,
            StreamSlot {
                generation,
                job_id: job_id.to_owned(),
                task,
            },
        );
        tracing::debug!(channel = channel.name(), job_id = %job_id, "opened log stream");
    }

    /// Close a channel. Idempotent: closing an empty slot is a no-op.
    pub fn close(&mut self, channel: LogChannel) {
        if let Some(slot) = self.slots.remove(&channel) {
            slot.task.abort();
            tracing::debug!(channel = channel.name(), "closed log stream");
        }
    }

    /// Close every channel.
    pub fn close_all(&mut self) {
        for channel in LogChannel::ALL {
            self.close(channel);
        }
    }

    /// Whether a channel currently holds a stream.
    #[must_use]
    pub fn is_open(&self, channel: LogChannel) -> bool {
        self.slots.contains_key(&channel)
    }

    /// The job a channel is streaming, if any.
    #[must_use]
    pub fn job_for(&self, channel: LogChannel) -> Option<&str> {
        self.slots.get(&channel).map(|slot| slot.job_id.as_str())
    }

    /// The generation of a channel's current slot, if any.
    #[must_use]
    pub fn generation_for(&self, channel: LogChannel) -> Option<u64> {
        self.slots.get(&channel).map(|slot| slot.generation)
    }

    /// Whether an event generation still owns its channel slot.
    #[must_use]
    pub fn owns(&self, channel: LogChannel, generation: u64) -> bool {
        self.slots
            .get(&channel)
            .is_some_and(|slot| slot.generation == generation)
    }

    /// Drop the slot after a `Closed` event so the channel reads as free.
    pub fn release_after_close(&mut self, channel: LogChannel, generation: u64) {
        if self.owns(channel, generation) {
            self.slots.remove(&channel);
        }
    }

    /// Close whichever channels are streaming the given job.
    pub fn close_job(&mut self, job_id: &str) {
        let channels: Vec<LogChannel> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.job_id == job_id)
            .map(|(channel, _)| *channel)
            .collect();
        for channel in channels {
            self.close(channel);
        }
    }

    /// Schedule a deferred summary fetch against the channel's current
    /// stream (used by view-log on crawl jobs, ~500 ms).
    pub fn request_deferred_summary(
        &self,
        channel: LogChannel,
        job_id: &str,
        delay: Duration,
    ) {
        let Some(slot) = self.slots.get(&channel) else {
            return;
        };
        let generation = slot.generation;
        let tx = self.tx.clone();
        let job_id = job_id.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(LogEvent::SummaryDue { channel, generation, job_id });
        });
    }
}

/// Pump one job-log SSE stream into the event channel.
///
/// Log payloads are plain text, appended verbatim. On the crawl channel
/// the literal completion marker schedules a summary fetch about a second
/// later.
fn spawn_log_pump(
    client: ApiClient,
    channel: LogChannel,
    job_id: String,
    generation: u64,
    tx: mpsc::UnboundedSender<LogEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = match client
            .sse_get(&format!("/api/admin/jobs/{job_id}/log"))
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                let _ = tx.send(LogEvent::Closed {
                    channel,
                    generation,
                    reason: Some(e.panel_text()),
                });
                return;
            }
        };

        let mut completion_seen = false;
        loop {
            match stream.next().await {
                SseRead::Event(event) => {
                    let text = event.data;
                    if channel == LogChannel::Crawl
                        && !completion_seen
                        && text.contains(CRAWL_COMPLETE_MARKER)
                    {
                        completion_seen = true;
                        let tx = tx.clone();
                        let job_id = job_id.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(SUMMARY_FETCH_DELAY).await;
                            let _ = tx.send(LogEvent::SummaryDue {
                                channel,
                                generation,
                                job_id,
                            });
                        });
                    }
                    let _ = tx.send(LogEvent::Line { channel, generation, text });
                }
                SseRead::Closed => {
                    let _ = tx.send(LogEvent::Closed { channel, generation, reason: None });
                    return;
                }
                SseRead::Failed(message) => {
                    let _ = tx.send(LogEvent::Closed {
                        channel,
                        generation,
                        reason: Some(message),
                    });
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (LogStreamManager, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LogStreamManager::new(tx), rx)
    }

    #[tokio::test]
    async fn open_replaces_prior_stream_on_the_same_channel() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut logs, _rx) = manager();

        logs.open(&client, LogChannel::Crawl, "J1");
        let first_gen = logs.slots[&LogChannel::Crawl].generation;
        logs.open(&client, LogChannel::Crawl, "J2");
        let second_gen = logs.slots[&LogChannel::Crawl].generation;

        assert!(second_gen > first_gen);
        assert_eq!(logs.job_for(LogChannel::Crawl), Some("J2"));
        assert!(!logs.owns(LogChannel::Crawl, first_gen), "old pump lost the slot");
        assert!(logs.owns(LogChannel::Crawl, second_gen));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_clears_ownership() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut logs, _rx) = manager();

        logs.open(&client, LogChannel::Jobs, "J1");
        let generation = logs.slots[&LogChannel::Jobs].generation;

        logs.close(LogChannel::Jobs);
        assert!(!logs.is_open(LogChannel::Jobs));
        assert!(!logs.owns(LogChannel::Jobs, generation));
        logs.close(LogChannel::Jobs);
        assert!(!logs.is_open(LogChannel::Jobs));
    }

    #[tokio::test]
    async fn close_job_sweeps_matching_channels_only() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut logs, _rx) = manager();

        logs.open(&client, LogChannel::Crawl, "J1");
        logs.open(&client, LogChannel::Jobs, "J1");
        logs.open(&client, LogChannel::Ingest, "I1");

        logs.close_job("J1");
        assert!(!logs.is_open(LogChannel::Crawl));
        assert!(!logs.is_open(LogChannel::Jobs));
        assert!(logs.is_open(LogChannel::Ingest));
    }

    #[tokio::test]
    async fn release_after_close_respects_generation() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let (mut logs, _rx) = manager();

        logs.open(&client, LogChannel::Crawl, "J1");
        let old_gen = logs.slots[&LogChannel::Crawl].generation;
        logs.open(&client, LogChannel::Crawl, "J2");

        // A Closed event from the replaced stream must not free the new slot
        logs.release_after_close(LogChannel::Crawl, old_gen);
        assert!(logs.is_open(LogChannel::Crawl));
        assert_eq!(logs.job_for(LogChannel::Crawl), Some("J2"));
    }
}
