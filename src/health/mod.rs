//! Pipeline health cards and cross-system data checks.
//!
//! Rendering is total: every accessor on the loosely-typed health tree
//! degrades to `unknown`/`—` instead of failing, so a partial or novel
//! server payload can never take the panel down.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::types::{
    ApiHealthDto, CheckUrlReportDto, HealthTreeDto, SearchResponseDto, WorkerStatusDto,
};
use crate::api::{ApiClient, ApiError};

/// Worker status poll cadence.
const WORKER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Search result cap sent with every query.
const SEARCH_LIMIT: u32 = 10;

/// Card status color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTone {
    /// Healthy.
    Ok,
    /// Degraded or idle.
    Warn,
    /// Failing.
    Bad,
    /// No data.
    Unknown,
}

/// One card in the health grid.
#[derive(Debug)]
pub struct HealthCard {
    /// Card title.
    pub title: &'static str,
    /// Label/value rows.
    pub rows: Vec<(String, String)>,
    /// Status color.
    pub tone: CardTone,
}

/// Background update from the worker-status poll.
#[derive(Debug)]
pub struct HealthEvent {
    /// Poll generation.
    pub generation: u64,
    /// The fetched status, or `None` when the endpoint failed.
    pub worker: Option<WorkerStatusDto>,
}

/// Pipeline health and check-data state.
#[derive(Debug, Default)]
pub struct HealthController {
    /// The admin data-health tree.
    pub tree: Option<HealthTreeDto>,
    /// Service-level health (`/api/health`).
    pub api_health: Option<ApiHealthDto>,
    /// Ingest worker liveness.
    pub worker: Option<WorkerStatusDto>,
    /// Last check-url report.
    pub check_report: Option<CheckUrlReportDto>,
    /// The URL the report was built for.
    pub checked_url: Option<String>,
    /// Last search results.
    pub search_results: Option<SearchResponseDto>,
    /// The query the results were built for.
    pub search_query: Option<String>,
    generation: u64,
    poll_task: Option<JoinHandle<()>>,
}

impl HealthController {
    /// Create an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-fetch the health tree and service health.
    ///
    /// # Errors
    ///
    /// Propagates the first API error; the other document may still have
    /// been applied.
    pub async fn refresh(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let mut first_error = None;
        match client.get_json::<HealthTreeDto>("/api/admin/data/health").await {
            Ok(tree) => self.tree = Some(tree),
            Err(e) => first_error = Some(e),
        }
        match client.get_json::<ApiHealthDto>("/api/health").await {
            Ok(health) => self.api_health = Some(health),
            Err(e) => first_error = first_error.or(Some(e)),
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Look one URL up across artifacts, validation, ingest, and Qdrant.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn check_url(&mut self, client: &ApiClient, url: &str) -> Result<(), ApiError> {
        let report: CheckUrlReportDto = client
            .post_json("/api/admin/data/check_url", &serde_json::json!({ "url": url }))
            .await?;
        self.checked_url = Some(url.to_owned());
        self.check_report = Some(report);
        Ok(())
    }

    /// Run a text search over artifacts and vectors.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn search(&mut self, client: &ApiClient, query: &str) -> Result<(), ApiError> {
        let results: SearchResponseDto = client
            .post_json(
                "/api/admin/data/search",
                &serde_json::json!({ "query": query, "limit": SEARCH_LIMIT }),
            )
            .await?;
        self.search_query = Some(query.to_owned());
        self.search_results = Some(results);
        Ok(())
    }

    /// Start the ~5 s worker-status poll.
    pub fn start_worker_poll(
        &mut self,
        client: &ApiClient,
        tx: &mpsc::UnboundedSender<HealthEvent>,
    ) {
        self.stop_worker_poll();
        self.generation += 1;
        let generation = self.generation;
        let client = client.clone();
        let tx = tx.clone();
        self.poll_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(WORKER_POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let worker = client
                    .get_json::<WorkerStatusDto>("/api/ingest/worker/status")
                    .await
                    .ok();
                if tx.send(HealthEvent { generation, worker }).is_err() {
                    return;
                }
            }
        }));
    }

    /// Stop the worker poll (admin-session reset).
    pub fn stop_worker_poll(&mut self) {
        self.generation += 1;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    /// Apply one poll result; stale generations are dropped.
    pub fn handle_event(&mut self, event: HealthEvent) {
        if event.generation != self.generation {
            return;
        }
        if event.worker.is_some() {
            self.worker = event.worker;
        }
    }

    /// Build the card grid from whatever is loaded.
    #[must_use]
    pub fn cards(&self) -> Vec<HealthCard> {
        let tree = self.tree.as_ref();
        vec![
            self.artifacts_card(tree),
            self.crawl_card(tree),
            self.ingest_card(tree),
            self.qdrant_card(tree),
            self.system_card(tree),
            self.api_card(),
        ]
    }

    fn artifacts_card(&self, tree: Option<&HealthTreeDto>) -> HealthCard {
        let subtree = tree.and_then(|t| t.artifacts.as_ref());
        let total = value_display(subtree, &["total"]);
        let quarantined = value_display(subtree, &["quarantined"]);
        HealthCard {
            title: "Artifacts",
            tone: if subtree.is_some() { CardTone::Ok } else { CardTone::Unknown },
            rows: vec![
                ("total".to_owned(), total),
                ("quarantined".to_owned(), quarantined),
            ],
        }
    }

    fn crawl_card(&self, tree: Option<&HealthTreeDto>) -> HealthCard {
        let subtree = tree.and_then(|t| t.crawl.as_ref());
        let last_status = value_str(subtree, &["last_job", "status"])
            .or_else(|| value_str(subtree, &["last_status"]));
        let tone = match last_status.as_deref() {
            Some("done" | "completed") => CardTone::Ok,
            Some("running" | "queued") => CardTone::Warn,
            Some("error" | "failed") => CardTone::Bad,
            Some(_) => CardTone::Warn,
            None => CardTone::Unknown,
        };
        HealthCard {
            title: "Crawl",
            tone,
            rows: vec![
                ("last job".to_owned(), last_status.unwrap_or_else(unknown)),
                ("captured".to_owned(), value_display(subtree, &["captured"])),
            ],
        }
    }

    fn ingest_card(&self, tree: Option<&HealthTreeDto>) -> HealthCard {
        let subtree = tree.and_then(|t| t.ingest.as_ref());
        let worker_alive = self
            .worker
            .as_ref()
            .and_then(|w| w.worker.as_ref())
            .and_then(|p| p.pid)
            .is_some();
        let age = self.worker.as_ref().and_then(|w| w.age_seconds);
        let tone = if worker_alive {
            // A worker that has not checked in for a while is suspect
            if age.is_some_and(|a| a > 60.0) { CardTone::Warn } else { CardTone::Ok }
        } else if self.worker.is_some() {
            CardTone::Bad
        } else {
            CardTone::Unknown
        };
        HealthCard {
            title: "Ingest",
            tone,
            rows: vec![
                (
                    "worker".to_owned(),
                    if worker_alive { "alive".to_owned() } else { unknown() },
                ),
                (
                    "queue".to_owned(),
                    self.worker
                        .as_ref()
                        .and_then(|w| w.queue_depth)
                        .map_or_else(unknown, |d| d.to_string()),
                ),
                ("pending".to_owned(), value_display(subtree, &["pending"])),
            ],
        }
    }

    fn qdrant_card(&self, tree: Option<&HealthTreeDto>) -> HealthCard {
        let subtree = tree.and_then(|t| t.qdrant.as_ref());
        HealthCard {
            title: "Qdrant",
            tone: if subtree.is_some() { CardTone::Ok } else { CardTone::Unknown },
            rows: vec![
                ("points".to_owned(), value_display(subtree, &["points"])),
                ("collection".to_owned(), value_display(subtree, &["collection"])),
            ],
        }
    }

    fn system_card(&self, tree: Option<&HealthTreeDto>) -> HealthCard {
        let subtree = tree.and_then(|t| t.system.as_ref());
        HealthCard {
            title: "System",
            tone: if subtree.is_some() { CardTone::Ok } else { CardTone::Unknown },
            rows: vec![
                ("disk free".to_owned(), value_display(subtree, &["disk_free"])),
                ("uptime".to_owned(), value_display(subtree, &["uptime"])),
            ],
        }
    }

    fn api_card(&self) -> HealthCard {
        let health = self.api_health.as_ref();
        let api = health.and_then(|h| h.api.clone());
        let tone = match api.as_deref() {
            Some("ok" | "healthy") => CardTone::Ok,
            Some(_) => CardTone::Warn,
            None => CardTone::Unknown,
        };
        HealthCard {
            title: "API",
            tone,
            rows: vec![
                ("api".to_owned(), api.unwrap_or_else(unknown)),
                (
                    "ollama".to_owned(),
                    health.and_then(|h| h.ollama.clone()).unwrap_or_else(unknown),
                ),
                (
                    "qdrant".to_owned(),
                    health.and_then(|h| h.qdrant.clone()).unwrap_or_else(unknown),
                ),
                (
                    "model".to_owned(),
                    health.and_then(|h| h.model.clone()).unwrap_or_else(unknown),
                ),
            ],
        }
    }
}

fn unknown() -> String {
    "—".to_owned()
}

/// Walk a path through a JSON subtree, returning a display string.
fn value_str(subtree: Option<&serde_json::Value>, path: &[&str]) -> Option<String> {
    let mut node = subtree?;
    for key in path {
        node = node.get(key)?;
    }
    match node {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_display(subtree: Option<&serde_json::Value>, path: &[&str]) -> String {
    value_str(subtree, path).unwrap_or_else(unknown)
}

/// The four check-url tiles, present or absent rendered uniformly.
#[must_use]
pub fn check_url_tiles(report: &CheckUrlReportDto) -> Vec<(&'static str, bool, String)> {
    let tile = |name: &'static str, value: &Option<serde_json::Value>| {
        let present = value.as_ref().is_some_and(|v| !v.is_null());
        let detail = value
            .as_ref()
            .and_then(|v| {
                v.get("status")
                    .or_else(|| v.get("state"))
                    .or_else(|| v.get("count"))
                    .map(std::string::ToString::to_string)
            })
            .unwrap_or_else(|| if present { "present".to_owned() } else { "absent".to_owned() });
        (name, present, detail)
    };
    vec![
        tile("artifact", &report.artifact),
        tile("validation", &report.validation),
        tile("ingest", &report.ingest),
        tile("qdrant", &report.qdrant),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cards_render_total_on_empty_state() {
        let controller = HealthController::new();
        let cards = controller.cards();
        assert_eq!(cards.len(), 6);
        assert!(cards.iter().all(|c| c.tone == CardTone::Unknown));
        assert!(
            cards.iter().flat_map(|c| &c.rows).all(|(_, v)| v == "—"),
            "missing subtrees render as dashes"
        );
    }

    #[test]
    fn crawl_tone_follows_last_job_status() {
        let mut controller = HealthController::new();
        controller.tree = Some(
            serde_json::from_str(r#"{"crawl": {"last_job": {"status": "error"}}}"#).unwrap(),
        );
        let cards = controller.cards();
        let crawl = cards.iter().find(|c| c.title == "Crawl").unwrap();
        assert_eq!(crawl.tone, CardTone::Bad);
        assert_eq!(crawl.rows[0].1, "error");
    }

    #[test]
    fn ingest_tone_follows_worker_liveness() {
        let mut controller = HealthController::new();
        controller.worker = Some(
            serde_json::from_str(r#"{"age_seconds": 3.0, "queue_depth": 2, "worker": {"pid": 42}}"#)
                .unwrap(),
        );
        let cards = controller.cards();
        let ingest = cards.iter().find(|c| c.title == "Ingest").unwrap();
        assert_eq!(ingest.tone, CardTone::Ok);
        assert_eq!(ingest.rows[1].1, "2");

        controller.worker = Some(WorkerStatusDto::default());
        let cards = controller.cards();
        let ingest = cards.iter().find(|c| c.title == "Ingest").unwrap();
        assert_eq!(ingest.tone, CardTone::Bad, "known-dead worker is bad, not unknown");
    }

    #[test]
    fn stale_poll_generations_are_dropped() {
        let mut controller = HealthController::new();
        controller.generation = 2;
        controller.handle_event(HealthEvent {
            generation: 1,
            worker: Some(WorkerStatusDto::default()),
        });
        assert!(controller.worker.is_none());
    }

    #[test]
    fn check_url_tiles_handle_presence_uniformly() {
        let report: CheckUrlReportDto = serde_json::from_str(
            r#"{"artifact": {"status": "captured"}, "qdrant": null}"#,
        )
        .unwrap();
        let tiles = check_url_tiles(&report);
        assert_eq!(tiles.len(), 4);
        assert!(tiles[0].1, "artifact present");
        assert!(!tiles[3].1, "qdrant absent");
        assert_eq!(tiles[3].2, "absent");
    }
}
