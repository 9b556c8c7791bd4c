use clap::{Parser, Subcommand};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use ragdeck::api::{ApiClient, resolve_base_url};
use ragdeck::core::summary::CrawlSummary;
use ragdeck::core::validation;
use ragdeck::{tui, utils};

#[derive(Parser)]
#[command(name = "ragdeck")]
#[command(version)]
#[command(about = "Terminal admin console for local-first RAG pipelines")]
#[command(long_about = "\
ragdeck drives a local-first retrieval-augmented-generation backend from the
terminal.

It provides:
  - Streaming chat sessions against the RAG pipeline
  - A crawl configuration editor (seeds, allow rules, auth profiles)
  - Job management with live log streams and crawl summaries
  - A validation workspace with quarantine batch operations
  - Pipeline health cards and cross-system data checks

Most commands talk to the backend's admin surface and need the admin token.")]
#[command(after_long_help = "\
QUICK START:
    ragdeck                      # launch the TUI
    ragdeck crawl                # enqueue a crawl and follow its log
    ragdeck jobs list
    ragdeck health

ENVIRONMENT VARIABLES:
    RUST_LOG                Log level filter (default: ragdeck=info)
    RAGDECK_API_URL         Backend base URL (default: http://localhost:8000)
    RAGDECK_ADMIN_TOKEN     Admin token presented to /api/admin endpoints
    RAGDECK_DOWNLOAD_DIR    Where exported attachments are written

FILE LOCATIONS:
    ~/.ragdeck/logs/                     TUI log files (7-day retention)
    ~/.config/ragdeck/preferences.json   Persisted UI state

Use 'ragdeck <command> --help' for command-specific information.")]
struct Cli {
    /// Backend base URL (overrides RAGDECK_API_URL and the stored preference)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Admin token (falls back to RAGDECK_ADMIN_TOKEN)
    #[arg(long, global = true, env = "RAGDECK_ADMIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the terminal UI
    ///
    /// Interactive console with chat, crawl config, jobs, and validation.
    #[command(after_help = "\
EXAMPLES:
    # Launch the TUI
    ragdeck tui

KEYBOARD SHORTCUTS:
    Tab         switch tabs
    U           unlock admin surface
    ?           full key reference")]
    Tui,

    /// Enqueue a crawl job and follow its log to completion
    #[command(after_help = "\
EXAMPLES:
    ragdeck crawl
    ragdeck crawl --no-follow")]
    Crawl {
        /// Print the job id and exit instead of streaming the log
        #[arg(long)]
        no_follow: bool,
    },

    /// Start an ingest run and poll it to completion
    Ingest,

    /// Inspect and manage background jobs
    #[command(subcommand)]
    Jobs(JobsCommands),

    /// Run a validation pass and print its findings
    #[command(after_help = "\
EXAMPLES:
    ragdeck validate crawl
    ragdeck validate ingest")]
    Validate {
        /// Which pipeline stage to validate: 'crawl' or 'ingest'
        #[arg(value_parser = ["crawl", "ingest"])]
        kind: String,
    },

    /// Print pipeline health
    Health,

    /// Look a URL up across artifacts, validation, ingest, and Qdrant
    CheckUrl {
        /// The URL to check
        url: String,
    },

    /// Search artifacts and vectors
    Search {
        /// Query text
        query: String,
    },

    /// Show resolved configuration and paths
    Config,
}

#[derive(Subcommand)]
enum JobsCommands {
    /// List all jobs
    List,

    /// Delete a job and its logs
    Delete {
        /// Job id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export a job log to the downloads directory
    Export {
        /// Job id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            initialize_tui_logging()?;
            tui::run(cli.api_url).await
        }
        command => {
            initialize_cli_logging();
            let base_url = match &cli.api_url {
                Some(url) => url.trim_end_matches('/').to_owned(),
                None => {
                    let prefs = tui::preferences::PreferencesStore::load().await;
                    resolve_base_url(prefs.prefs.api_url.as_deref())
                }
            };
            let mut client = ApiClient::new(base_url);
            if let Some(token) = &cli.token {
                // Present the token up front; admin endpoints reject stale ones
                client
                    .post_json::<_, serde_json::Value>(
                        "/api/admin/unlock",
                        &serde_json::json!({ "token": token }),
                    )
                    .await
                    .map_err(|e| anyhow::anyhow!("admin unlock failed: {e}"))?;
                client.set_admin_token(token);
            }
            run_command(client, command).await
        }
    }
}

#[expect(clippy::print_stdout, reason = "CLI output goes to stdout by design")]
async fn run_command(client: ApiClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tui => unreachable!("handled in main"),
        Commands::Crawl { no_follow } => {
            let resp: ragdeck::api::types::EnqueueResponse = client
                .post_json("/api/admin/crawl", &serde_json::json!({}))
                .await?;
            println!("crawl job {} enqueued", resp.job_id);
            if !no_follow {
                follow_job_log(&client, &resp.job_id).await?;
            }
        }
        Commands::Ingest => {
            let resp: ragdeck::api::types::EnqueueResponse = client
                .post_json("/api/ingest", &serde_json::json!({}))
                .await?;
            println!("ingest job {} started", resp.job_id);
            poll_ingest(&client, &resp.job_id).await?;
        }
        Commands::Jobs(JobsCommands::List) => {
            let resp: ragdeck::api::types::JobListResponse =
                client.get_json("/api/admin/jobs").await?;
            println!("{:24} {:8} {:10} {:22}", "JOB", "TYPE", "STATUS", "STARTED");
            for job in resp.jobs {
                println!(
                    "{:24} {:8} {:10} {:22}",
                    job.job_id,
                    job.job_type.label(),
                    job.status,
                    job.started_at.as_deref().unwrap_or("-"),
                );
            }
        }
        Commands::Jobs(JobsCommands::Delete { id, force }) => {
            if !force {
                anyhow::bail!("refusing to delete without --force");
            }
            client.delete(&format!("/api/admin/jobs/{id}")).await?;
            println!("deleted job {id}");
        }
        Commands::Jobs(JobsCommands::Export { id }) => {
            let response = client
                .get_response(&format!("/api/admin/jobs/{id}/log/export"))
                .await?;
            let path = ragdeck::api::save_attachment(response, &format!("job-{id}.log")).await?;
            println!("exported to {}", path.display());
        }
        Commands::Validate { kind } => {
            client.post_empty(&format!("/api/admin/validate/{kind}")).await?;
            let summary: ragdeck::api::types::ValidationSummaryDto = client
                .get_json(&format!("/api/admin/validate/{kind}/summary"))
                .await?;
            let (high, lower): (Vec<_>, Vec<_>) = summary
                .findings
                .iter()
                .partition(|f| validation::is_high_priority(f));
            println!(
                "checked {}  passed {}  failed {}",
                summary.checked.unwrap_or(0),
                summary.passed.unwrap_or(0),
                summary.failed.unwrap_or(0),
            );
            println!("high priority ({}):", high.len());
            for finding in &high {
                println!(
                    "  [{}] {}  {}",
                    finding.id,
                    finding.url.as_deref().unwrap_or("-"),
                    finding.reason,
                );
            }
            println!("lower priority: {}", lower.len());
        }
        Commands::Health => {
            let health: ragdeck::api::types::ApiHealthDto =
                client.get_json("/api/health").await?;
            println!("api:    {}", health.api.as_deref().unwrap_or("-"));
            println!("ollama: {}", health.ollama.as_deref().unwrap_or("-"));
            println!("qdrant: {}", health.qdrant.as_deref().unwrap_or("-"));
            println!("model:  {}", health.model.as_deref().unwrap_or("-"));
            if client.has_admin_token() {
                let tree: ragdeck::api::types::HealthTreeDto =
                    client.get_json("/api/admin/data/health").await?;
                println!("{}", serde_json::to_string_pretty(&tree)?);
            }
        }
        Commands::CheckUrl { url } => {
            let report: ragdeck::api::types::CheckUrlReportDto = client
                .post_json("/api/admin/data/check_url", &serde_json::json!({ "url": url }))
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { query } => {
            let results: ragdeck::api::types::SearchResponseDto = client
                .post_json(
                    "/api/admin/data/search",
                    &serde_json::json!({ "query": query, "limit": 10 }),
                )
                .await?;
            println!("artifacts ({}):", results.artifacts.len());
            for hit in &results.artifacts {
                println!("  {hit}");
            }
            println!("qdrant ({}):", results.qdrant_matches.len());
            for hit in &results.qdrant_matches {
                println!("  {hit}");
            }
        }
        Commands::Config => {
            println!("ragdeck configuration\n");
            println!("VERSION:");
            println!("    {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("BACKEND:");
            println!("    {}", client.base_url());
            println!();
            println!("FILE PATHS:");
            print_path("Logs directory", &utils::paths::logs_dir());
            print_path("Preferences", &utils::paths::preferences_path());
            print_path("Downloads", &utils::paths::downloads_dir());
        }
    }
    Ok(())
}

/// Stream a job log to stdout until the server ends the stream.
#[expect(clippy::print_stdout, reason = "CLI output goes to stdout by design")]
async fn follow_job_log(client: &ApiClient, job_id: &str) -> anyhow::Result<()> {
    use ragdeck::api::SseRead;

    let mut stream = client.sse_get(&format!("/api/admin/jobs/{job_id}/log")).await?;
    let mut saw_completion = false;
    loop {
        match stream.next().await {
            SseRead::Event(event) => {
                if event.data.contains("Crawl job complete") {
                    saw_completion = true;
                }
                println!("{}", event.data);
            }
            SseRead::Closed => break,
            SseRead::Failed(message) => anyhow::bail!("log stream failed: {message}"),
        }
    }

    if saw_completion {
        // The summary materializes shortly after the completion line
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        let dto: ragdeck::api::types::CrawlSummaryDto = client
            .get_json(&format!("/api/admin/jobs/{job_id}/summary"))
            .await?;
        let summary = CrawlSummary::from_wire(dto);
        let pills: Vec<String> = summary
            .pills()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect();
        println!("{}", pills.join("  "));
    }
    Ok(())
}

/// Poll an ingest job every two seconds until it reaches a terminal state.
#[expect(clippy::print_stdout, reason = "CLI output goes to stdout by design")]
async fn poll_ingest(client: &ApiClient, job_id: &str) -> anyhow::Result<()> {
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        let status: ragdeck::api::types::IngestStatusDto =
            client.get_json(&format!("/api/ingest/{job_id}")).await?;
        println!(
            "{} {}/{} errors={}",
            status.status, status.done_artifacts, status.total_artifacts, status.errors,
        );
        if status.is_terminal() {
            if status.status == "done" {
                println!("Ingest complete");
            }
            return Ok(());
        }
    }
}

#[expect(clippy::print_stdout, reason = "CLI output goes to stdout by design")]
fn print_path(name: &str, path: &std::path::Path) {
    println!("    {name}: {}", path.display());
}

/// Initialize simple console-only logging for CLI commands.
///
/// This is used for non-TUI commands that don't need file logging.
fn initialize_cli_logging() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ragdeck=warn".into()),
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

/// Initialize file logging for the TUI.
///
/// The terminal is the UI, so nothing may log to stdout. Log files are
/// timestamped per run, a `latest.log` symlink points at the newest one,
/// and files older than 7 days are removed at startup.
fn initialize_tui_logging() -> anyhow::Result<()> {
    let logs_dir = utils::paths::logs_dir();
    std::fs::create_dir_all(&logs_dir)?;

    // Clean up old log files before logging is initialized
    let cleanup_result = utils::log_cleanup::cleanup_old_logs(&logs_dir, None);

    let timestamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
    let log_filename = format!("ragdeck.{timestamp}.log");
    let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);

    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        let _ = std::fs::remove_file(logs_dir.join("latest.log"));
        let _ = symlink(&log_filename, logs_dir.join("latest.log"));
    }

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ragdeck=info".into()),
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(env_filter),
        )
        .init();

    tracing::info!("ragdeck v{} starting", env!("CARGO_PKG_VERSION"));
    match cleanup_result {
        Ok(result) => {
            if result.removed > 0 {
                tracing::info!("Cleaned up {} old log files", result.removed);
            }
            for file in &result.failed {
                tracing::warn!("Failed to remove old log file: {}", file);
            }
        }
        Err(e) => tracing::warn!("Failed to clean up old logs: {}", e),
    }

    Ok(())
}
