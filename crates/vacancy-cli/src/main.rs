use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vacancy_client::{
    ChromiumBrowser, HttpSubmitter, ListingConfig, ListingSource, OpenAiClient, ReqwestFetcher,
    StandardResolver, WebhookNotifier, standard_resolver,
};
use vacancy_core::session::CookieCache;
use vacancy_core::traits::Resolver;
use vacancy_core::{
    CrawlConfig, CrawlOrchestrator, LlmRelevanceClassifier, NotificationProcessor, QueueWorker,
    RetryPolicy, TracingWorkerReporter, VacancyProcessor, WorkerConfig,
};
use vacancy_db::{Database, DatabaseConfig, PgMessageQueue, VacancyRepository};

#[derive(Parser)]
#[command(name = "vacancy", version, about = "Vacancy intake workers and crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, store and fan out queued submissions
    VacancyWorker {
        #[command(flatten)]
        resolver: ResolverArgs,

        #[command(flatten)]
        worker: WorkerArgs,

        /// Queue the intake server publishes to
        #[arg(long, env = "VACANCY_VACANCY_QUEUE", default_value = "vacancies")]
        queue: String,

        /// Queue notifications are published to
        #[arg(
            long,
            env = "VACANCY_NOTIFICATION_QUEUE",
            default_value = "notifications"
        )]
        notification_queue: String,

        /// Comma-separated recipient ids, one notification each per vacancy
        #[arg(long, env = "VACANCY_NOTIFY_RECIPIENTS", value_delimiter = ',')]
        recipients: Vec<String>,
    },

    /// Deliver queued notifications to a webhook
    NotificationWorker {
        #[command(flatten)]
        worker: WorkerArgs,

        #[arg(long, env = "VACANCY_NOTIFY_WEBHOOK_URL")]
        webhook_url: String,

        #[arg(
            long,
            env = "VACANCY_NOTIFICATION_QUEUE",
            default_value = "notifications"
        )]
        queue: String,
    },

    /// Crawl the job boards once and forward new postings for review
    Crawl {
        /// Base URL of the intake server
        #[arg(
            long,
            env = "VACANCY_SERVER_URL",
            default_value = "http://localhost:3000"
        )]
        server_url: String,

        #[arg(long, env = "VACANCY_SERVER_API_KEY")]
        api_key: String,

        /// Ask the LLM whether each posting fits before forwarding it
        #[arg(long, default_value_t = false)]
        classify: bool,

        #[command(flatten)]
        llm: LlmArgs,

        /// Comma-separated hosts whose postings are never forwarded
        #[arg(long, env = "VACANCY_CRAWL_BLACKLIST", value_delimiter = ',')]
        blacklist: Vec<String>,

        /// Posting pages fetched at the same time, per board
        #[arg(long, default_value_t = 10)]
        concurrency: usize,

        /// Comma-separated boards to crawl
        #[arg(
            long,
            env = "VACANCY_CRAWL_BOARDS",
            value_delimiter = ',',
            default_value = "weworkremotely,golangprojects"
        )]
        boards: Vec<String>,
    },

    /// Resolve one posting URL and print the vacancy as JSON
    Resolve {
        url: String,

        #[command(flatten)]
        resolver: ResolverArgs,
    },
}

#[derive(Args, Debug)]
struct LlmArgs {
    #[arg(long, env = "VACANCY_LLM_API_KEY")]
    llm_api_key: Option<String>,

    /// Model name, e.g. "gpt-4o-mini" or "gemini-2.5-flash"
    #[arg(long, env = "VACANCY_LLM_MODEL")]
    llm_model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "VACANCY_LLM_BASE_URL")]
    llm_base_url: Option<String>,
}

impl LlmArgs {
    fn client(&self) -> Result<OpenAiClient> {
        let api_key = self
            .llm_api_key
            .as_deref()
            .context("VACANCY_LLM_API_KEY not set")?;
        let mut client = OpenAiClient::new(api_key)?;
        if let Some(model) = &self.llm_model {
            client = client.with_model(model)?;
        }
        if let Some(base_url) = &self.llm_base_url {
            client = client.with_base_url(base_url)?;
        }
        Ok(client)
    }
}

#[derive(Args, Debug)]
struct ResolverArgs {
    #[command(flatten)]
    llm: LlmArgs,

    /// Comma-separated hosts whose postings are read as text instead of screenshots
    #[arg(long, env = "VACANCY_TEXT_DOMAINS", value_delimiter = ',')]
    text_domains: Vec<String>,
}

impl ResolverArgs {
    async fn build(&self, db: &Database) -> Result<StandardResolver<VacancyRepository>> {
        let llm = self.llm.client()?;
        let browser = ChromiumBrowser::launch().await?;
        Ok(standard_resolver(
            db.vacancy_repo(),
            llm,
            browser,
            ReqwestFetcher::new()?,
            &self.text_domains,
        ))
    }
}

#[derive(Args, Debug)]
struct WorkerArgs {
    /// Consumer id recorded on claimed messages (random if unset)
    #[arg(long, env = "VACANCY_WORKER_ID")]
    worker_id: Option<String>,

    /// Idle wait between polls, in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Attempts per message before it is discarded
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Wait before republishing a failed message, in milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// Seconds before a claim left unsettled by a dead worker is handed out again
    #[arg(long, env = "VACANCY_QUEUE_VISIBILITY_TIMEOUT_SECS", default_value_t = 1800)]
    visibility_timeout_secs: u64,
}

impl WorkerArgs {
    fn config(&self) -> WorkerConfig {
        let mut config = WorkerConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_retry_policy(RetryPolicy::new(
                self.max_attempts.max(1),
                Duration::from_millis(self.retry_backoff_ms),
            ));
        if let Some(id) = &self.worker_id {
            config = config.with_worker_id(id.clone());
        }
        config
    }

    fn queue(&self, db: &Database, name: &str) -> PgMessageQueue {
        db.queue(name)
            .with_visibility_timeout(Duration::from_secs(self.visibility_timeout_secs.max(1)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vacancy=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::VacancyWorker {
            resolver,
            worker,
            queue,
            notification_queue,
            recipients,
        } => {
            let db = connect_db().await?;
            let resolver = resolver.build(&db).await?;
            if recipients.is_empty() {
                tracing::warn!("No notification recipients configured");
            }
            let processor = VacancyProcessor::new(
                resolver,
                db.vacancy_repo(),
                db.queue(&notification_queue),
                recipients,
            );
            let worker = QueueWorker::new(worker.queue(&db, &queue), processor, worker.config());
            worker
                .run(cancel_on_signal(), &TracingWorkerReporter)
                .await?;
        }
        Commands::NotificationWorker {
            worker,
            webhook_url,
            queue,
        } => {
            let db = connect_db().await?;
            let processor = NotificationProcessor::new(WebhookNotifier::new(&webhook_url)?);
            let worker = QueueWorker::new(worker.queue(&db, &queue), processor, worker.config());
            worker
                .run(cancel_on_signal(), &TracingWorkerReporter)
                .await?;
        }
        Commands::Crawl {
            server_url,
            api_key,
            classify,
            llm,
            blacklist,
            concurrency,
            boards,
        } => {
            let db = connect_db().await?;
            let classifier = if classify {
                Some(LlmRelevanceClassifier::new(llm.client()?))
            } else {
                None
            };

            let fetcher = ReqwestFetcher::new()?.with_cookie_cache(CookieCache::new());
            let sources = select_boards(&boards)?
                .into_iter()
                .map(|board| ListingSource::new(fetcher.clone(), board))
                .collect::<Result<Vec<_>, _>>()?;

            let config = CrawlConfig::default()
                .with_concurrency(concurrency)
                .with_blacklist(&blacklist);
            let orchestrator = CrawlOrchestrator::new(
                sources,
                db.vacancy_repo(),
                db.approval_repo(),
                classifier,
                HttpSubmitter::new(&server_url, &api_key)?,
                config,
            )?;

            let report = orchestrator.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Resolve { url, resolver } => {
            let db = connect_db().await?;
            let resolver = resolver.build(&db).await?;
            tracing::info!("Resolving {}", url);
            let vacancy = resolver.resolve(&url).await?;
            println!("{}", serde_json::to_string_pretty(&vacancy)?);
        }
    }

    Ok(())
}

fn select_boards(names: &[String]) -> Result<Vec<ListingConfig>> {
    let available = ListingConfig::defaults();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            available
                .iter()
                .find(|board| board.name == name)
                .cloned()
                .with_context(|| format!("Unknown board '{name}'"))
        })
        .collect()
}

async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

/// A token cancelled on Ctrl-C or SIGTERM.
fn cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, finishing in-flight work");
        cancel.cancel();
    });
    token
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
