use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vacancy_client::{
    ChromiumBrowser, OpenAiClient, ReqwestFetcher, WebhookApprovalGateway, standard_resolver,
};
use vacancy_core::{ApprovalGate, ApprovalService, RequestTokenizer, SubmissionService};
use vacancy_db::{Database, DatabaseConfig};
use vacancy_server::config::ServerConfig;
use vacancy_server::routes;
use vacancy_server::state::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vacancy=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let addr = format!("0.0.0.0:{}", config.port);

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let mut llm = OpenAiClient::new(&config.llm_api_key)?;
    if let Some(model) = &config.llm_model {
        llm = llm.with_model(model)?;
    }
    if let Some(base_url) = &config.llm_base_url {
        llm = llm.with_base_url(base_url)?;
    }

    let browser = ChromiumBrowser::launch().await?;
    let resolver = standard_resolver(
        db.vacancy_repo(),
        llm,
        browser,
        ReqwestFetcher::new()?,
        &config.text_domains,
    );

    let gateway = WebhookApprovalGateway::new(&config.approval_webhook_url, &config.server_domain)?;
    let queue = db.queue(&config.vacancy_queue);

    let intake = SubmissionService::new(
        resolver,
        db.approval_repo(),
        gateway.clone(),
        queue.clone(),
        RequestTokenizer::new(&config.token_secret)?,
        ApprovalGate::from_list(&config.approved_submitters),
    );
    let review = ApprovalService::new(
        db.approval_repo(),
        gateway,
        queue,
        RequestTokenizer::new(&config.token_secret)?,
    );

    let state = Arc::new(AppState {
        intake: Arc::new(intake),
        review: Arc::new(review),
        api_key: config.api_key,
        db: Some(db),
    });

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
