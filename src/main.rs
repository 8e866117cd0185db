use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use perfume_recommender::api::{create_router, AppState};
use perfume_recommender::config::Config;
use perfume_recommender::services::providers::{CorpusProvider, JsonCorpusFile, SeedCorpus};
use perfume_recommender::services::{LoadOutcome, RecommendationEngine, RetrainScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perfume_recommender=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let corpus: Arc<dyn CorpusProvider> = match &config.corpus_path {
        Some(path) => Arc::new(JsonCorpusFile::new(path)),
        None => Arc::new(SeedCorpus::new(config.random_seed)),
    };
    let engine = Arc::new(RecommendationEngine::new(config.engine_config()));
    let state = AppState::new(engine.clone(), corpus.clone());

    match engine
        .load_or_train(corpus.as_ref(), state.feedback().as_ref())
        .await
        .context("Failed to initialise the recommendation model")?
    {
        LoadOutcome::Loaded { trained_at } => {
            tracing::info!(%trained_at, "Model ready from artifact")
        }
        LoadOutcome::Trained(report) => tracing::info!(
            micro_f1 = report.evaluation.micro_f1,
            corpus_rows = report.corpus_rows,
            "Model ready from fresh training"
        ),
    }

    let scheduler = RetrainScheduler::new(engine, corpus, state.feedback())
        .spawn(config.scheduler_interval());

    let app = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
