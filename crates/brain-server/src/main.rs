use std::net::SocketAddr;
use std::sync::Arc;

use brain_core::config::Config;
use brain_devices::registry::DeviceRegistry;
use brain_mediator::anthropic::AnthropicProvider;
use brain_mediator::openai_compat::OpenAiCompatProvider;
use brain_mediator::Mediator;
use brain_memory::{ConversationRepository, PlaceholderEmbeddingEngine};
use brain_pipeline::{NullTtsEngine, Pipeline, TtsEngine};
use brain_runtime::BrainCore;
use brain_scheduler::{SchedulerEngine, SqliteTaskStore};
use brain_summarizer::SummarizerTask;
use brain_tools::tools::{GetTimeTool, SendMessageTool};
use brain_tools::ToolRegistry;
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod app;
mod tts_client;
mod user_context;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "brain_server=info".into()),
        )
        .init();

    let config_path = std::env::var("BRAIN_CONFIG").ok();
    let config = Config::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        Config::default()
    });

    let devices = Arc::new(DeviceRegistry::new());

    let tts: Arc<dyn TtsEngine> = match &config.tts.endpoint_url {
        Some(url) => Arc::new(tts_client::HttpTtsEngine::new(url.clone())),
        None => Arc::new(NullTtsEngine),
    };
    let pipeline = Arc::new(Pipeline::new(devices.clone(), tts));

    let mut mediator = Mediator::new(config.brain.mediator_batch_size, config.brain.mediator_batch_tick_ms);
    if let Some(anthropic) = &config.providers.anthropic {
        mediator.register(Arc::new(AnthropicProvider::new(
            anthropic.api_key.clone(),
            Some(anthropic.base_url.clone()),
            anthropic.models.clone(),
        )));
    }
    for entry in &config.providers.openai_compat {
        mediator.register(Arc::new(OpenAiCompatProvider::new(
            entry.id.clone(),
            entry.api_key.clone(),
            entry.base_url.clone(),
            Some(entry.chat_path.clone()),
            entry.models.clone(),
        )));
    }
    let mediator = Arc::new(mediator);

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(GetTimeTool))?;
    tools.register(Box::new(SendMessageTool::new(devices.clone())))?;
    let tools = Arc::new(tools);

    let conversations_conn = Connection::open(&config.database.path)?;
    let repository = Arc::new(ConversationRepository::new(conversations_conn, config.brain.msg_ttl_minutes)?);

    let core = Arc::new(BrainCore::new(
        mediator.clone(),
        tools,
        pipeline,
        repository.clone(),
        config.brain.max_tool_calls,
        config.brain.default_model.clone(),
    ));

    let jobs_conn = Connection::open(&config.database.path)?;
    let task_store = Arc::new(SqliteTaskStore::new(jobs_conn)?);
    let user_resolver = Arc::new(user_context::StaticUserContextResolver);
    let scheduler_conn = Connection::open(&config.database.path)?;
    let scheduler = Arc::new(SchedulerEngine::new(
        scheduler_conn,
        core.clone(),
        task_store,
        user_resolver,
        config.scheduler.worker_count,
    )?);

    let embedder = Arc::new(PlaceholderEmbeddingEngine::new(config.embedder.dimension));
    let summarizer = SummarizerTask::new(
        mediator,
        repository,
        embedder,
        config.brain.default_model.clone(),
        config.brain.summarizer_interval_secs,
        config.brain.summary_confidence_threshold,
    );

    let shutdown_ctx = CancellationToken::new();
    let scheduler_handles = scheduler.clone().start(shutdown_ctx.clone());
    let summarizer_ctx = shutdown_ctx.clone();
    let summarizer_handle = tokio::spawn(async move { summarizer.run(summarizer_ctx).await });

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let shutdown_grace_secs = config.server.shutdown_grace_secs;
    let state = Arc::new(app::AppState { config, core, devices });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("brain server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    SchedulerEngine::stop(shutdown_ctx.clone(), scheduler_handles).await;
    shutdown_ctx.cancel();
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(shutdown_grace_secs),
        summarizer_handle,
    )
    .await;

    Ok(())
}
