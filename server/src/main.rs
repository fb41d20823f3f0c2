use std::sync::Arc;

use chess_analysis_server::auth::HeaderAuthProvider;
use chess_analysis_server::coach;
use chess_analysis_server::config::Config;
use chess_analysis_server::db::{Database, Repos};
use chess_analysis_server::events::{EventBus, NullEventBus, RedisEventBus};
use chess_analysis_server::http::{self, AppState, EngineSettings};
use chess_analysis_server::queue::{DbTaskQueue, TaskRegistry, DEFAULT_QUEUE, IMPORTS_QUEUE};
use chess_analysis_server::tasks::import_games::ProviderRegistry;
use chess_analysis_server::tasks::{AnalyzeGameTask, BatchAnalyzeTask, ImportGamesTask};
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!("Starting chess analysis server");

    let config = Config::load()?;
    let coach_strategy: Option<Arc<dyn coach::CoachStrategy>> =
        coach::build_strategy(&config).map(Arc::from);
    tracing::info!(
        coach_enabled = coach_strategy.is_some(),
        "coach commentary configuration loaded"
    );

    let database = Database::open(&config.database_url).await?;
    let repos = Repos::new(database.pool().clone());
    let queue = DbTaskQueue::new(database.pool().clone());

    let recovered = queue.recover_stuck_tasks().await?;
    if recovered > 0 {
        tracing::warn!(recovered, "recovered tasks stuck in 'claimed' from a previous run");
    }

    let events: Arc<dyn EventBus> = match RedisEventBus::new(&config.broker_url) {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            tracing::warn!(error = %e, "broker unavailable, falling back to a null event bus");
            Arc::new(NullEventBus::default())
        }
    };

    let engine = EngineSettings {
        depth: config.engine_depth,
        time_ms: config.engine_time_limit_ms,
    };

    let providers = ProviderRegistry::new();

    let mut registry = TaskRegistry::new();
    registry.register(Arc::new(ImportGamesTask {
        repos: repos.clone(),
        providers: providers.clone(),
    }));
    registry.register(Arc::new(AnalyzeGameTask {
        repos: repos.clone(),
        events: events.clone(),
        engine: chess_analysis_server::tasks::analyze_game::EngineSettings {
            depth: engine.depth,
            time_ms: engine.time_ms,
        },
        coach: coach_strategy.clone(),
    }));
    registry.register(Arc::new(BatchAnalyzeTask {
        repos: repos.clone(),
        queue: queue.clone(),
    }));

    let mut worker_handles = queue.spawn_workers(IMPORTS_QUEUE, config.imports_queue_concurrency, registry.clone());
    worker_handles.extend(queue.spawn_workers(
        DEFAULT_QUEUE,
        config.analysis_queue_concurrency,
        registry,
    ));

    let state = AppState {
        repos,
        events,
        queue,
        providers,
        auth: Arc::new(HeaderAuthProvider),
        engine,
    };

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server error");
            }
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            tracing::info!("received SIGINT, shutting down gracefully");
        }
    }

    for handle in worker_handles {
        handle.abort();
    }

    Ok(())
}
