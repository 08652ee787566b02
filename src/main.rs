use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use rollout_watcher::config::{Config, StateType};
use rollout_watcher::controller::ControllerClient;
use rollout_watcher::engine::Metrics;
use rollout_watcher::store::memory::MemoryStore;
use rollout_watcher::store::postgres::PostgresStore;
use rollout_watcher::store::{AppState, TaskStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|cause| {
        eprintln!("invalid configuration: {cause}");
        std::process::exit(1);
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().json())
        .init();

    let controller = Arc::new(ControllerClient::new(
        config.argo_url.clone(),
        config.argo_user.clone(),
        config.argo_password.clone(),
        config.ssl_verify,
    ));

    if let Err(err) = controller.authenticate().await {
        tracing::error!(error = %err, "failed to authenticate with the deployment controller");
        std::process::exit(1);
    }

    let store: Arc<dyn TaskStore> = match config.state_type().map_err(anyhow::Error::msg)? {
        StateType::InMemory => Arc::new(MemoryStore::with_history_ttl(config.history_ttl)),
        StateType::Postgres => {
            let url = config
                .database_url()
                .expect("validated in Config::load: postgres requires DB_* settings");
            Arc::new(PostgresStore::connect(&url).await?)
        }
    };

    let state = AppState {
        store,
        controller,
        metrics: Arc::new(Metrics::new()),
        config: Arc::new(config.clone()),
    };

    let app = rollout_watcher::api::router()
        .fallback_service(ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!(%addr, "starting rollout-watcher");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("rollout-watcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
