use anyhow::{Context, Result};
use perspective_engine::{
    chat::ChatClient,
    config::Config,
    pipeline::Aggregator,
    server::{build_app, AppState},
    source::build_source,
    translation::build_translator,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("perspective_engine=info".parse()?),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    let client = config.http_client()?;

    let aggregator = Aggregator::new(
        Arc::clone(&config),
        build_source(&config, client.clone()),
        build_translator(&config, client.clone()),
    );
    let state = AppState {
        aggregator,
        chat: ChatClient::new(&config, client),
        config: Arc::clone(&config),
    };

    if config.force_local_comments {
        info!("FORCE_LOCAL_COMMENTS set, serving fixtures from {}", config.mock_data_path);
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, starting graceful shutdown");
}
