//! Process entry point: loads configuration, wires the OAuth server,
//! event store, API client, and tool registry behind one `axum`
//! listener, and runs until Ctrl-C or SIGTERM.

use std::sync::Arc;

use gateway_core::{Config, EventStore};
use gateway_oauth::OAuthServer;
use gateway_transport::{build_router, EventBus, GatewayState, SessionTable, Transport};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::from_env()?);
    init_logging(config.debug);

    tracing::info!(port = config.port, upstream = %config.upstream_api_url, "starting mcp gateway");

    let oauth = Arc::new(OAuthServer::new(
        config.oauth.clone(),
        config.public_url.clone(),
        vec![
            "http://localhost:3000/callback".to_string(),
            "http://localhost:3001/callback".to_string(),
        ],
    ));

    let event_store = Arc::new(EventStore::new(
        config.event_store.max_events,
        config.event_store.ttl.as_millis() as u64,
    ));
    let events = Arc::new(EventBus::new(event_store));
    let sessions = Arc::new(SessionTable::new());
    let transport = Arc::new(Transport::new(sessions, Arc::clone(&events)));

    let api = Arc::new(gateway_api::ApiClient::new(&config)?);
    let dispatcher = Arc::new(gateway_tools::default_registry(api));

    let state = GatewayState {
        config: Arc::clone(&config),
        oauth: Arc::clone(&oauth),
        transport,
        events,
        dispatcher,
    };

    spawn_oauth_sweeper(Arc::clone(&oauth));

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("gateway shut down");
    Ok(())
}

/// Spawns the periodic sweeper that evicts expired OAuth sessions and
/// authorization codes, per `config.oauth.cleanup_interval`. Runs for
/// the lifetime of the process; there is no handle to stop it early
/// because the process itself is the sweeper's scope.
fn spawn_oauth_sweeper(oauth: Arc<OAuthServer>) {
    let interval = oauth.cleanup_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            oauth.sweep_expired();
        }
    });
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
