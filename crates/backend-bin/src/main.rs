use backend_lib::{config::Settings, router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration is read exactly once; a missing mandatory secret
    // aborts startup here rather than failing per-request later.
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_level))
        .init();

    let bind_addr = settings.bind_addr;
    let state = Arc::new(AppState::new(settings)?);
    tracing::info!(mode = ?state.gateway.mode(), "auth mode configured");

    let app = router::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
