use anyhow::Context;
use quiz_server::{router, settings::Settings, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quiz_api=debug,quiz_server=debug")),
        )
        .init();

    let settings = Settings::new().context("failed to load settings")?;
    let state = AppState::new(&settings).await?;

    let addr = settings.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
