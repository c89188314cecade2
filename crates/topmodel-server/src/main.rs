use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use topmodel_server::{create_router, upstream::GeminiModel, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topmodel_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }

    let model = GeminiModel::new(&config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_router(AppState {
        model: Arc::new(model),
        config,
    });

    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
