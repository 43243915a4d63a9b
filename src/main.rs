use roomwire::{auth, config::AppConfig, db, AppState};
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_inactivity_minutes)));

    let db_pool = db::connect(&config).await?;
    let clients = auth::Clients::from_config(&config).map_err(|err| err.0)?;
    let app = roomwire::router(AppState::new(db_pool, clients))
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
