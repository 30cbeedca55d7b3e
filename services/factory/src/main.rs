use factory::config::FactoryConfig;
use factory::keys::KeyMaterial;
use factory::notify::LogNotifier;
use factory::router::create_router;
use factory::state::AppState;
use factory::store::Store;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = FactoryConfig::from_env()?;
    tracing::info!("Starting JWT pizza factory");

    // Key material must be usable before the first request; a parse failure
    // here aborts startup rather than serving with a null key.
    let keys = KeyMaterial::load(&config.private_key_path, &config.public_key_path)?;

    let store = Store::connect(&config.database_url).await?;

    let addr = config.addr;
    let state = AppState::new(store, keys, config, Arc::new(LogNotifier));
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
