/// Interaction Service - HTTP Server
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use interaction_service::store::SeedData;
use interaction_service::{handlers, logging, AppState, Config, EntityStore};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    logging::init_tracing(config.logging.format);

    tracing::info!(env = %config.app.env, "Starting interaction service");

    let store = match &config.seed.path {
        Some(path) => {
            let seed = SeedData::from_file(path)?;
            EntityStore::from_seed(seed).context("Seed data is inconsistent")?
        }
        None => {
            tracing::warn!("SEED_PATH not set; starting with an empty store");
            EntityStore::new()
        }
    };

    let bind_addr = config.bind_addr();
    let state = AppState::new(config, Arc::new(store));

    tracing::info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server terminated with an error")?;

    tracing::info!("Interaction service stopped");
    Ok(())
}
