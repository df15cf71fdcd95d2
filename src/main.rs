use dotenvy::dotenv;
use frostkeeper::{
    bot::{self, Services},
    config::{self, database, secrets},
    core::admin,
    errors::Result,
    health,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {e}"))?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database connected successfully."))
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database tables ready."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed admins from the environment
    let seeded = admin::seed_initial_admins(&db, &secrets::initial_admin_ids()).await?;
    if seeded > 0 {
        info!("Seeded {seeded} initial admin(s).");
    }

    // 6. Health endpoint
    if app_config.health.enabled {
        health::spawn(secrets::health_port());
    }

    // 7. Clients for the game API, OCR, language model and search
    let llm_keys = secrets::llm_api_keys();
    if llm_keys.is_empty() {
        warn!("No OPENROUTER_API_KEY_n set, /ask will answer with a placeholder.");
    }
    let services = Services::from_config(&app_config, llm_keys);

    // 8. Run the bot
    let token = secrets::discord_token()
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))?;

    bot::run_bot(token, Arc::new(app_config), db, services).await
}
