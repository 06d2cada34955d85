use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use photo_run::{
    api,
    config::Config,
    services::Services,
    workflow::SessionStore,
    GeminiClient,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    Config::dotenv_load();
    let config = Config::new();
    config.log_summary();

    let gemini = match GeminiClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    let services = Services::new(gemini.clone(), gemini, &config.payment_amount);
    let sessions = SessionStore::new(services, config.session_max_idle());
    let state = Arc::new(api::routes::AppState::new(sessions, &config));
    let app = api::routes::router(state);

    let socket_address = config.socket_address();
    tracing::info!("listening on {}", socket_address);
    if let Err(e) = axum::Server::bind(&socket_address).serve(app.into_make_service()).await {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
