use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use university_portal::bootstrap::{initialize_principal, initialize_settings};
use university_portal::identity::firebase::FirebaseIdentityProvider;
use university_portal::static_service::{get_database_connection, set_identity_provider};
use university_portal::{app, config::APP_CONFIG, utils::tracing::init_standard_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    init_standard_tracing(env!("CARGO_CRATE_NAME"));

    tracing::info!("Starting application...");

    get_database_connection()
        .await
        .context("Failed to connect to the database")?;

    let identity_provider = FirebaseIdentityProvider::from_config(
        &APP_CONFIG.firebase_project_id,
        APP_CONFIG.firebase_service_account_path.as_deref(),
    )
    .context("Failed to initialize the identity provider")?;
    set_identity_provider(Arc::new(identity_provider));

    initialize_settings().await?;

    tracing::info!("Checking principal account...");
    if let Err(e) = initialize_principal().await {
        tracing::error!("Failed to initialize principal: {:#}", e);
        tracing::warn!("Continuing without principal initialization...");
    }

    let app = app::create_app().await?;

    let http_address = format!("0.0.0.0:{}", APP_CONFIG.port);
    tracing::info!("HTTP server listening on {}", &http_address);

    let listener = tokio::net::TcpListener::bind(&http_address)
        .await
        .with_context(|| format!("Failed to bind {}", http_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server error")?;

    Ok(())
}
