use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::APP_CONFIG;
use crate::identity::IdentityProvider;

pub static DATABASE_CONNECTION: OnceCell<DatabaseConnection> = OnceCell::new();
pub static IDENTITY_PROVIDER: OnceCell<Arc<dyn IdentityProvider>> = OnceCell::new();

pub async fn get_database_connection() -> anyhow::Result<&'static DatabaseConnection> {
    if let Some(db) = DATABASE_CONNECTION.get() {
        return Ok(db);
    }

    let mut options = ConnectOptions::new(APP_CONFIG.database_url.clone());
    options
        .max_connections(20)
        .min_connections(2)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;

    if APP_CONFIG.run_migrations {
        tracing::info!("Running database migrations...");
        Migrator::up(&db, None).await?;
    }

    Ok(DATABASE_CONNECTION.get_or_init(|| db))
}

pub fn set_identity_provider(provider: Arc<dyn IdentityProvider>) {
    if IDENTITY_PROVIDER.set(provider).is_err() {
        tracing::warn!("Identity provider already initialized, keeping the existing one");
    }
}

pub fn identity_provider() -> anyhow::Result<Arc<dyn IdentityProvider>> {
    IDENTITY_PROVIDER
        .get()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("IDENTITY_PROVIDER not set"))
}

pub fn database() -> anyhow::Result<&'static DatabaseConnection> {
    DATABASE_CONNECTION
        .get()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_CONNECTION not set"))
}
