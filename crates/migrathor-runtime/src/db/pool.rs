use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use migrathor_core::config::DatabaseConfig;
use migrathor_core::error::{MigrationError, Result};

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the given configuration and verify the server is reachable.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let options = connect_options(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| MigrationError::driver("failed to connect to database server", e))?;

        let db = Self { pool };
        db.health_check().await?;
        Ok(db)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| MigrationError::driver("failed to ping database server", e))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Builds connection options from either the URL or the individual settings.
///
/// A configured URL wins; the individual settings are ignored then.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    if let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) {
        return PgConnectOptions::from_str(url)
            .map_err(|e| MigrationError::Config(format!("invalid database url: {}", e)));
    }

    let ssl_mode = PgSslMode::from_str(&config.sslmode).map_err(|e| {
        MigrationError::Config(format!("invalid sslmode {:?}: {}", config.sslmode, e))
    })?;

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .ssl_mode(ssl_mode);

    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if let Some(cert) = non_empty(&config.sslcert) {
        options = options.ssl_client_cert(cert);
    }
    if let Some(key) = non_empty(&config.sslkey) {
        options = options.ssl_client_key(key);
    }
    if let Some(root) = non_empty(&config.sslrootcert) {
        options = options.ssl_root_cert(root);
    }

    Ok(options)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
