use crate::config::{AppConfig, JwtConfig};
use crate::db;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_url, config.database_max_connections).await?;
        db::migrate(&db).await?;
        Ok(Self { db, config })
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// Fresh migrated in-memory database with a fixed test configuration.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            database_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            allowed_origins: vec!["http://localhost:3000".into()],
            work_create_cost: 1,
            host: "127.0.0.1".into(),
            port: 0,
        });
        let db = db::connect(&config.database_url, config.database_max_connections).await?;
        db::migrate(&db).await?;
        Ok(Self::from_parts(db, config))
    }
}
