use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub allowed_origins: Vec<String>,
    /// Credits charged for every newly created work.
    pub work_create_cost: i64,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://picblocks.db".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "picblocks".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "picblocks-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60 * 24 * 30)?,
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 60)?,
        };
        let allowed_origins = parse_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default());

        Ok(Self {
            database_url,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt,
            allowed_origins,
            work_create_cost: env_parse("WORK_CREATE_COST", 1)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080)?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma separated origin list, falling back to the local dev frontend.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();
    if origins.is_empty() {
        vec!["http://localhost:3000".to_string()]
    } else {
        origins
    }
}
