use std::env;

/// Database connection settings, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseEnvConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseEnvConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/agentrade.db".to_string()),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}
