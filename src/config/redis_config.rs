use std::env;

/// Connection settings for the distributed lock backend.
#[derive(Debug, Clone)]
pub struct RedisEnvConfig {
    pub url: String,
}

impl RedisEnvConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        }
    }
}
