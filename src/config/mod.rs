pub mod database_config;
pub mod fee_config;
pub mod llm_config;
pub mod lock_config;
pub mod redis_config;
pub mod scheduler_config;

use anyhow::Result;

use crate::domain::fees::FeeSchedule;
use database_config::DatabaseEnvConfig;
use llm_config::LlmEnvConfig;
use lock_config::LockPolicies;
use redis_config::RedisEnvConfig;
use scheduler_config::SchedulerEnvConfig;

/// Composed application configuration, assembled from sub-configs the way each concern's own
/// module knows how to load itself from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseEnvConfig,
    pub redis: RedisEnvConfig,
    pub fees: FeeSchedule,
    pub lock_policies: LockPolicies,
    pub scheduler: SchedulerEnvConfig,
    pub llm: LlmEnvConfig,
    pub observability_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseEnvConfig::from_env(),
            redis: RedisEnvConfig::from_env(),
            fees: fee_config::fee_schedule_from_env(),
            lock_policies: LockPolicies::default(),
            scheduler: SchedulerEnvConfig::from_env(),
            llm: LlmEnvConfig::from_env(),
            observability_enabled: std::env::var("OBSERVABILITY_ENABLED")
                .ok()
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}
