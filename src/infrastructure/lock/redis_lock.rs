use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ports::LockService;

/// Compare-and-delete: only removes the key if it still holds our token. Prevents a caller from
/// releasing a lock it no longer owns after its TTL expired and someone else acquired it.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Compare-and-extend: only re-expires the key if it still holds our token.
const EXTEND_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

/// Redis-backed distributed lock. The owner token is a random UUID generated per `acquire` call
/// and is not exposed through the `LockService` contract — `release`/`extend` only ever act on
/// the most recently acquired token for a given key within this process.
pub struct RedisLockService {
    manager: ConnectionManager,
    owner_tokens: RwLock<HashMap<String, String>>,
}

impl RedisLockService {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("failed to parse redis url")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;

        Ok(Self {
            manager,
            owner_tokens: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl LockService for RedisLockService {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        blocking: bool,
        retries: u32,
        delay: Duration,
    ) -> Result<bool> {
        let token = Uuid::new_v4().to_string();
        let mut conn = self.manager.clone();
        let ttl_ms = ttl.as_millis() as u64;

        let mut attempt = 0u32;
        loop {
            let acquired: bool = redis::cmd("SET")
                .arg(key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<Option<String>>(&mut conn)
                .await
                .context("redis SET NX failed")?
                .is_some();

            if acquired {
                self.owner_tokens.write().await.insert(key.to_string(), token);
                return Ok(true);
            }

            if !blocking && attempt >= retries {
                debug!(key, attempt, "lock contended, giving up");
                return Ok(false);
            }

            attempt += 1;
            tokio::time::sleep(delay).await;

            if blocking && attempt.is_multiple_of(50) {
                warn!(key, attempt, "still waiting on blocking lock");
            }
        }
    }

    async fn release(&self, key: &str) -> Result<bool> {
        let Some(token) = self.owner_tokens.write().await.remove(key) else {
            return Ok(false);
        };

        let mut conn = self.manager.clone();
        let released: i64 = Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(&token)
            .invoke_async(&mut conn)
            .await
            .context("redis release script failed")?;

        Ok(released == 1)
    }

    async fn extend(&self, key: &str, additional: Duration) -> Result<bool> {
        let Some(token) = self.owner_tokens.read().await.get(key).cloned() else {
            return Ok(false);
        };

        let mut conn = self.manager.clone();
        let extended: i64 = Script::new(EXTEND_SCRIPT)
            .key(key)
            .arg(&token)
            .arg(additional.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .context("redis extend script failed")?;

        Ok(extended == 1)
    }

    async fn is_locked(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .context("redis EXISTS failed")?;
        Ok(exists)
    }
}
