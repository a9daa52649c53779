use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::ports::LockService;

struct Entry {
    expires_at: Instant,
    owner: String,
}

/// In-process stand-in for `RedisLockService`, used by tests that exercise lock contention
/// without a Redis instance, and as the production fallback when Redis is unreachable. Not
/// TTL-precise beyond `Instant` granularity. Mirrors `RedisLockService`'s compare-and-delete:
/// `owner_tokens` records the token handed out by the most recent successful `acquire` for a
/// key; `release`/`extend` only act while that token still matches and the entry hasn't already
/// passed its TTL, so a lock that expired mid-cycle can't be revived or have its expiry reset.
#[derive(Default)]
pub struct InMemoryLockService {
    entries: Mutex<HashMap<String, Entry>>,
    owner_tokens: Mutex<HashMap<String, String>>,
}

impl InMemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        blocking: bool,
        retries: u32,
        delay: Duration,
    ) -> Result<bool> {
        let mut attempt = 0u32;
        loop {
            {
                let mut entries = self.entries.lock().await;
                let held = entries
                    .get(key)
                    .map(|entry| entry.expires_at > Instant::now())
                    .unwrap_or(false);

                if !held {
                    let token = Uuid::new_v4().to_string();
                    entries.insert(
                        key.to_string(),
                        Entry {
                            expires_at: Instant::now() + ttl,
                            owner: token.clone(),
                        },
                    );
                    self.owner_tokens.lock().await.insert(key.to_string(), token);
                    return Ok(true);
                }
            }

            if !blocking && attempt >= retries {
                return Ok(false);
            }
            attempt += 1;
            tokio::time::sleep(delay).await;
        }
    }

    async fn release(&self, key: &str) -> Result<bool> {
        let Some(token) = self.owner_tokens.lock().await.remove(key) else {
            return Ok(false);
        };

        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.owner == token && entry.expires_at > Instant::now() => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn extend(&self, key: &str, additional: Duration) -> Result<bool> {
        let Some(token) = self.owner_tokens.lock().await.get(key).cloned() else {
            return Ok(false);
        };

        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if entry.owner == token && entry.expires_at > Instant::now() => {
                entry.expires_at += additional;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn is_locked(&self, key: &str) -> Result<bool> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .map(|entry| entry.expires_at > Instant::now())
            .unwrap_or(false))
    }
}
