use std::time::Duration;

/// Fixed acquisition policy for one class of named lock.
#[derive(Debug, Clone, Copy)]
pub struct LockPolicy {
    pub ttl: Duration,
    pub blocking: bool,
    pub retries: u32,
    pub delay: Duration,
}

/// Per-lock-class policies. Not environment-overridable: these are load-bearing constants of
/// the concurrency model, not deployment knobs.
#[derive(Debug, Clone, Copy)]
pub struct LockPolicies {
    pub decision: LockPolicy,
    pub position_balance: LockPolicy,
    pub global: LockPolicy,
}

impl Default for LockPolicies {
    fn default() -> Self {
        Self {
            decision: LockPolicy {
                ttl: Duration::from_secs(300),
                blocking: false,
                retries: 1,
                delay: Duration::from_millis(0),
            },
            position_balance: LockPolicy {
                ttl: Duration::from_secs(30),
                blocking: false,
                retries: 5,
                delay: Duration::from_millis(200),
            },
            global: LockPolicy {
                ttl: Duration::from_secs(300),
                blocking: false,
                retries: 0,
                delay: Duration::from_millis(0),
            },
        }
    }
}

pub fn lock_key_for_decision(agent_id: &str) -> String {
    format!("lock:agent:decision:{agent_id}")
}

pub fn lock_key_for_balance(agent_id: &str) -> String {
    format!("lock:agent:balance:{agent_id}")
}

pub fn lock_key_for_global(name: &str) -> String {
    format!("lock:global:{name}")
}
