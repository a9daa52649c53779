use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Circuit breaker state for one LLM provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,   // provider is healthy, chat requests pass through
    Open,     // failure threshold breached, reject all chat requests
    HalfOpen, // reset timeout elapsed, let one request through to probe recovery
}

/// Per-provider failure isolation for `HttpLlmClient`. A provider that fails
/// `failure_threshold` consecutive chat requests is cut off for `timeout` before a single probe
/// request is allowed through; that probe must succeed `success_threshold` times in a row to
/// close the circuit again, and any probe failure reopens it immediately.
pub struct ProviderCircuitBreaker {
    state: Arc<RwLock<BreakerState>>,
    failure_threshold: usize,
    success_threshold: usize,
    timeout: Duration,
    provider_id: String,
}

struct BreakerState {
    state: CircuitState,
    failure_count: usize,
    success_count: usize,
    last_failure_time: Option<Instant>,
}

impl ProviderCircuitBreaker {
    /// `success_threshold` is fixed at 2: one probe success alone could be a fluke, so a
    /// HalfOpen provider needs two consecutive successes before it's trusted again.
    const HALF_OPEN_SUCCESS_THRESHOLD: usize = 2;

    pub fn new(provider_id: impl Into<String>, failure_threshold: usize, timeout: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            })),
            failure_threshold,
            success_threshold: Self::HALF_OPEN_SUCCESS_THRESHOLD,
            timeout,
            provider_id: provider_id.into(),
        }
    }

    /// Runs one chat call through the breaker, short-circuiting with `CircuitBreakerError::Open`
    /// while the provider is cut off.
    pub async fn call<F, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut state = self.state.write().await;

            if state.state == CircuitState::Open {
                if let Some(last_failure) = state.last_failure_time {
                    if last_failure.elapsed() > self.timeout {
                        info!(provider_id = %self.provider_id, "llm provider circuit Open -> HalfOpen, probing");
                        state.state = CircuitState::HalfOpen;
                        state.success_count = 0;
                    } else {
                        return Err(CircuitBreakerError::Open(format!(
                            "llm provider {} circuit is open, retry in {:?}",
                            self.provider_id,
                            self.timeout - last_failure.elapsed()
                        )));
                    }
                }
            }
        }

        match f.await {
            Ok(result) => {
                self.on_success().await;
                Ok(result)
            }
            Err(e) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;

        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.success_threshold {
                    info!(
                        provider_id = %self.provider_id,
                        successes = state.success_count,
                        "llm provider circuit HalfOpen -> Closed"
                    );
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                }
            }
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::Open => {
                warn!(provider_id = %self.provider_id, "llm chat succeeded while circuit marked Open");
            }
        }
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;

        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());

        match state.state {
            CircuitState::Closed => {
                if state.failure_count >= self.failure_threshold {
                    error!(
                        provider_id = %self.provider_id,
                        failures = state.failure_count,
                        "llm provider circuit Closed -> Open"
                    );
                    state.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                warn!(provider_id = %self.provider_id, "llm provider probe failed, circuit HalfOpen -> Open");
                state.state = CircuitState::Open;
                state.success_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open: {0}")]
    Open(String),

    #[error(transparent)]
    Inner(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn circuit_opens_after_consecutive_failures() {
        let breaker = ProviderCircuitBreaker::new("prov-1", 3, Duration::from_secs(1));

        for _ in 0..3 {
            let result = breaker.call(async { Err::<(), &str>("error") }).await;
            assert!(result.is_err());
        }

        assert_eq!(breaker.state().await, CircuitState::Open);

        let result = breaker.call(async { Ok::<(), &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
    }

    #[tokio::test]
    async fn circuit_recovers_after_two_successful_probes() {
        let breaker = ProviderCircuitBreaker::new("prov-1", 2, Duration::from_millis(100));

        for _ in 0..2 {
            let _ = breaker.call(async { Err::<(), &str>("error") }).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(breaker.call(async { Ok::<(), &str>(()) }).await.is_ok());
        assert!(breaker.call(async { Ok::<(), &str>(()) }).await.is_ok());
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn a_failed_probe_reopens_the_circuit() {
        let breaker = ProviderCircuitBreaker::new("prov-1", 2, Duration::from_millis(100));

        for _ in 0..2 {
            let _ = breaker.call(async { Err::<(), &str>("error") }).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        let _ = breaker.call(async { Err::<(), &str>("error") }).await;

        assert_eq!(breaker.state().await, CircuitState::Open);
    }
}
