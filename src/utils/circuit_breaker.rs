use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards a flaky dependency (the message broker). After `failure_threshold`
// consecutive failures the circuit opens and calls fail fast for
// `open_for`; the next call after that runs as a probe (half-open), and
// `success_threshold` probe successes close the circuit again.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    Open,

    #[error(transparent)]
    Inner(E),
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                probe_successes: 0,
                opened_at: None,
            })),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Run `operation` unless the circuit is open. The lock is never held
    /// while the operation is awaited. If the returned future is dropped
    /// before the operation settles (an outer timeout), the call counts as a
    /// failure.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.admit()?;

        let in_flight = InFlight { breaker: self };
        let result = operation.await;
        std::mem::forget(in_flight);

        match result {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding this lock cannot leave the counters in an
        // unusable state, so a poisoned lock is still safe to use.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn admit<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let cooled_down = inner
            .opened_at
            .is_some_and(|at| at.elapsed() >= self.config.open_for);
        if !cooled_down {
            return Err(CircuitBreakerError::Open);
        }

        tracing::info!(breaker = self.name, "Circuit breaker half-open, probing");
        inner.state = CircuitState::HalfOpen;
        inner.probe_successes = 0;
        Ok(())
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.probe_successes += 1;
            if inner.probe_successes >= self.config.success_threshold {
                tracing::info!(breaker = self.name, "Circuit breaker closed");
                inner.state = CircuitState::Closed;
                inner.probe_successes = 0;
                inner.opened_at = None;
            }
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if trip {
            tracing::warn!(
                breaker = self.name,
                failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.probe_successes = 0;
        }
    }
}

/// Armed for the duration of an admitted call; dropping it means the call
/// was abandoned mid-flight.
struct InFlight<'a> {
    breaker: &'a CircuitBreaker,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        tracing::debug!(breaker = self.breaker.name, "Call abandoned before completion");
        self.breaker.on_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(open_for: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 3,
                open_for,
                success_threshold: 2,
            },
        )
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let cb = breaker(Duration::from_secs(60));

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>("broker down") }).await;
            assert!(matches!(result, Err(CircuitBreakerError::Inner("broker down"))));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let cb = breaker(Duration::from_secs(60));

        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }
        cb.call(async { Ok::<_, &str>(()) }).await.unwrap();
        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_probe_closes_or_reopens() {
        let cb = breaker(Duration::from_millis(50));
        for _ in 0..3 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        cb.call(async { Ok::<_, &str>(()) }).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.call(async { Ok::<_, &str>(()) }).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);

        for _ in 0..3 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _ = cb.call(async { Err::<(), _>("still down") }).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_calls_dropped_by_outer_timeout_open_the_circuit() {
        let cb = breaker(Duration::from_secs(60));

        for _ in 0..3 {
            let hanging = cb.call(std::future::pending::<Result<(), &str>>());
            let outcome = tokio::time::timeout(Duration::from_millis(10), hanging).await;
            assert!(outcome.is_err());
        }

        assert_eq!(cb.state(), CircuitState::Open);
        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn test_dropped_half_open_probe_reopens() {
        let cb = breaker(Duration::from_millis(50));
        for _ in 0..3 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        let probe = cb.call(std::future::pending::<Result<(), &str>>());
        let _ = tokio::time::timeout(Duration::from_millis(10), probe).await;

        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_completed_call_is_not_counted_twice() {
        let cb = breaker(Duration::from_secs(60));
        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }
        cb.call(async { Ok::<_, &str>(()) }).await.unwrap();
        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), _>("x") }).await;
        }

        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
