use failsafe::{backoff, failure_policy, Config};
use std::time::Duration;

/// Consecutive failed explanation calls before the circuit opens.
pub const FAILURE_THRESHOLD: u32 = 5;
pub const INITIAL_OPEN_DELAY: Duration = Duration::from_secs(10);
pub const MAX_OPEN_DELAY: Duration = Duration::from_secs(60);

/// Circuit breaker guarding the text-generation service.
pub type LlmCircuitBreaker =
    failsafe::StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates the breaker shared by every clone of an `LlmClient`.
///
/// # States
///
/// - **CLOSED**: Calls go out to the provider.
/// - **OPEN**: After `FAILURE_THRESHOLD` failures in a row, calls fail fast
///   and the report shows fallback text. The open period grows from
///   `INITIAL_OPEN_DELAY` to `MAX_OPEN_DELAY`.
/// - **HALF_OPEN**: One trial call decides whether to close again.
pub fn create_llm_circuit_breaker() -> LlmCircuitBreaker {
    circuit_breaker_with(FAILURE_THRESHOLD, INITIAL_OPEN_DELAY, MAX_OPEN_DELAY)
}

pub fn circuit_breaker_with(failures: u32, initial: Duration, max: Duration) -> LlmCircuitBreaker {
    let policy = failure_policy::consecutive_failures(failures, backoff::exponential(initial, max));
    Config::new().failure_policy(policy).build()
}
