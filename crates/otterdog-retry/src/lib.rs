//! Retry/backoff strategy for provider calls. One named preset covers the
//! default transient-error behavior; per-`ErrorClass` overrides let a
//! transport treat an ambiguous response more conservatively than a
//! confirmed-transient one, without inventing a second strategy type.

use std::time::Duration;

use otterdog_types::ErrorClass;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategyType {
    Immediate,
    Exponential,
    Linear,
    Constant,
}

impl Default for RetryStrategyType {
    fn default() -> Self {
        RetryStrategyType::Exponential
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryStrategyConfig {
    pub strategy: RetryStrategyType,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction in `[0, 1]` applied as jitter around the computed delay. `0`
    /// disables jitter.
    pub jitter: f64,
}

impl Default for RetryStrategyConfig {
    /// The provider's default policy: exponential backoff, base 1s, cap 60s,
    /// jitter, up to 5 attempts.
    fn default() -> Self {
        Self {
            strategy: RetryStrategyType::Exponential,
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.3,
        }
    }
}

impl RetryStrategyConfig {
    /// Applied to a response whose retryability is unclear (malformed or
    /// partial body on an otherwise-successful status): fewer attempts, a
    /// larger base delay, linear growth instead of exponential.
    pub fn ambiguous() -> Self {
        Self {
            strategy: RetryStrategyType::Linear,
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            jitter: 0.1,
        }
    }

    /// No retry: used for classes the caller already knows are permanent
    /// (`BadCredentials`).
    pub fn none() -> Self {
        Self {
            strategy: RetryStrategyType::Immediate,
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }
}

/// Per-error-class overrides layered on top of a default config. A `None`
/// entry falls back to the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerErrorConfig {
    pub retryable: Option<RetryStrategyConfig>,
    pub ambiguous: Option<RetryStrategyConfig>,
    pub permanent: Option<RetryStrategyConfig>,
}

pub fn config_for_error(
    default_config: &RetryStrategyConfig,
    per_error: &PerErrorConfig,
    class: ErrorClass,
) -> RetryStrategyConfig {
    match class {
        ErrorClass::Retryable => per_error.retryable.unwrap_or(*default_config),
        ErrorClass::Ambiguous => per_error.ambiguous.unwrap_or_else(RetryStrategyConfig::ambiguous),
        ErrorClass::Permanent => per_error.permanent.unwrap_or_else(RetryStrategyConfig::none),
    }
}

/// Delay before attempt number `attempt` (1-indexed), capped at `max_delay`
/// and jittered per the config.
pub fn calculate_delay(config: &RetryStrategyConfig, attempt: u32) -> Duration {
    let raw = match config.strategy {
        RetryStrategyType::Immediate => Duration::ZERO,
        RetryStrategyType::Constant => config.base_delay,
        RetryStrategyType::Linear => config.base_delay.saturating_mul(attempt.max(1)),
        RetryStrategyType::Exponential => {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            config.base_delay.saturating_mul(factor)
        }
    };
    let capped = raw.min(config.max_delay);
    if config.jitter > 0.0 {
        apply_jitter(capped, config.jitter)
    } else {
        capped
    }
}

fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    let jitter = jitter.clamp(0.0, 1.0);
    let mut rng = rand::thread_rng();
    let factor = 1.0 - jitter + rng.gen::<f64>() * 2.0 * jitter;
    Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
}

/// Runs `f` until it returns `Ok`, a permanent error, or `max_attempts` is
/// exhausted, sleeping `calculate_delay` between attempts. `classify` maps
/// the error to an `ErrorClass`, selecting which config layer applies.
pub fn retry_blocking<T, E>(
    default_config: &RetryStrategyConfig,
    per_error: &PerErrorConfig,
    mut classify: impl FnMut(&E) -> ErrorClass,
    mut f: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 1;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(err) => {
                let class = classify(&err);
                let config = config_for_error(default_config, per_error, class);
                if class == ErrorClass::Permanent || attempt >= config.max_attempts {
                    return Err(err);
                }
                std::thread::sleep(calculate_delay(&config, attempt));
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_grows_and_caps() {
        let config = RetryStrategyConfig {
            jitter: 0.0,
            ..RetryStrategyConfig::default()
        };
        assert_eq!(calculate_delay(&config, 1), Duration::from_secs(1));
        assert_eq!(calculate_delay(&config, 2), Duration::from_secs(2));
        assert_eq!(calculate_delay(&config, 3), Duration::from_secs(4));
        assert_eq!(calculate_delay(&config, 10), Duration::from_secs(60));
    }

    #[test]
    fn linear_grows_by_fixed_step() {
        let config = RetryStrategyConfig {
            strategy: RetryStrategyType::Linear,
            base_delay: Duration::from_secs(5),
            jitter: 0.0,
            ..RetryStrategyConfig::default()
        };
        assert_eq!(calculate_delay(&config, 1), Duration::from_secs(5));
        assert_eq!(calculate_delay(&config, 3), Duration::from_secs(15));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = RetryStrategyConfig {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
            jitter: 0.5,
            strategy: RetryStrategyType::Constant,
            ..RetryStrategyConfig::default()
        };
        for _ in 0..50 {
            let d = calculate_delay(&config, 1);
            assert!(d.as_secs_f64() >= 5.0 && d.as_secs_f64() <= 15.0);
        }
    }

    #[test]
    fn permanent_errors_are_never_retried() {
        let default_config = RetryStrategyConfig::default();
        let per_error = PerErrorConfig::default();
        let mut calls = 0;
        let result: Result<(), &str> = retry_blocking(
            &default_config,
            &per_error,
            |_| ErrorClass::Permanent,
            |_attempt| {
                calls += 1;
                Err("bad credentials")
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retryable_errors_retry_up_to_max_attempts() {
        let default_config = RetryStrategyConfig {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
            ..RetryStrategyConfig::default()
        };
        let per_error = PerErrorConfig::default();
        let mut calls = 0;
        let result: Result<(), &str> = retry_blocking(
            &default_config,
            &per_error,
            |_| ErrorClass::Retryable,
            |_attempt| {
                calls += 1;
                Err("503")
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn succeeds_after_a_transient_failure() {
        let default_config = RetryStrategyConfig {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
            ..RetryStrategyConfig::default()
        };
        let per_error = PerErrorConfig::default();
        let mut calls = 0;
        let result: Result<&str, &str> = retry_blocking(
            &default_config,
            &per_error,
            |_| ErrorClass::Retryable,
            |_attempt| {
                calls += 1;
                if calls < 2 { Err("503") } else { Ok("ok") }
            },
        );
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls, 2);
    }
}
