//! Per-resource gate configuration and TOML loading.
//!
//! Durations are written in milliseconds under `*_ms` keys and thresholds
//! are percentages from 0 to 100. Missing keys fall back to
//! [`GateConfig::default`]; unknown keys are rejected.
//!
//! ```toml
//! [resources.payments]
//! window_size = 20
//! min_calls = 10
//! failure_rate_threshold = 50.0
//! open_wait_duration_ms = 30000
//! timeout_duration_ms = 2000
//! max_concurrent_calls = 16
//!
//! [resources.search]
//! max_retry_attempts = 5
//! retry_base_delay_ms = 100
//! retry_jitter = 0.2
//! ```

use crate::error::ConfigError;
use callgate_bulkhead::{Bulkhead, BulkheadConfig};
use callgate_circuitbreaker::{CircuitBreakerConfig, SlidingWindow};
use callgate_retry::RetryConfig;
use callgate_timelimiter::TimeLimiterConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Settings for one protected resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Number of outcomes kept in the sliding window.
    pub window_size: usize,
    /// Outcomes required before rates are evaluated.
    pub min_calls: usize,
    /// Failure rate, in percent, at or above which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Slow-call rate, in percent, at or above which the circuit opens.
    pub slow_call_rate_threshold: f64,
    /// A successful call taking at least this long counts as slow.
    #[serde(rename = "slow_call_duration_threshold_ms", with = "millis")]
    pub slow_call_duration_threshold: Duration,
    /// Time spent open before trial calls are let through.
    #[serde(rename = "open_wait_duration_ms", with = "millis")]
    pub open_wait_duration: Duration,
    /// Trial calls admitted while half-open.
    pub half_open_permitted_calls: usize,
    /// Attempts per invocation, including the first.
    pub max_retry_attempts: usize,
    /// Delay after the first failed attempt; doubles on each retry.
    #[serde(rename = "retry_base_delay_ms", with = "millis")]
    pub retry_base_delay: Duration,
    /// Randomization factor applied to backoff delays; 0 disables jitter.
    pub retry_jitter: f64,
    /// Deadline for each attempt.
    #[serde(rename = "timeout_duration_ms", with = "millis")]
    pub timeout_duration: Duration,
    /// Drop a timed-out attempt instead of letting it finish in the
    /// background.
    pub cancel_running_call: bool,
    /// Bulkhead capacity.
    pub max_concurrent_calls: usize,
    /// How long an invocation waits for a bulkhead permit; 0 fails fast.
    #[serde(rename = "max_wait_for_permit_ms", with = "millis")]
    pub max_wait_for_permit: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_calls: 5,
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold: Duration::from_secs(2),
            open_wait_duration: Duration::from_secs(10),
            half_open_permitted_calls: 3,
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_jitter: 0.0,
            timeout_duration: Duration::from_secs(3),
            cancel_running_call: false,
            max_concurrent_calls: 10,
            max_wait_for_permit: Duration::ZERO,
        }
    }
}

impl GateConfig {
    /// Checks every setting, returning the first broken rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be greater than zero".into());
        }
        if self.window_size > SlidingWindow::MAX_CAPACITY {
            return Err(format!(
                "window_size must not exceed {}, got {}",
                SlidingWindow::MAX_CAPACITY,
                self.window_size
            ));
        }
        if self.min_calls == 0 {
            return Err("min_calls must be greater than zero".into());
        }
        if self.min_calls > self.window_size {
            return Err(format!(
                "min_calls ({}) must not exceed window_size ({})",
                self.min_calls, self.window_size
            ));
        }
        check_percent("failure_rate_threshold", self.failure_rate_threshold)?;
        check_percent("slow_call_rate_threshold", self.slow_call_rate_threshold)?;
        if self.half_open_permitted_calls == 0 {
            return Err("half_open_permitted_calls must be greater than zero".into());
        }
        if self.max_retry_attempts == 0 {
            return Err("max_retry_attempts must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.retry_jitter) {
            return Err(format!(
                "retry_jitter must be in [0, 1), got {}",
                self.retry_jitter
            ));
        }
        if self.timeout_duration.is_zero() {
            return Err("timeout_duration_ms must be greater than zero".into());
        }
        if self.max_concurrent_calls == 0 {
            return Err("max_concurrent_calls must be greater than zero".into());
        }
        if self.max_concurrent_calls > Bulkhead::MAX_CONCURRENT_CALLS {
            return Err(format!(
                "max_concurrent_calls must not exceed {}, got {}",
                Bulkhead::MAX_CONCURRENT_CALLS,
                self.max_concurrent_calls
            ));
        }
        Ok(())
    }

    /// Circuit breaker settings for resource `name`.
    pub fn circuit_breaker_config(&self, name: &str) -> CircuitBreakerConfig {
        CircuitBreakerConfig::builder()
            .name(name)
            .sliding_window_size(self.window_size)
            .minimum_number_of_calls(self.min_calls)
            .failure_rate_threshold(self.failure_rate_threshold)
            .slow_call_rate_threshold(self.slow_call_rate_threshold)
            .slow_call_duration_threshold(self.slow_call_duration_threshold)
            .wait_duration_in_open(self.open_wait_duration)
            .permitted_calls_in_half_open(self.half_open_permitted_calls)
            .build()
    }

    /// Bulkhead settings for resource `name`.
    pub fn bulkhead_config(&self, name: &str) -> BulkheadConfig {
        BulkheadConfig::builder()
            .name(name)
            .max_concurrent_calls(self.max_concurrent_calls)
            .max_wait_duration(Some(self.max_wait_for_permit))
            .build()
    }

    /// Timeout guard settings for resource `name`.
    pub fn time_limiter_config(&self, name: &str) -> TimeLimiterConfig {
        TimeLimiterConfig::builder()
            .name(name)
            .timeout_duration(self.timeout_duration)
            .cancel_running_call(self.cancel_running_call)
            .build()
    }

    /// Retry settings for resource `name`.
    ///
    /// Jitter is only applied when `retry_jitter` is positive.
    pub fn retry_config(&self, name: &str) -> RetryConfig {
        let builder = RetryConfig::builder()
            .name(name)
            .max_attempts(self.max_retry_attempts);
        let builder = if self.retry_jitter > 0.0 {
            builder.exponential_random_backoff(self.retry_base_delay, self.retry_jitter)
        } else {
            builder.exponential_backoff(self.retry_base_delay)
        };
        builder.build()
    }
}

fn check_percent(key: &str, value: f64) -> Result<(), String> {
    if value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(format!("{key} must be in (0, 100], got {value}"))
    }
}

/// Gate settings for every resource, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Per-resource settings.
    #[serde(default)]
    pub resources: BTreeMap<String, GateConfig>,
}

impl RegistryConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Validates every resource.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (resource, config) in &self.resources {
            config.validate().map_err(|reason| ConfigError::Invalid {
                resource: resource.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
