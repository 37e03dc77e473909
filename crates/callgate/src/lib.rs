//! Resilient call gate for outbound async calls.
//!
//! A [`ResourceGate`] wraps calls to one protected resource in a fixed
//! pipeline:
//!
//! 1. **Bulkhead**: caps concurrent calls, failing fast or after a bounded
//!    wait.
//! 2. **Circuit breaker**: refuses calls while the resource is failing,
//!    judged over a sliding window of recent outcomes.
//! 3. **Timeout guard**: bounds each attempt.
//! 4. **Retry**: repeats failed attempts with exponential backoff, each one
//!    re-admitted by the breaker.
//!
//! Gates are grouped by name in a [`GateRegistry`], usually built from a
//! TOML [`RegistryConfig`]. Each component is also usable on its own
//! through the re-exported crates and their tower layers.
//!
//! # Example
//!
//! ```
//! use callgate::{GateError, GateRegistry, RegistryConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RegistryConfig::from_toml_str(
//!     r#"
//!     [resources.payments]
//!     window_size = 20
//!     min_calls = 10
//!     timeout_duration_ms = 2000
//!     max_concurrent_calls = 16
//!     "#,
//! )?;
//! let registry = GateRegistry::from_config(&config)?;
//!
//! let receipt = registry
//!     .invoke("payments", || async { Ok::<_, std::io::Error>("receipt-1") })
//!     .await?;
//! assert_eq!(receipt, "receipt-1");
//!
//! let missing = registry
//!     .invoke("ledger", || async { Ok::<_, std::io::Error>(()) })
//!     .await;
//! assert!(matches!(missing, Err(GateError::UnknownResource { .. })));
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Every invocation runs in a `gate.invoke` [`tracing`] span. Attempts are
//! logged at `debug`; rejections and exhausted retries at `warn`.
//!
//! # Metrics
//!
//! With the `metrics` feature each component records through the
//! [`metrics`](https://docs.rs/metrics) facade under the `circuitbreaker_*`,
//! `bulkhead_*`, `retry_*` and `timelimiter_*` prefixes. Installing a
//! recorder is left to the host.

mod config;
mod error;
mod gate;
mod layer;
mod registry;
mod state;

pub use config::{GateConfig, RegistryConfig};
pub use error::ConfigError;
pub use gate::ResourceGate;
pub use layer::{GateLayer, GateService};
pub use registry::{GateRegistry, GateRegistryBuilder};
pub use state::GateState;

pub use callgate_core::{
    AttemptFailure, CallOutcome, Clock, GateError, ManualClock, SharedClock, TokioClock,
};

pub use callgate_bulkhead as bulkhead;
pub use callgate_circuitbreaker as circuitbreaker;
pub use callgate_core as core;
pub use callgate_retry as retry;
pub use callgate_timelimiter as timelimiter;

pub use callgate_circuitbreaker::{CircuitState, WindowSnapshot};
