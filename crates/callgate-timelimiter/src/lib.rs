//! Per-attempt timeout guard.
//!
//! A [`TimeLimiter`] races a call against a deadline; whichever finishes
//! first decides the outcome. Two modes are supported:
//!
//! - `cancel_running_call(false)` (default): the call runs as its own tokio
//!   task. On timeout the caller stops waiting and the task keeps running in
//!   the background. A panic inside the call is resumed on the caller.
//! - `cancel_running_call(true)`: on timeout the call future is dropped.
//!
//! ## Direct use
//!
//! ```rust
//! use callgate_timelimiter::{TimeLimiter, TimeLimiterConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = TimeLimiter::new(
//!     TimeLimiterConfig::builder()
//!         .name("inventory")
//!         .timeout_duration(Duration::from_millis(100))
//!         .on_timeout(|after| eprintln!("gave up after {after:?}"))
//!         .build(),
//! );
//!
//! let stock = limiter.run(async { Ok::<_, std::io::Error>(42) }).await;
//! assert_eq!(stock.unwrap(), 42);
//! # }
//! ```
//!
//! ## As a Tower layer
//!
//! ```rust
//! use callgate_timelimiter::TimeLimiterConfig;
//! use tower::{Layer, ServiceExt, service_fn};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let layer = TimeLimiterConfig::builder()
//!     .timeout_duration(Duration::from_secs(5))
//!     .build()
//!     .layer();
//!
//! let svc = layer.layer(service_fn(|req: String| async move {
//!     Ok::<String, std::io::Error>(req)
//! }));
//! let response = svc.oneshot("hello".to_string()).await.unwrap();
//! assert_eq!(response, "hello");
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod limiter;
mod service;

pub use config::{TimeLimiterConfig, TimeLimiterConfigBuilder};
pub use error::TimeLimiterError;
pub use events::TimeLimiterEvent;
pub use layer::TimeLimiterLayer;
pub use limiter::TimeLimiter;
pub use service::TimeLimiterService;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_histogram};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "timelimiter_calls_total",
            "Total number of time limiter calls (success, error, or timeout)"
        );
        describe_histogram!(
            "timelimiter_call_duration_seconds",
            "Duration of calls that finished before their deadline"
        );
    });
}
