//! Bulkhead concurrency limiting for callgate.
//!
//! A bulkhead isolates a dependency by capping how many calls to it may be
//! in flight at once. This implementation is a counting semaphore per
//! resource. A call either gets a [`BulkheadPermit`] within the configured
//! wait or is rejected with [`BulkheadError::Rejected`].
//!
//! Permits are RAII guards. The slot is returned when the permit is
//! dropped, so it is released exactly once on success, on error, and when
//! the task holding it is cancelled.
//!
//! # Basic Example
//!
//! ```rust
//! use callgate_bulkhead::{Bulkhead, BulkheadConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), callgate_bulkhead::BulkheadError> {
//! let bulkhead = Bulkhead::new(
//!     BulkheadConfig::builder()
//!         .name("reports")
//!         .max_concurrent_calls(10)
//!         .max_wait_duration(Some(Duration::from_millis(250)))
//!         .build(),
//! );
//!
//! let permit = bulkhead.acquire().await?;
//! // ... perform the call ...
//! permit.release();
//! assert_eq!(bulkhead.in_flight(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! # As a Tower layer
//!
//! ```rust
//! use callgate_bulkhead::{BulkheadConfig, BulkheadError, BulkheadLayer};
//! use tower::ServiceBuilder;
//!
//! # #[derive(Debug)] struct AppError;
//! # impl From<BulkheadError> for AppError { fn from(_: BulkheadError) -> Self { AppError } }
//! let layer = BulkheadLayer::from_config(
//!     BulkheadConfig::builder().max_concurrent_calls(5).build(),
//! );
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service_fn(|req: String| async move { Ok::<_, AppError>(req) });
//! ```
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate

pub mod bulkhead;
pub mod config;
pub mod error;
pub mod events;
pub mod layer;
pub mod service;

pub use bulkhead::{Bulkhead, BulkheadPermit, BulkheadStats};
pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::{BulkheadError, Result};
pub use events::BulkheadEvent;
pub use layer::BulkheadLayer;
pub use service::BulkheadService;
