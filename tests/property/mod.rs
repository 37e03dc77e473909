//! Invariants checked over generated inputs.

pub mod bulkhead;
pub mod retry;
