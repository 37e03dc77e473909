use callgate_circuitbreaker::{CircuitState, WindowSnapshot};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one resource's gate, for export to a metrics
/// collector or health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateState {
    /// Resource name.
    pub name: String,
    /// Circuit breaker state.
    pub state: CircuitState,
    /// Contents of the breaker's sliding window.
    pub window: WindowSnapshot,
    /// Calls refused by the circuit breaker.
    pub circuit_rejections: u64,
    /// Calls refused by the bulkhead.
    pub bulkhead_rejections: u64,
    /// Calls currently holding a bulkhead permit.
    pub in_flight: usize,
    /// Bulkhead capacity.
    pub max_concurrent_calls: usize,
}

impl GateState {
    /// Total calls refused before they could run.
    pub fn rejection_count(&self) -> u64 {
        self.circuit_rejections + self.bulkhead_rejections
    }

    /// Returns true if the circuit is refusing calls.
    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }
}
