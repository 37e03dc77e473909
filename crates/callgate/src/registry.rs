//! Named collection of resource gates.

use crate::config::{GateConfig, RegistryConfig};
use crate::error::ConfigError;
use crate::gate::ResourceGate;
use crate::state::GateState;
use callgate_core::{GateError, SharedClock};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Immutable map from resource name to its [`ResourceGate`].
///
/// Built once, then shared. Cloning gives another handle to the same
/// gates, so every clone sees the same circuits and bulkheads.
///
/// ```
/// use callgate::{GateConfig, GateRegistry};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = GateRegistry::builder()
///     .resource("inventory", GateConfig::default())
///     .build()?;
///
/// let stock = registry
///     .invoke("inventory", || async { Ok::<_, std::io::Error>(42) })
///     .await?;
/// assert_eq!(stock, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GateRegistry {
    gates: Arc<BTreeMap<String, Arc<ResourceGate>>>,
}

impl GateRegistry {
    /// Starts an empty registry.
    pub fn builder() -> GateRegistryBuilder {
        GateRegistryBuilder::default()
    }

    /// Builds one gate per resource in `config`.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
        config
            .resources
            .iter()
            .fold(Self::builder(), |builder, (name, gate)| {
                builder.resource(name.clone(), gate.clone())
            })
            .build()
    }

    /// The gate for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&Arc<ResourceGate>> {
        self.gates.get(name)
    }

    /// Runs `call` through the gate for `name`.
    pub async fn invoke<F, Fut, T, E>(&self, name: &str, call: F) -> Result<T, GateError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.lookup(name)?.invoke(call).await
    }

    /// Runs `call` through the gate for `name`, retrying only errors for
    /// which `is_retryable` returns true.
    pub async fn invoke_with<F, Fut, T, E, P>(
        &self,
        name: &str,
        call: F,
        is_retryable: P,
    ) -> Result<T, GateError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        P: Fn(&E) -> bool,
    {
        self.lookup(name)?.invoke_with(call, is_retryable).await
    }

    fn lookup<E>(&self, name: &str) -> Result<&Arc<ResourceGate>, GateError<E>> {
        self.gates.get(name).ok_or_else(|| {
            tracing::warn!(resource = name, "invoke on unknown resource");
            GateError::UnknownResource {
                name: name.to_string(),
            }
        })
    }

    /// State of the gate for `name`.
    pub fn state(&self, name: &str) -> Option<GateState> {
        self.gates.get(name).map(|gate| gate.state())
    }

    /// State of every gate, ordered by name.
    pub fn states(&self) -> Vec<GateState> {
        self.gates.values().map(|gate| gate.state()).collect()
    }

    /// Registered resource names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gates.keys().map(String::as_str)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Returns true if no resource is registered.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

enum Pending {
    Config(String, GateConfig),
    Gate(ResourceGate),
}

/// Collects gates for a [`GateRegistry`].
#[derive(Default)]
pub struct GateRegistryBuilder {
    pending: Vec<Pending>,
    clock: Option<SharedClock>,
}

impl GateRegistryBuilder {
    /// Registers `name` with gate settings built at [`build`](Self::build).
    pub fn resource(mut self, name: impl Into<String>, config: GateConfig) -> Self {
        self.pending.push(Pending::Config(name.into(), config));
        self
    }

    /// Registers an already assembled gate under its own name.
    pub fn gate(mut self, gate: ResourceGate) -> Self {
        self.pending.push(Pending::Gate(gate));
        self
    }

    /// Clock used by breakers built from [`resource`](Self::resource)
    /// settings.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates every resource and builds the registry.
    ///
    /// Fails on the first invalid configuration or repeated name.
    pub fn build(self) -> Result<GateRegistry, ConfigError> {
        let mut gates = BTreeMap::new();

        for pending in self.pending {
            let gate = match pending {
                Pending::Config(name, config) => match &self.clock {
                    Some(clock) => ResourceGate::with_clock(name, config, Arc::clone(clock))?,
                    None => ResourceGate::new(name, config)?,
                },
                Pending::Gate(gate) => gate,
            };

            let name = gate.name().to_string();
            if gates.contains_key(&name) {
                return Err(ConfigError::DuplicateResource(name));
            }
            gates.insert(name, Arc::new(gate));
        }

        tracing::debug!(resources = gates.len(), "gate registry built");
        Ok(GateRegistry {
            gates: Arc::new(gates),
        })
    }
}

impl std::fmt::Debug for GateRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateRegistryBuilder")
            .field("pending", &self.pending.len())
            .field("custom_clock", &self.clock.is_some())
            .finish()
    }
}
