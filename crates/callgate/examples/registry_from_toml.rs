//! Builds a gate registry from TOML and drives a flaky dependency until
//! its circuit opens.
//!
//! Run with: RUST_LOG=callgate=debug cargo run -p callgate --example registry_from_toml

use callgate::{GateError, GateRegistry, RegistryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[resources.payments]
window_size = 10
min_calls = 5
failure_rate_threshold = 50.0
open_wait_duration_ms = 1000
max_retry_attempts = 2
retry_base_delay_ms = 50
timeout_duration_ms = 200
max_concurrent_calls = 4

[resources.catalog]
max_retry_attempts = 3
retry_base_delay_ms = 20
retry_jitter = 0.25
"#;

#[derive(Debug)]
struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dependency unavailable")
    }
}

impl std::error::Error for Unavailable {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("callgate=info")),
        )
        .init();

    let config = RegistryConfig::from_toml_str(CONFIG)?;
    let registry = GateRegistry::from_config(&config)?;
    println!("registered: {:?}", registry.names().collect::<Vec<_>>());

    let calls = AtomicUsize::new(0);
    for i in 0..8 {
        let result = registry
            .invoke("payments", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    // every third call succeeds
                    if n % 3 == 2 {
                        Ok(format!("charge-{n}"))
                    } else {
                        Err(Unavailable)
                    }
                }
            })
            .await;

        match result {
            Ok(receipt) => println!("#{i}: ok {receipt}"),
            Err(GateError::CircuitOpen { name }) => println!("#{i}: circuit '{name}' is open"),
            Err(err) => println!("#{i}: {err}"),
        }
    }

    if let Some(state) = registry.state("payments") {
        println!(
            "payments: state={} rejected={} in_flight={}",
            state.state,
            state.rejection_count(),
            state.in_flight
        );
    }

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let probe = registry
        .invoke("payments", || async { Ok::<_, Unavailable>("probe") })
        .await;
    println!("after open wait: {probe:?}");

    let item = registry
        .invoke("catalog", || async { Ok::<_, Unavailable>(42u32) })
        .await?;
    println!("catalog item: {item}");

    Ok(())
}
