// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fetches a value through the relay twice: the first call goes "remote", the second is served
//! from the cache.
//!
//! Run with `RUST_LOG=debug` to see cache, limiter and retry events.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use http::StatusCode;
use rebound::RemoteError;
use relay::{Relay, RelayConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Balance {
    available_cents: u64,
    currency: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    relay::logging::init("info,cellar=debug")?;

    let root = std::env::temp_dir().join("relay-memoized-fetch");
    let config = RelayConfig::from_toml_str(&format!(
        r#"
        [cache]
        root = {root:?}
        default_ttl_ms = 60000

        [retry]
        initial_delay_ms = 200
        "#,
        root = root.display().to_string(),
    ))?;
    let relay = Relay::start(&config);

    let attempts = &AtomicU32::new(0);
    for round in 1..=2 {
        let balance: Balance = relay
            .fetch("stripe", ("stripe", "balance"), Some(Duration::from_secs(30)), || async move {
                // The first attempt hits a flaky gateway.
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(RemoteError::status(StatusCode::BAD_GATEWAY));
                }
                Ok(Balance {
                    available_cents: 125_000,
                    currency: "usd".to_owned(),
                })
            })
            .await?;
        println!("round {round}: {balance:?}");
    }

    println!("remote attempts: {}", attempts.load(Ordering::SeqCst));
    println!("cache: {:?}", relay.cache().stats().await);

    relay.cache().clear(Some("stripe")).await;
    relay.shutdown().await;
    Ok(())
}
