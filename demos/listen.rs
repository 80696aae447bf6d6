//! Listen - print announcements from a local txradar feed.
//!
//! This example demonstrates:
//! - Configuring a listener with the builder
//! - Receiving announcements through a bounded channel
//! - Stopping the listener on ctrl-c with a `CancellationToken`
//! - Reading stats after the run
//!
//! # Running
//!
//! ```text
//! cargo run --example listen -- tcp://127.0.0.1:7678
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use txradar_listener::{default_endpoint, Announcement, Listener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = std::env::args().nth(1).unwrap_or_else(default_endpoint);

    let mut listener = Listener::builder()
        .endpoint(endpoint)
        .idle_timeout(Duration::from_secs(30))
        .max_retries(10)
        .build();
    let stats = listener.stats();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    // One slot: a slow consumer holds back the receive loop
    let (tx, mut rx) = mpsc::channel::<Announcement>(1);
    let printer = tokio::spawn(async move {
        while let Some(ann) = rx.recv().await {
            println!("{} {}", ann.node_id(), ann.tx_hash_hex_reversed());
        }
    });

    listener.run(tx, cancel).await?;
    printer.await?;

    println!("{}", serde_json::to_string_pretty(&stats.snapshot())?);
    Ok(())
}
