//! Snarkgate: console harness for the unified Aleo wallet hub.
//!
//! Connects the requested wallet kind (restoring an existing hosted
//! session first), runs a signature round-trip, and dumps the hub state.

use snarkgate_wallet_adapters::{default_drivers, WalletAdapterConfig};
use snarkgate_wallet_core::{WalletHub, WalletKind};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Snarkgate");

    let kind = match std::env::args().nth(1).as_deref() {
        None | Some("puzzle") => WalletKind::Puzzle,
        Some("leo") => WalletKind::Leo,
        Some("fox") => WalletKind::Fox,
        Some("soter") => WalletKind::Soter,
        Some(other) => {
            return Err(eyre::eyre!(
                "unknown wallet kind: {other} (expected puzzle, leo, fox, or soter)"
            ))
        }
    };

    let config = WalletAdapterConfig::from_env();
    let mut builder = WalletHub::builder();
    for driver in default_drivers(&config) {
        builder = builder.driver(driver);
    }
    let hub = builder.build();

    hub.restore_session().await;
    if !hub.connected() {
        hub.connect(kind).await;
    }

    let snapshot = hub.snapshot();
    let Some(address) = snapshot.address else {
        for entry in snapshot.log.iter().rev() {
            println!("  {}", entry.event);
        }
        return Err(eyre::eyre!(
            "could not connect: {}",
            snapshot
                .error_message
                .unwrap_or_else(|| "no error recorded".to_owned())
        ));
    };
    println!(
        "connected to {} as {address}",
        snapshot.wallet_name.unwrap_or("unknown wallet")
    );

    match hub.sign_message("snarkgate connectivity check").await {
        Ok(signature) => println!("signature: {signature}"),
        Err(err) => println!("signature failed: {err}"),
    }

    println!("activity log (newest first):");
    for entry in hub.logs() {
        println!("  [{}] {}", entry.at.0, entry.event);
    }

    Ok(())
}
