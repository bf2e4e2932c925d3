mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{hub_with, hub_with_shared, MockDriver};
use snarkgate_wallet_core::WalletKind;

#[tokio::test]
async fn restore_adopts_an_existing_hosted_session() {
    let driver = Arc::new(MockDriver::hosted().probe_finds_session());
    let hub = hub_with_shared(&driver);

    hub.restore_session().await;

    assert!(hub.connected());
    assert_eq!(hub.wallet_kind(), Some(WalletKind::Puzzle));
    assert_eq!(hub.address().as_deref(), Some("aleo1mockaddress"));
    assert_eq!(driver.connect_calls.load(Ordering::SeqCst), 0);
    assert!(hub
        .logs()
        .iter()
        .any(|entry| entry.event == "Connection detected!"));
}

#[tokio::test]
async fn restore_retries_probes_until_one_answers() {
    let driver = Arc::new(MockDriver::hosted().probe_outcomes(&[None, None, Some("aleo1slow")]));
    let hub = hub_with_shared(&driver);

    hub.restore_session().await;

    assert!(hub.connected());
    assert_eq!(hub.address().as_deref(), Some("aleo1slow"));
    assert_eq!(driver.probe_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn restore_gives_up_quietly_when_no_session_exists() {
    let driver = Arc::new(MockDriver::hosted());
    let hub = hub_with_shared(&driver);

    hub.restore_session().await;

    assert!(!hub.connected());
    assert!(!hub.connecting());
    // A quiet failure: probing is a background convenience, not a
    // user-initiated connect, so no error message is surfaced.
    assert_eq!(hub.error_message(), None);
    // Three numbered probes plus the final one after the settle delay.
    assert_eq!(driver.probe_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn restore_is_a_noop_without_a_hosted_driver() {
    let hub = hub_with(MockDriver::extension());

    hub.restore_session().await;

    assert!(!hub.connected());
    assert!(hub.logs().is_empty());
}
