#![allow(non_snake_case)]
use color_eyre::eyre::{
    Report,
    WrapErr,
};
use jdb_raffle::{
    chain::{
        ChainError,
        GameReads,
    },
    client::{
        AppController,
        Background,
    },
    config::RefreshTimings,
    contract::ChainEvent,
    notify::{
        Notifications,
        Severity,
    },
    test_helpers::{
        FakeChain,
        FakeChainState,
        FakeDirectory,
        player,
    },
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};
use tokio::sync::mpsc;

fn notifications() -> Notifications {
    Notifications::new(Duration::from_secs(5), Duration::from_secs(10))
}

fn wallet_error(code: i64, message: &str) -> Report {
    Err::<(), _>(ChainError::from_rpc(code, message.to_string(), None))
        .wrap_err("sending transaction failed")
        .unwrap_err()
}

#[test]
fn report_failure__stays_silent_when_user_rejects_signature() {
    // given
    let mut n = notifications();

    // when
    let shown = n.report_failure("Bet failed", &wallet_error(4001, "User rejected the request."));

    // then
    assert!(!shown);
    assert!(n.is_empty());
}

#[test]
fn report_failure__shows_other_wallet_errors() {
    // given
    let mut n = notifications();

    // when
    let shown = n.report_failure("Bet failed", &wallet_error(-32000, "insufficient funds for gas"));

    // then
    assert!(shown);
    let banner = n.active().next().unwrap();
    assert_eq!(banner.severity, Severity::Error);
    assert!(banner.message.starts_with("Bet failed: "));
    assert!(banner.message.contains("insufficient funds for gas"));
}

async fn banner_for(usernames: HashMap<jdb_raffle::Address, String>) -> String {
    let reads: Arc<dyn GameReads> = Arc::new(FakeChain::new(FakeChainState::default()));
    let mut controller = AppController::new(
        reads,
        Arc::new(FakeDirectory::new(usernames, None)),
        None,
        player(0xaa),
        RefreshTimings::default(),
    );
    let (background_tx, mut background_rx) = mpsc::unbounded_channel::<Background>();
    controller.on_chain_event(
        ChainEvent::BetsPlaced {
            player: player(0x22),
            total_bets: 3,
        },
        &background_tx,
    );
    let message = background_rx.recv().await.unwrap();
    assert!(!controller.on_background(message));
    let banner = controller.notifications.active().next().unwrap().clone();
    assert_eq!(banner.severity, Severity::Bet);
    banner.message
}

#[tokio::test]
async fn on_chain_event__names_bettor_from_directory() {
    let usernames = HashMap::from([(player(0x22), "alice".to_string())]);
    assert_eq!(banner_for(usernames).await, "alice just placed 3 bets!");
}

#[tokio::test]
async fn on_chain_event__falls_back_to_short_address() {
    assert_eq!(
        banner_for(HashMap::new()).await,
        "0x2222...2222 just placed 3 bets!"
    );
}
