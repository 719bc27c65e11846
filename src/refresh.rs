//! Background refresh loop.
//!
//! A single worker owns every read. Timers, chain events and UI requests all
//! arrive as [`RefreshTrigger`]s on one channel; whatever is queued when the
//! worker wakes up is merged into one [`RefreshScope`] and fetched once.
//! The leaderboard goes through an external api, so it is loaded in its own
//! task under [`RefreshSources::leaderboard_budget`] and never holds up the
//! chain slices.

use crate::{
    Address,
    U256,
    chain::GameReads,
    contract::ChainEvent,
    directory::Directory,
    leaderboard,
    snapshot::{
        PlayerState,
        Slice,
        SnapshotUpdate,
    },
    units::short_address,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        Instant,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshScope {
    pub public: bool,
    pub player: bool,
    pub history: bool,
    pub leaderboard: bool,
}

impl RefreshScope {
    pub const NONE: RefreshScope = RefreshScope {
        public: false,
        player: false,
        history: false,
        leaderboard: false,
    };
    pub const FAST: RefreshScope = RefreshScope {
        public: true,
        player: true,
        history: false,
        leaderboard: false,
    };
    pub const SLOW: RefreshScope = RefreshScope {
        public: false,
        player: false,
        history: true,
        leaderboard: true,
    };
    pub const ALL: RefreshScope = RefreshScope {
        public: true,
        player: true,
        history: true,
        leaderboard: true,
    };
    pub const LEADERBOARD: RefreshScope = RefreshScope {
        public: false,
        player: false,
        history: false,
        leaderboard: true,
    };

    pub fn union(self, other: RefreshScope) -> RefreshScope {
        RefreshScope {
            public: self.public || other.public,
            player: self.player || other.player,
            history: self.history || other.history,
            leaderboard: self.leaderboard || other.leaderboard,
        }
    }

    pub fn is_empty(self) -> bool {
        self == RefreshScope::NONE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    Refresh(RefreshScope),
    Chain(ChainEvent),
    /// Switch the tracked wallet; `None` drops player data.
    SetPlayer(Option<Address>),
    Shutdown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerEvent {
    Update(SnapshotUpdate),
    Chain(ChainEvent),
}

#[derive(Clone)]
pub struct RefreshSources {
    pub reads: Arc<dyn GameReads>,
    pub directory: Arc<dyn Directory>,
    /// Upper bound on one leaderboard load, REST and chain fallback included.
    pub leaderboard_budget: Duration,
}

/// Which slices a contract event invalidates.
pub fn scope_for_event(event: &ChainEvent) -> RefreshScope {
    match event {
        ChainEvent::BetsPlaced { .. } => RefreshScope::FAST,
        ChainEvent::PlayerDataUpdated { .. } => RefreshScope::LEADERBOARD,
    }
}

struct WorkerState {
    player: Option<Address>,
    round_id: Option<U256>,
    leaderboard: Option<JoinHandle<()>>,
}

impl WorkerState {
    fn leaderboard_in_flight(&self) -> bool {
        self.leaderboard
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

pub async fn refresh_worker(
    sources: RefreshSources,
    player: Option<Address>,
    fast_period: Duration,
    slow_period: Duration,
    mut trigger_rx: mpsc::UnboundedReceiver<RefreshTrigger>,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
) -> Result<()> {
    let mut state = WorkerState {
        player,
        round_id: None,
        leaderboard: None,
    };
    fetch_scope(&sources, &mut state, RefreshScope::ALL, &event_tx).await?;

    let mut fast = time::interval_at(Instant::now() + fast_period, fast_period);
    let mut slow = time::interval_at(Instant::now() + slow_period, slow_period);
    fast.set_missed_tick_behavior(MissedTickBehavior::Delay);
    slow.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let mut scope = tokio::select! {
            _ = fast.tick() => RefreshScope::FAST,
            _ = slow.tick() => RefreshScope::SLOW,
            trigger = trigger_rx.recv() => {
                let Some(trigger) = trigger else {
                    break;
                };
                match absorb(trigger, &mut state, &event_tx)? {
                    Some(scope) => scope,
                    None => break,
                }
            }
        };

        let mut shutdown = false;
        while let Ok(trigger) = trigger_rx.try_recv() {
            match absorb(trigger, &mut state, &event_tx)? {
                Some(extra) => scope = scope.union(extra),
                None => {
                    shutdown = true;
                    break;
                }
            }
        }
        if shutdown {
            break;
        }
        if !scope.is_empty() {
            fetch_scope(&sources, &mut state, scope, &event_tx).await?;
        }
    }
    if let Some(task) = state.leaderboard.take() {
        task.abort();
    }
    info!("refresh worker stopped");
    Ok(())
}

/// Apply a trigger's side effects and return the scope it asks for, or `None`
/// on shutdown.
fn absorb(
    trigger: RefreshTrigger,
    state: &mut WorkerState,
    event_tx: &mpsc::UnboundedSender<WorkerEvent>,
) -> Result<Option<RefreshScope>> {
    let scope = match trigger {
        RefreshTrigger::Refresh(scope) => scope,
        RefreshTrigger::Chain(event) => {
            let scope = scope_for_event(&event);
            send(event_tx, WorkerEvent::Chain(event))?;
            scope
        }
        RefreshTrigger::SetPlayer(player) => {
            state.player = player;
            if player.is_none() {
                send(event_tx, WorkerEvent::Update(SnapshotUpdate::PlayerCleared))?;
            }
            RefreshScope::FAST
        }
        RefreshTrigger::Shutdown => return Ok(None),
    };
    Ok(Some(scope))
}

fn send(event_tx: &mpsc::UnboundedSender<WorkerEvent>, event: WorkerEvent) -> Result<()> {
    event_tx
        .send(event)
        .map_err(|_| eyre!("snapshot receiver dropped"))
}

fn read_failed(slice: Slice, error: impl std::fmt::Display) -> WorkerEvent {
    warn!(slice = slice.label(), error = %error, "read failed");
    WorkerEvent::Update(SnapshotUpdate::ReadFailed {
        slice,
        error: error.to_string(),
    })
}

async fn fetch_scope(
    sources: &RefreshSources,
    state: &mut WorkerState,
    scope: RefreshScope,
    event_tx: &mpsc::UnboundedSender<WorkerEvent>,
) -> Result<()> {
    debug!(?scope, "refreshing");
    let reads = &*sources.reads;

    if scope.public {
        let event = match reads.full_status().await {
            Ok(status) => {
                state.round_id = Some(status.round_id);
                WorkerEvent::Update(SnapshotUpdate::Public(status))
            }
            Err(e) => read_failed(Slice::Public, e),
        };
        send(event_tx, event)?;
    }

    if scope.player
        && let Some(address) = state.player
    {
        let event = match fetch_player(reads, address, state.round_id).await {
            Ok(player) => WorkerEvent::Update(SnapshotUpdate::Player(player)),
            Err(e) => read_failed(Slice::Player, e),
        };
        send(event_tx, event)?;
    }

    if scope.history {
        let event = match reads.draw_history().await {
            Ok(records) => WorkerEvent::Update(SnapshotUpdate::History(records)),
            Err(e) => read_failed(Slice::History, e),
        };
        send(event_tx, event)?;
    }

    if scope.leaderboard {
        if state.leaderboard_in_flight() {
            debug!("leaderboard load still running, skipping");
        } else {
            state.leaderboard = Some(tokio::spawn(load_leaderboard(
                sources.clone(),
                event_tx.clone(),
            )));
        }
    }
    Ok(())
}

async fn load_leaderboard(sources: RefreshSources, event_tx: mpsc::UnboundedSender<WorkerEvent>) {
    let load = leaderboard::load(&*sources.reads, &*sources.directory);
    let event = match time::timeout(sources.leaderboard_budget, load).await {
        Ok(Ok(board)) => WorkerEvent::Update(SnapshotUpdate::Leaderboard(board)),
        Ok(Err(e)) => read_failed(Slice::Leaderboard, e),
        Err(_) => read_failed(
            Slice::Leaderboard,
            format!(
                "leaderboard load exceeded {}s",
                sources.leaderboard_budget.as_secs_f32()
            ),
        ),
    };
    if event_tx.send(event).is_err() {
        debug!("snapshot receiver dropped before leaderboard arrived");
    }
}

async fn fetch_player(
    reads: &dyn GameReads,
    address: Address,
    round_id: Option<U256>,
) -> Result<PlayerState> {
    let round_counts = async {
        match round_id {
            Some(round_id) => reads.round_bet_counts(round_id, address).await,
            None => Ok((0, 0)),
        }
    };
    let (balance, pending_withdrawal, is_admin, bets, (numbers, animals)) = tokio::try_join!(
        reads.balance(address),
        reads.pending_withdrawal(address),
        reads.is_admin(address),
        reads.player_bets(address),
        round_counts,
    )?;
    debug!(player = %short_address(&address), "player state refreshed");
    Ok(PlayerState {
        address,
        balance,
        pending_withdrawal,
        is_admin,
        bets,
        numbers_this_round: numbers,
        animals_this_round: animals,
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn union__merges_fast_and_slow_into_all() {
        assert_eq!(RefreshScope::FAST.union(RefreshScope::SLOW), RefreshScope::ALL);
        assert!(RefreshScope::NONE.is_empty());
        assert!(!RefreshScope::LEADERBOARD.is_empty());
    }

    #[test]
    fn scope_for_event__maps_contract_events() {
        let bets = ChainEvent::BetsPlaced {
            player: Address::zero(),
            total_bets: 2,
        };
        let standings = ChainEvent::PlayerDataUpdated {
            player: Address::zero(),
            score: U256::zero(),
            transactions: 1,
        };
        assert_eq!(scope_for_event(&bets), RefreshScope::FAST);
        assert_eq!(scope_for_event(&standings), RefreshScope::LEADERBOARD);
    }
}
