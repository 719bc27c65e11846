//! Immutable view of everything the client has read from the chain.
//!
//! Each refresh result is folded in through [`GameSnapshot::apply`], which
//! replaces whole slices; nothing is merged field by field.

use crate::{
    Address,
    U256,
    audit::{
        DrawAudit,
        audit_draw,
    },
    bets::{
        BetContext,
        RoundAllowance,
    },
    contract::{
        DrawRecord,
        GameStatus,
        PlayerBets,
    },
    leaderboard::Leaderboard,
};
use chrono::{
    DateTime,
    Utc,
};
use std::collections::VecDeque;

pub const MAX_READ_ERRORS: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicState {
    pub status: GameStatus,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub address: Address,
    pub balance: U256,
    pub pending_withdrawal: U256,
    pub is_admin: bool,
    pub bets: PlayerBets,
    pub numbers_this_round: u64,
    pub animals_this_round: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawView {
    pub record: DrawRecord,
    pub audit: DrawAudit,
}

impl From<DrawRecord> for DrawView {
    fn from(record: DrawRecord) -> Self {
        let audit = audit_draw(&record);
        Self { record, audit }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slice {
    Public,
    Player,
    History,
    Leaderboard,
}

impl Slice {
    pub fn label(self) -> &'static str {
        match self {
            Slice::Public => "game status",
            Slice::Player => "player state",
            Slice::History => "draw history",
            Slice::Leaderboard => "leaderboard",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotUpdate {
    Public(GameStatus),
    Player(PlayerState),
    /// The session ended; player data no longer applies.
    PlayerCleared,
    History(Vec<DrawRecord>),
    Leaderboard(Leaderboard),
    ReadFailed { slice: Slice, error: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameSnapshot {
    pub public: Option<PublicState>,
    pub player: Option<PlayerState>,
    /// Newest draw first.
    pub history: Vec<DrawView>,
    pub leaderboard: Option<Leaderboard>,
    /// Set while no game status has ever been loaded.
    pub page_error: Option<String>,
    pub read_errors: VecDeque<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GameSnapshot {
    pub fn apply(&self, update: SnapshotUpdate) -> GameSnapshot {
        self.apply_at(update, Utc::now())
    }

    pub fn apply_at(&self, update: SnapshotUpdate, now: DateTime<Utc>) -> GameSnapshot {
        let mut next = self.clone();
        match update {
            SnapshotUpdate::Public(status) => {
                next.public = Some(PublicState {
                    status,
                    fetched_at: now,
                });
                next.page_error = None;
            }
            SnapshotUpdate::Player(player) => next.player = Some(player),
            SnapshotUpdate::PlayerCleared => next.player = None,
            SnapshotUpdate::History(mut records) => {
                records.sort_by(|a, b| b.id.cmp(&a.id));
                next.history = records.into_iter().map(DrawView::from).collect();
            }
            SnapshotUpdate::Leaderboard(board) => next.leaderboard = Some(board),
            SnapshotUpdate::ReadFailed { slice, error } => {
                let message = format!("failed to load {}: {error}", slice.label());
                if slice == Slice::Public && next.public.is_none() {
                    next.page_error = Some(message.clone());
                }
                next.read_errors.push_back(message);
                while next.read_errors.len() > MAX_READ_ERRORS {
                    next.read_errors.pop_front();
                }
                return next;
            }
        }
        next.updated_at = Some(now);
        next
    }

    pub fn status(&self) -> Option<&GameStatus> {
        self.public.as_ref().map(|public| &public.status)
    }

    pub fn is_admin(&self) -> bool {
        self.player.as_ref().is_some_and(|player| player.is_admin)
    }

    pub fn is_paused(&self) -> bool {
        self.status().is_some_and(|status| status.paused)
    }

    pub fn can_withdraw(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|player| !player.pending_withdrawal.is_zero())
    }

    /// Inputs for bet pre-flight, once both slices have loaded.
    pub fn bet_context(&self) -> Option<BetContext> {
        let status = self.status()?;
        let player = self.player.as_ref()?;
        Some(BetContext {
            paused: status.paused,
            draw_in_progress: status.draw_in_progress,
            price: status.bet_price,
            balance: player.balance,
            allowance: RoundAllowance {
                max_numbers: status.max_number_bets,
                max_animals: status.max_animal_bets,
                numbers_used: player.numbers_this_round,
                animals_used: player.animals_this_round,
            },
        })
    }

    pub fn last_draw(&self) -> Option<&DrawView> {
        self.history.first()
    }
}
