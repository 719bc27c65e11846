//! In-memory stand-ins for the chain, the identity api and wallet sessions.

use crate::{
    Address,
    H256,
    U256,
    chain::{
        ChainError,
        GameReads,
        Receipt,
    },
    contract::{
        DrawRecord,
        GameStatus,
        PlacedBet,
        PlayerBets,
        PlayerStanding,
        Winner,
    },
    directory::{
        Directory,
        LeaderboardPage,
    },
    session::WalletSession,
    units::parse_ether,
};
use async_trait::async_trait;
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        MutexGuard,
    },
};

#[derive(Clone, Debug, Default)]
pub struct FakeChainState {
    pub status: GameStatus,
    pub history: Vec<DrawRecord>,
    pub balances: HashMap<Address, U256>,
    pub admins: Vec<Address>,
    pub pending_withdrawals: HashMap<Address, U256>,
    pub player_bets: HashMap<Address, PlayerBets>,
    pub round_counts: HashMap<Address, (u64, u64)>,
    pub players: Vec<Address>,
    pub standings: HashMap<Address, PlayerStanding>,
    /// Transactions still waiting to be mined; everything else has a
    /// successful receipt.
    pub unmined: Vec<H256>,
    pub fail_reads: bool,
}

#[derive(Default)]
pub struct FakeChain {
    state: Mutex<FakeChainState>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeChain {
    pub fn new(state: FakeChainState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeChainState)) {
        f(&mut self.lock_state());
    }

    /// Number of times `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.lock_calls().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock_calls().values().sum()
    }

    fn lock_state(&self) -> MutexGuard<'_, FakeChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_calls(&self) -> MutexGuard<'_, HashMap<&'static str, usize>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, method: &'static str) -> Result<MutexGuard<'_, FakeChainState>, ChainError> {
        *self.lock_calls().entry(method).or_default() += 1;
        let state = self.lock_state();
        if state.fail_reads {
            return Err(ChainError::Rpc {
                code: -32603,
                message: format!("{method} unavailable"),
                data: None,
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl GameReads for FakeChain {
    async fn full_status(&self) -> Result<GameStatus, ChainError> {
        Ok(self.record("full_status")?.status.clone())
    }

    async fn draw_history(&self) -> Result<Vec<DrawRecord>, ChainError> {
        Ok(self.record("draw_history")?.history.clone())
    }

    async fn bet_price(&self) -> Result<U256, ChainError> {
        Ok(self.record("bet_price")?.status.bet_price)
    }

    async fn is_admin(&self, player: Address) -> Result<bool, ChainError> {
        Ok(self.record("is_admin")?.admins.contains(&player))
    }

    async fn pending_withdrawal(&self, player: Address) -> Result<U256, ChainError> {
        let state = self.record("pending_withdrawal")?;
        Ok(state
            .pending_withdrawals
            .get(&player)
            .copied()
            .unwrap_or_default())
    }

    async fn player_bets(&self, player: Address) -> Result<PlayerBets, ChainError> {
        let state = self.record("player_bets")?;
        Ok(state.player_bets.get(&player).cloned().unwrap_or_default())
    }

    async fn round_bet_counts(
        &self,
        _round_id: U256,
        player: Address,
    ) -> Result<(u64, u64), ChainError> {
        let state = self.record("round_bet_counts")?;
        Ok(state.round_counts.get(&player).copied().unwrap_or_default())
    }

    async fn balance(&self, player: Address) -> Result<U256, ChainError> {
        let state = self.record("balance")?;
        Ok(state.balances.get(&player).copied().unwrap_or_default())
    }

    async fn all_time_players(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.record("all_time_players")?.players.clone())
    }

    async fn player_standing(&self, player: Address) -> Result<PlayerStanding, ChainError> {
        let state = self.record("player_standing")?;
        Ok(state.standings.get(&player).copied().unwrap_or_default())
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError> {
        let state = self.record("transaction_receipt")?;
        if state.unmined.contains(&hash) {
            return Ok(None);
        }
        Ok(Some(Receipt {
            transaction_hash: hash,
            block_number: Some(1),
            success: true,
        }))
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub usernames: HashMap<Address, String>,
    /// `None` makes the leaderboard endpoint fail.
    pub leaderboard: Option<LeaderboardPage>,
    lookups: Mutex<usize>,
}

impl FakeDirectory {
    pub fn new(usernames: HashMap<Address, String>, leaderboard: Option<LeaderboardPage>) -> Self {
        Self {
            usernames,
            leaderboard,
            lookups: Mutex::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn username(&self, address: Address) -> Result<Option<String>> {
        *self.lookups.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        Ok(self.usernames.get(&address).cloned())
    }

    async fn leaderboard(&self, _page: u32) -> Result<LeaderboardPage> {
        self.leaderboard
            .clone()
            .ok_or_else(|| eyre!("leaderboard api offline"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Accept,
    Reject,
    Revert(String),
}

pub struct FakeSession {
    address: Address,
    outcome: Mutex<SendOutcome>,
    sent: Mutex<Vec<SentTransaction>>,
}

impl FakeSession {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            outcome: Mutex::new(SendOutcome::Accept),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: SendOutcome) {
        *self.outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = outcome;
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl WalletSession for FakeSession {
    fn address(&self) -> Address {
        self.address
    }

    fn provider_label(&self) -> String {
        "fake".to_string()
    }

    async fn send_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<H256, ChainError> {
        let outcome = self
            .outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match outcome {
            SendOutcome::Reject => Err(ChainError::UserRejected),
            SendOutcome::Revert(reason) => Err(ChainError::Reverted { reason }),
            SendOutcome::Accept => {
                let mut sent = self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                sent.push(SentTransaction { to, data, value });
                Ok(H256::from_low_u64_be(sent.len() as u64))
            }
        }
    }
}

pub fn player(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// Open round priced at 0.02 MON with caps of 10 numbers and 4 animals.
pub fn open_status() -> Result<GameStatus> {
    Ok(GameStatus {
        round_id: U256::from(7u64),
        current_pot: parse_ether("12.5")?,
        bonus_pot: parse_ether("1")?,
        bet_price: parse_ether("0.02")?,
        paused: false,
        max_number_bets: 10,
        max_animal_bets: 4,
        number_percentage: 70,
        animal_percentage: 30,
        draw_in_progress: false,
    })
}

/// A draw record carrying the given published result.
pub fn published_draw(id: u64, random: H256, winning_number: u8, winning_animal: &str) -> DrawRecord {
    let winner = player(0x11);
    DrawRecord {
        id,
        timestamp: 1_754_000_000 + id * 3_600,
        winning_number,
        winning_animal: winning_animal.to_string(),
        total_pot: U256::from(id) * U256::exp10(18),
        number_winners: vec![Winner {
            player: winner,
            amount_won: U256::exp10(17),
        }],
        animal_winners: Vec::new(),
        random_value: random,
        bets: vec![PlacedBet {
            player: winner,
            numbers: vec![winning_number],
            animals: Vec::new(),
        }],
    }
}

/// Oracle values with their published number and animal, reduced mod 96 by
/// hand.
pub const PUBLISHED_DRAWS: [(&str, u8, &str); 5] = [
    // 255 = 2 * 96 + 63
    (
        "0x00000000000000000000000000000000000000000000000000000000000000ff",
        63,
        "Lyraffe",
    ),
    // 2^256 = 64 (mod 96), so 2^256 - 1 = 63
    (
        "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        63,
        "Lyraffe",
    ),
    // 2^255 = 0 (mod 32) and 2 (mod 3)
    (
        "0x8000000000000000000000000000000000000000000000000000000000000000",
        32,
        "Moncock",
    ),
    (
        "0x0000000000000000000000000000000000000000000000000000000000000060",
        0,
        "Monlandak",
    ),
    (
        "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a",
        90,
        "MonCoringa",
    ),
];

pub fn historical_draws() -> Vec<DrawRecord> {
    PUBLISHED_DRAWS
        .iter()
        .zip(1u64..)
        .filter_map(|((raw, number, animal), id)| {
            let bytes = hex::decode(raw.trim_start_matches("0x")).ok()?;
            Some(published_draw(id, H256::from_slice(&bytes), *number, animal))
        })
        .collect()
}
