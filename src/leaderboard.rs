use crate::{
    Address,
    U256,
    chain::GameReads,
    directory::Directory,
    units::short_address,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use futures::future::join_all;
use itertools::Itertools;
use tracing::warn;

pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub address: Address,
    pub name: String,
    pub transactions: u64,
    pub score: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderboardSource {
    Api,
    Chain,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaderboard {
    pub rows: Vec<LeaderboardRow>,
    pub source: LeaderboardSource,
}

/// Drop inactive players, order by transactions (then score), keep the top 10.
pub fn rank(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardRow> {
    rows.into_iter()
        .filter(|row| row.transactions > 0)
        .sorted_by(|a, b| {
            b.transactions
                .cmp(&a.transactions)
                .then_with(|| b.score.cmp(&a.score))
        })
        .take(LEADERBOARD_SIZE)
        .collect()
}

/// Fetch the leaderboard from the REST api, falling back to the contracts.
pub async fn load(reads: &dyn GameReads, directory: &dyn Directory) -> Result<Leaderboard> {
    match directory.leaderboard(1).await {
        Ok(page) if !page.entries.is_empty() => {
            let rows = page
                .entries
                .into_iter()
                .map(|entry| LeaderboardRow {
                    name: entry
                        .username
                        .unwrap_or_else(|| short_address(&entry.address)),
                    address: entry.address,
                    transactions: entry.transactions,
                    score: entry.score,
                })
                .collect();
            return Ok(Leaderboard {
                rows: rank(rows),
                source: LeaderboardSource::Api,
            });
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "leaderboard api unavailable, reading contracts"),
    }
    load_from_chain(reads, directory).await
}

pub async fn load_from_chain(
    reads: &dyn GameReads,
    directory: &dyn Directory,
) -> Result<Leaderboard> {
    let players = reads
        .all_time_players()
        .await
        .wrap_err("failed to list players")?;
    let rows = join_all(players.into_iter().map(|address| async move {
        let (standing, name) = futures::join!(
            reads.player_standing(address),
            directory.display_name(address)
        );
        match standing {
            Ok(standing) => LeaderboardRow {
                address,
                name,
                transactions: standing.transactions,
                score: standing.score,
            },
            Err(e) => {
                warn!(error = %e, player = %short_address(&address), "player standing unavailable");
                LeaderboardRow {
                    address,
                    name,
                    transactions: 0,
                    score: U256::zero(),
                }
            }
        }
    }))
    .await;
    Ok(Leaderboard {
        rows: rank(rows),
        source: LeaderboardSource::Chain,
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn row(byte: u8, transactions: u64) -> LeaderboardRow {
        LeaderboardRow {
            address: Address::repeat_byte(byte),
            name: format!("player-{byte}"),
            transactions,
            score: U256::from(transactions),
        }
    }

    #[test]
    fn rank__drops_inactive_and_sorts_descending() {
        // given
        let rows = vec![row(1, 3), row(2, 0), row(3, 9), row(4, 5)];

        // when
        let ranked = rank(rows);

        // then
        let order: Vec<_> = ranked.iter().map(|r| r.transactions).collect();
        assert_eq!(order, vec![9, 5, 3]);
    }

    #[test]
    fn rank__keeps_only_top_ten() {
        let rows = (1..=15).map(|i| row(i, i as u64)).collect();
        let ranked = rank(rows);
        assert_eq!(ranked.len(), LEADERBOARD_SIZE);
        assert_eq!(ranked[0].transactions, 15);
        assert_eq!(ranked[9].transactions, 6);
    }
}
