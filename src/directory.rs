//! Identity and leaderboard lookups against the games-id REST API.

use crate::{
    Address,
    U256,
    units::{
        format_address,
        parse_address,
        short_address,
    },
};
use async_trait::async_trait;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Deserializer,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub address: Address,
    pub username: Option<String>,
    pub score: U256,
    pub transactions: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaderboardPage {
    pub entries: Vec<DirectoryEntry>,
    pub page: u32,
    pub total_pages: u32,
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Registered username for `address`, if any.
    async fn username(&self, address: Address) -> Result<Option<String>>;

    async fn leaderboard(&self, page: u32) -> Result<LeaderboardPage>;

    /// Username when known, otherwise the shortened address. Never fails.
    async fn display_name(&self, address: Address) -> String {
        match self.username(address).await {
            Ok(Some(name)) => name,
            Ok(None) => short_address(&address),
            Err(e) => {
                warn!(error = %e, address = %short_address(&address), "username lookup failed");
                short_address(&address)
            }
        }
    }
}

/// Per-request budget for the identity api.
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpDirectory {
    base_url: String,
    game_id: String,
    http: reqwest::Client,
    usernames: Mutex<HashMap<Address, Option<String>>>,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>, game_id: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, game_id, DIRECTORY_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        game_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .wrap_err("failed to build HTTP client for identity api")?;
        Ok(Self {
            base_url,
            game_id: game_id.into(),
            http,
            usernames: Mutex::new(HashMap::new()),
        })
    }

    fn cached(&self, address: &Address) -> Option<Option<String>> {
        self.usernames
            .lock()
            .ok()
            .and_then(|cache| cache.get(address).cloned())
    }

    fn remember(&self, address: Address, username: Option<String>) {
        if let Ok(mut cache) = self.usernames.lock() {
            cache.insert(address, username);
        }
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn username(&self, address: Address) -> Result<Option<String>> {
        if let Some(hit) = self.cached(&address) {
            return Ok(hit);
        }
        let url = format!("{}/api/check-wallet", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("wallet", format_address(&address))])
            .send()
            .await
            .wrap_err("identity request failed")?;
        let status = res.status();
        if !status.is_success() {
            return Err(eyre!("identity api responded with {status}"));
        }
        let dto: CheckWalletDto = res
            .json()
            .await
            .wrap_err("invalid check-wallet payload")?;
        let username = dto.into_username();
        self.remember(address, username.clone());
        Ok(username)
    }

    async fn leaderboard(&self, page: u32) -> Result<LeaderboardPage> {
        let url = format!("{}/api/leaderboard", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[
                ("page", page.to_string()),
                ("gameId", self.game_id.clone()),
                ("sortBy", "transactions".to_string()),
            ])
            .send()
            .await
            .wrap_err("leaderboard request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read leaderboard response body")?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!("leaderboard api responded with {status}: {body}"));
        }
        let dto: LeaderboardDto =
            serde_json::from_slice(&bytes).wrap_err("invalid leaderboard payload")?;
        let page = LeaderboardPage::try_from(dto)?;
        for entry in &page.entries {
            if entry.username.is_some() {
                self.remember(entry.address, entry.username.clone());
            }
        }
        Ok(page)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckWalletDto {
    #[serde(default)]
    has_username: bool,
    #[serde(default)]
    user: Option<UserDto>,
}

#[derive(Deserialize)]
struct UserDto {
    #[serde(default)]
    username: Option<String>,
}

impl CheckWalletDto {
    fn into_username(self) -> Option<String> {
        if !self.has_username {
            return None;
        }
        self.user
            .and_then(|user| user.username)
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Deserialize)]
struct LeaderboardDto {
    #[serde(default)]
    data: Vec<LeaderboardRowDto>,
    #[serde(default)]
    pagination: Option<PaginationDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardRowDto {
    #[serde(alias = "walletAddress", alias = "wallet")]
    address: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, deserialize_with = "lenient_uint")]
    score: U256,
    #[serde(
        default,
        alias = "transactionCount",
        alias = "totalTransactions",
        deserialize_with = "lenient_uint"
    )]
    transactions: U256,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationDto {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

/// Accepts JSON numbers and decimal strings.
fn lenient_uint<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(U256::zero()),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| D::Error::custom(format!("not an unsigned integer: {n}"))),
        Value::String(s) => U256::from_dec_str(s.trim())
            .map_err(|_| D::Error::custom(format!("not a decimal integer: {s}"))),
        other => Err(D::Error::custom(format!("unexpected value {other}"))),
    }
}

impl TryFrom<LeaderboardDto> for LeaderboardPage {
    type Error = color_eyre::eyre::Report;

    fn try_from(dto: LeaderboardDto) -> Result<Self> {
        let entries = dto
            .data
            .into_iter()
            .map(|row| {
                let address = parse_address(&row.address)
                    .wrap_err("leaderboard row with invalid address")?;
                if row.transactions > U256::from(u64::MAX) {
                    return Err(eyre!(
                        "transaction count {} out of range for {address:?}",
                        row.transactions
                    ));
                }
                Ok(DirectoryEntry {
                    address,
                    username: row.username.filter(|name| !name.trim().is_empty()),
                    score: row.score,
                    transactions: row.transactions.as_u64(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let (page, total_pages) = dto
            .pagination
            .map(|p| (p.page, p.total_pages))
            .unwrap_or((1, 1));
        Ok(Self {
            entries,
            page,
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn check_wallet_dto__returns_username_only_when_registered() {
        let registered: CheckWalletDto = serde_json::from_str(
            r#"{"hasUsername": true, "user": {"id": 7, "username": "chogmaster"}}"#,
        )
        .unwrap();
        assert_eq!(registered.into_username(), Some("chogmaster".to_string()));

        let anonymous: CheckWalletDto =
            serde_json::from_str(r#"{"hasUsername": false, "user": null}"#).unwrap();
        assert_eq!(anonymous.into_username(), None);
    }

    #[test]
    fn leaderboard_dto__parses_rows_and_pagination() {
        // given
        let body = r#"{
            "data": [
                {"walletAddress": "0x8cDdbc30cc9E4fe404EecD254056d9736f9Dc168",
                 "username": "alice", "score": "1500000000000000000", "transactionCount": 12},
                {"walletAddress": "0x0000000000000000000000000000000000000001",
                 "username": "", "score": 0, "transactionCount": "3"}
            ],
            "pagination": {"page": 1, "totalPages": 4, "total": 40}
        }"#;

        // when
        let dto: LeaderboardDto = serde_json::from_str(body).unwrap();
        let page = LeaderboardPage::try_from(dto).unwrap();

        // then
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].username.as_deref(), Some("alice"));
        assert_eq!(page.entries[0].transactions, 12);
        assert_eq!(
            page.entries[0].score,
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(page.entries[1].username, None);
        assert_eq!(page.entries[1].transactions, 3);
    }

    #[test]
    fn leaderboard_dto__rejects_transaction_count_past_u64() {
        // given
        let body = r#"{"data": [{"address": "0x0000000000000000000000000000000000000001",
                                 "transactionCount": "18446744073709551616"}]}"#;

        // when
        let dto: LeaderboardDto = serde_json::from_str(body).unwrap();
        let result = LeaderboardPage::try_from(dto);

        // then
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn leaderboard__gives_up_on_a_silent_server() {
        // given
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let directory =
            HttpDirectory::with_timeout(format!("http://{addr}"), "jdb", Duration::from_millis(200))
                .unwrap();

        // when
        let result =
            tokio::time::timeout(Duration::from_secs(5), directory.leaderboard(1)).await;

        // then
        let inner = result.expect("request outlived its own timeout");
        assert!(inner.is_err());
    }

    #[test]
    fn leaderboard_dto__rejects_bad_addresses() {
        let dto: LeaderboardDto =
            serde_json::from_str(r#"{"data": [{"address": "nope"}]}"#).unwrap();
        assert!(LeaderboardPage::try_from(dto).is_err());
    }
}
