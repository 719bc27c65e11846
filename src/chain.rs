//! JSON-RPC access to the chain and typed reads against the game contracts.

use crate::{
    Address,
    H256,
    U256,
    abi::{
        AbiError,
        decode_revert_reason,
    },
    contract::{
        DrawRecord,
        GameStatus,
        PlayerBets,
        PlayerStanding,
        calls,
        decode,
    },
    units::{
        format_address,
        parse_quantity,
        to_quantity,
    },
};
use async_trait::async_trait;
use color_eyre::eyre;
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use std::{
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};
use thiserror::Error;
use tokio::time;
use tracing::debug;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;
const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("wallet not ready")]
    WalletNotReady,
    #[error("request rejected by the user")]
    UserRejected,
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<AbiError> for ChainError {
    fn from(err: AbiError) -> Self {
        ChainError::Decode(err.to_string())
    }
}

impl ChainError {
    /// Classify a JSON-RPC error object.
    pub fn from_rpc(code: i64, message: String, data: Option<String>) -> Self {
        if code == USER_REJECTED_CODE {
            return ChainError::UserRejected;
        }
        let reason = data
            .as_deref()
            .and_then(|raw| hex::decode(raw.trim_start_matches("0x")).ok())
            .and_then(|bytes| decode_revert_reason(&bytes));
        if let Some(reason) = reason {
            return ChainError::Reverted { reason };
        }
        if code == EXECUTION_REVERTED_CODE || message.contains("execution reverted") {
            return ChainError::Reverted { reason: message };
        }
        ChainError::Rpc {
            code,
            message,
            data,
        }
    }
}

/// True when any error in the report's chain is a declined signature.
pub fn is_user_rejection(report: &eyre::Report) -> bool {
    report.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ChainError>(),
            Some(ChainError::UserRejected)
        )
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

impl TxRequest {
    fn to_json(&self) -> Value {
        let mut object = json!({
            "to": format_address(&self.to),
            "data": format!("0x{}", hex::encode(&self.data)),
            "value": to_quantity(&self.value),
        });
        if let (Some(from), Some(map)) = (self.from, object.as_object_mut()) {
            map.insert("from".to_string(), Value::String(format_address(&from)));
        }
        object
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub success: bool,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcErrorBody> for ChainError {
    fn from(body: RpcErrorBody) -> Self {
        let data = body.data.map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        });
        ChainError::from_rpc(body.code, body.message, data)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptDto {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl TryFrom<ReceiptDto> for Receipt {
    type Error = ChainError;

    fn try_from(dto: ReceiptDto) -> Result<Self, Self::Error> {
        let block_number = dto
            .block_number
            .as_deref()
            .map(parse_u256)
            .transpose()?
            .map(|n| n.low_u64());
        // Pre-byzantium receipts carry no status.
        let success = match dto.status.as_deref() {
            Some(status) => !parse_u256(status)?.is_zero(),
            None => true,
        };
        Ok(Receipt {
            transaction_hash: parse_h256(&dto.transaction_hash)?,
            block_number,
            success,
        })
    }
}

fn parse_u256(raw: &str) -> Result<U256, ChainError> {
    parse_quantity(raw).map_err(|e| ChainError::Decode(e.to_string()))
}

pub fn parse_h256(raw: &str) -> Result<H256, ChainError> {
    let bytes = parse_hex_bytes(raw)?;
    if bytes.len() != 32 {
        return Err(ChainError::Decode(format!("expected 32 byte hash, got '{raw}'")));
    }
    Ok(H256::from_slice(&bytes))
}

pub fn parse_hex_bytes(raw: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| ChainError::Decode(format!("invalid hex '{raw}': {e}")))
}

/// HTTP JSON-RPC client.
#[derive(Clone)]
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");
        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(error.into());
        }
        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))
    }

    pub async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let request = TxRequest {
            from: None,
            to,
            data,
            value: U256::zero(),
        };
        let raw: String = self
            .request("eth_call", json!([request.to_json(), "latest"]))
            .await?;
        parse_hex_bytes(&raw)
    }

    pub async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        let raw: String = self
            .request(
                "eth_getBalance",
                json!([format_address(&address), "latest"]),
            )
            .await?;
        parse_u256(&raw)
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        Ok(parse_u256(&raw)?.low_u64())
    }

    pub async fn nonce(&self, address: Address) -> Result<U256, ChainError> {
        let raw: String = self
            .request(
                "eth_getTransactionCount",
                json!([format_address(&address), "pending"]),
            )
            .await?;
        parse_u256(&raw)
    }

    pub async fn gas_price(&self) -> Result<U256, ChainError> {
        let raw: String = self.request("eth_gasPrice", json!([])).await?;
        parse_u256(&raw)
    }

    pub async fn estimate_gas(&self, tx: &TxRequest) -> Result<U256, ChainError> {
        let raw: String = self
            .request("eth_estimateGas", json!([tx.to_json()]))
            .await?;
        parse_u256(&raw)
    }

    pub async fn send_raw_transaction(&self, signed: &[u8]) -> Result<H256, ChainError> {
        let raw: String = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(signed))]),
            )
            .await?;
        parse_h256(&raw)
    }

    /// Ask a remote signer to sign and broadcast.
    pub async fn send_transaction(&self, tx: &TxRequest) -> Result<H256, ChainError> {
        let raw: String = self
            .request("eth_sendTransaction", json!([tx.to_json()]))
            .await?;
        parse_h256(&raw)
    }

    pub async fn receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError> {
        let dto: Option<ReceiptDto> = self
            .request(
                "eth_getTransactionReceipt",
                json!([format!("0x{}", hex::encode(hash.as_bytes()))]),
            )
            .await?;
        dto.map(Receipt::try_from).transpose()
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        let raw: Vec<String> = self.request("eth_accounts", json!([])).await?;
        raw.iter()
            .map(|entry| {
                crate::units::parse_address(entry)
                    .map_err(|e| ChainError::Decode(e.to_string()))
            })
            .collect()
    }
}

/// Every read the client performs against the game and leaderboard contracts.
#[async_trait]
pub trait GameReads: Send + Sync {
    async fn full_status(&self) -> Result<GameStatus, ChainError>;
    async fn draw_history(&self) -> Result<Vec<DrawRecord>, ChainError>;
    async fn bet_price(&self) -> Result<U256, ChainError>;
    async fn is_admin(&self, player: Address) -> Result<bool, ChainError>;
    async fn pending_withdrawal(&self, player: Address) -> Result<U256, ChainError>;
    async fn player_bets(&self, player: Address) -> Result<PlayerBets, ChainError>;
    /// Numbers and animals already bet by `player` in `round_id`.
    async fn round_bet_counts(
        &self,
        round_id: U256,
        player: Address,
    ) -> Result<(u64, u64), ChainError>;
    async fn balance(&self, player: Address) -> Result<U256, ChainError>;
    async fn all_time_players(&self) -> Result<Vec<Address>, ChainError>;
    async fn player_standing(&self, player: Address) -> Result<PlayerStanding, ChainError>;
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError>;
}

#[derive(Clone)]
pub struct RaffleReader {
    rpc: RpcClient,
    game: Address,
    leaderboard: Address,
}

impl RaffleReader {
    pub fn new(rpc: RpcClient, game: Address, leaderboard: Address) -> Self {
        Self {
            rpc,
            game,
            leaderboard,
        }
    }

    async fn call_game(&self, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        self.rpc.call(self.game, data).await
    }
}

#[async_trait]
impl GameReads for RaffleReader {
    async fn full_status(&self) -> Result<GameStatus, ChainError> {
        let raw = self.call_game(calls::full_status()).await?;
        Ok(decode::full_status(&raw)?)
    }

    async fn draw_history(&self) -> Result<Vec<DrawRecord>, ChainError> {
        let raw = self.call_game(calls::draw_history()).await?;
        Ok(decode::draw_history(&raw)?)
    }

    async fn bet_price(&self) -> Result<U256, ChainError> {
        let raw = self.call_game(calls::bet_price()).await?;
        Ok(decode::uint(&raw)?)
    }

    async fn is_admin(&self, player: Address) -> Result<bool, ChainError> {
        let raw = self.call_game(calls::admins(player)).await?;
        Ok(decode::boolean(&raw)?)
    }

    async fn pending_withdrawal(&self, player: Address) -> Result<U256, ChainError> {
        let raw = self.call_game(calls::pending_withdrawals(player)).await?;
        Ok(decode::uint(&raw)?)
    }

    async fn player_bets(&self, player: Address) -> Result<PlayerBets, ChainError> {
        let raw = self.call_game(calls::player_bets(player)).await?;
        Ok(decode::player_bets(&raw)?)
    }

    async fn round_bet_counts(
        &self,
        round_id: U256,
        player: Address,
    ) -> Result<(u64, u64), ChainError> {
        let (numbers, animals) = tokio::try_join!(
            self.call_game(calls::number_bets_in_round(round_id, player)),
            self.call_game(calls::animal_bets_in_round(round_id, player)),
        )?;
        Ok((decode::count(&numbers)?, decode::count(&animals)?))
    }

    async fn balance(&self, player: Address) -> Result<U256, ChainError> {
        self.rpc.balance(player).await
    }

    async fn all_time_players(&self) -> Result<Vec<Address>, ChainError> {
        let raw = self.call_game(calls::all_time_players()).await?;
        Ok(decode::addresses(&raw)?)
    }

    async fn player_standing(&self, player: Address) -> Result<PlayerStanding, ChainError> {
        let raw = self
            .rpc
            .call(self.leaderboard, calls::player_data_per_game(self.game, player))
            .await?;
        Ok(decode::player_standing(&raw)?)
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError> {
        self.rpc.receipt(hash).await
    }
}

/// Poll for a receipt until the transaction is mined. There is no timeout.
pub async fn await_confirmation(
    reads: &dyn GameReads,
    hash: H256,
    poll: Duration,
) -> Result<Receipt, ChainError> {
    loop {
        if let Some(receipt) = reads.transaction_receipt(hash).await? {
            if !receipt.success {
                return Err(ChainError::Reverted {
                    reason: format!("transaction {hash:?} reverted"),
                });
            }
            return Ok(receipt);
        }
        time::sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::abi::{
        Token,
        encode,
    };

    #[test]
    fn from_rpc__maps_4001_to_user_rejection() {
        let err = ChainError::from_rpc(4001, "User denied".to_string(), None);
        assert!(matches!(err, ChainError::UserRejected));
    }

    #[test]
    fn from_rpc__decodes_revert_reason_from_data() {
        // given
        let mut payload = vec![0x08, 0xc3, 0x79, 0xa0];
        payload.extend(encode(&[Token::String("Game is paused".to_string())]));
        let data = format!("0x{}", hex::encode(payload));

        // when
        let err = ChainError::from_rpc(3, "execution reverted".to_string(), Some(data));

        // then
        match err {
            ChainError::Reverted { reason } => assert_eq!(reason, "Game is paused"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn from_rpc__keeps_other_errors_as_rpc() {
        let err = ChainError::from_rpc(-32000, "nonce too low".to_string(), None);
        assert!(matches!(err, ChainError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn is_user_rejection__looks_through_wrapped_reports() {
        use color_eyre::eyre::WrapErr;
        let wrapped: eyre::Result<()> =
            Err(ChainError::UserRejected).wrap_err("placing bets failed");
        let wrapped = wrapped.unwrap_err();
        assert!(is_user_rejection(&wrapped));

        let other = eyre::Report::new(ChainError::WalletNotReady);
        assert!(!is_user_rejection(&other));
    }

    #[test]
    fn receipt_dto__reads_status_flag() {
        let dto: ReceiptDto = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0"
        }))
        .unwrap();
        let receipt = Receipt::try_from(dto).unwrap();
        assert_eq!(receipt.block_number, Some(16));
        assert!(!receipt.success);
    }

    #[test]
    fn tx_request__serialises_optional_sender() {
        let tx = TxRequest {
            from: Some(Address::repeat_byte(0x01)),
            to: Address::repeat_byte(0x02),
            data: vec![0xde, 0xad],
            value: U256::from(16u64),
        };
        let value = tx.to_json();
        assert_eq!(value["data"], "0xdead");
        assert_eq!(value["value"], "0x10");
        assert_eq!(value["from"], format_address(&Address::repeat_byte(0x01)));
    }
}
