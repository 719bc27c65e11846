//! Wallet sessions: something that has an address and can send transactions
//! from it.

use crate::{
    Address,
    H256,
    U256,
    chain::{
        ChainError,
        RpcClient,
        TxRequest,
    },
    signing::{
        LegacyTransaction,
        address_of,
    },
    units::short_address,
};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::time;
use tracing::{
    info,
    warn,
};

/// Gas estimates are padded by 20% before signing.
const GAS_MARGIN_NUMERATOR: u64 = 12;
const GAS_MARGIN_DENOMINATOR: u64 = 10;

#[async_trait]
pub trait WalletSession: Send + Sync {
    fn address(&self) -> Address;

    fn provider_label(&self) -> String;

    async fn send_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<H256, ChainError>;
}

/// The node calls a session needs. [`RpcClient`] is the production endpoint.
#[async_trait]
pub trait SignerRpc: Send + Sync {
    fn endpoint(&self) -> String;

    async fn chain_id(&self) -> Result<u64, ChainError>;

    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn nonce(&self, address: Address) -> Result<U256, ChainError>;

    async fn gas_price(&self) -> Result<U256, ChainError>;

    async fn estimate_gas(&self, request: &TxRequest) -> Result<U256, ChainError>;

    async fn send_raw_transaction(&self, signed: &[u8]) -> Result<H256, ChainError>;

    async fn send_transaction(&self, request: &TxRequest) -> Result<H256, ChainError>;
}

#[async_trait]
impl SignerRpc for RpcClient {
    fn endpoint(&self) -> String {
        self.url().to_string()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        RpcClient::chain_id(self).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        RpcClient::accounts(self).await
    }

    async fn nonce(&self, address: Address) -> Result<U256, ChainError> {
        RpcClient::nonce(self, address).await
    }

    async fn gas_price(&self) -> Result<U256, ChainError> {
        RpcClient::gas_price(self).await
    }

    async fn estimate_gas(&self, request: &TxRequest) -> Result<U256, ChainError> {
        RpcClient::estimate_gas(self, request).await
    }

    async fn send_raw_transaction(&self, signed: &[u8]) -> Result<H256, ChainError> {
        RpcClient::send_raw_transaction(self, signed).await
    }

    async fn send_transaction(&self, request: &TxRequest) -> Result<H256, ChainError> {
        RpcClient::send_transaction(self, request).await
    }
}

pub fn padded_gas(estimate: U256) -> U256 {
    estimate.saturating_mul(U256::from(GAS_MARGIN_NUMERATOR)) / U256::from(GAS_MARGIN_DENOMINATOR)
}

/// Values quoted by the node for one outgoing transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasQuote {
    pub nonce: U256,
    pub gas_price: U256,
    pub estimate: U256,
}

pub fn assemble_transaction(request: TxRequest, quote: GasQuote, chain_id: u64) -> LegacyTransaction {
    LegacyTransaction {
        nonce: quote.nonce,
        gas_price: quote.gas_price,
        gas: padded_gas(quote.estimate),
        to: request.to,
        value: request.value,
        data: request.data,
        chain_id,
    }
}

/// Local keystore key; transactions are signed here and broadcast raw.
pub struct KeystoreSession {
    name: String,
    key: SigningKey,
    address: Address,
    rpc: Arc<dyn SignerRpc>,
    chain_id: u64,
}

impl KeystoreSession {
    pub async fn connect(
        name: impl Into<String>,
        key: SigningKey,
        rpc: Arc<dyn SignerRpc>,
        expected_chain_id: u64,
    ) -> Result<Self, ChainError> {
        let chain_id = rpc.chain_id().await?;
        if chain_id != expected_chain_id {
            warn!(
                chain_id,
                expected_chain_id, "rpc endpoint reports a different chain id"
            );
        }
        let address = address_of(&key);
        let name = name.into();
        info!(wallet = %name, address = %short_address(&address), "keystore session ready");
        Ok(Self {
            name,
            key,
            address,
            rpc,
            chain_id,
        })
    }
}

#[async_trait]
impl WalletSession for KeystoreSession {
    fn address(&self) -> Address {
        self.address
    }

    fn provider_label(&self) -> String {
        format!("keystore:{}", self.name)
    }

    async fn send_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<H256, ChainError> {
        let request = TxRequest {
            from: Some(self.address),
            to,
            data,
            value,
        };
        let (nonce, gas_price, estimate) = tokio::try_join!(
            self.rpc.nonce(self.address),
            self.rpc.gas_price(),
            self.rpc.estimate_gas(&request),
        )?;
        let quote = GasQuote {
            nonce,
            gas_price,
            estimate,
        };
        let signed = assemble_transaction(request, quote, self.chain_id)
            .sign(&self.key)
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        self.rpc.send_raw_transaction(&signed).await
    }
}

/// Remote signer speaking `eth_accounts` / `eth_sendTransaction`.
pub struct CustodialSession {
    signer: Arc<dyn SignerRpc>,
    address: Address,
}

impl CustodialSession {
    /// Wait until the signer exposes an account, retrying every `retry`.
    pub async fn connect(signer: Arc<dyn SignerRpc>, retry: Duration) -> Self {
        let endpoint = signer.endpoint();
        loop {
            match signer.accounts().await {
                Ok(accounts) => {
                    if let Some(address) = accounts.first().copied() {
                        info!(
                            signer = %endpoint,
                            address = %short_address(&address),
                            "custodial session ready"
                        );
                        return Self { signer, address };
                    }
                    info!(signer = %endpoint, "waiting for custodial signer account");
                }
                Err(e) => {
                    warn!(signer = %endpoint, error = %e, "custodial signer not ready");
                }
            }
            time::sleep(retry).await;
        }
    }
}

#[async_trait]
impl WalletSession for CustodialSession {
    fn address(&self) -> Address {
        self.address
    }

    fn provider_label(&self) -> String {
        format!("custodial:{}", self.signer.endpoint())
    }

    async fn send_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<H256, ChainError> {
        self.signer
            .send_transaction(&TxRequest {
                from: Some(self.address),
                to,
                data,
                value,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::{
        collections::VecDeque,
        sync::Mutex,
    };

    #[derive(Default)]
    struct ScriptedRpc {
        /// Replies to `eth_accounts`, oldest first; an empty script means
        /// no account yet.
        accounts: Mutex<VecDeque<Result<Vec<Address>, ChainError>>>,
        account_polls: Mutex<usize>,
        estimates: Mutex<Vec<TxRequest>>,
        raw: Mutex<Vec<Vec<u8>>>,
        relayed: Mutex<Vec<TxRequest>>,
    }

    impl ScriptedRpc {
        fn with_accounts(replies: Vec<Result<Vec<Address>, ChainError>>) -> Self {
            Self {
                accounts: Mutex::new(replies.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SignerRpc for ScriptedRpc {
        fn endpoint(&self) -> String {
            "scripted".to_string()
        }

        async fn chain_id(&self) -> Result<u64, ChainError> {
            Ok(10143)
        }

        async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
            *self.account_polls.lock().unwrap() += 1;
            self.accounts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()))
        }

        async fn nonce(&self, _address: Address) -> Result<U256, ChainError> {
            Ok(U256::from(7u64))
        }

        async fn gas_price(&self) -> Result<U256, ChainError> {
            Ok(U256::from(50_000_000_000u64))
        }

        async fn estimate_gas(&self, request: &TxRequest) -> Result<U256, ChainError> {
            self.estimates.lock().unwrap().push(request.clone());
            Ok(U256::from(100_000u64))
        }

        async fn send_raw_transaction(&self, signed: &[u8]) -> Result<H256, ChainError> {
            self.raw.lock().unwrap().push(signed.to_vec());
            Ok(H256::repeat_byte(0xab))
        }

        async fn send_transaction(&self, request: &TxRequest) -> Result<H256, ChainError> {
            self.relayed.lock().unwrap().push(request.clone());
            Ok(H256::repeat_byte(0xcd))
        }
    }

    fn key() -> SigningKey {
        SigningKey::from_slice(&[0x46; 32]).unwrap()
    }

    #[test]
    fn padded_gas__adds_twenty_percent_rounding_down() {
        assert_eq!(padded_gas(U256::from(21_000u64)), U256::from(25_200u64));
        assert_eq!(padded_gas(U256::from(7u64)), U256::from(8u64));
        assert_eq!(padded_gas(U256::zero()), U256::zero());
    }

    #[test]
    fn padded_gas__saturates_instead_of_overflowing() {
        assert_eq!(padded_gas(U256::MAX), U256::MAX / U256::from(10u64));
    }

    #[test]
    fn assemble_transaction__uses_quote_and_request() {
        // given
        let request = TxRequest {
            from: Some(Address::repeat_byte(0x01)),
            to: Address::repeat_byte(0x02),
            data: vec![0xde, 0xad],
            value: U256::from(3u64),
        };
        let quote = GasQuote {
            nonce: U256::from(9u64),
            gas_price: U256::from(1_000u64),
            estimate: U256::from(50_000u64),
        };

        // when
        let tx = assemble_transaction(request, quote, 10143);

        // then
        assert_eq!(
            tx,
            LegacyTransaction {
                nonce: U256::from(9u64),
                gas_price: U256::from(1_000u64),
                gas: U256::from(60_000u64),
                to: Address::repeat_byte(0x02),
                value: U256::from(3u64),
                data: vec![0xde, 0xad],
                chain_id: 10143,
            }
        );
    }

    #[tokio::test]
    async fn keystore_session__signs_node_quote_with_margin() {
        // given
        let rpc = Arc::new(ScriptedRpc::default());
        let session = KeystoreSession::connect("alice", key(), rpc.clone(), 10143)
            .await
            .unwrap();
        let to = Address::repeat_byte(0x33);

        // when
        let hash = session
            .send_transaction(to, vec![0x01, 0x02], U256::from(5u64))
            .await
            .unwrap();

        // then
        assert_eq!(hash, H256::repeat_byte(0xab));
        let estimates = rpc.estimates.lock().unwrap();
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].from, Some(address_of(&key())));
        let expected = LegacyTransaction {
            nonce: U256::from(7u64),
            gas_price: U256::from(50_000_000_000u64),
            gas: U256::from(120_000u64),
            to,
            value: U256::from(5u64),
            data: vec![0x01, 0x02],
            chain_id: 10143,
        }
        .sign(&key())
        .unwrap();
        assert_eq!(*rpc.raw.lock().unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn custodial_session__retries_until_an_account_appears() {
        // given
        let account = Address::repeat_byte(0x44);
        let rpc = Arc::new(ScriptedRpc::with_accounts(vec![
            Err(ChainError::Decode("signer booting".to_string())),
            Ok(Vec::new()),
            Ok(vec![account, Address::repeat_byte(0x55)]),
        ]));

        // when
        let session = CustodialSession::connect(rpc.clone(), Duration::from_millis(5)).await;

        // then
        assert_eq!(session.address(), account);
        assert_eq!(*rpc.account_polls.lock().unwrap(), 3);
        assert_eq!(session.provider_label(), "custodial:scripted");
    }

    #[tokio::test]
    async fn custodial_session__relays_request_from_its_account() {
        // given
        let account = Address::repeat_byte(0x44);
        let rpc = Arc::new(ScriptedRpc::with_accounts(vec![Ok(vec![account])]));
        let session = CustodialSession::connect(rpc.clone(), Duration::from_millis(5)).await;

        // when
        let hash = session
            .send_transaction(Address::repeat_byte(0x66), Vec::new(), U256::from(9u64))
            .await
            .unwrap();

        // then
        assert_eq!(hash, H256::repeat_byte(0xcd));
        assert_eq!(
            *rpc.relayed.lock().unwrap(),
            vec![TxRequest {
                from: Some(account),
                to: Address::repeat_byte(0x66),
                data: Vec::new(),
                value: U256::from(9u64),
            }]
        );
    }
}
