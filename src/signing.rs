//! Legacy (EIP-155) transaction signing for keystore wallets.

use crate::{
    Address,
    U256,
    abi::keccak256,
    units::u256_to_be_bytes,
};
use k256::{
    ecdsa::SigningKey,
    elliptic_curve::sec1::ToEncodedPoint,
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("signing failed: {0}")]
pub struct SigningError(#[from] k256::ecdsa::Error);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: U256,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp_uint(&self.nonce),
            rlp_uint(&self.gas_price),
            rlp_uint(&self.gas),
            rlp_bytes(self.to.as_bytes()),
            rlp_uint(&self.value),
            rlp_bytes(&self.data),
        ]
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        let mut fields = self.base_fields();
        fields.push(rlp_uint(&U256::from(self.chain_id)));
        fields.push(rlp_uint(&U256::zero()));
        fields.push(rlp_uint(&U256::zero()));
        keccak256(&rlp_list(&fields))
    }

    /// Signed RLP payload ready for `eth_sendRawTransaction`.
    pub fn sign(&self, key: &SigningKey) -> Result<Vec<u8>, SigningError> {
        let (signature, recovery) = key.sign_prehash_recoverable(&self.signing_hash())?;
        let bytes = signature.to_bytes();
        let v = u64::from(recovery.to_byte()) + 35 + self.chain_id * 2;

        let mut fields = self.base_fields();
        fields.push(rlp_uint(&U256::from(v)));
        fields.push(rlp_uint(&U256::from_big_endian(&bytes[..32])));
        fields.push(rlp_uint(&U256::from_big_endian(&bytes[32..])));
        Ok(rlp_list(&fields))
    }
}

pub fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn rlp_length_prefix(out: &mut Vec<u8>, len: usize, short_base: u8, long_base: u8) {
    if len < 56 {
        out.push(short_base + len as u8);
    } else {
        let len_bytes = len.to_be_bytes();
        let skip = len_bytes.iter().take_while(|b| **b == 0).count();
        out.push(long_base + (len_bytes.len() - skip) as u8);
        out.extend_from_slice(&len_bytes[skip..]);
    }
}

fn rlp_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return bytes.to_vec();
    }
    let mut out = Vec::with_capacity(bytes.len() + 9);
    rlp_length_prefix(&mut out, bytes.len(), 0x80, 0xb7);
    out.extend_from_slice(bytes);
    out
}

fn rlp_uint(value: &U256) -> Vec<u8> {
    let word = u256_to_be_bytes(value);
    let skip = word.iter().take_while(|b| **b == 0).count();
    rlp_bytes(&word[skip..])
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(payload_len + 9);
    rlp_length_prefix(&mut out, payload_len, 0xc0, 0xf7);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::units::{
        format_address,
        one_ether,
    };

    fn vector_tx() -> LegacyTransaction {
        LegacyTransaction {
            nonce: U256::from(9u64),
            gas_price: U256::from(20_000_000_000u64),
            gas: U256::from(21_000u64),
            to: Address::repeat_byte(0x35),
            value: one_ether(),
            data: Vec::new(),
            chain_id: 1,
        }
    }

    fn vector_key() -> SigningKey {
        SigningKey::from_slice(&[0x46; 32]).unwrap()
    }

    #[test]
    fn rlp__encodes_short_and_long_strings() {
        assert_eq!(rlp_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(rlp_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(rlp_uint(&U256::zero()), vec![0x80]);
        let long = vec![0xaa; 60];
        let encoded = rlp_bytes(&long);
        assert_eq!(&encoded[..2], &[0xb8, 60]);
        assert_eq!(encoded.len(), 62);
    }

    #[test]
    fn signing_hash__matches_eip155_example() {
        assert_eq!(
            hex::encode(vector_tx().signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn sign__produces_eip155_example_transaction() {
        // given
        let tx = vector_tx();
        let key = vector_key();

        // when
        let signed = tx.sign(&key).unwrap();

        // then
        assert_eq!(
            hex::encode(signed),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn address_of__derives_checksum_free_address() {
        assert_eq!(
            format_address(&address_of(&vector_key())),
            "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
        );
    }
}
