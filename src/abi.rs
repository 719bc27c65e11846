//! Minimal Solidity ABI codec covering the types the raffle contracts use.

use crate::{
    Address,
    H256,
    U256,
    units::u256_to_be_bytes,
};
use sha3::{
    Digest,
    Keccak256,
};
use thiserror::Error;

const WORD: usize = 32;
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("payload too short: needed {needed} bytes at offset {offset}")]
    OutOfBounds { offset: usize, needed: usize },
    #[error("offset or length does not fit in memory")]
    OffsetOverflow,
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    #[error("expected {expected}, found {found:?}")]
    UnexpectedToken { expected: &'static str, found: Token },
    #[error("value does not fit in {0}")]
    ValueOverflow(&'static str),
    #[error("missing {0}")]
    MissingField(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    Address(Address),
    Bool(bool),
    FixedBytes(H256),
    String(String),
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Uint,
    Address,
    Bool,
    Bytes32,
    String,
    Array(Box<ParamType>),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    pub fn array(inner: ParamType) -> Self {
        ParamType::Array(Box::new(inner))
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Array(_) => true,
            ParamType::Tuple(items) => items.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            ParamType::Tuple(items) if !self.is_dynamic() => {
                items.iter().map(ParamType::head_size).sum()
            }
            _ => WORD,
        }
    }
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            Token::Tuple(items) if !self.is_dynamic() => {
                items.iter().map(Token::head_size).sum()
            }
            _ => WORD,
        }
    }

    pub fn into_uint(self) -> Result<U256, AbiError> {
        match self {
            Token::Uint(value) => Ok(value),
            found => Err(AbiError::UnexpectedToken {
                expected: "uint",
                found,
            }),
        }
    }

    pub fn into_u64(self) -> Result<u64, AbiError> {
        let value = self.into_uint()?;
        if value > U256::from(u64::MAX) {
            return Err(AbiError::ValueOverflow("u64"));
        }
        Ok(value.low_u64())
    }

    pub fn into_u8(self) -> Result<u8, AbiError> {
        let value = self.into_u64()?;
        u8::try_from(value).map_err(|_| AbiError::ValueOverflow("u8"))
    }

    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Token::Address(address) => Ok(address),
            found => Err(AbiError::UnexpectedToken {
                expected: "address",
                found,
            }),
        }
    }

    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Token::Bool(value) => Ok(value),
            found => Err(AbiError::UnexpectedToken {
                expected: "bool",
                found,
            }),
        }
    }

    pub fn into_fixed_bytes(self) -> Result<H256, AbiError> {
        match self {
            Token::FixedBytes(value) => Ok(value),
            found => Err(AbiError::UnexpectedToken {
                expected: "bytes32",
                found,
            }),
        }
    }

    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Token::String(value) => Ok(value),
            found => Err(AbiError::UnexpectedToken {
                expected: "string",
                found,
            }),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::Array(items) => Ok(items),
            found => Err(AbiError::UnexpectedToken {
                expected: "array",
                found,
            }),
        }
    }

    pub fn into_tuple(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::Tuple(items) => Ok(items),
            found => Err(AbiError::UnexpectedToken {
                expected: "tuple",
                found,
            }),
        }
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn event_topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    out
}

/// Encode `tokens` as the components of a single tuple.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_size).sum();
    let mut heads = Vec::with_capacity(head_len);
    let mut tails = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            heads.extend(uint_word(&U256::from(head_len + tails.len())));
            tails.extend(encode_token(token));
        } else {
            heads.extend(encode_token(token));
        }
    }
    heads.extend(tails);
    heads
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(value) => uint_word(value).to_vec(),
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word.to_vec()
        }
        Token::Bool(value) => uint_word(&U256::from(u8::from(*value))).to_vec(),
        Token::FixedBytes(value) => value.as_bytes().to_vec(),
        Token::String(value) => {
            let bytes = value.as_bytes();
            let mut out = uint_word(&U256::from(bytes.len())).to_vec();
            out.extend_from_slice(bytes);
            let padding = (WORD - bytes.len() % WORD) % WORD;
            out.extend(std::iter::repeat_n(0u8, padding));
            out
        }
        Token::Array(items) => {
            let mut out = uint_word(&U256::from(items.len())).to_vec();
            out.extend(encode(items));
            out
        }
        Token::Tuple(items) => encode(items),
    }
}

fn uint_word(value: &U256) -> [u8; WORD] {
    u256_to_be_bytes(value)
}

pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_tuple(types, data, 0)
}

/// Decode the `Error(string)` revert payload, if that is what `data` holds.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    decode(&[ParamType::String], body)
        .ok()?
        .pop()?
        .into_string()
        .ok()
}

fn decode_tuple(
    types: &[ParamType],
    data: &[u8],
    base: usize,
) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;
    for ty in types {
        if ty.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            let at = base.checked_add(offset).ok_or(AbiError::OffsetOverflow)?;
            tokens.push(decode_value(ty, data, at)?);
            cursor += WORD;
        } else {
            tokens.push(decode_value(ty, data, cursor)?);
            cursor += ty.head_size();
        }
    }
    Ok(tokens)
}

fn decode_value(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match ty {
        ParamType::Uint => Ok(Token::Uint(U256::from_big_endian(read_word(data, at)?))),
        ParamType::Address => {
            let word = read_word(data, at)?;
            Ok(Token::Address(Address::from_slice(&word[12..])))
        }
        ParamType::Bool => {
            let word = read_word(data, at)?;
            Ok(Token::Bool(word.iter().any(|b| *b != 0)))
        }
        ParamType::Bytes32 => Ok(Token::FixedBytes(H256::from_slice(read_word(data, at)?))),
        ParamType::String => {
            let len = read_usize(data, at)?;
            let start = at + WORD;
            let bytes = read_slice(data, start, len)?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|_| AbiError::InvalidUtf8)
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let start = at + WORD;
            // every element occupies at least one word of head space
            let remaining = data.len().saturating_sub(start) / WORD;
            if len > remaining {
                return Err(AbiError::OutOfBounds {
                    offset: start,
                    needed: len.saturating_mul(WORD),
                });
            }
            let types = vec![(**inner).clone(); len];
            decode_tuple(&types, data, start).map(Token::Array)
        }
        ParamType::Tuple(items) => decode_tuple(items, data, at).map(Token::Tuple),
    }
}

fn read_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(len).ok_or(AbiError::OffsetOverflow)?;
    data.get(offset..end).ok_or(AbiError::OutOfBounds {
        offset,
        needed: len,
    })
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    read_slice(data, offset, WORD)
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let word = read_word(data, offset)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::OffsetOverflow);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|_| AbiError::OffsetOverflow)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn word_hex(data: &[u8], index: usize) -> String {
        hex::encode(&data[index * WORD..(index + 1) * WORD])
    }

    #[test]
    fn selector__matches_known_signatures() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("Error(string)")), "08c379a0");
    }

    #[test]
    fn encode__places_dynamic_arrays_in_the_tail() {
        // given
        let numbers = Token::Array(vec![
            Token::Uint(U256::from(7u64)),
            Token::Uint(U256::from(42u64)),
        ]);
        let animals = Token::Array(vec![Token::String("Chog".to_string())]);

        // when
        let encoded = encode(&[numbers.clone(), animals.clone()]);

        // then
        assert_eq!(word_hex(&encoded, 0), format!("{:064x}", 0x40));
        assert_eq!(word_hex(&encoded, 1), format!("{:064x}", 0xa0));
        assert_eq!(word_hex(&encoded, 2), format!("{:064x}", 2));
        assert_eq!(word_hex(&encoded, 3), format!("{:064x}", 7));
        assert_eq!(word_hex(&encoded, 4), format!("{:064x}", 42));
        assert_eq!(word_hex(&encoded, 5), format!("{:064x}", 1));
        assert_eq!(word_hex(&encoded, 6), format!("{:064x}", 0x20));
        assert_eq!(word_hex(&encoded, 7), format!("{:064x}", 4));
        assert!(word_hex(&encoded, 8).starts_with(&hex::encode("Chog")));
        assert_eq!(encoded.len(), 9 * WORD);

        let decoded = decode(
            &[
                ParamType::array(ParamType::Uint),
                ParamType::array(ParamType::String),
            ],
            &encoded,
        )
        .unwrap();
        assert_eq!(decoded, vec![numbers, animals]);
    }

    #[test]
    fn decode__handles_arrays_of_dynamic_tuples() {
        // given
        let record = |id: u64, label: &str| {
            Token::Tuple(vec![
                Token::Uint(U256::from(id)),
                Token::String(label.to_string()),
                Token::Array(vec![Token::Tuple(vec![
                    Token::Address(Address::repeat_byte(id as u8)),
                    Token::Uint(U256::from(id * 10)),
                ])]),
            ])
        };
        let tokens = vec![Token::Array(vec![record(1, "Honk"), record(2, "Moxy")])];
        let encoded = encode(&tokens);
        let schema = ParamType::Tuple(vec![
            ParamType::Uint,
            ParamType::String,
            ParamType::array(ParamType::Tuple(vec![ParamType::Address, ParamType::Uint])),
        ]);

        // when
        let decoded = decode(&[ParamType::array(schema)], &encoded).unwrap();

        // then
        assert_eq!(decoded, tokens);
    }

    #[test]
    fn decode__rejects_truncated_payloads() {
        let encoded = encode(&[Token::String("Spidermon".to_string())]);
        let result = decode(&[ParamType::String], &encoded[..WORD + 4]);
        assert!(matches!(result, Err(AbiError::OutOfBounds { .. })));
    }

    #[test]
    fn decode__rejects_absurd_array_lengths() {
        let mut encoded = uint_word(&U256::from(WORD)).to_vec();
        encoded.extend(uint_word(&U256::from(u32::MAX)));
        let result = decode(&[ParamType::array(ParamType::Uint)], &encoded);
        assert!(matches!(result, Err(AbiError::OutOfBounds { .. })));
    }

    #[test]
    fn decode_revert_reason__reads_error_string_payloads() {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(encode(&[Token::String("Game is paused".to_string())]));
        assert_eq!(decode_revert_reason(&data), Some("Game is paused".to_string()));
        assert_eq!(decode_revert_reason(&[0xde, 0xad, 0xbe, 0xef]), None);
    }
}
