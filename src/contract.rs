//! Typed views over the game and leaderboard contracts.
//!
//! Calldata builders and return decoders live side by side so every call the
//! client makes is spelled out once.

use crate::{
    Address,
    H256,
    U256,
    abi::{
        self,
        AbiError,
        ParamType,
        Token,
    },
};

pub mod signatures {
    pub const GET_FULL_STATUS: &str = "getFullStatus()";
    pub const GET_DRAW_HISTORY: &str = "getDrawHistory()";
    pub const BET_PRICE: &str = "betPrice()";
    pub const ADMINS: &str = "admins(address)";
    pub const PENDING_WITHDRAWALS: &str = "pendingWithdrawals(address)";
    pub const GET_PLAYER_BETS: &str = "getPlayerBets(address)";
    pub const NUMBER_BETS_IN_ROUND: &str = "numberBetsPerPlayerInRound(uint256,address)";
    pub const ANIMAL_BETS_IN_ROUND: &str = "animalBetsPerPlayerInRound(uint256,address)";
    pub const GET_ALL_TIME_PLAYERS: &str = "getAllTimePlayers()";
    pub const PLACE_BETS: &str = "placeBets(uint8[],string[])";
    pub const WITHDRAW_PRIZE: &str = "withdrawPrize()";
    pub const PLAYER_DATA_PER_GAME: &str = "playerDataPerGame(address,address)";

    pub const BETS_PLACED_EVENT: &str = "BetsPlaced(address,uint256)";
    pub const PLAYER_DATA_UPDATED_EVENT: &str =
        "PlayerDataUpdated(address,address,uint256,uint256)";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameStatus {
    pub round_id: U256,
    pub current_pot: U256,
    pub bonus_pot: U256,
    pub bet_price: U256,
    pub paused: bool,
    pub max_number_bets: u64,
    pub max_animal_bets: u64,
    pub number_percentage: u64,
    pub animal_percentage: u64,
    pub draw_in_progress: bool,
}

impl GameStatus {
    pub fn total_pot(&self) -> U256 {
        self.current_pot.saturating_add(self.bonus_pot)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Winner {
    pub player: Address,
    pub amount_won: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedBet {
    pub player: Address,
    pub numbers: Vec<u8>,
    pub animals: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub id: u64,
    pub timestamp: u64,
    pub winning_number: u8,
    pub winning_animal: String,
    pub total_pot: U256,
    pub number_winners: Vec<Winner>,
    pub animal_winners: Vec<Winner>,
    pub random_value: H256,
    pub bets: Vec<PlacedBet>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerBets {
    pub numbers: Vec<u8>,
    pub animals: Vec<String>,
}

impl PlayerBets {
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty() && self.animals.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStanding {
    pub score: U256,
    pub transactions: u64,
}

/// Raw log as delivered by `eth_subscribe` or `eth_getLogs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    BetsPlaced { player: Address, total_bets: u64 },
    PlayerDataUpdated {
        player: Address,
        score: U256,
        transactions: u64,
    },
}

pub fn bets_placed_topic() -> H256 {
    abi::event_topic(signatures::BETS_PLACED_EVENT)
}

pub fn player_data_updated_topic() -> H256 {
    abi::event_topic(signatures::PLAYER_DATA_UPDATED_EVENT)
}

pub fn address_topic(address: &Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256::from(word)
}

fn topic_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}

/// Interpret a log emitted by the game contract or by the leaderboard contract
/// on behalf of `game`. Anything else is ignored.
pub fn decode_log(
    game: &Address,
    leaderboard: &Address,
    log: &LogEntry,
) -> Option<ChainEvent> {
    let signature = log.topics.first()?;
    if log.address == *game && *signature == bets_placed_topic() {
        let player = topic_address(log.topics.get(1)?);
        let total_bets = abi::decode(&[ParamType::Uint], &log.data)
            .ok()?
            .pop()?
            .into_u64()
            .ok()?;
        return Some(ChainEvent::BetsPlaced { player, total_bets });
    }
    if log.address == *leaderboard && *signature == player_data_updated_topic() {
        if topic_address(log.topics.get(1)?) != *game {
            return None;
        }
        let player = topic_address(log.topics.get(2)?);
        let mut values =
            abi::decode(&[ParamType::Uint, ParamType::Uint], &log.data).ok()?;
        let transactions = values.pop()?.into_u64().ok()?;
        let score = values.pop()?.into_uint().ok()?;
        return Some(ChainEvent::PlayerDataUpdated {
            player,
            score,
            transactions,
        });
    }
    None
}

pub mod calls {
    use super::*;

    pub fn full_status() -> Vec<u8> {
        abi::encode_call(signatures::GET_FULL_STATUS, &[])
    }

    pub fn draw_history() -> Vec<u8> {
        abi::encode_call(signatures::GET_DRAW_HISTORY, &[])
    }

    pub fn bet_price() -> Vec<u8> {
        abi::encode_call(signatures::BET_PRICE, &[])
    }

    pub fn admins(player: Address) -> Vec<u8> {
        abi::encode_call(signatures::ADMINS, &[Token::Address(player)])
    }

    pub fn pending_withdrawals(player: Address) -> Vec<u8> {
        abi::encode_call(signatures::PENDING_WITHDRAWALS, &[Token::Address(player)])
    }

    pub fn player_bets(player: Address) -> Vec<u8> {
        abi::encode_call(signatures::GET_PLAYER_BETS, &[Token::Address(player)])
    }

    pub fn number_bets_in_round(round_id: U256, player: Address) -> Vec<u8> {
        abi::encode_call(
            signatures::NUMBER_BETS_IN_ROUND,
            &[Token::Uint(round_id), Token::Address(player)],
        )
    }

    pub fn animal_bets_in_round(round_id: U256, player: Address) -> Vec<u8> {
        abi::encode_call(
            signatures::ANIMAL_BETS_IN_ROUND,
            &[Token::Uint(round_id), Token::Address(player)],
        )
    }

    pub fn all_time_players() -> Vec<u8> {
        abi::encode_call(signatures::GET_ALL_TIME_PLAYERS, &[])
    }

    pub fn player_data_per_game(game: Address, player: Address) -> Vec<u8> {
        abi::encode_call(
            signatures::PLAYER_DATA_PER_GAME,
            &[Token::Address(game), Token::Address(player)],
        )
    }

    pub fn place_bets(numbers: &[u8], animals: &[&str]) -> Vec<u8> {
        let numbers = numbers
            .iter()
            .map(|n| Token::Uint(U256::from(*n)))
            .collect();
        let animals = animals
            .iter()
            .map(|a| Token::String((*a).to_string()))
            .collect();
        abi::encode_call(
            signatures::PLACE_BETS,
            &[Token::Array(numbers), Token::Array(animals)],
        )
    }

    pub fn withdraw_prize() -> Vec<u8> {
        abi::encode_call(signatures::WITHDRAW_PRIZE, &[])
    }
}

pub mod decode {
    use super::*;

    fn winner_type() -> ParamType {
        ParamType::Tuple(vec![ParamType::Address, ParamType::Uint])
    }

    fn bet_type() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::array(ParamType::Uint),
            ParamType::array(ParamType::String),
        ])
    }

    pub fn draw_type() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Uint,
            ParamType::Uint,
            ParamType::Uint,
            ParamType::String,
            ParamType::Uint,
            ParamType::array(winner_type()),
            ParamType::array(winner_type()),
            ParamType::Bytes32,
            ParamType::array(bet_type()),
        ])
    }

    fn single(ty: ParamType, data: &[u8]) -> Result<Token, AbiError> {
        abi::decode(&[ty], data)?.pop().ok_or(AbiError::OutOfBounds {
            offset: 0,
            needed: 32,
        })
    }

    pub fn uint(data: &[u8]) -> Result<U256, AbiError> {
        single(ParamType::Uint, data)?.into_uint()
    }

    pub fn boolean(data: &[u8]) -> Result<bool, AbiError> {
        single(ParamType::Bool, data)?.into_bool()
    }

    pub fn count(data: &[u8]) -> Result<u64, AbiError> {
        single(ParamType::Uint, data)?.into_u64()
    }

    pub fn addresses(data: &[u8]) -> Result<Vec<Address>, AbiError> {
        single(ParamType::array(ParamType::Address), data)?
            .into_array()?
            .into_iter()
            .map(Token::into_address)
            .collect()
    }

    pub fn full_status(data: &[u8]) -> Result<GameStatus, AbiError> {
        use ParamType::{
            Bool,
            Uint,
        };
        let mut values = abi::decode(
            &[Uint, Uint, Uint, Uint, Bool, Uint, Uint, Uint, Uint, Bool],
            data,
        )?
        .into_iter();
        let mut next = || {
            values.next().ok_or(AbiError::OutOfBounds {
                offset: data.len(),
                needed: 32,
            })
        };
        Ok(GameStatus {
            round_id: next()?.into_uint()?,
            current_pot: next()?.into_uint()?,
            bonus_pot: next()?.into_uint()?,
            bet_price: next()?.into_uint()?,
            paused: next()?.into_bool()?,
            max_number_bets: next()?.into_u64()?,
            max_animal_bets: next()?.into_u64()?,
            number_percentage: next()?.into_u64()?,
            animal_percentage: next()?.into_u64()?,
            draw_in_progress: next()?.into_bool()?,
        })
    }

    pub fn player_bets(data: &[u8]) -> Result<PlayerBets, AbiError> {
        let mut values = abi::decode(
            &[
                ParamType::array(ParamType::Uint),
                ParamType::array(ParamType::String),
            ],
            data,
        )?;
        let animals = strings(required(values.pop(), "bet animals")?)?;
        let numbers = small_numbers(required(values.pop(), "bet numbers")?)?;
        Ok(PlayerBets { numbers, animals })
    }

    pub fn player_standing(data: &[u8]) -> Result<PlayerStanding, AbiError> {
        let mut values = abi::decode(&[ParamType::Uint, ParamType::Uint], data)?;
        let transactions = required(values.pop(), "transaction count")?.into_u64()?;
        let score = required(values.pop(), "score")?.into_uint()?;
        Ok(PlayerStanding {
            score,
            transactions,
        })
    }

    pub fn draw_history(data: &[u8]) -> Result<Vec<DrawRecord>, AbiError> {
        single(ParamType::array(draw_type()), data)?
            .into_array()?
            .into_iter()
            .map(draw_record)
            .collect()
    }

    fn draw_record(token: Token) -> Result<DrawRecord, AbiError> {
        let mut fields = token.into_tuple()?.into_iter();
        let mut next = || required(fields.next(), "draw field");
        Ok(DrawRecord {
            id: next()?.into_u64()?,
            timestamp: next()?.into_u64()?,
            winning_number: next()?.into_u8()?,
            winning_animal: next()?.into_string()?,
            total_pot: next()?.into_uint()?,
            number_winners: winners(next()?)?,
            animal_winners: winners(next()?)?,
            random_value: next()?.into_fixed_bytes()?,
            bets: next()?
                .into_array()?
                .into_iter()
                .map(placed_bet)
                .collect::<Result<_, _>>()?,
        })
    }

    fn required(token: Option<Token>, field: &'static str) -> Result<Token, AbiError> {
        token.ok_or(AbiError::MissingField(field))
    }

    pub(super) fn winners(token: Token) -> Result<Vec<Winner>, AbiError> {
        token
            .into_array()?
            .into_iter()
            .map(|entry| {
                let mut fields = entry.into_tuple()?.into_iter();
                Ok(Winner {
                    player: required(fields.next(), "winner address")?.into_address()?,
                    amount_won: required(fields.next(), "winner amount")?.into_uint()?,
                })
            })
            .collect()
    }

    pub(super) fn placed_bet(token: Token) -> Result<PlacedBet, AbiError> {
        let mut fields = token.into_tuple()?.into_iter();
        Ok(PlacedBet {
            player: required(fields.next(), "bettor address")?.into_address()?,
            numbers: small_numbers(required(fields.next(), "bet numbers")?)?,
            animals: strings(required(fields.next(), "bet animals")?)?,
        })
    }

    fn small_numbers(token: Token) -> Result<Vec<u8>, AbiError> {
        token.into_array()?.into_iter().map(Token::into_u8).collect()
    }

    fn strings(token: Token) -> Result<Vec<String>, AbiError> {
        token
            .into_array()?
            .into_iter()
            .map(Token::into_string)
            .collect()
    }
}

/// Encode a draw record the way `getDrawHistory` returns it. Used by fixtures.
pub fn draw_token(record: &DrawRecord) -> Token {
    let winners = |list: &[Winner]| {
        Token::Array(
            list.iter()
                .map(|w| {
                    Token::Tuple(vec![Token::Address(w.player), Token::Uint(w.amount_won)])
                })
                .collect(),
        )
    };
    let bets = record
        .bets
        .iter()
        .map(|bet| {
            Token::Tuple(vec![
                Token::Address(bet.player),
                Token::Array(
                    bet.numbers
                        .iter()
                        .map(|n| Token::Uint(U256::from(*n)))
                        .collect(),
                ),
                Token::Array(
                    bet.animals
                        .iter()
                        .map(|a| Token::String(a.clone()))
                        .collect(),
                ),
            ])
        })
        .collect();
    Token::Tuple(vec![
        Token::Uint(U256::from(record.id)),
        Token::Uint(U256::from(record.timestamp)),
        Token::Uint(U256::from(record.winning_number)),
        Token::String(record.winning_animal.clone()),
        Token::Uint(record.total_pot),
        winners(&record.number_winners),
        winners(&record.animal_winners),
        Token::FixedBytes(record.random_value),
        Token::Array(bets),
    ])
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn sample_record() -> DrawRecord {
        DrawRecord {
            id: 3,
            timestamp: 1_754_000_000,
            winning_number: 42,
            winning_animal: "Salandak".to_string(),
            total_pot: U256::from(5_000_000_000_000_000_000u128),
            number_winners: vec![Winner {
                player: Address::repeat_byte(0x11),
                amount_won: U256::from(3_500_000_000_000_000_000u128),
            }],
            animal_winners: Vec::new(),
            random_value: H256::from_low_u64_be(42 + 96 * 7),
            bets: vec![PlacedBet {
                player: Address::repeat_byte(0x11),
                numbers: vec![42, 7],
                animals: vec!["Honk".to_string()],
            }],
        }
    }

    #[test]
    fn decode_full_status__reads_all_ten_fields() {
        // given
        let tokens = vec![
            Token::Uint(U256::from(12u64)),
            Token::Uint(U256::from(1000u64)),
            Token::Uint(U256::from(50u64)),
            Token::Uint(U256::from(20u64)),
            Token::Bool(true),
            Token::Uint(U256::from(10u64)),
            Token::Uint(U256::from(4u64)),
            Token::Uint(U256::from(70u64)),
            Token::Uint(U256::from(30u64)),
            Token::Bool(false),
        ];

        // when
        let status = decode::full_status(&abi::encode(&tokens)).unwrap();

        // then
        assert_eq!(status.round_id, U256::from(12u64));
        assert_eq!(status.total_pot(), U256::from(1050u64));
        assert!(status.paused);
        assert_eq!(status.max_number_bets, 10);
        assert_eq!(status.max_animal_bets, 4);
        assert_eq!(status.number_percentage + status.animal_percentage, 100);
        assert!(!status.draw_in_progress);
    }

    #[test]
    fn decode_draw_history__reads_nested_records() {
        // given
        let record = sample_record();
        let payload = abi::encode(&[Token::Array(vec![draw_token(&record)])]);

        // when
        let history = decode::draw_history(&payload).unwrap();

        // then
        assert_eq!(history, vec![record]);
    }

    #[test]
    fn decode_player_bets__reads_numbers_and_animals() {
        let payload = abi::encode(&[
            Token::Array(vec![Token::Uint(U256::from(3u64))]),
            Token::Array(vec![Token::String("Birbie".to_string())]),
        ]);
        let bets = decode::player_bets(&payload).unwrap();
        assert_eq!(bets.numbers, vec![3]);
        assert_eq!(bets.animals, vec!["Birbie".to_string()]);
    }

    #[test]
    fn place_bets__encodes_selector_and_arguments() {
        let data = calls::place_bets(&[1, 95], &["Chog"]);
        assert_eq!(&data[..4], &abi::selector(signatures::PLACE_BETS));
        let decoded = abi::decode(
            &[
                ParamType::array(ParamType::Uint),
                ParamType::array(ParamType::String),
            ],
            &data[4..],
        )
        .unwrap();
        assert_eq!(
            decoded[0],
            Token::Array(vec![
                Token::Uint(U256::from(1u64)),
                Token::Uint(U256::from(95u64))
            ])
        );
    }

    #[test]
    fn decode_log__recognises_bets_placed() {
        let game = Address::repeat_byte(0xaa);
        let leaderboard = Address::repeat_byte(0xbb);
        let player = Address::repeat_byte(0x01);
        let log = LogEntry {
            address: game,
            topics: vec![bets_placed_topic(), address_topic(&player)],
            data: abi::encode(&[Token::Uint(U256::from(3u64))]),
        };
        assert_eq!(
            decode_log(&game, &leaderboard, &log),
            Some(ChainEvent::BetsPlaced {
                player,
                total_bets: 3
            })
        );
    }

    #[test]
    fn decode_log__ignores_leaderboard_updates_for_other_games() {
        // given
        let game = Address::repeat_byte(0xaa);
        let other_game = Address::repeat_byte(0xcc);
        let leaderboard = Address::repeat_byte(0xbb);
        let player = Address::repeat_byte(0x01);
        let data = abi::encode(&[Token::Uint(U256::from(5u64)), Token::Uint(U256::from(2u64))]);
        let ours = LogEntry {
            address: leaderboard,
            topics: vec![
                player_data_updated_topic(),
                address_topic(&game),
                address_topic(&player),
            ],
            data: data.clone(),
        };
        let theirs = LogEntry {
            topics: vec![
                player_data_updated_topic(),
                address_topic(&other_game),
                address_topic(&player),
            ],
            ..ours.clone()
        };

        // when / then
        assert_eq!(
            decode_log(&game, &leaderboard, &ours),
            Some(ChainEvent::PlayerDataUpdated {
                player,
                score: U256::from(5u64),
                transactions: 2
            })
        );
        assert_eq!(decode_log(&game, &leaderboard, &theirs), None);
    }

    #[test]
    fn decode_winners__rejects_entry_without_amount() {
        // given
        let truncated = Token::Array(vec![Token::Tuple(vec![Token::Address(
            Address::repeat_byte(0x11),
        )])]);

        // when
        let result = decode::winners(truncated);

        // then
        assert_eq!(result, Err(AbiError::MissingField("winner amount")));
    }

    #[test]
    fn decode_placed_bet__rejects_bet_without_animals() {
        // given
        let truncated = Token::Tuple(vec![
            Token::Address(Address::repeat_byte(0x22)),
            Token::Array(vec![Token::Uint(U256::from(7u64))]),
        ]);

        // when
        let result = decode::placed_bet(truncated);

        // then
        assert_eq!(result, Err(AbiError::MissingField("bet animals")));
    }

    #[test]
    fn decode_player_standing__rejects_short_payload() {
        let one_word = abi::encode(&[Token::Uint(U256::from(5u64))]);
        assert!(decode::player_standing(&one_word).is_err());
    }
}
