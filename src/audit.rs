//! Independent re-derivation of draw results from the oracle random value.

use crate::{
    H256,
    U256,
    animals::{
        SESSION_SIZE,
        animal_for,
    },
    contract::DrawRecord,
};

/// `random mod session_size`, with the random value read as a big-endian
/// unsigned 256-bit integer. `session_size` must be non-zero.
pub fn winning_index_for(random: &H256, session_size: u8) -> u8 {
    let value = U256::from_big_endian(random.as_bytes());
    let modulus = U256::from(session_size.max(1));
    (value % modulus).low_u64() as u8
}

pub fn winning_index(random: &H256) -> u8 {
    winning_index_for(random, SESSION_SIZE)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawAudit {
    pub computed_number: u8,
    pub computed_animal: Option<&'static str>,
    pub number_matches: bool,
    pub animal_matches: bool,
}

impl DrawAudit {
    pub fn verified(&self) -> bool {
        self.number_matches && self.animal_matches
    }
}

pub fn audit_draw(record: &DrawRecord) -> DrawAudit {
    let computed_number = winning_index(&record.random_value);
    let computed_animal = animal_for(computed_number);
    DrawAudit {
        computed_number,
        computed_animal,
        number_matches: computed_number == record.winning_number,
        animal_matches: computed_animal == Some(record.winning_animal.as_str()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn winning_index__reduces_full_width_values() {
        assert_eq!(winning_index(&H256::zero()), 0);
        assert_eq!(winning_index(&H256::from_low_u64_be(95)), 95);
        assert_eq!(winning_index(&H256::from_low_u64_be(96)), 0);
        // 2^256 - 1 = 96 * k + 63
        assert_eq!(winning_index(&H256::repeat_byte(0xff)), 63);
    }

    #[test]
    fn audit_draw__flags_mismatched_records() {
        // given
        let mut record = DrawRecord {
            id: 1,
            timestamp: 0,
            winning_number: 7,
            winning_animal: "Chog".to_string(),
            total_pot: U256::zero(),
            number_winners: Vec::new(),
            animal_winners: Vec::new(),
            random_value: H256::from_low_u64_be(96 * 1000 + 7),
            bets: Vec::new(),
        };

        // when / then
        assert!(audit_draw(&record).verified());
        record.winning_animal = "Moxy".to_string();
        let audit = audit_draw(&record);
        assert!(audit.number_matches);
        assert!(!audit.animal_matches);
    }
}
