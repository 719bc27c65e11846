//! Bet composition and the local pre-flight checks run before `placeBets`.
//!
//! The contract re-validates everything; these checks only stop requests that
//! are certain to fail.

use crate::{
    U256,
    animals::{
        ANIMALS,
        SESSION_SIZE,
        animal_index,
    },
    contract::calls,
    units::format_mon,
};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BetRejection {
    #[error("the game is paused")]
    Paused,
    #[error("a draw is in progress")]
    DrawInProgress,
    #[error("select at least one number or animal")]
    Empty,
    #[error("number bet limit reached: {already} placed + {adding} new > {max}")]
    NumberCapExceeded { already: u64, adding: u64, max: u64 },
    #[error("animal bet limit reached: {already} placed + {adding} new > {max}")]
    AnimalCapExceeded { already: u64, adding: u64, max: u64 },
    #[error("insufficient balance: need {}, have {}", format_mon(*.cost), format_mon(*.balance))]
    InsufficientBalance { cost: U256, balance: U256 },
    #[error("bet cost overflows")]
    CostOverflow,
}

/// Pending selection, cleared after a successful submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BetSlip {
    numbers: BTreeSet<u8>,
    animals: BTreeSet<usize>,
}

impl BetSlip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for numbers outside 0..96.
    pub fn toggle_number(&mut self, number: u8) -> bool {
        if number >= SESSION_SIZE {
            return false;
        }
        if !self.numbers.remove(&number) {
            self.numbers.insert(number);
        }
        true
    }

    pub fn toggle_animal(&mut self, index: usize) -> bool {
        if index >= ANIMALS.len() {
            return false;
        }
        if !self.animals.remove(&index) {
            self.animals.insert(index);
        }
        true
    }

    pub fn toggle_animal_named(&mut self, name: &str) -> bool {
        animal_index(name).is_some_and(|index| self.toggle_animal(index))
    }

    pub fn clear(&mut self) {
        self.numbers.clear();
        self.animals.clear();
    }

    pub fn has_number(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }

    pub fn has_animal(&self, index: usize) -> bool {
        self.animals.contains(&index)
    }

    pub fn numbers(&self) -> Vec<u8> {
        self.numbers.iter().copied().collect()
    }

    pub fn animal_names(&self) -> Vec<&'static str> {
        self.animals.iter().map(|index| ANIMALS[*index]).collect()
    }

    pub fn number_count(&self) -> u64 {
        self.numbers.len() as u64
    }

    pub fn animal_count(&self) -> u64 {
        self.animals.len() as u64
    }

    pub fn count(&self) -> u64 {
        self.number_count() + self.animal_count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn cost(&self, price: U256) -> Option<U256> {
        price.checked_mul(U256::from(self.count()))
    }
}

/// Per-round limits and what the player already used this round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundAllowance {
    pub max_numbers: u64,
    pub max_animals: u64,
    pub numbers_used: u64,
    pub animals_used: u64,
}

/// Everything the checks need from the latest snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BetContext {
    pub paused: bool,
    pub draw_in_progress: bool,
    pub price: U256,
    pub balance: U256,
    pub allowance: RoundAllowance,
}

/// `already + adding <= max`. A maximum of zero means no limit is published.
pub fn check_cap(already: u64, adding: u64, max: u64) -> bool {
    max == 0 || already.saturating_add(adding) <= max
}

/// Total cost in wei if `balance` covers `selections * price`.
pub fn check_affordability(
    selections: u64,
    price: U256,
    balance: U256,
) -> Result<U256, BetRejection> {
    let cost = price
        .checked_mul(U256::from(selections))
        .ok_or(BetRejection::CostOverflow)?;
    if balance < cost {
        return Err(BetRejection::InsufficientBalance { cost, balance });
    }
    Ok(cost)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedBet {
    pub numbers: Vec<u8>,
    pub animals: Vec<&'static str>,
    pub count: u64,
    pub price: U256,
    pub value: U256,
    pub calldata: Vec<u8>,
}

/// Checks run in order: pause, draw, empty slip, caps, balance.
pub fn preflight(slip: &BetSlip, ctx: &BetContext) -> Result<PreparedBet, BetRejection> {
    if ctx.paused {
        return Err(BetRejection::Paused);
    }
    if ctx.draw_in_progress {
        return Err(BetRejection::DrawInProgress);
    }
    if slip.is_empty() {
        return Err(BetRejection::Empty);
    }
    let allowance = &ctx.allowance;
    if !check_cap(allowance.numbers_used, slip.number_count(), allowance.max_numbers) {
        return Err(BetRejection::NumberCapExceeded {
            already: allowance.numbers_used,
            adding: slip.number_count(),
            max: allowance.max_numbers,
        });
    }
    if !check_cap(allowance.animals_used, slip.animal_count(), allowance.max_animals) {
        return Err(BetRejection::AnimalCapExceeded {
            already: allowance.animals_used,
            adding: slip.animal_count(),
            max: allowance.max_animals,
        });
    }
    let value = check_affordability(slip.count(), ctx.price, ctx.balance)?;

    let numbers = slip.numbers();
    let animals = slip.animal_names();
    let calldata = calls::place_bets(&numbers, &animals);
    Ok(PreparedBet {
        numbers,
        animals,
        count: slip.count(),
        price: ctx.price,
        value,
        calldata,
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::units::parse_ether;

    fn open_context() -> BetContext {
        BetContext {
            paused: false,
            draw_in_progress: false,
            price: parse_ether("0.02").unwrap(),
            balance: parse_ether("10").unwrap(),
            allowance: RoundAllowance {
                max_numbers: 10,
                max_animals: 4,
                numbers_used: 0,
                animals_used: 0,
            },
        }
    }

    #[test]
    fn toggle_number__rejects_out_of_range_and_toggles_off() {
        let mut slip = BetSlip::new();
        assert!(!slip.toggle_number(96));
        assert!(slip.toggle_number(95));
        assert!(slip.has_number(95));
        assert!(slip.toggle_number(95));
        assert!(slip.is_empty());
    }

    #[test]
    fn toggle_animal_named__only_accepts_known_groups() {
        let mut slip = BetSlip::new();
        assert!(slip.toggle_animal_named("Chog"));
        assert!(!slip.toggle_animal_named("Doge"));
        assert_eq!(slip.animal_names(), vec!["Chog"]);
    }

    #[test]
    fn preflight__paused_wins_over_everything() {
        let ctx = BetContext {
            paused: true,
            ..open_context()
        };
        assert_eq!(preflight(&BetSlip::new(), &ctx), Err(BetRejection::Paused));
    }

    #[test]
    fn preflight__checks_caps_before_balance() {
        // given
        let mut slip = BetSlip::new();
        slip.toggle_animal(0);
        slip.toggle_animal(1);
        let ctx = BetContext {
            balance: U256::zero(),
            allowance: RoundAllowance {
                animals_used: 3,
                ..open_context().allowance
            },
            ..open_context()
        };

        // when
        let result = preflight(&slip, &ctx);

        // then
        assert_eq!(
            result,
            Err(BetRejection::AnimalCapExceeded {
                already: 3,
                adding: 2,
                max: 4
            })
        );
    }

    #[test]
    fn preflight__encodes_sorted_selection_with_total_value() {
        // given
        let mut slip = BetSlip::new();
        slip.toggle_number(42);
        slip.toggle_number(7);
        slip.toggle_animal_named("Moxy");

        // when
        let prepared = preflight(&slip, &open_context()).unwrap();

        // then
        assert_eq!(prepared.numbers, vec![7, 42]);
        assert_eq!(prepared.animals, vec!["Moxy"]);
        assert_eq!(prepared.count, 3);
        assert_eq!(prepared.value, parse_ether("0.06").unwrap());
        assert_eq!(prepared.calldata, calls::place_bets(&[7, 42], &["Moxy"]));
    }

    #[test]
    fn check_cap__zero_maximum_is_unlimited() {
        assert!(check_cap(1_000, 1_000, 0));
        assert!(check_cap(9, 1, 10));
        assert!(!check_cap(9, 2, 10));
    }
}
