//! Plain MON transfers from the game wallet to an outside address.

use crate::{
    Address,
    U256,
    units::{
        AddressError,
        AmountError,
        format_mon,
        parse_address,
        parse_ether,
    },
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferRejection {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("destination is the sending wallet")]
    ToSelf,
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("insufficient balance: sending {}, have {}", format_mon(*.amount), format_mon(*.balance))]
    InsufficientBalance { amount: U256, balance: U256 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub to: Address,
    pub amount: U256,
}

impl Transfer {
    /// Validate the destination and amount typed into the profile panel.
    /// Gas is paid on top of `amount`, so the node may still refuse a
    /// transfer of the full balance.
    pub fn parse(
        to: &str,
        amount: &str,
        from: Address,
        balance: U256,
    ) -> Result<Self, TransferRejection> {
        let to = parse_address(to)?;
        if to == from {
            return Err(TransferRejection::ToSelf);
        }
        let amount = parse_ether(amount)?;
        if amount.is_zero() {
            return Err(TransferRejection::ZeroAmount);
        }
        if amount > balance {
            return Err(TransferRejection::InsufficientBalance { amount, balance });
        }
        Ok(Self { to, amount })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const DEST: &str = "0x2222222222222222222222222222222222222222";

    fn from() -> Address {
        Address::repeat_byte(0x11)
    }

    fn mon(raw: &str) -> U256 {
        parse_ether(raw).unwrap()
    }

    #[test]
    fn parse__accepts_whole_balance() {
        let transfer = Transfer::parse(DEST, "1.5", from(), mon("1.5")).unwrap();
        assert_eq!(transfer.to, Address::repeat_byte(0x22));
        assert_eq!(transfer.amount, mon("1.5"));
    }

    #[test]
    fn parse__rejects_one_wei_over_balance() {
        let balance = mon("1.5") - U256::one();
        assert_eq!(
            Transfer::parse(DEST, "1.5", from(), balance),
            Err(TransferRejection::InsufficientBalance {
                amount: mon("1.5"),
                balance,
            })
        );
    }

    #[test]
    fn parse__rejects_bad_input() {
        assert!(matches!(
            Transfer::parse("0x1234", "1", from(), mon("5")),
            Err(TransferRejection::Address(_))
        ));
        assert!(matches!(
            Transfer::parse(DEST, "abc", from(), mon("5")),
            Err(TransferRejection::Amount(_))
        ));
        assert!(matches!(
            Transfer::parse(DEST, "", from(), mon("5")),
            Err(TransferRejection::Amount(AmountError::Empty))
        ));
        assert_eq!(
            Transfer::parse(DEST, "0.000", from(), mon("5")),
            Err(TransferRejection::ZeroAmount)
        );
    }

    #[test]
    fn parse__rejects_sending_to_self() {
        let own = "0x1111111111111111111111111111111111111111";
        assert_eq!(
            Transfer::parse(own, "1", from(), mon("5")),
            Err(TransferRejection::ToSelf)
        );
    }
}
