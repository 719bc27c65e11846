//! Privileged game-contract operations.

use crate::{
    Address,
    U256,
    abi::{
        self,
        Token,
    },
    units::{
        AddressError,
        AmountError,
        format_mon,
        parse_address,
        parse_ether,
        short_address,
    },
};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminAction {
    SetBetPrice(U256),
    SetPercentages { number: u64, animal: u64 },
    SetMaxNumberBets(u64),
    SetMaxAnimalBets(u64),
    SetDappWallet(Address),
    Pause,
    Unpause,
    TriggerDraw,
    ProcessDraw,
    RefundAllBets,
    CancelFailedDraw,
    AddBonusToPot(U256),
    AddAdmin(Address),
    RemoveAdmin(Address),
}

impl AdminAction {
    /// Pause when running, unpause when paused.
    pub fn toggle_pause(currently_paused: bool) -> Self {
        if currently_paused {
            AdminAction::Unpause
        } else {
            AdminAction::Pause
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            AdminAction::SetBetPrice(_) => "setBetPrice(uint256)",
            AdminAction::SetPercentages { .. } => "setPercentages(uint256,uint256)",
            AdminAction::SetMaxNumberBets(_) => "setMaxNumberBets(uint256)",
            AdminAction::SetMaxAnimalBets(_) => "setMaxAnimalBets(uint256)",
            AdminAction::SetDappWallet(_) => "setDappWallet(address)",
            AdminAction::Pause => "pause()",
            AdminAction::Unpause => "unpause()",
            AdminAction::TriggerDraw => "triggerDraw()",
            AdminAction::ProcessDraw => "processDraw()",
            AdminAction::RefundAllBets => "refundAllBets()",
            AdminAction::CancelFailedDraw => "cancelFailedDraw()",
            AdminAction::AddBonusToPot(_) => "addBonusToPot()",
            AdminAction::AddAdmin(_) => "addAdmin(address)",
            AdminAction::RemoveAdmin(_) => "removeAdmin(address)",
        }
    }

    fn arguments(&self) -> Vec<Token> {
        match self {
            AdminAction::SetBetPrice(price) => vec![Token::Uint(*price)],
            AdminAction::SetPercentages { number, animal } => vec![
                Token::Uint(U256::from(*number)),
                Token::Uint(U256::from(*animal)),
            ],
            AdminAction::SetMaxNumberBets(max) | AdminAction::SetMaxAnimalBets(max) => {
                vec![Token::Uint(U256::from(*max))]
            }
            AdminAction::SetDappWallet(address)
            | AdminAction::AddAdmin(address)
            | AdminAction::RemoveAdmin(address) => vec![Token::Address(*address)],
            AdminAction::Pause
            | AdminAction::Unpause
            | AdminAction::TriggerDraw
            | AdminAction::ProcessDraw
            | AdminAction::RefundAllBets
            | AdminAction::CancelFailedDraw
            | AdminAction::AddBonusToPot(_) => Vec::new(),
        }
    }

    pub fn calldata(&self) -> Vec<u8> {
        abi::encode_call(self.signature(), &self.arguments())
    }

    /// Native value attached to the call.
    pub fn value(&self) -> U256 {
        match self {
            AdminAction::AddBonusToPot(amount) => *amount,
            _ => U256::zero(),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            AdminAction::RefundAllBets
                | AdminAction::CancelFailedDraw
                | AdminAction::RemoveAdmin(_)
        )
    }

    pub fn describe(&self) -> String {
        match self {
            AdminAction::SetBetPrice(price) => format!("set bet price to {}", format_mon(*price)),
            AdminAction::SetPercentages { number, animal } => {
                format!("set payouts to {number}% numbers / {animal}% animals")
            }
            AdminAction::SetMaxNumberBets(max) => format!("set max number bets to {max}"),
            AdminAction::SetMaxAnimalBets(max) => format!("set max animal bets to {max}"),
            AdminAction::SetDappWallet(address) => {
                format!("set dapp wallet to {}", short_address(address))
            }
            AdminAction::Pause => "pause the game".to_string(),
            AdminAction::Unpause => "unpause the game".to_string(),
            AdminAction::TriggerDraw => "trigger the draw".to_string(),
            AdminAction::ProcessDraw => "process the draw".to_string(),
            AdminAction::RefundAllBets => "refund all bets".to_string(),
            AdminAction::CancelFailedDraw => "cancel the failed draw".to_string(),
            AdminAction::AddBonusToPot(amount) => {
                format!("add {} to the bonus pot", format_mon(*amount))
            }
            AdminAction::AddAdmin(address) => format!("add admin {}", short_address(address)),
            AdminAction::RemoveAdmin(address) => {
                format!("remove admin {}", short_address(address))
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminInputError {
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("'{0}' is not a whole number")]
    NotAnInteger(String),
    #[error("percentages must sum to 100, got {0}")]
    PercentagesSum(u64),
    #[error("expected two percentages like '70 30'")]
    PercentagesFormat,
}

/// Menu entries; the ones taking input are completed with [`AdminActionKind::parse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminActionKind {
    SetBetPrice,
    SetPercentages,
    SetMaxNumberBets,
    SetMaxAnimalBets,
    SetDappWallet,
    TogglePause,
    TriggerDraw,
    ProcessDraw,
    RefundAllBets,
    CancelFailedDraw,
    AddBonusToPot,
    AddAdmin,
    RemoveAdmin,
}

impl AdminActionKind {
    pub const ALL: [AdminActionKind; 13] = [
        AdminActionKind::SetBetPrice,
        AdminActionKind::SetPercentages,
        AdminActionKind::SetMaxNumberBets,
        AdminActionKind::SetMaxAnimalBets,
        AdminActionKind::SetDappWallet,
        AdminActionKind::TogglePause,
        AdminActionKind::TriggerDraw,
        AdminActionKind::ProcessDraw,
        AdminActionKind::RefundAllBets,
        AdminActionKind::CancelFailedDraw,
        AdminActionKind::AddBonusToPot,
        AdminActionKind::AddAdmin,
        AdminActionKind::RemoveAdmin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdminActionKind::SetBetPrice => "Set bet price (MON)",
            AdminActionKind::SetPercentages => "Set payout percentages (number animal)",
            AdminActionKind::SetMaxNumberBets => "Set max number bets",
            AdminActionKind::SetMaxAnimalBets => "Set max animal bets",
            AdminActionKind::SetDappWallet => "Set dapp wallet",
            AdminActionKind::TogglePause => "Pause / unpause",
            AdminActionKind::TriggerDraw => "Trigger draw",
            AdminActionKind::ProcessDraw => "Process draw",
            AdminActionKind::RefundAllBets => "Refund all bets",
            AdminActionKind::CancelFailedDraw => "Cancel failed draw",
            AdminActionKind::AddBonusToPot => "Add bonus to pot (MON)",
            AdminActionKind::AddAdmin => "Add admin",
            AdminActionKind::RemoveAdmin => "Remove admin",
        }
    }

    pub fn needs_input(self) -> bool {
        matches!(
            self,
            AdminActionKind::SetBetPrice
                | AdminActionKind::SetPercentages
                | AdminActionKind::SetMaxNumberBets
                | AdminActionKind::SetMaxAnimalBets
                | AdminActionKind::SetDappWallet
                | AdminActionKind::AddBonusToPot
                | AdminActionKind::AddAdmin
                | AdminActionKind::RemoveAdmin
        )
    }

    /// Build the action from user input. `paused` resolves the pause toggle.
    pub fn parse(self, input: &str, paused: bool) -> Result<AdminAction, AdminInputError> {
        let input = input.trim();
        let action = match self {
            AdminActionKind::SetBetPrice => AdminAction::SetBetPrice(parse_ether(input)?),
            AdminActionKind::SetPercentages => {
                let (number, animal) = parse_percentages(input)?;
                AdminAction::SetPercentages { number, animal }
            }
            AdminActionKind::SetMaxNumberBets => AdminAction::SetMaxNumberBets(parse_count(input)?),
            AdminActionKind::SetMaxAnimalBets => AdminAction::SetMaxAnimalBets(parse_count(input)?),
            AdminActionKind::SetDappWallet => AdminAction::SetDappWallet(parse_address(input)?),
            AdminActionKind::TogglePause => AdminAction::toggle_pause(paused),
            AdminActionKind::TriggerDraw => AdminAction::TriggerDraw,
            AdminActionKind::ProcessDraw => AdminAction::ProcessDraw,
            AdminActionKind::RefundAllBets => AdminAction::RefundAllBets,
            AdminActionKind::CancelFailedDraw => AdminAction::CancelFailedDraw,
            AdminActionKind::AddBonusToPot => AdminAction::AddBonusToPot(parse_ether(input)?),
            AdminActionKind::AddAdmin => AdminAction::AddAdmin(parse_address(input)?),
            AdminActionKind::RemoveAdmin => AdminAction::RemoveAdmin(parse_address(input)?),
        };
        Ok(action)
    }
}

fn parse_count(input: &str) -> Result<u64, AdminInputError> {
    input
        .parse::<u64>()
        .map_err(|_| AdminInputError::NotAnInteger(input.to_string()))
}

fn parse_percentages(input: &str) -> Result<(u64, u64), AdminInputError> {
    let parts: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == '/')
        .filter(|part| !part.is_empty())
        .collect();
    let [number, animal] = parts.as_slice() else {
        return Err(AdminInputError::PercentagesFormat);
    };
    let number = parse_count(number)?;
    let animal = parse_count(animal)?;
    let sum = number.saturating_add(animal);
    if sum != 100 {
        return Err(AdminInputError::PercentagesSum(sum));
    }
    Ok((number, animal))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::abi::{
        ParamType,
        decode,
        selector,
    };

    #[test]
    fn parse__percentages_must_sum_to_hundred() {
        assert_eq!(
            AdminActionKind::SetPercentages.parse("70 30", false),
            Ok(AdminAction::SetPercentages {
                number: 70,
                animal: 30
            })
        );
        assert_eq!(
            AdminActionKind::SetPercentages.parse("70,20", false),
            Err(AdminInputError::PercentagesSum(90))
        );
        assert_eq!(
            AdminActionKind::SetPercentages.parse("100", false),
            Err(AdminInputError::PercentagesFormat)
        );
    }

    #[test]
    fn parse__prices_are_exact_decimals() {
        let action = AdminActionKind::SetBetPrice.parse("0.05", false).unwrap();
        assert_eq!(
            action,
            AdminAction::SetBetPrice(U256::from(50_000_000_000_000_000u64))
        );
        assert!(matches!(
            AdminActionKind::SetBetPrice.parse("abc", false),
            Err(AdminInputError::Amount(_))
        ));
    }

    #[test]
    fn toggle_pause__resolves_from_current_flag() {
        assert_eq!(
            AdminActionKind::TogglePause.parse("", true),
            Ok(AdminAction::Unpause)
        );
        assert_eq!(
            AdminActionKind::TogglePause.parse("", false),
            Ok(AdminAction::Pause)
        );
    }

    #[test]
    fn calldata__encodes_address_argument() {
        // given
        let admin = Address::repeat_byte(0x42);
        let action = AdminAction::AddAdmin(admin);

        // when
        let data = action.calldata();

        // then
        assert_eq!(&data[..4], &selector("addAdmin(address)"));
        let args = decode(&[ParamType::Address], &data[4..]).unwrap();
        assert_eq!(args, vec![Token::Address(admin)]);
        assert_eq!(action.value(), U256::zero());
    }

    #[test]
    fn add_bonus__carries_value_and_no_arguments() {
        let action = AdminActionKind::AddBonusToPot.parse("1.5", false).unwrap();
        assert_eq!(action.calldata().len(), 4);
        assert_eq!(action.value(), U256::from(1_500_000_000_000_000_000u64));
    }

    #[test]
    fn is_destructive__covers_refunds_cancels_and_removals() {
        assert!(AdminAction::RefundAllBets.is_destructive());
        assert!(AdminAction::CancelFailedDraw.is_destructive());
        assert!(AdminAction::RemoveAdmin(Address::zero()).is_destructive());
        assert!(!AdminAction::TriggerDraw.is_destructive());
    }
}
