//! Account decoders and ledger health checks.
//!
//! Layouts mirror the program's Borsh records byte for byte.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("account data is {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("failed to decode account: {0}")]
    Decode(#[from] std::io::Error),
    #[error("global state is not initialized")]
    NotInitialized,
    #[error("total_staked is {total_staked} but user balances sum to {sum}")]
    ConservationViolated { total_staked: u64, sum: u128 },
    #[error("vault holds {vault_balance} but {total_staked} is staked")]
    VaultUndercollateralized { vault_balance: u64, total_staked: u64 },
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct GlobalState {
    pub is_initialized: bool,
    pub owner: Pubkey,
    pub token_mint: Pubkey,
    pub vault_token_account: Pubkey,
    pub total_staked: u64,
    pub paused: bool,
    pub bump: u8,
    pub vault_authority_bump: u8,
}

impl GlobalState {
    pub const SIZE: usize = 108;

    pub fn decode(data: &[u8]) -> Result<Self, StateError> {
        let state: Self = decode_exact(data, Self::SIZE)?;
        if !state.is_initialized {
            return Err(StateError::NotInitialized);
        }
        Ok(state)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct UserStake {
    pub user: Pubkey,
    pub balance: u64,
    pub bump: u8,
}

impl UserStake {
    pub const SIZE: usize = 41;

    pub fn decode(data: &[u8]) -> Result<Self, StateError> {
        decode_exact(data, Self::SIZE)
    }
}

fn decode_exact<T: BorshDeserialize>(data: &[u8], expected: usize) -> Result<T, StateError> {
    if data.len() != expected {
        return Err(StateError::InvalidLength {
            expected,
            actual: data.len(),
        });
    }
    Ok(T::try_from_slice(data)?)
}

/// Amount the user can withdraw right now. Pausing never reduces it; a user
/// without a stake record has nothing to withdraw.
pub fn unstakeable_balance(stake: Option<&UserStake>) -> u64 {
    stake.map_or(0, |s| s.balance)
}

/// Checks `total_staked == Σ balance` over `stakes` and that the vault covers it.
/// `stakes` must be every stake record of the deployment.
pub fn verify_conservation(
    state: &GlobalState,
    stakes: &[UserStake],
    vault_balance: u64,
) -> Result<(), StateError> {
    // u128 so a corrupted snapshot reports instead of overflowing.
    let sum: u128 = stakes.iter().map(|s| s.balance as u128).sum();
    if sum != state.total_staked as u128 {
        return Err(StateError::ConservationViolated {
            total_staked: state.total_staked,
            sum,
        });
    }
    if vault_balance < state.total_staked {
        return Err(StateError::VaultUndercollateralized {
            vault_balance,
            total_staked: state.total_staked,
        });
    }
    Ok(())
}

/// Renders raw token units with the mint's decimals, e.g. `(1500000, 6)` -> `1.500000`.
/// `decimals` comes from the configured mint (`spl_token::state::Mint::decimals`).
pub fn format_token_amount(raw: u64, decimals: u8) -> String {
    let decimals = decimals as usize;
    if decimals == 0 {
        return raw.to_string();
    }
    let digits = format!("{raw:0>width$}", width = decimals + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals);
    format!("{whole}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state(total_staked: u64) -> GlobalState {
        GlobalState {
            is_initialized: true,
            owner: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            vault_token_account: Pubkey::new_unique(),
            total_staked,
            paused: false,
            bump: 254,
            vault_authority_bump: 253,
        }
    }

    fn stake(balance: u64) -> UserStake {
        UserStake {
            user: Pubkey::new_unique(),
            balance,
            bump: 255,
        }
    }

    #[test]
    fn test_global_state_size_matches_layout() {
        let bytes = borsh::to_vec(&sample_state(42)).unwrap();
        assert_eq!(bytes.len(), GlobalState::SIZE);
        assert_eq!(GlobalState::decode(&bytes).unwrap().total_staked, 42);
    }

    #[test]
    fn test_user_stake_size_matches_layout() {
        let bytes = borsh::to_vec(&stake(7)).unwrap();
        assert_eq!(bytes.len(), UserStake::SIZE);
        assert_eq!(UserStake::decode(&bytes).unwrap().balance, 7);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = UserStake::decode(&[0u8; 40]).unwrap_err();
        assert!(matches!(
            err,
            StateError::InvalidLength { expected: 41, actual: 40 }
        ));
    }

    #[test]
    fn test_decode_rejects_uninitialized_state() {
        let mut state = sample_state(0);
        state.is_initialized = false;
        let bytes = borsh::to_vec(&state).unwrap();
        assert!(matches!(
            GlobalState::decode(&bytes),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_unstakeable_balance() {
        assert_eq!(unstakeable_balance(None), 0);
        assert_eq!(unstakeable_balance(Some(&stake(500))), 500);
    }

    #[test]
    fn test_verify_conservation() {
        let state = sample_state(1_500);
        let stakes = [stake(1_000), stake(500), stake(0)];

        assert!(verify_conservation(&state, &stakes, 1_500).is_ok());
        assert!(verify_conservation(&state, &stakes, 2_000).is_ok());
        assert!(matches!(
            verify_conservation(&state, &stakes, 1_499),
            Err(StateError::VaultUndercollateralized { .. })
        ));
        assert!(matches!(
            verify_conservation(&state, &stakes[..1], 1_500),
            Err(StateError::ConservationViolated { sum: 1_000, .. })
        ));
    }

    #[test]
    fn test_format_token_amount() {
        assert_eq!(format_token_amount(0, 9), "0.000000000");
        assert_eq!(format_token_amount(1_500_000_000, 9), "1.500000000");
        assert_eq!(format_token_amount(42, 9), "0.000000042");
        assert_eq!(format_token_amount(1_500_000, 6), "1.500000");
        assert_eq!(format_token_amount(123, 2), "1.23");
        assert_eq!(format_token_amount(123, 0), "123");
        // More decimals than u64 has digits.
        assert_eq!(format_token_amount(u64::MAX, 20), "0.18446744073709551615");
    }
}
