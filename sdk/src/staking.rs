//! Staking Ledger instruction builders and PDA helpers.
//!
//! Matches: programs/staking-ledger/src/lib.rs
//!
//! Instructions:
//!   0 = Initialize
//!   1 = Stake
//!   2 = Unstake
//!   3 = Pause
//!   4 = Unpause
//!
//! Every builder takes the program id explicitly so the same code targets
//! mainnet, testnet or a local deployment.

use borsh::BorshSerialize;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use spl_associated_token_account::get_associated_token_address;

use crate::constants::*;

// ── Param Structs (exact Borsh match to program) ────────────────────────────

#[derive(BorshSerialize)]
pub struct AmountArgs {
    pub amount: u64,
}

// ── PDA Helpers ─────────────────────────────────────────────────────────────

pub fn find_global_state(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GLOBAL_STATE_SEED], program_id)
}

pub fn find_vault_authority(program_id: &Pubkey, token_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_AUTHORITY_SEED, token_mint.as_ref()], program_id)
}

pub fn find_user_stake(program_id: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[USER_STAKE_SEED, user.as_ref()], program_id)
}

/// The vault is the vault authority's associated token account for `token_mint`.
pub fn find_vault_token_account(program_id: &Pubkey, token_mint: &Pubkey) -> Pubkey {
    let (authority, _) = find_vault_authority(program_id, token_mint);
    get_associated_token_address(&authority, token_mint)
}

fn amount_data(discriminator: u8, amount: u64) -> Vec<u8> {
    let mut data = vec![discriminator];
    AmountArgs { amount }
        .serialize(&mut data)
        .expect("writing to a Vec cannot fail");
    data
}

// ── Instruction Builders ────────────────────────────────────────────────────

/// Initialize the ledger. The signer becomes the owner.
///
/// Accounts:
///   0. `[signer, writable]` owner (payer)
///   1. `[writable]` global_state PDA
///   2. `[]` token_mint
///   3. `[]` vault_authority PDA (seeds: ["vault", mint])
///   4. `[writable]` vault_token_account
///   5. `[]` token_program
///   6. `[]` associated_token_program
///   7. `[]` system_program
pub fn create_initialize_instruction(
    program_id: &Pubkey,
    owner: &Pubkey,
    token_mint: &Pubkey,
) -> Instruction {
    let (state_pda, _) = find_global_state(program_id);
    let (vault_authority, _) = find_vault_authority(program_id, token_mint);
    let vault = get_associated_token_address(&vault_authority, token_mint);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(state_pda, false),
            AccountMeta::new_readonly(*token_mint, false),
            AccountMeta::new_readonly(vault_authority, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: vec![IX_INITIALIZE],
    }
}

/// Stake `amount` tokens from `user_token_account` into the vault.
///
/// Accounts:
///   0. `[signer, writable]` user
///   1. `[writable]` global_state PDA
///   2. `[writable]` user_stake PDA (seeds: ["user_stake", user])
///   3. `[writable]` user_token_account
///   4. `[writable]` vault_token_account
///   5. `[]` token_program
///   6. `[]` system_program
pub fn create_stake_instruction(
    program_id: &Pubkey,
    user: &Pubkey,
    user_token_account: &Pubkey,
    token_mint: &Pubkey,
    amount: u64,
) -> Instruction {
    let (state_pda, _) = find_global_state(program_id);
    let (stake_pda, _) = find_user_stake(program_id, user);
    let vault = find_vault_token_account(program_id, token_mint);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*user, true),
            AccountMeta::new(state_pda, false),
            AccountMeta::new(stake_pda, false),
            AccountMeta::new(*user_token_account, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: amount_data(IX_STAKE, amount),
    }
}

/// Unstake `amount` tokens from the vault back to `user_token_account`.
/// Works while the ledger is paused.
///
/// Accounts:
///   0. `[signer]` user
///   1. `[writable]` global_state PDA
///   2. `[writable]` user_stake PDA
///   3. `[writable]` user_token_account
///   4. `[writable]` vault_token_account
///   5. `[]` vault_authority PDA
///   6. `[]` token_program
pub fn create_unstake_instruction(
    program_id: &Pubkey,
    user: &Pubkey,
    user_token_account: &Pubkey,
    token_mint: &Pubkey,
    amount: u64,
) -> Instruction {
    let (state_pda, _) = find_global_state(program_id);
    let (stake_pda, _) = find_user_stake(program_id, user);
    let (vault_authority, _) = find_vault_authority(program_id, token_mint);
    let vault = get_associated_token_address(&vault_authority, token_mint);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*user, true),
            AccountMeta::new(state_pda, false),
            AccountMeta::new(stake_pda, false),
            AccountMeta::new(*user_token_account, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(vault_authority, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: amount_data(IX_UNSTAKE, amount),
    }
}

/// Suspend new deposits (owner only).
///
/// Accounts:
///   0. `[signer]` owner
///   1. `[writable]` global_state PDA
pub fn create_pause_instruction(program_id: &Pubkey, owner: &Pubkey) -> Instruction {
    admin_instruction(program_id, owner, IX_PAUSE)
}

/// Resume deposits (owner only). Same accounts as pause.
pub fn create_unpause_instruction(program_id: &Pubkey, owner: &Pubkey) -> Instruction {
    admin_instruction(program_id, owner, IX_UNPAUSE)
}

fn admin_instruction(program_id: &Pubkey, owner: &Pubkey, discriminator: u8) -> Instruction {
    let (state_pda, _) = find_global_state(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(state_pda, false),
        ],
        data: vec![discriminator],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdas_are_distinct_across_record_kinds() {
        let pid = LOCALNET_PROGRAM_ID;
        let mint = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        let (state, _) = find_global_state(&pid);
        let (authority, _) = find_vault_authority(&pid, &mint);
        let (stake, _) = find_user_stake(&pid, &user);

        assert_ne!(state, authority);
        assert_ne!(state, stake);
        assert_ne!(authority, stake);
    }

    #[test]
    fn test_pdas_depend_on_program_id() {
        let user = Pubkey::new_unique();
        assert_ne!(find_global_state(&MAINNET_PROGRAM_ID), find_global_state(&TESTNET_PROGRAM_ID));
        assert_ne!(
            find_user_stake(&MAINNET_PROGRAM_ID, &user),
            find_user_stake(&LOCALNET_PROGRAM_ID, &user)
        );
    }

    #[test]
    fn test_stake_instruction_layout() {
        let pid = LOCALNET_PROGRAM_ID;
        let user = Pubkey::new_unique();
        let user_ata = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ix = create_stake_instruction(&pid, &user, &user_ata, &mint, 1_000);
        assert_eq!(ix.program_id, pid);
        assert_eq!(ix.data[0], IX_STAKE);
        assert_eq!(&ix.data[1..], &1_000u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 7);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[2].pubkey, find_user_stake(&pid, &user).0);
        assert_eq!(ix.accounts[4].pubkey, find_vault_token_account(&pid, &mint));
    }

    #[test]
    fn test_unstake_instruction_passes_vault_authority() {
        let pid = LOCALNET_PROGRAM_ID;
        let user = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ix = create_unstake_instruction(&pid, &user, &Pubkey::new_unique(), &mint, 5);
        assert_eq!(ix.data[0], IX_UNSTAKE);
        assert_eq!(ix.accounts[5].pubkey, find_vault_authority(&pid, &mint).0);
        assert!(!ix.accounts[5].is_writable);
    }

    #[test]
    fn test_admin_instructions() {
        let pid = LOCALNET_PROGRAM_ID;
        let owner = Pubkey::new_unique();

        let pause = create_pause_instruction(&pid, &owner);
        let unpause = create_unpause_instruction(&pid, &owner);
        assert_eq!(pause.data, vec![IX_PAUSE]);
        assert_eq!(unpause.data, vec![IX_UNPAUSE]);
        assert_eq!(pause.accounts[1].pubkey, find_global_state(&pid).0);
        assert!(pause.accounts[0].is_signer);
    }
}
