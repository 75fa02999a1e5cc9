// Staking Ledger: custodial SPL token staking.
// Deposits can be suspended by the owner; withdrawals never can.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    system_program,
    sysvar::Sysvar,
};
use spl_associated_token_account::get_associated_token_address;

// ---------------------------------------------------------------------------
// Program ID
// ---------------------------------------------------------------------------

#[cfg(all(feature = "mainnet", feature = "testnet"))]
compile_error!("features `mainnet` and `testnet` are mutually exclusive");

#[cfg(feature = "mainnet")]
solana_program::declare_id!("4D9WKeKXKCEjzZfuLgU3H7P9J1cJ1HZ2fPURAX8ceqKc");

#[cfg(all(feature = "testnet", not(feature = "mainnet")))]
solana_program::declare_id!("5HWYY9fuyvCrvV66GCg5hPbf7XARCcybuQrdJGGEbEVH");

#[cfg(not(any(feature = "mainnet", feature = "testnet")))]
solana_program::declare_id!("StakLedger111111111111111111111111111111111");

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const GLOBAL_STATE_SEED: &[u8] = b"state";
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault";
pub const USER_STAKE_SEED: &[u8] = b"user_stake";

pub const IX_INITIALIZE: u8 = 0;
pub const IX_STAKE: u8 = 1;
pub const IX_UNSTAKE: u8 = 2;
pub const IX_PAUSE: u8 = 3;
pub const IX_UNPAUSE: u8 = 4;

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    if instruction_data.is_empty() {
        return Err(ProgramError::InvalidInstructionData);
    }

    let (discriminator, data) = instruction_data.split_at(1);

    match discriminator[0] {
        IX_INITIALIZE => process_initialize(program_id, accounts),
        IX_STAKE => process_stake(program_id, accounts, data),
        IX_UNSTAKE => process_unstake(program_id, accounts, data),
        IX_PAUSE => process_set_paused(program_id, accounts, true),
        IX_UNPAUSE => process_set_paused(program_id, accounts, false),
        _ => Err(StakingError::InvalidInstruction.into()),
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    #[error("Invalid instruction discriminator")]
    InvalidInstruction,
    #[error("Staking ledger already initialized")]
    AlreadyInitialized,
    #[error("Staking ledger not initialized")]
    NotInitialized,
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("Contract is paused")]
    ContractPaused,
    #[error("Insufficient staked balance")]
    InsufficientBalance,
    #[error("Unauthorized: only the owner can perform this action")]
    Unauthorized,
    #[error("Contract is already paused")]
    AlreadyPaused,
    #[error("Contract is not paused")]
    NotPaused,
    #[error("Invalid PDA derivation")]
    InvalidPDA,
    #[error("Account not signer")]
    AccountNotSigner,
    #[error("Account not writable")]
    AccountNotWritable,
    #[error("Invalid account owner")]
    InvalidOwner,
    #[error("Invalid token mint")]
    InvalidTokenMint,
    #[error("Invalid token account")]
    InvalidTokenAccount,
    #[error("Vault token account does not match the ledger vault")]
    InvalidVaultAccount,
    #[error("Stake record belongs to another user")]
    InvalidUser,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Arithmetic underflow")]
    Underflow,
}

impl From<StakingError> for ProgramError {
    fn from(e: StakingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Deployment-wide singleton at `["state"]`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct GlobalState {
    pub is_initialized: bool,
    /// Only identity allowed to pause and unpause. Always the initializing signer.
    pub owner: Pubkey,
    pub token_mint: Pubkey,
    /// Associated token account of the vault authority; every staked token lives here.
    pub vault_token_account: Pubkey,
    /// Sum of every `UserStake::balance`.
    pub total_staked: u64,
    /// Blocks `Stake` only.
    pub paused: bool,
    pub bump: u8,
    pub vault_authority_bump: u8,
}

impl GlobalState {
    // 1 + 32 + 32 + 32 + 8 + 1 + 1 + 1 = 108
    pub const SIZE: usize = 108;
}

/// Per-participant record at `["user_stake", user]`. Never closed, even at zero.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct UserStake {
    pub user: Pubkey,
    pub balance: u64,
    pub bump: u8,
}

impl UserStake {
    // 32 + 8 + 1 = 41
    pub const SIZE: usize = 41;
}

// ---------------------------------------------------------------------------
// Instruction data structs
// ---------------------------------------------------------------------------

#[derive(BorshSerialize, BorshDeserialize)]
pub struct AmountArgs {
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn assert_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        return Err(StakingError::AccountNotSigner.into());
    }
    Ok(())
}

fn assert_writable(account: &AccountInfo) -> ProgramResult {
    if !account.is_writable {
        return Err(StakingError::AccountNotWritable.into());
    }
    Ok(())
}

fn assert_owned_by(account: &AccountInfo, owner: &Pubkey) -> ProgramResult {
    if account.owner != owner {
        return Err(StakingError::InvalidOwner.into());
    }
    Ok(())
}

fn assert_program_id(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    system_program: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let required = rent.minimum_balance(space);
    let current = new_account.lamports();

    if current == 0 {
        return invoke_signed(
            &system_instruction::create_account(payer.key, new_account.key, required, space as u64, owner),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[seeds],
        );
    }

    // Anyone can send lamports to a PDA address, and create_account refuses
    // a funded target. Top up to rent exemption, then allocate and assign.
    let shortfall = required.saturating_sub(current);
    if shortfall > 0 {
        invoke(
            &system_instruction::transfer(payer.key, new_account.key, shortfall),
            &[payer.clone(), new_account.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account.key, owner),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )
}

/// Reads the singleton after checking its address, existence and owner.
fn load_global_state(program_id: &Pubkey, account: &AccountInfo) -> Result<GlobalState, ProgramError> {
    let (state_pda, _) = Pubkey::find_program_address(&[GLOBAL_STATE_SEED], program_id);
    if *account.key != state_pda {
        return Err(StakingError::InvalidPDA.into());
    }
    if account.data_is_empty() {
        return Err(StakingError::NotInitialized.into());
    }
    assert_owned_by(account, program_id)?;

    let state = GlobalState::try_from_slice(&account.data.borrow())?;
    if !state.is_initialized {
        return Err(StakingError::NotInitialized.into());
    }
    Ok(state)
}

fn load_user_stake(
    program_id: &Pubkey,
    account: &AccountInfo,
    user: &Pubkey,
) -> Result<UserStake, ProgramError> {
    assert_owned_by(account, program_id)?;
    let stake = UserStake::try_from_slice(&account.data.borrow())?;
    if stake.user != *user {
        return Err(StakingError::InvalidUser.into());
    }
    Ok(stake)
}

/// Checks that `account` is an SPL token account holding `mint` on behalf of `owner`.
fn validate_user_token_account(account: &AccountInfo, mint: &Pubkey, owner: &Pubkey) -> ProgramResult {
    if *account.owner != spl_token::id() {
        return Err(StakingError::InvalidTokenAccount.into());
    }
    let token_account = spl_token::state::Account::unpack(&account.data.borrow())
        .map_err(|_| StakingError::InvalidTokenAccount)?;
    if token_account.mint != *mint {
        return Err(StakingError::InvalidTokenMint.into());
    }
    if token_account.owner != *owner {
        return Err(StakingError::InvalidTokenAccount.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Initialize (discriminator 0)
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer, writable] owner (payer)
//   1. [writable] global_state PDA
//   2. []         token_mint
//   3. []         vault_authority PDA
//   4. [writable] vault_token_account (ATA of vault_authority)
//   5. []         token_program
//   6. []         associated_token_program
//   7. []         system_program

fn process_initialize(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let state_account = next_account_info(account_iter)?;
    let token_mint = next_account_info(account_iter)?;
    let vault_authority = next_account_info(account_iter)?;
    let vault_token_account = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let associated_token_program = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(state_account)?;
    assert_writable(vault_token_account)?;

    let (state_pda, state_bump) = Pubkey::find_program_address(&[GLOBAL_STATE_SEED], program_id);
    if *state_account.key != state_pda {
        return Err(StakingError::InvalidPDA.into());
    }
    if !state_account.data_is_empty() {
        return Err(StakingError::AlreadyInitialized.into());
    }

    if *token_mint.owner != spl_token::id() {
        return Err(StakingError::InvalidTokenMint.into());
    }
    spl_token::state::Mint::unpack(&token_mint.data.borrow())
        .map_err(|_| StakingError::InvalidTokenMint)?;

    let (authority_pda, authority_bump) = Pubkey::find_program_address(
        &[VAULT_AUTHORITY_SEED, token_mint.key.as_ref()],
        program_id,
    );
    if *vault_authority.key != authority_pda {
        return Err(StakingError::InvalidPDA.into());
    }

    let vault_address = get_associated_token_address(&authority_pda, token_mint.key);
    if *vault_token_account.key != vault_address {
        return Err(StakingError::InvalidVaultAccount.into());
    }

    assert_program_id(token_program, &spl_token::id())?;
    assert_program_id(associated_token_program, &spl_associated_token_account::id())?;
    assert_program_id(system_program, &system_program::id())?;

    create_pda_account(
        owner,
        GlobalState::SIZE,
        program_id,
        system_program,
        state_account,
        &[GLOBAL_STATE_SEED, &[state_bump]],
    )?;

    // Idempotent so a vault ATA created ahead of time by anyone is adopted as-is.
    invoke(
        &spl_associated_token_account::instruction::create_associated_token_account_idempotent(
            owner.key,
            &authority_pda,
            token_mint.key,
            &spl_token::id(),
        ),
        &[
            owner.clone(),
            vault_token_account.clone(),
            vault_authority.clone(),
            token_mint.clone(),
            system_program.clone(),
            token_program.clone(),
            associated_token_program.clone(),
        ],
    )?;

    let state = GlobalState {
        is_initialized: true,
        owner: *owner.key,
        token_mint: *token_mint.key,
        vault_token_account: vault_address,
        total_staked: 0,
        paused: false,
        bump: state_bump,
        vault_authority_bump: authority_bump,
    };
    state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

    let clock = Clock::get()?;
    msg!(
        "EVENT:StakingInitialized:{{\"owner\":\"{}\",\"token_mint\":\"{}\",\"vault_authority\":\"{}\",\"vault_token_account\":\"{}\",\"timestamp\":{},\"slot\":{}}}",
        owner.key,
        token_mint.key,
        authority_pda,
        vault_address,
        clock.unix_timestamp,
        clock.slot,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Stake (discriminator 1)
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer, writable] user (payer for a first-time stake record)
//   1. [writable] global_state PDA
//   2. [writable] user_stake PDA
//   3. [writable] user_token_account
//   4. [writable] vault_token_account
//   5. []         token_program
//   6. []         system_program

fn process_stake(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let args = AmountArgs::try_from_slice(data)
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    if args.amount == 0 {
        return Err(StakingError::ZeroAmount.into());
    }

    let account_iter = &mut accounts.iter();
    let user = next_account_info(account_iter)?;
    let state_account = next_account_info(account_iter)?;
    let stake_account = next_account_info(account_iter)?;
    let user_token_account = next_account_info(account_iter)?;
    let vault_token_account = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_program = next_account_info(account_iter)?;

    assert_signer(user)?;
    assert_writable(state_account)?;
    assert_writable(stake_account)?;
    assert_writable(user_token_account)?;
    assert_writable(vault_token_account)?;

    let mut state = load_global_state(program_id, state_account)?;
    if state.paused {
        return Err(StakingError::ContractPaused.into());
    }

    assert_program_id(token_program, &spl_token::id())?;
    if *vault_token_account.key != state.vault_token_account {
        return Err(StakingError::InvalidVaultAccount.into());
    }
    validate_user_token_account(user_token_account, &state.token_mint, user.key)?;

    let (stake_pda, stake_bump) =
        Pubkey::find_program_address(&[USER_STAKE_SEED, user.key.as_ref()], program_id);
    if *stake_account.key != stake_pda {
        return Err(StakingError::InvalidPDA.into());
    }

    let mut stake = if stake_account.data_is_empty() {
        assert_program_id(system_program, &system_program::id())?;
        create_pda_account(
            user,
            UserStake::SIZE,
            program_id,
            system_program,
            stake_account,
            &[USER_STAKE_SEED, user.key.as_ref(), &[stake_bump]],
        )?;
        UserStake {
            user: *user.key,
            balance: 0,
            bump: stake_bump,
        }
    } else {
        load_user_stake(program_id, stake_account, user.key)?
    };

    let balance_before = stake.balance;
    let balance_after = balance_before
        .checked_add(args.amount)
        .ok_or(StakingError::Overflow)?;
    let total_after = state
        .total_staked
        .checked_add(args.amount)
        .ok_or(StakingError::Overflow)?;

    invoke(
        &spl_token::instruction::transfer(
            token_program.key,
            user_token_account.key,
            vault_token_account.key,
            user.key,
            &[],
            args.amount,
        )?,
        &[
            user_token_account.clone(),
            vault_token_account.clone(),
            user.clone(),
            token_program.clone(),
        ],
    )?;

    stake.balance = balance_after;
    state.total_staked = total_after;

    stake.serialize(&mut &mut stake_account.data.borrow_mut()[..])?;
    state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

    let clock = Clock::get()?;
    msg!(
        "EVENT:Staked:{{\"user\":\"{}\",\"amount\":{},\"user_balance_before\":{},\"user_balance_after\":{},\"total_staked_after\":{},\"timestamp\":{},\"slot\":{}}}",
        user.key,
        args.amount,
        balance_before,
        balance_after,
        total_after,
        clock.unix_timestamp,
        clock.slot,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Unstake (discriminator 2)
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   user
//   1. [writable] global_state PDA
//   2. [writable] user_stake PDA
//   3. [writable] user_token_account
//   4. [writable] vault_token_account
//   5. []         vault_authority PDA
//   6. []         token_program
//
// Not gated by `paused`: pausing must never trap custodied funds.

fn process_unstake(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let args = AmountArgs::try_from_slice(data)
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    if args.amount == 0 {
        return Err(StakingError::ZeroAmount.into());
    }

    let account_iter = &mut accounts.iter();
    let user = next_account_info(account_iter)?;
    let state_account = next_account_info(account_iter)?;
    let stake_account = next_account_info(account_iter)?;
    let user_token_account = next_account_info(account_iter)?;
    let vault_token_account = next_account_info(account_iter)?;
    let vault_authority = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(user)?;
    assert_writable(state_account)?;
    assert_writable(stake_account)?;
    assert_writable(user_token_account)?;
    assert_writable(vault_token_account)?;

    let mut state = load_global_state(program_id, state_account)?;

    let (stake_pda, _) =
        Pubkey::find_program_address(&[USER_STAKE_SEED, user.key.as_ref()], program_id);
    if *stake_account.key != stake_pda {
        return Err(StakingError::InvalidPDA.into());
    }
    // A user who never staked has nothing to withdraw.
    if stake_account.data_is_empty() {
        return Err(StakingError::InsufficientBalance.into());
    }
    let mut stake = load_user_stake(program_id, stake_account, user.key)?;
    if stake.balance < args.amount {
        return Err(StakingError::InsufficientBalance.into());
    }

    assert_program_id(token_program, &spl_token::id())?;
    if *vault_token_account.key != state.vault_token_account {
        return Err(StakingError::InvalidVaultAccount.into());
    }
    validate_user_token_account(user_token_account, &state.token_mint, user.key)?;

    let authority_bump = [state.vault_authority_bump];
    let authority_seeds: &[&[u8]] = &[VAULT_AUTHORITY_SEED, state.token_mint.as_ref(), &authority_bump];
    let authority_pda = Pubkey::create_program_address(authority_seeds, program_id)
        .map_err(|_| StakingError::InvalidPDA)?;
    if *vault_authority.key != authority_pda {
        return Err(StakingError::InvalidPDA.into());
    }

    let balance_before = stake.balance;
    let balance_after = balance_before
        .checked_sub(args.amount)
        .ok_or(StakingError::Underflow)?;
    let total_after = state
        .total_staked
        .checked_sub(args.amount)
        .ok_or(StakingError::Underflow)?;

    invoke_signed(
        &spl_token::instruction::transfer(
            token_program.key,
            vault_token_account.key,
            user_token_account.key,
            vault_authority.key,
            &[],
            args.amount,
        )?,
        &[
            vault_token_account.clone(),
            user_token_account.clone(),
            vault_authority.clone(),
            token_program.clone(),
        ],
        &[authority_seeds],
    )?;

    stake.balance = balance_after;
    state.total_staked = total_after;

    stake.serialize(&mut &mut stake_account.data.borrow_mut()[..])?;
    state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

    let clock = Clock::get()?;
    msg!(
        "EVENT:Unstaked:{{\"user\":\"{}\",\"amount\":{},\"user_balance_before\":{},\"user_balance_after\":{},\"total_staked_after\":{},\"timestamp\":{},\"slot\":{}}}",
        user.key,
        args.amount,
        balance_before,
        balance_after,
        total_after,
        clock.unix_timestamp,
        clock.slot,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Pause / Unpause (discriminators 3 / 4)
// ---------------------------------------------------------------------------
// Accounts:
//   0. [signer]   owner
//   1. [writable] global_state PDA

fn process_set_paused(program_id: &Pubkey, accounts: &[AccountInfo], paused: bool) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let state_account = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(state_account)?;

    let mut state = load_global_state(program_id, state_account)?;

    // Ownership first: a stranger must not learn the current state from the error.
    if *owner.key != state.owner {
        return Err(StakingError::Unauthorized.into());
    }
    if paused && state.paused {
        return Err(StakingError::AlreadyPaused.into());
    }
    if !paused && !state.paused {
        return Err(StakingError::NotPaused.into());
    }

    state.paused = paused;
    state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

    let clock = Clock::get()?;
    let event = if paused { "StakingPaused" } else { "StakingUnpaused" };
    msg!(
        "EVENT:{}:{{\"owner\":\"{}\",\"timestamp\":{},\"slot\":{}}}",
        event,
        owner.key,
        clock.unix_timestamp,
        clock.slot,
    );

    Ok(())
}
