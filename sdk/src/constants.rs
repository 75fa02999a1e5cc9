//! Staking Ledger program ids, PDA seeds and instruction discriminators.

use solana_program::pubkey::Pubkey;

// ── Program IDs ─────────────────────────────────────────────────────────────

/// Mainnet deployment (program built with `--features mainnet`).
pub const MAINNET_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("4D9WKeKXKCEjzZfuLgU3H7P9J1cJ1HZ2fPURAX8ceqKc");

/// Testnet / devnet deployment (program built with `--features testnet`).
pub const TESTNET_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("5HWYY9fuyvCrvV66GCg5hPbf7XARCcybuQrdJGGEbEVH");

/// Default build, used by local validators and the test suite.
pub const LOCALNET_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("StakLedger111111111111111111111111111111111");

// ── PDA Seeds ───────────────────────────────────────────────────────────────

pub const GLOBAL_STATE_SEED: &[u8] = b"state";
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault";
pub const USER_STAKE_SEED: &[u8] = b"user_stake";

// ── Instruction Discriminators ──────────────────────────────────────────────

pub const IX_INITIALIZE: u8 = 0;
pub const IX_STAKE: u8 = 1;
pub const IX_UNSTAKE: u8 = 2;
pub const IX_PAUSE: u8 = 3;
pub const IX_UNPAUSE: u8 = 4;
