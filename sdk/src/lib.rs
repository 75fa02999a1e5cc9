//! Staking Ledger SDK: program ids, PDA helpers, instruction builders and account decoders.

pub mod constants;
pub mod staking;
pub mod state;
