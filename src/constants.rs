use lazy_static::lazy_static;
use web3::signing::keccak256;

use crate::types::{
	Bytes,
	Locksroot,
};

/// Placeholder for a secret that has not been chosen yet.
pub const ABSENT_SECRET: Bytes = Bytes(vec![]);

pub const SECRET_LENGTH: u8 = 32;

pub const DEFAULT_REVEAL_TIMEOUT: u64 = 50;

pub const DEFAULT_SETTLE_TIMEOUT: u64 = 500;

pub const DEFAULT_NUMBER_OF_BLOCK_CONFIRMATIONS: u64 = 5;

pub const DEFAULT_WAIT_BEFORE_LOCK_REMOVAL: u64 = 2 * DEFAULT_NUMBER_OF_BLOCK_CONFIRMATIONS;

pub const MAXIMUM_PENDING_TRANSFERS: usize = 160;

/// Hard cap on the total mediation fee, as a fraction of the paid amount.
pub const MAX_MEDIATION_FEE_PERC: (u32, u32) = (20, 100);

pub const DEFAULT_MEDIATION_FEE_MARGIN: (u32, u32) = (3, 100);

pub const PAYMENT_AMOUNT_BASED_FEE_MARGIN: (u32, u32) = (5, 10000);

lazy_static! {
	pub static ref LOCKSROOT_OF_NO_LOCKS: Locksroot = Locksroot::from_slice(&keccak256(&[]));
}
