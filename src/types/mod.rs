#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeMap;

use rand_chacha::{
	rand_core::{
		RngCore,
		SeedableRng,
	},
	ChaChaRng,
};
use serde::{
	Deserialize,
	Serialize,
};
pub use web3::types::{
	Address,
	Bytes,
	H256,
	U256,
	U64,
};

/// State object types.
mod state;
pub use state::*;

/// Event types.
mod event;
pub use event::*;

/// State change types.
mod state_change;
pub use state_change::*;

/// Alias type for balance proof data.
pub type BalanceProofData = (Locksroot, Nonce, TokenAmount, LockedAmount);

/// Alias type for block expiration.
pub type BlockExpiration = U64;

/// Alias type for block number.
pub type BlockNumber = U64;

/// Alias type for block hash.
pub type BlockHash = H256;

/// Alias type for channel identifier.
pub type ChannelIdentifier = U256;

/// Alias type for encoded lock.
pub type EncodedLock = Bytes;

/// Alias type for fee amount.
pub type FeeAmount = U256;

/// Alias type for locked amount.
pub type LockedAmount = U256;

/// Alias type for lock timeout.
pub type LockTimeout = U64;

/// Alias type for locksroot.
pub type Locksroot = H256;

/// Alias type for message identifier.
pub type MessageIdentifier = u64;

/// Alias type for nonce.
pub type Nonce = U256;

/// Alias type for payment identifier.
pub type PaymentIdentifier = U64;

/// Alias type for payment network identifier.
pub type PaymentNetworkIdentifier = Address;

/// Alias type for reveal timeout.
pub type RevealTimeout = U64;

/// Alias type for secret.
pub type Secret = Bytes;

/// Alias type for secret hash.
pub type SecretHash = H256;

/// Alias type for settle timeout.
pub type SettleTimeout = U64;

/// Alias type for token address.
pub type TokenAddress = Address;

/// Alias type for token amount.
pub type TokenAmount = U256;

/// Alias type for token network identifier.
pub type TokenNetworkIdentifier = Address;

/// Channel states owned by the channel collaborator, keyed by channel
/// identifier. An ordered map so that broadcast dispatch and replay iterate
/// channels in a stable order.
pub type ChannelMap = BTreeMap<ChannelIdentifier, ChannelState>;

/// The injected pseudo random number generator.
///
/// Deterministic and serializable so that a host can persist its state and
/// replay transitions byte-for-byte.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Random(ChaChaRng);

impl Random {
	pub fn new() -> Self {
		Self(ChaChaRng::seed_from_u64(0))
	}

	pub fn seeded(seed: u64) -> Self {
		Self(ChaChaRng::seed_from_u64(seed))
	}

	pub fn next(&mut self) -> u64 {
		self.0.next_u64()
	}
}

impl Default for Random {
	fn default() -> Self {
		Self::new()
	}
}
