#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeMap;

use derive_more::Display;
use serde::{
	Deserialize,
	Serialize,
};

use crate::{
	constants::{
		LOCKSROOT_OF_NO_LOCKS,
		MAXIMUM_PENDING_TRANSFERS,
	},
	hashing::hash_secret,
	types::{
		Address,
		BalanceProofData,
		BlockExpiration,
		Bytes,
		ChannelIdentifier,
		EncodedLock,
		FeeAmount,
		LockTimeout,
		LockedAmount,
		Locksroot,
		MessageIdentifier,
		Nonce,
		PaymentIdentifier,
		PaymentNetworkIdentifier,
		RevealTimeout,
		Secret,
		SecretHash,
		SendSecretReveal,
		SettleTimeout,
		TokenAddress,
		TokenAmount,
		TokenNetworkIdentifier,
	},
	views,
};

/// Lifecycle of a single route attempt. Forward-only.
#[derive(Copy, Clone, Display, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
	#[display(fmt = "pending")]
	Pending,
	#[display(fmt = "secret_requested")]
	SecretRequested,
	#[display(fmt = "secret_revealed")]
	SecretRevealed,
	#[display(fmt = "finalized")]
	Finalized,
	#[display(fmt = "cancelled")]
	Cancelled,
	#[display(fmt = "expired")]
	Expired,
}

/// The immutable intent of a payment: who pays whom, how much, on which
/// token network, locked behind which secret.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct TransferDescription {
	pub payment_network_identifier: PaymentNetworkIdentifier,
	pub token_network_identifier: TokenNetworkIdentifier,
	pub payment_identifier: PaymentIdentifier,
	pub amount: TokenAmount,
	pub initiator: Address,
	pub target: Address,
	pub secret: Secret,
	pub secrethash: SecretHash,
	pub lock_timeout: Option<LockTimeout>,
}

impl TransferDescription {
	/// Build a description whose secrethash is derived from `secret`, which
	/// keeps the two fields consistent by construction.
	#[allow(clippy::too_many_arguments)]
	pub fn with_secret(
		payment_network_identifier: PaymentNetworkIdentifier,
		token_network_identifier: TokenNetworkIdentifier,
		payment_identifier: PaymentIdentifier,
		amount: TokenAmount,
		initiator: Address,
		target: Address,
		secret: Secret,
		lock_timeout: Option<LockTimeout>,
	) -> Self {
		let secrethash = SecretHash::from_slice(&hash_secret(&secret.0));
		Self {
			payment_network_identifier,
			token_network_identifier,
			payment_identifier,
			amount,
			initiator,
			target,
			secret,
			secrethash,
			lock_timeout,
		}
	}

	/// Returns the same intent locked behind a fresh secret. Used after a
	/// refund, when the old secret must not be reused on the next route.
	pub fn replace_secret(&self, secret: Secret) -> Self {
		let mut description = self.clone();
		description.secrethash = SecretHash::from_slice(&hash_secret(&secret.0));
		description.secret = secret;
		description
	}
}

/// One try of a payment over one route.
///
/// `revealsecret` records the secret reveal sent to the target once a valid
/// secret request arrived. While it is absent the attempt may still be
/// cancelled; once present the secret is out and the attempt must run to
/// completion.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct RouteAttempt {
	pub route: RouteState,
	pub transfer_description: TransferDescription,
	pub channel_identifier: ChannelIdentifier,
	pub transfer: LockedTransferState,
	pub revealsecret: Option<SendSecretReveal>,
	pub received_secret_request: bool,
	pub status: AttemptStatus,
}

/// State of a payment for the initiator node.
///
/// A single payment may have multiple attempts, e.g. because a refund causes
/// another attempt to be started under a different secrethash. Attempts are
/// keyed by the secrethash of their sent lock; an ordered map keeps dispatch
/// and replay deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct PaymentState {
	pub initiator_transfers: BTreeMap<SecretHash, RouteAttempt>,
	pub cancelled_channels: Vec<ChannelIdentifier>,
}

/// A possible route towards the payment target. The channel identifier names
/// the channel with the first hop.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct RouteState {
	pub route: Vec<Address>,
	pub channel_identifier: ChannelIdentifier,
	pub estimated_fee: FeeAmount,
}

/// Represents a hash time lock.
#[derive(Default, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct HashTimeLockState {
	pub amount: TokenAmount,
	pub expiration: BlockExpiration,
	pub secrethash: SecretHash,
	pub encoded: EncodedLock,
}

impl HashTimeLockState {
	/// Creates an instance of `HashTimeLockState` along with its wire
	/// encoding.
	pub fn create(
		amount: TokenAmount,
		expiration: BlockExpiration,
		secrethash: SecretHash,
	) -> Self {
		let mut expiration_bytes = [0u8; 8];
		expiration.to_big_endian(&mut expiration_bytes);
		let mut amount_bytes = [0u8; 32];
		amount.to_big_endian(&mut amount_bytes);

		let mut data = expiration_bytes.to_vec();
		data.extend_from_slice(&amount_bytes);
		data.extend_from_slice(secrethash.as_bytes());
		Self { amount, expiration, secrethash, encoded: Bytes(data) }
	}
}

/// List of encoded locks committed to a channel end.
#[derive(Default, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct PendingLocksState {
	pub locks: Vec<EncodedLock>,
}

/// Stores a lock along with its unlocking secret.
#[derive(Default, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct UnlockPartialProofState {
	pub lock: HashTimeLockState,
	pub secret: Secret,
	pub amount: TokenAmount,
	pub expiration: BlockExpiration,
	pub secrethash: SecretHash,
	pub encoded: EncodedLock,
}

/// Proof of a channel balance exchanged with every balance-changing message.
///
/// Key management lives outside this crate, so the proof carries the claimed
/// sender instead of a recoverable signature; the host is responsible for
/// verifying signatures before feeding messages in.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct BalanceProofState {
	pub nonce: Nonce,
	pub transferred_amount: TokenAmount,
	pub locked_amount: LockedAmount,
	pub locksroot: Locksroot,
	pub channel_identifier: ChannelIdentifier,
	pub sender: Option<Address>,
}

/// A pending mediated transfer.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct LockedTransferState {
	pub payment_identifier: PaymentIdentifier,
	pub token: TokenAddress,
	pub lock: HashTimeLockState,
	pub initiator: Address,
	pub target: Address,
	pub message_identifier: MessageIdentifier,
	pub route_states: Vec<RouteState>,
	pub balance_proof: BalanceProofState,
	pub secret: Option<Secret>,
}

/// Variants of the channel status.
#[derive(Copy, Clone, Display, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
	#[display(fmt = "opened")]
	Opened,
	#[display(fmt = "closing")]
	Closing,
	#[display(fmt = "closed")]
	Closed,
	#[display(fmt = "settling")]
	Settling,
	#[display(fmt = "settled")]
	Settled,
	#[display(fmt = "unusable")]
	Unusable,
}

/// The state of one of the nodes in a two party channel.
#[derive(Default, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct ChannelEndState {
	pub address: Address,
	pub contract_balance: TokenAmount,
	pub secrethashes_to_lockedlocks: BTreeMap<SecretHash, HashTimeLockState>,
	pub secrethashes_to_unlockedlocks: BTreeMap<SecretHash, UnlockPartialProofState>,
	pub secrethashes_to_onchain_unlockedlocks: BTreeMap<SecretHash, UnlockPartialProofState>,
	pub balance_proof: Option<BalanceProofState>,
	pub pending_locks: PendingLocksState,
	pub nonce: Nonce,
}

impl ChannelEndState {
	/// Return an instance of `ChannelEndState`.
	pub fn new(address: Address) -> Self {
		Self { address, ..Default::default() }
	}

	/// Returns the next usable nonce.
	pub fn next_nonce(&self) -> Nonce {
		self.nonce + 1
	}

	/// Returns the number of pending transfers.
	pub fn count_pending_transfers(&self) -> usize {
		self.pending_locks.locks.len()
	}

	/// Returns the total amount locked by this end.
	pub fn locked_amount(&self) -> LockedAmount {
		let total_pending: TokenAmount = self
			.secrethashes_to_lockedlocks
			.values()
			.map(|lock| lock.amount)
			.fold(LockedAmount::zero(), |acc, x| acc.saturating_add(x));
		let total_unclaimed: TokenAmount = self
			.secrethashes_to_unlockedlocks
			.values()
			.map(|unlock| unlock.lock.amount)
			.fold(LockedAmount::zero(), |acc, x| acc.saturating_add(x));
		let total_unclaimed_onchain: TokenAmount = self
			.secrethashes_to_onchain_unlockedlocks
			.values()
			.map(|unlock| unlock.lock.amount)
			.fold(LockedAmount::zero(), |acc, x| acc.saturating_add(x));
		total_pending + total_unclaimed + total_unclaimed_onchain
	}

	/// Returns the latest balance proof data.
	pub fn get_current_balanceproof(&self) -> BalanceProofData {
		match &self.balance_proof {
			Some(bp) => (bp.locksroot, bp.nonce, bp.transferred_amount, bp.locked_amount),
			None => (*LOCKSROOT_OF_NO_LOCKS, Nonce::zero(), TokenAmount::zero(), LockedAmount::zero()),
		}
	}

	/// Returns true if the amount after unlock does not overflow the
	/// on-chain accounting.
	pub fn is_valid_amount(&self, amount: TokenAmount) -> bool {
		let (_, _, transferred_amount, locked_amount) = self.get_current_balanceproof();
		transferred_amount
			.checked_add(locked_amount)
			.and_then(|total| total.checked_add(amount))
			.is_some()
	}
}

/// The state of a channel, as observed by this crate.
///
/// Channel states are owned by the channel collaborator. The payment machine
/// borrows them through the `ChannelMap`, applies the collaborator's handlers
/// and writes updated copies back.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct ChannelState {
	pub channel_identifier: ChannelIdentifier,
	pub payment_network_identifier: PaymentNetworkIdentifier,
	pub token_network_identifier: TokenNetworkIdentifier,
	pub token_address: TokenAddress,
	pub reveal_timeout: RevealTimeout,
	pub settle_timeout: SettleTimeout,
	pub our_state: ChannelEndState,
	pub partner_state: ChannelEndState,
	pub status: ChannelStatus,
}

impl ChannelState {
	/// Returns true if a channel can carry a new transfer of `amount`.
	pub fn is_usable_for_new_transfer(
		&self,
		amount: TokenAmount,
		lock_timeout: Option<LockTimeout>,
	) -> bool {
		let pending_transfers = self.our_state.count_pending_transfers();
		let distributable = views::channel_distributable(&self.our_state, &self.partner_state);
		let lock_timeout_valid = match lock_timeout {
			Some(lock_timeout) =>
				lock_timeout <= self.settle_timeout && lock_timeout > self.reveal_timeout,
			None => true,
		};
		let is_valid_settle_timeout = self.settle_timeout >= self.reveal_timeout * 2u64;

		if self.status != ChannelStatus::Opened {
			return false
		}

		if !is_valid_settle_timeout {
			return false
		}

		if pending_transfers >= MAXIMUM_PENDING_TRANSFERS {
			return false
		}

		if amount > distributable {
			return false
		}

		if !self.our_state.is_valid_amount(amount) {
			return false
		}

		lock_timeout_valid
	}
}
