#![warn(clippy::missing_docs_in_private_items)]

use crate::{
	constants::DEFAULT_NUMBER_OF_BLOCK_CONFIRMATIONS,
	types::{
		BlockExpiration,
		BlockNumber,
		ChannelEndState,
		HashTimeLockState,
		LockTimeout,
		Nonce,
		RevealTimeout,
		SecretHash,
	},
};

/// Returns the next usable nonce for messages sent by `end_state`.
pub(crate) fn get_next_nonce(end_state: &ChannelEndState) -> Nonce {
	end_state.next_nonce()
}

/// Returns the number of blocks that is safe to wait before a new lock
/// expires.
pub(crate) fn get_safe_initial_expiration(
	block_number: BlockNumber,
	reveal_timeout: RevealTimeout,
	lock_timeout: Option<LockTimeout>,
) -> BlockExpiration {
	if let Some(lock_timeout) = lock_timeout {
		return block_number + lock_timeout
	}

	block_number + reveal_timeout * 2u64
}

/// The block after which the receiver of a lock accepts its removal.
pub(crate) fn get_receiver_expiration_threshold(expiration: BlockExpiration) -> BlockExpiration {
	expiration + DEFAULT_NUMBER_OF_BLOCK_CONFIRMATIONS
}

/// Returns the lock for a secrethash, claimed or not.
pub(crate) fn get_lock(
	end_state: &ChannelEndState,
	secrethash: SecretHash,
) -> Option<HashTimeLockState> {
	let mut lock = end_state.secrethashes_to_lockedlocks.get(&secrethash);
	if lock.is_none() {
		lock = end_state.secrethashes_to_unlockedlocks.get(&secrethash).map(|lock| &lock.lock);
	}
	if lock.is_none() {
		lock = end_state
			.secrethashes_to_onchain_unlockedlocks
			.get(&secrethash)
			.map(|lock| &lock.lock);
	}
	lock.cloned()
}
