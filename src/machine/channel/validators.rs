#![warn(clippy::missing_docs_in_private_items)]

use super::{
	utils::{
		compute_locks_with,
		compute_locks_without,
		compute_locksroot,
	},
	views::{
		get_next_nonce,
		get_receiver_expiration_threshold,
	},
};
use crate::{
	constants::MAXIMUM_PENDING_TRANSFERS,
	types::{
		BalanceProofState,
		BlockExpiration,
		BlockNumber,
		ChannelEndState,
		ChannelState,
		ChannelStatus,
		HashTimeLockState,
		LockedTransferState,
		PendingLocksState,
		ReceiveLockExpired,
		SecretHash,
	},
	views,
};

/// Returns Ok if the lock has already expired past the given threshold.
pub(crate) fn is_lock_expired(
	end_state: &ChannelEndState,
	lock: &HashTimeLockState,
	block_number: BlockNumber,
	lock_expiration_threshold: BlockExpiration,
) -> Result<(), String> {
	let secret_registered_on_chain =
		end_state.secrethashes_to_onchain_unlockedlocks.contains_key(&lock.secrethash);

	if secret_registered_on_chain {
		return Err("Lock has been unlocked on-chain".to_owned())
	}
	if block_number < lock_expiration_threshold {
		return Err(format!(
			"Current block number ({}) is not larger than \
			 lock.expiration + confirmation blocks ({})",
			block_number, lock_expiration_threshold
		))
	}

	Ok(())
}

/// Returns true if any pending lock with the provided `secrethash` is
/// unclaimed.
pub(crate) fn is_lock_pending(end_state: &ChannelEndState, secrethash: SecretHash) -> bool {
	end_state.secrethashes_to_lockedlocks.contains_key(&secrethash) ||
		end_state.secrethashes_to_unlockedlocks.contains_key(&secrethash) ||
		end_state.secrethashes_to_onchain_unlockedlocks.contains_key(&secrethash)
}

/// Validates that a received balance proof can back channel operations.
///
/// Signature recovery is the host's duty, so the claimed sender stands in
/// for the recovered one here.
pub(crate) fn is_balance_proof_usable(
	received_balance_proof: &BalanceProofState,
	channel_state: &ChannelState,
	sender_state: &ChannelEndState,
) -> Result<(), String> {
	let expected_nonce = get_next_nonce(sender_state);

	if channel_state.status != ChannelStatus::Opened {
		return Err("The channel is already closed".to_owned())
	} else if received_balance_proof.channel_identifier != channel_state.channel_identifier {
		return Err("Channel identifier does not match".to_owned())
	} else if received_balance_proof
		.transferred_amount
		.checked_add(received_balance_proof.locked_amount)
		.is_none()
	{
		return Err("Balance proof total transferred amount would overflow on-chain".to_owned())
	} else if received_balance_proof.nonce != expected_nonce {
		return Err(format!(
			"Nonce did not change sequentially. Expected: {} got: {}",
			expected_nonce, received_balance_proof.nonce
		))
	} else if received_balance_proof.sender != Some(sender_state.address) {
		return Err("Balance proof sender does not match the channel partner".to_owned())
	}

	Ok(())
}

/// Shared validation for messages that add a lock to the sender's side.
pub(crate) fn valid_locked_transfer_check(
	channel_state: &ChannelState,
	sender_state: &ChannelEndState,
	receiver_state: &ChannelEndState,
	message: &'static str,
	received_balance_proof: &BalanceProofState,
	lock: &HashTimeLockState,
) -> Result<PendingLocksState, String> {
	let (_, _, current_transferred_amount, current_locked_amount) =
		sender_state.get_current_balanceproof();
	let distributable = views::channel_distributable(sender_state, receiver_state);
	let expected_locked_amount = current_locked_amount + lock.amount;

	if let Err(e) = is_balance_proof_usable(received_balance_proof, channel_state, sender_state) {
		return Err(format!("Invalid {} message. {}", message, e))
	}

	let pending_locks = match compute_locks_with(&sender_state.pending_locks, lock) {
		Some(pending_locks) => {
			if pending_locks.locks.len() > MAXIMUM_PENDING_TRANSFERS {
				return Err(format!(
					"Invalid {} message. Adding the transfer would exceed the allowed \
					 limit of {} pending transfers per channel.",
					message, MAXIMUM_PENDING_TRANSFERS
				))
			}
			pending_locks
		},
		None => return Err(format!("Invalid {} message. Same lock handled twice", message)),
	};

	let locksroot_with_lock = compute_locksroot(&pending_locks);
	if received_balance_proof.locksroot != locksroot_with_lock {
		return Err(format!(
			"Invalid {} message. Balance proof's locksroot didn't match. \
			 expected: {:?} got: {:?}",
			message, locksroot_with_lock, received_balance_proof.locksroot
		))
	} else if received_balance_proof.transferred_amount != current_transferred_amount {
		return Err(format!(
			"Invalid {} message. Balance proof's transferred_amount changed. \
			 expected: {} got: {}",
			message, current_transferred_amount, received_balance_proof.transferred_amount
		))
	} else if received_balance_proof.locked_amount != expected_locked_amount {
		return Err(format!(
			"Invalid {} message. Balance proof's locked_amount changed. \
			 expected: {} got: {}",
			message, expected_locked_amount, received_balance_proof.locked_amount
		))
	} else if lock.amount > distributable {
		return Err(format!(
			"Invalid {} message. Lock amount larger than the available distributable. \
			 Lock amount: {}, maximum distributable: {}",
			message, lock.amount, distributable
		))
	}

	Ok(pending_locks)
}

/// Validates a refund transfer against the transfer it refunds.
pub(crate) fn is_valid_refund(
	channel_state: &ChannelState,
	refund_transfer: &LockedTransferState,
	received_transfer: &LockedTransferState,
) -> Result<PendingLocksState, String> {
	let pending_locks = valid_locked_transfer_check(
		channel_state,
		&channel_state.partner_state,
		&channel_state.our_state,
		"RefundTransfer",
		&refund_transfer.balance_proof,
		&refund_transfer.lock,
	)?;

	if !refund_transfer_matches_received(refund_transfer, received_transfer) {
		return Err("Refund transfer did not match the received transfer".to_owned())
	}

	Ok(pending_locks)
}

/// Validates a lock expired message from the partner.
pub(crate) fn is_valid_lock_expired(
	channel_state: &ChannelState,
	state_change: &ReceiveLockExpired,
	block_number: BlockNumber,
) -> Result<PendingLocksState, String> {
	let secrethash = state_change.secrethash;
	let received_balance_proof = &state_change.balance_proof;
	let sender_state = &channel_state.partner_state;
	let receiver_state = &channel_state.our_state;

	let lock = sender_state.secrethashes_to_lockedlocks.get(&secrethash).or_else(|| {
		sender_state.secrethashes_to_unlockedlocks.get(&secrethash).map(|lock| &lock.lock)
	});

	let secret_registered_on_chain =
		sender_state.secrethashes_to_onchain_unlockedlocks.contains_key(&secrethash);
	let (_, _, current_transferred_amount, current_locked_amount) =
		sender_state.get_current_balanceproof();

	let (lock, expected_locked_amount) = match lock {
		Some(lock) => (lock, current_locked_amount - lock.amount),
		None =>
			return Err(format!(
				"Invalid LockExpired message. Lock with secrethash {} is not known",
				secrethash
			)),
	};

	let pending_locks = match compute_locks_without(&sender_state.pending_locks, lock) {
		Some(pending_locks) => pending_locks,
		None => return Err("Invalid LockExpired message. Same lock handled twice.".to_owned()),
	};

	if secret_registered_on_chain {
		return Err("Invalid LockExpired message. Lock was unlocked on-chain".to_owned())
	} else if let Err(e) =
		is_balance_proof_usable(received_balance_proof, channel_state, sender_state)
	{
		return Err(format!("Invalid LockExpired message. {}", e))
	}

	let locksroot_without_lock = compute_locksroot(&pending_locks);
	if let Err(e) = is_lock_expired(
		receiver_state,
		lock,
		block_number,
		get_receiver_expiration_threshold(lock.expiration),
	) {
		return Err(format!("Invalid LockExpired message. {}", e))
	} else if received_balance_proof.locksroot != locksroot_without_lock {
		return Err(format!(
			"Invalid LockExpired message. Balance proof's locksroot didn't match. \
			 expected {:?} got {:?}",
			locksroot_without_lock, received_balance_proof.locksroot
		))
	} else if received_balance_proof.transferred_amount != current_transferred_amount {
		return Err(format!(
			"Invalid LockExpired message. Balance proof's transferred amount changed. \
			 expected {} got {}",
			current_transferred_amount, received_balance_proof.transferred_amount
		))
	} else if received_balance_proof.locked_amount != expected_locked_amount {
		return Err(format!(
			"Invalid LockExpired message. Balance proof's locked amount changed. \
			 expected {} got {}",
			expected_locked_amount, received_balance_proof.locked_amount
		))
	}

	Ok(pending_locks)
}

/// Checks that a refund transfer carries the same terms as the transfer it
/// refunds and does not come from the payment target itself.
pub(crate) fn refund_transfer_matches_received(
	refund_transfer: &LockedTransferState,
	transfer: &LockedTransferState,
) -> bool {
	if let Some(sender) = refund_transfer.balance_proof.sender {
		if sender == transfer.target {
			return false
		}
	}

	transfer.payment_identifier == refund_transfer.payment_identifier &&
		transfer.lock.amount == refund_transfer.lock.amount &&
		transfer.lock.secrethash == refund_transfer.lock.secrethash &&
		transfer.target == refund_transfer.target &&
		transfer.lock.expiration == refund_transfer.lock.expiration &&
		transfer.token == refund_transfer.token
}
