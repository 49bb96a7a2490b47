#![warn(clippy::missing_docs_in_private_items)]

/// Pending-locks bookkeeping and locksroot computation.
pub(crate) mod utils;
/// Balance-proof, lock and refund validation.
pub(crate) mod validators;
/// Channel queries.
pub(crate) mod views;

use self::utils::{
	compute_locks_with,
	compute_locks_without,
	compute_locksroot,
};
use crate::{
	types::{
		Address,
		BalanceProofState,
		BlockExpiration,
		BlockNumber,
		ChannelEndState,
		ChannelIdentifier,
		ChannelState,
		ChannelStatus,
		Event,
		HashTimeLockState,
		InvalidReceivedLockExpired,
		InvalidReceivedTransferRefund,
		LockedTransferState,
		MessageIdentifier,
		PaymentIdentifier,
		PendingLocksState,
		Random,
		ReceiveLockExpired,
		RouteState,
		Secret,
		SecretHash,
		SendLockExpired,
		SendLockedTransfer,
		SendMessageEventInner,
		SendProcessed,
		SendUnlock,
		TokenAmount,
		UnlockPartialProofState,
	},
	views as global_views,
};

/// Delete locks which have not been claimed with a secret yet.
fn delete_unclaimed_lock(end_state: &mut ChannelEndState, secrethash: SecretHash) {
	end_state.secrethashes_to_lockedlocks.remove(&secrethash);
	end_state.secrethashes_to_unlockedlocks.remove(&secrethash);
}

/// Delete a lock regardless of how it was claimed.
fn delete_lock(end_state: &mut ChannelEndState, secrethash: SecretHash) {
	delete_unclaimed_lock(end_state, secrethash);
	end_state.secrethashes_to_onchain_unlockedlocks.remove(&secrethash);
}

/// Check if the lock with `secrethash` exists on either side of the channel.
pub(super) fn lock_exists_in_either_channel_side(
	channel_state: &ChannelState,
	secrethash: SecretHash,
) -> bool {
	validators::is_lock_pending(&channel_state.our_state, secrethash) ||
		validators::is_lock_pending(&channel_state.partner_state, secrethash)
}

/// Build the lock expired message for one of our own expired locks.
fn create_send_expired_lock(
	sender_end_state: &mut ChannelEndState,
	locked_lock: HashTimeLockState,
	pseudo_random_number_generator: &mut Random,
	channel_identifier: ChannelIdentifier,
	recipient: Address,
) -> (Option<SendLockExpired>, Option<PendingLocksState>) {
	let locked_amount = sender_end_state.locked_amount();
	let balance_proof = match &sender_end_state.balance_proof {
		Some(bp) => bp.clone(),
		None => return (None, None),
	};
	let updated_locked_amount = locked_amount - locked_lock.amount;
	let transferred_amount = balance_proof.transferred_amount;
	let secrethash = locked_lock.secrethash;
	let pending_locks = match compute_locks_without(&sender_end_state.pending_locks, &locked_lock)
	{
		Some(locks) => locks,
		None => return (None, None),
	};

	let nonce = views::get_next_nonce(sender_end_state);
	let locksroot = compute_locksroot(&pending_locks);
	let balance_proof = BalanceProofState {
		nonce,
		transferred_amount,
		locked_amount: updated_locked_amount,
		locksroot,
		channel_identifier,
		sender: None,
	};
	let send_lock_expired = SendLockExpired {
		inner: SendMessageEventInner {
			recipient,
			message_identifier: pseudo_random_number_generator.next(),
		},
		balance_proof,
		secrethash,
	};

	(Some(send_lock_expired), Some(pending_locks))
}

/// Remove one of our own expired locks and produce the message announcing
/// that to the partner.
pub(super) fn send_lock_expired(
	mut channel_state: ChannelState,
	locked_lock: HashTimeLockState,
	pseudo_random_number_generator: &mut Random,
) -> (ChannelState, Vec<SendLockExpired>) {
	if channel_state.status != ChannelStatus::Opened {
		return (channel_state, vec![])
	}

	let secrethash = locked_lock.secrethash;
	let channel_identifier = channel_state.channel_identifier;
	let recipient = channel_state.partner_state.address;
	let (send_lock_expired, pending_locks) = create_send_expired_lock(
		&mut channel_state.our_state,
		locked_lock,
		pseudo_random_number_generator,
		channel_identifier,
		recipient,
	);

	let events = if let (Some(send_lock_expired), Some(pending_locks)) =
		(send_lock_expired, pending_locks)
	{
		channel_state.our_state.pending_locks = pending_locks;
		channel_state.our_state.balance_proof = Some(send_lock_expired.balance_proof.clone());
		channel_state.our_state.nonce = send_lock_expired.balance_proof.nonce;

		delete_unclaimed_lock(&mut channel_state.our_state, secrethash);

		vec![send_lock_expired]
	} else {
		vec![]
	};

	(channel_state, events)
}

/// Build the unlock message releasing `lock` with `secret`.
fn create_unlock(
	channel_state: &mut ChannelState,
	message_identifier: MessageIdentifier,
	payment_identifier: PaymentIdentifier,
	secret: Secret,
	lock: &HashTimeLockState,
	block_number: BlockNumber,
) -> Result<(SendUnlock, PendingLocksState), String> {
	if channel_state.status != ChannelStatus::Opened {
		return Err("Channel is not open".to_owned())
	}

	if !validators::is_lock_pending(&channel_state.our_state, lock.secrethash) {
		return Err("Caller must ensure the lock is pending".to_owned())
	}

	let expired = validators::is_lock_expired(
		&channel_state.our_state,
		lock,
		block_number,
		lock.expiration,
	)
	.is_ok();
	if expired {
		return Err("Lock expired".to_owned())
	}

	let our_balance_proof = match &channel_state.our_state.balance_proof {
		Some(balance_proof) => balance_proof,
		None => return Err("No transfers exist on our state".to_owned()),
	};

	let transferred_amount = lock.amount + our_balance_proof.transferred_amount;
	let pending_locks = match compute_locks_without(&channel_state.our_state.pending_locks, lock) {
		Some(pending_locks) => pending_locks,
		None => return Err("Lock is pending, it must be in the pending locks".to_owned()),
	};

	let locksroot = compute_locksroot(&pending_locks);
	let token_address = channel_state.token_address;
	let recipient = channel_state.partner_state.address;
	let locked_amount = channel_state.our_state.locked_amount() - lock.amount;
	let nonce = views::get_next_nonce(&channel_state.our_state);
	channel_state.our_state.nonce = nonce;

	let balance_proof = BalanceProofState {
		nonce,
		transferred_amount,
		locked_amount,
		locksroot,
		channel_identifier: channel_state.channel_identifier,
		sender: None,
	};

	let unlock_lock = SendUnlock {
		inner: SendMessageEventInner { recipient, message_identifier },
		payment_identifier,
		token_address,
		balance_proof,
		secret,
		secrethash: lock.secrethash,
	};

	Ok((unlock_lock, pending_locks))
}

/// Release one of our own locks whose secret became known.
pub(super) fn send_unlock(
	channel_state: &mut ChannelState,
	message_identifier: MessageIdentifier,
	payment_identifier: PaymentIdentifier,
	secret: Secret,
	secrethash: SecretHash,
	block_number: BlockNumber,
) -> Result<SendUnlock, String> {
	let lock = match views::get_lock(&channel_state.our_state, secrethash) {
		Some(lock) => lock,
		None => return Err("Caller must ensure the lock exists".to_owned()),
	};

	let (unlock, pending_locks) = create_unlock(
		channel_state,
		message_identifier,
		payment_identifier,
		secret,
		&lock,
		block_number,
	)?;

	channel_state.our_state.balance_proof = Some(unlock.balance_proof.clone());
	channel_state.our_state.pending_locks = pending_locks;

	delete_lock(&mut channel_state.our_state, lock.secrethash);

	Ok(unlock)
}

/// Move a claimed lock into the on-chain unlocked table of one channel end.
fn register_onchain_secret_endstate(
	end_state: &mut ChannelEndState,
	secret: Secret,
	secrethash: SecretHash,
	should_delete_lock: bool,
) {
	if let Some(lock) = end_state.secrethashes_to_lockedlocks.get(&secrethash).cloned() {
		end_state.secrethashes_to_onchain_unlockedlocks.insert(
			secrethash,
			UnlockPartialProofState {
				secret,
				amount: lock.amount,
				expiration: lock.expiration,
				secrethash,
				encoded: lock.encoded.clone(),
				lock,
			},
		);

		if should_delete_lock {
			end_state.secrethashes_to_lockedlocks.remove(&secrethash);
		}
	}
}

/// Record a secret that was registered on-chain on both channel ends.
pub(super) fn register_onchain_secret(
	channel_state: &mut ChannelState,
	secret: Secret,
	secrethash: SecretHash,
	should_delete_lock: bool,
) {
	register_onchain_secret_endstate(
		&mut channel_state.our_state,
		secret.clone(),
		secrethash,
		should_delete_lock,
	);
	register_onchain_secret_endstate(
		&mut channel_state.partner_state,
		secret,
		secrethash,
		should_delete_lock,
	);
}

/// Build a locked transfer message committing `amount` behind `secrethash`.
#[allow(clippy::too_many_arguments)]
fn create_locked_transfer(
	channel_state: &mut ChannelState,
	initiator: Address,
	target: Address,
	amount: TokenAmount,
	expiration: BlockExpiration,
	secret: Option<Secret>,
	secrethash: SecretHash,
	message_identifier: MessageIdentifier,
	payment_identifier: PaymentIdentifier,
	route_states: Vec<RouteState>,
) -> Result<(SendLockedTransfer, PendingLocksState), String> {
	if amount >
		global_views::channel_distributable(
			&channel_state.our_state,
			&channel_state.partner_state,
		) {
		return Err("Caller must make sure there is enough balance".to_owned())
	}

	if channel_state.status != ChannelStatus::Opened {
		return Err("Caller must make sure the channel is open".to_owned())
	}

	let lock = HashTimeLockState::create(amount, expiration, secrethash);
	let pending_locks = match compute_locks_with(&channel_state.our_state.pending_locks, &lock) {
		Some(pending_locks) => pending_locks,
		None => return Err("Caller must make sure the lock isn't used twice".to_owned()),
	};

	let locksroot = compute_locksroot(&pending_locks);

	let transferred_amount = match &channel_state.our_state.balance_proof {
		Some(balance_proof) => balance_proof.transferred_amount,
		None => TokenAmount::zero(),
	};

	if transferred_amount.checked_add(amount).is_none() {
		return Err("Caller must make sure the result won't overflow".to_owned())
	}

	let token = channel_state.token_address;
	let locked_amount = channel_state.our_state.locked_amount() + amount;
	let nonce = views::get_next_nonce(&channel_state.our_state);
	let balance_proof = BalanceProofState {
		nonce,
		transferred_amount,
		locked_amount,
		locksroot,
		channel_identifier: channel_state.channel_identifier,
		sender: None,
	};

	let locked_transfer = LockedTransferState {
		payment_identifier,
		token,
		lock,
		initiator,
		target,
		message_identifier,
		route_states,
		balance_proof,
		secret,
	};

	let recipient = channel_state.partner_state.address;
	let locked_transfer_event = SendLockedTransfer {
		inner: SendMessageEventInner { recipient, message_identifier },
		transfer: locked_transfer,
	};

	Ok((locked_transfer_event, pending_locks))
}

/// Create and book a locked transfer on the channel.
#[allow(clippy::too_many_arguments)]
pub(super) fn send_locked_transfer(
	mut channel_state: ChannelState,
	initiator: Address,
	target: Address,
	amount: TokenAmount,
	expiration: BlockExpiration,
	secret: Option<Secret>,
	secrethash: SecretHash,
	message_identifier: MessageIdentifier,
	payment_identifier: PaymentIdentifier,
	route_states: Vec<RouteState>,
) -> Result<(ChannelState, SendLockedTransfer), String> {
	let (locked_transfer, pending_locks) = create_locked_transfer(
		&mut channel_state,
		initiator,
		target,
		amount,
		expiration,
		secret,
		secrethash,
		message_identifier,
		payment_identifier,
		route_states,
	)?;

	let transfer = locked_transfer.transfer.clone();
	let lock = transfer.lock.clone();
	channel_state.our_state.balance_proof = Some(transfer.balance_proof.clone());
	channel_state.our_state.nonce = transfer.balance_proof.nonce;
	channel_state.our_state.pending_locks = pending_locks;
	channel_state.our_state.secrethashes_to_lockedlocks.insert(lock.secrethash, lock);

	Ok((channel_state, locked_transfer))
}

/// Apply a lock expired message from the partner.
///
/// An invalid message leaves the channel untouched and is answered with an
/// error event instead of an error.
pub(super) fn handle_receive_lock_expired(
	channel_state: &mut ChannelState,
	state_change: ReceiveLockExpired,
	block_number: BlockNumber,
) -> Vec<Event> {
	let sender = match state_change.balance_proof.sender {
		Some(sender) => sender,
		None =>
			return vec![InvalidReceivedLockExpired {
				secrethash: state_change.secrethash,
				reason: "The lock expired message's sender is unknown".to_owned(),
			}
			.into()],
	};

	match validators::is_valid_lock_expired(channel_state, &state_change, block_number) {
		Ok(pending_locks) => {
			let nonce = state_change.balance_proof.nonce;
			channel_state.partner_state.balance_proof = Some(state_change.balance_proof);
			channel_state.partner_state.nonce = nonce;
			channel_state.partner_state.pending_locks = pending_locks;

			delete_unclaimed_lock(&mut channel_state.partner_state, state_change.secrethash);

			vec![SendProcessed {
				inner: SendMessageEventInner {
					recipient: sender,
					message_identifier: state_change.message_identifier,
				},
			}
			.into()]
		},
		Err(e) => vec![InvalidReceivedLockExpired {
			secrethash: state_change.secrethash,
			reason: e,
		}
		.into()],
	}
}

/// Apply a refund transfer that cancels the current route.
///
/// The refund is a locked transfer in the opposite direction carrying the
/// same lock. Returns whether the channel accepted it, plus the events to
/// emit either way.
pub(super) fn handle_receive_refund_cancel_route(
	channel_state: &mut ChannelState,
	refund_transfer: LockedTransferState,
	received_transfer: &LockedTransferState,
) -> (bool, Vec<Event>) {
	match validators::is_valid_refund(channel_state, &refund_transfer, received_transfer) {
		Ok(pending_locks) => {
			let sender = channel_state.partner_state.address;
			channel_state.partner_state.balance_proof =
				Some(refund_transfer.balance_proof.clone());
			channel_state.partner_state.nonce = refund_transfer.balance_proof.nonce;
			channel_state.partner_state.pending_locks = pending_locks;

			let lock = refund_transfer.lock;
			channel_state.partner_state.secrethashes_to_lockedlocks.insert(lock.secrethash, lock);

			(
				true,
				vec![SendProcessed {
					inner: SendMessageEventInner {
						recipient: sender,
						message_identifier: refund_transfer.message_identifier,
					},
				}
				.into()],
			)
		},
		Err(reason) => (
			false,
			vec![InvalidReceivedTransferRefund {
				payment_identifier: received_transfer.payment_identifier,
				reason,
			}
			.into()],
		),
	}
}

/// Structural check consumed by the payment machine before a refund is
/// applied.
pub(super) fn refund_transfer_matches_received(
	refund_transfer: &LockedTransferState,
	transfer: &LockedTransferState,
) -> bool {
	validators::refund_transfer_matches_received(refund_transfer, transfer)
}
