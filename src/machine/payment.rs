use std::collections::BTreeMap;

use super::{
	attempt,
	channel,
};
use crate::{
	errors::StateTransitionError,
	types::{
		ActionCancelPayment,
		ActionInitInitiator,
		AttemptStatus,
		Block,
		BlockNumber,
		ChannelMap,
		ContractReceiveSecretReveal,
		Event,
		PaymentSentFailed,
		PaymentState,
		Random,
		ReceiveLockExpired,
		ReceiveSecretRequest,
		ReceiveSecretReveal,
		ReceiveTransferRefundCancelRoute,
		RouteAttempt,
		RouteState,
		SecretHash,
		StateChange,
		TransferDescription,
		UnlockClaimFailed,
		UnlockFailed,
	},
	views,
};

pub(super) type TransitionResult = std::result::Result<PaymentTransition, StateTransitionError>;

/// The outcome of dispatching one state change to a payment.
///
/// `new_state` is absent once the payment is retired: either it never
/// started, or its last route attempt ended.
#[derive(Debug)]
pub struct PaymentTransition {
	pub new_state: Option<PaymentState>,
	pub events: Vec<Event>,
}

/// A route attempt is only cancellable until the secret left this node.
fn can_cancel(attempt: &RouteAttempt) -> bool {
	attempt.revealsecret.is_none()
}

/// The events announcing that the current route was abandoned.
fn events_for_cancel_current_route(transfer_description: &TransferDescription) -> Vec<Event> {
	vec![UnlockFailed {
		identifier: transfer_description.payment_identifier,
		secrethash: transfer_description.secrethash,
		reason: "route was canceled".to_owned(),
	}
	.into()]
}

/// Abandon the route of the attempt stored under `secrethash`.
///
/// The channel is blacklisted for later route selection and the attempt is
/// marked cancelled; whether it is also dropped from the mapping is the
/// caller's decision.
fn cancel_current_route(payment_state: &mut PaymentState, secrethash: &SecretHash) -> Vec<Event> {
	let (channel_identifier, transfer_description) = {
		let attempt = payment_state
			.initiator_transfers
			.get_mut(secrethash)
			.expect("Cancelled attempt must be in the mapping");
		assert!(can_cancel(attempt), "Cannot cancel a route after the secret is revealed");

		attempt.status = AttemptStatus::Cancelled;
		(attempt.channel_identifier, attempt.transfer_description.clone())
	};

	payment_state.cancelled_channels.push(channel_identifier);

	events_for_cancel_current_route(&transfer_description)
}

/// Dispatch a state change to the attempt stored under `secrethash`,
/// folding the attempt's fate back into the payment state.
fn subdispatch_to_attempt(
	mut payment_state: PaymentState,
	secrethash: SecretHash,
	state_change: StateChange,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let attempt = match payment_state.initiator_transfers.get(&secrethash) {
		Some(attempt) => attempt.clone(),
		None =>
			return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
	};

	let channel_state =
		match views::get_channel_by_identifier(channel_map, attempt.channel_identifier) {
			Some(channel_state) => channel_state.clone(),
			None =>
				return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
		};

	let sub_iteration = attempt::state_transition(
		attempt,
		state_change,
		channel_state,
		pseudo_random_number_generator,
		block_number,
	)?;

	if let Some(channel_state) = sub_iteration.channel_state {
		channel_map.insert(channel_state.channel_identifier, channel_state);
	}

	match sub_iteration.new_state {
		Some(attempt_state) if attempt_state.status == AttemptStatus::Finalized => {
			payment_state.initiator_transfers.remove(&secrethash);
		},
		Some(attempt_state) => {
			payment_state.initiator_transfers.insert(secrethash, attempt_state);
		},
		None => {
			payment_state.initiator_transfers.remove(&secrethash);
		},
	}

	Ok(PaymentTransition { new_state: Some(payment_state), events: sub_iteration.events })
}

/// Broadcast a state change to every attempt, in the order of a key
/// snapshot taken before dispatch.
fn subdispatch_to_all_attempts(
	mut payment_state: PaymentState,
	state_change: StateChange,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let mut events = vec![];

	let secrethashes: Vec<SecretHash> =
		payment_state.initiator_transfers.keys().cloned().collect();
	for secrethash in secrethashes {
		let sub_iteration = subdispatch_to_attempt(
			payment_state,
			secrethash,
			state_change.clone(),
			channel_map,
			pseudo_random_number_generator,
			block_number,
		)?;
		payment_state =
			sub_iteration.new_state.expect("Subdispatch always returns a payment state");
		events.extend(sub_iteration.events);
	}

	Ok(PaymentTransition { new_state: Some(payment_state), events })
}

/// Forward a new block to every attempt so expired locks get removed.
pub fn handle_block(
	payment_state: Option<PaymentState>,
	state_change: Block,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "Block state change should be accompanied by a valid payment state".to_owned(),
			}),
	};

	subdispatch_to_all_attempts(
		payment_state,
		StateChange::Block(state_change),
		channel_map,
		pseudo_random_number_generator,
		block_number,
	)
}

/// Start a payment by selecting the first route.
///
/// A second init for an existing payment is deliberately ignored; replaying
/// the request must not start a second set of transfers.
pub fn handle_init(
	payment_state: Option<PaymentState>,
	state_change: ActionInitInitiator,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let mut payment_state = payment_state;
	let mut events = vec![];
	if payment_state.is_none() {
		let (new_attempt, route_events) = attempt::try_new_route(
			channel_map,
			state_change.routes,
			&[],
			state_change.transfer,
			pseudo_random_number_generator,
			block_number,
		)?;

		events = route_events;

		if let Some(new_attempt) = new_attempt {
			let mut initiator_transfers = BTreeMap::new();
			initiator_transfers.insert(new_attempt.transfer.lock.secrethash, new_attempt);
			payment_state =
				Some(PaymentState { initiator_transfers, cancelled_channels: vec![] });
		}
	}

	Ok(PaymentTransition { new_state: payment_state, events })
}

/// Cancel every attempt that is still cancellable and fail the payment for
/// each of them. Attempts past the secret reveal must run to completion,
/// the counterparty can claim them on-chain.
pub fn handle_cancel_payment(
	payment_state: Option<PaymentState>,
	_state_change: ActionCancelPayment,
) -> TransitionResult {
	let mut payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "ActionCancelPayment state change should be accompanied by a valid payment \
				      state"
					.to_owned(),
			}),
	};

	let mut events = vec![];
	let secrethashes: Vec<SecretHash> =
		payment_state.initiator_transfers.keys().cloned().collect();
	for secrethash in secrethashes {
		let attempt = payment_state
			.initiator_transfers
			.get(&secrethash)
			.cloned()
			.expect("Snapshot key must be in the mapping");
		if !can_cancel(&attempt) {
			continue
		}

		let transfer_description = attempt.transfer_description;
		let mut cancel_events = cancel_current_route(&mut payment_state, &secrethash);

		payment_state.initiator_transfers.remove(&secrethash);

		let cancel = PaymentSentFailed {
			payment_network_identifier: transfer_description.payment_network_identifier,
			token_network_identifier: transfer_description.token_network_identifier,
			identifier: transfer_description.payment_identifier,
			target: transfer_description.target,
			reason: "user canceled payment".to_owned(),
		};
		cancel_events.push(cancel.into());

		events.extend(cancel_events);
	}

	Ok(PaymentTransition { new_state: Some(payment_state), events })
}

/// Cancel the current route if still possible and move the payment onto a
/// new route under the updated description.
fn maybe_try_new_route(
	mut payment_state: PaymentState,
	old_secrethash: &SecretHash,
	transfer_description: TransferDescription,
	available_routes: Vec<RouteState>,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> Result<(PaymentState, Vec<Event>), StateTransitionError> {
	let cancellable = payment_state
		.initiator_transfers
		.get(old_secrethash)
		.map(can_cancel)
		.unwrap_or(false);

	let mut events = vec![];
	if cancellable {
		events.extend(cancel_current_route(&mut payment_state, old_secrethash));

		let (new_attempt, route_events) = attempt::try_new_route(
			channel_map,
			available_routes,
			&payment_state.cancelled_channels,
			transfer_description,
			pseudo_random_number_generator,
			block_number,
		)?;
		events.extend(route_events);

		if let Some(new_attempt) = new_attempt {
			payment_state
				.initiator_transfers
				.insert(new_attempt.transfer.lock.secrethash, new_attempt);
		}
	}

	Ok((payment_state, events))
}

/// Apply a refund that cancels the current route and retry under the fresh
/// secret carried by the refund.
///
/// The refund's lock must match the sent lock exactly; anything else is
/// adversarial and dropped without effect. When the channel itself rejects
/// the refund, its error events are surfaced and the payment is unchanged.
pub fn handle_refund_cancel_route(
	payment_state: Option<PaymentState>,
	state_change: ReceiveTransferRefundCancelRoute,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let mut payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "ReceiveTransferRefundCancelRoute state change should be accompanied by a \
				      valid payment state"
					.to_owned(),
			}),
	};

	let secrethash = state_change.transfer.lock.secrethash;
	let attempt = match payment_state.initiator_transfers.get(&secrethash) {
		Some(attempt) => attempt.clone(),
		None =>
			return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
	};

	let channel_state =
		match views::get_channel_by_identifier(channel_map, attempt.channel_identifier) {
			Some(channel_state) => channel_state.clone(),
			None =>
				return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
		};

	let refund_transfer = state_change.transfer;
	let original_transfer = &attempt.transfer;

	let is_valid_lock = refund_transfer.lock.secrethash == original_transfer.lock.secrethash &&
		refund_transfer.lock.amount == original_transfer.lock.amount &&
		refund_transfer.lock.expiration == original_transfer.lock.expiration;

	let is_valid_refund =
		channel::refund_transfer_matches_received(&refund_transfer, original_transfer);

	if !is_valid_lock || !is_valid_refund {
		return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] })
	}

	let mut channel_state = channel_state;
	let (is_valid, channel_events) = channel::handle_receive_refund_cancel_route(
		&mut channel_state,
		refund_transfer,
		original_transfer,
	);

	let mut events = channel_events;
	if !is_valid {
		return Ok(PaymentTransition { new_state: Some(payment_state), events })
	}
	channel_map.insert(channel_state.channel_identifier, channel_state);

	// The old secret travelled with the refund chain, retry under the fresh
	// one disclosed by the counterparty.
	let transfer_description =
		attempt.transfer_description.replace_secret(state_change.secret);

	let (new_payment_state, route_events) = maybe_try_new_route(
		payment_state,
		&secrethash,
		transfer_description,
		state_change.routes,
		channel_map,
		pseudo_random_number_generator,
		block_number,
	)?;
	payment_state = new_payment_state;
	events.extend(route_events);

	Ok(PaymentTransition { new_state: Some(payment_state), events })
}

/// Apply a lock expired message for one of our attempts.
///
/// In a chain A -> B -> C, B may refund A and later also let the lock
/// expire; A must accept that expiry even though the plain initiator flow
/// never produces it. When the partner no longer holds the lock the claim
/// is reported as failed.
pub fn handle_lock_expired(
	payment_state: Option<PaymentState>,
	state_change: ReceiveLockExpired,
	channel_map: &mut ChannelMap,
	block_number: BlockNumber,
) -> TransitionResult {
	let payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "ReceiveLockExpired state change should be accompanied by a valid payment \
				      state"
					.to_owned(),
			}),
	};

	let attempt = match payment_state.initiator_transfers.get(&state_change.secrethash) {
		Some(attempt) => attempt.clone(),
		None =>
			return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
	};

	let mut channel_state =
		match views::get_channel_by_identifier(channel_map, attempt.channel_identifier) {
			Some(channel_state) => channel_state.clone(),
			None =>
				return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
		};

	let secrethash = attempt.transfer.lock.secrethash;
	let mut events =
		channel::handle_receive_lock_expired(&mut channel_state, state_change, block_number);

	if channel::views::get_lock(&channel_state.partner_state, secrethash).is_none() {
		let unlock_failed = UnlockClaimFailed {
			identifier: attempt.transfer.payment_identifier,
			secrethash,
			reason: "Lock expired".to_owned(),
		};
		events.push(unlock_failed.into());
	}

	channel_map.insert(channel_state.channel_identifier, channel_state);

	Ok(PaymentTransition { new_state: Some(payment_state), events })
}

/// Route a secret request to the attempt it names.
pub fn handle_secret_request(
	payment_state: Option<PaymentState>,
	state_change: ReceiveSecretRequest,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "ReceiveSecretRequest state change should be accompanied by a valid payment \
				      state"
					.to_owned(),
			}),
	};

	let attempt = match payment_state.initiator_transfers.get(&state_change.secrethash) {
		Some(attempt) => attempt.clone(),
		None =>
			return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] }),
	};

	// Never answer a request for a route that was already abandoned, the
	// secret must not leave this node for a cancelled attempt.
	if attempt.status == AttemptStatus::Cancelled {
		return Ok(PaymentTransition { new_state: Some(payment_state), events: vec![] })
	}

	let secrethash = state_change.secrethash;
	subdispatch_to_attempt(
		payment_state,
		secrethash,
		state_change.into(),
		channel_map,
		pseudo_random_number_generator,
		block_number,
	)
}

/// Broadcast an off-chain secret reveal to every attempt.
pub fn handle_offchain_secret_reveal(
	payment_state: Option<PaymentState>,
	state_change: ReceiveSecretReveal,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "ReceiveSecretReveal state change should be accompanied by a valid payment \
				      state"
					.to_owned(),
			}),
	};

	subdispatch_to_all_attempts(
		payment_state,
		state_change.into(),
		channel_map,
		pseudo_random_number_generator,
		block_number,
	)
}

/// Broadcast an on-chain secret reveal to every attempt.
pub fn handle_onchain_secret_reveal(
	payment_state: Option<PaymentState>,
	state_change: ContractReceiveSecretReveal,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let payment_state = match payment_state {
		Some(payment_state) => payment_state,
		None =>
			return Err(StateTransitionError {
				msg: "ContractReceiveSecretReveal state change should be accompanied by a valid \
				      payment state"
					.to_owned(),
			}),
	};

	subdispatch_to_all_attempts(
		payment_state,
		state_change.into(),
		channel_map,
		pseudo_random_number_generator,
		block_number,
	)
}

/// Retire the payment once its last attempt ended.
pub fn clear_if_finalized(transition: PaymentTransition) -> PaymentTransition {
	if let Some(ref new_state) = transition.new_state {
		if new_state.initiator_transfers.is_empty() {
			return PaymentTransition { new_state: None, events: transition.events }
		}
	}
	transition
}

/// The single entry point of the payment machine.
///
/// Deterministic: for a fixed state, state change, channel map, PRNG state
/// and block number the same new state and events come out, which is what
/// makes write-ahead replay possible on the host side.
pub fn state_transition(
	payment_state: Option<PaymentState>,
	state_change: StateChange,
	channel_map: &mut ChannelMap,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let transition_result = match state_change {
		StateChange::Block(inner) => handle_block(
			payment_state,
			inner,
			channel_map,
			pseudo_random_number_generator,
			block_number,
		),
		StateChange::ActionInitInitiator(inner) => handle_init(
			payment_state,
			inner,
			channel_map,
			pseudo_random_number_generator,
			block_number,
		),
		StateChange::ActionCancelPayment(inner) => handle_cancel_payment(payment_state, inner),
		StateChange::ReceiveSecretRequest(inner) => handle_secret_request(
			payment_state,
			inner,
			channel_map,
			pseudo_random_number_generator,
			block_number,
		),
		StateChange::ReceiveSecretReveal(inner) => handle_offchain_secret_reveal(
			payment_state,
			inner,
			channel_map,
			pseudo_random_number_generator,
			block_number,
		),
		StateChange::ReceiveTransferRefundCancelRoute(inner) => handle_refund_cancel_route(
			payment_state,
			inner,
			channel_map,
			pseudo_random_number_generator,
			block_number,
		),
		StateChange::ReceiveLockExpired(inner) =>
			handle_lock_expired(payment_state, inner, channel_map, block_number),
		StateChange::ContractReceiveSecretReveal(inner) => handle_onchain_secret_reveal(
			payment_state,
			inner,
			channel_map,
			pseudo_random_number_generator,
			block_number,
		),
		// Acknowledgements and any future inputs are of no interest to the
		// initiator.
		_ => Ok(PaymentTransition { new_state: payment_state, events: vec![] }),
	}?;

	Ok(clear_if_finalized(transition_result))
}
