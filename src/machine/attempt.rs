use super::{
	channel,
	routes,
};
use crate::{
	constants::{
		ABSENT_SECRET,
		DEFAULT_MEDIATION_FEE_MARGIN,
		DEFAULT_WAIT_BEFORE_LOCK_REMOVAL,
		MAX_MEDIATION_FEE_PERC,
		PAYMENT_AMOUNT_BASED_FEE_MARGIN,
	},
	errors::StateTransitionError,
	types::{
		AttemptStatus,
		Block,
		BlockNumber,
		ChannelIdentifier,
		ChannelMap,
		ChannelState,
		ChannelStatus,
		ContractReceiveSecretReveal,
		Event,
		FeeAmount,
		InvalidSecretRequest,
		PaymentSentFailed,
		PaymentSentSuccess,
		Random,
		ReceiveSecretRequest,
		ReceiveSecretReveal,
		RouteAttempt,
		RouteState,
		Secret,
		SecretHash,
		SendMessageEventInner,
		SendSecretReveal,
		StateChange,
		TokenAmount,
		TransferDescription,
		UnlockFailed,
		UnlockSuccess,
	},
	views,
};

pub(super) type TransitionResult = std::result::Result<AttemptTransition, StateTransitionError>;

/// The outcome of dispatching one state change to one route attempt.
///
/// `new_state` is absent when the attempt terminated. `channel_state` carries
/// the channel back to the owning payment machine, which writes it into the
/// channel map.
pub struct AttemptTransition {
	pub new_state: Option<RouteAttempt>,
	pub channel_state: Option<ChannelState>,
	pub events: Vec<Event>,
}

/// Safety margin added on top of the estimated mediation fee.
fn calculate_fee_margin(payment_amount: TokenAmount, estimated_fee: FeeAmount) -> FeeAmount {
	if estimated_fee.is_zero() {
		return FeeAmount::zero()
	}

	((estimated_fee * TokenAmount::from(DEFAULT_MEDIATION_FEE_MARGIN.0)) /
		TokenAmount::from(DEFAULT_MEDIATION_FEE_MARGIN.1)) +
		((payment_amount * TokenAmount::from(PAYMENT_AMOUNT_BASED_FEE_MARGIN.0)) /
			TokenAmount::from(PAYMENT_AMOUNT_BASED_FEE_MARGIN.1))
}

/// The amount actually locked on the first hop: payment plus fees and margin.
fn calculate_safe_amount_with_fee(
	payment_amount: TokenAmount,
	estimated_fee: FeeAmount,
) -> TokenAmount {
	payment_amount + estimated_fee + calculate_fee_margin(payment_amount, estimated_fee)
}

/// The unlock message plus the payment-level success events that go with it.
fn events_for_unlock_lock(
	attempt: &RouteAttempt,
	channel_state: &mut ChannelState,
	secret: Secret,
	secrethash: SecretHash,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> Result<Vec<Event>, String> {
	let transfer_description = &attempt.transfer_description;

	let message_identifier = pseudo_random_number_generator.next();
	let unlock_lock = channel::send_unlock(
		channel_state,
		message_identifier,
		transfer_description.payment_identifier,
		secret.clone(),
		secrethash,
		block_number,
	)?;

	let payment_sent_success = PaymentSentSuccess {
		payment_network_identifier: transfer_description.payment_network_identifier,
		token_network_identifier: transfer_description.token_network_identifier,
		identifier: transfer_description.payment_identifier,
		amount: transfer_description.amount,
		target: transfer_description.target,
		secret,
		route: attempt.route.route.clone(),
	};

	let unlock_success = UnlockSuccess {
		identifier: transfer_description.payment_identifier,
		secrethash,
	};

	Ok(vec![unlock_lock.into(), payment_sent_success.into(), unlock_success.into()])
}

/// Select a usable route and lock the transfer on it.
///
/// Channels in `excluded_channels` were tried and abandoned before and are
/// never selected again. When no candidate qualifies the payment fails with
/// a reason naming why.
pub fn try_new_route(
	channel_map: &mut ChannelMap,
	candidate_routes: Vec<RouteState>,
	excluded_channels: &[ChannelIdentifier],
	transfer_description: TransferDescription,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> Result<(Option<RouteAttempt>, Vec<Event>), StateTransitionError> {
	let mut route_fee_exceeds_max = false;

	let acceptable_routes = routes::filter_acceptable_routes(candidate_routes, excluded_channels);

	let mut selected = None;
	for route_state in acceptable_routes.iter() {
		let candidate_channel_state = match views::get_channel_by_identifier(
			channel_map,
			route_state.channel_identifier,
		) {
			Some(channel_state) => channel_state,
			None => continue,
		};

		let amount_with_fee = calculate_safe_amount_with_fee(
			transfer_description.amount,
			route_state.estimated_fee,
		);

		let max_amount_limit = transfer_description.amount +
			(transfer_description.amount.saturating_mul(MAX_MEDIATION_FEE_PERC.0.into()) /
				TokenAmount::from(MAX_MEDIATION_FEE_PERC.1));
		if amount_with_fee > max_amount_limit {
			route_fee_exceeds_max = true;
			continue
		}

		if candidate_channel_state
			.is_usable_for_new_transfer(amount_with_fee, transfer_description.lock_timeout)
		{
			selected = Some((route_state.clone(), candidate_channel_state.clone()));
			break
		}
	}

	if let Some((route_state, channel_state)) = selected {
		let message_identifier = pseudo_random_number_generator.next();
		let lock_expiration = channel::views::get_safe_initial_expiration(
			block_number,
			channel_state.reveal_timeout,
			transfer_description.lock_timeout,
		);
		let total_amount = calculate_safe_amount_with_fee(
			transfer_description.amount,
			route_state.estimated_fee,
		);
		let (channel_state, locked_transfer_event) = channel::send_locked_transfer(
			channel_state,
			transfer_description.initiator,
			transfer_description.target,
			total_amount,
			lock_expiration,
			Some(transfer_description.secret.clone()),
			transfer_description.secrethash,
			message_identifier,
			transfer_description.payment_identifier,
			routes::prune_route_table(&acceptable_routes, &route_state),
		)
		.map_err(Into::<StateTransitionError>::into)?;

		let attempt = RouteAttempt {
			route: route_state,
			transfer_description,
			channel_identifier: channel_state.channel_identifier,
			transfer: locked_transfer_event.transfer.clone(),
			revealsecret: None,
			received_secret_request: false,
			status: AttemptStatus::Pending,
		};
		channel_map.insert(channel_state.channel_identifier, channel_state);
		Ok((Some(attempt), vec![locked_transfer_event.into()]))
	} else {
		let mut reason = "none of the available routes could be used".to_owned();
		if route_fee_exceeds_max {
			reason += " and at least one of them exceeded the maximum fee limit";
		}
		let transfer_failed = PaymentSentFailed {
			payment_network_identifier: transfer_description.payment_network_identifier,
			token_network_identifier: transfer_description.token_network_identifier,
			identifier: transfer_description.payment_identifier,
			target: transfer_description.target,
			reason,
		};

		Ok((None, vec![transfer_failed.into()]))
	}
}

/// Expire our own lock once enough blocks passed beyond its expiration.
fn handle_block(
	mut attempt: RouteAttempt,
	state_change: Block,
	channel_state: ChannelState,
	pseudo_random_number_generator: &mut Random,
) -> TransitionResult {
	let secrethash = attempt.transfer.lock.secrethash;
	let locked_lock = match channel_state.our_state.secrethashes_to_lockedlocks.get(&secrethash) {
		Some(locked_lock) => locked_lock.clone(),
		None => {
			// Our side no longer holds the lock. The attempt stays alive
			// only while the partner still holds the refund counterpart.
			let terminated = !channel_state
				.partner_state
				.secrethashes_to_lockedlocks
				.contains_key(&secrethash);
			return Ok(AttemptTransition {
				new_state: if terminated { None } else { Some(attempt) },
				channel_state: Some(channel_state),
				events: vec![],
			})
		},
	};

	let lock_expiration_threshold =
		locked_lock.expiration + DEFAULT_WAIT_BEFORE_LOCK_REMOVAL;
	let lock_has_expired = channel::validators::is_lock_expired(
		&channel_state.our_state,
		&locked_lock,
		state_change.block_number,
		lock_expiration_threshold,
	)
	.is_ok();

	if !lock_has_expired || attempt.status == AttemptStatus::Expired {
		return Ok(AttemptTransition {
			new_state: Some(attempt),
			channel_state: Some(channel_state),
			events: vec![],
		})
	}

	let mut events: Vec<Event> = vec![];
	let (channel_state, expired_lock_events) =
		channel::send_lock_expired(channel_state, locked_lock, pseudo_random_number_generator);
	events.extend(expired_lock_events.into_iter().map(Event::from));

	let reason = if attempt.received_secret_request {
		"Lock expired, despite receiving secret request".to_owned()
	} else {
		"Lock expired".to_owned()
	};

	let transfer_description = &attempt.transfer_description;
	let payment_failed = PaymentSentFailed {
		payment_network_identifier: transfer_description.payment_network_identifier,
		token_network_identifier: transfer_description.token_network_identifier,
		identifier: transfer_description.payment_identifier,
		target: transfer_description.target,
		reason: reason.clone(),
	};
	let unlock_failed = UnlockFailed {
		identifier: transfer_description.payment_identifier,
		secrethash,
		reason,
	};
	events.push(payment_failed.into());
	events.push(unlock_failed.into());
	attempt.status = AttemptStatus::Expired;

	let lock_exists = channel::lock_exists_in_either_channel_side(&channel_state, secrethash);

	Ok(AttemptTransition {
		new_state: if lock_exists { Some(attempt) } else { None },
		channel_state: Some(channel_state),
		events,
	})
}

/// Answer the target's secret request, disclosing the secret when the
/// request matches the sent transfer exactly.
fn handle_receive_secret_request(
	mut attempt: RouteAttempt,
	state_change: ReceiveSecretRequest,
	channel_state: ChannelState,
	pseudo_random_number_generator: &mut Random,
) -> TransitionResult {
	let transfer_description = attempt.transfer_description.clone();
	let is_message_from_target = state_change.sender == transfer_description.target &&
		state_change.secrethash == transfer_description.secrethash &&
		state_change.payment_identifier == transfer_description.payment_identifier;

	if !is_message_from_target {
		return Ok(AttemptTransition {
			new_state: Some(attempt),
			channel_state: Some(channel_state),
			events: vec![],
		})
	}

	let lock = match channel::views::get_lock(
		&channel_state.our_state,
		transfer_description.secrethash,
	) {
		Some(lock) => lock,
		None =>
			return Err(StateTransitionError {
				msg: "Channel does not hold the attempt's lock".to_owned(),
			}),
	};

	if attempt.received_secret_request {
		return Ok(AttemptTransition {
			new_state: Some(attempt),
			channel_state: Some(channel_state),
			events: vec![],
		})
	}

	let is_valid_secret_request = state_change.amount >= transfer_description.amount &&
		state_change.expiration == lock.expiration &&
		transfer_description.secret != ABSENT_SECRET;

	let mut events = vec![];
	if is_valid_secret_request {
		let message_identifier = pseudo_random_number_generator.next();
		let secret_reveal = SendSecretReveal {
			inner: SendMessageEventInner {
				recipient: transfer_description.target,
				message_identifier,
			},
			secret: transfer_description.secret.clone(),
			secrethash: transfer_description.secrethash,
		};
		attempt.revealsecret = Some(secret_reveal.clone());
		attempt.received_secret_request = true;
		attempt.status = AttemptStatus::SecretRequested;
		events.push(secret_reveal.into());
	} else {
		attempt.received_secret_request = true;
		let invalid_request = InvalidSecretRequest {
			payment_identifier: state_change.payment_identifier,
			intended_amount: transfer_description.amount,
			actual_amount: state_change.amount,
		};
		events.push(invalid_request.into());
	}

	Ok(AttemptTransition {
		new_state: Some(attempt),
		channel_state: Some(channel_state),
		events,
	})
}

/// React to a secret disclosed off-chain by the next hop: unlock and finish.
fn handle_receive_offchain_secret_reveal(
	mut attempt: RouteAttempt,
	state_change: ReceiveSecretReveal,
	mut channel_state: ChannelState,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let valid_reveal = state_change.secrethash == attempt.transfer_description.secrethash;
	let sent_by_partner = state_change.sender == channel_state.partner_state.address;
	let is_channel_open = channel_state.status == ChannelStatus::Opened;

	let lock = attempt.transfer.lock.clone();
	let expired = channel::validators::is_lock_expired(
		&channel_state.our_state,
		&lock,
		block_number,
		lock.expiration,
	)
	.is_ok();

	if valid_reveal && sent_by_partner && !expired {
		if is_channel_open {
			let events = events_for_unlock_lock(
				&attempt,
				&mut channel_state,
				state_change.secret,
				state_change.secrethash,
				pseudo_random_number_generator,
				block_number,
			)
			.map_err(Into::<StateTransitionError>::into)?;
			attempt.status = AttemptStatus::Finalized;
			return Ok(AttemptTransition {
				new_state: Some(attempt),
				channel_state: Some(channel_state),
				events,
			})
		}

		// The secret is out but the channel can no longer settle off-chain.
		attempt.status = AttemptStatus::SecretRevealed;
	}

	Ok(AttemptTransition {
		new_state: Some(attempt),
		channel_state: Some(channel_state),
		events: vec![],
	})
}

/// React to a secret registered on-chain: record it on the channel and
/// unlock while the lock is still claimable.
fn handle_receive_onchain_secret_reveal(
	mut attempt: RouteAttempt,
	state_change: ContractReceiveSecretReveal,
	mut channel_state: ChannelState,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	let secrethash = attempt.transfer_description.secrethash;
	let is_valid_secret = state_change.secrethash == secrethash;
	let is_channel_open = channel_state.status == ChannelStatus::Opened;
	let is_lock_expired = state_change.block_number > attempt.transfer.lock.expiration;
	let is_lock_unlocked = is_valid_secret && !is_lock_expired;

	if is_lock_unlocked {
		channel::register_onchain_secret(
			&mut channel_state,
			state_change.secret.clone(),
			secrethash,
			true,
		);
	}

	let lock = attempt.transfer.lock.clone();
	let expired = channel::validators::is_lock_expired(
		&channel_state.our_state,
		&lock,
		block_number,
		lock.expiration,
	)
	.is_ok();

	if is_lock_unlocked && is_channel_open && !expired {
		let events = events_for_unlock_lock(
			&attempt,
			&mut channel_state,
			state_change.secret,
			secrethash,
			pseudo_random_number_generator,
			block_number,
		)
		.map_err(Into::<StateTransitionError>::into)?;
		attempt.status = AttemptStatus::Finalized;
		return Ok(AttemptTransition {
			new_state: Some(attempt),
			channel_state: Some(channel_state),
			events,
		})
	}

	if is_lock_unlocked {
		attempt.status = AttemptStatus::SecretRevealed;
	}

	Ok(AttemptTransition {
		new_state: Some(attempt),
		channel_state: Some(channel_state),
		events: vec![],
	})
}

/// Progress a single route attempt.
pub fn state_transition(
	attempt: RouteAttempt,
	state_change: StateChange,
	channel_state: ChannelState,
	pseudo_random_number_generator: &mut Random,
	block_number: BlockNumber,
) -> TransitionResult {
	match state_change {
		StateChange::Block(inner) =>
			handle_block(attempt, inner, channel_state, pseudo_random_number_generator),
		StateChange::ReceiveSecretRequest(inner) => handle_receive_secret_request(
			attempt,
			inner,
			channel_state,
			pseudo_random_number_generator,
		),
		StateChange::ReceiveSecretReveal(inner) => handle_receive_offchain_secret_reveal(
			attempt,
			inner,
			channel_state,
			pseudo_random_number_generator,
			block_number,
		),
		StateChange::ContractReceiveSecretReveal(inner) => handle_receive_onchain_secret_reveal(
			attempt,
			inner,
			channel_state,
			pseudo_random_number_generator,
			block_number,
		),
		_ => Ok(AttemptTransition {
			new_state: Some(attempt),
			channel_state: Some(channel_state),
			events: vec![],
		}),
	}
}
