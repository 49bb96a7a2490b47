use crate::{
	constants::LOCKSROOT_OF_NO_LOCKS,
	machine::channel::{
		utils::compute_locksroot,
		validators,
		views,
	},
	tests::factories::{
		ChannelMapBuilder,
		Generator,
		Keyring,
	},
	types::{
		BalanceProofState,
		BlockExpiration,
		BlockNumber,
		ChannelEndState,
		HashTimeLockState,
		LockTimeout,
		LockedTransferState,
		Nonce,
		PaymentIdentifier,
		PendingLocksState,
		RevealTimeout,
		TokenAmount,
		UnlockPartialProofState,
	},
};

fn make_lock(amount: u64, expiration: u64) -> HashTimeLockState {
	HashTimeLockState::create(
		TokenAmount::from(amount),
		BlockExpiration::from(expiration),
		Generator::random_secrethash(),
	)
}

fn make_locked_transfer(lock: HashTimeLockState, nonce: Nonce) -> LockedTransferState {
	let locksroot = compute_locksroot(&PendingLocksState { locks: vec![lock.encoded.clone()] });
	LockedTransferState {
		payment_identifier: PaymentIdentifier::from(1u64),
		token: Generator::random_address(),
		lock: lock.clone(),
		initiator: Keyring::Alice.address(),
		target: Keyring::Dave.address(),
		message_identifier: 1,
		route_states: vec![],
		balance_proof: BalanceProofState {
			nonce,
			transferred_amount: TokenAmount::zero(),
			locked_amount: lock.amount,
			locksroot,
			channel_identifier: 1u64.into(),
			sender: Some(Keyring::Bob.address()),
		},
		secret: None,
	}
}

#[test]
fn test_compute_locksroot_of_no_locks() {
	let locksroot = compute_locksroot(&PendingLocksState { locks: vec![] });
	assert_eq!(locksroot, *LOCKSROOT_OF_NO_LOCKS);
}

#[test]
fn test_is_lock_expired() {
	let end_state = ChannelEndState::new(Keyring::Alice.address());
	let lock = make_lock(100, 101);

	let threshold = BlockExpiration::from(111u64);
	assert!(validators::is_lock_expired(
		&end_state,
		&lock,
		BlockNumber::from(110u64),
		threshold
	)
	.is_err());
	assert!(validators::is_lock_expired(
		&end_state,
		&lock,
		BlockNumber::from(111u64),
		threshold
	)
	.is_ok());
}

#[test]
fn test_is_lock_expired_after_onchain_unlock() {
	let mut end_state = ChannelEndState::new(Keyring::Alice.address());
	let lock = make_lock(100, 101);
	end_state.secrethashes_to_onchain_unlockedlocks.insert(
		lock.secrethash,
		UnlockPartialProofState {
			lock: lock.clone(),
			secret: Generator::random_secret(),
			amount: lock.amount,
			expiration: lock.expiration,
			secrethash: lock.secrethash,
			encoded: lock.encoded.clone(),
		},
	);

	// An on-chain unlocked lock is no longer removable as expired.
	assert!(validators::is_lock_expired(
		&end_state,
		&lock,
		BlockNumber::from(1000u64),
		BlockExpiration::from(111u64)
	)
	.is_err());
}

#[test]
fn test_refund_transfer_matches_received() {
	let lock = make_lock(100, 101);
	let transfer = make_locked_transfer(lock.clone(), Nonce::from(1u64));
	let refund = make_locked_transfer(lock.clone(), Nonce::from(1u64));

	let mut refund = LockedTransferState { token: transfer.token, ..refund };
	assert!(validators::refund_transfer_matches_received(&refund, &transfer));

	// A refund straight from the target proves nothing about the route.
	refund.balance_proof.sender = Some(transfer.target);
	assert!(!validators::refund_transfer_matches_received(&refund, &transfer));

	refund.balance_proof.sender = Some(Keyring::Bob.address());
	refund.lock = make_lock(99, 101);
	assert!(!validators::refund_transfer_matches_received(&refund, &transfer));
}

#[test]
fn test_locked_transfer_check_rejects_wrong_nonce() {
	let info = ChannelMapBuilder::new()
		.with_channels(vec![(
			(Keyring::Alice.address(), TokenAmount::from(1000u64)),
			(Keyring::Bob.address(), TokenAmount::from(1000u64)),
		)])
		.build();
	let channel_state = info.channel_map.get(&info.channel_identifiers[0]).unwrap();

	let lock = make_lock(100, 101);
	let mut transfer = make_locked_transfer(lock.clone(), Nonce::from(2u64));
	transfer.balance_proof.channel_identifier = channel_state.channel_identifier;

	let result = validators::valid_locked_transfer_check(
		channel_state,
		&channel_state.partner_state,
		&channel_state.our_state,
		"LockedTransfer",
		&transfer.balance_proof,
		&transfer.lock,
	);
	assert!(result.is_err());
	assert!(result.unwrap_err().contains("Nonce"));
}

#[test]
fn test_locked_transfer_check_accepts_valid_transfer() {
	let info = ChannelMapBuilder::new()
		.with_channels(vec![(
			(Keyring::Alice.address(), TokenAmount::from(1000u64)),
			(Keyring::Bob.address(), TokenAmount::from(1000u64)),
		)])
		.build();
	let channel_state = info.channel_map.get(&info.channel_identifiers[0]).unwrap();

	let lock = make_lock(100, 101);
	let mut transfer = make_locked_transfer(lock.clone(), Nonce::from(1u64));
	transfer.balance_proof.channel_identifier = channel_state.channel_identifier;

	let result = validators::valid_locked_transfer_check(
		channel_state,
		&channel_state.partner_state,
		&channel_state.our_state,
		"LockedTransfer",
		&transfer.balance_proof,
		&transfer.lock,
	);
	let pending_locks = result.expect("Transfer should be accepted");
	assert_eq!(pending_locks.locks, vec![lock.encoded]);
}

#[test]
fn test_get_safe_initial_expiration() {
	assert_eq!(
		views::get_safe_initial_expiration(
			BlockNumber::from(1u64),
			RevealTimeout::from(50u64),
			None
		),
		BlockExpiration::from(101u64)
	);
	assert_eq!(
		views::get_safe_initial_expiration(
			BlockNumber::from(1u64),
			RevealTimeout::from(50u64),
			Some(LockTimeout::from(30u64))
		),
		BlockExpiration::from(31u64)
	);
}

#[test]
fn test_get_lock_finds_claimed_locks() {
	let mut end_state = ChannelEndState::new(Keyring::Alice.address());
	let lock = make_lock(100, 101);

	assert!(views::get_lock(&end_state, lock.secrethash).is_none());

	end_state.secrethashes_to_lockedlocks.insert(lock.secrethash, lock.clone());
	assert_eq!(views::get_lock(&end_state, lock.secrethash), Some(lock.clone()));

	end_state.secrethashes_to_lockedlocks.remove(&lock.secrethash);
	end_state.secrethashes_to_unlockedlocks.insert(
		lock.secrethash,
		UnlockPartialProofState {
			lock: lock.clone(),
			secret: Generator::random_secret(),
			amount: lock.amount,
			expiration: lock.expiration,
			secrethash: lock.secrethash,
			encoded: lock.encoded.clone(),
		},
	);
	assert_eq!(views::get_lock(&end_state, lock.secrethash), Some(lock));
}
