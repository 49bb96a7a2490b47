#![warn(clippy::missing_docs_in_private_items)]

use web3::signing::keccak256;

use crate::types::{
	HashTimeLockState,
	Locksroot,
	PendingLocksState,
};

/// Returns a new `PendingLocksState` extended with `lock`, unless the lock
/// is already part of it.
pub(crate) fn compute_locks_with(
	pending_locks: &PendingLocksState,
	lock: &HashTimeLockState,
) -> Option<PendingLocksState> {
	if pending_locks.locks.contains(&lock.encoded) {
		return None
	}

	let mut locks = PendingLocksState { locks: pending_locks.locks.clone() };
	locks.locks.push(lock.encoded.clone());
	Some(locks)
}

/// Returns a new `PendingLocksState` with `lock` removed, if it was present.
pub(crate) fn compute_locks_without(
	pending_locks: &PendingLocksState,
	lock: &HashTimeLockState,
) -> Option<PendingLocksState> {
	if !pending_locks.locks.contains(&lock.encoded) {
		return None
	}

	let mut locks = PendingLocksState { locks: pending_locks.locks.clone() };
	locks.locks.retain(|l| l != &lock.encoded);
	Some(locks)
}

/// Compute the locksroot over a pending locks state.
pub(crate) fn compute_locksroot(locks: &PendingLocksState) -> Locksroot {
	let locks: Vec<&[u8]> = locks.locks.iter().map(|lock| lock.0.as_slice()).collect();
	Locksroot::from_slice(&keccak256(&locks.concat()))
}
