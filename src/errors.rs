#![warn(clippy::missing_docs_in_private_items)]

use thiserror::Error;

/// The state transition error type.
///
/// Raised only for violations of the machine's own preconditions (a state
/// change delivered without its payment state, a channel that lost the lock
/// it must hold). Adversarial input never produces this error, it produces a
/// no-op or an error event instead.
#[derive(Error, Debug, Clone)]
#[error("{msg}")]
pub struct StateTransitionError {
	pub msg: String,
}

impl From<String> for StateTransitionError {
	fn from(msg: String) -> Self {
		Self { msg }
	}
}
