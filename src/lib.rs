#![warn(clippy::missing_docs_in_private_items)]

//! Initiator-side payment state machine for a hash-timelocked channel
//! network. The crate is a pure library: every transition is a function of
//! the provided state, state change, channel map, PRNG and block number, and
//! returns the new state together with the events the host must act upon.

/// Protocol constants.
pub mod constants;
/// State machine errors.
pub mod errors;
/// Secret hashing.
pub mod hashing;
/// State machine transitioners.
pub mod machine;
#[cfg(test)]
pub mod tests;
/// State machine types.
pub mod types;
/// State machine views.
pub mod views;
