#![warn(clippy::missing_docs_in_private_items)]

/// Per-route-attempt state machine.
pub mod attempt;
/// Channel-level command handlers and validation.
pub mod channel;
/// Per-payment state machine.
pub mod payment;
/// Route table filtering.
pub mod routes;
