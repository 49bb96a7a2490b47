#![warn(clippy::missing_docs_in_private_items)]

use derive_more::{
	Deref,
	From,
};
use serde::{
	Deserialize,
	Serialize,
};

use crate::types::{
	Address,
	BalanceProofState,
	LockedTransferState,
	MessageIdentifier,
	PaymentIdentifier,
	PaymentNetworkIdentifier,
	Secret,
	SecretHash,
	TokenAddress,
	TokenAmount,
	TokenNetworkIdentifier,
};

/// An enum containing all possible event variants.
///
/// Events are pure values describing the outbound effects of a transition.
/// The host interprets them; the machine never performs I/O itself.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, From)]
#[serde(tag = "type")]
pub enum Event {
	SendLockedTransfer(SendLockedTransfer),
	SendSecretReveal(SendSecretReveal),
	SendUnlock(SendUnlock),
	SendLockExpired(SendLockExpired),
	SendProcessed(SendProcessed),
	PaymentSentSuccess(PaymentSentSuccess),
	PaymentSentFailed(PaymentSentFailed),
	UnlockSuccess(UnlockSuccess),
	UnlockFailed(UnlockFailed),
	UnlockClaimFailed(UnlockClaimFailed),
	InvalidSecretRequest(InvalidSecretRequest),
	InvalidReceivedTransferRefund(InvalidReceivedTransferRefund),
	InvalidReceivedLockExpired(InvalidReceivedLockExpired),
}

/// Common attributes of messages sent to a peer.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
#[cfg_attr(not(test), derive(PartialEq))]
pub struct SendMessageEventInner {
	pub recipient: Address,
	pub message_identifier: MessageIdentifier,
}

// Message identifiers are drawn from the PRNG, tests compare everything else.
#[cfg(test)]
impl PartialEq for SendMessageEventInner {
	fn eq(&self, other: &Self) -> bool {
		self.recipient == other.recipient
	}
}

/// A locked transfer that must be sent to `recipient`.
#[derive(Deref, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct SendLockedTransfer {
	#[deref]
	pub inner: SendMessageEventInner,
	pub transfer: LockedTransferState,
}

/// Discloses the secret to the payment target once it proved, through a
/// secret request, to be ready to receive the payment.
#[derive(Deref, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct SendSecretReveal {
	#[deref]
	pub inner: SendMessageEventInner,
	pub secret: Secret,
	pub secrethash: SecretHash,
}

/// Sends an up-to-date balance proof to the partner, releasing a lock whose
/// secret is known. This settles the hop off-chain.
#[derive(Deref, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct SendUnlock {
	#[deref]
	pub inner: SendMessageEventInner,
	pub payment_identifier: PaymentIdentifier,
	pub token_address: TokenAddress,
	pub balance_proof: BalanceProofState,
	pub secret: Secret,
	pub secrethash: SecretHash,
}

/// Removes an expired lock from the channel, notifying the partner.
#[derive(Deref, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct SendLockExpired {
	#[deref]
	pub inner: SendMessageEventInner,
	pub balance_proof: BalanceProofState,
	pub secrethash: SecretHash,
}

/// Acknowledges a processed message to its sender.
#[derive(Deref, Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct SendProcessed {
	#[deref]
	pub inner: SendMessageEventInner,
}

/// Emitted by the initiator when a payment is considered successful, that is
/// when the next hop sent the secret reveal that obligates us to unlock.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct PaymentSentSuccess {
	pub payment_network_identifier: PaymentNetworkIdentifier,
	pub token_network_identifier: TokenNetworkIdentifier,
	pub identifier: PaymentIdentifier,
	pub amount: TokenAmount,
	pub target: Address,
	pub secret: Secret,
	pub route: Vec<Address>,
}

/// Emitted by the initiator when a payment has definitely failed.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct PaymentSentFailed {
	pub payment_network_identifier: PaymentNetworkIdentifier,
	pub token_network_identifier: TokenNetworkIdentifier,
	pub identifier: PaymentIdentifier,
	pub target: Address,
	pub reason: String,
}

/// Emitted when a lock unlock succeeded.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct UnlockSuccess {
	pub identifier: PaymentIdentifier,
	pub secrethash: SecretHash,
}

/// Emitted when a lock unlock failed, e.g. because its route was abandoned.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct UnlockFailed {
	pub identifier: PaymentIdentifier,
	pub secrethash: SecretHash,
	pub reason: String,
}

/// Emitted when a lock claim failed, e.g. the partner let the lock expire.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct UnlockClaimFailed {
	pub identifier: PaymentIdentifier,
	pub secrethash: SecretHash,
	pub reason: String,
}

/// Emitted when a secret request does not match the sent transfer.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct InvalidSecretRequest {
	pub payment_identifier: PaymentIdentifier,
	pub intended_amount: TokenAmount,
	pub actual_amount: TokenAmount,
}

/// Emitted when a received refund transfer fails validation.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct InvalidReceivedTransferRefund {
	pub payment_identifier: PaymentIdentifier,
	pub reason: String,
}

/// Emitted when a received lock expired message fails validation.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct InvalidReceivedLockExpired {
	pub secrethash: SecretHash,
	pub reason: String,
}
