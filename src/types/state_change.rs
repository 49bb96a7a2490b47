#![warn(clippy::missing_docs_in_private_items)]

use derive_more::From;
use serde::{
	Deserialize,
	Serialize,
};

use crate::types::{
	Address,
	BalanceProofState,
	BlockExpiration,
	BlockHash,
	BlockNumber,
	LockedTransferState,
	MessageIdentifier,
	PaymentIdentifier,
	RouteState,
	Secret,
	SecretHash,
	TokenAmount,
	TransferDescription,
};

/// An enum containing all inputs the payment machine consumes.
///
/// Dispatch is an exhaustive match; variants the initiator does not care
/// about fall through a single wildcard arm as a deliberate no-op.
#[derive(Serialize, Deserialize, Clone, Debug, From)]
#[serde(tag = "type")]
pub enum StateChange {
	Block(Block),
	ActionInitInitiator(ActionInitInitiator),
	ActionCancelPayment(ActionCancelPayment),
	ReceiveSecretRequest(ReceiveSecretRequest),
	ReceiveSecretReveal(ReceiveSecretReveal),
	ReceiveTransferRefundCancelRoute(ReceiveTransferRefundCancelRoute),
	ReceiveLockExpired(ReceiveLockExpired),
	ContractReceiveSecretReveal(ContractReceiveSecretReveal),
	ReceiveProcessed(ReceiveProcessed),
	ReceiveDelivered(ReceiveDelivered),
}

/// A new block was mined.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Block {
	pub block_number: BlockNumber,
	pub block_hash: BlockHash,
}

/// The local actor wants to start a payment.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActionInitInitiator {
	pub transfer: TransferDescription,
	pub routes: Vec<RouteState>,
}

/// The local actor wants to give up on a payment.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActionCancelPayment {
	pub payment_identifier: PaymentIdentifier,
}

/// The target asks for the secret, proving it saw the locked transfer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReceiveSecretRequest {
	pub sender: Address,
	pub payment_identifier: PaymentIdentifier,
	pub amount: TokenAmount,
	pub expiration: BlockExpiration,
	pub secrethash: SecretHash,
}

/// A peer disclosed a secret off-chain.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReceiveSecretReveal {
	pub sender: Address,
	pub secret: Secret,
	pub secrethash: SecretHash,
}

/// The next hop could not forward and sent a refund carrying the same lock,
/// together with alternate routes and a fresh secret for the retry.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReceiveTransferRefundCancelRoute {
	pub transfer: LockedTransferState,
	pub routes: Vec<RouteState>,
	pub secret: Secret,
}

/// The partner removed an expired lock from the channel.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReceiveLockExpired {
	pub sender: Address,
	pub secrethash: SecretHash,
	pub message_identifier: MessageIdentifier,
	pub balance_proof: BalanceProofState,
}

/// A secret was registered on-chain.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContractReceiveSecretReveal {
	pub secrethash: SecretHash,
	pub secret: Secret,
	pub block_number: BlockNumber,
}

/// A peer confirmed processing one of our messages.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReceiveProcessed {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
}

/// A peer confirmed delivery of one of our messages.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReceiveDelivered {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
}
