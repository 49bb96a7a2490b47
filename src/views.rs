#![warn(clippy::missing_docs_in_private_items)]

use crate::types::{
	ChannelEndState,
	ChannelIdentifier,
	ChannelMap,
	ChannelState,
	TokenAmount,
};

/// Returns the channel state for an identifier, if known.
pub fn get_channel_by_identifier(
	channel_map: &ChannelMap,
	channel_identifier: ChannelIdentifier,
) -> Option<&ChannelState> {
	channel_map.get(&channel_identifier)
}

/// Returns the total balance of the sender's side of a channel.
pub fn channel_balance(sender: &ChannelEndState, receiver: &ChannelEndState) -> TokenAmount {
	let mut sender_transferred_amount = TokenAmount::zero();
	let mut receiver_transferred_amount = TokenAmount::zero();

	if let Some(balance_proof) = &sender.balance_proof {
		sender_transferred_amount = balance_proof.transferred_amount;
	}
	if let Some(balance_proof) = &receiver.balance_proof {
		receiver_transferred_amount = balance_proof.transferred_amount;
	}

	sender.contract_balance + receiver_transferred_amount - sender_transferred_amount
}

/// Returns the amount the sender can still commit to new transfers.
pub fn channel_distributable(sender: &ChannelEndState, receiver: &ChannelEndState) -> TokenAmount {
	let (_, _, transferred_amount, locked_amount) = sender.get_current_balanceproof();
	let distributable = channel_balance(sender, receiver) - sender.locked_amount();
	let overflow_limit = TokenAmount::MAX - transferred_amount - locked_amount;
	TokenAmount::min(overflow_limit, distributable)
}
