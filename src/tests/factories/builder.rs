use std::collections::BTreeMap;

use crate::{
	constants::{
		DEFAULT_REVEAL_TIMEOUT,
		DEFAULT_SETTLE_TIMEOUT,
	},
	types::{
		Address,
		ChannelEndState,
		ChannelIdentifier,
		ChannelMap,
		ChannelState,
		ChannelStatus,
		RevealTimeout,
		SettleTimeout,
		TokenAmount,
	},
};

use super::Generator;

pub struct ChannelMapInfo {
	pub channel_map: ChannelMap,
	pub payment_network_identifier: Address,
	pub token_network_identifier: Address,
	pub token_address: Address,
	pub channel_identifiers: Vec<ChannelIdentifier>,
}

pub struct ChannelMapBuilder {
	channel_map: ChannelMap,
	payment_network_identifier: Address,
	token_network_identifier: Address,
	token_address: Address,
	channel_identifiers: Vec<ChannelIdentifier>,
}

impl ChannelMapBuilder {
	pub fn new() -> Self {
		Self {
			channel_map: BTreeMap::new(),
			payment_network_identifier: Generator::random_address(),
			token_network_identifier: Generator::random_address(),
			token_address: Generator::random_address(),
			channel_identifiers: vec![],
		}
	}

	pub fn with_channels(
		mut self,
		channels: Vec<((Address, TokenAmount), (Address, TokenAmount))>,
	) -> Self {
		for ((our_address, our_balance), (partner_address, partner_balance)) in channels {
			let channel_identifier =
				ChannelIdentifier::from((self.channel_identifiers.len() + 1) as u64);

			let mut our_state = ChannelEndState::new(our_address);
			our_state.contract_balance = our_balance;
			let mut partner_state = ChannelEndState::new(partner_address);
			partner_state.contract_balance = partner_balance;

			let channel_state = ChannelState {
				channel_identifier,
				payment_network_identifier: self.payment_network_identifier,
				token_network_identifier: self.token_network_identifier,
				token_address: self.token_address,
				reveal_timeout: RevealTimeout::from(DEFAULT_REVEAL_TIMEOUT),
				settle_timeout: SettleTimeout::from(DEFAULT_SETTLE_TIMEOUT),
				our_state,
				partner_state,
				status: ChannelStatus::Opened,
			};

			self.channel_map.insert(channel_identifier, channel_state);
			self.channel_identifiers.push(channel_identifier);
		}
		self
	}

	pub fn build(self) -> ChannelMapInfo {
		ChannelMapInfo {
			channel_map: self.channel_map,
			payment_network_identifier: self.payment_network_identifier,
			token_network_identifier: self.token_network_identifier,
			token_address: self.token_address,
			channel_identifiers: self.channel_identifiers,
		}
	}
}
