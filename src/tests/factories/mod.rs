mod builder;
mod generator;
mod keyring;

pub use builder::*;
pub use generator::*;
pub use keyring::*;

use crate::types::{
	Address,
	ChannelIdentifier,
	FeeAmount,
	PaymentIdentifier,
	RouteState,
	Secret,
	TokenAmount,
	TransferDescription,
};

pub fn make_route(channel_identifier: ChannelIdentifier, route: Vec<Address>) -> RouteState {
	RouteState { route, channel_identifier, estimated_fee: FeeAmount::zero() }
}

pub fn make_description(
	info: &ChannelMapInfo,
	secret: Secret,
	target: Address,
) -> TransferDescription {
	TransferDescription::with_secret(
		info.payment_network_identifier,
		info.token_network_identifier,
		PaymentIdentifier::from(1u64),
		TokenAmount::from(100u64),
		Keyring::Alice.address(),
		target,
		secret,
		None,
	)
}
