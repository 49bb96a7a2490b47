#![warn(clippy::missing_docs_in_private_items)]

use crate::types::{
	ChannelIdentifier,
	RouteState,
};

/// Drop routes whose first-hop channel was already tried and abandoned.
pub(super) fn filter_acceptable_routes(
	route_states: Vec<RouteState>,
	blacklisted_channel_ids: &[ChannelIdentifier],
) -> Vec<RouteState> {
	route_states
		.into_iter()
		.filter(|route_state| !blacklisted_channel_ids.contains(&route_state.channel_identifier))
		.collect()
}

/// Build the route table forwarded inside a locked transfer: only routes
/// through the selected first hop, with ourselves stripped off the front.
pub(super) fn prune_route_table(
	route_states: &[RouteState],
	selected_route: &RouteState,
) -> Vec<RouteState> {
	route_states
		.iter()
		.filter(|route_state| route_state.channel_identifier == selected_route.channel_identifier)
		.map(|route_state| RouteState {
			route: route_state.route.iter().skip(1).cloned().collect(),
			..route_state.clone()
		})
		.collect()
}
