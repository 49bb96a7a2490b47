use rand::{
	distributions::Alphanumeric,
	thread_rng,
	Rng,
	RngCore,
};

use crate::{
	constants::SECRET_LENGTH,
	types::{
		Address,
		Bytes,
		Secret,
		SecretHash,
	},
};

pub struct Generator;

impl Generator {
	pub fn random_secret() -> Secret {
		Bytes(
			thread_rng()
				.sample_iter(&Alphanumeric)
				.take(SECRET_LENGTH as usize)
				.collect::<Vec<u8>>(),
		)
	}

	pub fn random_bytes() -> [u8; 32] {
		let mut bytes = [0u8; 32];
		thread_rng().fill_bytes(&mut bytes);
		bytes
	}

	pub fn random_address() -> Address {
		Address::from_slice(&Self::random_bytes()[..20])
	}

	pub fn random_secrethash() -> SecretHash {
		SecretHash::from_slice(&Self::random_bytes())
	}
}
