//! Precompiled contract dispatch.

use std::collections::BTreeMap;

use primitive_types::H160;
use sha2::{Digest, Sha256};

use crate::schedule::Schedule;
use crate::utils;

/// One precompiled contract. Gas is charged as `base_cost + data_cost` before
/// the handler runs; a handler that cannot produce a result reports `ok =
/// false` and yields a zero result word without reverting state.
pub trait Precompile {
	/// Flat invocation cost.
	fn base_cost(&self, schedule: &Schedule) -> u64;

	/// Input-dependent cost.
	fn data_cost(&self, input: &[u8], schedule: &Schedule) -> u64;

	/// Execute on `input`, returning the output and whether it succeeded.
	fn run(&self, input: &[u8]) -> (Vec<u8>, bool);
}

/// Address-keyed registry of precompile handlers.
#[derive(Default)]
pub struct Precompiles {
	handlers: BTreeMap<H160, Box<dyn Precompile>>,
}

impl Precompiles {
	/// Registry with no handlers.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Registry with the handlers this crate implements itself: `sha256`
	/// (0x02) and `identity` (0x04). The cryptographic handlers are external
	/// collaborators and are added through [`Precompiles::insert`].
	pub fn frontier() -> Self {
		let mut registry = Self::empty();
		registry.insert(H160::from_low_u64_be(2), Box::new(Sha256Hash));
		registry.insert(H160::from_low_u64_be(4), Box::new(Identity));
		registry
	}

	/// Register `handler` at `address`, replacing any previous one.
	pub fn insert(&mut self, address: H160, handler: Box<dyn Precompile>) {
		self.handlers.insert(address, handler);
	}

	/// Whether a handler is registered at `address`.
	pub fn contains(&self, address: H160) -> bool {
		self.handlers.contains_key(&address)
	}

	/// Handler registered at `address`, if any.
	pub fn get(&self, address: H160) -> Option<&dyn Precompile> {
		self.handlers.get(&address).map(|handler| handler.as_ref())
	}
}

/// `0x02`: SHA-256 of the input.
pub struct Sha256Hash;

impl Precompile for Sha256Hash {
	fn base_cost(&self, _schedule: &Schedule) -> u64 {
		60
	}

	fn data_cost(&self, input: &[u8], _schedule: &Schedule) -> u64 {
		12 * utils::words_for(input.len()) as u64
	}

	fn run(&self, input: &[u8]) -> (Vec<u8>, bool) {
		(Sha256::digest(input).to_vec(), true)
	}
}

/// `0x04`: the identity function.
pub struct Identity;

impl Precompile for Identity {
	fn base_cost(&self, _schedule: &Schedule) -> u64 {
		15
	}

	fn data_cost(&self, input: &[u8], _schedule: &Schedule) -> u64 {
		3 * utils::words_for(input.len()) as u64
	}

	fn run(&self, input: &[u8]) -> (Vec<u8>, bool) {
		(input.to_vec(), true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn identity_echoes_input() {
		let (output, ok) = Identity.run(b"hello");
		assert!(ok);
		assert_eq!(output, b"hello");
		let schedule = Schedule::byzantium();
		assert_eq!(Identity.base_cost(&schedule), 15);
		assert_eq!(Identity.data_cost(&[0; 33], &schedule), 6);
	}

	#[test]
	fn sha256_digest() {
		let (output, ok) = Sha256Hash.run(b"abc");
		assert!(ok);
		assert_eq!(
			output,
			hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad").to_vec()
		);
	}

	#[test]
	fn registry_lookup() {
		let registry = Precompiles::frontier();
		assert!(registry.contains(H160::from_low_u64_be(2)));
		assert!(registry.contains(H160::from_low_u64_be(4)));
		assert!(!registry.contains(H160::from_low_u64_be(1)));
	}
}
