//! Small byte and word utilities.

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

use crate::error::Fault;

/// Keccak-256 of the empty byte string, the code hash of code-less accounts.
pub const KECCAK_EMPTY: H256 = H256([
	0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
	0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Keccak-256 of `bytes`.
pub fn keccak256(bytes: &[u8]) -> H256 {
	H256::from_slice(Keccak256::digest(bytes).as_slice())
}

/// Round `value` up to the next multiple of 32.
#[inline]
pub const fn ceil32(value: usize) -> usize {
	match value % 32 {
		0 => value,
		rem => value + 32 - rem,
	}
}

/// Number of 32-byte words needed to hold `bytes`.
#[inline]
pub const fn words_for(bytes: usize) -> usize {
	ceil32(bytes) / 32
}

/// Take `len` bytes of `source` starting at `offset`, zero-padding wherever
/// the requested range leaves the source.
pub fn slice_padded(source: &[u8], offset: U256, len: usize) -> Vec<u8> {
	let mut result = vec![0u8; len];
	if offset <= U256::from(usize::MAX) {
		let offset = offset.as_usize();
		if offset < source.len() {
			let copy = core::cmp::min(len, source.len() - offset);
			result[..copy].copy_from_slice(&source[offset..offset + copy]);
		}
	}
	result
}

/// Convert a word to `usize`, faulting when it does not fit the machine.
#[inline]
pub fn u256_to_usize(value: U256, fault: Fault) -> Result<usize, Fault> {
	if value > U256::from(usize::MAX) {
		return Err(fault);
	}
	Ok(value.as_usize())
}

/// Low 20 bytes of a word, as an address.
#[inline]
pub fn u256_to_address(value: U256) -> H160 {
	let mut bytes = [0u8; 32];
	value.to_big_endian(&mut bytes);
	H160::from_slice(&bytes[12..])
}

/// Address widened to a word.
#[inline]
pub fn address_to_u256(value: H160) -> U256 {
	U256::from_big_endian(value.as_bytes())
}

/// Word from a 32-byte hash.
#[inline]
pub fn h256_to_u256(value: H256) -> U256 {
	U256::from_big_endian(value.as_bytes())
}

/// 32-byte hash from a word.
#[inline]
pub fn u256_to_h256(value: U256) -> H256 {
	let mut bytes = [0u8; 32];
	value.to_big_endian(&mut bytes);
	H256(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn padded_slice() {
		let source = [1u8, 2, 3];
		assert_eq!(slice_padded(&source, U256::zero(), 2), vec![1, 2]);
		assert_eq!(slice_padded(&source, U256::from(2), 3), vec![3, 0, 0]);
		assert_eq!(slice_padded(&source, U256::from(10), 2), vec![0, 0]);
		assert_eq!(slice_padded(&source, U256::MAX, 2), vec![0, 0]);
	}

	#[test]
	fn address_round_trip() {
		let address = H160::repeat_byte(0xab);
		assert_eq!(u256_to_address(address_to_u256(address)), address);
	}

	#[test]
	fn ceil32_boundaries() {
		assert_eq!(ceil32(0), 0);
		assert_eq!(ceil32(1), 32);
		assert_eq!(ceil32(32), 32);
		assert_eq!(ceil32(33), 64);
	}
}
