//! Byte-addressable frame memory.

use primitive_types::{H256, U256};

use crate::utils;

/// Zero-initialized memory, lazily grown in 32-byte words. Growth is charged
/// by the gasometer before the instruction touches the region; the methods
/// here only move bytes.
#[derive(Clone, Debug, Default)]
pub struct Memory {
	data: Vec<u8>,
}

impl Memory {
	/// Create an empty memory.
	pub fn new() -> Self {
		Self { data: Vec::new() }
	}

	/// Size of the active region in bytes. Always a multiple of 32.
	#[inline]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	/// Whether nothing has been touched yet.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Size of the active region in words.
	#[inline]
	pub fn word_count(&self) -> usize {
		self.data.len() / 32
	}

	/// Raw view of the active region.
	#[inline]
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// Grow the active region to hold `size` bytes, rounded up to the next
	/// word boundary. Never shrinks.
	pub fn expand(&mut self, size: usize) {
		if size > self.data.len() {
			self.data.resize(utils::ceil32(size), 0);
		}
	}

	/// Copy `len` bytes starting at `offset`, reading zeroes past the end of
	/// the active region. A zero-length read does not grow memory.
	pub fn get(&self, offset: usize, len: usize) -> Vec<u8> {
		utils::slice_padded(&self.data, U256::from(offset), len)
	}

	/// Read the 32-byte word at `offset`.
	pub fn load_word(&self, offset: usize) -> H256 {
		H256::from_slice(&self.get(offset, 32))
	}

	/// Write `value` at `offset`, growing as needed.
	pub fn write_slice(&mut self, offset: usize, value: &[u8]) {
		if value.is_empty() {
			return;
		}
		self.expand(offset + value.len());
		self.data[offset..offset + value.len()].copy_from_slice(value);
	}

	/// Write the 32-byte big-endian representation of `value` at `offset`.
	pub fn store_word(&mut self, offset: usize, value: U256) {
		let mut bytes = [0u8; 32];
		value.to_big_endian(&mut bytes);
		self.write_slice(offset, &bytes);
	}

	/// Write a single byte at `offset`.
	pub fn store_byte(&mut self, offset: usize, value: u8) {
		self.expand(offset + 1);
		self.data[offset] = value;
	}

	/// Copy `len` bytes of `source` starting at `source_offset` to `offset`,
	/// zero-filling where the source runs out. The source offset may exceed
	/// the source length entirely.
	pub fn copy_from(&mut self, offset: usize, source_offset: U256, len: usize, source: &[u8]) {
		if len == 0 {
			return;
		}
		let data = utils::slice_padded(source, source_offset, len);
		self.write_slice(offset, &data);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn grows_by_words() {
		let mut memory = Memory::new();
		memory.store_byte(0, 0xff);
		assert_eq!(memory.len(), 32);
		memory.store_word(40, U256::from(1));
		assert_eq!(memory.len(), 96);
		assert_eq!(memory.word_count(), 3);
	}

	#[test]
	fn zero_length_read_does_not_grow() {
		let memory = Memory::new();
		assert!(memory.get(1000, 0).is_empty());
		assert_eq!(memory.len(), 0);
	}

	#[test]
	fn reads_past_end_are_zero() {
		let mut memory = Memory::new();
		memory.store_byte(0, 0xaa);
		let read = memory.get(31, 4);
		assert_eq!(read, vec![0, 0, 0, 0]);
	}

	#[test]
	fn word_round_trip() {
		let mut memory = Memory::new();
		let value = U256::from(0x1122334455667788u64);
		memory.store_word(64, value);
		assert_eq!(U256::from_big_endian(memory.load_word(64).as_bytes()), value);
	}

	#[test]
	fn copy_from_pads_with_zero() {
		let mut memory = Memory::new();
		memory.copy_from(0, U256::from(2), 6, &[1, 2, 3, 4]);
		assert_eq!(&memory.data()[0..6], &[3, 4, 0, 0, 0, 0]);
	}
}
