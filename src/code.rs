//! Analyzed bytecode and the shared code cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use primitive_types::{H160, H256};

use crate::valids::Valids;

/// Immutable bytecode with its precomputed jump-destination map. Instances
/// are content-addressed by code hash and shared between frames.
#[derive(Clone, Debug)]
pub struct CodeInfo {
	code: Vec<u8>,
	valids: Valids,
	precompile: Option<H160>,
}

impl CodeInfo {
	/// Analyze `code`.
	pub fn new(code: Vec<u8>) -> Self {
		let valids = Valids::new(&code);
		Self {
			code,
			valids,
			precompile: None,
		}
	}

	/// Marker code for a precompiled contract at `address`. Carries no
	/// bytecode; the executor routes such frames to the handler registry.
	pub fn precompile(address: H160) -> Self {
		Self {
			code: Vec::new(),
			valids: Valids::new(&[]),
			precompile: Some(address),
		}
	}

	/// Raw bytecode.
	#[inline]
	pub fn bytes(&self) -> &[u8] {
		&self.code
	}

	/// Bytecode length.
	#[inline]
	pub fn len(&self) -> usize {
		self.code.len()
	}

	/// Whether there is no code to run.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.code.is_empty()
	}

	/// The byte at `position`, if any.
	#[inline]
	pub fn get(&self, position: usize) -> Option<u8> {
		self.code.get(position).copied()
	}

	/// Whether `position` is a legal jump target.
	#[inline]
	pub fn is_valid_jump(&self, position: usize) -> bool {
		self.valids.is_valid(position)
	}

	/// The precompile tag, when this stands in for a precompiled contract.
	#[inline]
	pub fn precompile_address(&self) -> Option<H160> {
		self.precompile
	}
}

/// Number of analyzed code entries kept in memory.
pub const CODE_CACHE_CAPACITY: usize = 4096;

/// Read-through LRU cache of [`CodeInfo`] keyed by code hash. Entries are
/// immutable once constructed, so handing out shared `Arc`s is safe; a racing
/// rebuild of the same hash yields a value-equal entry.
pub struct CodeCache {
	cache: Mutex<LruCache<H256, Arc<CodeInfo>>>,
}

impl CodeCache {
	/// Cache with the default capacity.
	pub fn new() -> Self {
		Self::with_capacity(CODE_CACHE_CAPACITY)
	}

	/// Cache holding up to `capacity` entries.
	pub fn with_capacity(capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
		Self {
			cache: Mutex::new(LruCache::new(capacity)),
		}
	}

	/// Fetch the analysis for `hash`, building it from `load` on a miss.
	pub fn get_or_insert<F>(&self, hash: H256, load: F) -> Arc<CodeInfo>
	where
		F: FnOnce() -> Vec<u8>,
	{
		let mut cache = self.cache.lock();
		if let Some(info) = cache.get(&hash) {
			return info.clone();
		}
		let info = Arc::new(CodeInfo::new(load()));
		cache.put(hash, info.clone());
		info
	}
}

impl Default for CodeCache {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::keccak256;

	#[test]
	fn cache_is_read_through() {
		let cache = CodeCache::with_capacity(2);
		let code = vec![0x60, 0x01, 0x5b];
		let hash = keccak256(&code);

		let first = cache.get_or_insert(hash, || code.clone());
		let second = cache.get_or_insert(hash, || panic!("must hit the cache"));
		assert!(Arc::ptr_eq(&first, &second));
		assert!(first.is_valid_jump(2));
	}

	#[test]
	fn lru_evicts_oldest() {
		let cache = CodeCache::with_capacity(1);
		let first = keccak256(b"a");
		let second = keccak256(b"b");

		cache.get_or_insert(first, || vec![0x00]);
		cache.get_or_insert(second, || vec![0x00]);
		let mut rebuilt = false;
		cache.get_or_insert(first, || {
			rebuilt = true;
			vec![0x00]
		});
		assert!(rebuilt);
	}
}
