//! World-state collaborator contracts.
//!
//! The interpreter core does not own account or storage data. It drives the
//! stores below, which must support LIFO snapshot/restore: a child frame's
//! snapshot is always taken after its parent's and rolled back (or abandoned)
//! strictly before it.

use primitive_types::{H160, H256, U256};

use crate::frame::Environment;
use crate::schedule::Schedule;

/// Opaque snapshot token. Tokens are ordered: restoring a token discards
/// every snapshot taken after it.
pub type Snapshot = usize;

/// Key of one persistent storage slot.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct StorageKey {
	/// Owning account.
	pub address: H160,
	/// 256-bit slot index.
	pub index: H256,
}

impl StorageKey {
	/// Key of `index` under `address`.
	pub fn new(address: H160, index: H256) -> Self {
		Self { address, index }
	}
}

/// Balance mutation passed to [`StateStore::update_balance`]. `Add(0)` is a
/// pure touch: it changes nothing but marks the account as touched under
/// EIP-158 sweeping rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BalanceDelta {
	/// Credit the account.
	Add(U256),
	/// Debit the account. Callers check funds first.
	Sub(U256),
}

/// Accounts, balances, nonces and code.
pub trait StateStore {
	/// Whether any account record exists at `address`.
	fn account_exists(&self, address: H160) -> bool;

	/// EIP-158 dead check: no account, or nonce = 0, balance = 0 and empty
	/// code.
	fn is_dead_account(&self, address: H160) -> bool;

	/// Create an account with the given starting balance.
	fn create_account(&mut self, address: H160, balance: U256);

	/// Balance of `address`, zero when absent.
	fn get_balance(&self, address: H160) -> U256;

	/// Apply a balance delta. The schedule decides whether the write also
	/// counts as an EIP-158 touch.
	fn update_balance(&mut self, address: H160, delta: BalanceDelta, schedule: &Schedule);

	/// Nonce of `address`, zero when absent.
	fn get_nonce(&self, address: H160) -> U256;

	/// Increment the nonce, materializing the account if needed.
	fn increment_nonce(&mut self, address: H160);

	/// Code hash of `address`; the hash of empty code when absent.
	fn get_code_hash(&self, address: H160) -> H256;

	/// Code bytes stored under `hash`.
	fn get_code(&self, hash: H256) -> Vec<u8>;

	/// Persist `code` and return its hash.
	fn update_code(&mut self, code: Vec<u8>) -> H256;

	/// Point `address` at previously stored code.
	fn update_code_hash(&mut self, address: H160, hash: H256, schedule: &Schedule);

	/// Remove the account record entirely.
	fn delete_account(&mut self, address: H160);

	/// Capture the current state.
	fn take_snapshot(&mut self) -> Snapshot;

	/// Roll back to `snapshot`, discarding it and everything taken after it.
	fn restore(&mut self, snapshot: Snapshot);
}

/// Persistent storage slots.
///
/// A zero value is stored as an empty byte slice; readers treat missing and
/// zero-valued slots as equivalent.
pub trait StorageStore {
	/// Current bytes of the slot; empty when unset.
	fn get(&self, key: &StorageKey) -> Vec<u8>;

	/// Overwrite the slot.
	fn set(&mut self, key: StorageKey, value: Vec<u8>);

	/// Capture the current storage.
	fn take_snapshot(&mut self) -> Snapshot;

	/// Roll back to `snapshot`, discarding it and everything taken after it.
	fn restore(&mut self, snapshot: Snapshot);
}

/// Resolver of historical block hashes for BLOCKHASH.
pub trait BlockHashOracle {
	/// Hash of `number` as seen from the executing block, or `None` when the
	/// block is unavailable (out of range); `None` reads as thirty-two zero
	/// bytes.
	fn block_hash(&self, env: &Environment, number: U256) -> Option<H256>;
}
