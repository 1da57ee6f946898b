//! In-memory reference stores.
//!
//! Snapshot-capable implementations of the store contracts, used by the test
//! suite and by embedders that do not need persistence. Snapshots are whole
//! clones kept on a stack; tokens are indices into it.

use std::collections::{BTreeMap, BTreeSet};

use primitive_types::{H160, H256, U256};

use crate::frame::Environment;
use crate::schedule::Schedule;
use crate::state::{
	BalanceDelta, BlockHashOracle, Snapshot, StateStore, StorageKey, StorageStore,
};
use crate::utils::{keccak256, KECCAK_EMPTY};

#[derive(Clone, Debug)]
struct Account {
	balance: U256,
	nonce: U256,
	code_hash: H256,
}

impl Account {
	fn empty() -> Self {
		Self {
			balance: U256::zero(),
			nonce: U256::zero(),
			code_hash: KECCAK_EMPTY,
		}
	}
}

#[derive(Clone, Debug, Default)]
struct World {
	accounts: BTreeMap<H160, Account>,
	touched: BTreeSet<H160>,
}

/// Account store over a plain map.
#[derive(Debug, Default)]
pub struct InMemoryState {
	world: World,
	/// Code bodies by hash. Content-addressed, so never rolled back.
	code: BTreeMap<H256, Vec<u8>>,
	snapshots: Vec<World>,
}

impl InMemoryState {
	/// An empty world.
	pub fn new() -> Self {
		Self::default()
	}

	/// Credit `balance` to an account, materializing it if needed. Test
	/// setup helper; does not count as an EIP-158 touch.
	pub fn fund(&mut self, address: H160, balance: U256) {
		let account = self
			.world
			.accounts
			.entry(address)
			.or_insert_with(Account::empty);
		account.balance = account.balance.saturating_add(balance);
	}

	/// Install `code` on `address`, creating the account if needed.
	pub fn deploy(&mut self, address: H160, code: Vec<u8>, schedule: &Schedule) {
		if !self.account_exists(address) {
			self.create_account(address, U256::zero());
		}
		let hash = self.update_code(code);
		self.update_code_hash(address, hash, schedule);
	}

	/// Accounts touched under EIP-158 since construction.
	pub fn touched(&self) -> &BTreeSet<H160> {
		&self.world.touched
	}

	/// Remove every touched account that is dead, the end-of-transaction
	/// sweep a committing caller performs.
	pub fn sweep_dead_accounts(&mut self) {
		let touched = std::mem::take(&mut self.world.touched);
		for address in touched {
			if self.is_dead_account(address) {
				self.delete_account(address);
			}
		}
	}
}

impl StateStore for InMemoryState {
	fn account_exists(&self, address: H160) -> bool {
		self.world.accounts.contains_key(&address)
	}

	fn is_dead_account(&self, address: H160) -> bool {
		match self.world.accounts.get(&address) {
			None => true,
			Some(account) => {
				account.balance.is_zero()
					&& account.nonce.is_zero()
					&& account.code_hash == KECCAK_EMPTY
			}
		}
	}

	fn create_account(&mut self, address: H160, balance: U256) {
		let mut account = Account::empty();
		account.balance = balance;
		self.world.accounts.insert(address, account);
	}

	fn get_balance(&self, address: H160) -> U256 {
		self.world
			.accounts
			.get(&address)
			.map(|account| account.balance)
			.unwrap_or_default()
	}

	fn update_balance(&mut self, address: H160, delta: BalanceDelta, schedule: &Schedule) {
		let account = self
			.world
			.accounts
			.entry(address)
			.or_insert_with(Account::empty);
		match delta {
			BalanceDelta::Add(value) => account.balance = account.balance.saturating_add(value),
			BalanceDelta::Sub(value) => account.balance = account.balance.saturating_sub(value),
		}
		if schedule.eip158 {
			self.world.touched.insert(address);
		}
	}

	fn get_nonce(&self, address: H160) -> U256 {
		self.world
			.accounts
			.get(&address)
			.map(|account| account.nonce)
			.unwrap_or_default()
	}

	fn increment_nonce(&mut self, address: H160) {
		let account = self
			.world
			.accounts
			.entry(address)
			.or_insert_with(Account::empty);
		account.nonce = account.nonce.saturating_add(U256::one());
	}

	fn get_code_hash(&self, address: H160) -> H256 {
		self.world
			.accounts
			.get(&address)
			.map(|account| account.code_hash)
			.unwrap_or(KECCAK_EMPTY)
	}

	fn get_code(&self, hash: H256) -> Vec<u8> {
		if hash == KECCAK_EMPTY {
			return Vec::new();
		}
		self.code.get(&hash).cloned().unwrap_or_default()
	}

	fn update_code(&mut self, code: Vec<u8>) -> H256 {
		let hash = keccak256(&code);
		self.code.insert(hash, code);
		hash
	}

	fn update_code_hash(&mut self, address: H160, hash: H256, _schedule: &Schedule) {
		let account = self
			.world
			.accounts
			.entry(address)
			.or_insert_with(Account::empty);
		account.code_hash = hash;
	}

	fn delete_account(&mut self, address: H160) {
		self.world.accounts.remove(&address);
		self.world.touched.remove(&address);
	}

	fn take_snapshot(&mut self) -> Snapshot {
		self.snapshots.push(self.world.clone());
		self.snapshots.len() - 1
	}

	fn restore(&mut self, snapshot: Snapshot) {
		self.world = self.snapshots[snapshot].clone();
		self.snapshots.truncate(snapshot);
	}
}

/// Storage-slot store over a plain map. Zero values are kept as absent
/// entries, per the store contract.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
	slots: BTreeMap<StorageKey, Vec<u8>>,
	snapshots: Vec<BTreeMap<StorageKey, Vec<u8>>>,
}

impl InMemoryStorage {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live (non-zero) slots, for assertions.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Whether no slot holds a value.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

impl StorageStore for InMemoryStorage {
	fn get(&self, key: &StorageKey) -> Vec<u8> {
		self.slots.get(key).cloned().unwrap_or_default()
	}

	fn set(&mut self, key: StorageKey, value: Vec<u8>) {
		if value.is_empty() {
			self.slots.remove(&key);
		} else {
			self.slots.insert(key, value);
		}
	}

	fn take_snapshot(&mut self) -> Snapshot {
		self.snapshots.push(self.slots.clone());
		self.snapshots.len() - 1
	}

	fn restore(&mut self, snapshot: Snapshot) {
		self.slots = self.snapshots[snapshot].clone();
		self.snapshots.truncate(snapshot);
	}
}

/// Block-hash oracle over a fixed map.
#[derive(Debug, Default)]
pub struct MapBlockHashes {
	hashes: BTreeMap<U256, H256>,
}

impl MapBlockHashes {
	/// Oracle with no known hashes.
	pub fn new() -> Self {
		Self::default()
	}

	/// Record the hash of block `number`.
	pub fn insert(&mut self, number: U256, hash: H256) {
		self.hashes.insert(number, hash);
	}
}

impl BlockHashOracle for MapBlockHashes {
	fn block_hash(&self, _env: &Environment, number: U256) -> Option<H256> {
		self.hashes.get(&number).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshots_are_lifo() {
		let mut state = InMemoryState::new();
		let a = H160::repeat_byte(1);

		state.create_account(a, U256::from(10));
		let outer = state.take_snapshot();
		state.update_balance(a, BalanceDelta::Add(U256::from(5)), &Schedule::frontier());
		let inner = state.take_snapshot();
		state.update_balance(a, BalanceDelta::Add(U256::from(5)), &Schedule::frontier());

		state.restore(inner);
		assert_eq!(state.get_balance(a), U256::from(15));
		state.restore(outer);
		assert_eq!(state.get_balance(a), U256::from(10));
	}

	#[test]
	fn dead_account_rules() {
		let mut state = InMemoryState::new();
		let a = H160::repeat_byte(2);
		assert!(state.is_dead_account(a));

		state.create_account(a, U256::zero());
		assert!(state.is_dead_account(a));
		state.update_balance(a, BalanceDelta::Add(U256::one()), &Schedule::spurious_dragon());
		assert!(!state.is_dead_account(a));
	}

	#[test]
	fn touch_and_sweep() {
		let schedule = Schedule::spurious_dragon();
		let mut state = InMemoryState::new();
		let a = H160::repeat_byte(3);

		state.update_balance(a, BalanceDelta::Add(U256::zero()), &schedule);
		assert!(state.touched().contains(&a));
		assert!(state.account_exists(a));
		state.sweep_dead_accounts();
		assert!(!state.account_exists(a));
	}

	#[test]
	fn zero_storage_writes_erase() {
		let mut storage = InMemoryStorage::new();
		let key = StorageKey::new(H160::repeat_byte(4), H256::from_low_u64_be(1));

		storage.set(key, vec![0xaa; 32]);
		assert_eq!(storage.len(), 1);
		storage.set(key, Vec::new());
		assert!(storage.is_empty());
		assert!(storage.get(&key).is_empty());
	}

	#[test]
	fn code_is_content_addressed() {
		let mut state = InMemoryState::new();
		let hash = state.update_code(vec![0x60, 0x01]);
		assert_eq!(state.get_code(hash), vec![0x60, 0x01]);
		assert!(state.get_code(KECCAK_EMPTY).is_empty());
	}
}
