//! End-to-end execution scenarios over the in-memory stores.

use primitive_types::{H160, H256, U256};
use soyuzvm::{
	legacy_create_address, CodeCache, CollectingSink, Environment, Executed, Executor, Fault,
	InMemoryState, InMemoryStorage, MapBlockHashes, Precompiles, Schedule, StateStore, StorageKey,
	StorageStore,
};

fn addr(n: u64) -> H160 {
	H160::from_low_u64_be(n)
}

fn word(n: u64) -> Vec<u8> {
	let mut bytes = [0u8; 32];
	U256::from(n).to_big_endian(&mut bytes);
	bytes.to_vec()
}

fn push20(address: H160) -> String {
	format!("73{}", hex::encode(address))
}

struct Vm {
	schedule: Schedule,
	state: InMemoryState,
	storage: InMemoryStorage,
	hashes: MapBlockHashes,
	precompiles: Precompiles,
	cache: CodeCache,
}

impl Vm {
	fn new(schedule: Schedule) -> Self {
		Self {
			schedule,
			state: InMemoryState::new(),
			storage: InMemoryStorage::new(),
			hashes: MapBlockHashes::new(),
			precompiles: Precompiles::frontier(),
			cache: CodeCache::new(),
		}
	}

	fn deploy(&mut self, address: H160, code_hex: &str) {
		let code = hex::decode(code_hex).expect("valid test bytecode");
		self.state.deploy(address, code, &self.schedule);
	}

	fn call(&mut self, target: H160, value: U256, data: Vec<u8>, gas: u64) -> Result<Executed, Fault> {
		let mut executor = Executor::new(
			&self.schedule,
			Environment::default(),
			&mut self.state,
			&mut self.storage,
			&self.hashes,
			&self.precompiles,
			&self.cache,
		);
		executor.transact_call(addr(0xbeef), target, value, data, gas)
	}

	fn call_traced(
		&mut self,
		target: H160,
		gas: u64,
		sink: &mut CollectingSink,
	) -> Result<Executed, Fault> {
		let mut executor = Executor::new(
			&self.schedule,
			Environment::default(),
			&mut self.state,
			&mut self.storage,
			&self.hashes,
			&self.precompiles,
			&self.cache,
		);
		executor.set_tracer(sink);
		executor.transact_call(addr(0xbeef), target, U256::zero(), Vec::new(), gas)
	}

	fn create(&mut self, value: U256, init_hex: &str, gas: u64) -> Result<(H160, Executed), Fault> {
		let init = hex::decode(init_hex).expect("valid test bytecode");
		let mut executor = Executor::new(
			&self.schedule,
			Environment::default(),
			&mut self.state,
			&mut self.storage,
			&self.hashes,
			&self.precompiles,
			&self.cache,
		);
		executor.transact_create(addr(0xbeef), value, init, gas)
	}
}

#[test]
fn arithmetic_store_return() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x100);
	// PUSH1 3, PUSH1 5, MUL, MSTORE at 0, RETURN 32 bytes.
	vm.deploy(target, "600360050260005260206000f3");

	let executed = vm.call(target, U256::zero(), Vec::new(), 100_000).unwrap();
	assert_eq!(executed.output, word(15));
	assert!(!executed.substate.reverted);
	// 4 pushes + MUL + MSTORE (3 + one word of growth) + 2 pushes + RETURN.
	assert_eq!(100_000 - executed.gas_left, 3 + 3 + 5 + 3 + 6 + 3 + 3);
}

#[test]
fn stack_underflow_is_a_transaction_failure() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x101);
	vm.deploy(target, "01");

	assert!(matches!(
		vm.call(target, U256::zero(), Vec::new(), 100_000),
		Err(Fault::StackUnderflow)
	));
	// The failed frame rolled back, the nonce bump did not.
	assert_eq!(vm.state.get_nonce(addr(0xbeef)), U256::one());
}

#[test]
fn out_of_gas_surfaces_at_the_root() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x102);
	vm.deploy(target, "600160015500");

	assert!(matches!(
		vm.call(target, U256::zero(), Vec::new(), 100),
		Err(Fault::OutOfGas)
	));
}

#[test]
fn revert_at_root_preserves_output_and_gas() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x103);
	// MSTORE 0xaa at 0, REVERT 32 bytes.
	vm.deploy(target, "60aa60005260206000fd");

	let executed = vm.call(target, U256::zero(), Vec::new(), 100_000).unwrap();
	assert!(executed.substate.reverted);
	assert_eq!(executed.output, word(0xaa));
	assert!(executed.gas_left > 0);
	assert!(executed.substate.logs.is_empty());
	assert_eq!(vm.state.get_nonce(addr(0xbeef)), U256::one());
}

#[test]
fn nested_revert_isolates_state_and_reports_return_data() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x200);
	let child = addr(0x201);

	// SSTORE slot 1 = 1, MSTORE 0xaa at 0, REVERT 32 bytes.
	vm.deploy(child, "600160015560aa60005260206000fd");

	// CALL the child with a 32-byte output window at 0, then lay out:
	// result word at 0x20, RETURNDATASIZE at 0x40, RETURNDATACOPY at 0x60.
	let code = [
		"6020", "6000", "6000", "6000", "6000",
		&push20(child),
		"61ffff",
		"f1",
		"602052",
		"3d", "604052",
		"6020", "6000", "6060", "3e",
		"6080", "6000", "f3",
	]
	.concat();
	vm.deploy(parent, &code);

	let executed = vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(executed.output.len(), 128);
	// Clamped output landed in the parent's buffer.
	assert_eq!(&executed.output[0..32], &word(0xaa)[..]);
	// The call pushed 0.
	assert_eq!(&executed.output[32..64], &word(0)[..]);
	// The full child output is visible through RETURNDATASIZE/COPY.
	assert_eq!(&executed.output[64..96], &word(32)[..]);
	assert_eq!(&executed.output[96..128], &word(0xaa)[..]);

	// The child's storage write rolled back and nothing of it merged.
	assert!(vm.storage.is_empty());
	assert_eq!(executed.substate.refund, 0);
	assert!(executed.substate.logs.is_empty());
}

#[test]
fn nested_exception_discards_child_effects_and_gas() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x210);
	let child = addr(0x211);

	// SSTORE slot 1 = 1, then an undefined opcode.
	vm.deploy(child, "6001600155fe");

	let code = [
		"6000", "6000", "6000", "6000", "6000",
		&push20(child),
		"61ffff",
		"f1",
		"600052",
		"60206000f3",
	]
	.concat();
	vm.deploy(parent, &code);

	let executed = vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(executed.output, word(0));
	assert!(vm.storage.is_empty());
	// All 0xffff forwarded gas was lost with the child.
	let baseline = 5 * 3 + 3 + 3 + 700 + 3 + 6 + 3 + 3;
	assert_eq!(200_000 - executed.gas_left, baseline + 0xffff);
}

#[test]
fn nested_success_merges_and_clamps_output() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x220);
	let child = addr(0x221);

	// Return 64 bytes: word 0x11 then word 0x22.
	vm.deploy(child, "6011600052602260205260406000f3");

	// 32-byte output window; then result word and RETURNDATASIZE.
	let code = [
		"6020", "6000", "6000", "6000", "6000",
		&push20(child),
		"61ffff",
		"f1",
		"602052",
		"3d", "604052",
		"6060", "6000", "f3",
	]
	.concat();
	vm.deploy(parent, &code);

	let executed = vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(&executed.output[0..32], &word(0x11)[..]);
	assert_eq!(&executed.output[32..64], &word(1)[..]);
	assert_eq!(&executed.output[64..96], &word(64)[..]);
}

#[test]
fn create_collision_pushes_zero_and_keeps_base_cost() {
	let mut vm = Vm::new(Schedule::byzantium());
	let creator = addr(0x230);
	let occupied = legacy_create_address(creator, U256::zero());

	vm.deploy(occupied, "00");
	// CREATE with empty init code, then return the result word.
	vm.deploy(creator, "600060006000f060005260206000f3");

	let executed = vm.call(creator, U256::zero(), Vec::new(), 100_000).unwrap();
	assert_eq!(executed.output, word(0));
	// Three pushes, CREATE base only (forwarded gas returned), store+return.
	assert_eq!(100_000 - executed.gas_left, 9 + 32_000 + 3 + 6 + 3 + 3);
	// The colliding create did not bump the creator nonce.
	assert_eq!(vm.state.get_nonce(creator), U256::zero());
}

#[test]
fn create_deploys_returned_code() {
	let mut vm = Vm::new(Schedule::byzantium());
	let creator = addr(0x240);

	// Init code (10 bytes): MSTORE 0x01 at 0, RETURN 1 byte from offset 31.
	let init = "60016000526001601ff3";
	// CODECOPY the trailing init code to memory, CREATE, return the address.
	let code = [
		"600a", "6016", "6000", "39",
		"600a", "6000", "6000", "f0",
		"600052", "60206000f3",
		init,
	]
	.concat();
	vm.deploy(creator, &code);

	let expected = legacy_create_address(creator, U256::zero());
	let executed = vm.call(creator, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(&executed.output[12..32], expected.as_bytes());

	let deployed = vm.state.get_code(vm.state.get_code_hash(expected));
	assert_eq!(deployed, vec![0x01]);
	// EIP-161: the created account starts at nonce 1; the creator moved on.
	assert_eq!(vm.state.get_nonce(expected), U256::one());
	assert_eq!(vm.state.get_nonce(creator), U256::one());
}

#[test]
fn transact_create_installs_code_and_charges_deposit() {
	let mut vm = Vm::new(Schedule::byzantium());
	let caller = addr(0xbeef);

	let (address, executed) = vm.create(U256::zero(), "60016000526001601ff3", 100_000).unwrap();
	assert_eq!(address, legacy_create_address(caller, U256::zero()));
	assert!(!executed.substate.reverted);
	assert_eq!(vm.state.get_code(vm.state.get_code_hash(address)), vec![0x01]);
	// Init: 2 pushes + MSTORE with growth + 2 pushes + RETURN, then the
	// one-byte deposit.
	assert_eq!(100_000 - executed.gas_left, 3 + 3 + 6 + 3 + 3 + 200);
}

#[test]
fn call_stipend_funds_an_empty_callee() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x250);
	let target = addr(0x251);
	vm.state.fund(parent, U256::from(10));

	// CALL target with value 1 and zero forwarded gas, return result word.
	let code = [
		"6000", "6000", "6000", "6000", "6001",
		&push20(target),
		"6000",
		"f1",
		"600052",
		"60206000f3",
	]
	.concat();
	vm.deploy(parent, &code);

	let executed = vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(executed.output, word(1));
	assert_eq!(vm.state.get_balance(target), U256::one());
	assert_eq!(vm.state.get_balance(parent), U256::from(9));
	// The callee has no code: the whole stipend came back unused.
	let baseline = 6 * 3 + 3 + 700 + 9000 + 25_000 + 3 + 6 + 3 + 3;
	assert_eq!(200_000 - executed.gas_left, baseline as u64);
}

#[test]
fn forwarded_gas_respects_the_sixty_three_sixty_fourths_cap() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x260);
	let child = addr(0x261);
	vm.deploy(child, "00");

	// Request far more gas than exists; the cap decides what is forwarded.
	let code = [
		"6000", "6000", "6000", "6000", "6000",
		&push20(child),
		"67ffffffffffffffff",
		"f1",
		"00",
	]
	.concat();
	vm.deploy(parent, &code);

	let mut sink = CollectingSink::default();
	vm.call_traced(parent, 200_000, &mut sink).unwrap();

	let gas_at_call = 200_000 - (5 * 3 + 3 + 3) as u64;
	let after_base = gas_at_call - 700;
	let expected = after_base - after_base / 64;

	let child_entry = sink
		.steps
		.iter()
		.find(|step| step.depth == 1)
		.expect("child executed at least one instruction");
	assert_eq!(child_entry.gas_before, expected);
}

#[test]
fn static_call_blocks_state_mutation() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x270);
	let child = addr(0x271);
	vm.deploy(child, "600160015500");

	// STATICCALL the child, return the result word.
	let code = [
		"6000", "6000", "6000", "6000",
		&push20(child),
		"61ffff",
		"fa",
		"600052",
		"60206000f3",
	]
	.concat();
	vm.deploy(parent, &code);

	let executed = vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(executed.output, word(0));
	assert!(vm.storage.is_empty());
}

#[test]
fn delegatecall_runs_in_the_caller_context() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x280);
	let library = addr(0x281);
	vm.deploy(library, "600760015500");

	let code = [
		"6000", "6000", "6000", "6000",
		&push20(library),
		"61ffff",
		"f4",
		"00",
	]
	.concat();
	vm.deploy(parent, &code);

	vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	// The write landed in the parent's storage, not the library's.
	let parent_slot = StorageKey::new(parent, H256::from_low_u64_be(1));
	let library_slot = StorageKey::new(library, H256::from_low_u64_be(1));
	assert_eq!(vm.storage.get(&parent_slot), word(7));
	assert!(vm.storage.get(&library_slot).is_empty());
}

#[test]
fn sstore_clear_grants_the_refund() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x290);
	vm.deploy(target, "600060015500");
	vm.storage
		.set(StorageKey::new(target, H256::from_low_u64_be(1)), word(1));

	let executed = vm.call(target, U256::zero(), Vec::new(), 100_000).unwrap();
	assert_eq!(executed.substate.refund, 15_000);
	assert!(vm
		.storage
		.get(&StorageKey::new(target, H256::from_low_u64_be(1)))
		.is_empty());
	// Clearing still pays the reset price.
	assert_eq!(100_000 - executed.gas_left, 3 + 3 + 5000);
}

#[test]
fn selfdestruct_moves_the_balance_and_records_the_account() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x2a0);
	let inheritor = addr(0x2a1);
	vm.deploy(target, &format!("{}ff", push20(inheritor)));
	vm.state.fund(target, U256::from(77));

	let executed = vm.call(target, U256::zero(), Vec::new(), 100_000).unwrap();
	assert!(executed.substate.destroys.contains(&target));
	assert_eq!(executed.substate.refund, 24_000);
	assert_eq!(vm.state.get_balance(inheritor), U256::from(77));
	assert_eq!(vm.state.get_balance(target), U256::zero());
	// PUSH20 + SELFDESTRUCT with the new-account surcharge.
	assert_eq!(100_000 - executed.gas_left, 3 + 5000 + 25_000);
}

#[test]
fn logs_merge_into_the_substate() {
	let mut vm = Vm::new(Schedule::byzantium());
	let target = addr(0x2b0);
	// MSTORE 0xaa at 0, LOG1 with topic 0x42 over those 32 bytes.
	vm.deploy(target, "60aa600052604260206000a100");

	let executed = vm.call(target, U256::zero(), Vec::new(), 100_000).unwrap();
	assert_eq!(executed.substate.logs.len(), 1);
	let log = &executed.substate.logs[0];
	assert_eq!(log.address, target);
	assert_eq!(log.topics, vec![H256::from_low_u64_be(0x42)]);
	assert_eq!(log.data, word(0xaa));
}

#[test]
fn direct_precompile_call() {
	let mut vm = Vm::new(Schedule::byzantium());
	let executed = vm
		.call(addr(4), U256::zero(), b"abc".to_vec(), 1_000)
		.unwrap();
	assert_eq!(executed.output, b"abc");
	assert_eq!(1_000 - executed.gas_left, 15 + 3);
}

#[test]
fn precompile_oog_keeps_the_parity_touch() {
	let mut vm = Vm::new(Schedule::byzantium());
	let parent = addr(0x2c0);

	// Forward only 10 gas to the identity precompile, zero value.
	let code = [
		"6000", "6000", "6000", "6000", "6000",
		&push20(addr(4)),
		"600a",
		"f1",
		"600052",
		"60206000f3",
	]
	.concat();
	vm.deploy(parent, &code);

	let executed = vm.call(parent, U256::zero(), Vec::new(), 200_000).unwrap();
	assert_eq!(executed.output, word(0));
	// The rollback erased the transfer's touch; the carve-out re-applied it.
	assert!(vm.state.touched().contains(&addr(4)));
}

#[test]
fn execution_is_deterministic() {
	let run = || {
		let mut vm = Vm::new(Schedule::byzantium());
		let parent = addr(0x2d0);
		let child = addr(0x2d1);
		vm.deploy(child, "600160015560aa60005260206000fd");
		let code = [
			"6020", "6000", "6000", "6000", "6000",
			&push20(child),
			"61ffff",
			"f1",
			"602052",
			"6040", "6000", "f3",
		]
		.concat();
		vm.deploy(parent, &code);
		let executed = vm.call(parent, U256::zero(), Vec::new(), 300_000).unwrap();
		(executed.output, executed.gas_left, executed.substate.refund)
	};

	assert_eq!(run(), run());
}
