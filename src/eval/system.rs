//! Opcodes that consult or mutate the world state, and the CALL/CREATE
//! suspension points.

use primitive_types::U256;

use super::{Control, Exit, Step};
use crate::call::{CallPlan, CallScheme, ChildPlan, CreatePlan, Transfer};
use crate::error::Fault;
use crate::frame::{Context, Frame, Log};
use crate::host::Host;
use crate::state::{BalanceDelta, StorageKey};
use crate::utils::{self, KECCAK_EMPTY};

pub fn sha3(frame: &mut Frame) -> Control {
	pop_u256!(frame, offset, len);
	let data = if len.is_zero() {
		Vec::new()
	} else {
		let offset = as_usize_or_fault!(offset, Fault::ArithmeticOverflow);
		let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
		frame.memory.get(offset, len)
	};
	push_u256!(frame, utils::h256_to_u256(utils::keccak256(&data)));
	Control::Continue(1)
}

pub fn address(frame: &mut Frame) -> Control {
	push_u256!(frame, utils::address_to_u256(frame.context.address));
	Control::Continue(1)
}

pub fn balance(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, address);
	let balance = host.state.get_balance(utils::u256_to_address(address));
	push_u256!(frame, balance);
	Control::Continue(1)
}

pub fn origin(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, utils::address_to_u256(host.env.origin));
	Control::Continue(1)
}

pub fn caller(frame: &mut Frame) -> Control {
	push_u256!(frame, utils::address_to_u256(frame.context.caller));
	Control::Continue(1)
}

pub fn callvalue(frame: &mut Frame) -> Control {
	push_u256!(frame, frame.context.apparent_value);
	Control::Continue(1)
}

pub fn gasprice(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, host.env.gas_price);
	Control::Continue(1)
}

pub fn extcodesize(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, address);
	let address = utils::u256_to_address(address);
	let code = host.state.get_code(host.state.get_code_hash(address));
	push_u256!(frame, U256::from(code.len()));
	Control::Continue(1)
}

pub fn extcodecopy(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, address);
	pop_u256!(frame, memory_offset, code_offset, len);
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fault!(memory_offset, Fault::ArithmeticOverflow);
	let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
	let address = utils::u256_to_address(address);
	let code = host.state.get_code(host.state.get_code_hash(address));
	frame.memory.copy_from(memory_offset, code_offset, len, &code);
	Control::Continue(1)
}

pub fn extcodehash(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, address);
	let address = utils::u256_to_address(address);
	let hash = if host.state.is_dead_account(address) {
		U256::zero()
	} else {
		utils::h256_to_u256(host.state.get_code_hash(address))
	};
	push_u256!(frame, hash);
	Control::Continue(1)
}

pub fn blockhash(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, number);
	let hash = host
		.block_hashes
		.block_hash(host.env, number)
		.map(utils::h256_to_u256)
		.unwrap_or_default();
	push_u256!(frame, hash);
	Control::Continue(1)
}

pub fn coinbase(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, utils::address_to_u256(host.env.block_coinbase));
	Control::Continue(1)
}

pub fn timestamp(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, host.env.block_timestamp);
	Control::Continue(1)
}

pub fn number(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, host.env.block_number);
	Control::Continue(1)
}

pub fn difficulty(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, host.env.block_difficulty);
	Control::Continue(1)
}

pub fn gaslimit(frame: &mut Frame, host: &mut Host) -> Control {
	push_u256!(frame, host.env.block_gas_limit);
	Control::Continue(1)
}

pub fn sload(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, index);
	let key = StorageKey::new(frame.context.address, utils::u256_to_h256(index));
	let value = U256::from_big_endian(&host.storage.get(&key));
	push_u256!(frame, value);
	Control::Continue(1)
}

pub fn sstore(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, index, value);
	let key = StorageKey::new(frame.context.address, utils::u256_to_h256(index));
	let current = U256::from_big_endian(&host.storage.get(&key));

	if !current.is_zero() && value.is_zero() {
		frame.refund += host.schedule.refund_sstore_clear();
	}
	if current != value {
		let bytes = if value.is_zero() {
			Vec::new()
		} else {
			utils::u256_to_h256(value).as_bytes().to_vec()
		};
		host.storage.set(key, bytes);
	}
	Control::Continue(1)
}

pub fn log(frame: &mut Frame, topic_count: usize) -> Control {
	pop_u256!(frame, offset, len);
	let data = if len.is_zero() {
		Vec::new()
	} else {
		let offset = as_usize_or_fault!(offset, Fault::ArithmeticOverflow);
		let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
		frame.memory.get(offset, len)
	};

	let mut topics = Vec::with_capacity(topic_count);
	for _ in 0..topic_count {
		pop_u256!(frame, topic);
		topics.push(utils::u256_to_h256(topic));
	}

	frame.logs.push(Log {
		address: frame.context.address,
		topics,
		data,
	});
	Control::Continue(1)
}

pub fn selfdestruct(frame: &mut Frame, host: &mut Host) -> Control {
	pop_u256!(frame, inheritor);
	let inheritor = utils::u256_to_address(inheritor);
	let address = frame.context.address;
	let balance = host.state.get_balance(address);

	if inheritor != address {
		if host.state.account_exists(inheritor) {
			host.state
				.update_balance(inheritor, BalanceDelta::Add(balance), host.schedule);
		} else {
			host.state.create_account(inheritor, balance);
		}
	}
	host.state
		.update_balance(address, BalanceDelta::Sub(balance), host.schedule);

	if frame.destroys.insert(address) {
		frame.refund += host.schedule.refund_selfdestruct();
	}
	Control::Exit(Exit::Halt(Vec::new()))
}

pub fn call(frame: &mut Frame, host: &mut Host, step: Step, scheme: CallScheme) -> Control {
	let provided = step
		.provided
		.expect("gasometer returns provided gas for every CALL-family opcode; qed");

	pop_u256!(frame, _requested_gas, to);
	let to = utils::u256_to_address(to);
	let value = match scheme {
		CallScheme::Call | CallScheme::CallCode => {
			pop_u256!(frame, value);
			value
		}
		CallScheme::DelegateCall | CallScheme::StaticCall => U256::zero(),
	};
	pop_u256!(frame, in_offset, in_len, out_offset, out_len);

	if frame.is_static && scheme == CallScheme::Call && !value.is_zero() {
		return Control::Exit(Exit::Fault(Fault::StaticViolation));
	}

	// The buffer of the previous child is dead as soon as a new call is
	// attempted, whether or not a frame gets spawned.
	frame.retbuf.clear();

	let mut child_gas = provided;
	if (scheme == CallScheme::Call || scheme == CallScheme::CallCode) && !value.is_zero() {
		child_gas += host.schedule.call_stipend();
	}

	let input = if in_len.is_zero() {
		Vec::new()
	} else {
		let in_offset = as_usize_or_fault!(in_offset, Fault::ArithmeticOverflow);
		let in_len = as_usize_or_fault!(in_len, Fault::ArithmeticOverflow);
		frame.memory.get(in_offset, in_len)
	};

	let (out_offset, out_len) = if out_len.is_zero() {
		(0, 0)
	} else {
		(
			as_usize_or_fault!(out_offset, Fault::ArithmeticOverflow),
			as_usize_or_fault!(out_len, Fault::ArithmeticOverflow),
		)
	};

	let has_balance = match scheme {
		CallScheme::Call | CallScheme::CallCode => {
			host.state.get_balance(frame.context.address) >= value
		}
		CallScheme::DelegateCall | CallScheme::StaticCall => true,
	};
	if !has_balance || frame.depth + 1 > host.schedule.max_call_depth() {
		push_u256!(frame, U256::zero());
		return Control::UnusedGas(child_gas);
	}

	let context = match scheme {
		CallScheme::Call | CallScheme::StaticCall => Context {
			address: to,
			caller: frame.context.address,
			apparent_value: value,
		},
		CallScheme::CallCode => Context {
			address: frame.context.address,
			caller: frame.context.address,
			apparent_value: value,
		},
		CallScheme::DelegateCall => Context {
			address: frame.context.address,
			caller: frame.context.caller,
			apparent_value: frame.context.apparent_value,
		},
	};

	let transfer = match scheme {
		CallScheme::Call => Some(Transfer {
			source: frame.context.address,
			target: to,
			value,
		}),
		CallScheme::CallCode => Some(Transfer {
			source: frame.context.address,
			target: frame.context.address,
			value,
		}),
		CallScheme::DelegateCall | CallScheme::StaticCall => None,
	};

	Control::Trap(Box::new(ChildPlan::Call(CallPlan {
		scheme,
		code_address: to,
		context,
		transfer,
		input,
		gas: child_gas,
		is_static: frame.is_static || scheme == CallScheme::StaticCall,
		out_offset,
		out_len,
	})))
}

pub fn create(frame: &mut Frame, host: &mut Host, step: Step, salted: bool) -> Control {
	let provided = step
		.provided
		.expect("gasometer returns provided gas for CREATE and CREATE2; qed");

	pop_u256!(frame, value, offset, len);
	let salt = if salted {
		pop_u256!(frame, salt);
		Some(utils::u256_to_h256(salt))
	} else {
		None
	};

	frame.retbuf.clear();

	let init_code = if len.is_zero() {
		Vec::new()
	} else {
		let offset = as_usize_or_fault!(offset, Fault::ArithmeticOverflow);
		let len = as_usize_or_fault!(len, Fault::ArithmeticOverflow);
		frame.memory.get(offset, len)
	};

	let caller = frame.context.address;
	if host.state.get_balance(caller) < value || frame.depth + 1 > host.schedule.max_call_depth() {
		push_u256!(frame, U256::zero());
		return Control::UnusedGas(provided);
	}

	let address = match salt {
		Some(salt) => crate::call::salted_create_address(caller, salt, utils::keccak256(&init_code)),
		None => crate::call::legacy_create_address(caller, host.state.get_nonce(caller)),
	};

	// Address collision: an occupied slot fails the create without spawning
	// a child; only the base cost stays consumed.
	if host.state.account_exists(address)
		&& (host.state.get_code_hash(address) != KECCAK_EMPTY
			|| !host.state.get_nonce(address).is_zero())
	{
		push_u256!(frame, U256::zero());
		return Control::UnusedGas(provided);
	}

	Control::Trap(Box::new(ChildPlan::Create(CreatePlan {
		address,
		caller,
		value,
		init_code,
		gas: provided,
	})))
}

pub fn invalid(opcode: crate::opcode::Opcode) -> Control {
	Control::Exit(Exit::Fault(Fault::InvalidInstruction(opcode)))
}
