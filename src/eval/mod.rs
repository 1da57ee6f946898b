//! Opcode evaluation and the dispatch table.
//!
//! Every evaluation function receives the frame, the host collaborators and
//! the per-step view (position, post-charge gas, child gas for CALL/CREATE).
//! Gas and fork gating have already been handled by the interpreter when an
//! evaluation function runs.

#[macro_use]
mod macros;
mod arithmetic;
mod bitwise;
mod misc;
mod system;

use core::ops::{BitAnd, BitOr, BitXor};

use primitive_types::U256;

use crate::call::{CallScheme, ChildPlan};
use crate::error::Fault;
use crate::frame::Frame;
use crate::host::Host;
use crate::opcode::Opcode;

/// Immutable view of the current step handed to evaluation functions.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Step {
	/// Position of the opcode being evaluated.
	pub position: usize,
	/// Gas remaining after the instruction charge.
	pub gas: u64,
	/// Gas reserved for a child frame, for the CALL/CREATE family.
	pub provided: Option<u64>,
}

/// Terminal result produced by an evaluation function.
#[derive(Debug)]
pub(crate) enum Exit {
	/// Normal halt with captured output.
	Halt(Vec<u8>),
	/// Explicit revert with captured output.
	Revert(Vec<u8>),
	/// Exceptional halt.
	Fault(Fault),
}

/// What the interpreter should do after one instruction.
#[derive(Debug)]
pub(crate) enum Control {
	/// Advance the program counter by the given byte count.
	Continue(usize),
	/// Move the program counter to a destination that must be validated.
	Jump(usize),
	/// Advance by one and return gas that was reserved for a child which was
	/// never spawned.
	UnusedGas(u64),
	/// The frame is done.
	Exit(Exit),
	/// Suspend for a child frame.
	Trap(Box<ChildPlan>),
}

type EvalFn = fn(&mut Frame, &mut Host, Step, Opcode) -> Control;

/// Evaluate `opcode` against the frame.
#[inline]
pub(crate) fn eval(frame: &mut Frame, host: &mut Host, step: Step, opcode: Opcode) -> Control {
	EVAL_TABLE[opcode.as_usize()](frame, host, step, opcode)
}

static EVAL_TABLE: [EvalFn; 256] = eval_table();

fn eval_invalid(_frame: &mut Frame, _host: &mut Host, _step: Step, opcode: Opcode) -> Control {
	system::invalid(opcode)
}

fn eval_stop(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::stop(frame)
}

fn eval_add(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_tuple!(frame, overflowing_add)
}

fn eval_mul(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_tuple!(frame, overflowing_mul)
}

fn eval_sub(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_tuple!(frame, overflowing_sub)
}

fn eval_div(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, arithmetic::div)
}

fn eval_sdiv(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, arithmetic::sdiv)
}

fn eval_mod(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, arithmetic::rem)
}

fn eval_smod(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, arithmetic::srem)
}

fn eval_addmod(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op3_u256_fn!(frame, arithmetic::addmod)
}

fn eval_mulmod(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op3_u256_fn!(frame, arithmetic::mulmod)
}

fn eval_exp(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, arithmetic::exp)
}

fn eval_signextend(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, arithmetic::signextend)
}

fn eval_lt(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_bool_ref!(frame, lt)
}

fn eval_gt(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_bool_ref!(frame, gt)
}

fn eval_slt(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, bitwise::slt)
}

fn eval_sgt(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, bitwise::sgt)
}

fn eval_eq(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_bool_ref!(frame, eq)
}

fn eval_iszero(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op1_u256_fn!(frame, bitwise::iszero)
}

fn eval_and(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256!(frame, bitand)
}

fn eval_or(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256!(frame, bitor)
}

fn eval_xor(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256!(frame, bitxor)
}

fn eval_not(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op1_u256_fn!(frame, bitwise::not)
}

fn eval_byte(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, bitwise::byte)
}

fn eval_shl(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, bitwise::shl)
}

fn eval_shr(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, bitwise::shr)
}

fn eval_sar(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	op2_u256_fn!(frame, bitwise::sar)
}

fn eval_sha3(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::sha3(frame)
}

fn eval_address(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::address(frame)
}

fn eval_balance(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::balance(frame, host)
}

fn eval_origin(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::origin(frame, host)
}

fn eval_caller(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::caller(frame)
}

fn eval_callvalue(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::callvalue(frame)
}

fn eval_calldataload(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::calldataload(frame)
}

fn eval_calldatasize(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::calldatasize(frame)
}

fn eval_calldatacopy(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::calldatacopy(frame)
}

fn eval_codesize(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::codesize(frame)
}

fn eval_codecopy(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::codecopy(frame)
}

fn eval_gasprice(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::gasprice(frame, host)
}

fn eval_extcodesize(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::extcodesize(frame, host)
}

fn eval_extcodecopy(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::extcodecopy(frame, host)
}

fn eval_returndatasize(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::returndatasize(frame)
}

fn eval_returndatacopy(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::returndatacopy(frame)
}

fn eval_extcodehash(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::extcodehash(frame, host)
}

fn eval_blockhash(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::blockhash(frame, host)
}

fn eval_coinbase(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::coinbase(frame, host)
}

fn eval_timestamp(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::timestamp(frame, host)
}

fn eval_number(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::number(frame, host)
}

fn eval_difficulty(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::difficulty(frame, host)
}

fn eval_gaslimit(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::gaslimit(frame, host)
}

fn eval_pop(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::pop(frame)
}

fn eval_mload(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::mload(frame)
}

fn eval_mstore(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::mstore(frame)
}

fn eval_mstore8(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::mstore8(frame)
}

fn eval_sload(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::sload(frame, host)
}

fn eval_sstore(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::sstore(frame, host)
}

fn eval_jump(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::jump(frame)
}

fn eval_jumpi(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::jumpi(frame)
}

fn eval_pc(frame: &mut Frame, _host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	misc::pc(frame, step)
}

fn eval_msize(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::msize(frame)
}

fn eval_gas(frame: &mut Frame, _host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	misc::gas(frame, step)
}

fn eval_jumpdest(_frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	Control::Continue(1)
}

fn eval_push(frame: &mut Frame, _host: &mut Host, step: Step, opcode: Opcode) -> Control {
	let width = opcode.is_push().expect("table maps only PUSH bytes here; qed") as usize;
	misc::push(frame, width, step)
}

fn eval_dup(frame: &mut Frame, _host: &mut Host, _step: Step, opcode: Opcode) -> Control {
	let position = opcode.is_dup().expect("table maps only DUP bytes here; qed");
	misc::dup(frame, position)
}

fn eval_swap(frame: &mut Frame, _host: &mut Host, _step: Step, opcode: Opcode) -> Control {
	let depth = opcode.is_swap().expect("table maps only SWAP bytes here; qed");
	misc::swap(frame, depth)
}

fn eval_log(frame: &mut Frame, _host: &mut Host, _step: Step, opcode: Opcode) -> Control {
	let topics = opcode.is_log().expect("table maps only LOG bytes here; qed") as usize;
	system::log(frame, topics)
}

fn eval_create(frame: &mut Frame, host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	system::create(frame, host, step, false)
}

fn eval_create2(frame: &mut Frame, host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	system::create(frame, host, step, true)
}

fn eval_call(frame: &mut Frame, host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	system::call(frame, host, step, CallScheme::Call)
}

fn eval_callcode(frame: &mut Frame, host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	system::call(frame, host, step, CallScheme::CallCode)
}

fn eval_delegatecall(frame: &mut Frame, host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	system::call(frame, host, step, CallScheme::DelegateCall)
}

fn eval_staticcall(frame: &mut Frame, host: &mut Host, step: Step, _opcode: Opcode) -> Control {
	system::call(frame, host, step, CallScheme::StaticCall)
}

fn eval_return(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::ret(frame)
}

fn eval_revert(frame: &mut Frame, _host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	misc::revert(frame)
}

fn eval_selfdestruct(frame: &mut Frame, host: &mut Host, _step: Step, _opcode: Opcode) -> Control {
	system::selfdestruct(frame, host)
}

const fn eval_table() -> [EvalFn; 256] {
	let mut table = [eval_invalid as EvalFn; 256];

	table[Opcode::STOP.as_usize()] = eval_stop;
	table[Opcode::ADD.as_usize()] = eval_add;
	table[Opcode::MUL.as_usize()] = eval_mul;
	table[Opcode::SUB.as_usize()] = eval_sub;
	table[Opcode::DIV.as_usize()] = eval_div;
	table[Opcode::SDIV.as_usize()] = eval_sdiv;
	table[Opcode::MOD.as_usize()] = eval_mod;
	table[Opcode::SMOD.as_usize()] = eval_smod;
	table[Opcode::ADDMOD.as_usize()] = eval_addmod;
	table[Opcode::MULMOD.as_usize()] = eval_mulmod;
	table[Opcode::EXP.as_usize()] = eval_exp;
	table[Opcode::SIGNEXTEND.as_usize()] = eval_signextend;

	table[Opcode::LT.as_usize()] = eval_lt;
	table[Opcode::GT.as_usize()] = eval_gt;
	table[Opcode::SLT.as_usize()] = eval_slt;
	table[Opcode::SGT.as_usize()] = eval_sgt;
	table[Opcode::EQ.as_usize()] = eval_eq;
	table[Opcode::ISZERO.as_usize()] = eval_iszero;
	table[Opcode::AND.as_usize()] = eval_and;
	table[Opcode::OR.as_usize()] = eval_or;
	table[Opcode::XOR.as_usize()] = eval_xor;
	table[Opcode::NOT.as_usize()] = eval_not;
	table[Opcode::BYTE.as_usize()] = eval_byte;
	table[Opcode::SHL.as_usize()] = eval_shl;
	table[Opcode::SHR.as_usize()] = eval_shr;
	table[Opcode::SAR.as_usize()] = eval_sar;

	table[Opcode::SHA3.as_usize()] = eval_sha3;

	table[Opcode::ADDRESS.as_usize()] = eval_address;
	table[Opcode::BALANCE.as_usize()] = eval_balance;
	table[Opcode::ORIGIN.as_usize()] = eval_origin;
	table[Opcode::CALLER.as_usize()] = eval_caller;
	table[Opcode::CALLVALUE.as_usize()] = eval_callvalue;
	table[Opcode::CALLDATALOAD.as_usize()] = eval_calldataload;
	table[Opcode::CALLDATASIZE.as_usize()] = eval_calldatasize;
	table[Opcode::CALLDATACOPY.as_usize()] = eval_calldatacopy;
	table[Opcode::CODESIZE.as_usize()] = eval_codesize;
	table[Opcode::CODECOPY.as_usize()] = eval_codecopy;
	table[Opcode::GASPRICE.as_usize()] = eval_gasprice;
	table[Opcode::EXTCODESIZE.as_usize()] = eval_extcodesize;
	table[Opcode::EXTCODECOPY.as_usize()] = eval_extcodecopy;
	table[Opcode::RETURNDATASIZE.as_usize()] = eval_returndatasize;
	table[Opcode::RETURNDATACOPY.as_usize()] = eval_returndatacopy;
	table[Opcode::EXTCODEHASH.as_usize()] = eval_extcodehash;

	table[Opcode::BLOCKHASH.as_usize()] = eval_blockhash;
	table[Opcode::COINBASE.as_usize()] = eval_coinbase;
	table[Opcode::TIMESTAMP.as_usize()] = eval_timestamp;
	table[Opcode::NUMBER.as_usize()] = eval_number;
	table[Opcode::DIFFICULTY.as_usize()] = eval_difficulty;
	table[Opcode::GASLIMIT.as_usize()] = eval_gaslimit;

	table[Opcode::POP.as_usize()] = eval_pop;
	table[Opcode::MLOAD.as_usize()] = eval_mload;
	table[Opcode::MSTORE.as_usize()] = eval_mstore;
	table[Opcode::MSTORE8.as_usize()] = eval_mstore8;
	table[Opcode::SLOAD.as_usize()] = eval_sload;
	table[Opcode::SSTORE.as_usize()] = eval_sstore;
	table[Opcode::JUMP.as_usize()] = eval_jump;
	table[Opcode::JUMPI.as_usize()] = eval_jumpi;
	table[Opcode::PC.as_usize()] = eval_pc;
	table[Opcode::MSIZE.as_usize()] = eval_msize;
	table[Opcode::GAS.as_usize()] = eval_gas;
	table[Opcode::JUMPDEST.as_usize()] = eval_jumpdest;

	let mut n = 0;
	while n < 32 {
		table[Opcode::PUSH1.as_usize() + n] = eval_push;
		n += 1;
	}
	let mut n = 0;
	while n < 16 {
		table[Opcode::DUP1.as_usize() + n] = eval_dup;
		table[Opcode::SWAP1.as_usize() + n] = eval_swap;
		n += 1;
	}
	let mut n = 0;
	while n < 5 {
		table[Opcode::LOG0.as_usize() + n] = eval_log;
		n += 1;
	}

	table[Opcode::CREATE.as_usize()] = eval_create;
	table[Opcode::CALL.as_usize()] = eval_call;
	table[Opcode::CALLCODE.as_usize()] = eval_callcode;
	table[Opcode::RETURN.as_usize()] = eval_return;
	table[Opcode::DELEGATECALL.as_usize()] = eval_delegatecall;
	table[Opcode::CREATE2.as_usize()] = eval_create2;
	table[Opcode::STATICCALL.as_usize()] = eval_staticcall;
	table[Opcode::REVERT.as_usize()] = eval_revert;
	table[Opcode::SELFDESTRUCT.as_usize()] = eval_selfdestruct;

	table
}
