//! The frame step loop.
//!
//! `run_frame` executes the top frame until it halts, reverts, faults or
//! suspends on a CALL/CREATE. The program counter and gas live in locals
//! while stepping; the frame's own copies are stale until they are published
//! back at suspension or termination.

use log::trace;

use crate::error::{Fault, StepOutcome};
use crate::eval::{self, Control, Exit, Step};
use crate::frame::Frame;
use crate::gasometer::Gasometer;
use crate::host::Host;
use crate::opcode::{InstructionInfo, Opcode, Tier, INSTRUCTIONS};
use crate::stack::STACK_LIMIT;
use crate::tracing::TraceRecord;
use crate::utils;

/// Run `frame` to its next suspension or terminal outcome.
pub(crate) fn run_frame(frame: &mut Frame, host: &mut Host) -> StepOutcome {
	if let Some(resume) = frame.resume.take() {
		// Feed the child's result back in: result word first, then the
		// clamped output. The memory region was priced when the call was
		// issued, so this write is free.
		if let Err(fault) = frame.stack.push(resume.result) {
			return fail(frame, fault);
		}
		let copy = core::cmp::min(resume.output.len(), resume.out_len);
		if copy > 0 {
			frame.memory.write_slice(resume.out_offset, &resume.output[..copy]);
		}
	}

	let mut gasometer = match Gasometer::new(frame.gas, frame.memory.word_count(), host.schedule) {
		Ok(gasometer) => gasometer,
		Err(fault) => return fail(frame, fault),
	};
	let mut pc = frame.pc;

	loop {
		let opcode = match frame.code.get(pc) {
			Some(byte) => Opcode(byte),
			// Running off the end of the code is an implicit STOP.
			None => {
				frame.pc = pc;
				frame.gas = gasometer.gas;
				return StepOutcome::Halt(Vec::new());
			}
		};

		let info = &INSTRUCTIONS[opcode.as_usize()];
		if let Err(fault) = verify(frame, host, opcode, info) {
			return fail(frame, fault);
		}

		let requirements = match gasometer.requirements(host, frame, opcode, info) {
			Ok(requirements) => requirements,
			Err(fault) => return fail(frame, fault),
		};

		if let Some(tracer) = host.tracer.as_deref_mut() {
			let storage_write = if opcode == Opcode::SSTORE {
				// Arity was verified above.
				let index = frame.stack.peek(0).expect("SSTORE has two operands");
				let value = frame.stack.peek(1).expect("SSTORE has two operands");
				Some((utils::u256_to_h256(index), utils::u256_to_h256(value)))
			} else {
				None
			};
			tracer.record(TraceRecord {
				depth: frame.depth,
				pc,
				opcode,
				gas_before: gasometer.gas,
				gas_cost: requirements.gas_cost,
				stack: frame.stack.data(),
				memory: frame.memory.data(),
				storage_write,
			});
		}

		trace!(
			target: "vm",
			"[{}] pc {} op {} gas {} cost {}",
			frame.depth,
			pc,
			info.name,
			gasometer.gas,
			requirements.gas_cost,
		);

		if let Err(fault) = gasometer.charge(requirements.gas_cost) {
			return fail(frame, fault);
		}
		frame.memory.expand(requirements.memory_required_size);
		gasometer.memory_gas = requirements.memory_total_gas;

		let step = Step {
			position: pc,
			gas: gasometer.gas,
			provided: requirements.provided_gas,
		};

		match eval::eval(frame, host, step, opcode) {
			Control::Continue(bytes) => {
				// A truncated PUSH immediate leaves the counter exactly at
				// the end of the code.
				pc = core::cmp::min(pc + bytes, frame.code.len());
			}
			Control::Jump(dest) => {
				if frame.code.is_valid_jump(dest) {
					pc = dest;
				} else {
					return fail(frame, Fault::InvalidJump);
				}
			}
			Control::UnusedGas(returned) => {
				gasometer.refund(returned);
				pc += 1;
			}
			Control::Exit(Exit::Halt(output)) => {
				frame.pc = pc;
				frame.gas = gasometer.gas;
				return StepOutcome::Halt(output);
			}
			Control::Exit(Exit::Revert(output)) => {
				frame.pc = pc;
				frame.gas = gasometer.gas;
				return StepOutcome::Revert(output);
			}
			Control::Exit(Exit::Fault(fault)) => {
				return fail(frame, fault);
			}
			Control::Trap(plan) => {
				frame.pc = pc + 1;
				frame.gas = gasometer.gas;
				return StepOutcome::Suspend(plan);
			}
		}
	}
}

/// Instruction admissibility: fork gating, static banning and stack bounds,
/// all checked before any gas is charged.
fn verify(frame: &Frame, host: &Host, opcode: Opcode, info: &InstructionInfo) -> Result<(), Fault> {
	let schedule = host.schedule;

	if info.tier == Tier::Invalid {
		return Err(Fault::InvalidInstruction(opcode));
	}

	let enabled = match opcode {
		Opcode::DELEGATECALL => schedule.eip7,
		Opcode::REVERT => schedule.eip140,
		Opcode::RETURNDATASIZE | Opcode::RETURNDATACOPY => schedule.eip211,
		Opcode::STATICCALL => schedule.eip214,
		Opcode::SHL | Opcode::SHR | Opcode::SAR => schedule.eip145,
		Opcode::CREATE2 => schedule.eip1014,
		Opcode::EXTCODEHASH => schedule.eip1052,
		_ => true,
	};
	if !enabled {
		return Err(Fault::InvalidInstruction(opcode));
	}

	if frame.is_static {
		let mutating = matches!(
			opcode,
			Opcode::SSTORE | Opcode::CREATE | Opcode::CREATE2 | Opcode::SELFDESTRUCT
		) || opcode.is_log().is_some();
		if mutating {
			return Err(Fault::StaticViolation);
		}
	}

	if !frame.stack.has(info.args) {
		return Err(Fault::StackUnderflow);
	}
	if frame.stack.len() - info.args + info.ret > STACK_LIMIT {
		return Err(Fault::StackOverflow);
	}

	Ok(())
}

/// Publish a fault: the program counter stops where it was and the frame's
/// remaining gas is forfeited.
fn fail(frame: &mut Frame, fault: Fault) -> StepOutcome {
	frame.gas = 0;
	StepOutcome::Fault(fault)
}
