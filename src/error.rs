//! Faults and frame outcomes.
//!
//! A fault is a value, not a panic: evaluation returns it through
//! [`StepOutcome`] and the executor is the only place that turns it into
//! frame unwinding.

use crate::call::ChildPlan;
use crate::opcode::Opcode;

/// Exception kinds. Every fault is fatal to the frame that raised it: the
/// executor restores the frame's entry snapshots and discards its remaining
/// gas.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Fault {
	/// A gas charge did not fit in the remaining gas.
	#[error("out of gas")]
	OutOfGas,
	/// Push would exceed the stack capacity.
	#[error("stack overflow")]
	StackOverflow,
	/// Pop, dup or swap reached below the current stack depth.
	#[error("stack underflow")]
	StackUnderflow,
	/// JUMP or JUMPI target is not a valid JUMPDEST.
	#[error("invalid jump destination")]
	InvalidJump,
	/// Undefined opcode, or an opcode the active fork does not enable.
	#[error("invalid instruction {:#04x}", .0.as_u8())]
	InvalidInstruction(Opcode),
	/// State-mutating operation inside a static context.
	#[error("state mutation in static context")]
	StaticViolation,
	/// RETURNDATACOPY source range exceeds the return-data buffer.
	#[error("return data access out of bounds")]
	AccessViolation,
	/// A directly invoked precompile handler failed.
	#[error("precompile failure")]
	PrecompileFailure,
	/// Integer overflow while computing a gas cost.
	#[error("arithmetic overflow in gas computation")]
	ArithmeticOverflow,
}

/// Outcome of running a frame until it suspends or terminates.
#[derive(Debug)]
pub enum StepOutcome {
	/// The frame finished normally; its effects are kept and the captured
	/// output is handed to the parent (or to the transaction).
	Halt(Vec<u8>),
	/// Explicit REVERT: output is preserved and remaining gas returns to the
	/// parent, but state, refunds, logs and destroy entries roll back.
	Revert(Vec<u8>),
	/// The frame issued a CALL or CREATE and is waiting for a child frame to
	/// run. PC and gas have been published back to the frame.
	Suspend(Box<ChildPlan>),
	/// The frame faulted; all of its remaining gas is lost.
	Fault(Fault),
}

impl StepOutcome {
	/// Whether the outcome ends the frame (anything but a suspension).
	pub fn is_terminal(&self) -> bool {
		!matches!(self, StepOutcome::Suspend(_))
	}
}

impl From<Fault> for StepOutcome {
	fn from(fault: Fault) -> Self {
		StepOutcome::Fault(fault)
	}
}
