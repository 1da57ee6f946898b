//! Per-opcode execution tracing.

use primitive_types::{H256, U256};

use crate::opcode::Opcode;

/// Everything observed about one executed instruction. Snapshots borrow from
/// the live frame; sinks that need to keep them must copy.
#[derive(Clone, Copy, Debug)]
pub struct TraceRecord<'a> {
	/// Call nesting depth of the frame.
	pub depth: usize,
	/// Program counter of the instruction.
	pub pc: usize,
	/// The instruction.
	pub opcode: Opcode,
	/// Gas remaining before the charge.
	pub gas_before: u64,
	/// Total gas charged, memory growth included.
	pub gas_cost: u64,
	/// Stack items, bottom first.
	pub stack: &'a [U256],
	/// Active memory.
	pub memory: &'a [u8],
	/// Key and value about to be written, for SSTORE.
	pub storage_write: Option<(H256, H256)>,
}

/// Receiver of per-opcode records. No persistence format is mandated; a sink
/// may render, aggregate or drop records as it sees fit.
pub trait TraceSink {
	/// Called once per executed instruction, after gas has been charged and
	/// before the instruction's effects are applied.
	fn record(&mut self, record: TraceRecord);
}

/// Sink that keeps a plain-data copy of every record. Intended for tests and
/// debugging sessions.
#[derive(Debug, Default)]
pub struct CollectingSink {
	/// Collected steps in execution order.
	pub steps: Vec<TraceStep>,
}

/// Owned form of a [`TraceRecord`].
#[derive(Clone, Debug)]
pub struct TraceStep {
	/// Call nesting depth of the frame.
	pub depth: usize,
	/// Program counter of the instruction.
	pub pc: usize,
	/// The instruction.
	pub opcode: Opcode,
	/// Gas remaining before the charge.
	pub gas_before: u64,
	/// Total gas charged.
	pub gas_cost: u64,
	/// Stack depth at the time of the step.
	pub stack_depth: usize,
	/// Active memory size in bytes.
	pub memory_len: usize,
}

impl TraceSink for CollectingSink {
	fn record(&mut self, record: TraceRecord) {
		self.steps.push(TraceStep {
			depth: record.depth,
			pc: record.pc,
			opcode: record.opcode,
			gas_before: record.gas_before,
			gas_cost: record.gas_cost,
			stack_depth: record.stack.len(),
			memory_len: record.memory.len(),
		});
	}
}
