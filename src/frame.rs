//! Per-invocation execution state.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use primitive_types::{H160, H256, U256};

use crate::code::CodeInfo;
use crate::memory::Memory;
use crate::stack::Stack;
use crate::state::Snapshot;

/// Transaction- and block-level facts shared by every frame of one
/// transaction.
#[derive(Clone, Debug, Default)]
pub struct Environment {
	/// Transaction origin.
	pub origin: H160,
	/// Effective gas price.
	pub gas_price: U256,
	/// Executing block number.
	pub block_number: U256,
	/// Executing block timestamp.
	pub block_timestamp: U256,
	/// Executing block gas limit.
	pub block_gas_limit: U256,
	/// Beneficiary of the executing block.
	pub block_coinbase: H160,
	/// Difficulty of the executing block.
	pub block_difficulty: U256,
}

/// Identity of one call context.
#[derive(Clone, Debug)]
pub struct Context {
	/// Account whose storage and balance the code acts on.
	pub address: H160,
	/// Immediate caller as seen by CALLER.
	pub caller: H160,
	/// Value reported by CALLVALUE. For DELEGATECALL this is inherited, not
	/// transferred.
	pub apparent_value: U256,
}

/// How a frame was brought into existence. Direct kinds are transaction
/// roots; their failures surface to the transaction instead of becoming a
/// result word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameKind {
	/// Root message call.
	Transaction,
	/// Root contract creation.
	DirectCreate,
	/// Root call straight into a precompiled contract.
	DirectPrecompile,
	/// Nested CALL, DELEGATECALL or STATICCALL.
	Call,
	/// Nested CALLCODE.
	CallCode,
	/// Nested CREATE or CREATE2.
	Create,
	/// Nested call that resolved to a precompiled contract.
	Precompile,
}

impl FrameKind {
	/// Whether this frame has no EVM parent.
	pub fn is_root(&self) -> bool {
		matches!(
			self,
			FrameKind::Transaction | FrameKind::DirectCreate | FrameKind::DirectPrecompile
		)
	}

	/// Whether the frame runs init code and deploys its output.
	pub fn is_create(&self) -> bool {
		matches!(self, FrameKind::DirectCreate | FrameKind::Create)
	}

	/// Whether the frame is handled by the precompile registry.
	pub fn is_precompile(&self) -> bool {
		matches!(self, FrameKind::DirectPrecompile | FrameKind::Precompile)
	}
}

/// One emitted event log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Log {
	/// Emitting account.
	pub address: H160,
	/// Indexed topics, at most four.
	pub topics: Vec<H256>,
	/// Opaque payload.
	pub data: Vec<u8>,
}

/// Accumulators that survive a transaction only along non-reverted paths.
#[derive(Clone, Debug, Default)]
pub struct Substate {
	/// Gas refund counter.
	pub refund: u64,
	/// Accounts scheduled for destruction.
	pub destroys: BTreeSet<H160>,
	/// Logs in emission order.
	pub logs: Vec<Log>,
	/// Whether the root frame reverted.
	pub reverted: bool,
}

/// Child result fed back into a suspended parent before its next step.
#[derive(Clone, Debug)]
pub struct Resume {
	/// Word pushed onto the parent stack: the created address or 1 on
	/// success, 0 otherwise.
	pub result: U256,
	/// Full child output, unclamped.
	pub output: Vec<u8>,
	/// Where the parent asked the output to land.
	pub out_offset: usize,
	/// How many output bytes the parent asked for.
	pub out_len: usize,
}

/// One call context: code, stack, memory, gas, environment and the snapshots
/// to restore on failure. Created at transaction entry or on CALL/CREATE and
/// consumed by the executor when it halts, reverts or faults.
#[derive(Debug)]
pub struct Frame {
	/// How the frame came to be.
	pub kind: FrameKind,
	/// Execution identity.
	pub context: Context,
	/// Value actually transferred into this frame.
	pub value: U256,
	/// Input data (or precompile input).
	pub data: Rc<Vec<u8>>,
	/// Analyzed code to run.
	pub code: Arc<CodeInfo>,
	/// Program counter. Canonical only between step batches.
	pub pc: usize,
	/// Remaining gas. Canonical only between step batches.
	pub gas: u64,
	/// Word stack.
	pub stack: Stack,
	/// Byte memory.
	pub memory: Memory,
	/// Output of the most recent completed child call.
	pub retbuf: Vec<u8>,
	/// Logs emitted by this frame and merged-in children.
	pub logs: Vec<Log>,
	/// Destroy set of this frame and merged-in children.
	pub destroys: BTreeSet<H160>,
	/// Refund counter of this frame and merged-in children.
	pub refund: u64,
	/// State snapshot taken at frame entry.
	pub state_snapshot: Snapshot,
	/// Storage snapshot taken at frame entry.
	pub storage_snapshot: Snapshot,
	/// Output destination in the parent's memory.
	pub out_offset: usize,
	/// Output length requested by the parent.
	pub out_len: usize,
	/// Whether state mutation is banned.
	pub is_static: bool,
	/// Call nesting depth, 0 for roots.
	pub depth: usize,
	/// Pending child result; present exactly when the frame is a
	/// continuation.
	pub resume: Option<Resume>,
	/// Address being created, for create frames.
	pub created_address: Option<H160>,
}

impl Frame {
	/// A fresh frame. Snapshots must have been taken immediately before.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		kind: FrameKind,
		context: Context,
		value: U256,
		data: Rc<Vec<u8>>,
		code: Arc<CodeInfo>,
		gas: u64,
		state_snapshot: Snapshot,
		storage_snapshot: Snapshot,
		out_offset: usize,
		out_len: usize,
		is_static: bool,
		depth: usize,
	) -> Self {
		Self {
			kind,
			context,
			value,
			data,
			code,
			pc: 0,
			gas,
			stack: Stack::new(),
			memory: Memory::new(),
			retbuf: Vec::new(),
			logs: Vec::new(),
			destroys: BTreeSet::new(),
			refund: 0,
			state_snapshot,
			storage_snapshot,
			out_offset,
			out_len,
			is_static,
			depth,
			resume: None,
			created_address: None,
		}
	}

	/// Fold a completed, non-reverted child's accumulators into this frame.
	pub fn absorb(&mut self, refund: u64, destroys: BTreeSet<H160>, logs: Vec<Log>) {
		self.refund += refund;
		self.destroys.extend(destroys);
		self.logs.extend(logs);
	}

	/// Turn a finished root frame into the transaction substate.
	pub fn into_substate(self, reverted: bool) -> Substate {
		if reverted {
			Substate {
				refund: 0,
				destroys: BTreeSet::new(),
				logs: Vec::new(),
				reverted: true,
			}
		} else {
			Substate {
				refund: self.refund,
				destroys: self.destroys,
				logs: self.logs,
				reverted: false,
			}
		}
	}
}
